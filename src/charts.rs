//! Vega-Lite chart specs for the aggregation summaries.
//!
//! Builders only shape data that has already been aggregated; the browser
//! renders the returned JSON with vega-embed.

use crate::aggregate::{
    BucketCount, MonthlySales, Point, ProductCount, PurchaseFrequency, RegionCategorySales, Total,
};
use serde::Serialize;
use serde_json::{json, Value};

const SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v5.json";

fn spec<T: Serialize>(title: &str, rows: &[T], mark: Value, encoding: Value) -> Value {
    json!({
        "$schema": SCHEMA,
        "title": title,
        "width": "container",
        "data": { "values": rows },
        "mark": mark,
        "encoding": encoding,
    })
}

fn scatter(title: &str, points: &[Point], x: &str, y: &str) -> Value {
    spec(
        title,
        points,
        json!({ "type": "circle", "size": 60, "opacity": 0.5 }),
        json!({
            "x": { "field": "x", "type": "quantitative", "title": x },
            "y": { "field": "y", "type": "quantitative", "title": y },
        }),
    )
}

/// Vertical bars, tallest first.
fn ranked_columns(title: &str, totals: &[Total], x: &str, y: &str) -> Value {
    spec(
        title,
        totals,
        json!("bar"),
        json!({
            "x": { "field": "label", "type": "nominal", "sort": "-y", "title": x },
            "y": { "field": "value", "type": "quantitative", "title": y },
            "tooltip": [
                { "field": "label", "title": x },
                { "field": "value", "title": y, "format": ",.2f" },
            ],
        }),
    )
}

/// Horizontal bars, longest first.
fn ranked_rows(title: &str, totals: &[Total], x: &str, y: &str) -> Value {
    spec(
        title,
        totals,
        json!("bar"),
        json!({
            "x": { "field": "value", "type": "quantitative", "title": x },
            "y": { "field": "label", "type": "nominal", "sort": "-x", "title": y },
            "tooltip": [
                { "field": "label", "title": y },
                { "field": "value", "title": x, "format": ",.2f" },
            ],
        }),
    )
}

pub fn top_states(totals: &[Total]) -> Value {
    ranked_columns("Top states buying with discount", totals, "State", "Sales")
}

pub fn segment_profit(totals: &[Total]) -> Value {
    ranked_rows("Profit by segment", totals, "Profit", "Segment")
}

pub fn discount_profit(points: &[Point]) -> Value {
    scatter("Discount vs profit", points, "Discount", "Profit")
}

pub fn monthly_sales_by_segment(rows: &[MonthlySales]) -> Value {
    spec(
        "Sales by segment over the year",
        rows,
        json!({ "type": "line", "point": true }),
        json!({
            "x": { "field": "month", "type": "ordinal", "title": "Month" },
            "y": { "field": "sales", "type": "quantitative", "title": "Sales" },
            "color": { "field": "segment", "type": "nominal", "title": "Segment" },
        }),
    )
}

pub fn category_by_region(rows: &[RegionCategorySales]) -> Value {
    spec(
        "Best-selling categories by region",
        rows,
        json!("bar"),
        json!({
            "x": { "field": "region", "type": "nominal", "title": "Region" },
            "y": { "field": "sales", "type": "quantitative", "title": "Sales" },
            "color": { "field": "category", "type": "nominal", "title": "Category" },
        }),
    )
}

pub fn discount_quantity(points: &[Point]) -> Value {
    scatter("Discount vs quantity sold", points, "Discount", "Quantity")
}

pub fn top_order_ticket(totals: &[Total], n: usize) -> Value {
    ranked_columns(
        &format!("Top {} orders by total value", n),
        totals,
        "Order ID",
        "Order total",
    )
}

pub fn profit_by_region(totals: &[Total]) -> Value {
    ranked_columns("Profit by region", totals, "Region", "Total profit")
}

pub fn top_customers_avg_ticket(totals: &[Total], n: usize) -> Value {
    ranked_rows(
        &format!("Top {} customers by average ticket", n),
        totals,
        "Average ticket",
        "Customer",
    )
}

pub fn purchase_distribution(rows: &[PurchaseFrequency]) -> Value {
    spec(
        "Purchases per user",
        rows,
        json!("bar"),
        json!({
            "x": { "field": "purchases", "type": "ordinal", "title": "Purchases" },
            "y": { "field": "users", "type": "quantitative", "title": "Users" },
            "tooltip": [{ "field": "purchases" }, { "field": "users" }],
        }),
    )
}

pub fn repeat_user_products(rows: &[ProductCount]) -> Value {
    spec(
        "Most purchased products by users with 2+ purchases",
        rows,
        json!("bar"),
        json!({
            "x": { "field": "product", "type": "nominal", "sort": "-y", "title": "Product" },
            "y": { "field": "count", "type": "quantitative", "title": "Purchases" },
            "tooltip": [{ "field": "product" }, { "field": "count" }],
        }),
    )
}

pub fn discount_buckets(rows: &[BucketCount]) -> Value {
    let order: Vec<&str> = crate::preprocess::DiscountBucket::ALL
        .iter()
        .map(|b| b.label())
        .collect();
    spec(
        "Purchases by discount range",
        rows,
        json!("bar"),
        json!({
            "x": { "field": "bucket", "type": "ordinal", "sort": order, "title": "Discount" },
            "y": { "field": "count", "type": "quantitative", "title": "Purchases" },
        }),
    )
}
