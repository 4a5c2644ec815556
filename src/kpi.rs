//! KPI tiles shown above the charts.

use crate::error::Result;
use crate::fields::orders;
use crate::view::{RowSource, RowSubset};
use num_format::{Locale, ToFormattedString};
use serde::Serialize;
use std::collections::HashSet;

/// Headline figures split by whether a line carried a discount.
///
/// A line is discounted when `Discount > 0` and undiscounted when
/// `Discount == 0`; lines with a missing discount count in neither.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpis {
    pub discounted_profit: f64,
    pub undiscounted_profit: f64,
    pub discounted_sales: f64,
    pub undiscounted_sales: f64,
    pub total_orders: usize,
    pub discounted_orders: usize,
}

/// A formatted tile, ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KpiTile {
    pub title: &'static str,
    pub value: String,
}

impl Kpis {
    pub fn compute<S: RowSource + ?Sized>(rows: &S) -> Result<Self> {
        let table = rows.table();
        let idx = table.require(&[
            orders::DISCOUNT,
            orders::PROFIT,
            orders::SALES,
            orders::ORDER_ID,
        ])?;
        let (discount, profit, sales, order_id) = (idx[0], idx[1], idx[2], idx[3]);

        let discounted = RowSubset::filter(rows, |t, row| t.f64_at(row, discount).map_or(false, |d| d > 0.0));
        let undiscounted = RowSubset::filter(rows, |t, row| t.f64_at(row, discount) == Some(0.0));

        Ok(Kpis {
            discounted_profit: column_sum(&discounted, profit),
            undiscounted_profit: column_sum(&undiscounted, profit),
            discounted_sales: column_sum(&discounted, sales),
            undiscounted_sales: column_sum(&undiscounted, sales),
            total_orders: distinct_count(rows, order_id),
            discounted_orders: distinct_count(&discounted, order_id),
        })
    }

    /// The six tiles in display order: first row discounted, second row not.
    pub fn tiles(&self) -> Vec<KpiTile> {
        vec![
            KpiTile { title: "Discounted profit", value: format_millions(self.discounted_profit) },
            KpiTile { title: "Discounted sales", value: format_whole(self.discounted_sales) },
            KpiTile { title: "Total orders", value: format_count(self.total_orders) },
            KpiTile { title: "Undiscounted profit", value: format_millions(self.undiscounted_profit) },
            KpiTile { title: "Undiscounted sales", value: format_whole(self.undiscounted_sales) },
            KpiTile { title: "Discounted orders", value: format_count(self.discounted_orders) },
        ]
    }
}

fn column_sum<S: RowSource + ?Sized>(rows: &S, col: usize) -> f64 {
    let table = rows.table();
    rows.row_indices().filter_map(|row| table.f64_at(row, col)).sum()
}

fn distinct_count<S: RowSource + ?Sized>(rows: &S, col: usize) -> usize {
    let table = rows.table();
    rows.row_indices()
        .filter_map(|row| table.str_at(row, col))
        .collect::<HashSet<_>>()
        .len()
}

/// `1234567.0` becomes `"1.235M"`.
pub fn format_millions(value: f64) -> String {
    format!("{:.3}M", value / 1e6)
}

/// Rounded to a whole number with thousands separators: `"1,234,568"`.
pub fn format_whole(value: f64) -> String {
    (value.round() as i64).to_formatted_string(&Locale::en)
}

pub fn format_count(value: usize) -> String {
    value.to_formatted_string(&Locale::en)
}
