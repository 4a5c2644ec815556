//! "Customers who bought X also bought" lookup.
//!
//! Recommendations are raw co-occurrence counts over the customers that
//! bought a product; there is no scoring beyond the count.

use crate::aggregate::{value_counts, ProductCount};
use crate::error::{DashError, Result};
use crate::fields::orders;
use crate::table::Table;
use crate::view::{RowSource, RowSubset};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;

pub const DEFAULT_LIMIT: usize = 10;

/// One purchase of the selected product.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Buyer {
    pub customer: String,
    pub order_id: String,
    pub order_date: Option<NaiveDate>,
}

/// Distinct `(customer, order, date)` rows in which `product` was bought,
/// in table order.
pub fn buyers_of(table: &Table, product: &str) -> Result<Vec<Buyer>> {
    let idx = table.require(&[
        orders::PRODUCT_NAME,
        orders::CUSTOMER_NAME,
        orders::ORDER_ID,
        orders::ORDER_DATE,
    ])?;

    let mut seen = HashSet::new();
    let mut buyers = Vec::new();
    for row in 0..table.len() {
        if table.str_at(row, idx[0]) != Some(product) {
            continue;
        }
        let buyer = Buyer {
            customer: table.str_at(row, idx[1]).unwrap_or_default().to_string(),
            order_id: table.str_at(row, idx[2]).unwrap_or_default().to_string(),
            order_date: table.date_at(row, idx[3]),
        };
        if seen.insert(buyer.clone()) {
            buyers.push(buyer);
        }
    }
    Ok(buyers)
}

/// Products most often bought by the customers who bought `product`.
///
/// All lines of those customers count, not only the orders containing
/// `product`. The result never contains `product` itself and is empty
/// when nobody bought it.
pub fn recommend(table: &Table, product: &str, limit: usize) -> Result<Vec<ProductCount>> {
    let idx = table.require(&[orders::PRODUCT_NAME, orders::CUSTOMER_NAME])?;
    let (product_idx, customer_idx) = (idx[0], idx[1]);

    let customers: HashSet<&str> = (0..table.len())
        .filter(|&row| table.str_at(row, product_idx) == Some(product))
        .filter_map(|row| table.str_at(row, customer_idx))
        .collect();
    if customers.is_empty() {
        return Ok(Vec::new());
    }

    let co_purchases = RowSubset::filter(table, |t, row| {
        t.str_at(row, customer_idx).map_or(false, |c| customers.contains(c))
            && t.str_at(row, product_idx).map_or(false, |p| p != product)
    });
    log::debug!(
        "{} customers bought '{}', {} other lines considered",
        customers.len(),
        product,
        co_purchases.row_count()
    );

    Ok(value_counts(&co_purchases, orders::PRODUCT_NAME)?
        .into_iter()
        .take(limit)
        .map(|(product, count)| ProductCount { product, count })
        .collect())
}

/// Buyers and recommendations for a product known to the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductDetail {
    pub product: String,
    pub buyers: Vec<Buyer>,
    pub recommendations: Vec<ProductCount>,
}

pub fn product_detail(table: &Table, product: &str, limit: usize) -> Result<ProductDetail> {
    let buyers = buyers_of(table, product)?;
    if buyers.is_empty() {
        return Err(DashError::UnknownProduct(product.to_string()));
    }
    Ok(ProductDetail {
        product: product.to_string(),
        buyers,
        recommendations: recommend(table, product, limit)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{ColumnType, ColumnValue};
    use crate::table::Schema;
    use std::collections::HashMap;

    fn orders_table(lines: &[(&str, &str, &str)]) -> Table {
        // (customer, order id, product)
        let schema = Schema::new(vec![
            (orders::CUSTOMER_NAME.to_string(), ColumnType::String, true),
            (orders::ORDER_ID.to_string(), ColumnType::String, true),
            (orders::ORDER_DATE.to_string(), ColumnType::Date, true),
            (orders::PRODUCT_NAME.to_string(), ColumnType::String, true),
        ]);
        let mut table = Table::new("orders", schema);
        let date = NaiveDate::from_ymd_opt(2016, 11, 8).unwrap();
        for (customer, order, product) in lines {
            let mut row = HashMap::new();
            row.insert(orders::CUSTOMER_NAME.to_string(), ColumnValue::String(customer.to_string()));
            row.insert(orders::ORDER_ID.to_string(), ColumnValue::String(order.to_string()));
            row.insert(orders::ORDER_DATE.to_string(), ColumnValue::Date(date));
            row.insert(orders::PRODUCT_NAME.to_string(), ColumnValue::String(product.to_string()));
            table.append_row(row).unwrap();
        }
        table
    }

    fn sample() -> Table {
        orders_table(&[
            ("Ann", "O1", "Stapler"),
            ("Ann", "O1", "Paper"),
            ("Ann", "O2", "Binder"),
            ("Bob", "O3", "Stapler"),
            ("Bob", "O3", "Stapler"),
            ("Bob", "O3", "Binder"),
            ("Cid", "O4", "Chair"),
            ("Cid", "O4", "Paper"),
        ])
    }

    #[test]
    fn test_recommend_counts_all_lines_of_buyers() {
        let recs = recommend(&sample(), "Stapler", DEFAULT_LIMIT).unwrap();
        let flat: Vec<(&str, u64)> = recs.iter().map(|r| (r.product.as_str(), r.count)).collect();
        // Binder twice (Ann O2, Bob O3), Paper once (Ann); Cid is not a buyer.
        assert_eq!(flat, vec![("Binder", 2), ("Paper", 1)]);
    }

    #[test]
    fn test_recommend_never_contains_selected_product() {
        let table = sample();
        for product in table.distinct_strings(orders::PRODUCT_NAME).unwrap() {
            let recs = recommend(&table, &product, DEFAULT_LIMIT).unwrap();
            assert!(recs.iter().all(|r| r.product != product));
            assert!(recs.len() <= DEFAULT_LIMIT);
        }
    }

    #[test]
    fn test_recommend_ties_keep_first_seen_order() {
        let table = orders_table(&[
            ("Ann", "O1", "Lamp"),
            ("Ann", "O1", "Zebra Pen"),
            ("Ann", "O1", "Apple Pen"),
        ]);
        let recs = recommend(&table, "Lamp", 1).unwrap();
        assert_eq!(recs, vec![ProductCount { product: "Zebra Pen".to_string(), count: 1 }]);
    }

    #[test]
    fn test_unknown_product() {
        assert!(recommend(&sample(), "Sofa", DEFAULT_LIMIT).unwrap().is_empty());
        assert!(matches!(
            product_detail(&sample(), "Sofa", DEFAULT_LIMIT),
            Err(DashError::UnknownProduct(_))
        ));
    }

    #[test]
    fn test_buyers_are_distinct() {
        let buyers = buyers_of(&sample(), "Stapler").unwrap();
        let ids: Vec<(&str, &str)> = buyers
            .iter()
            .map(|b| (b.customer.as_str(), b.order_id.as_str()))
            .collect();
        assert_eq!(ids, vec![("Ann", "O1"), ("Bob", "O3")]);
    }
}
