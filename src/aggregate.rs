//! Aggregation catalog.
//!
//! Every function here is pure: it reads a [`RowSource`] and returns a small
//! summary. Conventions shared by the whole catalog:
//!
//! - rows whose group key is missing are dropped;
//! - missing values are skipped by sums, means and counts;
//! - grouped results come out in ascending key order;
//! - "top N" results are a stable descending sort on the reduced value, so
//!   ties keep the ascending key order they had after grouping.

use crate::column::ColumnValue;
use crate::error::Result;
use crate::fields::{orders, purchases};
use crate::preprocess::DiscountBucket;
use crate::view::{RowSource, RowSubset};
use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

pub const TOP_STATES: usize = 10;
pub const TOP_ORDERS: usize = 20;
pub const TOP_CUSTOMERS: usize = 15;

/// Reduction applied to the values of each group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Sum,
    Mean,
    Count,
}

/// One group of a `group_by` result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    pub keys: Vec<ColumnValue>,
    pub value: f64,
}

/// Orderable form of a key cell.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum KeyPart {
    Int(i64),
    Date(NaiveDate),
    Text(String),
}

impl KeyPart {
    fn from_value(value: &ColumnValue) -> Option<Self> {
        match value {
            ColumnValue::Int64(v) => Some(KeyPart::Int(*v)),
            ColumnValue::Bool(v) => Some(KeyPart::Int(*v as i64)),
            ColumnValue::Date(v) => Some(KeyPart::Date(*v)),
            ColumnValue::String(v) => Some(KeyPart::Text(v.clone())),
            ColumnValue::Float64(_) | ColumnValue::Null => None,
        }
    }

    fn into_value(self) -> ColumnValue {
        match self {
            KeyPart::Int(v) => ColumnValue::Int64(v),
            KeyPart::Date(v) => ColumnValue::Date(v),
            KeyPart::Text(v) => ColumnValue::String(v),
        }
    }
}

#[derive(Default)]
struct Accumulator {
    sum: f64,
    count: usize,
}

/// Group `rows` by the `keys` columns and reduce the `value` column.
///
/// `Sum` and `Mean` groups with no present values are omitted, so a group
/// whose every value is missing never shows up as a zero.
pub fn group_by<S: RowSource + ?Sized>(
    rows: &S,
    keys: &[&str],
    value: &str,
    function: AggregateFunction,
) -> Result<Vec<Group>> {
    let table = rows.table();
    let key_idx = table.require(keys)?;
    let value_idx = table.require(&[value])?[0];

    let mut groups: BTreeMap<Vec<KeyPart>, Accumulator> = BTreeMap::new();
    'rows: for row in rows.row_indices() {
        let mut key = Vec::with_capacity(key_idx.len());
        for &idx in &key_idx {
            match table.value_at(row, idx).and_then(KeyPart::from_value) {
                Some(part) => key.push(part),
                None => continue 'rows,
            }
        }

        let acc = groups.entry(key).or_default();
        match function {
            AggregateFunction::Count => {
                if table.value_at(row, value_idx).map_or(false, |v| !v.is_null()) {
                    acc.count += 1;
                }
            }
            AggregateFunction::Sum | AggregateFunction::Mean => {
                if let Some(v) = table.f64_at(row, value_idx) {
                    acc.sum += v;
                    acc.count += 1;
                }
            }
        }
    }

    Ok(groups
        .into_iter()
        .filter_map(|(key, acc)| {
            let value = match function {
                AggregateFunction::Count => acc.count as f64,
                AggregateFunction::Sum | AggregateFunction::Mean if acc.count == 0 => return None,
                AggregateFunction::Sum => acc.sum,
                AggregateFunction::Mean => acc.sum / acc.count as f64,
            };
            Some(Group {
                keys: key.into_iter().map(KeyPart::into_value).collect(),
                value,
            })
        })
        .collect())
}

/// Occurrences of each non-null string in `column`, most frequent first.
/// Ties keep first-encountered order.
pub fn value_counts<S: RowSource + ?Sized>(rows: &S, column: &str) -> Result<Vec<(String, u64)>> {
    let table = rows.table();
    let idx = table.require(&[column])?[0];

    let mut position: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<(&str, u64)> = Vec::new();
    for row in rows.row_indices() {
        if let Some(value) = table.str_at(row, idx) {
            match position.get(value) {
                Some(&pos) => counts[pos].1 += 1,
                None => {
                    position.insert(value, counts.len());
                    counts.push((value, 1));
                }
            }
        }
    }

    counts.sort_by(|a, b| b.1.cmp(&a.1));
    Ok(counts.into_iter().map(|(v, c)| (v.to_string(), c)).collect())
}

/// Stable descending sort on `key`, then truncate to `n`.
pub fn top_n<T, F>(mut items: Vec<T>, n: usize, key: F) -> Vec<T>
where
    F: Fn(&T) -> f64,
{
    sort_desc(&mut items, key);
    items.truncate(n);
    items
}

fn sort_desc<T, F>(items: &mut [T], key: F)
where
    F: Fn(&T) -> f64,
{
    items.sort_by(|a, b| key(b).partial_cmp(&key(a)).unwrap_or(Ordering::Equal));
}

// ============================================================================
// Summary shapes
// ============================================================================

/// A labelled total (state, segment, region, order, customer).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Total {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySales {
    pub month: i64,
    pub segment: String,
    pub sales: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionCategorySales {
    pub region: String,
    pub category: String,
    pub sales: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurchaseFrequency {
    pub purchases: u64,
    pub users: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductCount {
    pub product: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketCount {
    pub bucket: DiscountBucket,
    pub count: u64,
}

fn text_key(value: &ColumnValue) -> String {
    match value {
        ColumnValue::String(s) => s.clone(),
        ColumnValue::Int64(v) => v.to_string(),
        ColumnValue::Date(d) => d.format("%Y-%m-%d").to_string(),
        other => format!("{:?}", other),
    }
}

fn totals(groups: Vec<Group>) -> Vec<Total> {
    groups
        .into_iter()
        .map(|g| Total {
            label: g.keys.first().map(text_key).unwrap_or_default(),
            value: g.value,
        })
        .collect()
}

fn points<S: RowSource + ?Sized>(rows: &S, x: &str, y: &str) -> Result<Vec<Point>> {
    let table = rows.table();
    let idx = table.require(&[x, y])?;
    Ok(rows
        .row_indices()
        .filter_map(|row| {
            Some(Point {
                x: table.f64_at(row, idx[0])?,
                y: table.f64_at(row, idx[1])?,
            })
        })
        .collect())
}

// ============================================================================
// Orders catalog
// ============================================================================

/// States ranked by sales on discounted lines (`Discount > 0`), top 10.
pub fn top_states_by_discounted_sales<S: RowSource + ?Sized>(rows: &S) -> Result<Vec<Total>> {
    let table = rows.table();
    let discount = table.require(&[orders::STATE, orders::SALES, orders::DISCOUNT])?[2];
    let discounted = RowSubset::filter(rows, |t, row| t.f64_at(row, discount).map_or(false, |d| d > 0.0));

    let groups = group_by(&discounted, &[orders::STATE], orders::SALES, AggregateFunction::Sum)?;
    Ok(top_n(totals(groups), TOP_STATES, |t| t.value))
}

pub fn profit_by_segment<S: RowSource + ?Sized>(rows: &S) -> Result<Vec<Total>> {
    let groups = group_by(rows, &[orders::SEGMENT], orders::PROFIT, AggregateFunction::Sum)?;
    let mut result = totals(groups);
    sort_desc(&mut result, |t| t.value);
    Ok(result)
}

pub fn discount_vs_profit<S: RowSource + ?Sized>(rows: &S) -> Result<Vec<Point>> {
    points(rows, orders::DISCOUNT, orders::PROFIT)
}

/// Sales per (month, segment), ordered by month then segment.
pub fn monthly_sales_by_segment<S: RowSource + ?Sized>(rows: &S) -> Result<Vec<MonthlySales>> {
    let groups = group_by(
        rows,
        &[orders::MONTH, orders::SEGMENT],
        orders::SALES,
        AggregateFunction::Sum,
    )?;
    Ok(groups
        .into_iter()
        .filter_map(|g| {
            Some(MonthlySales {
                month: g.keys.first()?.as_i64()?,
                segment: g.keys.get(1).map(text_key)?,
                sales: g.value,
            })
        })
        .collect())
}

pub fn category_sales_by_region<S: RowSource + ?Sized>(rows: &S) -> Result<Vec<RegionCategorySales>> {
    let groups = group_by(
        rows,
        &[orders::REGION, orders::CATEGORY],
        orders::SALES,
        AggregateFunction::Sum,
    )?;
    Ok(groups
        .into_iter()
        .filter_map(|g| {
            Some(RegionCategorySales {
                region: g.keys.first().map(text_key)?,
                category: g.keys.get(1).map(text_key)?,
                sales: g.value,
            })
        })
        .collect())
}

pub fn discount_vs_quantity<S: RowSource + ?Sized>(rows: &S) -> Result<Vec<Point>> {
    points(rows, orders::DISCOUNT, orders::QUANTITY)
}

/// Orders ranked by their total sales (the "ticket"), top `n`.
pub fn top_orders_by_ticket<S: RowSource + ?Sized>(rows: &S, n: usize) -> Result<Vec<Total>> {
    let groups = group_by(rows, &[orders::ORDER_ID], orders::SALES, AggregateFunction::Sum)?;
    Ok(top_n(totals(groups), n, |t| t.value))
}

pub fn profit_by_region<S: RowSource + ?Sized>(rows: &S) -> Result<Vec<Total>> {
    let groups = group_by(rows, &[orders::REGION], orders::PROFIT, AggregateFunction::Sum)?;
    let mut result = totals(groups);
    sort_desc(&mut result, |t| t.value);
    Ok(result)
}

/// Customers ranked by their mean order total, top 15.
pub fn top_customers_avg_ticket<S: RowSource + ?Sized>(rows: &S) -> Result<Vec<Total>> {
    let per_order = group_by(
        rows,
        &[orders::CUSTOMER_NAME, orders::ORDER_ID],
        orders::SALES,
        AggregateFunction::Sum,
    )?;

    let mut per_customer: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for group in per_order {
        if let Some(customer) = group.keys.first() {
            let entry = per_customer.entry(text_key(customer)).or_default();
            entry.0 += group.value;
            entry.1 += 1;
        }
    }

    let averages = per_customer
        .into_iter()
        .map(|(label, (sum, order_count))| Total {
            label,
            value: sum / order_count as f64,
        })
        .collect();
    Ok(top_n(averages, TOP_CUSTOMERS, |t| t.value))
}

// ============================================================================
// Purchases catalog
// ============================================================================

/// How many users made 1, 2, 3, ... purchases, by purchase count ascending.
pub fn purchase_count_distribution<S: RowSource + ?Sized>(rows: &S) -> Result<Vec<PurchaseFrequency>> {
    let per_user = value_counts(rows, purchases::USER_ID)?;

    let mut frequency: BTreeMap<u64, u64> = BTreeMap::new();
    for (_, count) in per_user {
        *frequency.entry(count).or_default() += 1;
    }
    Ok(frequency
        .into_iter()
        .map(|(purchases, users)| PurchaseFrequency { purchases, users })
        .collect())
}

/// Product popularity among users with at least two purchases, most
/// purchased first.
pub fn most_purchased_by_repeat_users<S: RowSource + ?Sized>(rows: &S) -> Result<Vec<ProductCount>> {
    let table = rows.table();
    let user_idx = table.require(&[purchases::USER_ID, purchases::PRODUCT_NAME])?[0];

    let repeat_users: HashSet<String> = value_counts(rows, purchases::USER_ID)?
        .into_iter()
        .filter(|(_, count)| *count >= 2)
        .map(|(user, _)| user)
        .collect();

    let repeat_rows = RowSubset::filter(rows, |t, row| {
        t.str_at(row, user_idx).map_or(false, |u| repeat_users.contains(u))
    });

    Ok(value_counts(&repeat_rows, purchases::PRODUCT_NAME)?
        .into_iter()
        .map(|(product, count)| ProductCount { product, count })
        .collect())
}

/// Mean over users of their total spend, divided by twelve months.
/// Users without any parseable price are left out; `None` when no user has one.
pub fn avg_monthly_spend_per_user<S: RowSource + ?Sized>(rows: &S) -> Result<Option<f64>> {
    let per_user = group_by(
        rows,
        &[purchases::USER_ID],
        purchases::ACTUAL_PRICE,
        AggregateFunction::Mean,
    )?;
    let counts = group_by(
        rows,
        &[purchases::USER_ID],
        purchases::ACTUAL_PRICE,
        AggregateFunction::Count,
    )?;

    // sum = mean * count, only over users that have a mean
    let count_of: HashMap<String, f64> = counts
        .into_iter()
        .filter_map(|g| Some((g.keys.first().map(text_key)?, g.value)))
        .collect();
    let spends: Vec<f64> = per_user
        .into_iter()
        .filter_map(|g| {
            let user = g.keys.first().map(text_key)?;
            Some(g.value * count_of.get(&user).copied()?)
        })
        .collect();

    if spends.is_empty() {
        return Ok(None);
    }
    let mean = spends.iter().sum::<f64>() / spends.len() as f64;
    Ok(Some(mean / 12.0))
}

/// Purchase records per discount range, in range order. Every range is
/// listed, including empty ones; values outside `[0, 100]` are not counted.
pub fn discount_bucket_distribution<S: RowSource + ?Sized>(rows: &S) -> Result<Vec<BucketCount>> {
    let table = rows.table();
    let idx = table.require(&[purchases::DISCOUNT_PERCENTAGE])?[0];

    let mut counts: BTreeMap<DiscountBucket, u64> =
        DiscountBucket::ALL.iter().map(|b| (*b, 0)).collect();
    for row in rows.row_indices() {
        if let Some(bucket) = table.f64_at(row, idx).and_then(DiscountBucket::classify) {
            *counts.entry(bucket).or_default() += 1;
        }
    }
    Ok(counts
        .into_iter()
        .map(|(bucket, count)| BucketCount { bucket, count })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnType;
    use crate::table::{Schema, Table};
    use std::collections::HashMap;

    fn orders_table(rows: &[(&str, &str, &str, f64, f64, f64)]) -> Table {
        // (order id, state, segment, discount, sales, profit)
        let schema = Schema::new(vec![
            (orders::ORDER_ID.to_string(), ColumnType::String, true),
            (orders::STATE.to_string(), ColumnType::String, true),
            (orders::SEGMENT.to_string(), ColumnType::String, true),
            (orders::DISCOUNT.to_string(), ColumnType::Float64, true),
            (orders::SALES.to_string(), ColumnType::Float64, true),
            (orders::PROFIT.to_string(), ColumnType::Float64, true),
        ]);
        let mut table = Table::new("orders", schema);
        for (id, state, segment, discount, sales, profit) in rows {
            let mut row = HashMap::new();
            row.insert(orders::ORDER_ID.to_string(), ColumnValue::String(id.to_string()));
            row.insert(orders::STATE.to_string(), ColumnValue::String(state.to_string()));
            row.insert(orders::SEGMENT.to_string(), ColumnValue::String(segment.to_string()));
            row.insert(orders::DISCOUNT.to_string(), ColumnValue::Float64(*discount));
            row.insert(orders::SALES.to_string(), ColumnValue::Float64(*sales));
            row.insert(orders::PROFIT.to_string(), ColumnValue::Float64(*profit));
            table.append_row(row).unwrap();
        }
        table
    }

    fn purchases_table(rows: &[(&str, &str, Option<f64>, Option<f64>)]) -> Table {
        let schema = Schema::new(vec![
            (purchases::USER_ID.to_string(), ColumnType::String, true),
            (purchases::PRODUCT_NAME.to_string(), ColumnType::String, true),
            (purchases::ACTUAL_PRICE.to_string(), ColumnType::Float64, true),
            (purchases::DISCOUNT_PERCENTAGE.to_string(), ColumnType::Float64, true),
        ]);
        let mut table = Table::new("purchases", schema);
        let opt = |v: &Option<f64>| v.map_or(ColumnValue::Null, ColumnValue::Float64);
        for (user, product, price, discount) in rows {
            let mut row = HashMap::new();
            row.insert(purchases::USER_ID.to_string(), ColumnValue::String(user.to_string()));
            row.insert(purchases::PRODUCT_NAME.to_string(), ColumnValue::String(product.to_string()));
            row.insert(purchases::ACTUAL_PRICE.to_string(), opt(price));
            row.insert(purchases::DISCOUNT_PERCENTAGE.to_string(), opt(discount));
            table.append_row(row).unwrap();
        }
        table
    }

    #[test]
    fn test_top_states_excludes_undiscounted_rows() {
        let table = orders_table(&[
            ("A", "TX", "Consumer", 0.1, 100.0, 1.0),
            ("B", "TX", "Consumer", 0.0, 50.0, 1.0),
            ("C", "CA", "Consumer", 0.2, 200.0, 1.0),
        ]);

        let result = top_states_by_discounted_sales(&table).unwrap();
        assert_eq!(
            result,
            vec![
                Total { label: "CA".to_string(), value: 200.0 },
                Total { label: "TX".to_string(), value: 100.0 },
            ]
        );
    }

    #[test]
    fn test_top_n_is_bounded_and_non_increasing() {
        let rows: Vec<(String, String)> = (0..30)
            .map(|i| (format!("O-{:02}", i), format!("S{:02}", i % 13)))
            .collect();
        let lines: Vec<(&str, &str, &str, f64, f64, f64)> = rows
            .iter()
            .enumerate()
            .map(|(i, (id, state))| (id.as_str(), state.as_str(), "Consumer", 0.1, (i * 7 % 11) as f64, 0.0))
            .collect();
        let table = orders_table(&lines);

        let states = top_states_by_discounted_sales(&table).unwrap();
        assert!(states.len() <= TOP_STATES);
        assert!(states.windows(2).all(|w| w[0].value >= w[1].value));

        let tickets = top_orders_by_ticket(&table, 5).unwrap();
        assert_eq!(tickets.len(), 5);
        assert!(tickets.windows(2).all(|w| w[0].value >= w[1].value));
    }

    #[test]
    fn test_profit_by_segment_partitions_total() {
        let table = orders_table(&[
            ("A", "TX", "Consumer", 0.1, 100.0, 12.5),
            ("B", "TX", "Corporate", 0.0, 50.0, -4.0),
            ("C", "CA", "Home Office", 0.2, 200.0, 30.25),
            ("D", "CA", "Consumer", 0.0, 20.0, 7.0),
        ]);

        let result = profit_by_segment(&table).unwrap();
        let grouped: f64 = result.iter().map(|t| t.value).sum();
        assert!((grouped - table.sum(orders::PROFIT).unwrap()).abs() < 1e-9);
        assert_eq!(result[0].label, "Home Office");
        assert_eq!(result.last().unwrap().label, "Corporate");
    }

    #[test]
    fn test_missing_values_are_skipped_not_propagated() {
        let mut table = orders_table(&[("A", "TX", "Consumer", 0.1, 100.0, 10.0)]);
        let mut row = HashMap::new();
        row.insert(orders::ORDER_ID.to_string(), ColumnValue::String("B".to_string()));
        row.insert(orders::STATE.to_string(), ColumnValue::String("TX".to_string()));
        row.insert(orders::SEGMENT.to_string(), ColumnValue::String("Consumer".to_string()));
        row.insert(orders::DISCOUNT.to_string(), ColumnValue::Float64(0.3));
        row.insert(orders::SALES.to_string(), ColumnValue::Float64(f64::NAN));
        row.insert(orders::PROFIT.to_string(), ColumnValue::Null);
        table.append_row(row).unwrap();

        let states = top_states_by_discounted_sales(&table).unwrap();
        assert_eq!(states[0].value, 100.0);
        let segments = profit_by_segment(&table).unwrap();
        assert_eq!(segments[0].value, 10.0);
        assert_eq!(discount_vs_profit(&table).unwrap().len(), 1);
    }

    #[test]
    fn test_top_customers_average_per_order() {
        let schema = Schema::new(vec![
            (orders::CUSTOMER_NAME.to_string(), ColumnType::String, true),
            (orders::ORDER_ID.to_string(), ColumnType::String, true),
            (orders::SALES.to_string(), ColumnType::Float64, true),
        ]);
        let mut table = Table::new("orders", schema);
        for (customer, order, sales) in [
            ("Ann", "O1", 100.0),
            ("Ann", "O1", 50.0),
            ("Ann", "O2", 50.0),
            ("Bob", "O3", 120.0),
        ] {
            let mut row = HashMap::new();
            row.insert(orders::CUSTOMER_NAME.to_string(), ColumnValue::String(customer.to_string()));
            row.insert(orders::ORDER_ID.to_string(), ColumnValue::String(order.to_string()));
            row.insert(orders::SALES.to_string(), ColumnValue::Float64(sales));
            table.append_row(row).unwrap();
        }

        // Ann: (150 + 50) / 2 = 100, Bob: 120
        let result = top_customers_avg_ticket(&table).unwrap();
        assert_eq!(result[0], Total { label: "Bob".to_string(), value: 120.0 });
        assert_eq!(result[1], Total { label: "Ann".to_string(), value: 100.0 });
    }

    #[test]
    fn test_orders_without_any_sales_are_not_zero_tickets() {
        let csv = "\
Order ID,Customer Name,Sales
O-1,Ann,\"100,0\"
O-2,Ann,oops
O-3,Bob,\"40,0\"
";
        let table = crate::loader::read_orders_csv(csv.as_bytes(), crate::loader::LoadOptions::default()).unwrap();

        let averages = top_customers_avg_ticket(&table).unwrap();
        assert_eq!(
            averages,
            vec![
                Total { label: "Ann".to_string(), value: 100.0 },
                Total { label: "Bob".to_string(), value: 40.0 },
            ]
        );

        let tickets = top_orders_by_ticket(&table, TOP_ORDERS).unwrap();
        let labels: Vec<&str> = tickets.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, vec!["O-1", "O-3"]);
    }

    #[test]
    fn test_group_by_orders_keys_and_drops_missing_keys() {
        let schema = Schema::new(vec![
            (orders::MONTH.to_string(), ColumnType::Int64, true),
            (orders::SEGMENT.to_string(), ColumnType::String, true),
            (orders::SALES.to_string(), ColumnType::Float64, true),
        ]);
        let mut table = Table::new("orders", schema);
        for (month, segment, sales) in [
            (ColumnValue::Int64(11), "Consumer", 10.0),
            (ColumnValue::Int64(2), "Corporate", 5.0),
            (ColumnValue::Int64(11), "Consumer", 2.5),
            (ColumnValue::Null, "Consumer", 99.0),
            (ColumnValue::Int64(2), "Consumer", 1.0),
        ] {
            let mut row = HashMap::new();
            row.insert(orders::MONTH.to_string(), month);
            row.insert(orders::SEGMENT.to_string(), ColumnValue::String(segment.to_string()));
            row.insert(orders::SALES.to_string(), ColumnValue::Float64(sales));
            table.append_row(row).unwrap();
        }

        let result = monthly_sales_by_segment(&table).unwrap();
        let flat: Vec<(i64, &str, f64)> = result
            .iter()
            .map(|m| (m.month, m.segment.as_str(), m.sales))
            .collect();
        assert_eq!(
            flat,
            vec![(2, "Consumer", 1.0), (2, "Corporate", 5.0), (11, "Consumer", 12.5)]
        );

        let counts = group_by(&table, &[orders::MONTH], orders::SALES, AggregateFunction::Count).unwrap();
        assert_eq!(counts.iter().map(|g| g.value).collect::<Vec<_>>(), vec![2.0, 2.0]);
    }

    #[test]
    fn test_missing_column_is_reported() {
        let table = orders_table(&[("A", "TX", "Consumer", 0.1, 100.0, 1.0)]);
        let err = profit_by_region(&table).unwrap_err();
        assert!(err.to_string().contains("Region"));
    }

    #[test]
    fn test_repeat_user_products() {
        let table = purchases_table(&[
            ("U1", "P1", Some(10.0), Some(4.0)),
            ("U1", "P2", Some(20.0), Some(7.0)),
            ("U2", "P1", Some(30.0), Some(15.0)),
            ("U3", "P2", Some(40.0), Some(45.0)),
            ("U3", "P3", Some(50.0), Some(60.0)),
        ]);

        let result = most_purchased_by_repeat_users(&table).unwrap();
        let flat: Vec<(&str, u64)> = result.iter().map(|p| (p.product.as_str(), p.count)).collect();
        assert_eq!(flat, vec![("P2", 2), ("P1", 1), ("P3", 1)]);
    }

    #[test]
    fn test_purchase_count_distribution() {
        let table = purchases_table(&[
            ("U1", "P1", None, None),
            ("U1", "P2", None, None),
            ("U2", "P1", None, None),
            ("U3", "P2", None, None),
            ("U3", "P3", None, None),
            ("U3", "P4", None, None),
        ]);

        let result = purchase_count_distribution(&table).unwrap();
        assert_eq!(
            result,
            vec![
                PurchaseFrequency { purchases: 1, users: 1 },
                PurchaseFrequency { purchases: 2, users: 1 },
                PurchaseFrequency { purchases: 3, users: 1 },
            ]
        );
    }

    #[test]
    fn test_avg_monthly_spend_per_user() {
        let table = purchases_table(&[
            ("U1", "P1", Some(600.0), None),
            ("U1", "P2", Some(600.0), None),
            ("U2", "P1", Some(2400.0), None),
            ("U3", "P1", None, None),
        ]);
        // U1 spends 1200, U2 2400, U3 has no price: mean 1800 / 12
        let spend = avg_monthly_spend_per_user(&table).unwrap().unwrap();
        assert!((spend - 150.0).abs() < 1e-9);

        let empty = purchases_table(&[("U1", "P1", None, None)]);
        assert_eq!(avg_monthly_spend_per_user(&empty).unwrap(), None);
    }

    #[test]
    fn test_discount_bucket_distribution() {
        let table = purchases_table(&[
            ("U1", "P1", None, Some(4.0)),
            ("U1", "P2", None, Some(7.0)),
            ("U2", "P1", None, Some(15.0)),
            ("U3", "P2", None, Some(45.0)),
            ("U3", "P3", None, Some(60.0)),
            ("U4", "P3", None, Some(120.0)),
            ("U4", "P4", None, None),
        ]);

        let result = discount_bucket_distribution(&table).unwrap();
        let counts: Vec<(&str, u64)> = result.iter().map(|b| (b.bucket.label(), b.count)).collect();
        assert_eq!(
            counts,
            vec![
                ("0-5%", 1),
                ("5-10%", 1),
                ("10-20%", 1),
                ("20-30%", 0),
                ("30-50%", 1),
                ("50%+", 1),
            ]
        );
    }
}
