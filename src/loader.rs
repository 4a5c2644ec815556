//! Loading the Superstore workbook and the purchase CSV into typed tables.
//!
//! Loading happens once at startup. Known columns are coerced with the rules
//! in [`crate::preprocess`]; a cell that cannot be coerced becomes null and is
//! counted, never guessed. Unknown columns are kept as strings.

use crate::column::{Column, ColumnType, ColumnValue};
use crate::error::{DashError, Result};
use crate::fields::{orders, purchases};
use crate::preprocess::{
    excel_serial_to_date, month_of, parse_currency, parse_date, parse_locale_decimal,
    parse_percentage,
};
use crate::table::Table;
use calamine::{open_workbook_auto, Data, Reader, Sheets};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;

/// How strictly the expected columns are enforced.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    /// Fail the load when a required column is absent. When false the gap is
    /// logged and each view that needs the column reports it on its own.
    pub strict: bool,
}

/// How a source column is turned into typed values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellRule {
    Text,
    LocaleDecimal,
    Currency,
    Percentage,
    Integer,
    Date,
}

impl CellRule {
    fn column_type(self) -> ColumnType {
        match self {
            CellRule::Text => ColumnType::String,
            CellRule::LocaleDecimal | CellRule::Currency | CellRule::Percentage => {
                ColumnType::Float64
            }
            CellRule::Integer => ColumnType::Int64,
            CellRule::Date => ColumnType::Date,
        }
    }

    fn for_orders(header: &str) -> Self {
        match header {
            orders::SALES | orders::PROFIT | orders::DISCOUNT => CellRule::LocaleDecimal,
            orders::QUANTITY => CellRule::Integer,
            orders::ORDER_DATE => CellRule::Date,
            _ => CellRule::Text,
        }
    }

    fn for_purchases(header: &str) -> Self {
        match header {
            purchases::ACTUAL_PRICE => CellRule::Currency,
            purchases::DISCOUNT_PERCENTAGE => CellRule::Percentage,
            _ => CellRule::Text,
        }
    }

    fn plain_text(_header: &str) -> Self {
        CellRule::Text
    }
}

/// A source cell before coercion.
#[derive(Debug, Clone, Copy)]
enum RawCell<'a> {
    Text(&'a str),
    Number(f64),
    Bool(bool),
    Empty,
}

fn number_to_text(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn coerce(rule: CellRule, cell: RawCell<'_>) -> Option<ColumnValue> {
    match (rule, cell) {
        (_, RawCell::Empty) => None,
        (_, RawCell::Text(s)) if s.trim().is_empty() => None,

        (CellRule::Text, RawCell::Text(s)) => Some(ColumnValue::String(s.trim().to_string())),
        (CellRule::Text, RawCell::Number(n)) => Some(ColumnValue::String(number_to_text(n))),
        (CellRule::Text, RawCell::Bool(b)) => Some(ColumnValue::String(b.to_string())),

        (CellRule::LocaleDecimal, RawCell::Text(s)) => parse_locale_decimal(s).map(ColumnValue::Float64),
        (CellRule::Currency, RawCell::Text(s)) => parse_currency(s).map(ColumnValue::Float64),
        (CellRule::Percentage, RawCell::Text(s)) => parse_percentage(s).map(ColumnValue::Float64),
        (CellRule::LocaleDecimal | CellRule::Currency | CellRule::Percentage, RawCell::Number(n)) => {
            n.is_finite().then_some(ColumnValue::Float64(n))
        }

        (CellRule::Integer, RawCell::Text(s)) => {
            parse_locale_decimal(s).and_then(integral).map(ColumnValue::Int64)
        }
        (CellRule::Integer, RawCell::Number(n)) => integral(n).map(ColumnValue::Int64),

        (CellRule::Date, RawCell::Text(s)) => parse_date(s).map(ColumnValue::Date),
        (CellRule::Date, RawCell::Number(n)) => excel_serial_to_date(n).map(ColumnValue::Date),

        _ => None,
    }
}

fn integral(n: f64) -> Option<i64> {
    (n.is_finite() && n.fract() == 0.0 && n.abs() < 9.0e15).then_some(n as i64)
}

/// Accumulates one column, counting cells that failed coercion.
struct ColumnBuilder {
    rule: CellRule,
    column: Column,
    rejected: usize,
}

impl ColumnBuilder {
    fn new(name: &str, rule: CellRule) -> Self {
        ColumnBuilder {
            rule,
            column: Column::new(name, rule.column_type(), true),
            rejected: 0,
        }
    }

    fn push(&mut self, cell: RawCell<'_>) -> Result<()> {
        let value = match coerce(self.rule, cell) {
            Some(value) => value,
            None => {
                if !matches!(cell, RawCell::Empty) && !matches!(cell, RawCell::Text(s) if s.trim().is_empty()) {
                    self.rejected += 1;
                }
                ColumnValue::Null
            }
        };
        self.column.append(value)
    }
}

/// Builds a table row by row from untyped cells.
struct TableBuilder {
    name: String,
    columns: Vec<ColumnBuilder>,
}

impl TableBuilder {
    fn new(name: &str, headers: &[String], rule_for: fn(&str) -> CellRule) -> Self {
        TableBuilder {
            name: name.to_string(),
            columns: headers
                .iter()
                .map(|h| ColumnBuilder::new(h, rule_for(h)))
                .collect(),
        }
    }

    /// Short rows are padded with empty cells; extra cells are ignored.
    fn push_row<'a, I>(&mut self, cells: I) -> Result<()>
    where
        I: IntoIterator<Item = RawCell<'a>>,
    {
        let mut cells = cells.into_iter();
        for builder in self.columns.iter_mut() {
            builder.push(cells.next().unwrap_or(RawCell::Empty))?;
        }
        Ok(())
    }

    fn finish(self) -> Result<Table> {
        for builder in &self.columns {
            if builder.rejected > 0 {
                log::warn!(
                    "{}: {} value(s) in column '{}' could not be parsed and are treated as missing",
                    self.name,
                    builder.rejected,
                    builder.column.name()
                );
            }
        }
        let columns = self.columns.into_iter().map(|b| b.column).collect();
        Table::from_columns(self.name, columns)
    }
}

/// Check the header row once against the columns the views need.
fn validate_headers(
    table: &str,
    headers: &[String],
    required: &[&str],
    options: LoadOptions,
) -> Result<()> {
    let missing: Vec<String> = required
        .iter()
        .filter(|name| !headers.iter().any(|h| h == *name))
        .map(|name| name.to_string())
        .collect();

    if missing.is_empty() {
        return Ok(());
    }
    if options.strict {
        return Err(DashError::MissingColumns {
            table: table.to_string(),
            columns: missing,
        });
    }
    log::warn!(
        "{}: missing expected columns {}; views that need them will be skipped",
        table,
        missing.join(", ")
    );
    Ok(())
}

/// Append the derived `Month` column (1-12) computed from `Order Date`.
fn with_month(table: Table) -> Result<Table> {
    let schema = table.schema();
    if schema.get_column_index(orders::MONTH).is_some() {
        return Ok(table);
    }
    let Some(date_idx) = schema.get_column_index(orders::ORDER_DATE) else {
        return Ok(table);
    };

    let mut month = Column::with_capacity(orders::MONTH, ColumnType::Int64, true, table.len());
    for row in 0..table.len() {
        let value = table
            .date_at(row, date_idx)
            .map_or(ColumnValue::Null, |d| ColumnValue::Int64(month_of(d) as i64));
        month.append(value)?;
    }

    let name = table.name().to_string();
    let mut columns = table.into_columns();
    columns.push(month);
    Table::from_columns(name, columns)
}

fn read_csv_table<R: Read>(
    name: &str,
    reader: R,
    rule_for: fn(&str) -> CellRule,
) -> Result<(Vec<String>, Table)> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();
    let mut builder = TableBuilder::new(name, &headers, rule_for);

    for record in csv_reader.records() {
        let record = record?;
        builder.push_row(record.iter().map(RawCell::Text))?;
    }

    Ok((headers, builder.finish()?))
}

/// Read the Orders table from a CSV export of the Orders sheet.
pub fn read_orders_csv<R: Read>(reader: R, options: LoadOptions) -> Result<Table> {
    let (headers, table) = read_csv_table("orders", reader, CellRule::for_orders)?;
    validate_headers("orders", &headers, orders::REQUIRED, options)?;
    with_month(table)
}

/// Read the purchase-record CSV.
pub fn read_purchases_csv<R: Read>(reader: R, options: LoadOptions) -> Result<Table> {
    let (headers, table) = read_csv_table("purchases", reader, CellRule::for_purchases)?;
    validate_headers("purchases", &headers, purchases::REQUIRED, options)?;
    Ok(table)
}

pub fn load_purchases<P: AsRef<Path>>(path: P, options: LoadOptions) -> Result<Table> {
    let file = File::open(path.as_ref())?;
    let table = read_purchases_csv(file, options)?;
    log::info!("loaded {} purchase records from {}", table.len(), path.as_ref().display());
    Ok(table)
}

/// The three sheets of the Superstore workbook. Only `orders` feeds the
/// dashboard views.
#[derive(Debug, Clone)]
pub struct Superstore {
    pub orders: Arc<Table>,
    pub returns: Arc<Table>,
    pub people: Arc<Table>,
}

fn empty_table(name: &str) -> Arc<Table> {
    Arc::new(Table::new(name, crate::table::Schema::new(Vec::new())))
}

fn workbook_cell(cell: &Data) -> RawCell<'_> {
    match cell {
        Data::String(s) | Data::DateTimeIso(s) => RawCell::Text(s),
        Data::Float(f) => RawCell::Number(*f),
        Data::Int(i) => RawCell::Number(*i as f64),
        Data::Bool(b) => RawCell::Bool(*b),
        Data::DateTime(dt) => RawCell::Number(dt.as_f64()),
        _ => RawCell::Empty,
    }
}

fn read_sheet(
    workbook: &mut Sheets<BufReader<File>>,
    sheet: &str,
    table_name: &str,
    rule_for: fn(&str) -> CellRule,
) -> Result<(Vec<String>, Table)> {
    let range = workbook
        .worksheet_range(sheet)
        .map_err(|e| DashError::Workbook(format!("sheet '{}': {}", sheet, e)))?;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .map(|header| header.iter().map(|c| c.to_string().trim().to_string()).collect())
        .unwrap_or_default();

    let mut builder = TableBuilder::new(table_name, &headers, rule_for);
    for row in rows {
        builder.push_row(row.iter().map(workbook_cell))?;
    }
    Ok((headers, builder.finish()?))
}

/// Load the Superstore workbook (`.xls`, `.xlsx`, `.xlsm`, `.ods`).
///
/// `Orders` is required; `Returns` and `People` are loaded when present.
pub fn load_superstore_workbook<P: AsRef<Path>>(path: P, options: LoadOptions) -> Result<Superstore> {
    let path = path.as_ref();
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| DashError::Workbook(format!("{}: {}", path.display(), e)))?;
    let sheet_names = workbook.sheet_names();
    let has_sheet = |name: &str| sheet_names.iter().any(|s| s == name);

    if !has_sheet(orders::SHEET) {
        return Err(DashError::MissingSheet(orders::SHEET.to_string()));
    }
    let (headers, table) = read_sheet(&mut workbook, orders::SHEET, "orders", CellRule::for_orders)?;
    validate_headers("orders", &headers, orders::REQUIRED, options)?;
    let orders_table = Arc::new(with_month(table)?);

    let mut optional = |sheet: &str, name: &str| -> Result<Arc<Table>> {
        if !has_sheet(sheet) {
            log::warn!("{}: no '{}' sheet, continuing without it", path.display(), sheet);
            return Ok(empty_table(name));
        }
        let (_, table) = read_sheet(&mut workbook, sheet, name, CellRule::plain_text)?;
        Ok(Arc::new(table))
    };
    let returns = optional(orders::RETURNS_SHEET, "returns")?;
    let people = optional(orders::PEOPLE_SHEET, "people")?;

    log::info!(
        "loaded {}: {} order lines, {} returns, {} people",
        path.display(),
        orders_table.len(),
        returns.len(),
        people.len()
    );

    Ok(Superstore {
        orders: orders_table,
        returns,
        people,
    })
}

/// Load the Superstore data from either a workbook or a CSV export of the
/// Orders sheet, chosen by file extension.
pub fn load_superstore<P: AsRef<Path>>(path: P, options: LoadOptions) -> Result<Superstore> {
    let path = path.as_ref();
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case("csv"));

    if !is_csv {
        return load_superstore_workbook(path, options);
    }

    let orders_table = read_orders_csv(File::open(path)?, options)?;
    log::info!("loaded {} order lines from {}", orders_table.len(), path.display());
    Ok(Superstore {
        orders: Arc::new(orders_table),
        returns: empty_table("returns"),
        people: empty_table("people"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const ORDERS_CSV: &str = "\
Row ID,Order ID,Order Date,Customer Name,Segment,Region,State,Category,Product Name,Sales,Quantity,Discount,Profit
1,CA-2016-152156,11/8/2016,Claire Gute,Consumer,South,Kentucky,Furniture,Bush Somerset Bookcase,\"261,96\",2,0,\"41,9136\"
2,CA-2016-152156,11/8/2016,Claire Gute,Consumer,South,Kentucky,Furniture,Hon Chairs,\"731,94\",3,0,\"219,582\"
3,US-2015-108966,2015-10-11,Sean O'Donnell,Consumer,South,Florida,Furniture,Bretford Table,\"957,5775\",5,\"0,45\",\"-383,031\"
4,CA-2014-115812,not-a-date,Brosina Hoffman,Corporate,West,California,Technology,Phone,oops,x,0.2,\"10,5\"
";

    const PURCHASES_CSV: &str = "\
product_id,product_name,actual_price,discount_percentage,user_id
B07JW9H4J1,Cable A,\"₹1,099\",64%,U1
B098NS6PVG,Cable B,₹349,43%,U1
B096MSW6CT,Charger,n/a,90%,U2
";

    #[test]
    fn test_orders_csv_coercion() {
        let table = read_orders_csv(ORDERS_CSV.as_bytes(), LoadOptions::default()).unwrap();
        assert_eq!(table.len(), 4);

        assert!((table.get_value(0, "Sales").unwrap().as_f64().unwrap() - 261.96).abs() < 1e-9);
        assert_eq!(table.get_value(2, "Discount").unwrap().as_f64(), Some(0.45));
        assert_eq!(table.get_value(2, "Profit").unwrap().as_f64(), Some(-383.031));
        assert_eq!(table.get_value(1, "Quantity").unwrap().as_i64(), Some(3));
        assert_eq!(table.get_value(0, "Row ID").unwrap().as_string(), Some("1"));

        // Unparseable cells become missing rather than corrupting sums
        assert!(table.get_value(3, "Sales").unwrap().is_null());
        assert!(table.get_value(3, "Quantity").unwrap().is_null());
        assert!(table.get_value(3, "Order Date").unwrap().is_null());
    }

    #[test]
    fn test_orders_month_is_derived() {
        let table = read_orders_csv(ORDERS_CSV.as_bytes(), LoadOptions::default()).unwrap();
        assert_eq!(table.get_value(0, "Month").unwrap().as_i64(), Some(11));
        assert_eq!(table.get_value(2, "Month").unwrap().as_i64(), Some(10));
        assert!(table.get_value(3, "Month").unwrap().is_null());
    }

    #[test]
    fn test_purchases_csv_coercion() {
        let table = read_purchases_csv(PURCHASES_CSV.as_bytes(), LoadOptions::default()).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.get_value(0, "actual_price").unwrap().as_f64(), Some(1099.0));
        assert_eq!(table.get_value(1, "discount_percentage").unwrap().as_f64(), Some(43.0));
        assert!(table.get_value(2, "actual_price").unwrap().is_null());
        assert_eq!(table.get_value(2, "user_id").unwrap().as_string(), Some("U2"));
    }

    #[test]
    fn test_strict_load_lists_missing_columns() {
        let csv = "user_id,product_name\nU1,Cable\n";
        let err = read_purchases_csv(csv.as_bytes(), LoadOptions { strict: true }).unwrap_err();
        match err {
            DashError::MissingColumns { table, columns } => {
                assert_eq!(table, "purchases");
                assert_eq!(columns, vec!["actual_price", "discount_percentage"]);
            }
            other => panic!("expected MissingColumns, got {:?}", other),
        }

        // Lenient load keeps what is there
        let table = read_purchases_csv(csv.as_bytes(), LoadOptions::default()).unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.column("actual_price").is_err());
    }

    #[test]
    fn test_short_rows_are_padded() {
        let csv = "user_id,product_name,actual_price,discount_percentage\nU1,Cable\n";
        let table = read_purchases_csv(csv.as_bytes(), LoadOptions::default()).unwrap();
        assert!(table.get_value(0, "actual_price").unwrap().is_null());
    }

    #[test]
    fn test_workbook_cells() {
        assert!(matches!(workbook_cell(&Data::Float(2.5)), RawCell::Number(n) if n == 2.5));
        assert!(matches!(workbook_cell(&Data::Empty), RawCell::Empty));

        let date = coerce(CellRule::Date, workbook_cell(&Data::Float(42682.0)));
        assert_eq!(date, Some(ColumnValue::Date(NaiveDate::from_ymd_opt(2016, 11, 8).unwrap())));

        let id = coerce(CellRule::Text, workbook_cell(&Data::Float(42420.0)));
        assert_eq!(id, Some(ColumnValue::String("42420".to_string())));

        let sales = coerce(CellRule::LocaleDecimal, workbook_cell(&Data::String("22,368".to_string())));
        assert_eq!(sales, Some(ColumnValue::Float64(22.368)));
    }

    #[test]
    fn test_missing_workbook_is_an_error() {
        let err = load_superstore("does-not-exist.xls", LoadOptions::default()).unwrap_err();
        assert!(matches!(err, DashError::Workbook(_)));
    }
}
