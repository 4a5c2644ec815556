/// EasyDash Table Implementation
///
/// A Table is a collection of columns with a schema. Tables are built once
/// by the loader and then shared read-only (`Arc<Table>`) by every view and
/// aggregation, so there is no row mutation after construction.
///
/// # Examples
///
/// ```
/// use easydash::{Table, Schema, ColumnType, ColumnValue};
/// use std::collections::HashMap;
///
/// let schema = Schema::new(vec![
///     ("Segment".to_string(), ColumnType::String, false),
///     ("Sales".to_string(), ColumnType::Float64, true),
/// ]);
///
/// let mut table = Table::new("orders", schema);
///
/// let mut row = HashMap::new();
/// row.insert("Segment".to_string(), ColumnValue::String("Consumer".to_string()));
/// row.insert("Sales".to_string(), ColumnValue::Float64(261.96));
/// table.append_row(row).unwrap();
///
/// assert_eq!(table.len(), 1);
/// assert_eq!(table.get_value(0, "Segment").unwrap().as_string(), Some("Consumer"));
/// ```

use crate::column::{Column, ColumnType, ColumnValue};
use crate::error::{DashError, Result};
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};

/// Schema definition with column names and types.
///
/// A schema defines the structure of a table, specifying the name, type,
/// and nullability of each column.
///
/// # Examples
///
/// ```
/// use easydash::{Schema, ColumnType};
///
/// let schema = Schema::new(vec![
///     ("Order ID".to_string(), ColumnType::String, false),
///     ("Profit".to_string(), ColumnType::Float64, true),
/// ]);
///
/// assert_eq!(schema.len(), 2);
/// assert_eq!(schema.get_column_index("Profit"), Some(1));
/// assert_eq!(schema.missing(&["Profit", "Region"]), vec!["Region".to_string()]);
/// ```
#[derive(Debug, Clone)]
pub struct Schema {
    columns: Vec<(String, ColumnType, bool)>, // (name, type, nullable)
}

impl Schema {
    /// Creates a new schema with the specified columns.
    ///
    /// # Arguments
    ///
    /// * `columns` - Vector of tuples: (column_name, column_type, is_nullable)
    pub fn new(columns: Vec<(String, ColumnType, bool)>) -> Self {
        Schema { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get_column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(name, _, _)| name.as_str()).collect()
    }

    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|(n, _, _)| n == name)
    }

    /// Names from `required` that this schema does not contain, in the order given.
    pub fn missing(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|name| self.get_column_index(name).is_none())
            .map(|name| name.to_string())
            .collect()
    }
}

/// Root table owning its data.
pub struct Table {
    name: String,
    schema: Schema,
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    /// Create an empty table whose columns follow `schema`.
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        let columns = schema
            .columns
            .iter()
            .map(|(col_name, col_type, nullable)| Column::new(col_name.clone(), *col_type, *nullable))
            .collect();

        Table {
            name: name.into(),
            schema,
            columns,
            row_count: 0,
        }
    }

    /// Assemble a table from already-filled columns. All columns must have
    /// the same length.
    pub fn from_columns(name: impl Into<String>, columns: Vec<Column>) -> Result<Self> {
        let row_count = columns.first().map_or(0, Column::len);
        if let Some(bad) = columns.iter().find(|c| c.len() != row_count) {
            return Err(DashError::LengthMismatch {
                column: bad.name().to_string(),
                expected: row_count,
                found: bad.len(),
            });
        }

        let schema = Schema::new(
            columns
                .iter()
                .map(|c| (c.name().to_string(), c.column_type(), c.is_nullable()))
                .collect(),
        );

        Ok(Table {
            name: name.into(),
            schema,
            columns,
            row_count,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        self.schema
            .get_column_index(name)
            .map(|idx| &self.columns[idx])
            .ok_or_else(|| DashError::ColumnNotFound(name.to_string()))
    }

    /// Take the columns back, e.g. to rebuild the table with a derived column.
    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    /// Resolve every name in `required` to a column index, or fail with the
    /// complete list of absent columns.
    pub fn require(&self, required: &[&str]) -> Result<Vec<usize>> {
        let missing = self.schema.missing(required);
        if !missing.is_empty() {
            return Err(DashError::MissingColumns {
                table: self.name.clone(),
                columns: missing,
            });
        }
        Ok(required
            .iter()
            .filter_map(|name| self.schema.get_column_index(name))
            .collect())
    }

    pub fn get_value(&self, row: usize, column: &str) -> Result<ColumnValue> {
        self.check_row(row)?;
        self.column(column)?.get(row)
    }

    #[inline]
    pub fn value_at(&self, row: usize, col_idx: usize) -> Option<&ColumnValue> {
        self.columns.get(col_idx).and_then(|c| c.get_ref(row))
    }

    #[inline]
    pub fn str_at(&self, row: usize, col_idx: usize) -> Option<&str> {
        self.columns.get(col_idx).and_then(|c| c.get_str(row))
    }

    #[inline]
    pub fn f64_at(&self, row: usize, col_idx: usize) -> Option<f64> {
        self.columns.get(col_idx).and_then(|c| c.get_f64(row))
    }

    #[inline]
    pub fn i64_at(&self, row: usize, col_idx: usize) -> Option<i64> {
        self.columns.get(col_idx).and_then(|c| c.get_i64(row))
    }

    #[inline]
    pub fn date_at(&self, row: usize, col_idx: usize) -> Option<NaiveDate> {
        self.columns.get(col_idx).and_then(|c| c.get_date(row))
    }

    /// Append a row given as a column-name map. Every schema column must be
    /// present; nothing is appended if any value is rejected.
    pub fn append_row(&mut self, row: HashMap<String, ColumnValue>) -> Result<()> {
        let missing: Vec<String> = self
            .schema
            .get_column_names()
            .into_iter()
            .filter(|name| !row.contains_key(*name))
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(DashError::MissingColumns {
                table: self.name.clone(),
                columns: missing,
            });
        }

        // Validate on scratch columns first so a bad value leaves the table untouched
        for col in &self.columns {
            let mut probe = Column::new(col.name(), col.column_type(), col.is_nullable());
            probe.append(row[col.name()].clone())?;
        }

        for col in self.columns.iter_mut() {
            let value = row[col.name()].clone();
            col.append(value)?;
        }
        self.row_count += 1;
        Ok(())
    }

    fn check_row(&self, row: usize) -> Result<()> {
        if row >= self.row_count {
            return Err(DashError::RowOutOfRange {
                row,
                len: self.row_count,
            });
        }
        Ok(())
    }

    // ========================================================================
    // Aggregation Methods
    // ========================================================================

    /// Sum of all numeric values in a column. NULL values are skipped.
    pub fn sum(&self, column: &str) -> Result<f64> {
        let col = self.column(column)?;
        Ok((0..self.row_count).filter_map(|i| col.get_f64(i)).sum())
    }

    /// Distinct non-null strings of a column, in ascending order.
    pub fn distinct_strings(&self, column: &str) -> Result<Vec<String>> {
        let col = self.column(column)?;
        let set: BTreeSet<&str> = (0..self.row_count).filter_map(|i| col.get_str(i)).collect();
        Ok(set.into_iter().map(str::to_string).collect())
    }
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Table {{ name: '{}', columns: {}, rows: {} }}",
            self.name,
            self.schema.len(),
            self.row_count
        )
    }
}
