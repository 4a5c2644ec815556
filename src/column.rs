/// EasyDash Column Implementation
///
/// A Column is an array-like random-access data container indexed by integer.
/// Each Column has a type specifying the type of every value stored. Columns
/// are filled once at load time and read many times afterwards, so values
/// live in a plain `Vec` and are borrowed rather than cloned on the hot paths.

use crate::error::{DashError, Result};
use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use std::fmt::Debug;

/// Column data types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int64,
    Float64,
    String,
    Bool,
    Date,
}

/// Column value enum to support multiple types
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Int64(i64),
    Float64(f64),
    String(String),
    Bool(bool),
    Date(NaiveDate),
    Null,
}

impl ColumnValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ColumnValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ColumnValue::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ColumnValue::Float64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            ColumnValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            ColumnValue::Date(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric view of the value; integers widen to f64.
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            ColumnValue::Int64(v) => Some(*v as f64),
            ColumnValue::Float64(v) => Some(*v),
            _ => None,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            ColumnValue::Int64(_) => "Int64",
            ColumnValue::Float64(_) => "Float64",
            ColumnValue::String(_) => "String",
            ColumnValue::Bool(_) => "Bool",
            ColumnValue::Date(_) => "Date",
            ColumnValue::Null => "Null",
        }
    }
}

impl Serialize for ColumnValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            ColumnValue::Int64(v) => serializer.serialize_i64(*v),
            ColumnValue::Float64(v) if v.is_finite() => serializer.serialize_f64(*v),
            ColumnValue::Float64(_) => serializer.serialize_none(),
            ColumnValue::String(v) => serializer.serialize_str(v),
            ColumnValue::Bool(v) => serializer.serialize_bool(*v),
            ColumnValue::Date(d) => serializer.collect_str(&d.format("%Y-%m-%d")),
            ColumnValue::Null => serializer.serialize_none(),
        }
    }
}

/// A named, typed sequence of values.
///
/// Floats that are NaN or infinite are stored as `Null`, so a numeric read
/// never hands a non-finite number to a sum.
pub struct Column {
    name: String,
    column_type: ColumnType,
    nullable: bool,
    values: Vec<ColumnValue>,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType, nullable: bool) -> Self {
        Self::with_capacity(name, column_type, nullable, 0)
    }

    pub fn with_capacity(
        name: impl Into<String>,
        column_type: ColumnType,
        nullable: bool,
        capacity: usize,
    ) -> Self {
        Column {
            name: name.into(),
            column_type,
            nullable,
            values: Vec::with_capacity(capacity),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Validate and normalise a value for this column
    fn validate_value(&self, value: ColumnValue) -> Result<ColumnValue> {
        let value = match value {
            ColumnValue::Float64(f) if !f.is_finite() => ColumnValue::Null,
            other => other,
        };

        if value.is_null() {
            if !self.nullable {
                return Err(DashError::NotNullable(self.name.clone()));
            }
            return Ok(ColumnValue::Null);
        }

        match (&value, self.column_type) {
            (ColumnValue::Int64(_), ColumnType::Int64)
            | (ColumnValue::Float64(_), ColumnType::Float64)
            | (ColumnValue::String(_), ColumnType::String)
            | (ColumnValue::Bool(_), ColumnType::Bool)
            | (ColumnValue::Date(_), ColumnType::Date) => Ok(value),
            // Integers are accepted by float columns.
            (ColumnValue::Int64(n), ColumnType::Float64) => Ok(ColumnValue::Float64(*n as f64)),
            _ => Err(DashError::TypeMismatch {
                column: self.name.clone(),
                expected: self.column_type,
                found: value.type_name().to_string(),
            }),
        }
    }

    pub fn append(&mut self, value: ColumnValue) -> Result<()> {
        let value = self.validate_value(value)?;
        self.values.push(value);
        Ok(())
    }

    pub fn get(&self, index: usize) -> Result<ColumnValue> {
        self.get_ref(index).cloned().ok_or(DashError::RowOutOfRange {
            row: index,
            len: self.len(),
        })
    }

    #[inline]
    pub fn get_ref(&self, index: usize) -> Option<&ColumnValue> {
        self.values.get(index)
    }

    /// Fast numeric access - returns the value as f64 without cloning ColumnValue.
    /// Returns None if the value is null, not a numeric type, or index out of bounds.
    #[inline]
    pub fn get_f64(&self, index: usize) -> Option<f64> {
        self.values.get(index).and_then(ColumnValue::to_f64)
    }

    #[inline]
    pub fn get_i64(&self, index: usize) -> Option<i64> {
        self.values.get(index).and_then(ColumnValue::as_i64)
    }

    #[inline]
    pub fn get_str(&self, index: usize) -> Option<&str> {
        self.values.get(index).and_then(ColumnValue::as_string)
    }

    #[inline]
    pub fn get_date(&self, index: usize) -> Option<NaiveDate> {
        self.values.get(index).and_then(ColumnValue::as_date)
    }


    pub fn iter(&self) -> std::slice::Iter<'_, ColumnValue> {
        self.values.iter()
    }
}

impl Debug for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Column {{ name: '{}', type: {:?}, nullable: {}, len: {} }}",
            self.name,
            self.column_type,
            self.nullable,
            self.len()
        )
    }
}
