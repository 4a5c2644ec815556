/// Error types shared by the loader, the aggregation catalog and the server.
use crate::column::ColumnType;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DashError>;

#[derive(Debug, Error)]
pub enum DashError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("could not read workbook: {0}")]
    Workbook(String),

    #[error("workbook has no sheet named '{0}'")]
    MissingSheet(String),

    /// Every required column that was absent, in schema order.
    #[error("table '{table}' is missing required columns: {}", .columns.join(", "))]
    MissingColumns { table: String, columns: Vec<String> },

    #[error("column '{0}' not found")]
    ColumnNotFound(String),

    #[error("column '{column}' expects {expected:?}, got {found}")]
    TypeMismatch {
        column: String,
        expected: ColumnType,
        found: String,
    },

    #[error("column '{0}' is not nullable")]
    NotNullable(String),

    #[error("column length mismatch: '{column}' has {found} rows, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("row {row} out of range [0, {len})")]
    RowOutOfRange { row: usize, len: usize },

    #[error("unknown analysis '{0}'")]
    UnknownAnalysis(String),

    #[error("product '{0}' not found")]
    UnknownProduct(String),

    #[error("{dataset} dataset is unavailable: {reason}")]
    Unavailable { dataset: String, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl DashError {
    /// Short machine-readable tag, used in JSON error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            DashError::Io(_) => "io",
            DashError::Csv(_) => "csv",
            DashError::Workbook(_) => "workbook",
            DashError::MissingSheet(_) => "missing_sheet",
            DashError::MissingColumns { .. } => "missing_columns",
            DashError::ColumnNotFound(_) => "column_not_found",
            DashError::TypeMismatch { .. } => "type_mismatch",
            DashError::NotNullable(_) => "not_nullable",
            DashError::LengthMismatch { .. } => "length_mismatch",
            DashError::RowOutOfRange { .. } => "row_out_of_range",
            DashError::UnknownAnalysis(_) => "unknown_analysis",
            DashError::UnknownProduct(_) => "unknown_product",
            DashError::Unavailable { .. } => "unavailable",
            DashError::Config(_) => "config",
        }
    }
}
