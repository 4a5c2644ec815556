/// EasyDash - Sales Analytics Dashboards
///
/// Loads the Superstore workbook and an e-commerce purchase CSV into
/// immutable columnar tables, aggregates them into chart-ready summaries and
/// offers "customers who bought X also bought" suggestions from raw
/// co-occurrence counts.

pub mod error;
pub mod column;
pub mod table;
pub mod view;
pub mod fields;
pub mod preprocess;
pub mod loader;
pub mod aggregate;
pub mod kpi;
pub mod search;
pub mod recommend;
pub mod charts;
pub mod config;
pub mod dashboard;

pub use error::{DashError, Result};
pub use column::{Column, ColumnType, ColumnValue};
pub use table::{Schema, Table};
pub use view::{segment_filter, FilterView, RowSource, RowSubset};
pub use loader::{load_purchases, load_superstore, read_orders_csv, read_purchases_csv, LoadOptions, Superstore};
pub use preprocess::DiscountBucket;
pub use search::{ProductIndex, SearchOutcome};
pub use recommend::{buyers_of, recommend, ProductDetail};
pub use config::DashConfig;
pub use dashboard::{AnalysisKind, Dashboard, DashboardView, Panel};

// Web server modules - only when server feature is enabled
#[cfg(feature = "server")]
pub mod messages;
#[cfg(feature = "server")]
pub mod websocket;
#[cfg(feature = "server")]
pub mod server;
