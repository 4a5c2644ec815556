/// EasyDash dashboard state and event handling.
///
/// The loaded tables are immutable snapshots; every interaction (segment
/// selection, search, product pick, purchase analysis) is a pure function
/// from the snapshots and the request to a response. Sessions keep their own
/// selections, so the dashboard itself holds no per-user state.
use crate::aggregate::{self, TOP_CUSTOMERS, TOP_ORDERS};
use crate::charts;
use crate::config::DashConfig;
use crate::error::{DashError, Result};
use crate::fields::orders as cols;
use crate::kpi::{KpiTile, Kpis};
use crate::loader;
use crate::recommend::{self, ProductDetail};
use crate::search::{ProductIndex, SearchOutcome};
use crate::table::Table;
use crate::view::{segment_filter, FilterView, RowSource};
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Chart panels per dashboard row.
pub const PANELS_PER_ROW: usize = 3;

/// A loaded dataset, or the reason it could not be loaded.
#[derive(Debug, Clone)]
enum Dataset {
    Ready(Arc<Table>),
    Unavailable(String),
}

impl Dataset {
    fn from_load(name: &str, loaded: Result<Arc<Table>>) -> Self {
        match loaded {
            Ok(table) => Dataset::Ready(table),
            Err(e) => {
                log::error!("{} dataset unavailable: {}", name, e);
                Dataset::Unavailable(e.to_string())
            }
        }
    }

    fn get(&self, name: &str) -> Result<&Arc<Table>> {
        match self {
            Dataset::Ready(table) => Ok(table),
            Dataset::Unavailable(reason) => Err(DashError::Unavailable {
                dataset: name.to_string(),
                reason: reason.clone(),
            }),
        }
    }

    fn status(&self) -> DatasetStatus {
        match self {
            Dataset::Ready(table) => DatasetStatus {
                available: true,
                rows: table.len(),
                error: None,
            },
            Dataset::Unavailable(reason) => DatasetStatus {
                available: false,
                rows: 0,
                error: Some(reason.clone()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetStatus {
    pub available: bool,
    pub rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    pub orders: DatasetStatus,
    pub purchases: DatasetStatus,
    pub products: usize,
}

/// One chart slot of the dashboard grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Panel {
    Chart { id: &'static str, spec: Value },
    /// The aggregation behind this slot failed; the others still render.
    Error { id: &'static str, message: String },
}

impl Panel {
    fn build(id: &'static str, built: Result<Value>) -> Self {
        match built {
            Ok(spec) => Panel::Chart { id, spec },
            Err(e) => {
                log::warn!("panel '{}' failed: {}", id, e);
                Panel::Error {
                    id,
                    message: e.to_string(),
                }
            }
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            Panel::Chart { id, .. } | Panel::Error { id, .. } => id,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Panel::Error { .. })
    }
}

/// Everything the chart tab shows for one segment selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub segments: Vec<String>,
    pub rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kpis: Option<Vec<KpiTile>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kpi_error: Option<String>,
    /// Set when the selection could not be applied; the view then covers
    /// every row.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_error: Option<String>,
    /// Panels grouped into rows of [`PANELS_PER_ROW`].
    pub grid: Vec<Vec<Panel>>,
}

impl DashboardView {
    pub fn panels(&self) -> impl Iterator<Item = &Panel> {
        self.grid.iter().flatten()
    }
}

/// Views over the purchase CSV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisKind {
    Distribution,
    RepeatProducts,
    MonthlySpend,
    DiscountBuckets,
}

impl AnalysisKind {
    pub const ALL: [AnalysisKind; 4] = [
        AnalysisKind::Distribution,
        AnalysisKind::RepeatProducts,
        AnalysisKind::MonthlySpend,
        AnalysisKind::DiscountBuckets,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisKind::Distribution => "distribution",
            AnalysisKind::RepeatProducts => "repeat-products",
            AnalysisKind::MonthlySpend => "monthly-spend",
            AnalysisKind::DiscountBuckets => "discount-buckets",
        }
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisKind {
    type Err = DashError;

    fn from_str(s: &str) -> Result<Self> {
        AnalysisKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| DashError::UnknownAnalysis(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub analysis: AnalysisKind,
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<Value>,
}

/// Shared, read-only dashboard over the loaded datasets.
#[derive(Debug)]
pub struct Dashboard {
    orders: Dataset,
    purchases: Dataset,
    products: Option<ProductIndex>,
    suggestion_limit: usize,
}

impl Dashboard {
    pub fn new(orders: Result<Arc<Table>>, purchases: Result<Arc<Table>>, suggestion_limit: usize) -> Self {
        let orders = Dataset::from_load("orders", orders);
        let purchases = Dataset::from_load("purchases", purchases);

        let products = match &orders {
            Dataset::Ready(table) => match ProductIndex::build(table) {
                Ok(index) => Some(index),
                Err(e) => {
                    log::warn!("product search disabled: {}", e);
                    None
                }
            },
            Dataset::Unavailable(_) => None,
        };

        Dashboard {
            orders,
            purchases,
            products,
            suggestion_limit,
        }
    }

    /// Load both datasets named by `config`. A dataset that fails to load is
    /// reported by every view that needs it instead of aborting startup.
    pub fn load(config: &DashConfig) -> Self {
        let options = config.load_options();
        let orders = loader::load_superstore(&config.superstore_path, options).map(|s| s.orders);
        let purchases = loader::load_purchases(&config.purchases_path, options).map(Arc::new);
        Self::new(orders, purchases, config.suggestion_limit)
    }

    pub fn orders(&self) -> Result<&Arc<Table>> {
        self.orders.get("orders")
    }

    pub fn purchases(&self) -> Result<&Arc<Table>> {
        self.purchases.get("purchases")
    }

    pub fn suggestion_limit(&self) -> usize {
        self.suggestion_limit
    }

    pub fn status(&self) -> Status {
        Status {
            orders: self.orders.status(),
            purchases: self.purchases.status(),
            products: self.products.as_ref().map_or(0, ProductIndex::len),
        }
    }

    /// Segment options for the filter, sorted.
    pub fn segments(&self) -> Result<Vec<String>> {
        self.orders()?.distinct_strings(cols::SEGMENT)
    }

    /// KPI tiles and chart grid for a segment selection; an empty selection
    /// means every segment.
    pub fn render(&self, segments: &[String]) -> Result<DashboardView> {
        let orders = self.orders()?;
        let (view, filter_error) = match segment_filter(Arc::clone(orders), segments) {
            Ok(view) => (view, None),
            Err(e) => {
                log::warn!("segment filter failed, showing all rows: {}", e);
                (FilterView::all("orders", Arc::clone(orders)), Some(e.to_string()))
            }
        };

        let (kpis, kpi_error) = match Kpis::compute(&view) {
            Ok(kpis) => (Some(kpis.tiles()), None),
            Err(e) => {
                log::warn!("KPI tiles failed: {}", e);
                (None, Some(e.to_string()))
            }
        };

        let panels = vec![
            Panel::build(
                "top_states",
                aggregate::top_states_by_discounted_sales(&view).map(|t| charts::top_states(&t)),
            ),
            Panel::build(
                "segment_profit",
                aggregate::profit_by_segment(&view).map(|t| charts::segment_profit(&t)),
            ),
            Panel::build(
                "discount_profit",
                aggregate::discount_vs_profit(&view).map(|p| charts::discount_profit(&p)),
            ),
            Panel::build(
                "monthly_sales",
                aggregate::monthly_sales_by_segment(&view).map(|m| charts::monthly_sales_by_segment(&m)),
            ),
            Panel::build(
                "category_by_region",
                aggregate::category_sales_by_region(&view).map(|r| charts::category_by_region(&r)),
            ),
            Panel::build(
                "discount_quantity",
                aggregate::discount_vs_quantity(&view).map(|p| charts::discount_quantity(&p)),
            ),
            Panel::build(
                "top_order_ticket",
                aggregate::top_orders_by_ticket(&view, TOP_ORDERS)
                    .map(|t| charts::top_order_ticket(&t, TOP_ORDERS)),
            ),
            Panel::build(
                "profit_by_region",
                aggregate::profit_by_region(&view).map(|t| charts::profit_by_region(&t)),
            ),
            Panel::build(
                "top_customers_avg_ticket",
                aggregate::top_customers_avg_ticket(&view)
                    .map(|t| charts::top_customers_avg_ticket(&t, TOP_CUSTOMERS)),
            ),
        ];

        Ok(DashboardView {
            segments: segments.to_vec(),
            rows: view.row_count(),
            kpis,
            kpi_error,
            filter_error,
            grid: panels.chunks(PANELS_PER_ROW).map(<[Panel]>::to_vec).collect(),
        })
    }

    fn product_index(&self) -> Result<&ProductIndex> {
        let table = self.orders()?;
        match &self.products {
            Some(index) => Ok(index),
            None => {
                table.require(&[cols::PRODUCT_NAME])?;
                Err(DashError::ColumnNotFound(cols::PRODUCT_NAME.to_string()))
            }
        }
    }

    /// Product suggestions for a partial name, over all orders regardless
    /// of the segment selection.
    pub fn search(&self, query: &str) -> Result<SearchOutcome> {
        Ok(self.product_index()?.search(query, self.suggestion_limit))
    }

    /// Buyers and co-purchase suggestions for one product, over all orders.
    pub fn product_detail(&self, product: &str) -> Result<ProductDetail> {
        let table = self.orders()?;
        if !self.product_index()?.contains(product) {
            return Err(DashError::UnknownProduct(product.to_string()));
        }
        recommend::product_detail(table, product, recommend::DEFAULT_LIMIT)
    }

    pub fn purchase_analysis(&self, kind: AnalysisKind) -> Result<Analysis> {
        let table = self.purchases()?;
        let rows: &Table = table;

        let (data, chart) = match kind {
            AnalysisKind::Distribution => {
                let result = aggregate::purchase_count_distribution(rows)?;
                (json!(result), Some(charts::purchase_distribution(&result)))
            }
            AnalysisKind::RepeatProducts => {
                let result = aggregate::most_purchased_by_repeat_users(rows)?;
                (json!(result), Some(charts::repeat_user_products(&result)))
            }
            AnalysisKind::MonthlySpend => {
                let spend = aggregate::avg_monthly_spend_per_user(rows)?;
                (json!({ "avg_monthly_spend": spend }), None)
            }
            AnalysisKind::DiscountBuckets => {
                let result = aggregate::discount_bucket_distribution(rows)?;
                (json!(result), Some(charts::discount_buckets(&result)))
            }
        };

        Ok(Analysis {
            analysis: kind,
            data,
            chart,
        })
    }
}
