/// WebSocket message types for client-server communication
use serde::{Deserialize, Serialize};

use crate::dashboard::{Analysis, DashboardView};
use crate::error::DashError;
use crate::recommend::ProductDetail;

/// Messages sent from client to server
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Replace this session's segment selection and re-render
    SetSegments { segments: Vec<String> },

    /// Suggest products for a partial name
    Search { query: String },

    /// Show buyers and co-purchases for a product
    SelectProduct { product: String },

    /// Run one of the purchase-CSV analyses
    RunAnalysis { analysis: String },
}

/// Messages sent from server to client
#[derive(Debug, Serialize, Clone)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// KPI tiles and chart grid for the session's selection
    Dashboard { view: DashboardView },

    Suggestions {
        query: String,
        products: Vec<String>,
        total: usize,
    },

    /// The search matched nothing; informational
    NoMatch { query: String, message: String },

    ProductDetail { detail: ProductDetail },

    Analysis { result: Analysis },

    /// Error occurred
    Error { kind: String, message: String },
}

impl From<&DashError> for ServerMessage {
    fn from(err: &DashError) -> Self {
        ServerMessage::Error {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}
