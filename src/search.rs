//! Product-name search with suggestions.

use crate::error::Result;
use crate::fields::orders;
use crate::table::Table;
use serde::Serialize;

pub const NO_MATCH_MESSAGE: &str = "No product found with that name. Try another term or check the spelling.";

/// Outcome of a product search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SearchOutcome {
    /// The query was empty; nothing to suggest.
    Idle,
    /// Matching names in alphabetical order, at most `limit` of them.
    /// `total` is the number of matches before truncation.
    Matches { products: Vec<String>, total: usize },
    /// Informational, not an error.
    NoMatch { query: String, message: String },
}

/// Sorted distinct product names, searched case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct ProductIndex {
    names: Vec<String>,
    lowered: Vec<String>,
}

impl ProductIndex {
    pub fn build(table: &Table) -> Result<Self> {
        let names = table.distinct_strings(orders::PRODUCT_NAME)?;
        let lowered = names.iter().map(|n| n.to_lowercase()).collect();
        Ok(ProductIndex { names, lowered })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, product: &str) -> bool {
        self.names.binary_search_by(|n| n.as_str().cmp(product)).is_ok()
    }

    /// Case-insensitive substring search over the product names. The query
    /// is used as typed, so whitespace is a substring like any other.
    pub fn search(&self, query: &str, limit: usize) -> SearchOutcome {
        if query.is_empty() {
            return SearchOutcome::Idle;
        }

        let needle = query.to_lowercase();
        let matches: Vec<&String> = self
            .names
            .iter()
            .zip(&self.lowered)
            .filter(|(_, lower)| lower.contains(&needle))
            .map(|(name, _)| name)
            .collect();

        if matches.is_empty() {
            return SearchOutcome::NoMatch {
                query: query.to_string(),
                message: NO_MATCH_MESSAGE.to_string(),
            };
        }

        SearchOutcome::Matches {
            total: matches.len(),
            products: matches.into_iter().take(limit).cloned().collect(),
        }
    }
}
