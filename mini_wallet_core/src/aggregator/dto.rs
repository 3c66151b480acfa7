use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub token_in: String,
    pub token_out: String,
    /// Smallest units of `token_in`
    pub amount_in: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AggregatorQuote {
    /// Smallest units of `token_out`
    pub amount_out: String,
    #[serde(default)]
    pub route: Vec<String>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AggregatorError {
    #[error("{0}")]
    NoRoute(String),
    #[error("{0}")]
    Transport(String),
}
