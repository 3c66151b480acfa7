use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tokens::dto::TokenDescriptor;

/// A priced swap, valid until `valid_until`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SwapQuote {
    pub token_in: TokenDescriptor,
    pub token_out: TokenDescriptor,
    /// Human amount as typed
    pub amount_in: String,
    pub amount_in_raw: String,
    /// Human amount, exact
    pub amount_out: String,
    pub amount_out_raw: String,
    pub route: Vec<String>,
    pub obtained_at: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum QuotePhase {
    #[default]
    Empty,
    Debouncing,
    Quoting,
    Quoted,
    Errored,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSnapshot {
    /// Input amount as last entered, even when invalid
    pub amount_in: String,
    pub phase: QuotePhase,
    pub quote: Option<SwapQuote>,
    pub error: Option<String>,
}
