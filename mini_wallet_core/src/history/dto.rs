use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Sent,
    Received,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Confirmed,
    Failed,
}

/// One transfer in a wallet's history, as reported by the indexer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub id: String,
    pub direction: Direction,
    /// Token symbol
    pub token: String,
    pub amount: String,
    pub counterparty_address: String,
    pub status: TxStatus,
    pub tx_hash: String,
    /// Unix seconds
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum HistoryPhase {
    #[default]
    Idle,
    Loading,
    Ready,
    LoadingMore,
}

/// The visible slice of the history log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPage {
    pub records: Vec<TransactionRecord>,
    pub has_more: bool,
    pub phase: HistoryPhase,
    pub error: Option<String>,
}
