use serde::{Deserialize, Serialize};

use crate::tokens::dto::TokenDescriptor;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    pub token: TokenDescriptor,
    pub raw_balance: String,
    pub formatted_balance: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSnapshot {
    pub balances: Vec<TokenBalance>,
    pub loading: bool,
    pub error: Option<String>,
}
