use serde::{Deserialize, Serialize};

use crate::balances::dto::TokenBalance;
use crate::history::dto::{HistoryPhase, TransactionRecord};
use crate::swap::dto::{QuotePhase, SwapQuote};

/// Which panel of the widget is in front.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum ActivePanel {
    #[default]
    Wallet,
    Send,
    Swap,
    History,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SwapView {
    pub token_in: String,
    pub token_out: String,
    pub amount_in: String,
    pub phase: QuotePhase,
    pub quote: Option<SwapQuote>,
    pub error: Option<String>,
    /// A fresh quote exists for exactly the typed amount
    pub can_submit: bool,
}

/// Everything the presentation layer needs, rebuilt whole on every change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct WalletViewState {
    pub wallet_address: Option<String>,
    pub connected: bool,
    pub balances: Vec<TokenBalance>,
    pub balances_loading: bool,
    pub balances_error: Option<String>,
    pub transactions: Vec<TransactionRecord>,
    pub has_more_transactions: bool,
    pub history_phase: HistoryPhase,
    pub history_error: Option<String>,
    pub swap: SwapView,
    pub active_panel: ActivePanel,
}
