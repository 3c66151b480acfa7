use anyhow::Result;
use async_trait::async_trait;

use crate::chain::dto::{ContractCall, TxDescriptor, TxOutcome};

/// Chain node / wallet-signing bridge the wallet reads from and submits to.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Raw integer balance of `token_address` held by `wallet_address`.
    async fn get_balance(&self, token_address: &str, wallet_address: &str) -> Result<String>;

    async fn call(&self, call: ContractCall) -> Result<serde_json::Value>;

    async fn send_transaction(&self, tx: TxDescriptor) -> Result<TxOutcome>;
}
