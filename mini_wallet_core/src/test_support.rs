//! In-memory collaborators for unit tests.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use crate::aggregator::dto::{AggregatorError, AggregatorQuote, QuoteRequest};
use crate::aggregator::handler::SwapAggregator;
use crate::chain::dto::{ContractCall, TxDescriptor, TxOutcome};
use crate::chain::handler::ChainRpc;
use crate::history::dto::{Direction, TransactionRecord, TxStatus};
use crate::indexer::handler::HistoryIndexer;
use crate::tokens::dto::TokenConfig;
use crate::tokens::registry::TokenRegistry;

pub fn registry_abc() -> TokenRegistry {
    let token = |address: &str, symbol: &str, decimals: u8| TokenConfig {
        address: address.to_string(),
        symbol: symbol.to_string(),
        decimals,
        display_name: None,
        icon_ref: None,
    };

    TokenRegistry::new(vec![
        token("0xa", "A", 18),
        token("0xb", "B", 6),
        token("0xc", "C", 18),
    ])
    .unwrap()
}

pub fn record(id: &str, timestamp: i64) -> TransactionRecord {
    TransactionRecord {
        id: id.to_string(),
        direction: Direction::Received,
        token: "A".to_string(),
        amount: "1".to_string(),
        counterparty_address: "0xfriend".to_string(),
        status: TxStatus::Confirmed,
        tx_hash: format!("0xhash{}", id),
        timestamp,
    }
}

/// `count` records, newest first, ids `t0..`.
pub fn records(count: usize) -> Vec<TransactionRecord> {
    (0..count)
        .map(|i| record(&format!("t{}", i), 1_700_000_000 - i as i64 * 60))
        .collect()
}

#[derive(Default)]
pub struct FakeChain {
    /// (wallet, token) -> raw balance, missing entries fail
    pub balances: Mutex<HashMap<(String, String), String>>,
    /// wallet -> delay applied to every read for that wallet
    pub delays: Mutex<HashMap<String, Duration>>,
    pub balance_calls: AtomicUsize,
    pub sent: Mutex<Vec<TxDescriptor>>,
    pub outcome: Mutex<Option<TxOutcome>>,
    /// Time the user takes to sign
    pub send_delay: Mutex<Option<Duration>>,
}

impl FakeChain {
    pub fn set_balance(&self, wallet: &str, token: &str, raw: &str) {
        self.balances
            .lock()
            .insert((wallet.to_string(), token.to_string()), raw.to_string());
    }

    pub fn fail_balance(&self, wallet: &str, token: &str) {
        self.balances
            .lock()
            .remove(&(wallet.to_string(), token.to_string()));
    }

    pub fn set_delay(&self, wallet: &str, delay: Duration) {
        self.delays.lock().insert(wallet.to_string(), delay);
    }
}

#[async_trait]
impl ChainRpc for FakeChain {
    async fn get_balance(&self, token_address: &str, wallet_address: &str) -> Result<String> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.delays.lock().get(wallet_address).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.balances
            .lock()
            .get(&(wallet_address.to_string(), token_address.to_string()))
            .cloned()
            .ok_or_else(|| anyhow!("rpc error reading {}", token_address))
    }

    async fn call(&self, call: ContractCall) -> Result<serde_json::Value> {
        Ok(serde_json::json!({ "function": call.function_name }))
    }

    async fn send_transaction(&self, tx: TxDescriptor) -> Result<TxOutcome> {
        self.sent.lock().push(tx);
        let delay = *self.send_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.outcome
            .lock()
            .clone()
            .ok_or_else(|| anyhow!("bridge unreachable"))
    }
}

#[derive(Default)]
pub struct FakeIndexer {
    /// Backing store, newest first
    pub store: Mutex<Vec<TransactionRecord>>,
    pub calls: AtomicUsize,
    pub limits: Mutex<Vec<usize>>,
    pub delay: Mutex<Option<Duration>>,
    pub fail: AtomicBool,
}

impl FakeIndexer {
    pub fn with_records(records: Vec<TransactionRecord>) -> Self {
        let indexer = FakeIndexer::default();
        *indexer.store.lock() = records;
        indexer
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HistoryIndexer for FakeIndexer {
    async fn get_transactions(
        &self,
        _wallet_address: &str,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.limits.lock().push(limit);

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("indexer unavailable"));
        }

        Ok(self.store.lock().iter().take(limit).cloned().collect())
    }
}

/// Aggregator answering `amount_out = amount_in * rate`, with per-amount delays.
pub struct FakeAggregator {
    pub rate: u128,
    pub ready: bool,
    pub delays: Mutex<HashMap<String, Duration>>,
    pub errors: Mutex<HashMap<String, AggregatorError>>,
    pub requests: Mutex<Vec<QuoteRequest>>,
}

impl FakeAggregator {
    pub fn new(rate: u128) -> Self {
        Self {
            rate,
            ready: true,
            delays: Mutex::new(HashMap::new()),
            errors: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn request_amounts(&self) -> Vec<String> {
        self.requests
            .lock()
            .iter()
            .map(|r| r.amount_in.clone())
            .collect()
    }
}

#[async_trait]
impl SwapAggregator for FakeAggregator {
    fn is_ready(&self) -> bool {
        self.ready
    }

    async fn quote(&self, request: QuoteRequest) -> Result<AggregatorQuote, AggregatorError> {
        self.requests.lock().push(request.clone());

        let delay = self.delays.lock().get(&request.amount_in).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(err) = self.errors.lock().get(&request.amount_in).cloned() {
            return Err(err);
        }

        let amount_in: u128 = request
            .amount_in
            .parse()
            .map_err(|_| AggregatorError::Transport("bad amount".to_string()))?;

        Ok(AggregatorQuote {
            amount_out: (amount_in * self.rate).to_string(),
            route: vec!["fake-pool".to_string()],
        })
    }
}
