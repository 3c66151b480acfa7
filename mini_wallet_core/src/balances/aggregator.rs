use anyhow::Result;
use futures::future::join_all;
use log::{debug, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::balances::dto::{BalanceSnapshot, TokenBalance};
use crate::chain::handler::ChainRpc;
use crate::helpers::amounts::{format_balance, parse_raw};
use crate::helpers::timeout::bounded;
use crate::tokens::dto::TokenDescriptor;
use crate::tokens::registry::TokenRegistry;

/// Reads every registered token's balance for a wallet and keeps the last
/// good snapshot.
pub struct BalanceAggregator {
    registry: Arc<TokenRegistry>,
    chain: Arc<dyn ChainRpc>,
    timeout: Duration,
    generation: AtomicU64,
    state: Mutex<BalanceSnapshot>,
}

impl BalanceAggregator {
    pub fn new(registry: Arc<TokenRegistry>, chain: Arc<dyn ChainRpc>, timeout: Duration) -> Self {
        Self {
            registry,
            chain,
            timeout,
            generation: AtomicU64::new(0),
            state: Mutex::new(BalanceSnapshot::default()),
        }
    }

    /// Refresh all balances concurrently and return the snapshot now on show.
    ///
    /// Tokens whose read fails are left out. If every read fails the previous
    /// snapshot stays and the error flag is raised. A refresh that was
    /// overtaken by a newer one (or by [`reset`](Self::reset)) applies nothing.
    pub async fn refresh_balances(&self, wallet_address: &str) -> Vec<TokenBalance> {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.lock().loading = true;

        let tokens = self.registry.list_tokens();
        let reads = tokens
            .iter()
            .map(|token| self.read_balance(token, wallet_address));
        let results = join_all(reads).await;

        let mut fresh = Vec::with_capacity(tokens.len());
        for (token, result) in tokens.iter().zip(results) {
            match result {
                Ok(balance) => fresh.push(balance),
                Err(e) => warn!(
                    "Balance read failed for {} ({}) on {}: {}",
                    token.symbol, token.address, wallet_address, e
                ),
            }
        }

        let mut state = self.state.lock();
        if self.generation.load(Ordering::SeqCst) != ticket {
            debug!(
                "Dropping balance refresh #{} for {}: superseded",
                ticket, wallet_address
            );
            return state.balances.clone();
        }

        state.loading = false;
        if fresh.is_empty() && !tokens.is_empty() {
            warn!(
                "All {} balance reads failed for {}, keeping last snapshot",
                tokens.len(),
                wallet_address
            );
            state.error = Some(format!(
                "Could not load balances ({} of {} tokens failed)",
                tokens.len(),
                tokens.len()
            ));
        } else {
            state.balances = fresh;
            state.error = None;
        }

        state.balances.clone()
    }

    async fn read_balance(
        &self,
        token: &TokenDescriptor,
        wallet_address: &str,
    ) -> Result<TokenBalance> {
        let what = format!("balance read for {}", token.symbol);
        let raw = bounded(
            self.timeout,
            &what,
            self.chain.get_balance(&token.address, wallet_address),
        )
        .await?;
        let value = parse_raw(&raw)?;

        Ok(TokenBalance {
            token: token.clone(),
            raw_balance: value.to_string(),
            formatted_balance: format_balance(value, token.decimals),
        })
    }

    pub fn balances(&self) -> Vec<TokenBalance> {
        self.state.lock().balances.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().loading
    }

    pub fn snapshot(&self) -> BalanceSnapshot {
        self.state.lock().clone()
    }

    /// Forget everything; in-flight refreshes will be discarded.
    pub fn reset(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        *self.state.lock() = BalanceSnapshot::default();
    }
}
