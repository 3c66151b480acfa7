use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::tokens::registry::{USDCE_ADDRESS, WLD_ADDRESS};

/// Tunables for one wallet session. Every field has a default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WalletConfig {
    /// Records per history page.
    pub page_size: usize,
    /// Extra records fetched past the visible pages to know whether more exist.
    pub lookahead: usize,
    /// Input inactivity before a quote request fires.
    pub debounce_ms: u64,
    /// Upper bound on any single balance, history or quote call.
    pub collaborator_timeout_secs: u64,
    /// Auto-refresh period for balances; 0 disables the poller.
    pub refresh_interval_secs: u64,
    /// How long an obtained quote stays usable (and cached).
    pub quote_ttl_secs: u64,
    /// Slippage tolerance applied to the quoted output on swap submission.
    pub slippage_bps: u16,
    pub swap_token_in: String,
    pub swap_token_out: String,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            page_size: 5,
            lookahead: 5,
            debounce_ms: 1000,
            collaborator_timeout_secs: 10,
            refresh_interval_secs: 30,
            quote_ttl_secs: 30,
            slippage_bps: 50,
            swap_token_in: WLD_ADDRESS.to_string(),
            swap_token_out: USDCE_ADDRESS.to_string(),
        }
    }
}

impl WalletConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn collaborator_timeout(&self) -> Duration {
        Duration::from_secs(self.collaborator_timeout_secs)
    }

    pub fn refresh_interval(&self) -> Option<Duration> {
        (self.refresh_interval_secs > 0).then(|| Duration::from_secs(self.refresh_interval_secs))
    }

    pub fn quote_ttl(&self) -> Duration {
        Duration::from_secs(self.quote_ttl_secs)
    }
}
