use std::env;
use std::str::FromStr;

use crate::config::dto::WalletConfig;
use crate::error::{WalletError, WalletResult};

fn env_or<T: FromStr>(key: &str, default: T) -> WalletResult<T> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<T>()
            .map_err(|_| WalletError::Config(format!("{} has an invalid value: {}", key, value))),
        _ => Ok(default),
    }
}

impl WalletConfig {
    /// Read `MINI_WALLET_*` overrides on top of the defaults.
    pub fn from_env() -> WalletResult<Self> {
        let defaults = WalletConfig::default();

        let config = WalletConfig {
            page_size: env_or("MINI_WALLET_PAGE_SIZE", defaults.page_size)?,
            lookahead: env_or("MINI_WALLET_LOOKAHEAD", defaults.lookahead)?,
            debounce_ms: env_or("MINI_WALLET_DEBOUNCE_MS", defaults.debounce_ms)?,
            collaborator_timeout_secs: env_or(
                "MINI_WALLET_TIMEOUT_SECS",
                defaults.collaborator_timeout_secs,
            )?,
            refresh_interval_secs: env_or(
                "MINI_WALLET_REFRESH_SECS",
                defaults.refresh_interval_secs,
            )?,
            quote_ttl_secs: env_or("MINI_WALLET_QUOTE_TTL_SECS", defaults.quote_ttl_secs)?,
            slippage_bps: env_or("MINI_WALLET_SLIPPAGE_BPS", defaults.slippage_bps)?,
            swap_token_in: env::var("MINI_WALLET_SWAP_TOKEN_IN")
                .unwrap_or_else(|_| defaults.swap_token_in.clone()),
            swap_token_out: env::var("MINI_WALLET_SWAP_TOKEN_OUT")
                .unwrap_or_else(|_| defaults.swap_token_out.clone()),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> WalletResult<()> {
        if self.page_size == 0 {
            return Err(WalletError::Config("page size must be at least 1".to_string()));
        }
        if self.collaborator_timeout_secs == 0 {
            return Err(WalletError::Config(
                "collaborator timeout must be at least 1 second".to_string(),
            ));
        }
        if self.slippage_bps >= 10_000 {
            return Err(WalletError::Config(
                "slippage must be below 10000 bps".to_string(),
            ));
        }
        if self.swap_token_in.eq_ignore_ascii_case(&self.swap_token_out) {
            return Err(WalletError::Config(
                "swap pair needs two different tokens".to_string(),
            ));
        }
        Ok(())
    }
}
