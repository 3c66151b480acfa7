use std::collections::HashSet;
use std::path::Path;

use crate::error::{WalletError, WalletResult};
use crate::helpers::amounts::MAX_DECIMALS;
use crate::tokens::dto::{TokenConfig, TokenDescriptor};

pub const WLD_ADDRESS: &str = "0x2cFc85d8E48F8EAB294be644d9E25C3030863003";
pub const USDCE_ADDRESS: &str = "0x79A02482A880bCE3F13e09Da970dC34db4CD24d1";
pub const WETH_ADDRESS: &str = "0x4200000000000000000000000000000000000006";

/// Process-wide, read-only list of supported tokens.
#[derive(Debug, Clone)]
pub struct TokenRegistry {
    tokens: Vec<TokenDescriptor>,
}

impl TokenRegistry {
    pub fn new(configs: Vec<TokenConfig>) -> WalletResult<Self> {
        if configs.is_empty() {
            return Err(WalletError::InvalidTokenTable(
                "token table is empty".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let mut tokens = Vec::with_capacity(configs.len());

        for config in configs {
            let token = TokenDescriptor::from(config);

            if token.address.is_empty() {
                return Err(WalletError::InvalidTokenTable(format!(
                    "token '{}' has no address",
                    token.symbol
                )));
            }
            if token.symbol.is_empty() {
                return Err(WalletError::InvalidTokenTable(format!(
                    "token {} has no symbol",
                    token.address
                )));
            }
            if token.decimals > MAX_DECIMALS {
                return Err(WalletError::InvalidTokenTable(format!(
                    "token {} declares {} decimals (max {})",
                    token.symbol, token.decimals, MAX_DECIMALS
                )));
            }
            if !seen.insert(token.address.to_ascii_lowercase()) {
                return Err(WalletError::InvalidTokenTable(format!(
                    "duplicate token address {}",
                    token.address
                )));
            }

            tokens.push(token);
        }

        Ok(Self { tokens })
    }

    /// Parse a RON token table (a list of [`TokenConfig`]).
    pub fn from_ron_str(source: &str) -> WalletResult<Self> {
        let configs: Vec<TokenConfig> = ron::from_str(source)
            .map_err(|e| WalletError::InvalidTokenTable(format!("bad token table: {}", e)))?;
        Self::new(configs)
    }

    pub fn load(path: impl AsRef<Path>) -> WalletResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            WalletError::InvalidTokenTable(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_ron_str(&source)
    }

    /// World Chain tokens the mini-app ships with.
    pub fn builtin() -> Self {
        let token = |address: &str, symbol: &str, name: &str, decimals: u8, icon: &str| {
            TokenDescriptor {
                address: address.to_string(),
                symbol: symbol.to_string(),
                display_name: name.to_string(),
                decimals,
                icon_ref: icon.to_string(),
            }
        };

        Self {
            tokens: vec![
                token(WLD_ADDRESS, "WLD", "Worldcoin", 18, "tokens/wld.png"),
                token(USDCE_ADDRESS, "USDC.e", "Bridged USDC", 6, "tokens/usdc.png"),
                token(WETH_ADDRESS, "WETH", "Wrapped Ether", 18, "tokens/weth.png"),
            ],
        }
    }

    pub fn list_tokens(&self) -> &[TokenDescriptor] {
        &self.tokens
    }

    pub fn by_address(&self, address: &str) -> Option<&TokenDescriptor> {
        let address = address.trim();
        self.tokens
            .iter()
            .find(|t| t.address.eq_ignore_ascii_case(address))
    }

    pub fn by_symbol(&self, symbol: &str) -> Option<&TokenDescriptor> {
        let symbol = symbol.trim();
        self.tokens
            .iter()
            .find(|t| t.symbol.eq_ignore_ascii_case(symbol))
    }

    /// Resolve either an address or a symbol.
    pub fn resolve(&self, symbol_or_address: &str) -> WalletResult<&TokenDescriptor> {
        self.by_address(symbol_or_address)
            .or_else(|| self.by_symbol(symbol_or_address))
            .ok_or_else(|| WalletError::UnknownToken(symbol_or_address.to_string()))
    }
}
