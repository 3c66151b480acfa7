use serde::{Deserialize, Serialize};

/// A token the wallet panel knows about. Identity is the address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenDescriptor {
    pub address: String,
    pub symbol: String,
    pub display_name: String,
    pub decimals: u8,
    pub icon_ref: String,
}

impl PartialEq for TokenDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.address.eq_ignore_ascii_case(&other.address)
    }
}

impl Eq for TokenDescriptor {}

/// Token table entry as written in a `.ron` asset; optional fields get their
/// defaults when the registry is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    pub address: String,
    pub symbol: String,
    pub decimals: u8,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub icon_ref: Option<String>,
}

impl From<TokenConfig> for TokenDescriptor {
    fn from(config: TokenConfig) -> Self {
        let address = config.address.trim().to_string();
        let symbol = config.symbol.trim().to_string();
        let display_name = config
            .display_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| symbol.clone());

        Self {
            address,
            symbol,
            display_name,
            decimals: config.decimals,
            icon_ref: config.icon_ref.unwrap_or_default(),
        }
    }
}
