/// Sign-in provider that knows which wallet is connected.
///
/// The wallet only reads from it; the sign-in handshake lives elsewhere.
pub trait WalletIdentity: Send + Sync {
    fn is_connected(&self) -> bool;

    fn address(&self) -> Option<String>;
}

/// Identity with a fixed address, e.g. read once from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    address: Option<String>,
}

impl StaticIdentity {
    pub fn new(address: Option<String>) -> Self {
        let address = address
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());
        Self { address }
    }
}

impl WalletIdentity for StaticIdentity {
    fn is_connected(&self) -> bool {
        self.address.is_some()
    }

    fn address(&self) -> Option<String> {
        self.address.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_identity() {
        assert!(!StaticIdentity::new(None).is_connected());
        assert!(!StaticIdentity::new(Some("  ".to_string())).is_connected());

        let identity = StaticIdentity::new(Some(" 0xme ".to_string()));
        assert!(identity.is_connected());
        assert_eq!(identity.address().as_deref(), Some("0xme"));
    }
}
