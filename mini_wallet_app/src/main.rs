use anyhow::{Context, Result};
use mini_wallet_core::aggregator::handler::SwapAggregator;
use mini_wallet_core::aggregator::panora::PanoraAggregator;
use mini_wallet_core::chain::bridge::HttpChainBridge;
use mini_wallet_core::config::dto::WalletConfig;
use mini_wallet_core::identity::handler::StaticIdentity;
use mini_wallet_core::indexer::handler::HttpHistoryIndexer;
use mini_wallet_core::session::handler::{Collaborators, WalletSession};
use mini_wallet_core::tokens::registry::TokenRegistry;
use std::env;
use std::sync::Arc;

const DEFAULT_PANORA_URL: &str = "https://api.panora.exchange";

fn load_registry() -> Result<TokenRegistry> {
    match env::var("TOKENS_PATH") {
        Ok(path) => {
            let registry = TokenRegistry::load(&path)
                .with_context(|| format!("Failed to load token table from {}", path))?;
            log::info!("Loaded {} tokens from {}", registry.list_tokens().len(), path);
            Ok(registry)
        }
        Err(_) => {
            log::info!("TOKENS_PATH not set, using the built-in token table");
            Ok(TokenRegistry::builtin())
        }
    }
}

fn build_aggregator() -> Option<Arc<dyn SwapAggregator>> {
    let api_key = match env::var("PANORA_API_KEY") {
        Ok(key) => key,
        Err(_) => {
            log::warn!("PANORA_API_KEY not set, swaps will be unavailable");
            return None;
        }
    };
    let base_url = env::var("PANORA_URL").unwrap_or_else(|_| DEFAULT_PANORA_URL.to_string());

    Some(Arc::new(PanoraAggregator::new(base_url, api_key)))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();
    log::info!("Starting mini_wallet_app...");

    let config = WalletConfig::from_env().context("Invalid MINI_WALLET_* configuration")?;
    let registry = Arc::new(load_registry()?);

    let bridge_url = env::var("CHAIN_BRIDGE_URL").context("CHAIN_BRIDGE_URL not set")?;
    let indexer_url = env::var("INDEXER_URL").context("INDEXER_URL not set")?;
    let collaborators = Collaborators {
        chain: Arc::new(HttpChainBridge::new(bridge_url)),
        indexer: Arc::new(HttpHistoryIndexer::new(
            indexer_url,
            env::var("INDEXER_API_KEY").ok(),
        )),
        aggregator: build_aggregator(),
    };

    let session = WalletSession::new(config, registry, collaborators)?;
    let mut updates = session.subscribe();

    let identity = StaticIdentity::new(env::var("WALLET_ADDRESS").ok());
    session.sync_identity(&identity).await?;
    match session.wallet_address() {
        Some(address) => log::info!("Session open for {}", address),
        None => log::warn!("WALLET_ADDRESS not set, running disconnected"),
    }

    if let Ok(amount) = env::var("SWAP_AMOUNT") {
        session.set_swap_amount(&amount);
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                log::info!("Shutting down...");
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = updates.borrow_and_update().clone();
                match serde_json::to_string(&view) {
                    Ok(json) => log::info!("View state: {}", json),
                    Err(e) => log::error!("Failed to serialize view state: {}", e),
                }
            }
        }
    }

    session.disconnect();
    Ok(())
}
