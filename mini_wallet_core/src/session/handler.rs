use anyhow::Result;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::aggregator::handler::SwapAggregator;
use crate::balances::aggregator::BalanceAggregator;
use crate::balances::dto::TokenBalance;
use crate::chain::dto::{ContractCall, TxDescriptor, TxKind, TxOutcome};
use crate::chain::handler::ChainRpc;
use crate::config::dto::WalletConfig;
use crate::error::{WalletError, WalletResult};
use crate::helpers::amounts::{apply_slippage, parse_raw, positive_amount_to_raw};
use crate::helpers::timeout::bounded;
use crate::history::dto::HistoryPage;
use crate::history::paginator::HistoryPaginator;
use crate::identity::handler::WalletIdentity;
use crate::indexer::handler::HistoryIndexer;
use crate::session::dto::{ActivePanel, SwapView, WalletViewState};
use crate::session::poller::spawn_poller;
use crate::swap::negotiator::SwapQuoteNegotiator;
use crate::tokens::registry::TokenRegistry;

/// External services a session talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub chain: Arc<dyn ChainRpc>,
    pub indexer: Arc<dyn HistoryIndexer>,
    /// `None` when no aggregator is configured; swaps are then unavailable.
    pub aggregator: Option<Arc<dyn SwapAggregator>>,
}

#[derive(Default)]
struct SessionState {
    wallet: Option<String>,
    active_panel: ActivePanel,
    /// Bumped on every connect and disconnect
    epoch: u64,
}

struct SessionInner {
    config: WalletConfig,
    registry: Arc<TokenRegistry>,
    chain: Arc<dyn ChainRpc>,
    balances: BalanceAggregator,
    history: HistoryPaginator,
    negotiator: SwapQuoteNegotiator,
    state: Mutex<SessionState>,
    poller: Mutex<Option<JoinHandle<()>>>,
    forwarder: Mutex<Option<JoinHandle<()>>>,
    view: watch::Sender<WalletViewState>,
}

/// The one entry point the presentation layer uses.
///
/// Owns the balance aggregator, history paginator and quote negotiator for
/// one wallet, and republishes a whole [`WalletViewState`] whenever any of
/// them changes. Cheap to clone; clones share the session.
#[derive(Clone)]
pub struct WalletSession {
    inner: Arc<SessionInner>,
}

impl WalletSession {
    /// Must be called from within a tokio runtime.
    pub fn new(
        config: WalletConfig,
        registry: Arc<TokenRegistry>,
        collaborators: Collaborators,
    ) -> WalletResult<Self> {
        config.validate()?;

        let timeout = config.collaborator_timeout();
        let balances = BalanceAggregator::new(registry.clone(), collaborators.chain.clone(), timeout);
        let history = HistoryPaginator::new(
            collaborators.indexer,
            config.page_size,
            config.lookahead,
            timeout,
        );
        let negotiator =
            SwapQuoteNegotiator::new(registry.clone(), collaborators.aggregator, &config)?;
        let mut quotes = negotiator.subscribe();
        let (view, _) = watch::channel(WalletViewState::default());

        let inner = Arc::new(SessionInner {
            config,
            registry,
            chain: collaborators.chain,
            balances,
            history,
            negotiator,
            state: Mutex::new(SessionState::default()),
            poller: Mutex::new(None),
            forwarder: Mutex::new(None),
            view,
        });
        inner.publish();

        // debounced quotes land outside any session call
        let weak = Arc::downgrade(&inner);
        let forwarder = tokio::spawn(async move {
            while quotes.changed().await.is_ok() {
                match weak.upgrade() {
                    Some(inner) => inner.publish(),
                    None => break,
                }
            }
        });
        *inner.forwarder.lock() = Some(forwarder);

        Ok(Self { inner })
    }

    /// Start a session for `address`, dropping whatever the previous one held.
    ///
    /// Balances and the first history page load concurrently; both are in the
    /// view state when this returns, as data or as an error flag.
    pub async fn connect(&self, address: &str) -> WalletResult<()> {
        let address = address.trim().to_string();
        if address.is_empty() {
            return Err(WalletError::NotConnected);
        }

        let inner = &self.inner;
        inner.clear();
        let epoch = {
            let mut state = inner.state.lock();
            state.wallet = Some(address.clone());
            state.epoch += 1;
            state.epoch
        };
        info!("🔗 Wallet {} connected", address);
        inner.publish();

        tokio::join!(
            async {
                inner.balances.refresh_balances(&address).await;
                inner.publish();
            },
            async {
                inner.history.load_initial(&address).await;
                inner.publish();
            }
        );

        if inner.state.lock().epoch == epoch {
            self.start_poller(epoch);
        }
        Ok(())
    }

    /// Reset everything to the empty, disconnected state.
    pub fn disconnect(&self) {
        if let Some(wallet) = self.wallet_address() {
            info!("Wallet {} disconnected", wallet);
        }
        self.inner.clear();
        self.inner.publish();
    }

    /// Connect, reconnect or disconnect to match the sign-in provider.
    pub async fn sync_identity(&self, identity: &dyn WalletIdentity) -> WalletResult<()> {
        let address = identity
            .address()
            .filter(|_| identity.is_connected())
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());

        match address {
            Some(address) => {
                if self.wallet_address().as_deref() == Some(address.as_str()) {
                    return Ok(());
                }
                self.connect(&address).await
            }
            None => {
                if self.wallet_address().is_some() {
                    self.disconnect();
                }
                Ok(())
            }
        }
    }

    /// Re-read balances only.
    pub async fn refresh(&self) -> WalletResult<Vec<TokenBalance>> {
        let wallet = self.require_wallet()?;
        let balances = self.inner.balances.refresh_balances(&wallet).await;
        self.inner.publish();
        Ok(balances)
    }

    pub async fn load_more(&self) -> WalletResult<HistoryPage> {
        self.require_wallet()?;
        if self.inner.history.is_loading() {
            debug!("load_more skipped, history already loading");
            return Ok(self.inner.history.page());
        }

        let page = self.inner.history.load_more().await;
        self.inner.publish();
        Ok(page)
    }

    pub fn set_swap_amount(&self, amount: &str) {
        self.inner.negotiator.set_input_amount(amount);
        self.inner.publish();
    }

    pub fn set_swap_pair(&self, token_in: &str, token_out: &str) -> WalletResult<()> {
        self.inner.negotiator.set_pair(token_in, token_out)?;
        self.inner.publish();
        Ok(())
    }

    pub fn set_active_panel(&self, panel: ActivePanel) {
        self.inner.state.lock().active_panel = panel;
        self.inner.publish();
    }

    /// Transfer `amount` of `token` (symbol or address) to `to`.
    ///
    /// The bridge's outcome is returned as-is; a bridge that cannot be reached
    /// is reported as an error outcome.
    pub async fn send(&self, token: &str, to: &str, amount: &str) -> WalletResult<TxOutcome> {
        let (wallet, epoch) = self.current_session()?;
        let token = self.inner.registry.resolve(token)?.clone();
        let to = to.trim();
        if to.is_empty() {
            return Err(WalletError::InvalidRecipient(to.to_string()));
        }
        let amount_raw = positive_amount_to_raw(amount, token.decimals)?;

        info!("📤 Sending {} {} from {} to {}", amount.trim(), token.symbol, wallet, to);
        let tx = TxDescriptor::new(
            &wallet,
            TxKind::Transfer {
                token: token.address.clone(),
                to: to.to_string(),
                amount_raw: amount_raw.to_string(),
            },
        );
        Ok(self.submit(&wallet, epoch, tx).await)
    }

    /// Submit the current swap quote, accepting `slippage_bps` less output.
    ///
    /// Refuses with `Quote(Stale)` unless a fresh quote exists for exactly the
    /// typed amount. The input is cleared after a successful swap.
    pub async fn swap(&self) -> WalletResult<TxOutcome> {
        let (wallet, epoch) = self.current_session()?;
        let amount = self.inner.negotiator.input_amount();
        let quote = self.inner.negotiator.quote_for_submission(&amount)?;

        let amount_out_raw = parse_raw(&quote.amount_out_raw)?;
        let min_amount_out = apply_slippage(amount_out_raw, self.inner.config.slippage_bps);

        info!(
            "🔄 Swapping {} {} for at least {} raw {}",
            quote.amount_in, quote.token_in.symbol, min_amount_out, quote.token_out.symbol
        );
        let tx = TxDescriptor::new(
            &wallet,
            TxKind::Swap {
                token_in: quote.token_in.address.clone(),
                token_out: quote.token_out.address.clone(),
                amount_in_raw: quote.amount_in_raw.clone(),
                min_amount_out_raw: min_amount_out.to_string(),
            },
        );

        let outcome = self.submit(&wallet, epoch, tx).await;
        if outcome.is_success() && self.inner.is_current(epoch) {
            self.inner.negotiator.reset();
            self.inner.publish();
        }
        Ok(outcome)
    }

    /// Read-only contract call through the chain collaborator.
    pub async fn call_contract(&self, call: ContractCall) -> Result<serde_json::Value> {
        let what = format!("contract call {}", call.function_name);
        bounded(
            self.inner.config.collaborator_timeout(),
            &what,
            self.inner.chain.call(call),
        )
        .await
    }

    pub fn view_state(&self) -> WalletViewState {
        self.inner.build_view()
    }

    pub fn subscribe(&self) -> watch::Receiver<WalletViewState> {
        self.inner.view.subscribe()
    }

    pub fn wallet_address(&self) -> Option<String> {
        self.inner.state.lock().wallet.clone()
    }

    fn require_wallet(&self) -> WalletResult<String> {
        self.wallet_address().ok_or(WalletError::NotConnected)
    }

    fn current_session(&self) -> WalletResult<(String, u64)> {
        let state = self.inner.state.lock();
        let wallet = state.wallet.clone().ok_or(WalletError::NotConnected)?;
        Ok((wallet, state.epoch))
    }

    /// Send `tx` and, on success, reload balances and history, unless the
    /// session `epoch` belonged to has ended while the user was signing.
    async fn submit(&self, wallet: &str, epoch: u64, tx: TxDescriptor) -> TxOutcome {
        let request_id = tx.request_id;
        let outcome = match self.inner.chain.send_transaction(tx).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Transaction {} could not be submitted: {}", request_id, e);
                TxOutcome::Error {
                    message: e.to_string(),
                }
            }
        };

        match &outcome {
            TxOutcome::Success { tx_hash } => {
                info!("✅ Transaction {} confirmed: {}", request_id, tx_hash);
            }
            TxOutcome::Error { message } => {
                warn!("❌ Transaction {} failed: {}", request_id, message);
            }
        }
        if !outcome.is_success() {
            return outcome;
        }

        let inner = &self.inner;
        if !inner.is_current(epoch) {
            debug!("Session for {} ended, skipping post-transaction reload", wallet);
            return outcome;
        }
        tokio::join!(
            inner.balances.refresh_balances(wallet),
            inner.history.load_initial(wallet)
        );
        inner.publish();
        outcome
    }

    fn start_poller(&self, epoch: u64) {
        let Some(period) = self.inner.config.refresh_interval() else {
            return;
        };

        let handle = spawn_poller(Arc::downgrade(&self.inner), period, move |inner| async move {
            inner.poll_refresh(epoch).await
        });
        if let Some(previous) = self.inner.poller.lock().replace(handle) {
            previous.abort();
        }
    }
}

impl SessionInner {
    fn is_current(&self, epoch: u64) -> bool {
        self.state.lock().epoch == epoch
    }

    fn clear(&self) {
        if let Some(poller) = self.poller.lock().take() {
            poller.abort();
        }
        {
            let mut state = self.state.lock();
            state.wallet = None;
            state.active_panel = ActivePanel::default();
            state.epoch += 1;
        }
        self.balances.reset();
        self.history.reset();
        self.negotiator.reset();
    }

    /// One auto-refresh tick; `false` once the session it was started for ended.
    async fn poll_refresh(&self, epoch: u64) -> bool {
        let wallet = {
            let state = self.state.lock();
            if state.epoch != epoch {
                return false;
            }
            match state.wallet.clone() {
                Some(wallet) => wallet,
                None => return false,
            }
        };

        debug!("Auto-refreshing balances for {}", wallet);
        self.balances.refresh_balances(&wallet).await;
        self.publish();
        true
    }

    fn build_view(&self) -> WalletViewState {
        let (wallet, active_panel) = {
            let state = self.state.lock();
            (state.wallet.clone(), state.active_panel)
        };
        let balances = self.balances.snapshot();
        let page = self.history.page();
        let quote = self.negotiator.snapshot();
        let (token_in, token_out) = self.negotiator.pair();
        let can_submit =
            wallet.is_some() && self.negotiator.quote_for_submission(&quote.amount_in).is_ok();

        WalletViewState {
            connected: wallet.is_some(),
            wallet_address: wallet,
            balances: balances.balances,
            balances_loading: balances.loading,
            balances_error: balances.error,
            transactions: page.records,
            has_more_transactions: page.has_more,
            history_phase: page.phase,
            history_error: page.error,
            swap: SwapView {
                token_in: token_in.symbol,
                token_out: token_out.symbol,
                amount_in: quote.amount_in,
                phase: quote.phase,
                quote: quote.quote,
                error: quote.error,
                can_submit,
            },
            active_panel,
        }
    }

    fn publish(&self) {
        self.view.send_replace(self.build_view());
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        if let Some(poller) = self.poller.lock().take() {
            poller.abort();
        }
        if let Some(forwarder) = self.forwarder.lock().take() {
            forwarder.abort();
        }
    }
}
