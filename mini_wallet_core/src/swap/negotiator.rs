use chrono::Utc;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, timeout};

use crate::aggregator::dto::{AggregatorError, QuoteRequest};
use crate::aggregator::handler::SwapAggregator;
use crate::config::dto::WalletConfig;
use crate::error::{QuoteError, WalletError, WalletResult};
use crate::helpers::amounts::{parse_raw, positive_amount_to_raw, raw_to_amount};
use crate::helpers::cache::TtlCache;
use crate::swap::dto::{QuotePhase, QuoteSnapshot, SwapQuote};
use crate::tokens::dto::TokenDescriptor;
use crate::tokens::registry::TokenRegistry;

/// (token_in, token_out, amount_in_raw)
type QuoteKey = (String, String, u128);

struct NegotiatorState {
    token_in: TokenDescriptor,
    token_out: TokenDescriptor,
    input: String,
    amount_raw: Option<u128>,
    /// Bumped on every input, pair change and reset
    seq: u64,
    phase: QuotePhase,
    quote: Option<SwapQuote>,
    expires_at: Option<Instant>,
    error: Option<QuoteError>,
}

impl NegotiatorState {
    fn snapshot(&self) -> QuoteSnapshot {
        QuoteSnapshot {
            amount_in: self.input.clone(),
            phase: self.phase,
            quote: self.quote.clone(),
            error: self.error.as_ref().map(|e| e.to_string()),
        }
    }

    fn clear_quote(&mut self) {
        self.quote = None;
        self.expires_at = None;
        self.error = None;
    }
}

struct NegotiatorInner {
    registry: Arc<TokenRegistry>,
    aggregator: Option<Arc<dyn SwapAggregator>>,
    debounce: Duration,
    timeout: Duration,
    quote_ttl: Duration,
    cache: TtlCache<QuoteKey, (SwapQuote, Instant)>,
    state: Mutex<NegotiatorState>,
    timer: Mutex<Option<JoinHandle<()>>>,
    updates: watch::Sender<QuoteSnapshot>,
}

/// Turns a stream of typed amounts into at most one live swap quote.
///
/// Every keystroke restarts a debounce timer; only when input has been quiet
/// for the debounce window is the aggregator asked. A request that is
/// already out is never cancelled, but its answer is dropped if the input or
/// the pair changed in the meantime.
#[derive(Clone)]
pub struct SwapQuoteNegotiator {
    inner: Arc<NegotiatorInner>,
}

impl SwapQuoteNegotiator {
    /// `aggregator` is `None` when no aggregator client could be configured;
    /// every quote then fails with `ServiceUnavailable`.
    pub fn new(
        registry: Arc<TokenRegistry>,
        aggregator: Option<Arc<dyn SwapAggregator>>,
        config: &WalletConfig,
    ) -> WalletResult<Self> {
        let (token_in, token_out) =
            resolve_pair(&registry, &config.swap_token_in, &config.swap_token_out)?;

        let state = NegotiatorState {
            token_in,
            token_out,
            input: String::new(),
            amount_raw: None,
            seq: 0,
            phase: QuotePhase::Empty,
            quote: None,
            expires_at: None,
            error: None,
        };
        let (updates, _) = watch::channel(state.snapshot());

        Ok(Self {
            inner: Arc::new(NegotiatorInner {
                registry,
                aggregator,
                debounce: config.debounce(),
                timeout: config.collaborator_timeout(),
                quote_ttl: config.quote_ttl(),
                cache: TtlCache::new(config.quote_ttl()),
                state: Mutex::new(state),
                timer: Mutex::new(None),
                updates,
            }),
        })
    }

    /// Record a new input amount and restart negotiation for it.
    ///
    /// Invalid or non-positive input empties the quote without a request. A
    /// still-valid cached quote for the same amount is applied immediately.
    pub fn set_input_amount(&self, amount: &str) {
        let mut state = self.inner.state.lock();
        self.inner.cancel_timer();

        state.seq += 1;
        state.input = amount.to_string();
        state.amount_raw = None;
        state.clear_quote();

        let raw = match positive_amount_to_raw(amount, state.token_in.decimals) {
            Ok(raw) => raw,
            Err(e) => {
                debug!("Swap amount {:?} not quotable: {}", amount, e);
                state.phase = QuotePhase::Empty;
                self.inner.publish(&state);
                return;
            }
        };
        state.amount_raw = Some(raw);

        let key = (
            state.token_in.address.clone(),
            state.token_out.address.clone(),
            raw,
        );
        if let Some((quote, expires_at)) = self.inner.cache.get(&key) {
            debug!(
                "Using cached quote for {} {}",
                amount, state.token_in.symbol
            );
            state.phase = QuotePhase::Quoted;
            state.quote = Some(quote);
            state.expires_at = Some(expires_at);
            self.inner.publish(&state);
            return;
        }

        state.phase = QuotePhase::Debouncing;
        self.inner.publish(&state);

        let seq = state.seq;
        let inner = self.inner.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(inner.debounce).await;
            // detached so a later keystroke only ever aborts the timer
            tokio::spawn(inner.negotiate(seq));
        });
        *self.inner.timer.lock() = Some(handle);
    }

    /// Price `amount_in` of the current pair once, without touching the
    /// negotiation state.
    pub async fn quote(&self, amount_in: &str) -> Result<SwapQuote, QuoteError> {
        let (token_in, token_out) = self.pair();
        let raw = positive_amount_to_raw(amount_in, token_in.decimals)
            .map_err(|e| QuoteError::InvalidAmount(e.to_string()))?;

        self.inner
            .request(token_in, token_out, amount_in.trim().to_string(), raw)
            .await
            .map(|(quote, _)| quote)
    }

    /// The live quote, if it may still be submitted for exactly `amount`.
    pub fn quote_for_submission(&self, amount: &str) -> Result<SwapQuote, QuoteError> {
        let state = self.inner.state.lock();
        let (Some(quote), Some(expires_at)) = (state.quote.as_ref(), state.expires_at) else {
            return Err(QuoteError::Stale(format!(
                "no quote for the current amount ({:?})",
                state.phase
            )));
        };
        if state.phase != QuotePhase::Quoted {
            return Err(QuoteError::Stale(format!(
                "quote is not settled ({:?})",
                state.phase
            )));
        }

        let raw = positive_amount_to_raw(amount, state.token_in.decimals)
            .map_err(|e| QuoteError::InvalidAmount(e.to_string()))?;
        if quote.amount_in_raw != raw.to_string() {
            return Err(QuoteError::Stale(format!(
                "quote was for {} {}, not {}",
                quote.amount_in,
                quote.token_in.symbol,
                amount.trim()
            )));
        }
        if Instant::now() >= expires_at {
            return Err(QuoteError::Stale("quote has expired".to_string()));
        }

        Ok(quote.clone())
    }

    /// Switch the swap pair and renegotiate the current amount.
    pub fn set_pair(&self, token_in: &str, token_out: &str) -> WalletResult<()> {
        let (token_in, token_out) = resolve_pair(&self.inner.registry, token_in, token_out)?;
        info!("Swap pair set to {} -> {}", token_in.symbol, token_out.symbol);

        let input = {
            let mut state = self.inner.state.lock();
            state.token_in = token_in;
            state.token_out = token_out;
            state.input.clone()
        };
        self.set_input_amount(&input);
        Ok(())
    }

    /// Drop the input, the quote and the cache. The pair stays.
    pub fn reset(&self) {
        let mut state = self.inner.state.lock();
        self.inner.cancel_timer();
        self.inner.cache.clear();

        state.seq += 1;
        state.input.clear();
        state.amount_raw = None;
        state.phase = QuotePhase::Empty;
        state.clear_quote();
        self.inner.publish(&state);
    }

    pub fn pair(&self) -> (TokenDescriptor, TokenDescriptor) {
        let state = self.inner.state.lock();
        (state.token_in.clone(), state.token_out.clone())
    }

    pub fn input_amount(&self) -> String {
        self.inner.state.lock().input.clone()
    }

    pub fn phase(&self) -> QuotePhase {
        self.inner.state.lock().phase
    }

    pub fn last_error(&self) -> Option<QuoteError> {
        self.inner.state.lock().error.clone()
    }

    pub fn snapshot(&self) -> QuoteSnapshot {
        self.inner.state.lock().snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<QuoteSnapshot> {
        self.inner.updates.subscribe()
    }
}

impl NegotiatorInner {
    fn publish(&self, state: &NegotiatorState) {
        self.updates.send_replace(state.snapshot());
    }

    fn cancel_timer(&self) {
        if let Some(handle) = self.timer.lock().take() {
            handle.abort();
        }
    }

    async fn negotiate(self: Arc<Self>, seq: u64) {
        let (token_in, token_out, input, raw) = {
            let mut state = self.state.lock();
            let Some(raw) = state.amount_raw else {
                return;
            };
            if state.seq != seq {
                return;
            }
            state.phase = QuotePhase::Quoting;
            self.publish(&state);
            (
                state.token_in.clone(),
                state.token_out.clone(),
                state.input.clone(),
                raw,
            )
        };

        let symbol = token_in.symbol.clone();
        let result = self.request(token_in, token_out, input.clone(), raw).await;

        let mut state = self.state.lock();
        if state.seq != seq {
            debug!("Discarding quote for {} {}: input changed", input, symbol);
            return;
        }

        match result {
            Ok((quote, expires_at)) => {
                info!(
                    "💱 Quoted {} {} -> {} {}",
                    quote.amount_in, quote.token_in.symbol, quote.amount_out, quote.token_out.symbol
                );
                state.phase = QuotePhase::Quoted;
                state.quote = Some(quote);
                state.expires_at = Some(expires_at);
                state.error = None;
            }
            Err(e) => {
                warn!("Quote for {} {} failed: {}", input, symbol, e);
                state.phase = QuotePhase::Errored;
                state.clear_quote();
                state.error = Some(e);
            }
        }
        self.publish(&state);
    }

    async fn request(
        &self,
        token_in: TokenDescriptor,
        token_out: TokenDescriptor,
        input: String,
        raw: u128,
    ) -> Result<(SwapQuote, Instant), QuoteError> {
        let key = (token_in.address.clone(), token_out.address.clone(), raw);
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }

        let aggregator = match &self.aggregator {
            Some(aggregator) if aggregator.is_ready() => aggregator.clone(),
            _ => {
                return Err(QuoteError::ServiceUnavailable(
                    "swap aggregator is not initialized".to_string(),
                ));
            }
        };

        let request = QuoteRequest {
            token_in: token_in.address.clone(),
            token_out: token_out.address.clone(),
            amount_in: raw.to_string(),
        };
        debug!(
            "Requesting quote for {} {} -> {}",
            input, token_in.symbol, token_out.symbol
        );

        let response = match timeout(self.timeout, aggregator.quote(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(AggregatorError::NoRoute(cause))) => return Err(QuoteError::NoRoute(cause)),
            Ok(Err(AggregatorError::Transport(cause))) => {
                return Err(QuoteError::NetworkError(cause));
            }
            Err(_) => {
                return Err(QuoteError::NetworkError(format!(
                    "quote timed out after {}s",
                    self.timeout.as_secs()
                )));
            }
        };

        let amount_out_raw = parse_raw(&response.amount_out).map_err(|e| {
            QuoteError::NetworkError(format!("aggregator returned an unreadable amount: {}", e))
        })?;
        if amount_out_raw == 0 {
            return Err(QuoteError::NoRoute(format!(
                "no liquidity for {} -> {}",
                token_in.symbol, token_out.symbol
            )));
        }

        let obtained_at = Utc::now();
        let valid_until = chrono::Duration::from_std(self.quote_ttl)
            .ok()
            .and_then(|ttl| obtained_at.checked_add_signed(ttl))
            .unwrap_or(obtained_at);
        let now = Instant::now();
        let expires_at = now.checked_add(self.quote_ttl).unwrap_or(now);

        let quote = SwapQuote {
            amount_in: input,
            amount_in_raw: raw.to_string(),
            amount_out: raw_to_amount(amount_out_raw, token_out.decimals),
            amount_out_raw: amount_out_raw.to_string(),
            route: response.route,
            obtained_at,
            valid_until,
            token_in,
            token_out,
        };
        self.cache.insert(key, (quote.clone(), expires_at));

        Ok((quote, expires_at))
    }
}

fn resolve_pair(
    registry: &TokenRegistry,
    token_in: &str,
    token_out: &str,
) -> WalletResult<(TokenDescriptor, TokenDescriptor)> {
    let token_in = registry.resolve(token_in)?.clone();
    let token_out = registry.resolve(token_out)?.clone();
    if token_in == token_out {
        return Err(WalletError::Config(format!(
            "swap pair needs two different tokens, got {} twice",
            token_in.symbol
        )));
    }
    Ok((token_in, token_out))
}
