use async_trait::async_trait;

use crate::aggregator::dto::{AggregatorError, AggregatorQuote, QuoteRequest};

/// External liquidity aggregator pricing a swap.
#[async_trait]
pub trait SwapAggregator: Send + Sync {
    /// Whether the aggregator client is configured and can take requests.
    fn is_ready(&self) -> bool {
        true
    }

    async fn quote(&self, request: QuoteRequest) -> Result<AggregatorQuote, AggregatorError>;
}
