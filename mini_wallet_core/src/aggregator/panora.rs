use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::aggregator::dto::{AggregatorError, AggregatorQuote, QuoteRequest};
use crate::aggregator::handler::SwapAggregator;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PanoraQuote {
    to_token_amount: String,
    #[serde(default)]
    route: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PanoraQuoteResponse {
    #[serde(default)]
    quotes: Vec<PanoraQuote>,
}

/// Panora swap API client.
#[derive(Clone)]
pub struct PanoraAggregator {
    client: Client,
    base_url: String,
    api_key: String,
}

impl PanoraAggregator {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Self {
            client: Client::new(),
            base_url,
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl SwapAggregator for PanoraAggregator {
    fn is_ready(&self) -> bool {
        !self.base_url.is_empty() && !self.api_key.is_empty()
    }

    async fn quote(&self, request: QuoteRequest) -> Result<AggregatorQuote, AggregatorError> {
        let response = self
            .client
            .get(format!("{}/swap/quote", self.base_url))
            .query(&[
                ("fromTokenAddress", request.token_in.as_str()),
                ("toTokenAddress", request.token_out.as_str()),
                ("fromTokenAmount", request.amount_in.as_str()),
            ])
            .header("x-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| AggregatorError::Transport(format!("Failed to reach Panora: {}", e)))?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Err(AggregatorError::NoRoute(format!(
                "no route from {} to {}",
                request.token_in, request.token_out
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::error!("Panora quote failed with {}: {}", status, body);
            return Err(AggregatorError::Transport(format!(
                "Panora responded {}: {}",
                status, body
            )));
        }

        let body = response
            .json::<PanoraQuoteResponse>()
            .await
            .map_err(|e| AggregatorError::Transport(format!("Failed to parse quote: {}", e)))?;

        let best = body
            .quotes
            .into_iter()
            .find(|q| !q.to_token_amount.is_empty() && q.to_token_amount != "0")
            .ok_or_else(|| {
                AggregatorError::NoRoute(format!(
                    "no usable quote for {} {} -> {}",
                    request.amount_in, request.token_in, request.token_out
                ))
            })?;

        Ok(AggregatorQuote {
            amount_out: best.to_token_amount,
            route: best.route,
        })
    }
}
