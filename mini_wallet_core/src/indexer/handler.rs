use anyhow::{Result, anyhow};
use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::Deserialize;

use crate::history::dto::TransactionRecord;

/// Chain indexer serving a wallet's transfer history, newest first.
///
/// `limit` is a soft cap: fewer records may come back.
#[async_trait]
pub trait HistoryIndexer: Send + Sync {
    async fn get_transactions(
        &self,
        wallet_address: &str,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>>;
}

#[derive(Debug, Deserialize)]
struct TransactionsResponse {
    transactions: Vec<TransactionRecord>,
}

#[derive(Clone)]
pub struct HttpHistoryIndexer {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpHistoryIndexer {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            base_url,
            api_key,
        }
    }
}

#[async_trait]
impl HistoryIndexer for HttpHistoryIndexer {
    async fn get_transactions(
        &self,
        wallet_address: &str,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>> {
        let url = format!("{}/wallets/{}/transactions", self.base_url, wallet_address);
        debug!("🌐 History fetch: {} (limit {})", url, limit);

        let mut request = self.client.get(&url).query(&[("limit", limit)]);
        if let Some(api_key) = &self.api_key {
            request = request.header("x-api-key", api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| anyhow!("Failed to fetch transactions: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("❌ Indexer responded {}: {}", status, body);
            return Err(anyhow!("Indexer error {}: {}", status, body));
        }

        let body = response
            .json::<TransactionsResponse>()
            .await
            .map_err(|e| anyhow!("Failed to parse transactions: {}", e))?;

        Ok(body.transactions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::dto::{Direction, TxStatus};
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_get_transactions() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wallets/0xme/transactions"))
            .and(query_param("limit", "10"))
            .and(header("x-api-key", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "transactions": [{
                    "id": "t1",
                    "direction": "received",
                    "token": "WLD",
                    "amount": "2.5",
                    "counterpartyAddress": "0xfriend",
                    "status": "confirmed",
                    "txHash": "0xhash",
                    "timestamp": 1700000000
                }]
            })))
            .mount(&server)
            .await;

        let indexer = HttpHistoryIndexer::new(server.uri(), Some("secret".to_string()));
        let records = indexer.get_transactions("0xme", 10).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].direction, Direction::Received);
        assert_eq!(records[0].status, TxStatus::Confirmed);
        assert_eq!(records[0].counterparty_address, "0xfriend");
    }

    #[tokio::test]
    async fn test_indexer_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("down"))
            .mount(&server)
            .await;

        let indexer = HttpHistoryIndexer::new(server.uri(), None);
        let err = indexer.get_transactions("0xme", 5).await.unwrap_err();
        assert!(err.to_string().contains("down"));
    }
}
