use anyhow::{Result, anyhow};
use async_trait::async_trait;
use log::{debug, error, warn};
use reqwest::{Client, Response};
use serde::Deserialize;

use crate::chain::dto::{ContractCall, TxDescriptor, TxOutcome};
use crate::chain::handler::ChainRpc;

#[derive(Debug, Deserialize)]
struct BalanceResponse {
    raw: String,
}

#[derive(Debug, Deserialize)]
struct CallResponse {
    result: serde_json::Value,
}

/// JSON client for the wallet-signing bridge.
#[derive(Clone)]
pub struct HttpChainBridge {
    client: Client,
    base_url: String,
}

impl HttpChainBridge {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            base_url,
        }
    }

    async fn check(&self, url: &str, resp: Response) -> Result<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error body".to_string());
        error!("❌ Bridge responded {} for {}: {}", status, url, body);

        let reason = match status.as_u16() {
            401 => "wallet session is not authorized",
            404 => "bridge endpoint not found",
            429 => "rate limit exceeded",
            500..=599 => "bridge internal error",
            _ => "unexpected bridge response",
        };

        Err(anyhow!("{} (status {}): {}", reason, status, body))
    }
}

#[async_trait]
impl ChainRpc for HttpChainBridge {
    async fn get_balance(&self, token_address: &str, wallet_address: &str) -> Result<String> {
        let url = format!(
            "{}/balances/{}/{}",
            self.base_url, wallet_address, token_address
        );
        debug!("🌐 Balance read: {}", url);

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Network error: {}", e))?;
        let body: BalanceResponse = self.check(&url, resp).await?.json().await?;

        Ok(body.raw)
    }

    async fn call(&self, call: ContractCall) -> Result<serde_json::Value> {
        let url = format!("{}/call", self.base_url);
        debug!("🌐 Contract call {} on {}", call.function_name, call.contract_address);

        let resp = self
            .client
            .post(&url)
            .json(&call)
            .send()
            .await
            .map_err(|e| anyhow!("Network error: {}", e))?;
        let body: CallResponse = self.check(&url, resp).await?.json().await?;

        Ok(body.result)
    }

    async fn send_transaction(&self, tx: TxDescriptor) -> Result<TxOutcome> {
        let url = format!("{}/transactions", self.base_url);
        debug!("🌐 Submitting transaction {} from {}", tx.request_id, tx.from);

        let resp = self.client.post(&url).json(&tx).send().await;

        match resp {
            Ok(resp) => {
                let resp = self.check(&url, resp).await?;
                let outcome: TxOutcome = resp.json().await?;
                if let TxOutcome::Error { message } = &outcome {
                    warn!("⚠️ Transaction {} rejected: {}", tx.request_id, message);
                }
                Ok(outcome)
            }
            Err(network_error) => {
                if network_error.is_timeout() {
                    error!("⏰ Transaction submission timed out");
                } else if network_error.is_connect() {
                    error!("🔌 Connection failed - bridge may be down");
                }
                Err(anyhow!("Network error: {}", network_error))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::dto::TxKind;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_get_balance() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/balances/0xme/0xtoken"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "raw": "1500000000000000000" })),
            )
            .mount(&server)
            .await;

        let bridge = HttpChainBridge::new(format!("{}/", server.uri()));
        let raw = bridge.get_balance("0xtoken", "0xme").await.unwrap();
        assert_eq!(raw, "1500000000000000000");
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("node syncing"))
            .mount(&server)
            .await;

        let bridge = HttpChainBridge::new(server.uri());
        let err = bridge.get_balance("0xtoken", "0xme").await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("bridge internal error"));
        assert!(msg.contains("node syncing"));
    }

    #[tokio::test]
    async fn test_send_transaction_passes_rejection_through() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transactions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({ "status": "error", "message": "user rejected" }),
            ))
            .mount(&server)
            .await;

        let bridge = HttpChainBridge::new(server.uri());
        let tx = TxDescriptor::new(
            "0xme",
            TxKind::Transfer {
                token: "0xtoken".to_string(),
                to: "0xfriend".to_string(),
                amount_raw: "1".to_string(),
            },
        );

        let outcome = bridge.send_transaction(tx).await.unwrap();
        assert_eq!(
            outcome,
            TxOutcome::Error {
                message: "user rejected".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_contract_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/call"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "result": ["42"] })),
            )
            .mount(&server)
            .await;

        let bridge = HttpChainBridge::new(server.uri());
        let result = bridge
            .call(ContractCall {
                contract_address: "0xstaking".to_string(),
                abi: serde_json::json!([]),
                function_name: "stakedOf".to_string(),
                args: vec![serde_json::json!("0xme")],
            })
            .await
            .unwrap();
        assert_eq!(result, serde_json::json!(["42"]));
    }
}
