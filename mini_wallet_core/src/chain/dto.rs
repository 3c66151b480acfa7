use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A read-only contract call routed through the chain collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContractCall {
    pub contract_address: String,
    pub abi: serde_json::Value,
    pub function_name: String,
    pub args: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TxKind {
    #[serde(rename_all = "camelCase")]
    Transfer {
        token: String,
        to: String,
        amount_raw: String,
    },
    #[serde(rename_all = "camelCase")]
    Swap {
        token_in: String,
        token_out: String,
        amount_in_raw: String,
        min_amount_out_raw: String,
    },
}

/// What the wallet-signing bridge is asked to sign and submit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TxDescriptor {
    pub request_id: Uuid,
    pub from: String,
    #[serde(flatten)]
    pub kind: TxKind,
}

impl TxDescriptor {
    pub fn new(from: &str, kind: TxKind) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            from: from.to_string(),
            kind,
        }
    }
}

/// Result of a submission, as reported by the bridge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TxOutcome {
    Success {
        #[serde(rename = "txHash")]
        tx_hash: String,
    },
    Error {
        message: String,
    },
}

impl TxOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TxOutcome::Success { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_wire_shape() {
        let tx = TxDescriptor::new(
            "0xme",
            TxKind::Transfer {
                token: "0xtoken".to_string(),
                to: "0xfriend".to_string(),
                amount_raw: "1000".to_string(),
            },
        );

        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["kind"], "transfer");
        assert_eq!(json["from"], "0xme");
        assert_eq!(json["amountRaw"], "1000");
        assert!(json["requestId"].is_string());
    }

    #[test]
    fn test_outcome_from_bridge_json() {
        let ok: TxOutcome =
            serde_json::from_str(r#"{"status":"success","txHash":"0xabc"}"#).unwrap();
        assert_eq!(ok, TxOutcome::Success { tx_hash: "0xabc".to_string() });
        assert!(ok.is_success());

        let rejected: TxOutcome =
            serde_json::from_str(r#"{"status":"error","message":"user rejected"}"#).unwrap();
        assert!(!rejected.is_success());
    }
}
