//! Conversion of caller actions into binary actions.

use std::sync::Arc;

use tracing::debug;

use crate::chain::gateway::ChainGateway;
use crate::chain::mapper::ActionKind;
use crate::chain::types::{Action, BinaryAction, ChainResult};

/// Encodes actions through the node's ABI and attaches routing fields.
#[derive(Clone)]
pub struct ActionEncoder {
    gateway: Arc<dyn ChainGateway>,
}

impl ActionEncoder {
    pub fn new(gateway: Arc<dyn ChainGateway>) -> Self {
        Self { gateway }
    }

    /// Encode one action. Unsupported kinds and missing routing arguments
    /// fail before any remote call.
    pub async fn encode(&self, action: &Action) -> ChainResult<BinaryAction> {
        let kind: ActionKind = action.action.parse()?;
        let (domain, key) = kind.route(action)?;
        let data = self.gateway.abi_json_to_bin(action).await?;

        let binary = BinaryAction {
            name: action.action.clone(),
            domain,
            key,
            data,
        };

        debug!(
            action = %binary.name,
            domain = %binary.domain,
            key = %binary.key,
            "Encoded action"
        );
        Ok(binary)
    }

    /// Encode actions one at a time, preserving order.
    pub async fn encode_all(&self, actions: &[Action]) -> ChainResult<Vec<BinaryAction>> {
        let mut encoded = Vec::with_capacity(actions.len());
        for action in actions {
            encoded.push(self.encode(action).await?);
        }
        Ok(encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::gateway::MockChainGateway;
    use crate::chain::types::ChainError;
    use serde_json::json;

    #[tokio::test]
    async fn test_encode_fills_all_fields() {
        let mut gateway = MockChainGateway::new();
        gateway
            .expect_abi_json_to_bin()
            .withf(|a: &Action| a.action == "issuetoken")
            .times(1)
            .returning(|_| Ok("0102".to_string()));

        let encoder = ActionEncoder::new(Arc::new(gateway));
        let action = Action::new("issuetoken", json!({ "domain": "cookie", "names": ["a"] }));
        let binary = encoder.encode(&action).await.unwrap();

        assert_eq!(
            binary,
            BinaryAction {
                name: "issuetoken".into(),
                domain: "cookie".into(),
                key: "issue".into(),
                data: "0102".into(),
            }
        );
    }

    #[tokio::test]
    async fn test_unsupported_action_skips_remote_call() {
        let mut gateway = MockChainGateway::new();
        gateway.expect_abi_json_to_bin().never();

        let encoder = ActionEncoder::new(Arc::new(gateway));
        let err = encoder.encode(&Action::new("unknown", json!({}))).await.unwrap_err();
        assert!(matches!(err, ChainError::UnsupportedAction(ref name) if name == "unknown"));
    }

    #[tokio::test]
    async fn test_missing_routing_argument_skips_remote_call() {
        let mut gateway = MockChainGateway::new();
        gateway.expect_abi_json_to_bin().never();

        let encoder = ActionEncoder::new(Arc::new(gateway));
        let action = Action::new("newdomain", json!({ "creator": "EVT00000" }));
        let err = encoder.encode(&action).await.unwrap_err();
        assert!(matches!(
            err,
            ChainError::MalformedAction { ref action, ref field } if action == "newdomain" && field == "name"
        ));
    }

    #[tokio::test]
    async fn test_gateway_error_passes_through() {
        let mut gateway = MockChainGateway::new();
        gateway
            .expect_abi_json_to_bin()
            .returning(|_| Err(ChainError::Rpc("connection refused".into())));

        let encoder = ActionEncoder::new(Arc::new(gateway));
        let err = encoder
            .encode(&Action::new("newdomain", json!({ "name": "x" })))
            .await
            .unwrap_err();
        assert!(matches!(err, ChainError::Rpc(ref msg) if msg == "connection refused"));
    }

    #[tokio::test]
    async fn test_encode_all_preserves_order() {
        let mut gateway = MockChainGateway::new();
        gateway
            .expect_abi_json_to_bin()
            .times(3)
            .returning(|a| Ok(format!("bin-{}", a.args["name"].as_str().unwrap_or_default())));

        let encoder = ActionEncoder::new(Arc::new(gateway));
        let actions = vec![
            Action::new("newdomain", json!({ "name": "a" })),
            Action::new("newgroup", json!({ "name": "b" })),
            Action::new("updatedomain", json!({ "name": "c" })),
        ];
        let encoded = encoder.encode_all(&actions).await.unwrap();

        let data: Vec<_> = encoded.iter().map(|b| b.data.as_str()).collect();
        assert_eq!(data, vec!["bin-a", "bin-b", "bin-c"]);
        assert_eq!(encoded[1].domain, "group");
    }
}
