//! Shared mock-node helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::{json, Value};

use evt_client::chain::{Digest, HttpGateway, KeyProvider, PrivateKey, TransactionAssembler};
use evt_client::config::schema::TransactionConfig;

pub const BLOCK_ID: &str = "0000000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d";
pub const DIGEST_HEX: &str = "4f8fae3bb1b1e2bdb2d05d3ab0bc1a9e5fd8efa0d3b1ba8e0d2b3e1a34c7d1a2";

pub fn digest() -> Digest {
    DIGEST_HEX.parse().unwrap()
}

pub fn key(seed: u8) -> PrivateKey {
    PrivateKey::from_bytes(&[seed; 32]).unwrap()
}

/// Mock node plus the mocks registered on it; mocks are removed when dropped.
pub struct MockNode {
    pub server: ServerGuard,
    pub get_info: Mock,
    mocks: Vec<Mock>,
}

impl MockNode {
    /// Node answering `get_info`, `abi_json_to_bin` and `trx_json_to_digest`.
    pub async fn start() -> Self {
        let mut server = Server::new_async().await;
        let get_info = server
            .mock("GET", "/v1/chain/get_info")
            .with_body(json!({ "last_irreversible_block_id": BLOCK_ID }).to_string())
            .create_async()
            .await;
        let abi = server
            .mock("POST", "/v1/chain/abi_json_to_bin")
            .with_body(r#"{"binargs":"0000000000ea305500"}"#)
            .create_async()
            .await;
        let digest = server
            .mock("POST", "/v1/chain/trx_json_to_digest")
            .with_body(json!({ "digest": DIGEST_HEX }).to_string())
            .create_async()
            .await;
        Self { server, get_info, mocks: vec![abi, digest] }
    }

    /// Register a `push_transaction` mock returning `body`, expected once.
    pub async fn mock_push(&mut self, body: Value) -> Mock {
        self.server
            .mock("POST", "/v1/chain/push_transaction")
            .match_body(Matcher::PartialJson(json!({ "compression": "none" })))
            .with_body(body.to_string())
            .expect(1)
            .create_async()
            .await
    }

    /// Register a `get_required_keys` mock returning `keys`, expected once.
    pub async fn mock_required_keys(&mut self, keys: &[String]) -> Mock {
        self.server
            .mock("POST", "/v1/chain/get_required_keys")
            .with_body(json!({ "required_keys": keys }).to_string())
            .expect(1)
            .create_async()
            .await
    }

    pub fn assembler(&self, keys: KeyProvider) -> TransactionAssembler {
        let gateway = HttpGateway::new(self.server.url().as_str(), 5).unwrap();
        TransactionAssembler::new(Arc::new(gateway), keys, TransactionConfig::default())
    }
}

pub fn executed(transaction_id: &str) -> Value {
    json!({
        "transaction_id": transaction_id,
        "processed": { "receipt": { "status": "executed" } }
    })
}
