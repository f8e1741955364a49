//! End-to-end push tests against a mock chain node.

use serde_json::json;

use evt_client::chain::{Action, ChainError, KeyProvider, KeyRequest, Signature, TransactionRequest};

mod common;
use common::{digest, executed, key, MockNode};

fn request() -> TransactionRequest {
    serde_json::from_value(json!({
        "actions": [
            { "action": "newdomain", "args": { "name": "cookie", "creator": "EVT00000" } },
            { "action": "issuetoken", "args": { "domain": "cookie", "names": ["t1", "t2"] } }
        ],
        "max_charge": 10000
    }))
    .unwrap()
}

#[tokio::test]
async fn test_push_single_private_key() {
    let mut node = MockNode::start().await;
    let signature = key(3).sign_digest(&digest()).unwrap();
    let push = node
        .server
        .mock("POST", "/v1/chain/push_transaction")
        .match_body(mockito::Matcher::PartialJson(json!({
            "signatures": [signature.as_str()],
            "compression": "none",
            "transaction": {
                "ref_block_num": 1,
                "ref_block_prefix": 185207048,
                "delay_sec": 0,
                "max_charge": 10000,
                "actions": [
                    { "name": "newdomain", "domain": "domain", "key": "cookie" },
                    { "name": "issuetoken", "domain": "cookie", "key": "issue" }
                ]
            }
        })))
        .with_body(executed("abc123").to_string())
        .expect(1)
        .create_async()
        .await;

    let assembler = node.assembler(KeyProvider::from_keys([key(3).to_wif()]));
    let receipt = assembler.push_transaction(&request()).await.unwrap();

    push.assert_async().await;
    assert_eq!(receipt.transaction_id.as_deref(), Some("abc123"));
}

#[tokio::test]
async fn test_chain_info_reused_across_pushes() {
    let mut node = MockNode::start().await;
    let push = node
        .server
        .mock("POST", "/v1/chain/push_transaction")
        .with_body(executed("t").to_string())
        .expect(2)
        .create_async()
        .await;

    let assembler = node.assembler(KeyProvider::from_keys([key(3).to_wif()]));
    assembler.push_transaction(&request()).await.unwrap();
    assembler.push_transaction(&request()).await.unwrap();

    push.assert_async().await;
    node.get_info.assert_async().await;
}

#[tokio::test]
async fn test_rejection_details_surface() {
    let mut node = MockNode::start().await;
    let push = node
        .mock_push(json!({
            "code": 500,
            "message": "Internal Service Error",
            "error": {
                "code": 3050003,
                "what": "Domain already exists",
                "details": [{ "message": "domain cookie exists" }]
            }
        }))
        .await;

    let assembler = node.assembler(KeyProvider::from_keys([key(3).to_wif()]));
    let err = assembler.push_transaction(&request()).await.unwrap_err();

    push.assert_async().await;
    assert!(matches!(err, ChainError::ChainRejection { code: 3050003, .. }));
    assert_eq!(err.to_string(), "Domain already exists (3050003): domain cookie exists; ");
}

#[tokio::test]
async fn test_uninterpretable_response() {
    let mut node = MockNode::start().await;
    let push = node.mock_push(json!({ "unexpected": true })).await;

    let assembler = node.assembler(KeyProvider::from_keys([key(3).to_wif()]));
    let err = assembler.push_transaction(&request()).await.unwrap_err();

    push.assert_async().await;
    assert!(matches!(err, ChainError::NoResponse));
}

#[tokio::test]
async fn test_multi_key_with_resolver_lookup() {
    let mut node = MockNode::start().await;
    let required = vec![key(2).public_key().to_string(), key(1).public_key().to_string()];
    let oracle = node.mock_required_keys(&required).await;

    // locally held keys are queued before looked-up ones
    let expected = [
        key(1).sign_digest(&digest()).unwrap(),
        key(2).sign_digest(&digest()).unwrap(),
    ];
    let push = node
        .server
        .mock("POST", "/v1/chain/push_transaction")
        .match_body(mockito::Matcher::PartialJson(json!({
            "signatures": [expected[0].as_str(), expected[1].as_str()],
        })))
        .with_body(executed("multi").to_string())
        .expect(1)
        .create_async()
        .await;

    let provider = KeyProvider::from_fn({
        let resolved = key(2);
        move |request: KeyRequest<'_>| match request {
            KeyRequest::Transaction(_) => {
                Ok(vec![key(1).to_wif(), key(2).public_key().to_string()])
            }
            KeyRequest::PublicKeys(_) => Ok(vec![resolved.to_wif()]),
        }
    });
    let assembler = node.assembler(provider);
    assembler.push_transaction(&request()).await.unwrap();

    oracle.assert_async().await;
    push.assert_async().await;
}

#[test]
fn test_signature_recovers_signing_key() {
    let signature: Signature = key(5).sign_digest(&digest()).unwrap();
    assert!(signature.as_str().starts_with("SIG_K1_"));
    assert_eq!(signature.recover_public_key(&digest()).unwrap(), key(5).public_key());
}

#[tokio::test]
async fn test_unsupported_action_never_pushes() {
    let mut node = MockNode::start().await;
    let push = node
        .server
        .mock("POST", "/v1/chain/push_transaction")
        .expect(0)
        .create_async()
        .await;

    let mut req = request();
    req.actions.push(Action::new("everipay", json!({})));
    let assembler = node.assembler(KeyProvider::from_keys([key(3).to_wif()]));
    let err = assembler.push_transaction(&req).await.unwrap_err();

    push.assert_async().await;
    assert!(matches!(err, ChainError::UnsupportedAction(ref t) if t == "everipay"));
}
