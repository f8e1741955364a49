//! Chain-specific types and error definitions.

use std::fmt;

use alloy::primitives::B256;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::chain::wallet::Signature;

// Re-export transaction settings from config module to avoid duplication
pub use crate::config::schema::{RequiredKeysStrategy, TransactionConfig};

/// 32-byte digest of an assembled, unsigned transaction.
pub type Digest = B256;

/// Errors that can occur while assembling, signing or pushing a transaction.
#[derive(Debug, Error)]
pub enum ChainError {
    /// No routing rule exists for this action type.
    #[error("Unsupported action type '{0}'")]
    UnsupportedAction(String),

    /// An action lacks an argument its routing rule needs.
    #[error("Action '{action}' is missing string argument '{field}'")]
    MalformedAction { action: String, field: String },

    /// A key string is neither a valid private nor a valid public key.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// No usable keys, or required keys could not be resolved.
    #[error("Missing key: {0}")]
    MissingKey(String),

    /// The signing primitive failed.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// The node refused the transaction.
    #[error("{}", format_rejection(.what, .code, .details))]
    ChainRejection {
        what: String,
        code: i64,
        details: Vec<String>,
    },

    /// The node answered with nothing we could interpret.
    #[error("Did not receive anything from the chain")]
    NoResponse,

    /// The cached chain info cannot anchor a transaction.
    #[error("Invalid chain info: {0}")]
    InvalidChainInfo(String),

    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// Node answered with an unexpected HTTP status.
    #[error("HTTP {status} from node: {body}")]
    Http { status: u16, body: String },

    /// The response body could not be decoded.
    #[error("Failed to parse response: {0}")]
    ParseResponse(String),
}

fn format_rejection(what: &str, code: &i64, details: &[String]) -> String {
    let mut msg = format!("{what} ({code}): ");
    for detail in details {
        msg.push_str(detail);
        msg.push_str("; ");
    }
    msg
}

/// Result type for chain operations.
pub type ChainResult<T> = Result<T, ChainError>;

/// Snapshot of the chain head returned by `get_info`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainInfo {
    pub last_irreversible_block_id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChainInfo {
    pub fn new(last_irreversible_block_id: impl Into<String>) -> Self {
        Self {
            last_irreversible_block_id: last_irreversible_block_id.into(),
            extra: Map::new(),
        }
    }

    fn block_id_bytes(&self) -> ChainResult<Vec<u8>> {
        let bytes = hex::decode(&self.last_irreversible_block_id).map_err(|e| {
            ChainError::InvalidChainInfo(format!(
                "last_irreversible_block_id '{}' is not hex: {}",
                self.last_irreversible_block_id, e
            ))
        })?;
        if bytes.len() < 12 {
            return Err(ChainError::InvalidChainInfo(format!(
                "last_irreversible_block_id has {} bytes, need at least 12",
                bytes.len()
            )));
        }
        Ok(bytes)
    }

    /// Big-endian u16 read from bytes 2..4 of the block id.
    pub fn ref_block_num(&self) -> ChainResult<u16> {
        let id = self.block_id_bytes()?;
        Ok(u16::from_be_bytes([id[2], id[3]]))
    }

    /// Little-endian u32 read from bytes 8..12 of the block id.
    pub fn ref_block_prefix(&self) -> ChainResult<u32> {
        let id = self.block_id_bytes()?;
        Ok(u32::from_le_bytes([id[8], id[9], id[10], id[11]]))
    }
}

/// Human-readable action as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub action: String,
    #[serde(default)]
    pub args: Value,
}

impl Action {
    pub fn new(action: impl Into<String>, args: Value) -> Self {
        Self { action: action.into(), args }
    }

    /// String argument by name, if present.
    pub fn arg_str(&self, field: &str) -> Option<&str> {
        self.args.get(field).and_then(Value::as_str)
    }
}

/// Action in the binary form accepted by `push_transaction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryAction {
    pub name: String,
    pub domain: String,
    pub key: String,
    pub data: String,
}

/// Caller input: the actions to push plus any extra transaction fields.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub actions: Vec<Action>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Fully assembled transaction, ready for digest and signing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub expiration: String,
    pub ref_block_num: u16,
    pub ref_block_prefix: u32,
    pub delay_sec: u32,
    pub actions: Vec<BinaryAction>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of `push_transaction`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushTransactionRequest {
    pub signatures: Vec<Signature>,
    pub compression: String,
    pub transaction: Transaction,
}

/// `abi_json_to_bin` response.
#[derive(Debug, Clone, Deserialize)]
pub struct AbiBinResponse {
    pub binargs: String,
}

/// `trx_json_to_digest` response.
#[derive(Debug, Clone, Deserialize)]
pub struct DigestResponse {
    pub digest: Digest,
}

/// `get_required_keys` response.
#[derive(Debug, Clone, Deserialize)]
pub struct RequiredKeysResponse {
    pub required_keys: Vec<String>,
}

/// Error envelope returned by the node on failure.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    pub error: RemoteError,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteError {
    #[serde(default)]
    pub what: String,
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub details: Vec<RemoteErrorDetail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteErrorDetail {
    #[serde(default)]
    pub message: Option<String>,
}

impl From<RemoteError> for ChainError {
    fn from(err: RemoteError) -> Self {
        ChainError::ChainRejection {
            what: err.what,
            code: err.code,
            details: err.details.into_iter().filter_map(|d| d.message).collect(),
        }
    }
}

/// Outcome of a successful push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushReceipt {
    /// Transaction id, when the node reports one.
    pub transaction_id: Option<String>,
}

impl PushReceipt {
    /// Interpret a raw `push_transaction` response.
    pub fn from_response(res: &Value) -> ChainResult<Self> {
        let status = res
            .pointer("/processed/receipt/status")
            .and_then(Value::as_str);
        if status == Some("executed") {
            let transaction_id = res
                .get("transaction_id")
                .or_else(|| res.pointer("/processed/id"))
                .and_then(Value::as_str)
                .map(str::to_string);
            return Ok(Self { transaction_id });
        }

        match serde_json::from_value::<ErrorEnvelope>(res.clone()) {
            Ok(envelope) => Err(envelope.error.into()),
            Err(_) => Err(ChainError::NoResponse),
        }
    }
}

impl fmt::Display for PushReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.transaction_id {
            Some(id) => write!(f, "executed {}", id),
            None => write!(f, "executed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BLOCK_ID: &str = "0000000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d";

    #[test]
    fn test_ref_block_num() {
        let info = ChainInfo::new(BLOCK_ID);
        assert_eq!(info.ref_block_num().unwrap(), 0x0001);

        let info = ChainInfo::new("0000abcd00000000a1b2c3d4");
        assert_eq!(info.ref_block_num().unwrap(), 0xabcd);
    }

    #[test]
    fn test_ref_block_prefix() {
        let info = ChainInfo::new(BLOCK_ID);
        // bytes 8..12 are 08 09 0a 0b, read little-endian
        assert_eq!(info.ref_block_prefix().unwrap(), 0x0b0a0908);
        assert_eq!(info.ref_block_prefix().unwrap(), 185_207_048);

        let info = ChainInfo::new("0000abcd00000000a1b2c3d4");
        assert_eq!(info.ref_block_prefix().unwrap(), 0xd4c3b2a1);
    }

    #[test]
    fn test_invalid_block_id() {
        let info = ChainInfo::new("zz");
        assert!(matches!(info.ref_block_num(), Err(ChainError::InvalidChainInfo(_))));

        let info = ChainInfo::new("0001");
        assert!(matches!(info.ref_block_prefix(), Err(ChainError::InvalidChainInfo(_))));
    }

    #[test]
    fn test_chain_info_keeps_extra_fields() {
        let info: ChainInfo = serde_json::from_value(json!({
            "last_irreversible_block_id": BLOCK_ID,
            "head_block_num": 42,
        }))
        .unwrap();
        assert_eq!(info.extra["head_block_num"], 42);
    }

    #[test]
    fn test_receipt_executed() {
        let res = json!({
            "transaction_id": "abc",
            "processed": { "receipt": { "status": "executed" } }
        });
        let receipt = PushReceipt::from_response(&res).unwrap();
        assert_eq!(receipt.transaction_id.as_deref(), Some("abc"));
    }

    #[test]
    fn test_rejection_concatenates_details() {
        let res = json!({
            "code": 500,
            "error": {
                "code": 3050003,
                "what": "Domain already exists",
                "details": [
                    { "message": "domain test exists" },
                    { "message": "pending console output" },
                    {}
                ]
            }
        });
        let err = PushReceipt::from_response(&res).unwrap_err();
        match &err {
            ChainError::ChainRejection { code, details, .. } => {
                assert_eq!(*code, 3050003);
                assert_eq!(details.len(), 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(
            err.to_string(),
            "Domain already exists (3050003): domain test exists; pending console output; "
        );
    }

    #[test]
    fn test_not_executed_is_rejection_or_no_response() {
        let res = json!({ "processed": { "receipt": { "status": "hard_fail" } } });
        assert!(matches!(PushReceipt::from_response(&res), Err(ChainError::NoResponse)));

        assert!(matches!(PushReceipt::from_response(&Value::Null), Err(ChainError::NoResponse)));
        assert!(matches!(
            PushReceipt::from_response(&json!("garbage")),
            Err(ChainError::NoResponse)
        ));
    }

    #[test]
    fn test_binary_action_field_order() {
        let action = BinaryAction {
            name: "newdomain".into(),
            domain: "domain".into(),
            key: "test".into(),
            data: "00".into(),
        };
        assert_eq!(
            serde_json::to_string(&action).unwrap(),
            r#"{"name":"newdomain","domain":"domain","key":"test","data":"00"}"#
        );
    }
}
