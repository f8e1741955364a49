//! Transaction pipeline subsystem.
//!
//! # Data Flow
//! ```text
//! TransactionRequest (caller actions + extra fields)
//!     → assembler.rs (chain info cache, expiration, reference block)
//!     → encoder.rs + mapper.rs (abi_json_to_bin, domain/key routing)
//!     → gateway.rs (trx_json_to_digest)
//!     → signer.rs + wallet.rs (required keys, key lookup, signing)
//!     → gateway.rs (push_transaction)
//!     → PushReceipt or ChainError
//! ```
//!
//! # Security Constraints
//! - Private keys never appear in logs or Debug output
//! - Keys are normalized to one canonical form before comparison
//! - A transaction is pushed at most once per call

pub mod assembler;
pub mod encoder;
pub mod gateway;
pub mod mapper;
pub mod signer;
pub mod types;
pub mod wallet;

pub use assembler::TransactionAssembler;
pub use gateway::{ChainGateway, HttpGateway};
pub use mapper::ActionKind;
pub use signer::{KeyProvider, KeyRequest, KeyResolver, SignResolver};
pub use types::{
    Action, BinaryAction, ChainError, ChainInfo, ChainResult, Digest, PushReceipt, Transaction,
    TransactionRequest,
};
pub use wallet::{Key, PrivateKey, PublicKey, Signature};
