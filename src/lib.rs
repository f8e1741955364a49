//! everiToken transaction client library.
//!
//! Assembles, signs and pushes transactions to an everiToken node over its
//! HTTP API.

pub mod chain;
pub mod config;
pub mod observability;

pub use chain::{ChainError, KeyProvider, TransactionAssembler, TransactionRequest};
pub use config::ClientConfig;
