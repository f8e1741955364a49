//! Transaction assembly, signing, and submission.
//!
//! # Responsibilities
//! - Cache chain head info per assembler instance
//! - Encode actions and fill expiration and reference block fields
//! - Obtain the digest, collect signatures, and push exactly once
//! - Interpret the node's verdict

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, NaiveDateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::chain::encoder::ActionEncoder;
use crate::chain::gateway::ChainGateway;
use crate::chain::signer::{KeyProvider, SignResolver};
use crate::chain::types::{
    ChainInfo, ChainResult, PushReceipt, PushTransactionRequest, Transaction, TransactionConfig,
    TransactionRequest,
};
use crate::chain::wallet::Signature;
use crate::observability::metrics;

/// Compression mode sent with every push.
pub const COMPRESSION_NONE: &str = "none";

const EXPIRATION_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Format `now + window` as whole-second UTC without zone suffix.
pub fn expiration_from(now: NaiveDateTime, window_secs: u64) -> String {
    let window = i64::try_from(window_secs)
        .ok()
        .and_then(ChronoDuration::try_seconds)
        .unwrap_or(ChronoDuration::MAX);
    let at = now.checked_add_signed(window).unwrap_or(NaiveDateTime::MAX);
    at.format(EXPIRATION_FORMAT).to_string()
}

/// Builds, signs and pushes transactions against one chain node.
pub struct TransactionAssembler {
    gateway: Arc<dyn ChainGateway>,
    encoder: ActionEncoder,
    signer: SignResolver,
    keys: KeyProvider,
    config: TransactionConfig,
    /// Cached head info; `None` until first fetched.
    chain_info: Mutex<Option<ChainInfo>>,
}

impl TransactionAssembler {
    /// Create a new assembler.
    ///
    /// # Arguments
    /// * `gateway` - Remote node access
    /// * `keys` - Source of signing keys
    /// * `config` - Expiration window and required-keys strategy
    pub fn new(gateway: Arc<dyn ChainGateway>, keys: KeyProvider, config: TransactionConfig) -> Self {
        Self {
            encoder: ActionEncoder::new(gateway.clone()),
            signer: SignResolver::new(gateway.clone(), config.required_keys),
            gateway,
            keys,
            config,
            chain_info: Mutex::new(None),
        }
    }

    /// Fetch head info from the node and replace the cache.
    #[instrument(skip(self))]
    pub async fn refresh_chain_info(&self) -> ChainResult<ChainInfo> {
        let mut cached = self.chain_info.lock().await;
        let info = self.gateway.get_info().await?;
        debug!(
            last_irreversible_block_id = %info.last_irreversible_block_id,
            "Chain info refreshed"
        );
        *cached = Some(info.clone());
        Ok(info)
    }

    /// Same as `refresh_chain_info`.
    pub async fn get_info(&self) -> ChainResult<ChainInfo> {
        self.refresh_chain_info().await
    }

    /// Cached head info, fetching it on first use.
    ///
    /// The lock is held across the fetch so concurrent callers wait for one
    /// population instead of racing.
    pub async fn chain_info(&self) -> ChainResult<ChainInfo> {
        let mut cached = self.chain_info.lock().await;
        if let Some(info) = cached.as_ref() {
            return Ok(info.clone());
        }
        let info = self.gateway.get_info().await?;
        debug!(
            last_irreversible_block_id = %info.last_irreversible_block_id,
            "Chain info cached"
        );
        *cached = Some(info.clone());
        Ok(info)
    }

    /// Whether head info has been fetched.
    pub async fn is_chain_info_cached(&self) -> bool {
        self.chain_info.lock().await.is_some()
    }

    /// Encode actions and fill every derived field; no digest, no signatures.
    #[instrument(skip(self, request), fields(actions = request.actions.len()))]
    pub async fn build_transaction(&self, request: &TransactionRequest) -> ChainResult<Transaction> {
        let info = self.chain_info().await?;
        let ref_block_num = info.ref_block_num()?;
        let ref_block_prefix = info.ref_block_prefix()?;

        let actions = self.encoder.encode_all(&request.actions).await?;
        let expiration = expiration_from(Utc::now().naive_utc(), self.config.expiration_secs);

        Ok(Transaction {
            expiration,
            ref_block_num,
            ref_block_prefix,
            delay_sec: 0,
            actions,
            extra: request.extra.clone(),
        })
    }

    /// Request the digest of `transaction` and produce its signatures.
    pub async fn sign_transaction(&self, transaction: &Transaction) -> ChainResult<Vec<Signature>> {
        let digest = self.gateway.trx_json_to_digest(transaction).await?;
        debug!(%digest, "Received digest to sign");
        self.signer.resolve(&digest, transaction, &self.keys).await
    }

    /// Assemble, sign and push a transaction.
    ///
    /// The caller's request is never modified. Returns the receipt when the
    /// node reports the transaction as executed.
    #[instrument(skip(self, request), fields(actions = request.actions.len()))]
    pub async fn push_transaction(&self, request: &TransactionRequest) -> ChainResult<PushReceipt> {
        let transaction = self.build_transaction(request).await?;
        let signatures = self.sign_transaction(&transaction).await?;

        let push = PushTransactionRequest {
            signatures,
            compression: COMPRESSION_NONE.to_string(),
            transaction,
        };
        let response = self.gateway.push_transaction(&push).await?;

        match PushReceipt::from_response(&response) {
            Ok(receipt) => {
                info!(
                    transaction_id = receipt.transaction_id.as_deref().unwrap_or("unknown"),
                    signatures = push.signatures.len(),
                    "Transaction executed"
                );
                metrics::record_push(true);
                Ok(receipt)
            }
            Err(e) => {
                warn!(error = %e, "Transaction not executed");
                metrics::record_push(false);
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for TransactionAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionAssembler")
            .field("keys", &self.keys)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
