//! Key resolution and transaction signing.
//!
//! # Flow
//! ```text
//! KeyProvider (static set | resolver)
//!     → normalize every key (private formats first, then public)
//!     → one private key?  sign directly
//!     → otherwise KeyLedger + required public keys
//!         → known private keys queued
//!         → missing ones looked up through the resolver
//!     → one signature per queued key, in queue order
//! ```
//!
//! Either every required signature is produced or the call fails.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::chain::gateway::ChainGateway;
use crate::chain::types::{ChainError, ChainResult, Digest, RequiredKeysStrategy, Transaction};
use crate::chain::wallet::{Key, PrivateKey, PublicKey, Signature};
use crate::observability::metrics;

/// What a key resolver is asked for.
#[derive(Debug, Clone, Copy)]
pub enum KeyRequest<'a> {
    /// Initial request: keys usable for this transaction.
    Transaction(&'a Transaction),
    /// Follow-up request: private keys for these public keys.
    PublicKeys(&'a [PublicKey]),
}

/// Callback-style key source, e.g. a hardware wallet or a remote vault.
#[async_trait]
pub trait KeyResolver: Send + Sync {
    /// Return key strings in any supported encoding.
    async fn resolve(&self, request: KeyRequest<'_>) -> ChainResult<Vec<String>>;
}

struct FnResolver<F>(F);

#[async_trait]
impl<F> KeyResolver for FnResolver<F>
where
    F: Fn(KeyRequest<'_>) -> ChainResult<Vec<String>> + Send + Sync,
{
    async fn resolve(&self, request: KeyRequest<'_>) -> ChainResult<Vec<String>> {
        (self.0)(request)
    }
}

/// Source of signing keys for a transaction.
#[derive(Clone)]
pub enum KeyProvider {
    /// Fixed key set. Cannot answer follow-up lookups.
    Static(Vec<String>),
    /// Keys produced on demand.
    Resolver(Arc<dyn KeyResolver>),
}

impl KeyProvider {
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        KeyProvider::Static(keys.into_iter().map(Into::into).collect())
    }

    pub fn resolver(resolver: impl KeyResolver + 'static) -> Self {
        KeyProvider::Resolver(Arc::new(resolver))
    }

    /// Wrap a synchronous closure as a resolver.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(KeyRequest<'_>) -> ChainResult<Vec<String>> + Send + Sync + 'static,
    {
        Self::resolver(FnResolver(f))
    }

    async fn keys_for(&self, transaction: &Transaction) -> ChainResult<Vec<String>> {
        match self {
            KeyProvider::Static(keys) => Ok(keys.clone()),
            KeyProvider::Resolver(resolver) => {
                resolver.resolve(KeyRequest::Transaction(transaction)).await
            }
        }
    }
}

impl fmt::Debug for KeyProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyProvider::Static(keys) => write!(f, "KeyProvider::Static([{} redacted])", keys.len()),
            KeyProvider::Resolver(_) => f.write_str("KeyProvider::Resolver"),
        }
    }
}

/// Public keys the caller can reach, with their private key when known.
///
/// Insertion order is kept. A public key seen both alone and through its
/// private key keeps the private key.
#[derive(Debug, Default)]
pub struct KeyLedger {
    entries: Vec<(PublicKey, Option<PrivateKey>)>,
}

impl KeyLedger {
    pub fn from_keys(keys: &[Key]) -> Self {
        let mut ledger = Self::default();
        for key in keys {
            ledger.insert(key);
        }
        ledger
    }

    pub fn insert(&mut self, key: &Key) {
        let public = key.public_key();
        let private = match key {
            Key::Private(private) => Some(private.clone()),
            Key::Public(_) => None,
        };
        match self.entries.iter_mut().find(|(p, _)| *p == public) {
            Some(entry) => {
                if entry.1.is_none() {
                    entry.1 = private;
                }
            }
            None => self.entries.push((public, private)),
        }
    }

    pub fn public_keys(&self) -> Vec<PublicKey> {
        self.entries.iter().map(|(public, _)| *public).collect()
    }

    pub fn private_key(&self, public: &PublicKey) -> Option<&PrivateKey> {
        self.entries
            .iter()
            .find(|(p, _)| p == public)
            .and_then(|(_, private)| private.as_ref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Chooses signing keys for a transaction and signs its digest.
#[derive(Clone)]
pub struct SignResolver {
    gateway: Arc<dyn ChainGateway>,
    strategy: RequiredKeysStrategy,
}

impl SignResolver {
    pub fn new(gateway: Arc<dyn ChainGateway>, strategy: RequiredKeysStrategy) -> Self {
        Self { gateway, strategy }
    }

    /// Produce every signature `transaction` needs over `digest`.
    pub async fn resolve(
        &self,
        digest: &Digest,
        transaction: &Transaction,
        provider: &KeyProvider,
    ) -> ChainResult<Vec<Signature>> {
        let raw = provider.keys_for(transaction).await?;
        let keys = raw
            .iter()
            .map(|k| Key::normalize(k))
            .collect::<ChainResult<Vec<_>>>()?;

        if keys.is_empty() {
            return Err(ChainError::MissingKey(
                "no keys supplied, check your key provider".to_string(),
            ));
        }

        if let [Key::Private(private)] = keys.as_slice() {
            debug!(public_key = %private.public_key(), "Signing with single supplied key");
            let signature = private.sign_digest(digest)?;
            metrics::record_signatures("single", 1);
            return Ok(vec![signature]);
        }

        let ledger = KeyLedger::from_keys(&keys);
        let required = self.required_keys(transaction, &ledger).await?;

        let mut queue = Vec::with_capacity(required.len());
        let mut missing = Vec::new();
        for public in required {
            match ledger.private_key(&public) {
                Some(private) => queue.push(private.clone()),
                None => missing.push(public),
            }
        }

        if !missing.is_empty() {
            queue.extend(self.lookup_missing(provider, &missing).await?);
        }

        let signatures = queue
            .iter()
            .map(|private| private.sign_digest(digest))
            .collect::<ChainResult<Vec<_>>>()?;

        info!(
            candidates = ledger.len(),
            signatures = signatures.len(),
            looked_up = missing.len(),
            "Signed transaction"
        );
        metrics::record_signatures("multi", signatures.len());
        Ok(signatures)
    }

    async fn required_keys(
        &self,
        transaction: &Transaction,
        ledger: &KeyLedger,
    ) -> ChainResult<Vec<PublicKey>> {
        let candidates = ledger.public_keys();
        match self.strategy {
            RequiredKeysStrategy::Query => {
                let available: Vec<String> = candidates.iter().map(ToString::to_string).collect();
                let required = self
                    .gateway
                    .get_required_keys(transaction, &available)
                    .await?;
                if required.is_empty() {
                    return Err(ChainError::MissingKey(
                        "chain reported no required keys for this transaction".to_string(),
                    ));
                }
                required.iter().map(|k| k.parse::<PublicKey>()).collect()
            }
            RequiredKeysStrategy::FirstCandidate => {
                warn!(
                    candidates = candidates.len(),
                    "Assuming the first candidate is the only required key; multi-signature \
                     transactions will be rejected"
                );
                Ok(candidates.into_iter().take(1).collect())
            }
        }
    }

    async fn lookup_missing(
        &self,
        provider: &KeyProvider,
        missing: &[PublicKey],
    ) -> ChainResult<Vec<PrivateKey>> {
        let listed = || {
            missing
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };

        let resolver = match provider {
            KeyProvider::Resolver(resolver) => resolver,
            KeyProvider::Static(_) => {
                return Err(ChainError::MissingKey(format!(
                    "a key resolver function is needed for private key lookup of {}",
                    listed()
                )));
            }
        };

        debug!(missing = %listed(), "Looking up missing private keys");
        let mut found = Vec::new();
        for raw in resolver.resolve(KeyRequest::PublicKeys(missing)).await? {
            match Key::normalize(&raw)? {
                Key::Private(private) => found.push(private),
                Key::Public(public) => {
                    return Err(ChainError::InvalidKey(format!(
                        "key resolver returned public key {} where a private key was requested",
                        public
                    )));
                }
            }
        }

        let mut resolved = Vec::with_capacity(missing.len());
        let mut uncovered = Vec::new();
        for public in missing {
            match found.iter().find(|private| private.public_key() == *public) {
                Some(private) => resolved.push(private.clone()),
                None => uncovered.push(public.to_string()),
            }
        }
        if !uncovered.is_empty() {
            return Err(ChainError::MissingKey(format!(
                "key resolver returned no private key for {}",
                uncovered.join(", ")
            )));
        }
        Ok(resolved)
    }
}
