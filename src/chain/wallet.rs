//! Key handling and digest signing.
//!
//! # Security
//! - Private keys arrive per call from a key provider; nothing is persisted
//! - Private keys are never logged, printed by `Debug`, or echoed in errors
//!
//! # Encodings
//! ```text
//! private  WIF        base58(0x80 || key || sha256d(0x80 || key)[..4])
//!          PVT_K1_    base58(key || ripemd160(key || "K1")[..4])
//! public   EVT / EOS  base58(point || ripemd160(point)[..4])
//!          PUB_K1_    base58(point || ripemd160(point || "K1")[..4])
//! sig      SIG_K1_    base58(i || r || s || ripemd160(i || r || s || "K1")[..4])
//! ```
//! Canonical forms are WIF for private keys and `EVT` for public keys.

use std::fmt;
use std::str::FromStr;

use k256::ecdsa::hazmat::SignPrimitive;
use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{FieldBytes, Scalar};
use ripemd::Ripemd160;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest as _, Sha256};

use crate::chain::types::{ChainError, ChainResult, Digest};

/// Prefix of canonical public keys.
pub const PUBLIC_KEY_PREFIX: &str = "EVT";

const LEGACY_PUBLIC_PREFIXES: [&str; 2] = ["EVT", "EOS"];
const K1_PRIVATE_PREFIX: &str = "PVT_K1_";
const K1_PUBLIC_PREFIX: &str = "PUB_K1_";
const K1_SIGNATURE_PREFIX: &str = "SIG_K1_";
const K1_SUFFIX: &[u8] = b"K1";
const WIF_VERSION: u8 = 0x80;
// 27 + 4 marks a compressed-key recovery id
const RECOVERY_OFFSET: u8 = 31;
const MAX_SIGNING_ATTEMPTS: u32 = 1024;

fn ripemd160_checksum(data: &[u8], suffix: &[u8]) -> [u8; 4] {
    let mut hasher = Ripemd160::new();
    hasher.update(data);
    hasher.update(suffix);
    let hash = hasher.finalize();
    [hash[0], hash[1], hash[2], hash[3]]
}

fn sha256d_checksum(data: &[u8]) -> [u8; 4] {
    let hash = Sha256::digest(Sha256::digest(data));
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Decode base58 and split off a trailing 4-byte checksum.
fn decode_checked(body: &str) -> Option<(Vec<u8>, [u8; 4])> {
    let mut raw = bs58::decode(body).into_vec().ok()?;
    if raw.len() < 4 {
        return None;
    }
    let split = raw.len() - 4;
    let checksum = [raw[split], raw[split + 1], raw[split + 2], raw[split + 3]];
    raw.truncate(split);
    Some((raw, checksum))
}

fn encode_with_checksum(data: &[u8], checksum: [u8; 4]) -> String {
    let mut raw = Vec::with_capacity(data.len() + 4);
    raw.extend_from_slice(data);
    raw.extend_from_slice(&checksum);
    bs58::encode(raw).into_string()
}

/// Short, non-revealing description of a rejected key string.
fn describe_rejected(value: &str) -> String {
    let head: String = value.chars().take(3).collect();
    format!("'{}...' ({} chars) is neither a private nor a public key", head, value.len())
}

/// A secp256k1 private key.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey {
    secret: k256::SecretKey,
}

impl PrivateKey {
    /// Build from raw scalar bytes, rejecting zero and out-of-range values.
    pub fn from_bytes(bytes: &[u8; 32]) -> ChainResult<Self> {
        let secret = k256::SecretKey::from_slice(bytes)
            .map_err(|_| ChainError::InvalidKey("private key scalar out of range".to_string()))?;
        Ok(Self { secret })
    }

    /// Validate `value` as a WIF or `PVT_K1_` private key.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let bytes = match value.strip_prefix(K1_PRIVATE_PREFIX) {
            Some(body) => {
                let (data, checksum) = decode_checked(body)?;
                if data.len() != 32 || ripemd160_checksum(&data, K1_SUFFIX) != checksum {
                    return None;
                }
                data
            }
            None => {
                let (data, checksum) = decode_checked(value)?;
                if data.len() != 33 || data[0] != WIF_VERSION || sha256d_checksum(&data) != checksum
                {
                    return None;
                }
                data[1..].to_vec()
            }
        };
        let bytes: [u8; 32] = bytes.try_into().ok()?;
        Self::from_bytes(&bytes).ok()
    }

    fn to_bytes(&self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&self.secret.to_bytes());
        bytes
    }

    /// Legacy WIF encoding (canonical).
    pub fn to_wif(&self) -> String {
        let mut data = Vec::with_capacity(33);
        data.push(WIF_VERSION);
        data.extend_from_slice(&self.to_bytes());
        let checksum = sha256d_checksum(&data);
        encode_with_checksum(&data, checksum)
    }

    /// `PVT_K1_` encoding.
    pub fn to_k1_string(&self) -> String {
        let bytes = self.to_bytes();
        let checksum = ripemd160_checksum(&bytes, K1_SUFFIX);
        format!("{}{}", K1_PRIVATE_PREFIX, encode_with_checksum(&bytes, checksum))
    }

    /// The matching compressed public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_k256(&self.secret.public_key())
    }

    /// Sign a 32-byte digest.
    ///
    /// RFC6979 nonces are re-derived with a counter as added entropy until
    /// the signature is canonical; the result is deterministic per digest.
    pub fn sign_digest(&self, digest: &Digest) -> ChainResult<Signature> {
        let secret = self.secret.to_nonzero_scalar();
        let scalar: &Scalar = &secret;
        let z = FieldBytes::from_slice(digest.as_slice());

        for attempt in 0..MAX_SIGNING_ATTEMPTS {
            let entropy = Sha256::new()
                .chain_update(digest.as_slice())
                .chain_update(attempt.to_le_bytes())
                .finalize();
            let (signature, recovery_id) = scalar
                .try_sign_prehashed_rfc6979::<Sha256>(z, &entropy)
                .map_err(|e| ChainError::Signing(e.to_string()))?;
            let recovery_id = recovery_id
                .ok_or_else(|| ChainError::Signing("missing recovery id".to_string()))?;

            let bytes = signature.to_bytes();
            let (r, s) = split_scalars(&bytes);
            if !is_canonical(&r, &s) {
                continue;
            }
            if attempt > 0 {
                tracing::trace!(attempt, "Found canonical signature");
            }

            let mut data = Vec::with_capacity(65);
            data.push(RECOVERY_OFFSET + recovery_id.to_byte());
            data.extend_from_slice(&r);
            data.extend_from_slice(&s);
            let checksum = ripemd160_checksum(&data, K1_SUFFIX);
            return Ok(Signature(format!(
                "{}{}",
                K1_SIGNATURE_PREFIX,
                encode_with_checksum(&data, checksum)
            )));
        }

        Err(ChainError::Signing(format!(
            "no canonical signature after {} attempts",
            MAX_SIGNING_ATTEMPTS
        )))
    }
}

impl FromStr for PrivateKey {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ChainError::InvalidKey(describe_rejected(s)))
    }
}

impl fmt::Display for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wif())
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("public_key", &self.public_key().to_string())
            .finish_non_exhaustive()
    }
}

fn split_scalars(bytes: &[u8]) -> ([u8; 32], [u8; 32]) {
    let mut r = [0u8; 32];
    let mut s = [0u8; 32];
    r.copy_from_slice(&bytes[..32]);
    s.copy_from_slice(&bytes[32..64]);
    (r, s)
}

/// r and s must both encode as positive 32-byte values without padding.
fn is_canonical(r: &[u8; 32], s: &[u8; 32]) -> bool {
    let ok = |b: &[u8; 32]| b[0] & 0x80 == 0 && !(b[0] == 0 && b[1] & 0x80 == 0);
    ok(r) && ok(s)
}

/// A compressed secp256k1 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PublicKey {
    point: [u8; 33],
}

impl PublicKey {
    fn from_k256(key: &k256::PublicKey) -> Self {
        let encoded = key.to_encoded_point(true);
        let mut point = [0u8; 33];
        point.copy_from_slice(encoded.as_bytes());
        Self { point }
    }

    /// Build from a compressed SEC1 point, checking it lies on the curve.
    pub fn from_sec1(point: &[u8]) -> Option<Self> {
        if point.len() != 33 {
            return None;
        }
        let key = k256::PublicKey::from_sec1_bytes(point).ok()?;
        Some(Self::from_k256(&key))
    }

    /// Validate `value` as an `EVT`/`EOS` or `PUB_K1_` public key.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Some(body) = value.strip_prefix(K1_PUBLIC_PREFIX) {
            let (data, checksum) = decode_checked(body)?;
            if ripemd160_checksum(&data, K1_SUFFIX) != checksum {
                return None;
            }
            return Self::from_sec1(&data);
        }

        let body = LEGACY_PUBLIC_PREFIXES
            .iter()
            .find_map(|prefix| value.strip_prefix(prefix))?;
        let (data, checksum) = decode_checked(body)?;
        if ripemd160_checksum(&data, &[]) != checksum {
            return None;
        }
        Self::from_sec1(&data)
    }

    /// Compressed SEC1 bytes.
    pub fn as_bytes(&self) -> &[u8; 33] {
        &self.point
    }

    /// `PUB_K1_` encoding.
    pub fn to_k1_string(&self) -> String {
        let checksum = ripemd160_checksum(&self.point, K1_SUFFIX);
        format!("{}{}", K1_PUBLIC_PREFIX, encode_with_checksum(&self.point, checksum))
    }
}

impl FromStr for PublicKey {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ChainError::InvalidKey(format!("'{}' is not a public key", s)))
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let checksum = ripemd160_checksum(&self.point, &[]);
        write!(f, "{}{}", PUBLIC_KEY_PREFIX, encode_with_checksum(&self.point, checksum))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self)
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A key supplied by a key provider, after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Private(PrivateKey),
    Public(PublicKey),
}

impl Key {
    /// Classify and canonicalize a key string.
    ///
    /// Private formats are checked first, then public formats.
    pub fn normalize(value: &str) -> ChainResult<Self> {
        if let Some(private) = PrivateKey::parse(value) {
            return Ok(Key::Private(private));
        }
        if let Some(public) = PublicKey::parse(value) {
            return Ok(Key::Public(public));
        }
        Err(ChainError::InvalidKey(describe_rejected(value)))
    }

    /// The public half of this key.
    pub fn public_key(&self) -> PublicKey {
        match self {
            Key::Private(private) => private.public_key(),
            Key::Public(public) => *public,
        }
    }

    pub fn is_private(&self) -> bool {
        matches!(self, Key::Private(_))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Private(private) => private.fmt(f),
            Key::Public(public) => public.fmt(f),
        }
    }
}

/// A `SIG_K1_` signature string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(String);

impl Signature {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Recover the public key that produced this signature over `digest`.
    pub fn recover_public_key(&self, digest: &Digest) -> ChainResult<PublicKey> {
        let invalid = || ChainError::Signing(format!("malformed signature '{}'", self.0));

        let body = self.0.strip_prefix(K1_SIGNATURE_PREFIX).ok_or_else(invalid)?;
        let (data, checksum) = decode_checked(body).ok_or_else(invalid)?;
        if data.len() != 65 || ripemd160_checksum(&data, K1_SUFFIX) != checksum {
            return Err(invalid());
        }
        let recovery_id = data[0]
            .checked_sub(RECOVERY_OFFSET)
            .and_then(RecoveryId::from_byte)
            .ok_or_else(invalid)?;
        let signature = EcdsaSignature::from_slice(&data[1..]).map_err(|_| invalid())?;

        let verifying_key =
            VerifyingKey::recover_from_prehash(digest.as_slice(), &signature, recovery_id)
                .map_err(|e| ChainError::Signing(e.to_string()))?;
        Ok(PublicKey::from_k256(&k256::PublicKey::from(&verifying_key)))
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Signature> for String {
    fn from(sig: Signature) -> Self {
        sig.0
    }
}
