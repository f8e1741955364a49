//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the chain client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// Chain node endpoint.
    pub endpoint: EndpointConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Transaction assembly settings.
    pub transaction: TransactionConfig,

    /// Key material supplied from the config file.
    pub keys: KeysConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Chain node endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// "http" or "https".
    pub protocol: String,

    /// Node host name or address.
    pub host: String,

    /// Node HTTP port.
    pub port: u16,
}

impl EndpointConfig {
    /// Base URL of the node, e.g. `http://127.0.0.1:8888`.
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "127.0.0.1".to_string(),
            port: 8888,
        }
    }
}

/// Timeout configuration for remote calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Per-request timeout in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 10 }
    }
}

/// How the signer learns which public keys must sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RequiredKeysStrategy {
    /// Ask the node via `get_required_keys`.
    #[default]
    Query,
    /// Treat the first candidate key as the only required key, without asking.
    FirstCandidate,
}

/// Transaction assembly settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransactionConfig {
    /// Seconds from now until the transaction expires.
    pub expiration_secs: u64,

    /// Required-keys resolution strategy.
    pub required_keys: RequiredKeysStrategy,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            expiration_secs: 100,
            required_keys: RequiredKeysStrategy::Query,
        }
    }
}

/// Static key set.
#[derive(Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct KeysConfig {
    /// Public or private key strings in any supported encoding.
    pub static_keys: Vec<String>,
}

impl std::fmt::Debug for KeysConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeysConfig")
            .field("static_keys", &format_args!("[{} redacted]", self.static_keys.len()))
            .finish()
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Record metrics through the `metrics` facade.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.endpoint.base_url(), "http://127.0.0.1:8888");
        assert_eq!(config.transaction.expiration_secs, 100);
        assert_eq!(config.transaction.required_keys, RequiredKeysStrategy::Query);
        assert!(config.keys.static_keys.is_empty());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: ClientConfig = toml::from_str(
            r#"
            [endpoint]
            host = "node.example"

            [transaction]
            required_keys = "first_candidate"
            "#,
        )
        .unwrap();
        assert_eq!(config.endpoint.base_url(), "http://node.example:8888");
        assert_eq!(config.transaction.required_keys, RequiredKeysStrategy::FirstCandidate);
        assert_eq!(config.timeouts.request_secs, 10);
    }

    #[test]
    fn test_keys_debug_is_redacted() {
        let keys = KeysConfig {
            static_keys: vec!["5KQwrPbwdL6PhXujxW37FSSQZ1JiwsST4cqQzDeyXtP79zkvFD3".into()],
        };
        let debug = format!("{:?}", keys);
        assert!(!debug.contains("5KQw"));
        assert!(debug.contains("1 redacted"));
    }
}
