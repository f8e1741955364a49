//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::ClientConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable holding comma-separated private keys.
pub const PRIVATE_KEYS_ENV_VAR: &str = "EVT_PRIVATE_KEYS";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ClientConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ClientConfig, ConfigError> {
    let config: ClientConfig = toml::from_str(content).map_err(ConfigError::Parse)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Keys from the config file followed by keys from `EVT_PRIVATE_KEYS`.
pub fn collect_static_keys(config: &ClientConfig) -> Vec<String> {
    let from_env = std::env::var(PRIVATE_KEYS_ENV_VAR).unwrap_or_default();
    merge_keys(&config.keys.static_keys, &from_env)
}

fn merge_keys(configured: &[String], env_value: &str) -> Vec<String> {
    let mut keys = configured.to_vec();
    keys.extend(
        env_value
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string),
    );
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config_from_file() {
        let path = std::env::temp_dir()
            .join(format!("evt_client_test_config_{}.toml", std::process::id()));
        fs::write(
            &path,
            r#"
            [endpoint]
            protocol = "https"
            host = "testnet.everitoken.io"
            port = 443

            [keys]
            static_keys = ["EVT6Qz3wuRjyN6gaU3P3XRxpz5eNFNyVxE8qgRpXgHrVRhUamgQpv"]
            "#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.endpoint.base_url(), "https://testnet.everitoken.io:443");
        assert_eq!(config.keys.static_keys.len(), 1);

        std::fs::remove_file(&path).unwrap_or_default();
    }

    #[test]
    fn test_missing_file() {
        let result = load_config(Path::new("/nonexistent/evt-client.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_parse_error() {
        let result = parse_config("[endpoint\nhost = ");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_validation_error_display() {
        let err = parse_config("[endpoint]\nport = 0\n[timeouts]\nrequest_secs = 0").unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("Validation failed: "));
        assert!(msg.contains("endpoint.port"));
        assert!(msg.contains("timeouts.request_secs"));
    }

    #[test]
    fn test_merge_keys() {
        let configured = vec!["a".to_string()];
        assert_eq!(merge_keys(&configured, " b , ,c"), vec!["a", "b", "c"]);
        assert_eq!(merge_keys(&configured, ""), vec!["a"]);
    }
}
