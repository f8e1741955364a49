//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, ports valid)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;

use crate::config::schema::ClientConfig;

/// A single semantic problem in a config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check a parsed config, collecting every error.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let protocol = config.endpoint.protocol.as_str();
    if protocol != "http" && protocol != "https" {
        errors.push(ValidationError {
            field: "endpoint.protocol",
            message: format!("expected 'http' or 'https', got '{}'", protocol),
        });
    }

    if config.endpoint.host.trim().is_empty() {
        errors.push(ValidationError {
            field: "endpoint.host",
            message: "must not be empty".to_string(),
        });
    }

    if config.endpoint.port == 0 {
        errors.push(ValidationError {
            field: "endpoint.port",
            message: "must be non-zero".to_string(),
        });
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError {
            field: "timeouts.request_secs",
            message: "must be greater than zero".to_string(),
        });
    }

    if config.transaction.expiration_secs == 0 {
        errors.push(ValidationError {
            field: "transaction.expiration_secs",
            message: "must be greater than zero".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
