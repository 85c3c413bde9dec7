//! Configuration validation engine.
//!
//! ## Responsibility
//! Validate semantic constraints on a parsed [`OrchestratorConfig`] that
//! cannot be expressed through the type system alone.
//!
//! ## Guarantees
//! - Validation collects *all* errors before returning (no short-circuit)
//! - Error messages include the field path and the invalid value
//!
//! ## NOT Responsible For
//! - Parsing TOML (that belongs to `loader`)
//! - File I/O (that belongs to `loader`)

use super::{OrchestratorConfig, RemoteProviderKind};
use crate::routing::config as routing_config;

/// Errors arising from configuration parsing, validation, or I/O.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parsing failed.
    #[error("Parse error in {file}: {source}")]
    Parse {
        /// Path of the file that failed to parse.
        file: String,
        /// Underlying TOML deserialization error.
        #[source]
        source: toml::de::Error,
    },

    /// One or more semantic validation rules failed.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A specific field has an out-of-range or contradictory value.
    #[error("Field '{field}' has invalid value {value}: {reason}")]
    InvalidField {
        /// Dot-separated field path (e.g., "remote.timeout_secs").
        field: String,
        /// String representation of the invalid value.
        value: String,
        /// Human-readable explanation of the constraint.
        reason: String,
    },

    /// File I/O error.
    #[error("IO error reading {file}: {source}")]
    Io {
        /// Path of the file that could not be read.
        file: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> ConfigError {
    ConfigError::InvalidField {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Validate all semantic constraints on an [`OrchestratorConfig`].
///
/// # Errors
///
/// Every violation found, in field order.
pub fn validate(config: &OrchestratorConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    // ── Timeouts ─────────────────────────────────────────────────────
    if config.local.timeout_secs == 0 {
        errors.push(invalid("local.timeout_secs", 0, "must be at least 1 second"));
    }
    if config.remote.timeout_secs == 0 {
        errors.push(invalid("remote.timeout_secs", 0, "must be at least 1 second"));
    }
    if config.local.list_timeout_secs == 0 {
        errors.push(invalid(
            "local.list_timeout_secs",
            0,
            "must be at least 1 second",
        ));
    }
    if config.node.refresh_interval_secs == 0 {
        errors.push(invalid(
            "node.refresh_interval_secs",
            0,
            "must be at least 1 second",
        ));
    }

    // ── Confidences ──────────────────────────────────────────────────
    for (field, value) in [
        ("local.confidence", config.local.confidence),
        ("remote.confidence", config.remote.confidence),
        ("fallback.emergency_confidence", config.fallback.emergency_confidence),
    ] {
        if !(0.0..=1.0).contains(&value) {
            errors.push(invalid(field, value, "must be between 0.0 and 1.0"));
        }
    }

    if let Some(t) = config.remote.temperature {
        if !(0.0..=1.0).contains(&t) {
            errors.push(invalid("remote.temperature", t, "must be between 0.0 and 1.0"));
        }
    }

    // ── Node ─────────────────────────────────────────────────────────
    if !(0.0..=100.0).contains(&config.node.busy_threshold_percent) {
        errors.push(invalid(
            "node.busy_threshold_percent",
            config.node.busy_threshold_percent,
            "must be between 0 and 100",
        ));
    }

    // ── Names ────────────────────────────────────────────────────────
    if config.local.binary.trim().is_empty() {
        errors.push(invalid("local.binary", "", "binary path must not be empty"));
    }
    if config.remote.provider == RemoteProviderKind::Anthropic {
        if config.remote.model.trim().is_empty() {
            errors.push(invalid("remote.model", "", "model name must not be empty"));
        }
        if config.remote.api_key_env.trim().is_empty() {
            errors.push(invalid(
                "remote.api_key_env",
                "",
                "environment variable name must not be empty",
            ));
        }
        if config.remote.max_tokens == 0 {
            errors.push(invalid("remote.max_tokens", 0, "must be at least 1"));
        }
    }

    // ── Metrics port ─────────────────────────────────────────────────
    if config.observability.metrics_port == Some(0) {
        errors.push(invalid(
            "observability.metrics_port",
            0,
            "port must be between 1 and 65535",
        ));
    }

    // ── Routing ──────────────────────────────────────────────────────
    errors.extend(
        routing_config::validate(&config.routing)
            .into_iter()
            .map(|e| ConfigError::Validation(format!("routing.{e}"))),
    );

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
