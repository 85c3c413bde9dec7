//! # Stage: Layer Execution
//!
//! ## Responsibility
//! Run one request against one layer and normalise the outcome into an
//! [`ExecutionResult`] or a typed failure.
//!
//! ## Guarantees
//! - Bounded: every attempt is wrapped in a timeout (30 s local, 10 s remote
//!   by default).
//! - Typed failures: callers match on [`LocalFailure`] / [`RemoteFailure`]
//!   instead of parsing strings.
//! - No retries: one call, one attempt.
//!
//! ## NOT Responsible For
//! - Choosing the layer (see: `routing::policy`)
//! - Falling back to the other layer (see: `fallback`)

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod local;
pub mod remote;

pub use local::LocalAdapter;
pub use remote::RemoteAdapter;

/// Layer that produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultLayer {
    /// Local inference runtime.
    Local,
    /// Remote inference service.
    Remote,
    /// Canned emergency answer after both layers failed.
    LocalFallback,
}

impl ResultLayer {
    /// Label used in logs, metrics and JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
            Self::LocalFallback => "local_fallback",
        }
    }
}

impl fmt::Display for ResultLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalised outcome of a routed request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Layer that produced the answer.
    pub layer: ResultLayer,
    /// Local model name or remote provider label.
    pub model_or_provider: String,
    /// Answer text.
    pub response_text: String,
    /// Wall-clock time in milliseconds. For fallback results this covers
    /// every attempt since the request started.
    pub processing_time_ms: u64,
    /// Quality estimate in [0, 1]; reported, never validated.
    pub confidence: f64,
    /// `true` when produced after a failed attempt on another layer.
    pub is_fallback: bool,
}

/// Why a local attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocalFailure {
    /// The node reported no loadable models; the runtime was not invoked.
    #[error("no local models available")]
    NoModelsAvailable,

    /// The runtime could not be spawned or exited non-zero.
    #[error("local runtime error: {detail}")]
    RuntimeError {
        /// Exit status and stderr, or the spawn error.
        detail: String,
    },

    /// The runtime did not finish in time.
    #[error("local runtime timed out after {after:?}")]
    Timeout {
        /// Timeout that expired.
        after: Duration,
    },
}

impl LocalFailure {
    /// Short reason label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoModelsAvailable => "no_models_available",
            Self::RuntimeError { .. } => "runtime_error",
            Self::Timeout { .. } => "timeout",
        }
    }
}

/// Why a remote attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteFailure {
    /// No usable response (connection, TLS, malformed body).
    #[error("remote transport error: {0}")]
    TransportError(String),

    /// The service answered with a non-2xx status.
    #[error("remote returned HTTP {status}: {body}")]
    NonSuccessStatus {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The service did not answer in time.
    #[error("remote call timed out after {after:?}")]
    Timeout {
        /// Timeout that expired.
        after: Duration,
    },
}

impl RemoteFailure {
    /// Short reason label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TransportError(_) => "transport_error",
            Self::NonSuccessStatus { .. } => "non_success_status",
            Self::Timeout { .. } => "timeout",
        }
    }
}

pub(crate) fn elapsed_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_layer_labels() {
        assert_eq!(ResultLayer::LocalFallback.to_string(), "local_fallback");
        let json = serde_json::to_string(&ResultLayer::LocalFallback).expect("test: serialize");
        assert_eq!(json, "\"local_fallback\"");
    }

    #[test]
    fn test_failure_kinds() {
        assert_eq!(LocalFailure::NoModelsAvailable.kind(), "no_models_available");
        assert_eq!(
            RemoteFailure::NonSuccessStatus {
                status: 500,
                body: String::new()
            }
            .kind(),
            "non_success_status"
        );
        assert_eq!(
            RemoteFailure::Timeout {
                after: Duration::from_secs(10)
            }
            .kind(),
            "timeout"
        );
    }
}
