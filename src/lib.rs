//! # hybrid-layer-orchestrator
//!
//! Per-request routing between a local inference layer and a remote (cloud)
//! inference layer, with single-hop fallback, an emergency floor, and running
//! routing-efficiency metrics.
//!
//! ## Architecture
//!
//! ```text
//! route(query, options)
//!   → ProcessingRequest ─┬─ PolicyEngine::decide ← NodeMonitor snapshot
//!                        └─ FallbackController::execute
//!                              ├─ LocalAdapter  → LocalRuntime (ollama CLI)
//!                              └─ RemoteAdapter → RemoteInference (HTTP API)
//!   → MetricsAggregator::record → ExecutionResult
//! ```

// ── Lint policy ───────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(missing_docs)]

use thiserror::Error;
use tracing_subscriber::EnvFilter;

pub mod config;
pub mod execution;
pub mod fallback;
pub mod metrics;
pub mod metrics_server;
pub mod node;
pub mod orchestrator;
pub mod request;
pub mod routing;
pub mod worker;

// Re-exports for convenience
pub use config::{LogFormat, OrchestratorConfig};
pub use execution::{ExecutionResult, LocalFailure, RemoteFailure, ResultLayer};
pub use fallback::FallbackController;
pub use metrics::{MetricsAggregator, MetricsSnapshot};
pub use node::{
    FixedSampler, NodeMonitor, NodeState, NodeStatus, ResourceSampler, ResourceUsage,
    SysinfoSampler,
};
pub use orchestrator::{Collaborators, Orchestrator, StatusSnapshot};
pub use request::{Complexity, Priority, ProcessingRequest, RouteOptions, Sensitivity};
pub use routing::{ComplexityScorer, Layer, ModelSelector, PolicyEngine};
pub use worker::{
    AllowedModels, AnthropicClient, EchoRemote, EchoRuntime, LocalRuntime, ModelLister, OllamaCli,
    RemoteInference, StaticModels, WorkerError,
};

/// Initialise the global tracing subscriber.
///
/// Reads the `LOG_FORMAT` environment variable to choose output format:
/// - `"json"` - structured JSON output for log aggregators
/// - anything else (including unset) - human-readable pretty output
///
/// Filter level is controlled by `RUST_LOG` (e.g. `RUST_LOG=info`).
///
/// # Errors
///
/// Returns [`OrchestratorError::Other`] if the global subscriber has already
/// been set (e.g. by a previous call or a test harness).
///
/// # Example
///
/// ```no_run
/// # use hybrid_layer_orchestrator::{init_tracing, OrchestratorError};
/// # fn example() -> Result<(), OrchestratorError> {
/// init_tracing()?;
/// # Ok(()) }
/// ```
pub fn init_tracing() -> Result<(), OrchestratorError> {
    let format = std::env::var("LOG_FORMAT")
        .map(|v| LogFormat::from_label(&v))
        .unwrap_or_default();
    init_tracing_with(format)
}

/// Initialise the global tracing subscriber with an explicit output format.
///
/// # Errors
///
/// Returns [`OrchestratorError::Other`] if a global subscriber is already set.
pub fn init_tracing_with(format: LogFormat) -> Result<(), OrchestratorError> {
    let result = match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .with_span_list(true)
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .try_init(),
    };

    result.map_err(|e| OrchestratorError::Other(format!("tracing init failed: {e}")))
}

/// Errors surfaced to callers of the orchestrator.
///
/// Backend failures never appear here: the fallback controller absorbs them
/// into an alternate-layer or emergency result. Only invalid input and
/// caller cancellation reach the caller.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// A request field is invalid (unknown label, empty query).
    ///
    /// Raised while building the [`ProcessingRequest`], before any routing.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The caller cancelled the request while it was in flight.
    #[error("request canceled")]
    Canceled,

    /// Catch-all for errors that do not fit a specific variant.
    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_display_includes_message() {
        let err = OrchestratorError::Configuration("unknown priority 'urgent'".to_string());
        assert!(err.to_string().contains("unknown priority 'urgent'"));
    }

    #[test]
    fn test_canceled_display() {
        assert_eq!(OrchestratorError::Canceled.to_string(), "request canceled");
    }

    #[test]
    fn test_init_tracing_second_call_returns_err() {
        // First call may succeed or fail depending on test execution order.
        let _ = init_tracing();
        let result = init_tracing_with(LogFormat::Json);
        assert!(result.is_err(), "double init must return Err, not panic");
    }
}
