//! Local execution adapter.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use super::{elapsed_ms, ExecutionResult, LocalFailure, ResultLayer};
use crate::node::NodeMonitor;
use crate::request::ProcessingRequest;
use crate::routing::ModelSelector;
use crate::worker::{LocalRuntime, WorkerError};

/// Default local runtime timeout.
pub const DEFAULT_LOCAL_TIMEOUT: Duration = Duration::from_secs(30);

/// Default confidence attached to local answers.
pub const DEFAULT_LOCAL_CONFIDENCE: f64 = 0.95;

/// Runs requests on the local runtime.
pub struct LocalAdapter {
    runtime: Arc<dyn LocalRuntime>,
    monitor: Arc<NodeMonitor>,
    selector: ModelSelector,
    timeout: Duration,
    confidence: f64,
}

impl LocalAdapter {
    /// Adapter with default timeout and confidence.
    pub fn new(
        runtime: Arc<dyn LocalRuntime>,
        monitor: Arc<NodeMonitor>,
        selector: ModelSelector,
    ) -> Self {
        Self {
            runtime,
            monitor,
            selector,
            timeout: DEFAULT_LOCAL_TIMEOUT,
            confidence: DEFAULT_LOCAL_CONFIDENCE,
        }
    }

    /// Set the runtime timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the confidence reported on success.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Run `request` on the best local model.
    ///
    /// # Errors
    ///
    /// - [`LocalFailure::NoModelsAvailable`] when the node lists no models
    /// - [`LocalFailure::Timeout`] when the runtime exceeds the timeout
    /// - [`LocalFailure::RuntimeError`] on spawn failure or non-zero exit
    pub async fn run(&self, request: &ProcessingRequest) -> Result<ExecutionResult, LocalFailure> {
        let started = Instant::now();
        let node = self.monitor.current();

        let model = self
            .selector
            .select(&node.available_models, request)
            .ok_or(LocalFailure::NoModelsAvailable)?
            .to_string();

        debug!(request_id = %request.request_id, model = %model, "running locally");

        let output = tokio::time::timeout(
            self.timeout,
            self.runtime.execute(&model, &request.query, self.timeout),
        )
        .await
        .map_err(|_| LocalFailure::Timeout {
            after: self.timeout,
        })?
        .map_err(|e| match e {
            WorkerError::Timeout(after) => LocalFailure::Timeout { after },
            other => LocalFailure::RuntimeError {
                detail: other.to_string(),
            },
        })?;

        if output.exit_code != 0 {
            return Err(LocalFailure::RuntimeError {
                detail: format!(
                    "{model} exited with status {}: {}",
                    output.exit_code,
                    output.stderr.trim()
                ),
            });
        }

        Ok(ExecutionResult {
            layer: ResultLayer::Local,
            model_or_provider: model,
            response_text: output.stdout.trim().to_string(),
            processing_time_ms: elapsed_ms(started.elapsed()),
            confidence: self.confidence,
            is_fallback: false,
        })
    }
}
