//! Remote execution adapter.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use super::{elapsed_ms, ExecutionResult, RemoteFailure, ResultLayer};
use crate::request::ProcessingRequest;
use crate::worker::{RemoteInference, WorkerError};

/// Default remote call timeout.
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default confidence when the provider reports none.
pub const DEFAULT_REMOTE_CONFIDENCE: f64 = 0.98;

/// Runs requests on the remote inference service.
pub struct RemoteAdapter {
    remote: Arc<dyn RemoteInference>,
    timeout: Duration,
    confidence: f64,
}

impl RemoteAdapter {
    /// Adapter with default timeout and confidence.
    pub fn new(remote: Arc<dyn RemoteInference>) -> Self {
        Self {
            remote,
            timeout: DEFAULT_REMOTE_TIMEOUT,
            confidence: DEFAULT_REMOTE_CONFIDENCE,
        }
    }

    /// Set the call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the confidence used when the provider reports none.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Send `request` to the remote service.
    ///
    /// # Errors
    ///
    /// - [`RemoteFailure::Timeout`] when no answer arrives in time
    /// - [`RemoteFailure::NonSuccessStatus`] on a non-2xx answer
    /// - [`RemoteFailure::TransportError`] for everything else
    pub async fn run(&self, request: &ProcessingRequest) -> Result<ExecutionResult, RemoteFailure> {
        let started = Instant::now();
        debug!(request_id = %request.request_id, provider = self.remote.name(), "running remotely");

        let call = self.remote.call(&request.query, self.timeout);
        let reply = tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| RemoteFailure::Timeout {
                after: self.timeout,
            })?
            .map_err(|e| match e {
                WorkerError::Timeout(after) => RemoteFailure::Timeout { after },
                WorkerError::Status { status, body } => {
                    RemoteFailure::NonSuccessStatus { status, body }
                }
                other => RemoteFailure::TransportError(other.to_string()),
            })?;

        Ok(ExecutionResult {
            layer: ResultLayer::Remote,
            model_or_provider: self.remote.name().to_string(),
            response_text: reply.text,
            processing_time_ms: elapsed_ms(started.elapsed()),
            confidence: reply.confidence.unwrap_or(self.confidence),
            is_fallback: false,
        })
    }
}
