//! # Stage: Fallback
//!
//! ## Responsibility
//! Execute a request on the layer chosen by the policy engine, retry once on
//! the other layer if that fails, and fall back to a canned emergency answer
//! when both layers fail.
//!
//! ## Guarantees
//! - At most one attempt per layer; never more than two attempts in total.
//! - Every non-cancelled call returns an [`ExecutionResult`].
//! - Results produced after a failed attempt carry `is_fallback = true` and
//!   the elapsed time since the first attempt started.
//! - Cancellation returns [`OrchestratorError::Canceled`] immediately, with
//!   no alternate attempt and no emergency answer.
//!
//! ## NOT Responsible For
//! - Choosing the first layer (see: `routing::policy`)
//! - Recording request metrics (see: `metrics`)

use std::future::Future;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::execution::{
    elapsed_ms, ExecutionResult, LocalAdapter, LocalFailure, RemoteAdapter, RemoteFailure,
    ResultLayer,
};
use crate::metrics::exporter;
use crate::request::{ProcessingRequest, Sensitivity};
use crate::routing::Layer;
use crate::OrchestratorError;

/// Default confidence attached to the emergency answer.
pub const DEFAULT_EMERGENCY_CONFIDENCE: f64 = 0.70;

/// Provider label on the emergency answer.
pub const EMERGENCY_PROVIDER: &str = "emergency";

/// Longest query excerpt quoted in the emergency answer, in characters.
const EMERGENCY_EXCERPT_CHARS: usize = 120;

/// Single-hop fallback between the local and remote adapters.
pub struct FallbackController {
    local: LocalAdapter,
    remote: RemoteAdapter,
    emergency_confidence: f64,
    critical_local_only: bool,
}

impl FallbackController {
    /// Controller over the two adapters, with default settings.
    pub fn new(local: LocalAdapter, remote: RemoteAdapter) -> Self {
        Self {
            local,
            remote,
            emergency_confidence: DEFAULT_EMERGENCY_CONFIDENCE,
            critical_local_only: false,
        }
    }

    /// Set the emergency answer's confidence.
    pub fn with_emergency_confidence(mut self, confidence: f64) -> Self {
        self.emergency_confidence = confidence;
        self
    }

    /// Never send critical requests to the remote layer, even as a fallback.
    pub fn with_critical_local_only(mut self, enabled: bool) -> Self {
        self.critical_local_only = enabled;
        self
    }

    /// Run `request` starting on `layer`.
    ///
    /// `Hybrid` behaves like `Local`: local first, remote as the fallback.
    ///
    /// # Errors
    ///
    /// Only [`OrchestratorError::Canceled`]; backend failures are absorbed.
    pub async fn execute(
        &self,
        layer: Layer,
        request: &ProcessingRequest,
        cancel: &CancellationToken,
    ) -> Result<ExecutionResult, OrchestratorError> {
        let started = Instant::now();

        match layer {
            Layer::Local | Layer::Hybrid => {
                match cancellable(cancel, self.local.run(request)).await? {
                    Ok(result) => return Ok(result),
                    Err(failure) => note_local_failure(request, &failure),
                }

                if self.critical_local_only && request.sensitivity == Sensitivity::Critical {
                    info!(
                        request_id = %request.request_id,
                        "critical request kept off the remote layer"
                    );
                    return Ok(self.emergency(request, started));
                }

                match cancellable(cancel, self.remote.run(request)).await? {
                    Ok(result) => Ok(mark_fallback(result, started)),
                    Err(failure) => {
                        note_remote_failure(request, &failure);
                        Ok(self.emergency(request, started))
                    }
                }
            }
            Layer::Remote => {
                match cancellable(cancel, self.remote.run(request)).await? {
                    Ok(result) => return Ok(result),
                    Err(failure) => note_remote_failure(request, &failure),
                }

                match cancellable(cancel, self.local.run(request)).await? {
                    Ok(result) => Ok(mark_fallback(result, started)),
                    Err(failure) => {
                        note_local_failure(request, &failure);
                        Ok(self.emergency(request, started))
                    }
                }
            }
        }
    }

    fn emergency(&self, request: &ProcessingRequest, started: Instant) -> ExecutionResult {
        warn!(request_id = %request.request_id, "all layers failed, returning emergency answer");
        ExecutionResult {
            layer: ResultLayer::LocalFallback,
            model_or_provider: EMERGENCY_PROVIDER.to_string(),
            response_text: emergency_text(&request.query),
            processing_time_ms: elapsed_ms(started.elapsed()),
            confidence: self.emergency_confidence,
            is_fallback: true,
        }
    }
}

/// Race `fut` against cancellation; cancellation wins ties.
pub(crate) async fn cancellable<F>(
    cancel: &CancellationToken,
    fut: F,
) -> Result<F::Output, OrchestratorError>
where
    F: Future,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(OrchestratorError::Canceled),
        out = fut => Ok(out),
    }
}

fn mark_fallback(mut result: ExecutionResult, started: Instant) -> ExecutionResult {
    result.is_fallback = true;
    result.processing_time_ms = elapsed_ms(started.elapsed());
    result
}

fn note_local_failure(request: &ProcessingRequest, failure: &LocalFailure) {
    warn!(
        request_id = %request.request_id,
        reason = failure.kind(),
        error = %failure,
        "local attempt failed"
    );
    exporter::inc_layer_failure("local", failure.kind());
}

fn note_remote_failure(request: &ProcessingRequest, failure: &RemoteFailure) {
    warn!(
        request_id = %request.request_id,
        reason = failure.kind(),
        error = %failure,
        "remote attempt failed"
    );
    exporter::inc_layer_failure("remote", failure.kind());
}

fn emergency_text(query: &str) -> String {
    let mut excerpt: String = query.chars().take(EMERGENCY_EXCERPT_CHARS).collect();
    if query.chars().count() > EMERGENCY_EXCERPT_CHARS {
        excerpt.push_str("...");
    }
    format!(
        "Both the local and remote inference layers are unavailable right now. \
         Your request \"{excerpt}\" was received but could not be processed; please retry shortly."
    )
}
