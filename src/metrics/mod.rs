//! # Stage: Routing Metrics
//!
//! ## Responsibility
//! Keep process-wide request counters, a moving-average latency, and derive
//! the routing-efficiency score from them.
//!
//! ## Guarantees
//! - Counters only grow; nothing resets them short of a restart.
//! - One critical section per recorded request, so
//!   `local_processed + remote_processed <= total_requests` holds in every
//!   snapshot.
//! - `routing_efficiency` is always within [0, 1].
//!
//! ## NOT Responsible For
//! - Prometheus export (see: [`exporter`])
//! - Persisting metrics across restarts

use parking_lot::Mutex;
use serde::Serialize;

use crate::execution::{ExecutionResult, ResultLayer};

pub mod exporter;

/// Weight of a new latency sample in the moving average.
const EMA_ALPHA: f64 = 0.1;

/// Counter values at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    /// Recorded requests, including emergency answers.
    pub total_requests: u64,
    /// Requests answered by the local layer.
    pub local_processed: u64,
    /// Requests answered by the remote layer.
    pub remote_processed: u64,
    /// Requests answered after a failed first attempt.
    pub fallback_count: u64,
    /// Exponential moving average of processing time.
    pub avg_response_time_ms: f64,
    /// Derived efficiency score, see [`MetricsAggregator::routing_efficiency`].
    pub routing_efficiency: f64,
}

#[derive(Debug, Default)]
struct Counters {
    total_requests: u64,
    local_processed: u64,
    remote_processed: u64,
    fallback_count: u64,
    avg_response_time_ms: f64,
}

impl Counters {
    fn efficiency(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        let total = self.total_requests as f64;
        let local_ratio = self.local_processed as f64 / total;
        let fallback_ratio = self.fallback_count as f64 / total;
        (local_ratio - 0.5 * fallback_ratio).clamp(0.0, 1.0)
    }
}

/// Process-wide metrics aggregator.
///
/// # Example
///
/// ```rust
/// use hybrid_layer_orchestrator::{ExecutionResult, MetricsAggregator, ResultLayer};
///
/// let metrics = MetricsAggregator::new();
/// metrics.record(&ExecutionResult {
///     layer: ResultLayer::Local,
///     model_or_provider: "llama3".into(),
///     response_text: "hi".into(),
///     processing_time_ms: 120,
///     confidence: 0.95,
///     is_fallback: false,
/// });
/// assert_eq!(metrics.routing_efficiency(), 1.0);
/// ```
#[derive(Debug, Default)]
pub struct MetricsAggregator {
    counters: Mutex<Counters>,
}

impl MetricsAggregator {
    /// Empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one result into the counters.
    pub fn record(&self, result: &ExecutionResult) {
        let sample = result.processing_time_ms as f64;
        {
            let mut c = self.counters.lock();
            c.total_requests += 1;
            match result.layer {
                ResultLayer::Local => c.local_processed += 1,
                ResultLayer::Remote => c.remote_processed += 1,
                ResultLayer::LocalFallback => {}
            }
            if result.is_fallback {
                c.fallback_count += 1;
            }
            c.avg_response_time_ms = if c.total_requests == 1 {
                sample
            } else {
                c.avg_response_time_ms * (1.0 - EMA_ALPHA) + sample * EMA_ALPHA
            };
        }

        exporter::inc_request(result.layer.as_str());
        exporter::record_request_duration(
            result.layer.as_str(),
            std::time::Duration::from_millis(result.processing_time_ms),
        );
        if result.is_fallback {
            exporter::inc_fallback();
        }
    }

    /// Consistent copy of every counter.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let c = self.counters.lock();
        MetricsSnapshot {
            total_requests: c.total_requests,
            local_processed: c.local_processed,
            remote_processed: c.remote_processed,
            fallback_count: c.fallback_count,
            avg_response_time_ms: c.avg_response_time_ms,
            routing_efficiency: c.efficiency(),
        }
    }

    /// `clamp(local/total - 0.5 * fallback/total, 0, 1)`, or `0.0` before
    /// the first request.
    pub fn routing_efficiency(&self) -> f64 {
        self.counters.lock().efficiency()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(layer: ResultLayer, ms: u64, is_fallback: bool) -> ExecutionResult {
        ExecutionResult {
            layer,
            model_or_provider: "m".into(),
            response_text: "r".into(),
            processing_time_ms: ms,
            confidence: 0.9,
            is_fallback,
        }
    }

    #[test]
    fn test_empty_efficiency_is_zero() {
        let m = MetricsAggregator::new();
        assert_eq!(m.routing_efficiency(), 0.0);
        assert_eq!(m.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_first_sample_sets_average() {
        let m = MetricsAggregator::new();
        m.record(&result(ResultLayer::Local, 200, false));
        assert_eq!(m.snapshot().avg_response_time_ms, 200.0);
    }

    #[test]
    fn test_ema_update() {
        let m = MetricsAggregator::new();
        m.record(&result(ResultLayer::Local, 100, false));
        m.record(&result(ResultLayer::Remote, 200, false));
        assert!((m.snapshot().avg_response_time_ms - 110.0).abs() < 1e-9);
    }

    #[test]
    fn test_emergency_counts_toward_total_only() {
        let m = MetricsAggregator::new();
        m.record(&result(ResultLayer::LocalFallback, 5, true));
        let s = m.snapshot();
        assert_eq!(s.total_requests, 1);
        assert_eq!(s.local_processed + s.remote_processed, 0);
        assert_eq!(s.fallback_count, 1);
        assert_eq!(s.routing_efficiency, 0.0);
    }

    #[test]
    fn test_efficiency_penalises_fallbacks() {
        let m = MetricsAggregator::new();
        m.record(&result(ResultLayer::Local, 10, false));
        m.record(&result(ResultLayer::Local, 10, false));
        m.record(&result(ResultLayer::Local, 10, true));
        m.record(&result(ResultLayer::Remote, 10, false));
        // 3/4 - 0.5 * 1/4
        assert!((m.routing_efficiency() - 0.625).abs() < 1e-9);
    }

    #[test]
    fn test_efficiency_clamped_at_zero() {
        let m = MetricsAggregator::new();
        m.record(&result(ResultLayer::Remote, 10, true));
        assert_eq!(m.routing_efficiency(), 0.0);
    }
}
