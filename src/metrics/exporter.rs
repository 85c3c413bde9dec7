//! Prometheus export of routing metrics.
//!
//! ## Usage
//!
//! Call [`init_metrics`] once at process startup. The helper functions
//! (`inc_request`, `inc_layer_failure`, …) are no-ops until then, so the
//! orchestrator runs the same with or without an exporter.
//!
//! ## Metrics Exposed
//!
//! | Name | Type | Labels |
//! |------|------|--------|
//! | `orchestrator_requests_total` | Counter | `layer` |
//! | `orchestrator_fallbacks_total` | Counter | |
//! | `orchestrator_layer_failures_total` | Counter | `layer`, `reason` |
//! | `orchestrator_request_duration_seconds` | Histogram | `layer` |
//! | `orchestrator_node_cpu_percent` | Gauge | |
//! | `orchestrator_node_mem_percent` | Gauge | |

use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Duration;

use prometheus::{
    core::Collector, Counter, CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, Opts,
    Registry, TextEncoder,
};

use crate::OrchestratorError;

/// All exported metrics, bundled so they live in one [`OnceLock`].
pub struct Exporter {
    /// Registry that owns every descriptor below.
    pub registry: Registry,
    /// Completed requests per result layer.
    pub requests_total: CounterVec,
    /// Requests answered by something other than the first-choice layer.
    pub fallbacks_total: Counter,
    /// Failed layer attempts per layer and failure reason.
    pub layer_failures_total: CounterVec,
    /// End-to-end request latency per result layer.
    pub request_duration: HistogramVec,
    /// Last sampled node CPU utilisation.
    pub node_cpu_percent: Gauge,
    /// Last sampled node memory utilisation.
    pub node_mem_percent: Gauge,
}

static EXPORTER: OnceLock<Exporter> = OnceLock::new();

fn register<C>(registry: &Registry, collector: C) -> Result<C, OrchestratorError>
where
    C: Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|e| OrchestratorError::Other(format!("metrics registration failed: {e}")))?;
    Ok(collector)
}

fn init_err(e: prometheus::Error) -> OrchestratorError {
    OrchestratorError::Other(format!("metrics init failed: {e}"))
}

impl Exporter {
    /// Build a bundle on a fresh registry, every metric name prefixed.
    pub fn build(prefix: &str) -> Result<Self, OrchestratorError> {
        let registry = Registry::new();
        let name = |suffix: &str| format!("{prefix}_{suffix}");

        let requests_total = register(
            &registry,
            CounterVec::new(
                Opts::new(name("requests_total"), "Completed requests per result layer"),
                &["layer"],
            )
            .map_err(init_err)?,
        )?;

        let fallbacks_total = register(
            &registry,
            Counter::new(
                name("fallbacks_total"),
                "Requests served after a failed first-choice layer",
            )
            .map_err(init_err)?,
        )?;

        let layer_failures_total = register(
            &registry,
            CounterVec::new(
                Opts::new(
                    name("layer_failures_total"),
                    "Failed layer attempts by layer and reason",
                ),
                &["layer", "reason"],
            )
            .map_err(init_err)?,
        )?;

        let request_duration = register(
            &registry,
            HistogramVec::new(
                HistogramOpts::new(
                    name("request_duration_seconds"),
                    "End-to-end request latency per result layer",
                )
                .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
                &["layer"],
            )
            .map_err(init_err)?,
        )?;

        let node_cpu_percent = register(
            &registry,
            Gauge::new(name("node_cpu_percent"), "Local node CPU utilisation").map_err(init_err)?,
        )?;

        let node_mem_percent = register(
            &registry,
            Gauge::new(name("node_mem_percent"), "Local node memory utilisation")
                .map_err(init_err)?,
        )?;

        Ok(Self {
            registry,
            requests_total,
            fallbacks_total,
            layer_failures_total,
            request_duration,
            node_cpu_percent,
            node_mem_percent,
        })
    }
}

/// Initialise the global exporter.
///
/// Calling it a second time is a no-op (returns `Ok(())`).
///
/// # Errors
///
/// Returns [`OrchestratorError::Other`] if metric construction or
/// registration fails.
pub fn init_metrics() -> Result<(), OrchestratorError> {
    if EXPORTER.get().is_some() {
        return Ok(());
    }
    let exporter = Exporter::build("orchestrator")?;
    // Racing initialisations build identical descriptors; first one wins.
    let _ = EXPORTER.set(exporter);
    Ok(())
}

fn exporter() -> Option<&'static Exporter> {
    EXPORTER.get()
}

/// Count one completed request for `layer`.
pub fn inc_request(layer: &str) {
    if let Some(m) = exporter() {
        if let Ok(c) = m.requests_total.get_metric_with_label_values(&[layer]) {
            c.inc();
        }
    }
}

/// Count one fallback-served request.
pub fn inc_fallback() {
    if let Some(m) = exporter() {
        m.fallbacks_total.inc();
    }
}

/// Count one failed attempt on `layer` for `reason`.
pub fn inc_layer_failure(layer: &str, reason: &str) {
    if let Some(m) = exporter() {
        if let Ok(c) = m
            .layer_failures_total
            .get_metric_with_label_values(&[layer, reason])
        {
            c.inc();
        }
    }
}

/// Observe end-to-end latency for a request served by `layer`.
pub fn record_request_duration(layer: &str, d: Duration) {
    if let Some(m) = exporter() {
        if let Ok(h) = m.request_duration.get_metric_with_label_values(&[layer]) {
            h.observe(d.as_secs_f64());
        }
    }
}

/// Publish the latest node utilisation sample.
pub fn set_node_usage(cpu_percent: f64, mem_percent: f64) {
    if let Some(m) = exporter() {
        m.node_cpu_percent.set(cpu_percent);
        m.node_mem_percent.set(mem_percent);
    }
}

/// Gather and encode all metrics in the Prometheus text exposition format.
///
/// Empty if metrics were never initialised or encoding fails.
pub fn gather_metrics() -> String {
    let Some(m) = exporter() else {
        return String::new();
    };
    encode(&m.registry)
}

fn encode(registry: &Registry) -> String {
    let families = registry.gather();
    if families.is_empty() {
        return String::new();
    }
    let mut buffer = Vec::new();
    if TextEncoder::new().encode(&families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Counter values read back from the exporter, used by the health endpoint.
#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct ExportSummary {
    /// Completed requests keyed by layer label.
    pub requests_total: HashMap<String, u64>,
    /// Total fallback-served requests.
    pub fallbacks_total: u64,
    /// Failures keyed by `"layer:reason"`.
    pub layer_failures_total: HashMap<String, u64>,
}

/// Current counter values; zeroed if metrics were never initialised.
pub fn get_metrics_summary() -> ExportSummary {
    exporter().map(summarize).unwrap_or_default()
}

fn label<'a>(metric: &'a prometheus::proto::Metric, name: &str) -> &'a str {
    metric
        .get_label()
        .iter()
        .find(|l| l.get_name() == name)
        .map_or("unknown", |l| l.get_value())
}

fn summarize(m: &Exporter) -> ExportSummary {
    let mut summary = ExportSummary {
        fallbacks_total: m.fallbacks_total.get() as u64,
        ..ExportSummary::default()
    };

    for family in m.requests_total.collect() {
        for metric in family.get_metric() {
            summary.requests_total.insert(
                label(metric, "layer").to_string(),
                metric.get_counter().get_value() as u64,
            );
        }
    }

    for family in m.layer_failures_total.collect() {
        for metric in family.get_metric() {
            let key = format!("{}:{}", label(metric, "layer"), label(metric, "reason"));
            summary
                .layer_failures_total
                .insert(key, metric.get_counter().get_value() as u64);
        }
    }

    summary
}
