//! Observability endpoints for a running orchestrator.
//!
//! | Route      | Body                                                    |
//! |------------|---------------------------------------------------------|
//! | `/metrics` | Prometheus text exposition from [`crate::metrics::exporter`] |
//! | `/health`  | JSON liveness with request, fallback and failure totals |
//! | `/status`  | JSON [`crate::StatusSnapshot`], node sampled on request |
//!
//! Only compiled with the `metrics-server` feature; without it
//! [`start_server`] returns an error immediately.

use std::sync::Arc;

use crate::Orchestrator;

#[cfg(feature = "metrics-server")]
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
#[cfg(feature = "metrics-server")]
use std::net::SocketAddr;
#[cfg(feature = "metrics-server")]
use tower_http::trace::TraceLayer;
#[cfg(feature = "metrics-server")]
use tracing::info;

#[cfg(feature = "metrics-server")]
const PROMETHEUS_TEXT: &str = "text/plain; version=0.0.4";

#[cfg(feature = "metrics-server")]
/// Build the router serving `/metrics`, `/health` and `/status`.
pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(orchestrator)
}

#[cfg(feature = "metrics-server")]
/// Serve the router on `addr` until the process exits.
///
/// ## Example
///
/// ```no_run
/// use std::sync::Arc;
/// use hybrid_layer_orchestrator::{
///     metrics_server, Collaborators, Orchestrator, OrchestratorConfig,
/// };
///
/// #[tokio::main]
/// async fn main() {
///     let orchestrator = Arc::new(Orchestrator::new(
///         &OrchestratorConfig::default(),
///         Collaborators::echo(),
///     ));
///     let handle = tokio::spawn(metrics_server::start_server("0.0.0.0:9090", orchestrator));
///     // ...
///     handle.abort();
/// }
/// ```
pub async fn start_server(
    addr: &str,
    orchestrator: Arc<Orchestrator>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = tokio::net::TcpListener::bind(addr.parse::<SocketAddr>()?).await?;
    info!(addr = %listener.local_addr()?, "observability server listening");
    axum::serve(listener, router(orchestrator)).await?;
    Ok(())
}

#[cfg(feature = "metrics-server")]
async fn metrics_handler() -> Response {
    let body = crate::metrics::exporter::gather_metrics();
    ([(header::CONTENT_TYPE, PROMETHEUS_TEXT)], body).into_response()
}

#[cfg(feature = "metrics-server")]
async fn health_handler() -> Response {
    let summary = crate::metrics::exporter::get_metrics_summary();
    json_response(&serde_json::json!({
        "status": "ok",
        "requests_total": summary.requests_total.values().sum::<u64>(),
        "fallbacks_total": summary.fallbacks_total,
        "layer_failures_total": summary.layer_failures_total.values().sum::<u64>(),
    }))
}

#[cfg(feature = "metrics-server")]
async fn status_handler(State(orchestrator): State<Arc<Orchestrator>>) -> Response {
    json_response(&orchestrator.status().await)
}

#[cfg(feature = "metrics-server")]
fn json_response<T: serde::Serialize>(value: &T) -> Response {
    match serde_json::to_string_pretty(value) {
        Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

#[cfg(not(feature = "metrics-server"))]
/// Always fails: the crate was built without the `metrics-server` feature.
pub async fn start_server(
    _addr: &str,
    _orchestrator: Arc<Orchestrator>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    Err("observability endpoints need the `metrics-server` feature".into())
}

#[cfg(test)]
#[cfg(feature = "metrics-server")]
mod tests {
    use super::*;
    use crate::{Collaborators, OrchestratorConfig};

    #[tokio::test]
    async fn test_health_endpoint_ok() {
        assert_eq!(health_handler().await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_metrics_endpoint_sets_prometheus_content_type() {
        let response = metrics_handler().await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).map(|v| v.as_bytes()),
            Some(PROMETHEUS_TEXT.as_bytes())
        );
    }

    #[tokio::test]
    async fn test_status_endpoint_ok() {
        let orchestrator = Arc::new(Orchestrator::new(
            &OrchestratorConfig::default(),
            Collaborators::echo(),
        ));
        let response = status_handler(State(orchestrator)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
