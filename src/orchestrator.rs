//! # Stage: Orchestration
//!
//! ## Responsibility
//! Composition root. Build the [`ProcessingRequest`], ask the policy engine
//! for a layer, execute through the fallback controller and record the
//! outcome.
//!
//! ## Guarantees
//! - Invalid input fails before any routing, with
//!   [`OrchestratorError::Configuration`].
//! - Every completed request is recorded exactly once; cancelled and
//!   rejected requests are not recorded.
//! - Safe to share across tasks (`Arc<Orchestrator>`); `route` takes `&self`.
//! - Routing reads the published node snapshot. Only the first request
//!   waits for a sample, and that wait is shared and cancellable.
//!
//! ## NOT Responsible For
//! - Channel adapters, UIs or process supervision
//! - Conversation history

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::{LocalRuntimeKind, OrchestratorConfig, RemoteProviderKind};
use crate::execution::{ExecutionResult, LocalAdapter, RemoteAdapter};
use crate::fallback::{cancellable, FallbackController};
use crate::metrics::{MetricsAggregator, MetricsSnapshot};
use crate::node::{FixedSampler, NodeMonitor, NodeStatus, ResourceSampler, SysinfoSampler};
use crate::request::{ProcessingRequest, RouteOptions};
use crate::routing::{ComplexityScorer, ModelSelector, PolicyEngine};
use crate::worker::{
    AllowedModels, AnthropicClient, EchoRemote, EchoRuntime, LocalRuntime, ModelLister, OllamaCli,
    RemoteInference, StaticModels,
};
use crate::OrchestratorError;

/// Models advertised by the echo collaborators.
const ECHO_MODELS: [&str; 3] = ["llama3:8b", "qwen2.5-coder:7b", "llama3:70b"];

/// External collaborators the orchestrator drives.
#[derive(Clone)]
pub struct Collaborators {
    /// Local inference runtime.
    pub runtime: Arc<dyn LocalRuntime>,
    /// Local model listing.
    pub lister: Arc<dyn ModelLister>,
    /// Remote inference service.
    pub remote: Arc<dyn RemoteInference>,
    /// CPU/memory sampler.
    pub sampler: Arc<dyn ResourceSampler>,
}

impl Collaborators {
    /// In-process doubles: echo runtime and remote, three static models and
    /// an idle node.
    pub fn echo() -> Self {
        Self {
            runtime: Arc::new(EchoRuntime::new()),
            lister: Arc::new(StaticModels::new(ECHO_MODELS)),
            remote: Arc::new(EchoRemote::new()),
            sampler: Arc::new(FixedSampler::new(20.0, 30.0)),
        }
    }

    /// Collaborators described by `config`.
    ///
    /// # Errors
    ///
    /// [`OrchestratorError::Configuration`] when the Anthropic provider is
    /// selected and its API key variable is unset.
    pub fn from_config(config: &OrchestratorConfig) -> Result<Self, OrchestratorError> {
        let local = &config.local;
        let (runtime, lister) = match local.runtime {
            LocalRuntimeKind::Ollama => {
                let cli = Arc::new(
                    OllamaCli::new()
                        .with_binary(local.binary.clone())
                        .with_priority(local.model_priority.clone())
                        .with_list_timeout(local.list_timeout()),
                );
                let runtime: Arc<dyn LocalRuntime> = cli.clone();
                let lister: Arc<dyn ModelLister> = if local.models.is_empty() {
                    cli
                } else {
                    Arc::new(AllowedModels::new(cli, local.models.clone()))
                };
                (runtime, lister)
            }
            LocalRuntimeKind::Echo => {
                let runtime: Arc<dyn LocalRuntime> = Arc::new(EchoRuntime::new());
                let lister: Arc<dyn ModelLister> = if local.models.is_empty() {
                    Arc::new(StaticModels::new(ECHO_MODELS))
                } else {
                    Arc::new(StaticModels::new(local.models.iter().cloned()))
                };
                (runtime, lister)
            }
        };

        let remote_cfg = &config.remote;
        let remote: Arc<dyn RemoteInference> = match remote_cfg.provider {
            RemoteProviderKind::Anthropic => {
                let mut client =
                    AnthropicClient::from_env(&remote_cfg.api_key_env, remote_cfg.model.clone())?
                        .with_max_tokens(remote_cfg.max_tokens);
                if let Some(url) = &remote_cfg.base_url {
                    client = client.with_base_url(url.clone());
                }
                if let Some(temperature) = remote_cfg.temperature {
                    client = client.with_temperature(temperature);
                }
                Arc::new(client)
            }
            RemoteProviderKind::Echo => Arc::new(EchoRemote::new()),
        };

        Ok(Self {
            runtime,
            lister,
            remote,
            sampler: Arc::new(SysinfoSampler::new()),
        })
    }
}

/// Read-only view for status endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    /// Freshly sampled node status.
    pub node: NodeStatus,
    /// Counter values.
    pub metrics: MetricsSnapshot,
    /// Same as `metrics.routing_efficiency`, surfaced for dashboards.
    pub routing_efficiency: f64,
}

/// Hybrid local/remote request orchestrator.
///
/// # Example
///
/// ```rust
/// use hybrid_layer_orchestrator::{Collaborators, Orchestrator, OrchestratorConfig, RouteOptions};
///
/// # async fn example() -> Result<(), hybrid_layer_orchestrator::OrchestratorError> {
/// let orchestrator = Orchestrator::new(&OrchestratorConfig::default(), Collaborators::echo());
/// let result = orchestrator
///     .route("What's the capital of France?", RouteOptions::new().priority("high"))
///     .await?;
/// println!("{} answered: {}", result.model_or_provider, result.response_text);
/// # Ok(()) }
/// ```
pub struct Orchestrator {
    policy: PolicyEngine,
    scorer: ComplexityScorer,
    monitor: Arc<NodeMonitor>,
    fallback: FallbackController,
    metrics: MetricsAggregator,
    refresh_interval: Duration,
}

impl Orchestrator {
    /// Wire the components from `config` around `collaborators`.
    pub fn new(config: &OrchestratorConfig, collaborators: Collaborators) -> Self {
        let monitor = Arc::new(
            NodeMonitor::new(collaborators.sampler, collaborators.lister)
                .with_busy_threshold(config.node.busy_threshold_percent),
        );

        let local = LocalAdapter::new(
            collaborators.runtime,
            Arc::clone(&monitor),
            ModelSelector::from_config(&config.routing),
        )
        .with_timeout(config.local.timeout())
        .with_confidence(config.local.confidence);

        let remote = RemoteAdapter::new(collaborators.remote)
            .with_timeout(config.remote.timeout())
            .with_confidence(config.remote.confidence);

        let fallback = FallbackController::new(local, remote)
            .with_emergency_confidence(config.fallback.emergency_confidence)
            .with_critical_local_only(config.fallback.critical_local_only);

        Self {
            policy: PolicyEngine::from_config(&config.routing),
            scorer: ComplexityScorer::from_config(&config.routing),
            monitor,
            fallback,
            metrics: MetricsAggregator::new(),
            refresh_interval: config.node.refresh_interval(),
        }
    }

    /// Route one query.
    ///
    /// # Errors
    ///
    /// [`OrchestratorError::Configuration`] for an empty query or unknown
    /// label. Backend failures never surface here.
    pub async fn route(
        &self,
        query: &str,
        options: RouteOptions,
    ) -> Result<ExecutionResult, OrchestratorError> {
        self.route_with_cancel(query, options, &CancellationToken::new())
            .await
    }

    /// Route one query, abandoning it when `cancel` fires.
    ///
    /// # Errors
    ///
    /// As [`route`](Self::route), plus [`OrchestratorError::Canceled`].
    pub async fn route_with_cancel(
        &self,
        query: &str,
        options: RouteOptions,
        cancel: &CancellationToken,
    ) -> Result<ExecutionResult, OrchestratorError> {
        let request = ProcessingRequest::from_options(query, options, &self.scorer)?;
        if cancel.is_cancelled() {
            return Err(OrchestratorError::Canceled);
        }

        let node = cancellable(cancel, self.monitor.latest(self.refresh_interval)).await?;
        let layer = self.policy.decide(&request, &node);
        info!(
            request_id = %request.request_id,
            layer = %layer,
            priority = %request.priority,
            sensitivity = %request.sensitivity,
            complexity = %request.complexity,
            node = %node.status,
            "routing decision"
        );

        let result = self.fallback.execute(layer, &request, cancel).await?;
        self.metrics.record(&result);

        info!(
            request_id = %request.request_id,
            layer = %result.layer,
            model = %result.model_or_provider,
            elapsed_ms = result.processing_time_ms,
            fallback = result.is_fallback,
            "request completed"
        );

        Ok(result)
    }

    /// Sample the node now and report it with the current metrics.
    pub async fn status(&self) -> StatusSnapshot {
        let node = self.monitor.refresh().await;
        let metrics = self.metrics.snapshot();
        StatusSnapshot {
            node,
            routing_efficiency: metrics.routing_efficiency,
            metrics,
        }
    }

    /// Start background node refresh; stops when `shutdown` is cancelled.
    pub fn start_monitor(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        self.monitor.spawn_refresh(self.refresh_interval, shutdown)
    }

    /// Metrics aggregator.
    pub fn metrics(&self) -> &MetricsAggregator {
        &self.metrics
    }

    /// Node monitor.
    pub fn monitor(&self) -> &Arc<NodeMonitor> {
        &self.monitor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::ResultLayer;
    use crate::node::NodeState;

    fn orchestrator() -> Orchestrator {
        Orchestrator::new(&OrchestratorConfig::default(), Collaborators::echo())
    }

    #[tokio::test]
    async fn test_simple_high_goes_local() {
        let o = orchestrator();
        let result = o
            .route("Say hello", RouteOptions::new().priority("high").complexity("simple"))
            .await
            .expect("test: route");
        assert_eq!(result.layer, ResultLayer::Local);
        assert!(!result.is_fallback);
        assert_eq!(o.metrics().snapshot().local_processed, 1);
    }

    #[tokio::test]
    async fn test_complex_public_goes_remote() {
        let o = orchestrator();
        let result = o
            .route(
                "Write an essay",
                RouteOptions::new().sensitivity("public").complexity("complex"),
            )
            .await
            .expect("test: route");
        assert_eq!(result.layer, ResultLayer::Remote);
        assert_eq!(result.model_or_provider, "echo-remote");
    }

    #[tokio::test]
    async fn test_unknown_label_is_not_recorded() {
        let o = orchestrator();
        let err = o
            .route("hi", RouteOptions::new().priority("urgent"))
            .await
            .expect_err("test: unknown label");
        assert!(matches!(err, OrchestratorError::Configuration(_)));
        assert_eq!(o.metrics().snapshot().total_requests, 0);
    }

    #[tokio::test]
    async fn test_pre_cancelled_token_returns_canceled() {
        let o = orchestrator();
        let token = CancellationToken::new();
        token.cancel();
        let err = o
            .route_with_cancel("hi", RouteOptions::new(), &token)
            .await
            .expect_err("test: canceled");
        assert!(matches!(err, OrchestratorError::Canceled));
        assert_eq!(o.metrics().snapshot().total_requests, 0);
    }

    #[tokio::test]
    async fn test_status_reports_fresh_node() {
        let o = orchestrator();
        let status = o.status().await;
        assert_eq!(status.node.status, NodeState::Active);
        assert_eq!(status.node.available_models.len(), 3);
        assert_eq!(status.routing_efficiency, 0.0);
    }

    #[test]
    fn test_from_config_echo_collaborators() {
        let config: OrchestratorConfig = toml::from_str(
            "[local]\nruntime = \"echo\"\n[remote]\nprovider = \"echo\"\n",
        )
        .expect("test: config");
        let collaborators = Collaborators::from_config(&config).expect("test: collaborators");
        assert_eq!(collaborators.remote.name(), "echo-remote");
    }

    #[tokio::test]
    async fn test_ollama_allow_list_still_detects_unreachable_runtime() {
        let config: OrchestratorConfig = toml::from_str(
            "[local]\nbinary = \"/nonexistent/ollama-binary\"\nmodels = [\"llama3:8b\"]\n\
             list_timeout_secs = 2\n[remote]\nprovider = \"echo\"\n",
        )
        .expect("test: config");
        let collaborators = Collaborators::from_config(&config).expect("test: collaborators");
        assert!(collaborators.lister.list_models().await.is_err());

        let o = Orchestrator::new(&config, collaborators);
        assert_eq!(o.status().await.node.status, NodeState::Offline);
    }

    #[test]
    fn test_from_config_missing_api_key_is_configuration_error() {
        let mut config = OrchestratorConfig::default();
        config.remote.api_key_env = "HYBRID_ORCH_TEST_MISSING_KEY".into();
        let result = Collaborators::from_config(&config);
        assert!(matches!(result, Err(OrchestratorError::Configuration(_))));
    }
}
