//! # Stage: Orchestrator Configuration
//!
//! ## Responsibility
//! Parse and validate the TOML file that wires the orchestrator: which local
//! runtime and remote provider to use, timeouts, thresholds, fallback
//! behaviour and observability.
//!
//! ## Guarantees
//! - Every field has a documented default; an empty file is a valid config.
//! - Validated: semantic constraints are checked before a config is accepted.
//! - Schema-exportable: JSON Schema output enables IDE autocomplete.
//!
//! ## NOT Responsible For
//! - Building collaborators from the config (that belongs to the binary)
//! - Hot reload; the config is read once at startup

pub mod loader;
pub mod validation;

use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::routing::RoutingConfig;

// ── Default value functions ──────────────────────────────────────────────

fn default_ollama_binary() -> String {
    "ollama".to_string()
}

/// Default local runtime timeout: 30 seconds.
fn default_local_timeout_secs() -> u64 {
    30
}

fn default_list_timeout_secs() -> u64 {
    5
}

fn default_local_confidence() -> f64 {
    0.95
}

fn default_remote_model() -> String {
    "claude-3-5-haiku-latest".to_string()
}

fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

/// Default remote call timeout: 10 seconds.
fn default_remote_timeout_secs() -> u64 {
    10
}

fn default_remote_confidence() -> f64 {
    0.98
}

/// Default node refresh period: 5 seconds.
fn default_refresh_interval_secs() -> u64 {
    5
}

fn default_busy_threshold_percent() -> f64 {
    80.0
}

fn default_emergency_confidence() -> f64 {
    0.70
}

// ── Top-level config ─────────────────────────────────────────────────────

/// Root configuration.
///
/// # Example
///
/// ```toml
/// [local]
/// runtime = "ollama"
/// model_priority = ["llama3:8b", "qwen2.5-coder:7b"]
///
/// [remote]
/// provider = "anthropic"
/// model = "claude-3-5-haiku-latest"
///
/// [fallback]
/// critical_local_only = true
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct OrchestratorConfig {
    /// Local layer settings.
    #[serde(default)]
    pub local: LocalConfig,
    /// Remote layer settings.
    #[serde(default)]
    pub remote: RemoteConfig,
    /// Node monitor settings.
    #[serde(default)]
    pub node: NodeConfig,
    /// Policy engine, complexity estimator and model selector settings.
    #[serde(default)]
    pub routing: RoutingConfig,
    /// Fallback controller settings.
    #[serde(default)]
    pub fallback: FallbackConfig,
    /// Logging and metrics.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ── Local layer ──────────────────────────────────────────────────────────

/// Which local runtime implementation to use.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LocalRuntimeKind {
    /// The `ollama` CLI.
    #[default]
    Ollama,
    /// In-process echo runtime, for demos.
    Echo,
}

/// Local layer settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct LocalConfig {
    /// Runtime implementation.
    #[serde(default)]
    pub runtime: LocalRuntimeKind,
    /// Path of the `ollama` binary.
    #[serde(default = "default_ollama_binary")]
    pub binary: String,
    /// Allowed models. With `ollama` the runtime is still probed and its
    /// list is filtered to these names, so an unreachable runtime still
    /// reports the node offline. With `echo` this is the advertised list.
    #[serde(default)]
    pub models: Vec<String>,
    /// Preferred models, moved to the front of the listed models in this order.
    #[serde(default)]
    pub model_priority: Vec<String>,
    /// Runtime timeout in seconds.
    #[serde(default = "default_local_timeout_secs")]
    pub timeout_secs: u64,
    /// Timeout for `ollama list` in seconds.
    #[serde(default = "default_list_timeout_secs")]
    pub list_timeout_secs: u64,
    /// Confidence attached to local answers.
    #[serde(default = "default_local_confidence")]
    pub confidence: f64,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            runtime: LocalRuntimeKind::default(),
            binary: default_ollama_binary(),
            models: Vec::new(),
            model_priority: Vec::new(),
            timeout_secs: default_local_timeout_secs(),
            list_timeout_secs: default_list_timeout_secs(),
            confidence: default_local_confidence(),
        }
    }
}

impl LocalConfig {
    /// Runtime timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Model listing timeout as a [`Duration`].
    pub fn list_timeout(&self) -> Duration {
        Duration::from_secs(self.list_timeout_secs)
    }
}

// ── Remote layer ─────────────────────────────────────────────────────────

/// Which remote provider implementation to use.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RemoteProviderKind {
    /// Anthropic Messages API.
    #[default]
    Anthropic,
    /// In-process echo service, for demos.
    Echo,
}

/// Remote layer settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct RemoteConfig {
    /// Provider implementation.
    #[serde(default)]
    pub provider: RemoteProviderKind,
    /// Remote model name.
    #[serde(default = "default_remote_model")]
    pub model: String,
    /// API base URL. `None` uses the provider default.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Maximum tokens to generate.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Sampling temperature. `None` leaves the provider default.
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Call timeout in seconds.
    #[serde(default = "default_remote_timeout_secs")]
    pub timeout_secs: u64,
    /// Confidence used when the provider reports none.
    #[serde(default = "default_remote_confidence")]
    pub confidence: f64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            provider: RemoteProviderKind::default(),
            model: default_remote_model(),
            base_url: None,
            api_key_env: default_api_key_env(),
            max_tokens: default_max_tokens(),
            temperature: None,
            timeout_secs: default_remote_timeout_secs(),
            confidence: default_remote_confidence(),
        }
    }
}

impl RemoteConfig {
    /// Call timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ── Node monitor ─────────────────────────────────────────────────────────

/// Node monitor settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct NodeConfig {
    /// Background refresh period in seconds. Also the maximum age of the
    /// snapshot a request is routed on.
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    /// CPU/memory percent above which the node reports `busy`.
    #[serde(default = "default_busy_threshold_percent")]
    pub busy_threshold_percent: f64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval_secs(),
            busy_threshold_percent: default_busy_threshold_percent(),
        }
    }
}

impl NodeConfig {
    /// Refresh period as a [`Duration`].
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

// ── Fallback ─────────────────────────────────────────────────────────────

/// Fallback controller settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct FallbackConfig {
    /// Confidence attached to the emergency answer.
    #[serde(default = "default_emergency_confidence")]
    pub emergency_confidence: f64,
    /// Never send critical requests to the remote layer, even as a fallback.
    #[serde(default)]
    pub critical_local_only: bool,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            emergency_confidence: default_emergency_confidence(),
            critical_local_only: false,
        }
    }
}

// ── Observability ────────────────────────────────────────────────────────

/// Logging and metrics endpoint settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ObservabilityConfig {
    /// Log output format.
    #[serde(default)]
    pub log_format: LogFormat,
    /// Port for the Prometheus metrics HTTP endpoint. `None` disables it.
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable, colorized log output.
    #[default]
    Pretty,
    /// Structured JSON log output for machine consumption.
    Json,
}

impl LogFormat {
    /// `"json"` (any case) selects JSON; anything else is pretty.
    pub fn from_label(label: &str) -> Self {
        if label.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Export the JSON Schema for [`OrchestratorConfig`].
///
/// # Errors
///
/// Returns `serde_json::Error` if schema serialization fails.
pub fn export_schema() -> Result<String, serde_json::Error> {
    let schema = schemars::schema_for!(OrchestratorConfig);
    serde_json::to_string_pretty(&schema)
}
