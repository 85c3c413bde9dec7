//! Routing configuration types.
//!
//! Provides [`RoutingConfig`] for tuning the load-shedding thresholds, the
//! complexity estimator boundaries, and the model selector's keyword and
//! model-name markers. All fields have defaults and are (de)serialisable via
//! serde for TOML config files.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// ── Default value functions ────────────────────────────────────────────

/// CPU utilisation above which non-pinned requests are shed to the remote layer.
fn default_cpu_threshold_percent() -> f64 {
    80.0
}

/// Memory utilisation above which non-pinned requests are shed to the remote layer.
fn default_mem_threshold_percent() -> f64 {
    80.0
}

/// Estimated score below which a query is classified as simple.
fn default_simple_below() -> f64 {
    0.4
}

/// Estimated score above which a query is classified as complex.
fn default_complex_above() -> f64 {
    0.7
}

/// Word count above which the long-query signal fires.
fn default_long_query_words() -> usize {
    500
}

fn default_code_keywords() -> Vec<String> {
    [
        "code", "function", "debug", "compile", "script", "program", "bug", "refactor",
        "python", "rust", "javascript", "sql", "regex", "stack trace", "```",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_code_model_markers() -> Vec<String> {
    ["coder", "code", "starcoder", "codellama", "codegemma"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_large_model_markers() -> Vec<String> {
    ["70b", "34b", "32b", "mixtral", "large"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

// ── RoutingConfig ──────────────────────────────────────────────────────

/// Configuration for the policy engine, complexity estimator and model selector.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct RoutingConfig {
    /// CPU percent above which requests are shed to the remote layer.
    ///
    /// Range: `0.0..=100.0`.  Default: `80.0`.
    #[serde(default = "default_cpu_threshold_percent")]
    pub cpu_threshold_percent: f64,

    /// Memory percent above which requests are shed to the remote layer.
    ///
    /// Range: `0.0..=100.0`.  Default: `80.0`.
    #[serde(default = "default_mem_threshold_percent")]
    pub mem_threshold_percent: f64,

    /// Complexity score below which an unlabelled query is `simple`.
    #[serde(default = "default_simple_below")]
    pub simple_below: f64,

    /// Complexity score above which an unlabelled query is `complex`.
    #[serde(default = "default_complex_above")]
    pub complex_above: f64,

    /// Word count above which the long-query signal fires.
    #[serde(default = "default_long_query_words")]
    pub long_query_words: usize,

    /// Case-insensitive substrings that mark a query as code-related.
    #[serde(default = "default_code_keywords")]
    pub code_keywords: Vec<String>,

    /// Case-insensitive substrings that identify a code-specialised model.
    #[serde(default = "default_code_model_markers")]
    pub code_model_markers: Vec<String>,

    /// Case-insensitive substrings that identify a large general-purpose model.
    #[serde(default = "default_large_model_markers")]
    pub large_model_markers: Vec<String>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            cpu_threshold_percent: default_cpu_threshold_percent(),
            mem_threshold_percent: default_mem_threshold_percent(),
            simple_below: default_simple_below(),
            complex_above: default_complex_above(),
            long_query_words: default_long_query_words(),
            code_keywords: default_code_keywords(),
            code_model_markers: default_code_model_markers(),
            large_model_markers: default_large_model_markers(),
        }
    }
}

/// Validate a [`RoutingConfig`], returning a list of human-readable errors.
///
/// An empty `Vec` means the config is valid.
pub fn validate(config: &RoutingConfig) -> Vec<String> {
    let mut errors = Vec::new();

    for (name, value) in [
        ("cpu_threshold_percent", config.cpu_threshold_percent),
        ("mem_threshold_percent", config.mem_threshold_percent),
    ] {
        if !(0.0..=100.0).contains(&value) {
            errors.push(format!("{name} must be in [0.0, 100.0], got {value}"));
        }
    }

    for (name, value) in [
        ("simple_below", config.simple_below),
        ("complex_above", config.complex_above),
    ] {
        if !(0.0..=1.0).contains(&value) {
            errors.push(format!("{name} must be in [0.0, 1.0], got {value}"));
        }
    }

    if config.complex_above < config.simple_below {
        errors.push(format!(
            "complex_above ({}) must be >= simple_below ({})",
            config.complex_above, config.simple_below
        ));
    }

    if config.long_query_words == 0 {
        errors.push("long_query_words must be > 0".to_string());
    }

    if config.code_keywords.iter().any(|k| k.trim().is_empty()) {
        errors.push("code_keywords must not contain empty entries".to_string());
    }

    errors
}

// ── Tests ──────────────────────────────────────────────────────────────
