//! Per-call request model.
//!
//! A [`ProcessingRequest`] is built once at the start of every
//! [`Orchestrator::route`](crate::Orchestrator::route) call and is read-only
//! afterwards. Construction is the only place where label validation
//! happens: an unknown priority/sensitivity/complexity label is rejected here
//! and never reaches the policy engine.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::routing::ComplexityScorer;
use crate::OrchestratorError;

/// How quickly the caller needs an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Latency-sensitive.
    High,
    /// Default.
    Medium,
    /// Background work.
    Low,
}

/// How far the request content may travel from the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sensitivity {
    /// May be sent to the remote layer freely.
    Public,
    /// Prefer local handling.
    Private,
    /// Must stay on the local layer unless every local path has failed.
    Critical,
}

/// Estimated compute cost of the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    /// Cheap request, short answer.
    Simple,
    /// Default.
    Moderate,
    /// Heavy request that benefits from a large model.
    Complex,
}

impl Priority {
    /// All variants, in declaration order.
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    /// Lowercase label used in logs and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl Sensitivity {
    /// All variants, in declaration order.
    pub const ALL: [Sensitivity; 3] = [
        Sensitivity::Public,
        Sensitivity::Private,
        Sensitivity::Critical,
    ];

    /// Lowercase label used in logs and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
            Self::Critical => "critical",
        }
    }
}

impl Complexity {
    /// All variants, in declaration order.
    pub const ALL: [Complexity; 3] = [
        Complexity::Simple,
        Complexity::Moderate,
        Complexity::Complex,
    ];

    /// Lowercase label used in logs and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Moderate => "moderate",
            Self::Complex => "complex",
        }
    }
}

impl FromStr for Priority {
    type Err = OrchestratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(OrchestratorError::Configuration(format!(
                "unknown priority '{other}' (expected high, medium or low)"
            ))),
        }
    }
}

impl FromStr for Sensitivity {
    type Err = OrchestratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" => Ok(Self::Public),
            "private" => Ok(Self::Private),
            "critical" => Ok(Self::Critical),
            other => Err(OrchestratorError::Configuration(format!(
                "unknown sensitivity '{other}' (expected public, private or critical)"
            ))),
        }
    }
}

impl FromStr for Complexity {
    type Err = OrchestratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple" => Ok(Self::Simple),
            "moderate" => Ok(Self::Moderate),
            "complex" => Ok(Self::Complex),
            other => Err(OrchestratorError::Configuration(format!(
                "unknown complexity '{other}' (expected simple, moderate or complex)"
            ))),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Sensitivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-supplied routing hints, as raw labels.
///
/// Labels arrive untyped from adapters and the CLI; they are parsed when the
/// [`ProcessingRequest`] is built. Unset fields take defaults: priority
/// `medium`, sensitivity `private`, and complexity estimated from the query.
///
/// # Example
///
/// ```rust
/// use hybrid_layer_orchestrator::RouteOptions;
///
/// let opts = RouteOptions::new()
///     .priority("high")
///     .sensitivity("public")
///     .context("channel", "sms");
/// assert_eq!(opts.priority.as_deref(), Some("high"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RouteOptions {
    /// Priority label (`high`, `medium`, `low`).
    pub priority: Option<String>,
    /// Sensitivity label (`public`, `private`, `critical`).
    pub sensitivity: Option<String>,
    /// Complexity label (`simple`, `moderate`, `complex`).
    pub complexity: Option<String>,
    /// Opaque caller context, passed through unmodified.
    pub context: HashMap<String, String>,
}

impl RouteOptions {
    /// Empty options; every field takes its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the priority label.
    pub fn priority(mut self, label: impl Into<String>) -> Self {
        self.priority = Some(label.into());
        self
    }

    /// Set the sensitivity label.
    pub fn sensitivity(mut self, label: impl Into<String>) -> Self {
        self.sensitivity = Some(label.into());
        self
    }

    /// Set the complexity label.
    pub fn complexity(mut self, label: impl Into<String>) -> Self {
        self.complexity = Some(label.into());
        self
    }

    /// Add one context entry.
    pub fn context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// An immutable, validated request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingRequest {
    /// Unique identifier for log correlation.
    pub request_id: String,
    /// The user query. Never empty.
    pub query: String,
    /// Requested priority.
    pub priority: Priority,
    /// Data sensitivity class.
    pub sensitivity: Sensitivity,
    /// Estimated or declared complexity.
    pub complexity: Complexity,
    /// Opaque caller context.
    pub context: HashMap<String, String>,
    /// Creation time. Set once.
    pub timestamp: DateTime<Utc>,
}

impl ProcessingRequest {
    /// Build a request from typed fields.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::Configuration`] if `query` is empty or
    /// whitespace-only.
    pub fn new(
        query: impl Into<String>,
        priority: Priority,
        sensitivity: Sensitivity,
        complexity: Complexity,
    ) -> Result<Self, OrchestratorError> {
        let query = query.into();
        if query.trim().is_empty() {
            return Err(OrchestratorError::Configuration(
                "query must not be empty".to_string(),
            ));
        }

        Ok(Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            query,
            priority,
            sensitivity,
            complexity,
            context: HashMap::new(),
            timestamp: Utc::now(),
        })
    }

    /// Build a request from raw caller options.
    ///
    /// A missing complexity label is estimated from the query text by
    /// `scorer`.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::Configuration`] for an empty query or any
    /// unknown label.
    pub fn from_options(
        query: &str,
        options: RouteOptions,
        scorer: &ComplexityScorer,
    ) -> Result<Self, OrchestratorError> {
        let priority = match options.priority.as_deref() {
            Some(label) => label.parse()?,
            None => Priority::Medium,
        };
        let sensitivity = match options.sensitivity.as_deref() {
            Some(label) => label.parse()?,
            None => Sensitivity::Private,
        };
        let complexity = match options.complexity.as_deref() {
            Some(label) => label.parse()?,
            None => scorer.classify(query),
        };

        let mut request = Self::new(query, priority, sensitivity, complexity)?;
        request.context = options.context;
        Ok(request)
    }
}
