//! Layer selection.
//!
//! The [`PolicyEngine`] maps a [`ProcessingRequest`] and the latest
//! [`NodeStatus`] snapshot onto a [`Layer`]. Rules are evaluated in order and
//! the first match wins:
//!
//! | # | Condition                                   | Layer  |
//! |---|---------------------------------------------|--------|
//! | 1 | sensitivity is `critical`                   | Local  |
//! | – | node is `offline`                           | Remote |
//! | 2 | complexity `simple` and priority `high`     | Local  |
//! | 3 | complexity `complex` and sensitivity `public` | Remote |
//! | 4 | CPU or memory above threshold               | Remote |
//! | 5 | otherwise                                   | Hybrid |
//!
//! `decide` is pure: no I/O, no shared state, same inputs give the same layer.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::node::{NodeState, NodeStatus};
use crate::request::{Complexity, Priority, ProcessingRequest, Sensitivity};

use super::config::RoutingConfig;

/// Execution venue chosen for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    /// Local inference runtime.
    Local,
    /// Remote inference service.
    Remote,
    /// Local first, remote as the fallback target. Never a parallel attempt.
    Hybrid,
}

impl Layer {
    /// Lowercase label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
            Self::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deterministic routing policy.
#[derive(Debug, Clone)]
pub struct PolicyEngine {
    cpu_threshold_percent: f64,
    mem_threshold_percent: f64,
}

impl PolicyEngine {
    /// Engine with the default 80 % CPU and memory thresholds.
    pub fn new() -> Self {
        Self::from_config(&RoutingConfig::default())
    }

    /// Engine using the thresholds from a [`RoutingConfig`].
    pub fn from_config(config: &RoutingConfig) -> Self {
        Self {
            cpu_threshold_percent: config.cpu_threshold_percent,
            mem_threshold_percent: config.mem_threshold_percent,
        }
    }

    /// Decide the target layer for `request` given the node snapshot.
    ///
    /// # Example
    ///
    /// ```rust
    /// use hybrid_layer_orchestrator::{
    ///     Complexity, Layer, NodeStatus, PolicyEngine, Priority, ProcessingRequest, Sensitivity,
    /// };
    ///
    /// let request = ProcessingRequest::new(
    ///     "hello", Priority::High, Sensitivity::Public, Complexity::Simple,
    /// ).expect("valid request");
    /// let node = NodeStatus::active(95.0, 10.0, vec!["llama3".into()]);
    /// assert_eq!(PolicyEngine::new().decide(&request, &node), Layer::Local);
    /// ```
    pub fn decide(&self, request: &ProcessingRequest, node: &NodeStatus) -> Layer {
        if request.sensitivity == Sensitivity::Critical {
            return Layer::Local;
        }

        if node.status == NodeState::Offline {
            return Layer::Remote;
        }

        if request.complexity == Complexity::Simple && request.priority == Priority::High {
            return Layer::Local;
        }

        if request.complexity == Complexity::Complex && request.sensitivity == Sensitivity::Public
        {
            return Layer::Remote;
        }

        if node.cpu_percent > self.cpu_threshold_percent
            || node.mem_percent > self.mem_threshold_percent
        {
            return Layer::Remote;
        }

        Layer::Hybrid
    }
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self::new()
    }
}
