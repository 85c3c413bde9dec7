//! # Stage: Local Node Monitor
//!
//! ## Responsibility
//! Sample local CPU/memory utilisation and local model availability and
//! expose the result as a [`NodeStatus`] snapshot.
//!
//! ## Guarantees
//! - Single writer: only [`NodeMonitor::refresh`] replaces the snapshot.
//! - Readers get a clone of the latest snapshot and never block the writer
//!   for longer than the clone.
//! - `Offline` whenever the model listing fails; the percentages are still
//!   reported in that case.
//!
//! ## NOT Responsible For
//! - Deciding what to do with the snapshot (see: `routing::policy`)
//! - Starting or supervising the local runtime

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::routing::Layer;

pub mod monitor;
pub mod sampler;

pub use monitor::NodeMonitor;
pub use sampler::{FixedSampler, ResourceSampler, ResourceUsage, SysinfoSampler};

/// Coarse health of the local node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    /// Runtime reachable, resources below the busy threshold.
    Active,
    /// Runtime reachable, CPU or memory above the busy threshold.
    Busy,
    /// Runtime unreachable.
    Offline,
}

impl NodeState {
    /// Lowercase label used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Busy => "busy",
            Self::Offline => "offline",
        }
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of the local node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeStatus {
    /// Always [`Layer::Local`].
    pub layer: Layer,
    /// CPU utilisation, 0–100.
    pub cpu_percent: f64,
    /// Memory utilisation, 0–100.
    pub mem_percent: f64,
    /// Loadable models in deployment priority order.
    pub available_models: Vec<String>,
    /// Coarse health.
    pub status: NodeState,
    /// When this snapshot was taken.
    pub sampled_at: DateTime<Utc>,
}

impl NodeStatus {
    /// Snapshot of a reachable node. Percentages are clamped to 0–100.
    pub fn active(cpu_percent: f64, mem_percent: f64, available_models: Vec<String>) -> Self {
        Self {
            layer: Layer::Local,
            cpu_percent: clamp_percent(cpu_percent),
            mem_percent: clamp_percent(mem_percent),
            available_models,
            status: NodeState::Active,
            sampled_at: Utc::now(),
        }
    }

    /// Snapshot of an unreachable node with no models and zero utilisation.
    pub fn offline() -> Self {
        Self {
            layer: Layer::Local,
            cpu_percent: 0.0,
            mem_percent: 0.0,
            available_models: Vec::new(),
            status: NodeState::Offline,
            sampled_at: Utc::now(),
        }
    }

    /// Replace the state, keeping everything else.
    pub fn with_state(mut self, status: NodeState) -> Self {
        self.status = status;
        self
    }
}

/// Clamp to 0–100; NaN becomes 0.
pub(crate) fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}
