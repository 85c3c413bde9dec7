//! Node status refresh and background monitoring.
//!
//! Request handlers read the published snapshot and never wait on a sample,
//! except once before the very first sample exists. A stale snapshot is
//! refreshed by a detached task, at most one at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{clamp_percent, NodeState, NodeStatus, ResourceSampler, ResourceUsage};
use crate::metrics::exporter;
use crate::worker::ModelLister;

/// Default CPU/memory percentage above which the node reports `Busy`.
pub const DEFAULT_BUSY_THRESHOLD_PERCENT: f64 = 80.0;

struct Snapshot {
    status: NodeStatus,
    refreshed_at: Option<Instant>,
}

/// Owner of the [`NodeStatus`] snapshot.
///
/// Refreshes are serialised; reads clone the last snapshot. Until the first
/// refresh the snapshot is [`NodeStatus::offline`].
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use hybrid_layer_orchestrator::{NodeMonitor, OllamaCli};
/// use hybrid_layer_orchestrator::node::SysinfoSampler;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() {
/// let monitor = Arc::new(NodeMonitor::new(
///     Arc::new(SysinfoSampler::new()),
///     Arc::new(OllamaCli::new()),
/// ));
/// let shutdown = CancellationToken::new();
/// let handle = monitor.spawn_refresh(Duration::from_secs(5), shutdown.clone());
/// // ... later
/// shutdown.cancel();
/// let _ = handle.await;
/// # }
/// ```
pub struct NodeMonitor {
    sampler: Arc<dyn ResourceSampler>,
    lister: Arc<dyn ModelLister>,
    busy_threshold_percent: f64,
    snapshot: RwLock<Snapshot>,
    refresh_gate: tokio::sync::Mutex<()>,
    background_refresh: AtomicBool,
}

impl NodeMonitor {
    /// Create a monitor. No sampling happens until the first refresh.
    pub fn new(sampler: Arc<dyn ResourceSampler>, lister: Arc<dyn ModelLister>) -> Self {
        Self {
            sampler,
            lister,
            busy_threshold_percent: DEFAULT_BUSY_THRESHOLD_PERCENT,
            snapshot: RwLock::new(Snapshot {
                status: NodeStatus::offline(),
                refreshed_at: None,
            }),
            refresh_gate: tokio::sync::Mutex::new(()),
            background_refresh: AtomicBool::new(false),
        }
    }

    /// Set the busy threshold (percent).
    pub fn with_busy_threshold(mut self, percent: f64) -> Self {
        self.busy_threshold_percent = percent;
        self
    }

    /// Last snapshot, without sampling.
    pub fn current(&self) -> NodeStatus {
        self.snapshot.read().status.clone()
    }

    /// Sample resources and models now and publish the new snapshot.
    pub async fn refresh(&self) -> NodeStatus {
        let _gate = self.refresh_gate.lock().await;
        self.sample_and_publish().await
    }

    /// Snapshot for a routing decision.
    ///
    /// Returns the published snapshot without sampling. Before the first
    /// sample exists, callers wait for exactly one shared sample. When the
    /// snapshot is older than `max_age` a background refresh is started and
    /// the stale snapshot is returned.
    pub async fn latest(self: &Arc<Self>, max_age: Duration) -> NodeStatus {
        let (status, refreshed_at) = {
            let snapshot = self.snapshot.read();
            (snapshot.status.clone(), snapshot.refreshed_at)
        };
        match refreshed_at {
            None => self.first_sample().await,
            Some(at) => {
                if at.elapsed() > max_age {
                    self.refresh_in_background();
                }
                status
            }
        }
    }

    async fn first_sample(&self) -> NodeStatus {
        let _gate = self.refresh_gate.lock().await;
        // Another caller may have sampled while this one waited on the gate.
        {
            let snapshot = self.snapshot.read();
            if snapshot.refreshed_at.is_some() {
                return snapshot.status.clone();
            }
        }
        self.sample_and_publish().await
    }

    /// Start a detached refresh unless one is already running.
    pub fn refresh_in_background(self: &Arc<Self>) {
        if self
            .background_refresh
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            monitor.refresh().await;
            monitor.background_refresh.store(false, Ordering::Release);
        });
    }

    async fn sample_and_publish(&self) -> NodeStatus {
        let sampler = Arc::clone(&self.sampler);
        let usage = match tokio::task::spawn_blocking(move || sampler.sample()).await {
            Ok(usage) => usage,
            Err(e) => {
                let previous = self.current();
                warn!(error = %e, "resource sampler failed, keeping previous usage");
                ResourceUsage {
                    cpu_percent: previous.cpu_percent,
                    mem_percent: previous.mem_percent,
                }
            }
        };

        let status = match self.lister.list_models().await {
            Ok(models) => {
                let status = NodeStatus::active(usage.cpu_percent, usage.mem_percent, models);
                if status.cpu_percent > self.busy_threshold_percent
                    || status.mem_percent > self.busy_threshold_percent
                {
                    status.with_state(NodeState::Busy)
                } else {
                    status
                }
            }
            Err(e) => {
                warn!(error = %e, "local runtime unreachable, marking node offline");
                NodeStatus {
                    cpu_percent: clamp_percent(usage.cpu_percent),
                    mem_percent: clamp_percent(usage.mem_percent),
                    ..NodeStatus::offline()
                }
            }
        };

        exporter::set_node_usage(status.cpu_percent, status.mem_percent);

        let previous = {
            let mut snapshot = self.snapshot.write();
            let previous = snapshot.status.status;
            snapshot.status = status.clone();
            snapshot.refreshed_at = Some(Instant::now());
            previous
        };

        if previous != status.status {
            info!(from = %previous, to = %status.status, "node state changed");
        }
        debug!(
            cpu = status.cpu_percent,
            mem = status.mem_percent,
            models = status.available_models.len(),
            state = %status.status,
            "node status refreshed"
        );

        status
    }

    /// Refresh every `period` until `shutdown` is cancelled.
    ///
    /// The first refresh happens immediately.
    pub fn spawn_refresh(
        self: &Arc<Self>,
        period: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        monitor.refresh().await;
                    }
                    _ = shutdown.cancelled() => {
                        info!("node monitor shutdown signal received");
                        break;
                    }
                }
            }
        })
    }
}

impl std::fmt::Debug for NodeMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeMonitor")
            .field("busy_threshold_percent", &self.busy_threshold_percent)
            .field("current", &self.current())
            .finish_non_exhaustive()
    }
}
