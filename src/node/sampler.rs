//! CPU and memory sampling.
//!
//! [`SysinfoSampler`] keeps one `sysinfo::System` alive between samples:
//! CPU usage is a delta between two refreshes, so the very first sample
//! after construction may read as 0 %.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use sysinfo::System;

/// CPU and memory utilisation, both 0–100.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ResourceUsage {
    /// Global CPU utilisation.
    pub cpu_percent: f64,
    /// Used memory as a share of total memory.
    pub mem_percent: f64,
}

/// Source of resource utilisation samples.
///
/// `sample` may block (it reads `/proc` on Linux); the monitor calls it
/// under `spawn_blocking`.
pub trait ResourceSampler: Send + Sync {
    /// Take one sample.
    fn sample(&self) -> ResourceUsage;
}

/// Host sampler backed by `sysinfo`.
#[derive(Clone)]
pub struct SysinfoSampler {
    system: Arc<Mutex<System>>,
}

impl SysinfoSampler {
    /// Create a sampler and prime the CPU counters.
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu_usage();
        system.refresh_memory();
        Self {
            system: Arc::new(Mutex::new(system)),
        }
    }
}

impl Default for SysinfoSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SysinfoSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SysinfoSampler").finish_non_exhaustive()
    }
}

impl ResourceSampler for SysinfoSampler {
    fn sample(&self) -> ResourceUsage {
        let mut system = self.system.lock();
        system.refresh_cpu_usage();
        system.refresh_memory();

        let total = system.total_memory();
        let mem_percent = if total == 0 {
            0.0
        } else {
            system.used_memory() as f64 / total as f64 * 100.0
        };

        ResourceUsage {
            cpu_percent: f64::from(system.global_cpu_usage()),
            mem_percent,
        }
    }
}

/// Sampler returning a preset reading, adjustable at runtime.
#[derive(Debug, Default)]
pub struct FixedSampler {
    usage: Mutex<ResourceUsage>,
}

impl FixedSampler {
    /// Sampler that always reports the given percentages.
    pub fn new(cpu_percent: f64, mem_percent: f64) -> Self {
        Self {
            usage: Mutex::new(ResourceUsage {
                cpu_percent,
                mem_percent,
            }),
        }
    }

    /// Change the reported percentages.
    pub fn set(&self, cpu_percent: f64, mem_percent: f64) {
        *self.usage.lock() = ResourceUsage {
            cpu_percent,
            mem_percent,
        };
    }
}

impl ResourceSampler for FixedSampler {
    fn sample(&self) -> ResourceUsage {
        *self.usage.lock()
    }
}
