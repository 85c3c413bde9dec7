//! # Stage: Layer Routing
//!
//! ## Responsibility
//! Decide, per request, which execution layer serves it (local, remote, or
//! local-first hybrid), estimate complexity for unlabelled requests, and pick
//! the local model to run.
//!
//! ## Guarantees
//! - Deterministic: the same request and node snapshot always produce the
//!   same layer and the same model.
//! - Non-blocking: every function here is a pure scan with no I/O.
//! - Critical requests are never routed to the remote layer initially.
//!
//! ## NOT Responsible For
//! - Executing requests (that belongs to `execution` / `fallback`)
//! - Sampling node resources (that belongs to `node`)

pub mod config;
pub mod policy;
pub mod scorer;
pub mod selector;

// Re-exports for convenience
pub use config::RoutingConfig;
pub use policy::{Layer, PolicyEngine};
pub use scorer::ComplexityScorer;
pub use selector::ModelSelector;
