//! Inference collaborators.
//!
//! The orchestrator talks to the outside world only through the traits in
//! this module:
//!
//! - [`LocalRuntime`]: run one prompt on one local model
//! - [`ModelLister`]: list locally loadable models in priority order
//! - [`RemoteInference`]: call the remote inference service
//!
//! Implementations provided here:
//! - [`OllamaCli`]: spawns the `ollama` CLI (runtime + lister)
//! - [`AnthropicClient`]: Anthropic Messages API over HTTP
//! - [`EchoRuntime`] / [`EchoRemote`]: in-process doubles for demos and tests
//! - [`StaticModels`]: a fixed model list
//! - [`AllowedModels`]: another lister restricted to an allow-list
//!
//! ## Environment Variables
//!
//! - `ANTHROPIC_API_KEY`: required by [`AnthropicClient::new`]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub mod anthropic;
pub mod echo;
pub mod ollama;

pub use anthropic::AnthropicClient;
pub use echo::{EchoRemote, EchoRuntime};
pub use ollama::OllamaCli;

/// Errors raised by collaborator implementations.
///
/// The execution adapters translate these into the typed
/// [`LocalFailure`](crate::LocalFailure) / [`RemoteFailure`](crate::RemoteFailure).
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The child process could not be started or awaited.
    #[error("failed to run {program}: {source}")]
    Spawn {
        /// Program that failed.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A helper command exited unsuccessfully.
    #[error("{program} exited with status {code}: {stderr}")]
    Command {
        /// Program that failed.
        program: String,
        /// Exit code (`-1` when killed by a signal).
        code: i32,
        /// Captured stderr.
        stderr: String,
    },

    /// The operation did not finish in time.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The request never produced an HTTP response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// The response could not be interpreted.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Raw output of one local runtime invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeOutput {
    /// Captured stdout, treated as opaque text.
    pub stdout: String,
    /// Captured stderr, used only for diagnostics.
    pub stderr: String,
    /// Process exit code; `-1` when the process was killed by a signal.
    pub exit_code: i32,
}

/// Reply from the remote inference service.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteReply {
    /// Generated text.
    pub text: String,
    /// Provider-reported confidence, if any.
    pub confidence: Option<f64>,
}

/// Local inference runtime.
///
/// Implementations must be thread-safe; the trait is object-safe so it can
/// be held as `Arc<dyn LocalRuntime>`.
#[async_trait]
pub trait LocalRuntime: Send + Sync {
    /// Run `prompt` on `model`.
    ///
    /// A non-zero `exit_code` is reported in the output rather than as an
    /// error; the caller decides what counts as failure.
    async fn execute(
        &self,
        model: &str,
        prompt: &str,
        timeout: Duration,
    ) -> Result<RuntimeOutput, WorkerError>;
}

/// Source of locally available models.
#[async_trait]
pub trait ModelLister: Send + Sync {
    /// Model identifiers in deployment priority order.
    async fn list_models(&self) -> Result<Vec<String>, WorkerError>;
}

/// Remote inference service.
#[async_trait]
pub trait RemoteInference: Send + Sync {
    /// Provider label reported in results (e.g. `anthropic/claude-...`).
    fn name(&self) -> &str;

    /// Send `prompt` and wait at most `timeout` for the reply.
    async fn call(&self, prompt: &str, timeout: Duration) -> Result<RemoteReply, WorkerError>;
}

/// A fixed, pre-configured model list.
#[derive(Debug, Clone, Default)]
pub struct StaticModels(pub Vec<String>);

impl StaticModels {
    /// Wrap an ordered list of model names.
    pub fn new<I, S>(models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(models.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl ModelLister for StaticModels {
    async fn list_models(&self) -> Result<Vec<String>, WorkerError> {
        Ok(self.0.clone())
    }
}

/// Restricts another lister to an allow-list.
///
/// The inner lister is still probed on every call, so an unreachable
/// runtime surfaces as an error. Order follows the inner lister.
#[derive(Clone)]
pub struct AllowedModels {
    inner: Arc<dyn ModelLister>,
    allowed: Vec<String>,
}

impl AllowedModels {
    /// Keep only the models of `inner` named in `allowed`.
    pub fn new(inner: Arc<dyn ModelLister>, allowed: Vec<String>) -> Self {
        Self { inner, allowed }
    }
}

#[async_trait]
impl ModelLister for AllowedModels {
    async fn list_models(&self) -> Result<Vec<String>, WorkerError> {
        let listed = self.inner.list_models().await?;
        Ok(listed
            .into_iter()
            .filter(|m| self.allowed.iter().any(|a| a == m))
            .collect())
    }
}
