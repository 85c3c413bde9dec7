//! In-process collaborators for demos and tests.
//!
//! Useful for orchestrator smoke runs without a local runtime or network.

use std::time::Duration;

use async_trait::async_trait;

use super::{LocalRuntime, RemoteInference, RemoteReply, RuntimeOutput, WorkerError};

/// Local runtime that echoes the prompt back.
#[derive(Debug, Clone)]
pub struct EchoRuntime {
    /// Simulated inference delay
    pub delay: Duration,
    /// Exit code reported for every invocation
    pub exit_code: i32,
}

impl EchoRuntime {
    /// Echo runtime with a 10ms delay.
    pub fn new() -> Self {
        Self {
            delay: Duration::from_millis(10),
            exit_code: 0,
        }
    }

    /// Echo runtime with a custom delay.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::new()
        }
    }

    /// Runtime whose every invocation exits with status 1.
    pub fn failing() -> Self {
        Self {
            exit_code: 1,
            ..Self::new()
        }
    }
}

impl Default for EchoRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LocalRuntime for EchoRuntime {
    async fn execute(
        &self,
        model: &str,
        prompt: &str,
        timeout: Duration,
    ) -> Result<RuntimeOutput, WorkerError> {
        if self.delay > timeout {
            tokio::time::sleep(timeout).await;
            return Err(WorkerError::Timeout(timeout));
        }
        tokio::time::sleep(self.delay).await;

        if self.exit_code != 0 {
            return Ok(RuntimeOutput {
                stdout: String::new(),
                stderr: format!("{model}: simulated failure"),
                exit_code: self.exit_code,
            });
        }

        Ok(RuntimeOutput {
            stdout: format!("[{model}] {prompt}\n"),
            stderr: String::new(),
            exit_code: 0,
        })
    }
}

/// Remote service that echoes the prompt back.
#[derive(Debug, Clone)]
pub struct EchoRemote {
    /// Simulated round-trip delay
    pub delay: Duration,
    /// Confidence reported with each reply
    pub confidence: Option<f64>,
    /// When set, every call fails with a transport error
    pub unreachable: bool,
}

impl EchoRemote {
    /// Echo remote with a 10ms delay and no reported confidence.
    pub fn new() -> Self {
        Self {
            delay: Duration::from_millis(10),
            confidence: None,
            unreachable: false,
        }
    }

    /// Echo remote with a custom delay.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::new()
        }
    }

    /// Remote whose every call fails with a transport error.
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::new()
        }
    }
}

impl Default for EchoRemote {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteInference for EchoRemote {
    fn name(&self) -> &str {
        "echo-remote"
    }

    async fn call(&self, prompt: &str, timeout: Duration) -> Result<RemoteReply, WorkerError> {
        if self.unreachable {
            return Err(WorkerError::Transport("connection refused".to_string()));
        }
        if self.delay > timeout {
            tokio::time::sleep(timeout).await;
            return Err(WorkerError::Timeout(timeout));
        }
        tokio::time::sleep(self.delay).await;
        Ok(RemoteReply {
            text: format!("[remote] {prompt}"),
            confidence: self.confidence,
        })
    }
}
