//! Shared test doubles for the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hybrid_layer_orchestrator::worker::{RemoteReply, RuntimeOutput};
use hybrid_layer_orchestrator::{
    Collaborators, FixedSampler, LocalRuntime, ModelLister, Orchestrator, OrchestratorConfig,
    RemoteInference, StaticModels, WorkerError,
};

/// Local runtime with a scripted outcome and a call counter.
pub struct MockRuntime {
    calls: AtomicUsize,
    exit_code: i32,
    delay: Duration,
    stdout: String,
}

impl MockRuntime {
    pub fn ok(stdout: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            exit_code: 0,
            delay: Duration::ZERO,
            stdout: stdout.to_string(),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            exit_code: 1,
            delay: Duration::ZERO,
            stdout: String::new(),
        })
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            exit_code: 0,
            delay,
            stdout: "late".to_string(),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LocalRuntime for MockRuntime {
    async fn execute(
        &self,
        model: &str,
        _prompt: &str,
        _timeout: Duration,
    ) -> Result<RuntimeOutput, WorkerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(RuntimeOutput {
            stdout: format!("{} ", self.stdout),
            stderr: if self.exit_code == 0 {
                String::new()
            } else {
                format!("{model}: model failed to load")
            },
            exit_code: self.exit_code,
        })
    }
}

/// Scripted remote behaviour.
#[derive(Clone)]
pub enum RemoteBehaviour {
    Reply(String),
    Status(u16),
    Transport,
    Delay(Duration),
}

/// Remote service with a scripted outcome and a call counter.
pub struct MockRemote {
    calls: AtomicUsize,
    behaviour: RemoteBehaviour,
}

impl MockRemote {
    pub fn new(behaviour: RemoteBehaviour) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            behaviour,
        })
    }

    pub fn replying(text: &str) -> Arc<Self> {
        Self::new(RemoteBehaviour::Reply(text.to_string()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteInference for MockRemote {
    fn name(&self) -> &str {
        "mock-remote"
    }

    async fn call(&self, _prompt: &str, _timeout: Duration) -> Result<RemoteReply, WorkerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behaviour {
            RemoteBehaviour::Reply(text) => Ok(RemoteReply {
                text: text.clone(),
                confidence: None,
            }),
            RemoteBehaviour::Status(status) => Err(WorkerError::Status {
                status: *status,
                body: "mock error".to_string(),
            }),
            RemoteBehaviour::Transport => {
                Err(WorkerError::Transport("connection refused".to_string()))
            }
            RemoteBehaviour::Delay(d) => {
                tokio::time::sleep(*d).await;
                Ok(RemoteReply {
                    text: "late".to_string(),
                    confidence: None,
                })
            }
        }
    }
}

/// Model lister for a node whose runtime is down.
pub struct UnreachableLister;

#[async_trait]
impl ModelLister for UnreachableLister {
    async fn list_models(&self) -> Result<Vec<String>, WorkerError> {
        Err(WorkerError::Spawn {
            program: "ollama".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        })
    }
}

/// Default model list used by most scenarios.
pub fn models() -> Arc<StaticModels> {
    Arc::new(StaticModels::new(["llama3:8b", "qwen2.5-coder:7b"]))
}

/// Orchestrator over the given doubles on an idle node.
pub fn orchestrator(
    config: &OrchestratorConfig,
    runtime: Arc<MockRuntime>,
    lister: Arc<dyn ModelLister>,
    remote: Arc<MockRemote>,
) -> Orchestrator {
    orchestrator_on(config, runtime, lister, remote, Arc::new(FixedSampler::new(10.0, 10.0)))
}

/// Orchestrator over the given doubles with an explicit sampler.
pub fn orchestrator_on(
    config: &OrchestratorConfig,
    runtime: Arc<MockRuntime>,
    lister: Arc<dyn ModelLister>,
    remote: Arc<MockRemote>,
    sampler: Arc<FixedSampler>,
) -> Orchestrator {
    Orchestrator::new(
        config,
        Collaborators {
            runtime,
            lister,
            remote,
            sampler,
        },
    )
}
