//! `ollama` CLI collaborator.
//!
//! - inference: `ollama run <model> <prompt>`, stdout is the answer
//! - listing: `ollama list`, first column of every row after the header
//!
//! Child processes are spawned with `kill_on_drop`, so a timed-out
//! invocation is killed rather than left running.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{LocalRuntime, ModelLister, RuntimeOutput, WorkerError};

/// Default timeout for `ollama list`.
const DEFAULT_LIST_TIMEOUT: Duration = Duration::from_secs(5);

/// Local runtime and model lister backed by the `ollama` binary.
///
/// ## Example
///
/// ```no_run
/// use hybrid_layer_orchestrator::OllamaCli;
///
/// let cli = OllamaCli::new()
///     .with_binary("/usr/local/bin/ollama")
///     .with_priority(vec!["llama3:8b".into(), "qwen2.5-coder:7b".into()]);
/// ```
#[derive(Debug, Clone)]
pub struct OllamaCli {
    binary: String,
    priority: Vec<String>,
    list_timeout: Duration,
}

impl OllamaCli {
    /// Use `ollama` from `PATH`.
    pub fn new() -> Self {
        Self {
            binary: "ollama".to_string(),
            priority: Vec::new(),
            list_timeout: DEFAULT_LIST_TIMEOUT,
        }
    }

    /// Set the path of the binary.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Models listed here come first, in this order, when installed.
    pub fn with_priority(mut self, priority: Vec<String>) -> Self {
        self.priority = priority;
        self
    }

    /// Set the timeout for model listing.
    pub fn with_list_timeout(mut self, timeout: Duration) -> Self {
        self.list_timeout = timeout;
        self
    }

    async fn run(&self, args: &[&str], timeout: Duration) -> Result<RuntimeOutput, WorkerError> {
        let child = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| WorkerError::Spawn {
                program: self.binary.clone(),
                source,
            })?;

        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| WorkerError::Timeout(timeout))?
            .map_err(|source| WorkerError::Spawn {
                program: self.binary.clone(),
                source,
            })?;

        Ok(RuntimeOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}

impl Default for OllamaCli {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LocalRuntime for OllamaCli {
    async fn execute(
        &self,
        model: &str,
        prompt: &str,
        timeout: Duration,
    ) -> Result<RuntimeOutput, WorkerError> {
        debug!(binary = %self.binary, model = model, "spawning local runtime");
        self.run(&["run", model, prompt], timeout).await
    }
}

#[async_trait]
impl ModelLister for OllamaCli {
    async fn list_models(&self) -> Result<Vec<String>, WorkerError> {
        let output = self.run(&["list"], self.list_timeout).await?;
        if output.exit_code != 0 {
            return Err(WorkerError::Command {
                program: self.binary.clone(),
                code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(order_by_priority(parse_model_list(&output.stdout), &self.priority))
    }
}

/// Parse `ollama list` output: skip the header row, keep the NAME column.
pub(crate) fn parse_model_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

/// Move prioritised models to the front, keeping listing order for the rest.
pub(crate) fn order_by_priority(models: Vec<String>, priority: &[String]) -> Vec<String> {
    if priority.is_empty() {
        return models;
    }
    let mut ordered: Vec<String> = priority
        .iter()
        .filter(|p| models.contains(p))
        .cloned()
        .collect();
    ordered.extend(models.into_iter().filter(|m| !priority.contains(m)));
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST_OUTPUT: &str = "\
NAME                    ID              SIZE      MODIFIED
llama3:8b               365c0bd3c000    4.7 GB    2 days ago
qwen2.5-coder:7b        2b0496514337    4.7 GB    3 weeks ago

mixtral:8x7b            a3b6bef0f836    26 GB     5 weeks ago
";

    #[test]
    fn test_parse_model_list_skips_header_and_blank_lines() {
        assert_eq!(
            parse_model_list(LIST_OUTPUT),
            vec!["llama3:8b", "qwen2.5-coder:7b", "mixtral:8x7b"]
        );
    }

    #[test]
    fn test_parse_model_list_header_only_is_empty() {
        assert!(parse_model_list("NAME ID SIZE MODIFIED\n").is_empty());
        assert!(parse_model_list("").is_empty());
    }

    #[test]
    fn test_order_by_priority_moves_preferred_first() {
        let models = parse_model_list(LIST_OUTPUT);
        let priority = vec!["mixtral:8x7b".to_string(), "not-installed".to_string()];
        assert_eq!(
            order_by_priority(models, &priority),
            vec!["mixtral:8x7b", "llama3:8b", "qwen2.5-coder:7b"]
        );
    }

    #[test]
    fn test_order_by_priority_empty_keeps_order() {
        let models = vec!["b".to_string(), "a".to_string()];
        assert_eq!(order_by_priority(models.clone(), &[]), models);
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let cli = OllamaCli::new().with_binary("/nonexistent/ollama-binary");
        let result = cli.execute("m", "p", Duration::from_secs(1)).await;
        assert!(matches!(result, Err(WorkerError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_slow_process_times_out() {
        // `yes` never exits on its own.
        let cli = OllamaCli::new().with_binary("yes");
        let result = cli.execute("m", "p", Duration::from_millis(50)).await;
        assert!(matches!(result, Err(WorkerError::Timeout(_))));
    }
}
