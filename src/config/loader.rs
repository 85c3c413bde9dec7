//! TOML loading for [`OrchestratorConfig`].
//!
//! Every config returned from here has passed [`validation::validate`];
//! callers never see a parsed but unchecked config. Errors carry the source
//! name (file path or caller label).

use std::path::Path;

use super::validation::{self, ConfigError};
use super::OrchestratorConfig;

/// Load an [`OrchestratorConfig`] from a TOML file.
///
/// # Errors
///
/// - [`ConfigError::Io`] if the file cannot be read.
/// - [`ConfigError::Parse`] if the TOML is malformed.
/// - [`ConfigError::Validation`] if semantic constraints are violated.
///
/// # Example
///
/// ```rust,no_run
/// use hybrid_layer_orchestrator::config::loader::load_from_file;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_from_file(Path::new("orchestrator.toml"))?;
/// println!("remote model: {}", config.remote.model);
/// # Ok(()) }
/// ```
pub fn load_from_file(path: &Path) -> Result<OrchestratorConfig, ConfigError> {
    let source_name = path.display().to_string();
    match std::fs::read_to_string(path) {
        Ok(content) => load_from_str(&content, &source_name),
        Err(source) => Err(ConfigError::Io {
            file: source_name,
            source,
        }),
    }
}

/// Load an [`OrchestratorConfig`] from a TOML string.
///
/// `source_name` identifies the source in error messages.
///
/// # Errors
///
/// - [`ConfigError::Parse`] if the TOML is malformed.
/// - [`ConfigError::Validation`] if semantic constraints are violated.
pub fn load_from_str(content: &str, source_name: &str) -> Result<OrchestratorConfig, ConfigError> {
    let config: OrchestratorConfig = toml::from_str(content).map_err(|e| ConfigError::Parse {
        file: source_name.to_string(),
        source: e,
    })?;

    match validation::validate(&config) {
        Ok(()) => Ok(config),
        Err(errors) => Err(ConfigError::Validation(join_errors(&errors))),
    }
}

/// One violation per line, in the order `validate` reported them.
fn join_errors(errors: &[ConfigError]) -> String {
    let mut joined = String::new();
    for (i, err) in errors.iter().enumerate() {
        if i > 0 {
            joined.push('\n');
        }
        joined.push_str(&err.to_string());
    }
    joined
}
