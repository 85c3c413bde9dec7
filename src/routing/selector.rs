//! Local model selection.
//!
//! Picks one model name out of the monitor's ordered availability list:
//!
//! 1. code-related query and a code-specialised model installed → that model
//! 2. complex request and a large general-purpose model installed → that model
//! 3. otherwise the first entry (the list order is the deployment priority)

use crate::request::{Complexity, ProcessingRequest};

use super::config::RoutingConfig;

/// Keyword/marker based model selector.
///
/// All matching is case-insensitive substring matching.
#[derive(Debug, Clone)]
pub struct ModelSelector {
    code_keywords: Vec<String>,
    code_model_markers: Vec<String>,
    large_model_markers: Vec<String>,
}

impl ModelSelector {
    /// Selector with the default keyword and marker lists.
    pub fn new() -> Self {
        Self::from_config(&RoutingConfig::default())
    }

    /// Selector using the lists from a [`RoutingConfig`].
    pub fn from_config(config: &RoutingConfig) -> Self {
        let lower = |v: &[String]| v.iter().map(|s| s.to_lowercase()).collect::<Vec<_>>();
        Self {
            code_keywords: lower(&config.code_keywords),
            code_model_markers: lower(&config.code_model_markers),
            large_model_markers: lower(&config.large_model_markers),
        }
    }

    /// Choose a model for `request` from `available`.
    ///
    /// Returns `None` only when `available` is empty; callers check for that
    /// before selecting.
    pub fn select<'a>(
        &self,
        available: &'a [String],
        request: &ProcessingRequest,
    ) -> Option<&'a str> {
        if self.is_code_query(&request.query) {
            if let Some(model) = find_marked(available, &self.code_model_markers) {
                return Some(model);
            }
        }

        if request.complexity == Complexity::Complex {
            if let Some(model) = find_marked(available, &self.large_model_markers) {
                return Some(model);
            }
        }

        available.first().map(String::as_str)
    }

    /// `true` if the query mentions any code keyword.
    pub fn is_code_query(&self, query: &str) -> bool {
        let lower = query.to_lowercase();
        self.code_keywords.iter().any(|k| lower.contains(k.as_str()))
    }
}

impl Default for ModelSelector {
    fn default() -> Self {
        Self::new()
    }
}

/// First model (in priority order) whose name contains any marker.
fn find_marked<'a>(available: &'a [String], markers: &[String]) -> Option<&'a str> {
    available
        .iter()
        .find(|model| {
            let lower = model.to_lowercase();
            markers.iter().any(|m| lower.contains(m.as_str()))
        })
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{Priority, Sensitivity};

    fn req(query: &str, complexity: Complexity) -> ProcessingRequest {
        ProcessingRequest::new(query, Priority::Medium, Sensitivity::Private, complexity)
            .expect("test: valid request")
    }

    fn models(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_code_query_prefers_code_model() {
        let available = models(&["llama3:8b", "qwen2.5-coder:7b", "llama3:70b"]);
        let request = req("Debug this Python function", Complexity::Complex);
        let selected = ModelSelector::new().select(&available, &request);
        assert_eq!(selected, Some("qwen2.5-coder:7b"));
    }

    #[test]
    fn test_code_query_without_code_model_falls_through_to_large() {
        let available = models(&["llama3:8b", "llama3:70b"]);
        let request = req("refactor my script", Complexity::Complex);
        let selected = ModelSelector::new().select(&available, &request);
        assert_eq!(selected, Some("llama3:70b"));
    }

    #[test]
    fn test_complex_request_prefers_large_model() {
        let available = models(&["phi3:mini", "mixtral:8x7b"]);
        let request = req("Summarise the history of Rome", Complexity::Complex);
        let selected = ModelSelector::new().select(&available, &request);
        assert_eq!(selected, Some("mixtral:8x7b"));
    }

    #[test]
    fn test_moderate_request_takes_first_entry() {
        let available = models(&["phi3:mini", "mixtral:8x7b"]);
        let request = req("What's the weather like?", Complexity::Moderate);
        let selected = ModelSelector::new().select(&available, &request);
        assert_eq!(selected, Some("phi3:mini"));
    }

    #[test]
    fn test_marker_matching_is_case_insensitive() {
        let available = models(&["Base", "DeepSeek-Coder-V2"]);
        let request = req("fix this BUG", Complexity::Simple);
        let selected = ModelSelector::new().select(&available, &request);
        assert_eq!(selected, Some("DeepSeek-Coder-V2"));
    }

    #[test]
    fn test_empty_list_returns_none() {
        assert_eq!(ModelSelector::new().select(&[], &req("hi", Complexity::Simple)), None);
    }

    #[test]
    fn test_custom_markers_from_config() {
        let config = RoutingConfig {
            large_model_markers: vec!["BIG".to_string()],
            ..RoutingConfig::default()
        };
        let available = models(&["small", "bigmodel"]);
        let request = req("essay", Complexity::Complex);
        let selected = ModelSelector::from_config(&config).select(&available, &request);
        assert_eq!(selected, Some("bigmodel"));
    }
}
