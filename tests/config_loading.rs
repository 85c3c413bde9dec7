//! End-to-end: TOML file on disk to a routed request.

use std::io::Write;

use hybrid_layer_orchestrator::config::loader::load_from_file;
use hybrid_layer_orchestrator::config::validation::ConfigError;
use hybrid_layer_orchestrator::{
    Collaborators, NodeState, Orchestrator, ResultLayer, RouteOptions,
};

fn write_config(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("orchestrator.toml");
    let mut file = std::fs::File::create(&path).expect("test: create config");
    file.write_all(body.as_bytes()).expect("test: write config");
    path
}

#[tokio::test]
async fn test_echo_config_routes_through_configured_models() {
    let dir = tempfile::tempdir().expect("test: tempdir");
    let path = write_config(
        &dir,
        r#"
[local]
runtime = "echo"
models = ["phi3:mini", "deepseek-coder:6.7b"]

[remote]
provider = "echo"

[fallback]
emergency_confidence = 0.5
"#,
    );

    let config = load_from_file(&path).expect("test: load");
    let collaborators = Collaborators::from_config(&config).expect("test: collaborators");
    let orchestrator = Orchestrator::new(&config, collaborators);

    let result = orchestrator
        .route(
            "Fix this python function",
            RouteOptions::new().priority("high").complexity("simple"),
        )
        .await
        .expect("test: route");

    assert_eq!(result.layer, ResultLayer::Local);
    assert_eq!(result.model_or_provider, "deepseek-coder:6.7b");
    assert!(result.response_text.contains("Fix this python function"));

    let status = orchestrator.monitor().current();
    assert_eq!(status.available_models.len(), 2);
}

#[tokio::test]
async fn test_echo_config_with_empty_model_list_uses_echo_defaults() {
    let dir = tempfile::tempdir().expect("test: tempdir");
    let path = write_config(&dir, "[local]\nruntime = \"echo\"\n[remote]\nprovider = \"echo\"\n");

    let config = load_from_file(&path).expect("test: load");
    let orchestrator = Orchestrator::new(
        &config,
        Collaborators::from_config(&config).expect("test: collaborators"),
    );

    let status = orchestrator.status().await;
    assert!(!status.node.available_models.is_empty());
    assert_ne!(status.node.status, NodeState::Offline);
}

#[test]
fn test_invalid_thresholds_are_rejected_on_load() {
    let dir = tempfile::tempdir().expect("test: tempdir");
    let path = write_config(
        &dir,
        "[routing]\nsimple_below = 0.9\ncomplex_above = 0.2\n\
         [fallback]\nemergency_confidence = 2.0\n",
    );

    match load_from_file(&path) {
        Err(ConfigError::Validation(msg)) => {
            assert!(msg.contains("emergency_confidence"));
            assert!(msg.contains("routing.complex_above"));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}
