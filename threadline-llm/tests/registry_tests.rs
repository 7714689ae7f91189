// ABOUTME: Tests for the LlmRegistry and BackendFactory pattern.
// ABOUTME: Validates runtime backend selection and creation.

use threadline_llm::{BackendConfig, LlmRegistry};

fn config(backend_type: &str) -> BackendConfig {
    BackendConfig {
        backend_type: backend_type.to_string(),
        ..BackendConfig::default()
    }
}

#[tokio::test]
async fn test_registry_creates_mock_backend() {
    let handle = LlmRegistry::default().create(&config("mock")).unwrap();
    assert_eq!(handle.name(), "mock");
}

#[tokio::test]
async fn test_registry_creates_openai_backend_without_key() {
    let handle = LlmRegistry::default().create(&config("openai")).unwrap();
    assert_eq!(handle.name(), "openai");
}

#[tokio::test]
async fn test_registry_backend_name_case_insensitive() {
    let handle = LlmRegistry::default().create(&config(" Mock ")).unwrap();
    assert_eq!(handle.name(), "mock");
}

#[test]
fn test_registry_lists_available_backends() {
    let registry = LlmRegistry::default();
    assert_eq!(registry.available(), vec!["mock", "openai"]);
}

#[test]
fn test_registry_unknown_backend_errors() {
    match LlmRegistry::default().create(&config("nonexistent")) {
        Err(err) => {
            let message = err.to_string();
            assert!(message.contains("Unknown LLM backend 'nonexistent'"));
            assert!(message.contains("available: mock, openai"));
        }
        Ok(_) => panic!("Expected error for unknown backend"),
    }
}
