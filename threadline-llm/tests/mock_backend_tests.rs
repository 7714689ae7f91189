// ABOUTME: Tests for the scripted mock backend.
// ABOUTME: Verifies expectation matching, prompt recording, and failure scripting.

use threadline_llm::backends::mock::MockBackend;
use threadline_llm::{CompletionRequest, ErrorCode, LlmError, LlmEvent};

async fn collect(mock: &MockBackend, input: &str) -> Vec<LlmEvent> {
    let handle = mock.clone().into_handle();
    let mut receiver = handle
        .stream(&CompletionRequest::new("test-model", input))
        .await
        .unwrap();
    let mut events = Vec::new();
    while let Some(event) = receiver.recv().await {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_mock_streams_deltas_then_completes() {
    let mock = MockBackend::new()
        .on_prompt("hello")
        .respond_deltas(&["Hi ", "there"]);

    let events = collect(&mock, "System: x\n\nUser: hello").await;
    assert_eq!(
        events,
        vec![
            LlmEvent::TextDelta("Hi ".to_string()),
            LlmEvent::TextDelta("there".to_string()),
            LlmEvent::Completed { usage: None },
        ]
    );
}

#[tokio::test]
async fn test_mock_records_prompts() {
    let mock = MockBackend::new();
    collect(&mock, "User: one").await;
    collect(&mock, "User: two").await;

    let prompts = mock.prompts();
    assert_eq!(prompts.len(), 2);
    assert_eq!(prompts[0].input, "User: one");
    assert_eq!(prompts[1].model, "test-model");
}

#[tokio::test]
async fn test_mock_without_expectation_answers_with_latest_line() {
    let mock = MockBackend::new();
    let events = collect(&mock, "System: x\n\nUser: what time is it").await;
    assert_eq!(
        events[0],
        LlmEvent::TextDelta("Mock: no expectation for 'User: what time is it'".to_string())
    );
    assert!(matches!(events[1], LlmEvent::Completed { .. }));
}

#[tokio::test]
async fn test_mock_prefers_front_then_searches() {
    let mock = MockBackend::new()
        .on_prompt("first")
        .respond_deltas(&["1"])
        .on_prompt("second")
        .respond_deltas(&["2"]);

    let events = collect(&mock, "second").await;
    assert_eq!(events[0], LlmEvent::TextDelta("2".to_string()));
    let events = collect(&mock, "first").await;
    assert_eq!(events[0], LlmEvent::TextDelta("1".to_string()));
}

#[tokio::test]
async fn test_mock_mid_stream_error() {
    let mock = MockBackend::new().on_prompt("x").respond_deltas_then_error(
        &["a", "b"],
        ErrorCode::ProviderError,
        "overloaded",
    );

    let events = collect(&mock, "x").await;
    assert_eq!(events.len(), 3);
    assert_eq!(
        events[2],
        LlmEvent::Error {
            code: ErrorCode::ProviderError,
            message: "overloaded".to_string()
        }
    );
}

#[tokio::test]
async fn test_mock_setup_failure() {
    let mock = MockBackend::new()
        .on_prompt("x")
        .fail_setup(LlmError::MissingApiKey { backend: "mock" });

    let result = mock
        .clone()
        .into_handle()
        .stream(&CompletionRequest::new("m", "x"))
        .await;
    match result {
        Err(err) => assert_eq!(err.code(), ErrorCode::AuthFailed),
        Ok(_) => panic!("expected setup failure"),
    }
}
