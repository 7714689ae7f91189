// ABOUTME: Tests for decoding OpenAI Responses SSE bodies into events.
// ABOUTME: Feeds byte chunks through events_from_body without a network.

use futures::StreamExt;
use threadline_llm::backends::openai::events_from_body;
use threadline_llm::{ErrorCode, LlmEvent};

fn chunks(parts: &[&str]) -> Vec<Result<Vec<u8>, String>> {
    parts.iter().map(|p| Ok(p.as_bytes().to_vec())).collect()
}

async fn decode(parts: Vec<Result<Vec<u8>, String>>) -> Vec<LlmEvent> {
    events_from_body(futures::stream::iter(parts)).collect().await
}

#[tokio::test]
async fn test_mixed_kinds_keep_arrival_order() {
    let events = decode(chunks(&[
        "event: response.created\ndata: {\"type\":\"response.created\",\"response\":{}}\n\n",
        "data: {\"type\":\"response.output_text.delta\",\"delta\":\"Hel\"}\n\n",
        "data: {\"type\":\"response.output_text.delta\",\"del",
        "ta\":\"lo\"}\n\ndata: {\"type\":\"response.output_text.done\",\"text\":\"Hello\"}\n\n",
        "data: {\"type\":\"response.completed\",\"response\":{}}\n\n",
    ]))
    .await;

    let kinds: Vec<&str> = events.iter().map(|e| e.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            "response.created",
            "response.output_text.delta",
            "response.output_text.delta",
            "response.output_text.done",
            "response.completed",
        ]
    );
    let text: String = events.iter().filter_map(|e| e.delta()).collect();
    assert_eq!(text, "Hello");
}

#[tokio::test]
async fn test_nothing_after_completion_is_read() {
    let events = decode(chunks(&[
        "data: {\"type\":\"response.completed\",\"response\":{}}\n\n\
         data: {\"type\":\"response.output_text.delta\",\"delta\":\"ghost\"}\n\n",
    ]))
    .await;
    assert_eq!(events.len(), 1);
}

#[tokio::test]
async fn test_done_sentinel_ends_stream() {
    let events = decode(chunks(&[
        "data: {\"type\":\"response.output_text.delta\",\"delta\":\"x\"}\n\n",
        "data: [DONE]\n\n",
        "data: {\"type\":\"response.output_text.delta\",\"delta\":\"y\"}\n\n",
    ]))
    .await;
    assert_eq!(events, vec![LlmEvent::TextDelta("x".to_string())]);
}

#[tokio::test]
async fn test_transport_failure_becomes_single_error() {
    let mut parts = chunks(&["data: {\"type\":\"response.output_text.delta\",\"delta\":\"a\"}\n\n"]);
    parts.push(Err("connection reset".to_string()));
    parts.push(Ok(b"data: {\"type\":\"response.output_text.delta\",\"delta\":\"b\"}\n\n".to_vec()));

    let events = decode(parts).await;
    assert_eq!(
        events,
        vec![
            LlmEvent::TextDelta("a".to_string()),
            LlmEvent::Error {
                code: ErrorCode::Transport,
                message: "connection reset".to_string()
            },
        ]
    );
}

#[tokio::test]
async fn test_body_closing_without_marker_just_ends() {
    let events = decode(chunks(&[
        "data: {\"type\":\"response.output_text.delta\",\"delta\":\"tail\"}",
    ]))
    .await;
    assert_eq!(events, vec![LlmEvent::TextDelta("tail".to_string())]);
}

#[tokio::test]
async fn test_error_event_is_terminal() {
    let events = decode(chunks(&[
        "data: {\"type\":\"error\",\"code\":\"server_error\",\"message\":\"boom\"}\n\n",
    ]))
    .await;
    assert_eq!(
        events,
        vec![LlmEvent::Error {
            code: ErrorCode::ProviderError,
            message: "boom".to_string()
        }]
    );
}
