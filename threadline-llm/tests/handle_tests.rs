// ABOUTME: Tests for LlmHandle and EventReceiver.
// ABOUTME: Covers Send/Sync bounds and terminal-event handling in the receiver.

use futures::StreamExt;
use threadline_llm::handle::{EventReceiver, LlmHandle};
use threadline_llm::{ErrorCode, LlmEvent};

fn assert_send<T: Send>() {}
fn assert_sync<T: Sync>() {}

#[test]
fn test_llm_handle_is_send_sync() {
    assert_send::<LlmHandle>();
    assert_sync::<LlmHandle>();
}

#[test]
fn test_event_receiver_is_send() {
    assert_send::<EventReceiver>();
}

#[tokio::test]
async fn test_event_receiver_yields_in_order() {
    let mut receiver = EventReceiver::from_events(vec![
        LlmEvent::TextDelta("hello".to_string()),
        LlmEvent::TextDelta("world".to_string()),
    ]);

    assert_eq!(
        receiver.recv().await,
        Some(LlmEvent::TextDelta("hello".to_string()))
    );
    assert_eq!(
        receiver.recv().await,
        Some(LlmEvent::TextDelta("world".to_string()))
    );
    assert!(receiver.recv().await.is_none());
    assert!(receiver.is_finished());
}

#[tokio::test]
async fn test_event_receiver_stops_after_completion() {
    let mut receiver = EventReceiver::from_events(vec![
        LlmEvent::TextDelta("a".to_string()),
        LlmEvent::Completed { usage: None },
        LlmEvent::TextDelta("late".to_string()),
    ]);

    assert!(receiver.recv().await.is_some());
    assert!(matches!(
        receiver.recv().await,
        Some(LlmEvent::Completed { .. })
    ));
    assert!(receiver.recv().await.is_none());
}

#[tokio::test]
async fn test_event_receiver_stops_after_error() {
    let mut receiver = EventReceiver::from_events(vec![
        LlmEvent::Error {
            code: ErrorCode::Transport,
            message: "reset".to_string(),
        },
        LlmEvent::TextDelta("late".to_string()),
    ]);

    assert!(matches!(receiver.recv().await, Some(LlmEvent::Error { .. })));
    assert!(receiver.recv().await.is_none());
}

#[tokio::test]
async fn test_event_receiver_is_lazy() {
    // An unbounded source proves recv pulls one event at a time
    let source = futures::stream::iter(0..).map(|i| LlmEvent::TextDelta(i.to_string()));
    let mut receiver = EventReceiver::new(source.boxed());

    assert_eq!(receiver.recv().await, Some(LlmEvent::TextDelta("0".to_string())));
    assert_eq!(receiver.recv().await, Some(LlmEvent::TextDelta("1".to_string())));
    assert!(!receiver.is_finished());
}
