// ABOUTME: Integration tests for history fetching with join-and-retry
// ABOUTME: Uses the recording ChatApi with scripted not_in_channel failures

use threadline_core::history::{fetch_channel, fetch_thread};
use threadline_core::testing::{ChatOp, RecordingChatApi};
use threadline_core::{ChatError, HistoryMessage};

fn msg(ts: &str, text: &str) -> HistoryMessage {
    HistoryMessage {
        ts: ts.to_string(),
        user: Some("U1".to_string()),
        bot_id: None,
        text: text.to_string(),
    }
}

#[tokio::test]
async fn test_not_in_channel_once_joins_and_retries_once() {
    let api = RecordingChatApi::new()
        .with_thread_replies(vec![msg("1.0", "root")])
        .fail_not_in_channel(ChatOp::ThreadReplies, "C1", 1);

    let messages = fetch_thread(&api, "C1", "1.0").await.unwrap();

    assert_eq!(messages, vec![msg("1.0", "root")]);
    assert_eq!(api.count(ChatOp::JoinChannel), 1);
    assert_eq!(api.count(ChatOp::ThreadReplies), 2);
    assert_eq!(
        api.ops(),
        vec![ChatOp::ThreadReplies, ChatOp::JoinChannel, ChatOp::ThreadReplies]
    );
}

#[tokio::test]
async fn test_not_in_channel_twice_gives_up_after_one_retry() {
    let api = RecordingChatApi::new().fail_not_in_channel(ChatOp::ThreadReplies, "C1", 2);

    let err = fetch_thread(&api, "C1", "1.0").await.unwrap_err();

    assert!(err.is_not_in_channel());
    assert_eq!(api.count(ChatOp::JoinChannel), 1);
    assert_eq!(api.count(ChatOp::ThreadReplies), 2);
}

#[tokio::test]
async fn test_other_errors_are_not_retried() {
    let api = RecordingChatApi::new().fail_times(
        ChatOp::ThreadReplies,
        1,
        ChatError::api("conversations.replies", "channel_not_found"),
    );

    let err = fetch_thread(&api, "C1", "1.0").await.unwrap_err();

    assert_eq!(
        err,
        ChatError::api("conversations.replies", "channel_not_found")
    );
    assert_eq!(api.count(ChatOp::JoinChannel), 0);
    assert_eq!(api.count(ChatOp::ThreadReplies), 1);
}

#[tokio::test]
async fn test_failed_join_is_surfaced_without_retry() {
    let api = RecordingChatApi::new()
        .fail_not_in_channel(ChatOp::ChannelHistory, "C1", 1)
        .fail_times(
            ChatOp::JoinChannel,
            1,
            ChatError::api("conversations.join", "is_archived"),
        );

    let err = fetch_channel(&api, "C1", 50).await.unwrap_err();

    assert_eq!(err, ChatError::api("conversations.join", "is_archived"));
    assert_eq!(api.count(ChatOp::ChannelHistory), 1);
}

#[tokio::test]
async fn test_channel_history_is_returned_oldest_first() {
    let api = RecordingChatApi::new().with_channel_history(vec![
        msg("3.0", "newest"),
        msg("2.0", "middle"),
        msg("1.0", "oldest"),
    ]);

    let messages = fetch_channel(&api, "C1", 50).await.unwrap();

    let texts: Vec<&str> = messages.iter().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, vec!["oldest", "middle", "newest"]);
}
