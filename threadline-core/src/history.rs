// ABOUTME: Fetches thread and channel history with a join-and-retry fallback.
// ABOUTME: A not_in_channel failure triggers one join and exactly one retry.

use crate::metrics;
use crate::traits::{ChatApi, ChatResult, HistoryMessage};
use std::future::Future;

/// Run `fetch`; if it fails because the bot is not in `channel`, join and try once more.
/// Any other failure, including a failed join or a failed retry, goes straight back.
pub async fn with_join_retry<T, F, Fut>(api: &dyn ChatApi, channel: &str, fetch: F) -> ChatResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = ChatResult<T>>,
{
    match fetch().await {
        Err(err) if err.is_not_in_channel() => {
            tracing::info!(channel, "Not in channel, joining before retrying history fetch");
            api.join_channel(channel).await?;
            metrics::record_channel_join();
            fetch().await
        }
        other => other,
    }
}

/// Thread replies, oldest first
pub async fn fetch_thread(
    api: &dyn ChatApi,
    channel: &str,
    thread_ts: &str,
) -> ChatResult<Vec<HistoryMessage>> {
    let messages =
        with_join_retry(api, channel, || api.thread_replies(channel, thread_ts)).await?;
    tracing::debug!(channel, thread_ts, count = messages.len(), "Fetched thread replies");
    Ok(messages)
}

/// Recent channel messages, reordered oldest first
pub async fn fetch_channel(
    api: &dyn ChatApi,
    channel: &str,
    limit: u32,
) -> ChatResult<Vec<HistoryMessage>> {
    let mut messages =
        with_join_retry(api, channel, || api.channel_history(channel, limit)).await?;
    messages.reverse();
    tracing::debug!(channel, count = messages.len(), "Fetched channel history");
    Ok(messages)
}
