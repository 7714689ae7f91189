// ABOUTME: Chat platform seam used by every orchestration stage.
// ABOUTME: Defines the outbound ChatApi trait and the data it exchanges.

use crate::error::ChatError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type ChatResult<T> = Result<T, ChatError>;

// =============================================================================
// Data Model
// =============================================================================

/// Where a response must be delivered. Fixed for the lifetime of one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadContext {
    pub channel_id: String,
    pub thread_ts: String,
    pub team_id: Option<String>,
    pub user_id: String,
}

impl ThreadContext {
    pub fn new(
        channel_id: impl Into<String>,
        thread_ts: impl Into<String>,
        team_id: Option<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            thread_ts: thread_ts.into(),
            team_id,
            user_id: user_id.into(),
        }
    }
}

/// A message as returned by history and replies lookups
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMessage {
    #[serde(default)]
    pub ts: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub bot_id: Option<String>,
    #[serde(default)]
    pub text: String,
}

impl HistoryMessage {
    pub fn is_from_bot(&self) -> bool {
        self.bot_id.is_some()
    }
}

/// A clickable prompt suggestion shown in a new assistant thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedPrompt {
    pub title: String,
    pub message: String,
}

// =============================================================================
// Chat API
// =============================================================================

/// Outbound calls to the chat platform.
///
/// Every method is a single request; retry policy lives with the callers.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Post a plain-text message, optionally into a thread. Returns its ts.
    async fn post_message(
        &self,
        channel: &str,
        thread_ts: Option<&str>,
        text: &str,
    ) -> ChatResult<String>;

    /// Post a message only `user` can see
    async fn post_ephemeral(
        &self,
        channel: &str,
        user: &str,
        thread_ts: Option<&str>,
        text: &str,
    ) -> ChatResult<()>;

    /// Replies in a thread, oldest first, starting at the thread root
    async fn thread_replies(&self, channel: &str, thread_ts: &str)
        -> ChatResult<Vec<HistoryMessage>>;

    /// Most recent channel messages, newest first (platform order)
    async fn channel_history(&self, channel: &str, limit: u32) -> ChatResult<Vec<HistoryMessage>>;

    async fn join_channel(&self, channel: &str) -> ChatResult<()>;

    /// Open a live message addressed to the context's thread and recipient.
    /// Returns the ts of the streaming message.
    async fn start_stream(&self, context: &ThreadContext) -> ChatResult<String>;

    async fn append_stream(&self, channel: &str, stream_ts: &str, markdown: &str)
        -> ChatResult<()>;

    /// Close a live message, attaching the given blocks
    async fn stop_stream(&self, channel: &str, stream_ts: &str, blocks: &[Value])
        -> ChatResult<()>;

    async fn set_thread_title(&self, channel: &str, thread_ts: &str, title: &str)
        -> ChatResult<()>;

    async fn set_status(
        &self,
        channel: &str,
        thread_ts: &str,
        status: &str,
        loading_messages: &[String],
    ) -> ChatResult<()>;

    async fn set_suggested_prompts(
        &self,
        channel: &str,
        thread_ts: &str,
        title: Option<&str>,
        prompts: &[SuggestedPrompt],
    ) -> ChatResult<()>;
}
