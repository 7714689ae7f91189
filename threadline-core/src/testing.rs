// ABOUTME: In-memory ChatApi that records every outbound call for assertions.
// ABOUTME: Failures can be scripted per operation, including failing the k-th append.

use crate::error::ChatError;
use crate::traits::{ChatApi, ChatResult, HistoryMessage, SuggestedPrompt, ThreadContext};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChatOp {
    PostMessage,
    PostEphemeral,
    ThreadReplies,
    ChannelHistory,
    JoinChannel,
    StartStream,
    AppendStream,
    StopStream,
    SetThreadTitle,
    SetStatus,
    SetSuggestedPrompts,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChatCall {
    PostMessage {
        channel: String,
        thread_ts: Option<String>,
        text: String,
    },
    PostEphemeral {
        channel: String,
        user: String,
        thread_ts: Option<String>,
        text: String,
    },
    ThreadReplies {
        channel: String,
        thread_ts: String,
    },
    ChannelHistory {
        channel: String,
        limit: u32,
    },
    JoinChannel {
        channel: String,
    },
    StartStream {
        context: ThreadContext,
    },
    AppendStream {
        channel: String,
        stream_ts: String,
        markdown: String,
    },
    StopStream {
        channel: String,
        stream_ts: String,
        blocks: Vec<Value>,
    },
    SetThreadTitle {
        channel: String,
        thread_ts: String,
        title: String,
    },
    SetStatus {
        channel: String,
        thread_ts: String,
        status: String,
        loading_messages: Vec<String>,
    },
    SetSuggestedPrompts {
        channel: String,
        thread_ts: String,
        title: Option<String>,
        prompts: Vec<SuggestedPrompt>,
    },
}

impl ChatCall {
    pub fn op(&self) -> ChatOp {
        match self {
            ChatCall::PostMessage { .. } => ChatOp::PostMessage,
            ChatCall::PostEphemeral { .. } => ChatOp::PostEphemeral,
            ChatCall::ThreadReplies { .. } => ChatOp::ThreadReplies,
            ChatCall::ChannelHistory { .. } => ChatOp::ChannelHistory,
            ChatCall::JoinChannel { .. } => ChatOp::JoinChannel,
            ChatCall::StartStream { .. } => ChatOp::StartStream,
            ChatCall::AppendStream { .. } => ChatOp::AppendStream,
            ChatCall::StopStream { .. } => ChatOp::StopStream,
            ChatCall::SetThreadTitle { .. } => ChatOp::SetThreadTitle,
            ChatCall::SetStatus { .. } => ChatOp::SetStatus,
            ChatCall::SetSuggestedPrompts { .. } => ChatOp::SetSuggestedPrompts,
        }
    }
}

/// Recording test double for [`ChatApi`]
#[derive(Default)]
pub struct RecordingChatApi {
    calls: Mutex<Vec<ChatCall>>,
    failures: Mutex<HashMap<ChatOp, VecDeque<ChatError>>>,
    fail_append_at: Mutex<Option<usize>>,
    thread_replies: Mutex<Vec<HistoryMessage>>,
    channel_history: Mutex<Vec<HistoryMessage>>,
    next_ts: AtomicU64,
}

impl RecordingChatApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages returned by every `thread_replies` call
    pub fn with_thread_replies(self, messages: Vec<HistoryMessage>) -> Self {
        *self.thread_replies.lock().unwrap_or_else(|e| e.into_inner()) = messages;
        self
    }

    /// Messages returned by every `channel_history` call, newest first
    pub fn with_channel_history(self, messages: Vec<HistoryMessage>) -> Self {
        *self.channel_history.lock().unwrap_or_else(|e| e.into_inner()) = messages;
        self
    }

    /// The next `times` calls of `op` fail with `err`
    pub fn fail_times(self, op: ChatOp, times: usize, err: ChatError) -> Self {
        {
            let mut failures = self.failures.lock().unwrap_or_else(|e| e.into_inner());
            let queue = failures.entry(op).or_default();
            for _ in 0..times {
                queue.push_back(err.clone());
            }
        }
        self
    }

    /// The next `times` calls of `op` fail with not_in_channel for `channel`
    pub fn fail_not_in_channel(self, op: ChatOp, channel: &str, times: usize) -> Self {
        self.fail_times(
            op,
            times,
            ChatError::NotInChannel {
                channel: channel.to_string(),
            },
        )
    }

    /// The k-th append (1-based) fails with a transport error
    pub fn fail_append_at(self, k: usize) -> Self {
        *self.fail_append_at.lock().unwrap_or_else(|e| e.into_inner()) = Some(k);
        self
    }

    pub fn calls(&self) -> Vec<ChatCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn calls_of(&self, op: ChatOp) -> Vec<ChatCall> {
        self.calls().into_iter().filter(|c| c.op() == op).collect()
    }

    pub fn count(&self, op: ChatOp) -> usize {
        self.calls_of(op).len()
    }

    /// Ops in call order
    pub fn ops(&self) -> Vec<ChatOp> {
        self.calls().iter().map(ChatCall::op).collect()
    }

    /// Concatenation of every appended fragment that was accepted
    pub fn appended_text(&self) -> String {
        self.calls_of(ChatOp::AppendStream)
            .into_iter()
            .filter_map(|c| match c {
                ChatCall::AppendStream { markdown, .. } => Some(markdown),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: ChatCall) -> ChatResult<()> {
        let op = call.op();
        let position = {
            let mut calls = self.calls.lock().unwrap_or_else(|e| e.into_inner());
            calls.push(call);
            calls.iter().filter(|c| c.op() == op).count()
        };

        if op == ChatOp::AppendStream
            && *self.fail_append_at.lock().unwrap_or_else(|e| e.into_inner()) == Some(position)
        {
            return Err(ChatError::Transport(format!("append {} failed", position)));
        }

        let scripted = self
            .failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get_mut(&op)
            .and_then(VecDeque::pop_front);
        match scripted {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn next_ts(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, self.next_ts.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[async_trait]
impl ChatApi for RecordingChatApi {
    async fn post_message(
        &self,
        channel: &str,
        thread_ts: Option<&str>,
        text: &str,
    ) -> ChatResult<String> {
        self.record(ChatCall::PostMessage {
            channel: channel.to_string(),
            thread_ts: thread_ts.map(str::to_string),
            text: text.to_string(),
        })?;
        Ok(self.next_ts("msg"))
    }

    async fn post_ephemeral(
        &self,
        channel: &str,
        user: &str,
        thread_ts: Option<&str>,
        text: &str,
    ) -> ChatResult<()> {
        self.record(ChatCall::PostEphemeral {
            channel: channel.to_string(),
            user: user.to_string(),
            thread_ts: thread_ts.map(str::to_string),
            text: text.to_string(),
        })
    }

    async fn thread_replies(
        &self,
        channel: &str,
        thread_ts: &str,
    ) -> ChatResult<Vec<HistoryMessage>> {
        self.record(ChatCall::ThreadReplies {
            channel: channel.to_string(),
            thread_ts: thread_ts.to_string(),
        })?;
        Ok(self
            .thread_replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone())
    }

    async fn channel_history(&self, channel: &str, limit: u32) -> ChatResult<Vec<HistoryMessage>> {
        self.record(ChatCall::ChannelHistory {
            channel: channel.to_string(),
            limit,
        })?;
        Ok(self
            .channel_history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone())
    }

    async fn join_channel(&self, channel: &str) -> ChatResult<()> {
        self.record(ChatCall::JoinChannel {
            channel: channel.to_string(),
        })
    }

    async fn start_stream(&self, context: &ThreadContext) -> ChatResult<String> {
        self.record(ChatCall::StartStream {
            context: context.clone(),
        })?;
        Ok(self.next_ts("stream"))
    }

    async fn append_stream(
        &self,
        channel: &str,
        stream_ts: &str,
        markdown: &str,
    ) -> ChatResult<()> {
        self.record(ChatCall::AppendStream {
            channel: channel.to_string(),
            stream_ts: stream_ts.to_string(),
            markdown: markdown.to_string(),
        })
    }

    async fn stop_stream(&self, channel: &str, stream_ts: &str, blocks: &[Value]) -> ChatResult<()> {
        self.record(ChatCall::StopStream {
            channel: channel.to_string(),
            stream_ts: stream_ts.to_string(),
            blocks: blocks.to_vec(),
        })
    }

    async fn set_thread_title(
        &self,
        channel: &str,
        thread_ts: &str,
        title: &str,
    ) -> ChatResult<()> {
        self.record(ChatCall::SetThreadTitle {
            channel: channel.to_string(),
            thread_ts: thread_ts.to_string(),
            title: title.to_string(),
        })
    }

    async fn set_status(
        &self,
        channel: &str,
        thread_ts: &str,
        status: &str,
        loading_messages: &[String],
    ) -> ChatResult<()> {
        self.record(ChatCall::SetStatus {
            channel: channel.to_string(),
            thread_ts: thread_ts.to_string(),
            status: status.to_string(),
            loading_messages: loading_messages.to_vec(),
        })
    }

    async fn set_suggested_prompts(
        &self,
        channel: &str,
        thread_ts: &str,
        title: Option<&str>,
        prompts: &[SuggestedPrompt],
    ) -> ChatResult<()> {
        self.record(ChatCall::SetSuggestedPrompts {
            channel: channel.to_string(),
            thread_ts: thread_ts.to_string(),
            title: title.map(str::to_string),
            prompts: prompts.to_vec(),
        })
    }
}
