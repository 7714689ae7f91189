// ABOUTME: Relays LLM deltas into a live chat message and closes it exactly once.
// ABOUTME: StreamSession is consumed by finalize, so a session cannot be finalized twice.

use crate::error::TurnError;
use crate::metrics;
use crate::traits::{ChatApi, ChatResult, ThreadContext};
use serde_json::Value;
use std::sync::Arc;
use threadline_llm::{EventReceiver, LlmEvent};

/// One live message being filled from a single LLM stream
#[derive(Debug)]
pub struct StreamSession {
    context: ThreadContext,
    stream_ts: String,
    accumulated_len: usize,
    appends: usize,
    pending: String,
    closed: bool,
}

impl StreamSession {
    pub fn context(&self) -> &ThreadContext {
        &self.context
    }

    pub fn stream_ts(&self) -> &str {
        &self.stream_ts
    }

    /// Characters accepted so far, including any not yet flushed
    pub fn accumulated_len(&self) -> usize {
        self.accumulated_len
    }

    /// Number of append calls that reached the platform
    pub fn appends(&self) -> usize {
        self.appends
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        if !self.closed {
            tracing::warn!(
                channel = %self.context.channel_id,
                stream_ts = %self.stream_ts,
                "Stream session dropped without being finalized"
            );
        }
    }
}

/// What a relay produced
#[derive(Debug, Default)]
pub struct RelayReport {
    /// Delta events received, empty ones included
    pub deltas: usize,
    /// Characters relayed
    pub chars: usize,
    /// Non-delta events that were skipped
    pub ignored: usize,
    /// Whether a session was opened (and therefore finalized)
    pub opened: bool,
    /// First failure, if any
    pub error: Option<TurnError>,
}

#[derive(Clone)]
pub struct ResponseStreamer {
    chat: Arc<dyn ChatApi>,
    min_append_chars: usize,
}

impl ResponseStreamer {
    /// `min_append_chars` of 0 sends every fragment as soon as it arrives
    pub fn new(chat: Arc<dyn ChatApi>, min_append_chars: usize) -> Self {
        Self {
            chat,
            min_append_chars,
        }
    }

    /// Create the live message. Nothing can be appended before this returns.
    pub async fn open(&self, context: &ThreadContext) -> ChatResult<StreamSession> {
        let stream_ts = self.chat.start_stream(context).await?;
        tracing::debug!(
            channel = %context.channel_id,
            thread_ts = %context.thread_ts,
            stream_ts = %stream_ts,
            "Opened stream session"
        );
        Ok(StreamSession {
            context: context.clone(),
            stream_ts,
            accumulated_len: 0,
            appends: 0,
            pending: String::new(),
            closed: false,
        })
    }

    /// Add a fragment. Sent once the buffered text reaches the threshold.
    pub async fn append(&self, session: &mut StreamSession, fragment: &str) -> ChatResult<()> {
        if fragment.is_empty() {
            return Ok(());
        }
        session.pending.push_str(fragment);
        session.accumulated_len += fragment.chars().count();
        if session.pending.chars().count() >= self.min_append_chars {
            self.flush(session).await?;
        }
        Ok(())
    }

    async fn flush(&self, session: &mut StreamSession) -> ChatResult<()> {
        if session.pending.is_empty() {
            return Ok(());
        }
        let text = std::mem::take(&mut session.pending);
        self.chat
            .append_stream(&session.context.channel_id, &session.stream_ts, &text)
            .await?;
        session.appends += 1;
        Ok(())
    }

    /// Flush what is buffered and close the message with `attachments`.
    /// The close is attempted even if the flush fails; the first error wins.
    pub async fn finalize(&self, mut session: StreamSession, attachments: &[Value]) -> ChatResult<()> {
        session.closed = true;
        let flushed = self.flush(&mut session).await;
        let stopped = self
            .chat
            .stop_stream(&session.context.channel_id, &session.stream_ts, attachments)
            .await;
        tracing::debug!(
            channel = %session.context.channel_id,
            stream_ts = %session.stream_ts,
            chars = session.accumulated_len,
            appends = session.appends,
            "Finalized stream session"
        );
        flushed.and(stopped)
    }

    /// Open a session, relay every text delta from `events` in arrival order, and
    /// finalize. Attachments are only added when the stream finished cleanly.
    pub async fn relay(
        &self,
        context: &ThreadContext,
        mut events: EventReceiver,
        attachments: &[Value],
    ) -> RelayReport {
        let mut report = RelayReport::default();

        let mut session = match self.open(context).await {
            Ok(session) => session,
            Err(e) => {
                report.error = Some(e.into());
                return report;
            }
        };
        report.opened = true;

        while let Some(event) = events.recv().await {
            match event {
                LlmEvent::TextDelta(text) => {
                    report.deltas += 1;
                    if let Err(e) = self.append(&mut session, &text).await {
                        report.error = Some(e.into());
                        break;
                    }
                    report.chars += text.chars().count();
                }
                LlmEvent::Error { code, message } => {
                    tracing::warn!(code = code.as_str(), %message, "LLM stream failed");
                    report.error = Some(TurnError::from_llm_event(code, &message));
                    break;
                }
                LlmEvent::Completed { usage } => {
                    if let Some(usage) = usage {
                        tracing::debug!(
                            input_tokens = usage.input_tokens,
                            output_tokens = usage.output_tokens,
                            "LLM stream completed"
                        );
                    }
                }
                LlmEvent::Other { kind } => {
                    tracing::trace!(%kind, "Ignoring non-delta event");
                    report.ignored += 1;
                }
            }
        }
        metrics::record_deltas(report.deltas as u64);

        let blocks: &[Value] = if report.error.is_none() { attachments } else { &[] };
        if let Err(e) = self.finalize(session, blocks).await {
            match report.error {
                None => report.error = Some(e.into()),
                Some(_) => tracing::warn!(error = %e, "Failed to finalize errored stream"),
            }
        }

        report
    }
}
