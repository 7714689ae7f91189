// ABOUTME: Routes inbound chat events to the turn, thread-setup, and feedback flows.
// ABOUTME: Runs each assistant turn through Thinking, Streaming, then Finalized or Errored.

use crate::config::AssistantConfig;
use crate::context_store::ContextStore;
use crate::error::TurnError;
use crate::events::{ActionEvent, AssistantThreadEvent, InboundEvent, MentionEvent, MessageEvent};
use crate::feedback::{self, FeedbackRecord, Rating, FEEDBACK_ACTION_ID, FEEDBACK_ELEMENT_TYPE};
use crate::history;
use crate::queue::ThreadQueues;
use crate::metrics;
use crate::prompt::{self, ConversationTurn};
use crate::streamer::ResponseStreamer;
use crate::traits::{ChatApi, ChatResult, ThreadContext};
use std::sync::Arc;
use tokio::sync::oneshot;
use threadline_llm::{CompletionRequest, EventReceiver, LlmHandle};
use tracing::Instrument;

/// Prefix of the plain-text message posted when a turn fails
pub const ERROR_PREFIX: &str = "Sorry, something went wrong!";

/// Lifecycle of one assistant turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    /// Status indicator shown, input being prepared
    Thinking,
    /// Stream session open, deltas being relayed
    Streaming,
    /// Stream closed with the feedback control attached
    Finalized,
    /// User told something went wrong
    Errored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub state: TurnState,
    pub deltas: usize,
    pub chars: usize,
    pub error: Option<TurnError>,
}

/// What handling an event amounted to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    Turn(TurnOutcome),
    ThreadStarted,
    ContextSaved,
    Feedback(Rating),
    /// Irrelevant or malformed event, silently ignored
    Skipped(&'static str),
}

/// Where a turn's prompt comes from
#[derive(Debug, Clone)]
enum PromptSource {
    /// Just the triggering text
    Direct(String),
    /// Thread history followed by the latest question
    Thread {
        latest: String,
        trigger_ts: Option<String>,
    },
    /// Recent activity of another channel
    ChannelSummary { channel: String },
}

pub struct Dispatcher {
    chat: Arc<dyn ChatApi>,
    llm: LlmHandle,
    model: String,
    streamer: ResponseStreamer,
    assistant: AssistantConfig,
    contexts: ContextStore,
    queues: ThreadQueues,
    bot_user_id: Option<String>,
}

impl Dispatcher {
    pub fn new(
        chat: Arc<dyn ChatApi>,
        llm: LlmHandle,
        model: impl Into<String>,
        assistant: AssistantConfig,
    ) -> Self {
        let streamer = ResponseStreamer::new(Arc::clone(&chat), assistant.min_append_chars);
        let contexts = ContextStore::with_capacity(assistant.max_thread_contexts);
        Self {
            chat,
            llm,
            model: model.into(),
            streamer,
            assistant,
            contexts,
            queues: ThreadQueues::new(),
            bot_user_id: None,
        }
    }

    /// Messages from this user id are never answered
    pub fn with_bot_user_id(mut self, bot_user_id: impl Into<String>) -> Self {
        self.bot_user_id = Some(bot_user_id.into());
        self
    }

    pub fn with_context_store(mut self, contexts: ContextStore) -> Self {
        self.contexts = contexts;
        self
    }

    pub fn contexts(&self) -> &ContextStore {
        &self.contexts
    }

    /// Queue the event and return at once so the caller can acknowledge delivery.
    ///
    /// Events of one thread are handled one at a time in the order they were
    /// accepted; events without a thread run on their own task. The receiver
    /// yields the result and may be dropped.
    pub fn accept(self: &Arc<Self>, event: InboundEvent) -> oneshot::Receiver<Dispatched> {
        let (tx, rx) = oneshot::channel();
        let key = event.thread_key();
        let dispatcher = Arc::clone(self);
        let job = async move {
            let _ = tx.send(dispatcher.dispatch(event).await);
        };
        match key {
            Some(key) => self.queues.enqueue(key, job),
            None => {
                tokio::spawn(job);
            }
        }
        rx
    }

    /// Handle one event on the caller's task, outside the per-thread queue
    pub async fn dispatch(&self, event: InboundEvent) -> Dispatched {
        let kind = event.kind();
        let dispatched = match event {
            InboundEvent::Mention(mention) => self.on_mention(mention).await,
            InboundEvent::AssistantMessage(message) => self.on_assistant_message(message).await,
            InboundEvent::ThreadStarted(thread) => self.on_thread_started(thread).await,
            InboundEvent::ThreadContextChanged(thread) => self.on_context_changed(thread),
            InboundEvent::Action(action) => self.on_action(action).await,
        };
        if let Dispatched::Skipped(reason) = &dispatched {
            tracing::debug!(kind, reason = *reason, "Skipped inbound event");
            metrics::record_skipped(*reason);
        }
        dispatched
    }

    fn is_self(&self, user: Option<&str>) -> bool {
        matches!((user, self.bot_user_id.as_deref()), (Some(u), Some(me)) if u == me)
    }

    // =========================================================================
    // Event handlers
    // =========================================================================

    async fn on_mention(&self, mention: MentionEvent) -> Dispatched {
        let Some(user) = mention.user.clone() else {
            return Dispatched::Skipped("mention without user");
        };
        if self.is_self(Some(&user)) {
            return Dispatched::Skipped("own message");
        }

        let context = ThreadContext::new(
            mention.channel.clone(),
            mention.reply_thread_ts(),
            mention.team.clone(),
            user,
        );
        let source = if mention.thread_ts.is_some() {
            PromptSource::Thread {
                latest: mention.text,
                trigger_ts: Some(mention.ts),
            }
        } else {
            PromptSource::Direct(mention.text)
        };

        Dispatched::Turn(self.run_turn("mention", context, source, None).await)
    }

    async fn on_assistant_message(&self, message: MessageEvent) -> Dispatched {
        if message.subtype.is_some() {
            return Dispatched::Skipped("message subtype");
        }
        if message.bot_id.is_some() || self.is_self(message.user.as_deref()) {
            return Dispatched::Skipped("own message");
        }
        if message.channel_type.as_deref() != Some("im") {
            return Dispatched::Skipped("not an assistant container");
        }
        let Some(user) = message.user else {
            return Dispatched::Skipped("message without user");
        };
        let Some(text) = message.text.filter(|t| !t.trim().is_empty()) else {
            return Dispatched::Skipped("message without text");
        };
        let Some(thread_ts) = message.thread_ts else {
            return Dispatched::Skipped("message outside a thread");
        };

        let stored_channel = self
            .contexts
            .get(&message.channel, &thread_ts)
            .and_then(|c| c.channel_id);
        let source = match stored_channel {
            Some(channel) if text == self.assistant.summarize_prompt => {
                PromptSource::ChannelSummary { channel }
            }
            _ => PromptSource::Thread {
                latest: text.clone(),
                trigger_ts: message.ts,
            },
        };

        let context = ThreadContext::new(message.channel, thread_ts, message.team, user);
        Dispatched::Turn(
            self.run_turn("assistant_message", context, source, Some(&text))
                .await,
        )
    }

    async fn on_thread_started(&self, thread: AssistantThreadEvent) -> Dispatched {
        let channel = thread.channel_id.as_str();
        let thread_ts = thread.thread_ts.as_str();

        if let Err(e) = self
            .chat
            .post_message(channel, Some(thread_ts), &self.assistant.greeting)
            .await
        {
            tracing::error!(error = %e, channel, thread_ts, "Failed to greet new assistant thread");
        }

        self.contexts.save(channel, thread_ts, thread.context.clone());

        if !self.assistant.suggested_prompts.is_empty() {
            if let Err(e) = self
                .chat
                .set_suggested_prompts(
                    channel,
                    thread_ts,
                    self.assistant.suggested_prompts_title.as_deref(),
                    &self.assistant.suggested_prompts,
                )
                .await
            {
                tracing::error!(error = %e, channel, thread_ts, "Failed to set suggested prompts");
            }
        }

        tracing::info!(channel, thread_ts, user = ?thread.user_id, "Assistant thread started");
        Dispatched::ThreadStarted
    }

    fn on_context_changed(&self, thread: AssistantThreadEvent) -> Dispatched {
        tracing::debug!(
            channel = %thread.channel_id,
            thread_ts = %thread.thread_ts,
            context_channel = ?thread.context.channel_id,
            "Assistant thread context changed"
        );
        self.contexts
            .save(&thread.channel_id, &thread.thread_ts, thread.context);
        Dispatched::ContextSaved
    }

    async fn on_action(&self, action: ActionEvent) -> Dispatched {
        match action.action_id.as_str() {
            FEEDBACK_ACTION_ID => {
                if action.action_type != FEEDBACK_ELEMENT_TYPE {
                    return Dispatched::Skipped("not a feedback control");
                }
                let Some(value) = action.value else {
                    return Dispatched::Skipped("feedback without value");
                };
                let record = FeedbackRecord {
                    message_ts: action.message_ts,
                    channel_id: action.channel,
                    user_id: action.user,
                    rating: Rating::from_value(&value),
                };
                feedback::acknowledge(self.chat.as_ref(), &record).await;
                Dispatched::Feedback(record.rating)
            }
            _ => Dispatched::Skipped("unknown action"),
        }
    }

    // =========================================================================
    // Assistant turn
    // =========================================================================

    async fn run_turn(
        &self,
        kind: &'static str,
        context: ThreadContext,
        source: PromptSource,
        title: Option<&str>,
    ) -> TurnOutcome {
        let turn_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!(
            "turn",
            %turn_id,
            kind,
            channel = %context.channel_id,
            thread_ts = %context.thread_ts
        );

        async move {
            tracing::info!(user = %context.user_id, "Turn started");

            if let Some(title) = title {
                best_effort(
                    "set thread title",
                    self.chat
                        .set_thread_title(&context.channel_id, &context.thread_ts, title)
                        .await,
                );
            }

            let mut state = transition(TurnState::Idle, TurnState::Thinking);
            best_effort(
                "set status",
                self.chat
                    .set_status(
                        &context.channel_id,
                        &context.thread_ts,
                        &self.assistant.status_text,
                        &self.assistant.loading_messages,
                    )
                    .await,
            );

            let mut outcome = TurnOutcome {
                state,
                deltas: 0,
                chars: 0,
                error: None,
            };

            match self.start_completion(&context, &source).await {
                Ok(events) => {
                    state = transition(state, TurnState::Streaming);
                    let report = self
                        .streamer
                        .relay(&context, events, &[feedback::feedback_block()])
                        .await;
                    outcome.deltas = report.deltas;
                    outcome.chars = report.chars;
                    outcome.error = report.error;
                }
                Err(e) => outcome.error = Some(e),
            }

            outcome.state = match &outcome.error {
                None => transition(state, TurnState::Finalized),
                Some(err) => {
                    let errored = transition(state, TurnState::Errored);
                    self.notify_error(&context, err).await;
                    errored
                }
            };

            let label = if outcome.error.is_none() { "finalized" } else { "errored" };
            metrics::record_turn(kind, label);
            tracing::info!(
                deltas = outcome.deltas,
                chars = outcome.chars,
                outcome = label,
                "Turn finished"
            );
            outcome
        }
        .instrument(span)
        .await
    }

    /// Fetch whatever history the prompt needs and open the LLM stream
    async fn start_completion(
        &self,
        context: &ThreadContext,
        source: &PromptSource,
    ) -> Result<EventReceiver, TurnError> {
        let chat = self.chat.as_ref();
        let turns = match source {
            PromptSource::Direct(text) => vec![ConversationTurn::user(text.clone())],
            PromptSource::Thread { latest, trigger_ts } => {
                let history =
                    history::fetch_thread(chat, &context.channel_id, &context.thread_ts).await?;
                prompt::thread_turns(&history, trigger_ts.as_deref(), latest)
            }
            PromptSource::ChannelSummary { channel } => {
                let messages =
                    history::fetch_channel(chat, channel, self.assistant.channel_history_limit)
                        .await?;
                vec![ConversationTurn::user(prompt::channel_summary_request(
                    channel, &messages,
                ))]
            }
        };

        let input = prompt::assemble(&self.assistant.system_prompt, &turns);
        let request = CompletionRequest::new(self.model.clone(), input);
        Ok(self.llm.stream(&request).await?)
    }

    async fn notify_error(&self, context: &ThreadContext, err: &TurnError) {
        tracing::error!(error = %err, kind = err.kind(), "Turn failed");
        let text = format!("{} {}", ERROR_PREFIX, err);
        if let Err(e) = self
            .chat
            .post_message(&context.channel_id, Some(&context.thread_ts), &text)
            .await
        {
            tracing::error!(error = %e, "Failed to tell the user about the failed turn");
        }
    }
}

fn transition(from: TurnState, to: TurnState) -> TurnState {
    tracing::debug!(from = ?from, to = ?to, "Turn state");
    to
}

/// Log and drop a failure that must not stop the turn
fn best_effort(what: &'static str, result: ChatResult<()>) {
    if let Err(e) = result {
        tracing::debug!(error = %e, "Failed to {}", what);
    }
}
