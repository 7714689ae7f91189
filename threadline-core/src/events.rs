// ABOUTME: Inbound chat events as one tagged enum, parsed from platform JSON.
// ABOUTME: Parsing is shape-only; relevance checks happen in the router.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Channel the user was looking at when they opened or moved an assistant thread
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelContext {
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub enterprise_id: Option<String>,
}

/// The assistant was mentioned in a channel
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MentionEvent {
    pub channel: String,
    #[serde(default)]
    pub text: String,
    pub ts: String,
    #[serde(default)]
    pub thread_ts: Option<String>,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
}

impl MentionEvent {
    /// The thread to answer in: the existing thread, or a new one rooted at this message
    pub fn reply_thread_ts(&self) -> &str {
        self.thread_ts.as_deref().unwrap_or(&self.ts)
    }
}

/// A message event, typically from an assistant container
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MessageEvent {
    pub channel: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub ts: Option<String>,
    #[serde(default)]
    pub thread_ts: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub bot_id: Option<String>,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub channel_type: Option<String>,
}

/// An assistant thread was opened, or its channel context changed
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AssistantThreadEvent {
    pub channel_id: String,
    pub thread_ts: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub context: ChannelContext,
}

/// One activated interactive component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionEvent {
    pub action_type: String,
    pub action_id: String,
    pub value: Option<String>,
    pub channel: String,
    pub message_ts: String,
    pub user: String,
    pub team: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Mention(MentionEvent),
    AssistantMessage(MessageEvent),
    ThreadStarted(AssistantThreadEvent),
    ThreadContextChanged(AssistantThreadEvent),
    Action(ActionEvent),
}

impl InboundEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            InboundEvent::Mention(_) => "mention",
            InboundEvent::AssistantMessage(_) => "assistant_message",
            InboundEvent::ThreadStarted(_) => "thread_started",
            InboundEvent::ThreadContextChanged(_) => "thread_context_changed",
            InboundEvent::Action(_) => "action",
        }
    }

    /// Channel and thread the event belongs to. Actions have none and are not ordered.
    pub fn thread_key(&self) -> Option<(String, String)> {
        match self {
            InboundEvent::Mention(mention) => Some((
                mention.channel.clone(),
                mention.reply_thread_ts().to_string(),
            )),
            InboundEvent::AssistantMessage(message) => message
                .thread_ts
                .clone()
                .map(|thread_ts| (message.channel.clone(), thread_ts)),
            InboundEvent::ThreadStarted(thread) | InboundEvent::ThreadContextChanged(thread) => {
                Some((thread.channel_id.clone(), thread.thread_ts.clone()))
            }
            InboundEvent::Action(_) => None,
        }
    }

    /// Parse the inner `event` object of an Events API callback.
    /// Returns None for event types nothing here handles or for malformed shapes.
    pub fn from_event_json(event: &Value) -> Option<Self> {
        let kind = event.get("type")?.as_str()?;
        let parsed = match kind {
            "app_mention" => InboundEvent::Mention(from_value(event)?),
            "message" => InboundEvent::AssistantMessage(from_value(event)?),
            "assistant_thread_started" => {
                InboundEvent::ThreadStarted(from_value(event.get("assistant_thread")?)?)
            }
            "assistant_thread_context_changed" => {
                InboundEvent::ThreadContextChanged(from_value(event.get("assistant_thread")?)?)
            }
            other => {
                tracing::trace!(event_type = other, "Ignoring unhandled event type");
                return None;
            }
        };
        Some(parsed)
    }

    /// Parse a `block_actions` interaction payload into one event per action
    pub fn from_interaction_json(payload: &Value) -> Vec<Self> {
        if payload.get("type").and_then(Value::as_str) != Some("block_actions") {
            return Vec::new();
        }

        let str_at = |pointer: &str| {
            payload
                .pointer(pointer)
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        let (Some(user), Some(channel)) = (
            str_at("/user/id"),
            str_at("/channel/id").or_else(|| str_at("/container/channel_id")),
        ) else {
            return Vec::new();
        };
        let Some(message_ts) = str_at("/message/ts").or_else(|| str_at("/container/message_ts"))
        else {
            return Vec::new();
        };
        let team = str_at("/team/id").or_else(|| str_at("/user/team_id"));

        payload
            .get("actions")
            .and_then(Value::as_array)
            .map(|actions| {
                actions
                    .iter()
                    .filter_map(|action| {
                        Some(InboundEvent::Action(ActionEvent {
                            action_type: action.get("type")?.as_str()?.to_string(),
                            action_id: action.get("action_id")?.as_str()?.to_string(),
                            value: action
                                .get("value")
                                .and_then(Value::as_str)
                                .map(str::to_string),
                            channel: channel.clone(),
                            message_ts: message_ts.clone(),
                            user: user.clone(),
                            team: team.clone(),
                        }))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn from_value<T: serde::de::DeserializeOwned>(value: &Value) -> Option<T> {
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::debug!(error = %e, "Malformed inbound event");
            None
        }
    }
}
