// ABOUTME: Error types for chat platform calls and assistant turns.
// ABOUTME: ChatError comes from the platform client; TurnError is what a failed turn reports.

use threadline_llm::{ErrorCode, LlmError};

/// Failure from a chat platform call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    /// The bot is not a member of the channel it tried to read
    #[error("not_in_channel ({channel})")]
    NotInChannel { channel: String },

    /// The platform answered with `ok: false`
    #[error("{method} failed: {code}")]
    Api { method: String, code: String },

    /// The request never got a usable answer
    #[error("transport error: {0}")]
    Transport(String),
}

impl ChatError {
    pub fn api(method: impl Into<String>, code: impl Into<String>) -> Self {
        ChatError::Api {
            method: method.into(),
            code: code.into(),
        }
    }

    /// Map a platform error code, recognising not_in_channel when the channel is known
    pub fn from_platform_code(method: &str, code: &str, channel: Option<&str>) -> Self {
        match (code, channel) {
            ("not_in_channel", Some(channel)) => ChatError::NotInChannel {
                channel: channel.to_string(),
            },
            _ => ChatError::api(method, code),
        }
    }

    pub fn is_not_in_channel(&self) -> bool {
        matches!(self, ChatError::NotInChannel { .. })
    }
}

/// Why an assistant turn failed. The display text is what the user sees
/// after the apology prefix.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TurnError {
    /// Platform or LLM connectivity failure
    #[error("{0}")]
    Transport(String),

    /// Missing channel membership or scope that join-and-retry could not fix
    #[error("{0}")]
    Permission(String),

    /// The LLM refused or failed
    #[error("{0}")]
    Provider(String),
}

impl TurnError {
    /// Classify a mid-stream LLM error event
    pub fn from_llm_event(code: ErrorCode, message: &str) -> Self {
        match code {
            ErrorCode::Transport | ErrorCode::Timeout => TurnError::Transport(message.to_string()),
            _ => TurnError::Provider(message.to_string()),
        }
    }

    /// Short label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            TurnError::Transport(_) => "transport",
            TurnError::Permission(_) => "permission",
            TurnError::Provider(_) => "provider",
        }
    }
}

const PERMISSION_CODES: &[&str] = &[
    "missing_scope",
    "not_in_channel",
    "restricted_action",
    "not_allowed_token_type",
    "is_archived",
];

impl From<ChatError> for TurnError {
    fn from(err: ChatError) -> Self {
        match &err {
            ChatError::NotInChannel { .. } => TurnError::Permission(err.to_string()),
            ChatError::Api { code, .. } if PERMISSION_CODES.contains(&code.as_str()) => {
                TurnError::Permission(err.to_string())
            }
            ChatError::Api { .. } | ChatError::Transport(_) => {
                TurnError::Transport(err.to_string())
            }
        }
    }
}

impl From<LlmError> for TurnError {
    fn from(err: LlmError) -> Self {
        match err.code() {
            ErrorCode::Transport | ErrorCode::Timeout => TurnError::Transport(err.to_string()),
            _ => TurnError::Provider(err.to_string()),
        }
    }
}
