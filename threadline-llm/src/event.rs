// ABOUTME: Event types emitted by LLM backends while a completion streams.
// ABOUTME: Text deltas, completion, typed errors, and a passthrough for unrecognized kinds.

use serde::{Deserialize, Serialize};

/// Kind string for incremental text output.
pub const KIND_TEXT_DELTA: &str = "response.output_text.delta";
/// Kind string for the provider's completion signal.
pub const KIND_COMPLETED: &str = "response.completed";
/// Kind string for provider-reported failures.
pub const KIND_ERROR: &str = "error";

/// Events emitted by LLM backends during a streamed completion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum LlmEvent {
    /// Incremental text to append to the reply
    TextDelta(String),

    /// Provider signalled the end of the response
    Completed {
        /// Token usage (if the provider reported it)
        usage: Option<Usage>,
    },

    /// Error reported by the provider or the transport mid-stream
    Error {
        /// Typed error code for programmatic handling
        code: ErrorCode,
        /// Human-readable error message
        message: String,
    },

    /// Any other event kind; carried so callers can log it, never rendered
    Other {
        /// Event kind as reported by the provider
        kind: String,
    },
}

impl LlmEvent {
    /// The provider-level kind string for this event
    pub fn kind(&self) -> &str {
        match self {
            LlmEvent::TextDelta(_) => KIND_TEXT_DELTA,
            LlmEvent::Completed { .. } => KIND_COMPLETED,
            LlmEvent::Error { .. } => KIND_ERROR,
            LlmEvent::Other { kind } => kind,
        }
    }

    /// Delta text, present only for text delta events
    pub fn delta(&self) -> Option<&str> {
        match self {
            LlmEvent::TextDelta(text) => Some(text),
            _ => None,
        }
    }

    /// True once nothing further will follow this event
    pub fn is_terminal(&self) -> bool {
        matches!(self, LlmEvent::Completed { .. } | LlmEvent::Error { .. })
    }
}

/// Typed error codes for programmatic handling
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorCode {
    /// Request timed out
    Timeout,
    /// Rate limited by the provider
    RateLimited,
    /// Missing or rejected credentials
    AuthFailed,
    /// Connection dropped or body could not be read
    Transport,
    /// Provider-specific failure
    ProviderError,
    /// Unknown error
    Unknown,
}

impl ErrorCode {
    /// Map an HTTP status from the provider to an error code
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => ErrorCode::AuthFailed,
            408 | 504 => ErrorCode::Timeout,
            429 => ErrorCode::RateLimited,
            400..=599 => ErrorCode::ProviderError,
            _ => ErrorCode::Unknown,
        }
    }

    /// Stable snake_case label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Timeout => "timeout",
            ErrorCode::RateLimited => "rate_limited",
            ErrorCode::AuthFailed => "auth_failed",
            ErrorCode::Transport => "transport",
            ErrorCode::ProviderError => "provider_error",
            ErrorCode::Unknown => "unknown",
        }
    }
}

/// Token usage reported at completion
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Usage {
    /// Input tokens consumed
    pub input_tokens: u64,
    /// Output tokens generated
    pub output_tokens: u64,
}
