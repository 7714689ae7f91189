// ABOUTME: Errors raised before an LLM stream starts producing events.
// ABOUTME: Mid-stream failures arrive as LlmEvent::Error instead.

use crate::event::ErrorCode;

#[derive(Debug, Clone, thiserror::Error)]
pub enum LlmError {
    #[error("no API key configured for the {backend} backend")]
    MissingApiKey { backend: &'static str },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider returned {status}: {message}")]
    Provider { status: u16, message: String },

    #[error("{message}")]
    Backend { code: ErrorCode, message: String },
}

impl LlmError {
    pub fn code(&self) -> ErrorCode {
        match self {
            LlmError::MissingApiKey { .. } => ErrorCode::AuthFailed,
            LlmError::Transport(_) => ErrorCode::Transport,
            LlmError::Provider { status, .. } => ErrorCode::from_status(*status),
            LlmError::Backend { code, .. } => *code,
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Backend {
                code: ErrorCode::Timeout,
                message: err.to_string(),
            }
        } else {
            LlmError::Transport(err.to_string())
        }
    }
}
