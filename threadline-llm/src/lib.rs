// ABOUTME: Streaming LLM backend abstraction for threadline.
// ABOUTME: Provides trait-based backends (OpenAI Responses, mock) behind a cloneable handle.

pub mod config;
pub mod error;
pub mod event;
pub mod handle;
pub mod registry;
pub mod traits;

pub mod backends;

pub use config::BackendConfig;
pub use error::LlmError;
pub use event::{ErrorCode, LlmEvent, Usage};
pub use handle::{EventReceiver, LlmHandle};
pub use registry::{BackendFactory, LlmRegistry};
pub use traits::{CompletionRequest, LlmBackend};
