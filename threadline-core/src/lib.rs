// ABOUTME: Platform-agnostic orchestration for relaying chat threads to an LLM.
// ABOUTME: Prompt assembly, history fetch, response streaming, event routing, and feedback.

pub mod config;
pub mod context_store;
pub mod error;
pub mod events;
pub mod feedback;
pub mod history;
pub mod queue;
pub mod metrics;
pub mod paths;
pub mod prompt;
pub mod router;
pub mod streamer;
pub mod testing;
pub mod traits;

pub use config::Config;
pub use context_store::ContextStore;
pub use error::{ChatError, TurnError};
pub use events::InboundEvent;
pub use router::{Dispatched, Dispatcher};
pub use traits::{ChatApi, ChatResult, HistoryMessage, SuggestedPrompt, ThreadContext};
