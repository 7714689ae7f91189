// ABOUTME: Core LlmBackend trait that all providers implement.
// ABOUTME: Uses BoxFuture/BoxStream for object safety and Send bounds.

use crate::error::LlmError;
use crate::event::LlmEvent;
use futures::future::BoxFuture;
use futures::stream::BoxStream;

/// One completion request: the assembled prompt plus the model to run it on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub model: String,
    pub input: String,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            input: input.into(),
        }
    }
}

/// Core trait that all LLM backends implement.
///
/// `stream` resolves once the provider has accepted the request. The returned
/// stream is lazy: each event is produced as the provider emits it, so callers
/// see the first delta before the last one exists.
pub trait LlmBackend: Send + Sync {
    /// Backend name for logging/debugging
    fn name(&self) -> &'static str;

    /// Start a streamed completion
    fn stream<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> BoxFuture<'a, Result<BoxStream<'static, LlmEvent>, LlmError>>;
}
