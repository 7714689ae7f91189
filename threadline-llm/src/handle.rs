// ABOUTME: Cloneable handle over a shared LLM backend plus the event receiver it hands out.
// ABOUTME: The receiver stops yielding after the first terminal event.

use crate::error::LlmError;
use crate::event::LlmEvent;
use crate::traits::{CompletionRequest, LlmBackend};
use futures::stream::BoxStream;
use futures::StreamExt;
use std::sync::Arc;

/// Handle for talking to an LLM backend. Cheap to clone and safe to share
/// across concurrent turns.
#[derive(Clone)]
pub struct LlmHandle {
    backend: Arc<dyn LlmBackend>,
}

impl LlmHandle {
    pub fn new<B: LlmBackend + 'static>(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    pub fn from_arc(backend: Arc<dyn LlmBackend>) -> Self {
        Self { backend }
    }

    pub fn name(&self) -> &'static str {
        self.backend.name()
    }

    /// Submit a prompt and get a receiver for the streamed events
    pub async fn stream(&self, request: &CompletionRequest) -> Result<EventReceiver, LlmError> {
        tracing::debug!(
            backend = self.name(),
            model = %request.model,
            prompt_len = request.input.len(),
            "Starting completion stream"
        );
        let stream = self.backend.stream(request).await?;
        Ok(EventReceiver::new(stream))
    }
}

impl std::fmt::Debug for LlmHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmHandle")
            .field("backend", &self.backend.name())
            .finish()
    }
}

/// Receiver for events from a single completion
pub struct EventReceiver {
    inner: BoxStream<'static, LlmEvent>,
    finished: bool,
}

impl EventReceiver {
    pub fn new(inner: BoxStream<'static, LlmEvent>) -> Self {
        Self {
            inner,
            finished: false,
        }
    }

    /// Build a receiver over a fixed list of events
    pub fn from_events(events: Vec<LlmEvent>) -> Self {
        Self::new(futures::stream::iter(events).boxed())
    }

    /// Receive the next event. Returns None once the stream is exhausted or a
    /// terminal event has already been delivered.
    pub async fn recv(&mut self) -> Option<LlmEvent> {
        if self.finished {
            return None;
        }
        match self.inner.next().await {
            Some(event) => {
                if event.is_terminal() {
                    self.finished = true;
                }
                Some(event)
            }
            None => {
                self.finished = true;
                None
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}
