// ABOUTME: Mock backend for testing and dry runs - streams pre-configured events.
// ABOUTME: Allows deterministic tests without calling a real provider.
//!
//! # Example
//!
//! ```no_run
//! use threadline_llm::backends::mock::MockBackend;
//! use threadline_llm::{CompletionRequest, ErrorCode, LlmEvent};
//!
//! # async fn example() {
//! let mock = MockBackend::new()
//!     .on_prompt("hello").respond_deltas(&["Hi ", "there!"])
//!     .on_prompt("explode").respond_deltas_then_error(&["Par"], ErrorCode::ProviderError, "boom");
//!
//! let handle = mock.clone().into_handle();
//! let request = CompletionRequest::new("gpt-4o-mini", "User: hello");
//! let mut receiver = handle.stream(&request).await.unwrap();
//!
//! assert_eq!(receiver.recv().await, Some(LlmEvent::TextDelta("Hi ".to_string())));
//! assert_eq!(mock.prompts().len(), 1);
//! # }
//! ```

use crate::error::LlmError;
use crate::event::{ErrorCode, LlmEvent};
use crate::handle::LlmHandle;
use crate::registry::BackendFactory;
use crate::traits::{CompletionRequest, LlmBackend};
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Mock backend for testing. Clones share expectations and the prompt log, so a
/// test can keep one clone for assertions after handing another to the handle.
#[derive(Clone)]
pub struct MockBackend {
    expectations: Arc<Mutex<VecDeque<Expectation>>>,
    prompts: Arc<Mutex<Vec<CompletionRequest>>>,
}

enum Reply {
    Events(Vec<LlmEvent>),
    SetupError(LlmError),
}

struct Expectation {
    pattern: String,
    reply: Reply,
}

impl MockBackend {
    /// Create a new mock backend with no expectations
    pub fn new() -> Self {
        Self {
            expectations: Arc::new(Mutex::new(VecDeque::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Set up an expectation for a prompt containing the given pattern
    pub fn on_prompt(self, pattern: &str) -> ExpectationBuilder {
        ExpectationBuilder {
            backend: self,
            pattern: pattern.to_string(),
        }
    }

    /// Every request received so far, in order
    pub fn prompts(&self) -> Vec<CompletionRequest> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Convert this backend into an LlmHandle
    pub fn into_handle(self) -> LlmHandle {
        LlmHandle::new(self)
    }

    /// Factory function for the registry
    pub fn factory() -> BackendFactory {
        Box::new(|_config| Ok(MockBackend::new().into_handle()))
    }

    fn push(&self, expectation: Expectation) {
        self.expectations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(expectation);
    }

    /// Match with FIFO preference: the front expectation wins if it matches,
    /// otherwise the first matching one anywhere in the queue.
    fn take_reply(&self, input: &str) -> Option<Reply> {
        let mut exp = self.expectations.lock().unwrap_or_else(|e| e.into_inner());
        let index = if exp.front().is_some_and(|e| input.contains(&e.pattern)) {
            Some(0)
        } else {
            exp.iter().position(|e| input.contains(&e.pattern))
        };
        index.and_then(|i| exp.remove(i)).map(|e| e.reply)
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl LlmBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn stream<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> BoxFuture<'a, Result<BoxStream<'static, LlmEvent>, LlmError>> {
        Box::pin(async move {
            self.prompts
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(request.clone());

            let events = match self.take_reply(&request.input) {
                Some(Reply::Events(events)) => events,
                Some(Reply::SetupError(err)) => return Err(err),
                None => {
                    let latest = request.input.lines().last().unwrap_or_default();
                    vec![
                        LlmEvent::TextDelta(format!("Mock: no expectation for '{}'", latest)),
                        LlmEvent::Completed { usage: None },
                    ]
                }
            };
            Ok(futures::stream::iter(events).boxed())
        })
    }
}

/// Builder for setting up mock expectations with a fluent API
pub struct ExpectationBuilder {
    backend: MockBackend,
    pattern: String,
}

impl ExpectationBuilder {
    /// Stream exactly these events
    pub fn respond_with(self, events: Vec<LlmEvent>) -> MockBackend {
        self.finish(Reply::Events(events))
    }

    /// Stream each fragment as a delta, then a completion marker
    pub fn respond_deltas(self, deltas: &[&str]) -> MockBackend {
        let mut events: Vec<LlmEvent> = deltas
            .iter()
            .map(|d| LlmEvent::TextDelta(d.to_string()))
            .collect();
        events.push(LlmEvent::Completed { usage: None });
        self.respond_with(events)
    }

    /// Stream the fragments, then fail mid-stream
    pub fn respond_deltas_then_error(
        self,
        deltas: &[&str],
        code: ErrorCode,
        message: &str,
    ) -> MockBackend {
        let mut events: Vec<LlmEvent> = deltas
            .iter()
            .map(|d| LlmEvent::TextDelta(d.to_string()))
            .collect();
        events.push(LlmEvent::Error {
            code,
            message: message.to_string(),
        });
        self.respond_with(events)
    }

    /// Fail before any event is produced
    pub fn fail_setup(self, err: LlmError) -> MockBackend {
        self.finish(Reply::SetupError(err))
    }

    fn finish(self, reply: Reply) -> MockBackend {
        self.backend.push(Expectation {
            pattern: self.pattern,
            reply,
        });
        self.backend
    }
}
