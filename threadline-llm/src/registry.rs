// ABOUTME: Name-to-factory table used to pick the LLM backend at startup.
// ABOUTME: Ships with the OpenAI streaming backend and the scripted mock for dry runs.

use crate::config::BackendConfig;
use crate::handle::LlmHandle;
use anyhow::{anyhow, Result};
use std::collections::HashMap;

/// Factory function that creates an LlmHandle from config
pub type BackendFactory = Box<dyn Fn(&BackendConfig) -> Result<LlmHandle> + Send + Sync>;

/// Backends selectable through `[llm] type`
pub struct LlmRegistry {
    factories: HashMap<String, BackendFactory>,
}

impl LlmRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    pub fn register<F>(mut self, name: &str, factory: F) -> Self
    where
        F: Fn(&BackendConfig) -> Result<LlmHandle> + Send + Sync + 'static,
    {
        self.factories
            .insert(name.to_ascii_lowercase(), Box::new(factory));
        self
    }

    /// Build the backend named by `config.backend_type`; names match case-insensitively
    pub fn create(&self, config: &BackendConfig) -> Result<LlmHandle> {
        let name = config.backend_type().trim().to_ascii_lowercase();
        match self.factories.get(&name) {
            Some(factory) => factory(config),
            None => Err(anyhow!(
                "Unknown LLM backend '{}' (available: {})",
                name,
                self.available().join(", ")
            )),
        }
    }

    pub fn available(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for LlmRegistry {
    fn default() -> Self {
        use crate::backends::mock::MockBackend;
        use crate::backends::openai::OpenAiBackend;

        Self::new()
            .register("openai", OpenAiBackend::factory())
            .register("mock", MockBackend::factory())
    }
}
