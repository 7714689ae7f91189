// ABOUTME: Backend configuration for threadline-llm.
// ABOUTME: Deserialized from the [llm] table of the application config.

use serde::{Deserialize, Serialize};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Backend configuration with type discriminator
#[derive(Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Backend type: "openai" or "mock"
    #[serde(rename = "type", default = "default_backend_type")]
    pub backend_type: String,

    /// Model identifier sent with every request
    #[serde(default = "default_model")]
    pub model: String,

    /// Provider API key; absent keys fail each call with an auth error
    #[serde(default)]
    pub api_key: Option<String>,

    /// Provider base URL (no trailing slash)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Seconds allowed to establish the connection to the provider. Streams are
    /// long-lived, so there is no limit on the response itself.
    #[serde(
        default = "default_connect_timeout_secs",
        alias = "request_timeout_secs"
    )]
    pub connect_timeout_secs: u64,
}

fn default_backend_type() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_base_url() -> String {
    DEFAULT_OPENAI_BASE_URL.to_string()
}

fn default_connect_timeout_secs() -> u64 {
    60
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            backend_type: default_backend_type(),
            model: default_model(),
            api_key: None,
            base_url: default_base_url(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl BackendConfig {
    pub fn backend_type(&self) -> &str {
        &self.backend_type
    }

    /// API key with empty strings treated as unset
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("backend_type", &self.backend_type)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}
