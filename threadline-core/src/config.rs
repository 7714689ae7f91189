// ABOUTME: Configuration parsing from TOML file with environment variable overrides
// ABOUTME: Validates required Slack credentials and provides defaults for everything else
use crate::paths;
use crate::prompt::DEFAULT_SYSTEM_CONTENT;
use crate::traits::SuggestedPrompt;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use threadline_llm::BackendConfig;

pub const DEFAULT_SLACK_API_URL: &str = "https://slack.com/api";
pub const SUMMARIZE_CHANNEL_PROMPT: &str =
    "Assistant, please summarize the activity in this channel!";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub slack: SlackConfig,
    #[serde(default)]
    pub llm: BackendConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

// ─── SlackConfig ────────────────────────────────────────────────

#[derive(Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub app_token: String,
    /// Recorded only; events arrive over Socket Mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signing_secret: Option<String>,
    #[serde(default = "default_slack_api_url")]
    pub api_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installation_dir: Option<String>,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            app_token: String::new(),
            signing_secret: None,
            api_url: default_slack_api_url(),
            installation_dir: None,
        }
    }
}

// Custom Debug impl to redact app_token, bot_token, signing_secret
impl std::fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackConfig")
            .field("bot_token", &"[REDACTED]")
            .field("app_token", &"[REDACTED]")
            .field(
                "signing_secret",
                &self.signing_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("api_url", &self.api_url)
            .field("installation_dir", &self.installation_dir)
            .finish()
    }
}

// ─── AssistantConfig ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    #[serde(default = "default_status_text")]
    pub status_text: String,
    #[serde(default = "default_loading_messages")]
    pub loading_messages: Vec<String>,
    #[serde(default = "default_greeting")]
    pub greeting: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_prompts_title: Option<String>,
    #[serde(default = "default_suggested_prompts")]
    pub suggested_prompts: Vec<SuggestedPrompt>,
    /// Assistant message text that switches a turn to the channel summary flow
    #[serde(default = "default_summarize_prompt")]
    pub summarize_prompt: String,
    #[serde(default = "default_channel_history_limit")]
    pub channel_history_limit: u32,
    /// Buffer deltas until this many characters are pending; 0 sends each one immediately
    #[serde(default)]
    pub min_append_chars: usize,
    /// Assistant threads whose channel context is remembered; the oldest is dropped first
    #[serde(default = "default_max_thread_contexts")]
    pub max_thread_contexts: usize,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            status_text: default_status_text(),
            loading_messages: default_loading_messages(),
            greeting: default_greeting(),
            suggested_prompts_title: None,
            suggested_prompts: default_suggested_prompts(),
            summarize_prompt: default_summarize_prompt(),
            channel_history_limit: default_channel_history_limit(),
            min_append_chars: 0,
            max_thread_contexts: default_max_thread_contexts(),
        }
    }
}

// ─── Server / Logging ───────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => anyhow::bail!("LOG_FORMAT must be 'pretty' or 'json', got: {}", other),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
    /// Directory for daily-rolling log files; stdout only when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

fn default_slack_api_url() -> String {
    DEFAULT_SLACK_API_URL.to_string()
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_CONTENT.to_string()
}

fn default_status_text() -> String {
    "thinking...".to_string()
}

fn default_loading_messages() -> Vec<String> {
    [
        "Teaching the hamsters to type faster…",
        "Untangling the internet cables…",
        "Consulting the office goldfish…",
        "Polishing up the response just for you…",
        "Convincing the AI to stop overthinking…",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_greeting() -> String {
    "Hi, how can I help?".to_string()
}

fn default_suggested_prompts() -> Vec<SuggestedPrompt> {
    vec![
        SuggestedPrompt {
            title: "Summarize this channel".to_string(),
            message: SUMMARIZE_CHANNEL_PROMPT.to_string(),
        },
        SuggestedPrompt {
            title: "Help me write".to_string(),
            message: "Help me draft a short, friendly announcement for my team.".to_string(),
        },
    ]
}

fn default_summarize_prompt() -> String {
    SUMMARIZE_CHANNEL_PROMPT.to_string()
}

fn default_channel_history_limit() -> u32 {
    50
}

fn default_max_thread_contexts() -> usize {
    crate::context_store::DEFAULT_CAPACITY
}

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    3000
}

impl Config {
    /// Find the config file, checking multiple locations in order:
    /// 1. THREADLINE_CONFIG_PATH env var (if set)
    /// 2. ./config.toml (current directory - for development)
    /// 3. ~/.config/threadline/config.toml (XDG config dir)
    fn find_config_file() -> Option<PathBuf> {
        if let Ok(env_path) = std::env::var("THREADLINE_CONFIG_PATH") {
            let path = PathBuf::from(&env_path);
            if path.exists() {
                return Some(path);
            }
        }

        let local_config = PathBuf::from("config.toml");
        if local_config.exists() {
            return Some(local_config);
        }

        let xdg_config = paths::config_file();
        if xdg_config.exists() {
            return Some(xdg_config);
        }

        None
    }

    /// Load from the standard search path with environment variable overrides
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load from `path` when given (it must exist), otherwise search the standard locations
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::find_config_file(),
        };

        let mut config = if let Some(config_path) = config_path {
            tracing::info!(
                path = %config_path.display(),
                "Loading configuration from file"
            );
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read {}", config_path.display()))?;
            Self::parse(&content)
                .with_context(|| format!("Failed to parse {}", config_path.display()))?
        } else {
            tracing::info!("No config file found, using environment variables and defaults");
            Config::default()
        };

        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str::<Config>(content)?)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("SLACK_BOT_TOKEN") {
            self.slack.bot_token = val;
        }
        if let Ok(val) = std::env::var("SLACK_APP_TOKEN") {
            self.slack.app_token = val;
        }
        if let Ok(val) = std::env::var("SLACK_SIGNING_SECRET") {
            self.slack.signing_secret = Some(val);
        }
        if let Ok(val) = std::env::var("SLACK_API_URL") {
            self.slack.api_url = val;
        }
        if let Ok(val) = std::env::var("SLACK_INSTALLATION_DIR") {
            self.slack.installation_dir = Some(val);
        }
        if let Ok(val) = std::env::var("LLM_BACKEND") {
            self.llm.backend_type = val;
        }
        if let Ok(val) = std::env::var("OPENAI_API_KEY") {
            self.llm.api_key = Some(val);
        }
        if let Ok(val) = std::env::var("LLM_MODEL") {
            self.llm.model = val;
        }
        if let Ok(val) = std::env::var("OPENAI_BASE_URL") {
            self.llm.base_url = val;
        }
        if let Ok(val) = std::env::var("PORT") {
            self.server.port = val
                .parse()
                .with_context(|| format!("PORT must be a valid port number, got: {}", val))?;
        }
        if let Ok(val) = std::env::var("SERVER_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = std::env::var("LOG_FORMAT") {
            self.logging.format = val.parse()?;
        }
        if let Ok(val) = std::env::var("LOG_DIR") {
            self.logging.dir = Some(val);
        }

        self.slack.api_url = self.slack.api_url.trim_end_matches('/').to_string();
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.slack.bot_token.trim().is_empty() {
            anyhow::bail!(
                "slack.bot_token is required (set in config.toml or SLACK_BOT_TOKEN env var)"
            );
        }
        if self.slack.app_token.trim().is_empty() {
            anyhow::bail!(
                "slack.app_token is required (set in config.toml or SLACK_APP_TOKEN env var)"
            );
        }
        if self.llm.backend_type().trim().eq_ignore_ascii_case("openai") && self.llm.api_key().is_none() {
            tracing::warn!(
                "OPENAI_API_KEY is not set; every LLM call will fail with an authentication error"
            );
        }
        if self.assistant.suggested_prompts.len() > 4 {
            anyhow::bail!(
                "assistant.suggested_prompts allows at most 4 prompts, got {}",
                self.assistant.suggested_prompts.len()
            );
        }
        Ok(())
    }
}
