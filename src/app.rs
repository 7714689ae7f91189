// ABOUTME: Startup wiring: LLM backend, Slack clients, dispatcher, health server.
// ABOUTME: Runs Socket Mode and the HTTP server side by side until either stops or Ctrl-C.

use crate::platform::slack::{SlackWebApi, SocketModeRelay};
use crate::platform::ConnectionStatus;
use crate::server::{self, ServerState};
use anyhow::{Context, Result};
use std::sync::Arc;
use threadline_core::{metrics, ChatApi, Config, Dispatcher};
use threadline_llm::LlmRegistry;

/// Build the dispatcher for `config` around an already-constructed chat client
pub fn build_dispatcher(
    config: &Config,
    chat: Arc<dyn ChatApi>,
    bot_user_id: Option<&str>,
) -> Result<Dispatcher> {
    let llm = LlmRegistry::default()
        .create(&config.llm)
        .with_context(|| format!("Failed to create LLM backend '{}'", config.llm.backend_type()))?;
    tracing::info!(backend = llm.name(), model = %config.llm.model, "LLM backend ready");

    let dispatcher = Dispatcher::new(chat, llm, config.llm.model.clone(), config.assistant.clone());
    Ok(match bot_user_id {
        Some(id) => dispatcher.with_bot_user_id(id),
        None => dispatcher,
    })
}

/// Create the installation directory when one is configured
pub fn prepare_installation_dir(config: &Config) -> Result<()> {
    if let Some(dir) = config.slack.installation_dir.as_deref() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create installation directory {}", dir))?;
        tracing::debug!(dir, "Installation directory ready");
    }
    Ok(())
}

/// Connect to Slack and serve until shutdown
pub async fn run(config: Config) -> Result<()> {
    prepare_installation_dir(&config)?;

    let metrics_handle =
        metrics::init_metrics().context("Failed to initialize Prometheus metrics")?;

    let web = Arc::new(SlackWebApi::new(&config.slack.api_url, &config.slack.bot_token)?);
    let identity = web
        .auth_test()
        .await
        .context("Failed to call Slack auth.test, check SLACK_BOT_TOKEN")?;
    tracing::info!(
        bot_user = %identity.user_id,
        team = identity.team_id.as_deref().unwrap_or("-"),
        "Slack bot authenticated"
    );

    let chat: Arc<dyn ChatApi> = web;
    let dispatcher = Arc::new(build_dispatcher(&config, chat, Some(&identity.user_id))?);

    let status = ConnectionStatus::default();
    let relay = SocketModeRelay::new(&config.slack.app_token, status.clone())?;
    let server_state = ServerState {
        connection: status,
        metrics: metrics_handle,
        bot_user_id: identity.user_id.clone(),
    };

    tokio::select! {
        result = relay.run(dispatcher) => {
            result.context("Socket Mode listener failed")?;
            tracing::warn!("Socket Mode listener exited");
        }
        result = server::serve(&config.server, server_state) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }
    Ok(())
}

/// One-line-per-setting summary for `check-config`; secrets are never printed
pub fn describe(config: &Config) -> Vec<String> {
    let api_key = if config.llm.api_key().is_some() {
        "set"
    } else {
        "missing"
    };
    vec![
        format!("slack.api_url = {}", config.slack.api_url),
        format!(
            "slack.installation_dir = {}",
            config.slack.installation_dir.as_deref().unwrap_or("-")
        ),
        format!("llm.type = {}", config.llm.backend_type()),
        format!("llm.model = {}", config.llm.model),
        format!("llm.api_key = {}", api_key),
        format!("server = {}:{}", config.server.host, config.server.port),
        format!(
            "assistant.suggested_prompts = {}",
            config.assistant.suggested_prompts.len()
        ),
    ]
}
