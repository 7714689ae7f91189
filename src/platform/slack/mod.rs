// ABOUTME: Slack platform adapter: Socket Mode inbound events and Web API outbound calls.
// ABOUTME: Socket Mode callbacks acknowledge immediately and hand each event to the dispatcher.

pub mod api;

pub use api::{BotIdentity, SlackWebApi};

use crate::platform::{ConnectionState, ConnectionStatus};
use anyhow::{Context, Result};
use serde_json::Value;
use slack_morphism::prelude::*;
use std::sync::Arc;
use threadline_core::{Dispatcher, InboundEvent};

// =============================================================================
// Shared state passed to Socket Mode callbacks via SlackClientEventsUserState
// =============================================================================

/// Callbacks are fn pointers, so the dispatcher reaches them through the
/// listener environment's user state.
#[derive(Clone)]
struct SlackRelayState {
    dispatcher: Arc<Dispatcher>,
}

async fn relay_state(
    states: &SlackClientEventsUserState,
) -> Result<SlackRelayState, Box<dyn std::error::Error + Send + Sync>> {
    let guard = states.read().await;
    let state = guard
        .get_user_state::<SlackRelayState>()
        .cloned()
        .ok_or("SlackRelayState not found in user state")?;
    Ok(state)
}

// =============================================================================
// Event normalization
// =============================================================================

/// Parse a push event body, filling in the callback's team when the inner
/// event does not carry one
pub fn inbound_from_push(mut body: Value, team_id: &str) -> Option<InboundEvent> {
    if let Value::Object(fields) = &mut body {
        if !team_id.is_empty() && fields.get("team").map_or(true, Value::is_null) {
            fields.insert("team".to_string(), Value::String(team_id.to_string()));
        }
    }
    InboundEvent::from_event_json(&body)
}

// =============================================================================
// Socket Mode callback functions (must be fn pointers, not closures)
// =============================================================================

/// Handle push events (mentions, messages, assistant thread lifecycle)
async fn handle_push_event(
    event: SlackPushEventCallback,
    _client: Arc<SlackHyperClient>,
    states: SlackClientEventsUserState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let relay = relay_state(&states).await?;
    let body = serde_json::to_value(&event.event)?;

    match inbound_from_push(body, &event.team_id.to_string()) {
        Some(inbound) => {
            tracing::debug!(kind = inbound.kind(), "Slack event accepted");
            // Returning now acknowledges the envelope; the turn runs on its own task
            relay.dispatcher.accept(inbound);
        }
        None => tracing::trace!("Slack push event ignored"),
    }
    Ok(())
}

/// Handle Block Kit interactions (feedback buttons)
async fn handle_interaction_event(
    event: SlackInteractionEvent,
    _client: Arc<SlackHyperClient>,
    states: SlackClientEventsUserState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let relay = relay_state(&states).await?;
    let payload = serde_json::to_value(&event)?;

    for inbound in InboundEvent::from_interaction_json(&payload) {
        relay.dispatcher.accept(inbound);
    }
    Ok(())
}

fn socket_mode_error_handler(
    err: Box<dyn std::error::Error + Send + Sync>,
    _client: Arc<SlackHyperClient>,
    _states: SlackClientEventsUserState,
) -> HttpStatusCode {
    tracing::error!(platform = "slack", error = %err, "Socket Mode error");
    HttpStatusCode::OK
}

/// rustls sees both ring and aws-lc-rs in the build, so the process default
/// has to be picked before any TLS config is built. Later calls are no-ops.
pub(crate) fn install_crypto_provider() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

// =============================================================================
// SocketModeRelay - owns the Socket Mode connection
// =============================================================================

/// Inbound side of the Slack adapter
pub struct SocketModeRelay {
    client: Arc<SlackHyperClient>,
    app_token: SlackApiToken,
    status: ConnectionStatus,
}

impl SocketModeRelay {
    pub fn new(app_token: &str, status: ConnectionStatus) -> Result<Self> {
        install_crypto_provider();
        let client = Arc::new(SlackClient::new(
            SlackClientHyperConnector::new().context("Failed to create Slack HTTP connector")?,
        ));
        Ok(Self {
            client,
            app_token: SlackApiToken::new(SlackApiTokenValue(app_token.to_string())),
            status,
        })
    }

    /// Connect and serve events until the listener shuts down
    pub async fn run(self, dispatcher: Arc<Dispatcher>) -> Result<()> {
        let socket_mode_callbacks = SlackSocketModeListenerCallbacks::new()
            .with_push_events(handle_push_event)
            .with_interaction_events(handle_interaction_event);

        let listener_environment = Arc::new(
            SlackClientEventsListenerEnvironment::new(Arc::clone(&self.client))
                .with_error_handler(socket_mode_error_handler)
                .with_user_state(SlackRelayState { dispatcher }),
        );

        let socket_mode_listener = SlackClientSocketModeListener::new(
            &SlackClientSocketModeConfig::new(),
            listener_environment,
            socket_mode_callbacks,
        );

        self.status.set(ConnectionState::Connecting);
        if let Err(e) = socket_mode_listener.listen_for(&self.app_token).await {
            tracing::error!(platform = "slack", error = %e, "Failed to start Socket Mode listener");
            self.status.set(ConnectionState::Disconnected {
                reason: e.to_string(),
            });
            return Err(anyhow::anyhow!("Socket Mode connection failed: {}", e));
        }

        self.status.set(ConnectionState::Connected);
        tracing::info!(platform = "slack", "Socket Mode connected");

        // serve() blocks until the listener is shut down
        socket_mode_listener.serve().await;

        self.status.set(ConnectionState::Disconnected {
            reason: "listener stopped".to_string(),
        });
        tracing::info!(platform = "slack", "Socket Mode listener stopped");
        Ok(())
    }
}
