// ABOUTME: Slack Web API client implementing the ChatApi seam on a slack-morphism session.
// ABOUTME: Covers posting, history reads, channel joins, streaming messages, and assistant threads.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use slack_morphism::errors::SlackClientError;
use slack_morphism::prelude::*;
use std::sync::Arc;
use threadline_core::{ChatApi, ChatError, ChatResult, HistoryMessage, SuggestedPrompt, ThreadContext};

/// Page size for conversations.replies
const REPLIES_PAGE_LIMIT: u16 = 200;

/// Who the bot token belongs to, as reported by auth.test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity {
    pub user_id: String,
    pub team_id: Option<String>,
}

/// Web API client authenticated with the bot token.
///
/// Every call opens a session on one shared [`SlackHyperClient`] whose connector
/// points at the configured API URL. `not_in_channel` on a channel-scoped call
/// becomes [`ChatError::NotInChannel`].
#[derive(Clone)]
pub struct SlackWebApi {
    client: Arc<SlackHyperClient>,
    bot_token: SlackApiToken,
    api_url: String,
}

impl std::fmt::Debug for SlackWebApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackWebApi")
            .field("api_url", &self.api_url)
            .field("bot_token", &"[REDACTED]")
            .finish()
    }
}

impl SlackWebApi {
    pub fn new(api_url: &str, bot_token: &str) -> Result<Self> {
        let api_url = api_url.trim_end_matches('/').to_string();
        super::install_crypto_provider();

        // Plain http stays allowed so a local API URL works
        let https = hyper_rustls::HttpsConnectorBuilder::new()
            .with_provider_and_native_roots(rustls::crypto::ring::default_provider())
            .context("Failed to load native root certificates for Slack")?
            .https_or_http()
            .enable_http1()
            .enable_http2()
            .build();
        let connector = SlackClientHyperConnector::with_connector(https).with_slack_api_url(&api_url);

        Ok(Self {
            client: Arc::new(SlackClient::new(connector)),
            bot_token: SlackApiToken::new(SlackApiTokenValue(bot_token.trim().to_string())),
            api_url,
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn session(&self) -> SlackClientSession<'_, SlackClientHyperHttpsConnector> {
        self.client.open_session(&self.bot_token)
    }

    /// Resolve the bot's own user id so its messages can be ignored
    pub async fn auth_test(&self) -> ChatResult<BotIdentity> {
        let response = self
            .session()
            .auth_test()
            .await
            .map_err(|e| chat_error("auth.test", None, e))?;

        let user_id = response.user_id.to_string();
        if user_id.trim().is_empty() {
            return Err(ChatError::api("auth.test", "missing_user_id"));
        }
        Ok(BotIdentity {
            user_id,
            team_id: Some(response.team_id.to_string()),
        })
    }
}

/// Map a client failure onto the chat error model
fn chat_error(method: &str, channel: Option<&str>, err: SlackClientError) -> ChatError {
    match err {
        SlackClientError::ApiError(api) => {
            tracing::debug!(method, error = %api.code, "Slack API call failed");
            ChatError::from_platform_code(method, &api.code, channel)
        }
        SlackClientError::HttpError(http) => {
            ChatError::api(method, format!("http_{}", http.status_code.as_u16()))
        }
        SlackClientError::RateLimitError(_) => ChatError::api(method, "ratelimited"),
        SlackClientError::ProtocolError(protocol) => {
            ChatError::api(method, format!("invalid_response: {}", protocol))
        }
        other => ChatError::Transport(other.to_string()),
    }
}

fn history_message(message: SlackHistoryMessage) -> HistoryMessage {
    HistoryMessage {
        ts: message.origin.ts.to_string(),
        user: message.sender.user.map(|user| user.to_string()),
        bot_id: message.sender.bot_id.map(|bot| bot.to_string()),
        text: message.content.text.unwrap_or_default(),
    }
}

/// Block Kit JSON as typed blocks; unrecognised shapes survive as `SlackBlock::Unknown`
fn typed_blocks(method: &str, blocks: &[Value]) -> ChatResult<Vec<SlackBlock>> {
    blocks
        .iter()
        .map(|block| {
            serde_json::from_value(block.clone())
                .map_err(|e| ChatError::api(method, format!("invalid_blocks: {}", e)))
        })
        .collect()
}

/// assistant.threads.setStatus with the rotating loading messages the typed request lacks
#[derive(Debug, Serialize)]
struct SetStatusRequest<'a> {
    channel_id: &'a str,
    thread_ts: &'a str,
    status: &'a str,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    loading_messages: &'a [String],
}

#[async_trait]
impl ChatApi for SlackWebApi {
    async fn post_message(
        &self,
        channel: &str,
        thread_ts: Option<&str>,
        text: &str,
    ) -> ChatResult<String> {
        let req = SlackApiChatPostMessageRequest::new(
            channel.into(),
            SlackMessageContent::new().with_text(text.to_string()),
        )
        .opt_thread_ts(thread_ts.map(SlackTs::from));

        let response = self
            .session()
            .chat_post_message(&req)
            .await
            .map_err(|e| chat_error("chat.postMessage", Some(channel), e))?;
        Ok(response.ts.to_string())
    }

    async fn post_ephemeral(
        &self,
        channel: &str,
        user: &str,
        thread_ts: Option<&str>,
        text: &str,
    ) -> ChatResult<()> {
        let req = SlackApiChatPostEphemeralRequest::new(
            channel.into(),
            user.into(),
            SlackMessageContent::new().with_text(text.to_string()),
        )
        .opt_thread_ts(thread_ts.map(SlackTs::from));

        self.session()
            .chat_post_ephemeral(&req)
            .await
            .map_err(|e| chat_error("chat.postEphemeral", Some(channel), e))?;
        Ok(())
    }

    async fn thread_replies(
        &self,
        channel: &str,
        thread_ts: &str,
    ) -> ChatResult<Vec<HistoryMessage>> {
        let session = self.session();
        let mut collected = Vec::new();
        let mut cursor: Option<SlackCursorId> = None;
        loop {
            let req = SlackApiConversationsRepliesRequest::new(channel.into(), thread_ts.into())
                .with_oldest(thread_ts.into())
                .with_inclusive(true)
                .with_limit(REPLIES_PAGE_LIMIT)
                .opt_cursor(cursor.take());

            let response = session
                .conversations_replies(&req)
                .await
                .map_err(|e| chat_error("conversations.replies", Some(channel), e))?;
            collected.extend(response.messages.into_iter().map(history_message));

            match response
                .response_metadata
                .and_then(|meta| meta.next_cursor)
                .filter(|next| !next.0.is_empty())
            {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        Ok(collected)
    }

    async fn channel_history(&self, channel: &str, limit: u32) -> ChatResult<Vec<HistoryMessage>> {
        let req = SlackApiConversationsHistoryRequest::new()
            .with_channel(channel.into())
            .with_limit(u16::try_from(limit).unwrap_or(u16::MAX));

        let response = self
            .session()
            .conversations_history(&req)
            .await
            .map_err(|e| chat_error("conversations.history", Some(channel), e))?;
        Ok(response.messages.into_iter().map(history_message).collect())
    }

    async fn join_channel(&self, channel: &str) -> ChatResult<()> {
        // not_in_channel cannot happen here; report any failure as a plain API error
        let req = SlackApiConversationsJoinRequest::new(channel.into());
        self.session()
            .conversations_join(&req)
            .await
            .map_err(|e| chat_error("conversations.join", None, e))?;
        Ok(())
    }

    async fn start_stream(&self, context: &ThreadContext) -> ChatResult<String> {
        let req = SlackApiChatStartStreamRequest::new(context.channel_id.as_str().into())
            .with_thread_ts(context.thread_ts.as_str().into())
            .with_recipient_user_id(context.user_id.as_str().into())
            .opt_recipient_team_id(context.team_id.as_deref().map(SlackTeamId::from));

        let response = self
            .session()
            .chat_start_stream(&req)
            .await
            .map_err(|e| chat_error("chat.startStream", Some(&context.channel_id), e))?;
        Ok(response.ts.to_string())
    }

    async fn append_stream(
        &self,
        channel: &str,
        stream_ts: &str,
        markdown: &str,
    ) -> ChatResult<()> {
        let req = SlackApiChatAppendStreamRequest::new(channel.into(), stream_ts.into())
            .with_markdown_text(markdown.to_string());

        self.session()
            .chat_append_stream(&req)
            .await
            .map_err(|e| chat_error("chat.appendStream", Some(channel), e))?;
        Ok(())
    }

    async fn stop_stream(&self, channel: &str, stream_ts: &str, blocks: &[Value]) -> ChatResult<()> {
        let content = if blocks.is_empty() {
            SlackMessageContent::new()
        } else {
            SlackMessageContent::new().with_blocks(typed_blocks("chat.stopStream", blocks)?)
        };
        let req = SlackApiChatStopStreamRequest::new(channel.into(), stream_ts.into(), content);

        self.session()
            .chat_stop_stream(&req)
            .await
            .map_err(|e| chat_error("chat.stopStream", Some(channel), e))?;
        Ok(())
    }

    async fn set_thread_title(
        &self,
        channel: &str,
        thread_ts: &str,
        title: &str,
    ) -> ChatResult<()> {
        let req = SlackApiAssistantThreadSetTitleRequest::new(
            channel.into(),
            thread_ts.into(),
            title.to_string(),
        );

        self.session()
            .assistant_threads_set_title(&req)
            .await
            .map_err(|e| chat_error("assistant.threads.setTitle", Some(channel), e))?;
        Ok(())
    }

    async fn set_status(
        &self,
        channel: &str,
        thread_ts: &str,
        status: &str,
        loading_messages: &[String],
    ) -> ChatResult<()> {
        let req = SetStatusRequest {
            channel_id: channel,
            thread_ts,
            status,
            loading_messages,
        };

        self.session()
            .http_session_api
            .http_post::<_, SlackApiAssistantThreadsSetStatusResponse>(
                "assistant.threads.setStatus",
                &req,
                Some(&ASSISTANT_THREAD_SET_STATUS_SPECIAL_LIMIT_RATE_CTL),
            )
            .await
            .map_err(|e| chat_error("assistant.threads.setStatus", Some(channel), e))?;
        Ok(())
    }

    async fn set_suggested_prompts(
        &self,
        channel: &str,
        thread_ts: &str,
        title: Option<&str>,
        prompts: &[SuggestedPrompt],
    ) -> ChatResult<()> {
        let prompts = prompts
            .iter()
            .map(|p| SlackAssistantPrompt::new(p.title.clone(), p.message.clone()))
            .collect();
        let req = SlackApiAssistantThreadsSetSuggestedPromptsRequest::new(
            channel.into(),
            thread_ts.into(),
            prompts,
        )
        .opt_title(title.map(str::to_string));

        self.session()
            .assistant_threads_set_suggested_prompts(&req)
            .await
            .map_err(|e| chat_error("assistant.threads.setSuggestedPrompts", Some(channel), e))?;
        Ok(())
    }
}
