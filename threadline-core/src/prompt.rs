// ABOUTME: Builds the single-string prompt sent to the LLM.
// ABOUTME: A fixed system instruction followed by role-tagged turns in chronological order.

use crate::traits::HistoryMessage;

pub const DEFAULT_SYSTEM_CONTENT: &str = "You're an assistant in a Slack workspace.
Users in the workspace will ask you to help them write something or to think better about a specific topic.
You'll respond to those questions in a professional way.
When you include markdown text, convert them to Slack compatible ones.
When a prompt has Slack's special syntax like <@USER_ID> or <#CHANNEL_ID>, you must keep them as-is in your response.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::System => "System",
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
}

impl ConversationTurn {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    /// Bot-authored messages speak as the assistant, everything else as the user
    pub fn from_history(message: &HistoryMessage) -> Self {
        let role = if message.is_from_bot() {
            Role::Assistant
        } else {
            Role::User
        };
        Self::new(role, message.text.clone())
    }
}

/// `System: <instruction>` then a blank line, then one `<Role>: <text>` line per turn.
/// Text is copied verbatim so inline references like `<@U123>` survive.
pub fn assemble(system: &str, turns: &[ConversationTurn]) -> String {
    let mut prompt = format!("{}: {}\n\n", Role::System.label(), system);
    let body = turns
        .iter()
        .map(|t| format!("{}: {}", t.role.label(), t.text))
        .collect::<Vec<_>>()
        .join("\n");
    prompt.push_str(&body);
    prompt
}

/// Prior thread messages plus the latest question. The triggering message is
/// dropped from history so the question appears exactly once, last.
pub fn thread_turns(
    history: &[HistoryMessage],
    trigger_ts: Option<&str>,
    latest: &str,
) -> Vec<ConversationTurn> {
    let mut turns: Vec<ConversationTurn> = history
        .iter()
        .filter(|m| trigger_ts.map_or(true, |ts| m.ts != ts))
        .map(ConversationTurn::from_history)
        .collect();
    turns.push(ConversationTurn::user(latest));
    turns
}

/// Summary request for a channel's recent activity. `messages` must already be
/// oldest first; messages without a user are left out.
pub fn channel_summary_request(channel_id: &str, messages: &[HistoryMessage]) -> String {
    let mut request = format!(
        "Please generate a brief summary of the following messages from Slack channel <#{}>:",
        channel_id
    );
    for message in messages {
        if let Some(user) = &message.user {
            request.push_str(&format!("\n<@{}> says: {}", user, message.text));
        }
    }
    request
}
