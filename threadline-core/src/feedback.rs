// ABOUTME: Feedback control attached to finished replies and the handler for its clicks.
// ABOUTME: Ratings are acknowledged ephemerally and never stored.

use crate::metrics;
use crate::traits::ChatApi;
use serde_json::{json, Value};

pub const FEEDBACK_ACTION_ID: &str = "feedback";
pub const FEEDBACK_ELEMENT_TYPE: &str = "feedback_buttons";
pub const POSITIVE_VALUE: &str = "good-feedback";
pub const NEGATIVE_VALUE: &str = "bad-feedback";

pub const POSITIVE_ACK: &str = "We're glad you found this useful.";
pub const NEGATIVE_ACK: &str = "Sorry to hear that response wasn't up to par :slightly_frowning_face: Starting a new chat may help with AI mistakes and hallucinations.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rating {
    Positive,
    Negative,
}

impl Rating {
    /// Anything other than the positive value counts as negative
    pub fn from_value(value: &str) -> Self {
        if value == POSITIVE_VALUE {
            Rating::Positive
        } else {
            Rating::Negative
        }
    }

    pub fn acknowledgement(&self) -> &'static str {
        match self {
            Rating::Positive => POSITIVE_ACK,
            Rating::Negative => NEGATIVE_ACK,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::Positive => "positive",
            Rating::Negative => "negative",
        }
    }
}

/// One click on a feedback control. Consumed immediately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackRecord {
    pub message_ts: String,
    pub channel_id: String,
    pub user_id: String,
    pub rating: Rating,
}

/// Block attached to every successfully finished reply
pub fn feedback_block() -> Value {
    json!({
        "type": "context_actions",
        "elements": [{
            "type": FEEDBACK_ELEMENT_TYPE,
            "action_id": FEEDBACK_ACTION_ID,
            "positive_button": {
                "text": { "type": "plain_text", "text": "Good Response" },
                "accessibility_label": "Submit positive feedback on this response",
                "value": POSITIVE_VALUE,
            },
            "negative_button": {
                "text": { "type": "plain_text", "text": "Bad Response" },
                "accessibility_label": "Submit negative feedback on this response",
                "value": NEGATIVE_VALUE,
            },
        }],
    })
}

/// Send the clicking user an ephemeral acknowledgement in the rated message's thread.
/// Failures are logged and dropped; nothing is shown to the user.
pub async fn acknowledge(api: &dyn ChatApi, record: &FeedbackRecord) {
    metrics::record_feedback(record.rating.as_str());
    tracing::info!(
        channel = %record.channel_id,
        user = %record.user_id,
        message_ts = %record.message_ts,
        rating = record.rating.as_str(),
        "Feedback received"
    );

    if let Err(e) = api
        .post_ephemeral(
            &record.channel_id,
            &record.user_id,
            Some(&record.message_ts),
            record.rating.acknowledgement(),
        )
        .await
    {
        tracing::error!(error = %e, channel = %record.channel_id, "Failed to acknowledge feedback");
    }
}
