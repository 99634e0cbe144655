//! Zulip REST API types (minimal subset).

use serde::{Deserialize, Serialize};

/// Fields every Zulip response carries.
#[derive(Debug, Deserialize)]
pub struct ResponseEnvelope {
    /// "success" or "error".
    pub result: String,
    #[serde(default)]
    pub msg: String,
    /// Machine-readable error code (e.g. "BAD_EVENT_QUEUE_ID").
    #[serde(default)]
    pub code: Option<String>,
}

impl ResponseEnvelope {
    pub fn is_success(&self) -> bool {
        self.result == "success"
    }
}

/// The bot's own profile, returned by `GET /users/me`.
#[derive(Debug, Deserialize)]
pub struct Profile {
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub is_bot: bool,
}

/// Response to `POST /register`.
#[derive(Debug, Deserialize)]
pub struct RegisterResponse {
    #[serde(flatten)]
    pub envelope: ResponseEnvelope,
    #[serde(default)]
    pub queue_id: Option<String>,
    #[serde(default)]
    pub last_event_id: Option<i64>,
}

/// Response to `GET /events`.
#[derive(Debug, Deserialize)]
pub struct EventsResponse {
    #[serde(flatten)]
    pub envelope: ResponseEnvelope,
    #[serde(default)]
    pub events: Vec<Event>,
}

/// One event from the queue.
#[derive(Debug, Deserialize)]
pub struct Event {
    pub id: i64,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub message: Option<ZulipMessage>,
}

/// A Zulip message.
#[derive(Debug, Deserialize)]
pub struct ZulipMessage {
    pub id: i64,
    pub sender_email: String,
    #[serde(default)]
    pub sender_full_name: Option<String>,
    pub content: String,
    /// "stream" or "private".
    #[serde(rename = "type")]
    pub message_type: String,
    /// Stream name for stream messages, recipient list for private ones.
    #[serde(default)]
    pub display_recipient: Option<serde_json::Value>,
    /// Topic of a stream message.
    #[serde(default)]
    pub subject: String,
    /// Unix seconds.
    pub timestamp: i64,
}

impl ZulipMessage {
    /// Stream name, when this is a stream message.
    pub fn stream_name(&self) -> Option<&str> {
        if self.message_type != "stream" {
            return None;
        }
        self.display_recipient.as_ref().and_then(|v| v.as_str())
    }
}

/// Parameters for `POST /messages`.
#[derive(Debug, Serialize)]
pub struct SendMessageParams {
    /// "stream" or "private".
    #[serde(rename = "type")]
    pub message_type: String,
    /// Stream name or recipient email.
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    pub content: String,
}

/// Parameters for `POST /register`.
#[derive(Debug, Serialize)]
pub struct RegisterParams {
    /// JSON-encoded list of event types, e.g. `["message"]`.
    pub event_types: String,
}

/// Parameters for `GET /events`.
#[derive(Debug, Serialize)]
pub struct GetEventsParams {
    pub queue_id: String,
    pub last_event_id: i64,
}
