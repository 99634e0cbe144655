//! Zulip REST API HTTP client.

use std::time::Duration;

use anyhow::{Context, bail};
use reqwest::Client;

use crate::types::{
    EventsResponse, GetEventsParams, Profile, RegisterParams, RegisterResponse, ResponseEnvelope,
    SendMessageParams, ZulipMessage,
};

/// A registered event queue position.
#[derive(Debug, Clone)]
pub struct EventQueue {
    pub queue_id: String,
    pub last_event_id: i64,
}

/// One `get_events` call's outcome. The queue expiring is routine (the
/// server drops idle queues) and handled by re-registering, so it is not
/// an error.
#[derive(Debug)]
pub enum EventsOutcome {
    Events(Vec<crate::types::Event>),
    QueueExpired,
}

/// HTTP client for the Zulip REST API, authenticated as the bot.
pub struct ZulipApi {
    client: Client,
    base_url: String,
    email: String,
    api_key: String,
}

impl ZulipApi {
    /// Create a new API client for the given server and bot credentials.
    pub fn new(site: &str, email: &str, api_key: &str) -> Self {
        // Timeout must cover the server's long-poll hold time
        let client = Client::builder()
            .timeout(Duration::from_secs(90))
            .build()
            .expect("failed to build reqwest client");
        Self {
            client,
            base_url: format!("{}/api/v1", site.trim_end_matches('/')),
            email: email.to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Verify credentials by fetching the bot's own profile.
    pub async fn get_profile(&self) -> anyhow::Result<Profile> {
        let resp = self
            .client
            .get(format!("{}/users/me", self.base_url))
            .basic_auth(&self.email, Some(&self.api_key))
            .send()
            .await
            .context("users/me request failed")?;
        if !resp.status().is_success() {
            bail!("users/me failed with status {}", resp.status());
        }
        resp.json().await.context("users/me response parse failed")
    }

    /// Send a message to a stream under the given topic.
    pub async fn send_stream_message(
        &self,
        stream: &str,
        topic: &str,
        content: &str,
    ) -> anyhow::Result<()> {
        self.send_message(&SendMessageParams {
            message_type: "stream".into(),
            to: stream.to_string(),
            topic: Some(topic.to_string()),
            content: content.to_string(),
        })
        .await
    }

    /// Send a private message to one recipient.
    pub async fn send_private_message(&self, recipient: &str, content: &str) -> anyhow::Result<()> {
        self.send_message(&SendMessageParams {
            message_type: "private".into(),
            to: recipient.to_string(),
            topic: None,
            content: content.to_string(),
        })
        .await
    }

    async fn send_message(&self, params: &SendMessageParams) -> anyhow::Result<()> {
        let envelope: ResponseEnvelope = self
            .client
            .post(format!("{}/messages", self.base_url))
            .basic_auth(&self.email, Some(&self.api_key))
            .form(params)
            .send()
            .await
            .context("send message request failed")?
            .json()
            .await
            .context("send message response parse failed")?;

        if !envelope.is_success() {
            bail!("send message failed: {}", envelope.msg);
        }
        Ok(())
    }

    /// Register an event queue narrowed to message events.
    pub async fn register_queue(&self) -> anyhow::Result<EventQueue> {
        let resp: RegisterResponse = self
            .client
            .post(format!("{}/register", self.base_url))
            .basic_auth(&self.email, Some(&self.api_key))
            .form(&RegisterParams {
                event_types: "[\"message\"]".to_string(),
            })
            .send()
            .await
            .context("register request failed")?
            .json()
            .await
            .context("register response parse failed")?;

        if !resp.envelope.is_success() {
            bail!("register failed: {}", resp.envelope.msg);
        }
        let queue_id = resp.queue_id.context("register returned no queue_id")?;
        let last_event_id = resp
            .last_event_id
            .context("register returned no last_event_id")?;
        Ok(EventQueue {
            queue_id,
            last_event_id,
        })
    }

    /// Long-poll for events past the given position.
    pub async fn get_events(&self, queue: &EventQueue) -> anyhow::Result<EventsOutcome> {
        let resp: EventsResponse = self
            .client
            .get(format!("{}/events", self.base_url))
            .basic_auth(&self.email, Some(&self.api_key))
            .query(&GetEventsParams {
                queue_id: queue.queue_id.clone(),
                last_event_id: queue.last_event_id,
            })
            .send()
            .await
            .context("get events request failed")?
            .json()
            .await
            .context("get events response parse failed")?;

        if !resp.envelope.is_success() {
            if resp.envelope.code.as_deref() == Some("BAD_EVENT_QUEUE_ID") {
                return Ok(EventsOutcome::QueueExpired);
            }
            bail!("get events failed: {}", resp.envelope.msg);
        }
        Ok(EventsOutcome::Events(resp.events))
    }

    /// Whether a message was sent by this bot account.
    pub fn is_own_message(&self, message: &ZulipMessage) -> bool {
        message.sender_email == self.email
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url() {
        let api = ZulipApi::new("https://example.zulipchat.com", "bot@example.com", "key");
        assert_eq!(api.base_url, "https://example.zulipchat.com/api/v1");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let api = ZulipApi::new("https://example.zulipchat.com/", "bot@example.com", "key");
        assert_eq!(api.base_url, "https://example.zulipchat.com/api/v1");
    }
}
