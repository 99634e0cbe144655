//! Zulip channel for fcbot.
//!
//! Connects to a Zulip server over the REST API with event-queue
//! long-polling (no webhook required).
//!
//! # Configuration
//!
//! ```json5
//! zulip: {
//!     site: "https://example.zulipchat.com",
//!     email: "feelings-bot@example.zulipchat.com",
//!     // api_key can also come from the ZULIP_API_KEY env var
//!     stream: "455 Broadway",
//!     topic: "Feelings Checkin",
//! }
//! ```

pub mod api;
pub mod polling;
pub mod types;

use std::sync::Arc;

use anyhow::bail;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use fcbot_core::Notifier;
use fcbot_types::{ChannelStatus, InboundMessage, OutboundMessage, Recipient};

use api::ZulipApi;

/// The bot's connection to one Zulip server.
pub struct ZulipChannel {
    api: Arc<ZulipApi>,
    stream: String,
    topic: String,
    state: Mutex<ZulipState>,
}

struct ZulipState {
    status: ChannelStatus,
    cancel: Option<CancellationToken>,
    poll_handle: Option<JoinHandle<()>>,
}

impl ZulipChannel {
    /// Create a channel for the given server, bot credentials, and
    /// broadcast destination.
    pub fn new(site: &str, email: &str, api_key: &str, stream: String, topic: String) -> Self {
        Self {
            api: Arc::new(ZulipApi::new(site, email, api_key)),
            stream,
            topic,
            state: Mutex::new(ZulipState {
                status: ChannelStatus::Stopped,
                cancel: None,
                poll_handle: None,
            }),
        }
    }

    /// Start long-polling, forwarding inbound messages to `sender`.
    pub async fn start(&self, sender: mpsc::Sender<InboundMessage>) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;
        if state.status == ChannelStatus::Running {
            bail!("Zulip channel is already running");
        }

        state.status = ChannelStatus::Starting;

        // Verify credentials before spawning the poll loop
        match self.api.get_profile().await {
            Ok(profile) => {
                info!(
                    bot_email = %profile.email,
                    bot_name = %profile.full_name,
                    "Zulip bot authenticated"
                );
            }
            Err(e) => {
                state.status = ChannelStatus::Error(format!("Auth failed: {e}"));
                bail!("Failed to authenticate Zulip bot: {e}");
            }
        }

        let cancel = CancellationToken::new();
        let cancel_child = cancel.child_token();
        let api = self.api.clone();

        let handle = tokio::spawn(async move {
            polling::run_polling_loop(&api, sender, cancel_child).await;
        });

        state.cancel = Some(cancel);
        state.poll_handle = Some(handle);
        state.status = ChannelStatus::Running;

        Ok(())
    }

    /// Stop the polling loop and wait for it to finish.
    pub async fn stop(&self) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;

        if let Some(cancel) = state.cancel.take() {
            cancel.cancel();
        }

        if let Some(handle) = state.poll_handle.take() {
            let _ = handle.await;
        }

        state.status = ChannelStatus::Stopped;
        Ok(())
    }

    /// Deliver an outbound message to its recipient.
    pub async fn send(&self, message: OutboundMessage) -> anyhow::Result<()> {
        match &message.recipient {
            Recipient::Private { email } => {
                self.api.send_private_message(email, &message.content).await
            }
            Recipient::Stream { stream, topic } => {
                self.api
                    .send_stream_message(stream, topic, &message.content)
                    .await
            }
        }
    }

    pub fn status(&self) -> ChannelStatus {
        match self.state.try_lock() {
            Ok(state) => state.status.clone(),
            Err(_) => ChannelStatus::Starting,
        }
    }
}

#[async_trait::async_trait]
impl Notifier for ZulipChannel {
    async fn send_broadcast(&self, content: &str) -> anyhow::Result<()> {
        self.api
            .send_stream_message(&self.stream, &self.topic, content)
            .await
    }

    async fn send_private(&self, recipient: &str, content: &str) -> anyhow::Result<()> {
        self.api.send_private_message(recipient, content).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_initial_status_stopped() {
        let channel = ZulipChannel::new(
            "https://example.zulipchat.com",
            "bot@example.com",
            "key",
            "455 Broadway".into(),
            "Feelings Checkin".into(),
        );
        assert_eq!(channel.status(), ChannelStatus::Stopped);
    }

    #[tokio::test]
    async fn test_stop_without_start_is_noop() {
        let channel = ZulipChannel::new(
            "https://example.zulipchat.com",
            "bot@example.com",
            "key",
            "455 Broadway".into(),
            "Feelings Checkin".into(),
        );
        channel.stop().await.unwrap();
        assert_eq!(channel.status(), ChannelStatus::Stopped);
    }
}
