//! Zulip event-queue long-polling loop.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use fcbot_types::{InboundMessage, MessageOrigin};

use crate::api::{EventQueue, EventsOutcome, ZulipApi};

/// Run the long-polling loop, converting Zulip message events to
/// [`InboundMessage`].
///
/// Registers an event queue on entry and re-registers whenever the
/// server expires it. Exits when `cancel` is cancelled or the `sender`
/// is closed.
pub async fn run_polling_loop(
    api: &ZulipApi,
    sender: mpsc::Sender<InboundMessage>,
    cancel: CancellationToken,
) {
    let mut queue: Option<EventQueue> = None;
    let mut backoff = Duration::from_secs(1);
    let max_backoff = Duration::from_secs(30);

    info!("Zulip polling loop started");

    loop {
        if cancel.is_cancelled() {
            break;
        }

        let current = match &queue {
            Some(q) => q.clone(),
            None => {
                let registered = tokio::select! {
                    _ = cancel.cancelled() => break,
                    result = api.register_queue() => result,
                };
                match registered {
                    Ok(q) => {
                        info!(queue_id = %q.queue_id, "Registered Zulip event queue");
                        backoff = Duration::from_secs(1);
                        queue = Some(q.clone());
                        q
                    }
                    Err(e) => {
                        warn!(backoff_secs = backoff.as_secs(), "Queue registration error: {e}");
                        tokio::select! {
                            _ = cancel.cancelled() => break,
                            _ = tokio::time::sleep(backoff) => {}
                        }
                        backoff = (backoff * 2).min(max_backoff);
                        continue;
                    }
                }
            }
        };

        let outcome = tokio::select! {
            _ = cancel.cancelled() => break,
            result = api.get_events(&current) => result,
        };

        match outcome {
            Ok(EventsOutcome::QueueExpired) => {
                warn!("Event queue expired, re-registering");
                queue = None;
            }
            Ok(EventsOutcome::Events(events)) => {
                backoff = Duration::from_secs(1);

                for event in events {
                    if let Some(q) = queue.as_mut() {
                        q.last_event_id = q.last_event_id.max(event.id);
                    }

                    let Some(msg) = event.message else {
                        continue;
                    };
                    if api.is_own_message(&msg) {
                        continue;
                    }

                    let origin = match msg.message_type.as_str() {
                        "private" => MessageOrigin::Private,
                        "stream" => MessageOrigin::Stream {
                            stream: msg.stream_name().unwrap_or_default().to_string(),
                            topic: msg.subject.clone(),
                        },
                        other => {
                            debug!(message_type = other, "Skipping unsupported message type");
                            continue;
                        }
                    };

                    let inbound = InboundMessage {
                        sender_id: msg.sender_email,
                        sender_name: msg.sender_full_name,
                        content: msg.content,
                        origin,
                        timestamp: msg.timestamp * 1000,
                    };

                    debug!(event_id = event.id, "Forwarding Zulip message");

                    if sender.send(inbound).await.is_err() {
                        info!("Inbound channel closed, stopping polling");
                        return;
                    }
                }
            }
            Err(e) => {
                warn!(backoff_secs = backoff.as_secs(), "get_events error: {e}");

                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(backoff) => {}
                }

                backoff = (backoff * 2).min(max_backoff);
            }
        }
    }

    info!("Zulip polling loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_polling_loop_cancellation() {
        // Verify that the polling loop exits promptly when cancelled.
        // We use a fake site so any request would fail, but the cancel should win.
        let api = ZulipApi::new("https://fake.invalid", "bot@example.com", "key");
        let (tx, _rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();

        cancel.cancel();

        tokio::time::timeout(
            Duration::from_secs(2),
            run_polling_loop(&api, tx, cancel),
        )
        .await
        .expect("polling loop should exit promptly on cancel");
    }
}
