//! The `serve` and `trigger` commands: wiring storage, the Zulip
//! channel, the command engine, and the checkpoint scheduler.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use fcbot_channel_zulip::ZulipChannel;
use fcbot_config::FcBotConfig;
use fcbot_core::clock::{EventClock, SystemClock};
use fcbot_core::engine::CheckinEngine;
use fcbot_cron::CheckinScheduler;
use fcbot_storage::CheckinStore;
use fcbot_types::{CheckpointKind, OutboundMessage};

fn build_channel(config: &FcBotConfig) -> anyhow::Result<ZulipChannel> {
    let api_key = config
        .zulip
        .api_key
        .as_deref()
        .context("Zulip API key not configured (set zulip.api_key or ZULIP_API_KEY)")?;
    Ok(ZulipChannel::new(
        &config.zulip.site,
        &config.zulip.email,
        api_key,
        config.zulip.stream.clone(),
        config.zulip.topic.clone(),
    ))
}

fn open_store(config: &FcBotConfig) -> anyhow::Result<Arc<CheckinStore>> {
    let path = config.storage_path()?;
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    Ok(Arc::new(CheckinStore::open(&path)?))
}

/// Run the bot until ctrl-c.
pub async fn run_serve(config: FcBotConfig) -> anyhow::Result<()> {
    let schedule = crate::event_schedule(&config)?;
    let clock: Arc<dyn EventClock> = Arc::new(SystemClock::new(config.tz()?));
    let store = open_store(&config)?;
    store.load_or_init().await?;

    let channel = Arc::new(build_channel(&config)?);
    let engine = CheckinEngine::new(store.clone(), clock.clone(), schedule);

    let (inbound_tx, mut inbound_rx) = mpsc::channel(64);
    channel.start(inbound_tx).await?;

    let cancel = CancellationToken::new();
    let scheduler = CheckinScheduler::new(
        store,
        channel.clone(),
        clock,
        schedule,
        config.retention_days,
        Duration::from_secs(config.poll_interval_secs),
    );
    let scheduler_cancel = cancel.child_token();
    let scheduler_handle = tokio::spawn(async move {
        scheduler.run(scheduler_cancel).await;
    });

    info!("fcbot serving");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                cancel.cancel();
                break;
            }
            inbound = inbound_rx.recv() => {
                let Some(inbound) = inbound else {
                    warn!("Inbound channel closed");
                    cancel.cancel();
                    break;
                };

                debug!(sender = %inbound.sender_id, "Processing inbound message");

                let reply = match engine.handle_message(&inbound.content, &inbound.sender_id).await {
                    Ok(reply) => reply,
                    Err(e) => {
                        warn!(sender = %inbound.sender_id, "Command handling failed: {e}");
                        continue;
                    }
                };

                let outbound = OutboundMessage {
                    recipient: inbound.reply_recipient(),
                    content: reply,
                };
                if let Err(e) = channel.send(outbound).await {
                    warn!("Failed to send reply: {e}");
                }
            }
        }
    }

    channel.stop().await?;
    let _ = scheduler_handle.await;
    Ok(())
}

/// Fire one checkpoint action immediately, bypassing the due check.
pub async fn run_trigger(config: FcBotConfig, kind: CheckpointKind) -> anyhow::Result<()> {
    let schedule = crate::event_schedule(&config)?;
    let clock: Arc<dyn EventClock> = Arc::new(SystemClock::new(config.tz()?));
    let store = open_store(&config)?;
    store.load_or_init().await?;

    let channel = Arc::new(build_channel(&config)?);
    let moment = clock.now();

    let scheduler = CheckinScheduler::new(
        store,
        channel,
        clock,
        schedule,
        config.retention_days,
        Duration::from_secs(config.poll_interval_secs),
    );

    info!(checkpoint = ?kind, "Manually firing checkpoint");
    scheduler.fire(kind, &moment).await
}
