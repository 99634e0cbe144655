//! Checkpoint poll loop and announcement fan-out.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use fcbot_core::clock::{EventClock, EventSchedule, LocalMoment};
use fcbot_core::occurrence::{reset_occurrence, starting_report};
use fcbot_core::text;
use fcbot_core::Notifier;
use fcbot_storage::CheckinStore;
use fcbot_types::{CheckinDocument, CheckpointKind};

/// Drives the weekly checkpoints: polls the clock, fires due
/// checkpoints, and fans announcements out to the stream and to
/// per-slot subscribers.
pub struct CheckinScheduler {
    store: Arc<CheckinStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn EventClock>,
    schedule: EventSchedule,
    retention_days: u32,
    poll_interval: Duration,
}

impl CheckinScheduler {
    pub fn new(
        store: Arc<CheckinStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn EventClock>,
        schedule: EventSchedule,
        retention_days: u32,
        poll_interval: Duration,
    ) -> Self {
        Self {
            store,
            notifier,
            clock,
            schedule,
            retention_days,
            poll_interval,
        }
    }

    /// Run the poll loop until cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        info!("Checkin scheduler started");
        loop {
            if let Err(e) = self.tick().await {
                warn!("Scheduler tick failed: {e}");
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
        info!("Checkin scheduler stopped");
    }

    /// Fire every checkpoint due at the current moment.
    pub async fn tick(&self) -> anyhow::Result<()> {
        let moment = self.clock.now();
        let doc = self.store.load_or_init().await?;
        for kind in crate::due_checkpoints(&doc, &self.schedule, &moment) {
            info!(checkpoint = ?kind, date = %moment.date, "Firing checkpoint");
            self.fire(kind, &moment).await?;
        }
        Ok(())
    }

    /// Fire one checkpoint action now, regardless of the due check.
    ///
    /// The firing date (and, for the morning checkpoint, the occurrence
    /// reset) is committed in a single document write before any message
    /// goes out, so a crash mid-fan-out cannot double-fire.
    pub async fn fire(&self, kind: CheckpointKind, moment: &LocalMoment) -> anyhow::Result<()> {
        let mut doc = self.store.load_or_init().await?;
        if kind == CheckpointKind::Morning {
            reset_occurrence(&mut doc, moment.date, self.retention_days);
        }
        doc.last_fired.insert(kind, moment.date);
        self.store.save_document(&doc).await?;

        match kind {
            CheckpointKind::Morning => {
                self.broadcast(text::STREAM_9AM).await;
                self.notify_slot(&doc, kind, text::SUBSCRIBERS_9AM).await;
            }
            CheckpointKind::OneHour => {
                self.broadcast(text::STREAM_ONE_HOUR).await;
                self.notify_slot(&doc, kind, text::SUBSCRIBERS_ONE_HOUR).await;
            }
            CheckpointKind::Starting => {
                let report = starting_report(&doc);
                self.broadcast(&report).await;
                self.notify_slot(&doc, kind, &report).await;
            }
        }
        Ok(())
    }

    async fn broadcast(&self, content: &str) {
        if let Err(e) = self.notifier.send_broadcast(content).await {
            warn!("Broadcast failed: {e}");
        }
    }

    async fn notify_slot(&self, doc: &CheckinDocument, kind: CheckpointKind, content: &str) {
        for user in doc.subscribers(kind.slot()) {
            if let Err(e) = self.notifier.send_private(user, content).await {
                warn!(recipient = %user, "Private notification failed: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use fcbot_core::clock::FixedClock;
    use fcbot_types::{IdentityRecord, Slot};
    use tokio::sync::Mutex;

    /// Records everything sent, instead of talking to a chat server.
    #[derive(Default)]
    struct MockNotifier {
        broadcasts: Mutex<Vec<String>>,
        privates: Mutex<Vec<(String, String)>>,
    }

    #[async_trait::async_trait]
    impl Notifier for MockNotifier {
        async fn send_broadcast(&self, content: &str) -> anyhow::Result<()> {
            self.broadcasts.lock().await.push(content.to_string());
            Ok(())
        }

        async fn send_private(&self, recipient: &str, content: &str) -> anyhow::Result<()> {
            self.privates
                .lock()
                .await
                .push((recipient.to_string(), content.to_string()));
            Ok(())
        }
    }

    // 2024-01-04 was a Thursday
    fn thursday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 4).unwrap()
    }

    fn scheduler_at(
        hour: u32,
        store: Arc<CheckinStore>,
        notifier: Arc<MockNotifier>,
    ) -> CheckinScheduler {
        CheckinScheduler::new(
            store,
            notifier,
            Arc::new(FixedClock(LocalMoment::new(thursday(), hour))),
            EventSchedule::default(),
            90,
            Duration::from_secs(60),
        )
    }

    async fn seed_document(store: &CheckinStore) {
        let mut doc = CheckinDocument::default();
        doc.ids.insert(
            "alice".into(),
            IdentityRecord {
                last_accessed: thursday(),
                requests: vec!["spiders".into()],
            },
        );
        doc.attending.push("alice".into());
        doc.requests.push("loud parties".into());
        doc.subscribers_mut(Slot::Nine).insert("nine@example.com".into());
        doc.subscribers_mut(Slot::Two).insert("two@example.com".into());
        doc.subscribers_mut(Slot::Three)
            .insert("three@example.com".into());
        store.save_document(&doc).await.unwrap();
    }

    #[tokio::test]
    async fn test_morning_resets_and_announces() {
        let store = Arc::new(CheckinStore::open_in_memory().unwrap());
        let notifier = Arc::new(MockNotifier::default());
        seed_document(&store).await;

        let scheduler = scheduler_at(9, store.clone(), notifier.clone());
        scheduler.tick().await.unwrap();

        let doc = store.load_or_init().await.unwrap();
        assert!(doc.attending.is_empty());
        assert!(doc.requests.is_empty());
        assert_eq!(doc.last_fired[&CheckpointKind::Morning], thursday());
        // Identities survive the reset
        assert!(doc.ids.contains_key("alice"));

        assert_eq!(*notifier.broadcasts.lock().await, vec![text::STREAM_9AM]);
        assert_eq!(
            *notifier.privates.lock().await,
            vec![("nine@example.com".to_string(), text::SUBSCRIBERS_9AM.to_string())]
        );
    }

    #[tokio::test]
    async fn test_one_hour_notice() {
        let store = Arc::new(CheckinStore::open_in_memory().unwrap());
        let notifier = Arc::new(MockNotifier::default());
        seed_document(&store).await;

        let scheduler = scheduler_at(14, store.clone(), notifier.clone());
        scheduler.tick().await.unwrap();

        assert_eq!(*notifier.broadcasts.lock().await, vec![text::STREAM_ONE_HOUR]);
        assert_eq!(
            *notifier.privates.lock().await,
            vec![(
                "two@example.com".to_string(),
                text::SUBSCRIBERS_ONE_HOUR.to_string()
            )]
        );
        // Occurrence state untouched by the reminder
        let doc = store.load_or_init().await.unwrap();
        assert_eq!(doc.attending, vec!["alice"]);
    }

    #[tokio::test]
    async fn test_starting_report_broadcast_and_subscribers() {
        let store = Arc::new(CheckinStore::open_in_memory().unwrap());
        let notifier = Arc::new(MockNotifier::default());
        seed_document(&store).await;

        let scheduler = scheduler_at(15, store.clone(), notifier.clone());
        scheduler.tick().await.unwrap();

        let broadcasts = notifier.broadcasts.lock().await;
        assert_eq!(broadcasts.len(), 1);
        let report = &broadcasts[0];
        assert!(report.starts_with("Feelings checkin is starting."));
        assert_eq!(report.matches("`spiders`").count(), 1);
        assert_eq!(report.matches("`loud parties`").count(), 1);

        let privates = notifier.privates.lock().await;
        assert_eq!(privates.len(), 1);
        assert_eq!(privates[0].0, "three@example.com");
        assert_eq!(&privates[0].1, report);
    }

    #[tokio::test]
    async fn test_checkpoint_fires_at_most_once_per_day() {
        let store = Arc::new(CheckinStore::open_in_memory().unwrap());
        let notifier = Arc::new(MockNotifier::default());
        seed_document(&store).await;

        let scheduler = scheduler_at(9, store.clone(), notifier.clone());
        scheduler.tick().await.unwrap();
        scheduler.tick().await.unwrap();

        assert_eq!(notifier.broadcasts.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_nothing_due_off_hours() {
        let store = Arc::new(CheckinStore::open_in_memory().unwrap());
        let notifier = Arc::new(MockNotifier::default());
        seed_document(&store).await;

        let scheduler = scheduler_at(11, store.clone(), notifier.clone());
        scheduler.tick().await.unwrap();

        assert!(notifier.broadcasts.lock().await.is_empty());
        assert!(notifier.privates.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_run_exits_on_cancel() {
        let store = Arc::new(CheckinStore::open_in_memory().unwrap());
        let notifier = Arc::new(MockNotifier::default());
        let scheduler = scheduler_at(11, store, notifier);

        let cancel = CancellationToken::new();
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(2), scheduler.run(cancel))
            .await
            .expect("scheduler loop should exit promptly on cancel");
    }
}
