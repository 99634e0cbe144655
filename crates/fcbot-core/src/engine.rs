//! The command engine: parse, load, apply, commit, reply.

use std::sync::Arc;

use tracing::debug;

use fcbot_storage::{CheckinStore, StorageError};

use crate::clock::{EventClock, EventSchedule};
use crate::command::{Command, ParseError, parse_command};
use crate::ops::apply_command;
use crate::text;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Applies inbound command text against the persisted document.
pub struct CheckinEngine {
    store: Arc<CheckinStore>,
    clock: Arc<dyn EventClock>,
    schedule: EventSchedule,
}

impl CheckinEngine {
    pub fn new(store: Arc<CheckinStore>, clock: Arc<dyn EventClock>, schedule: EventSchedule) -> Self {
        Self {
            store,
            clock,
            schedule,
        }
    }

    /// Handle one line of inbound text from `caller` and produce the
    /// reply. State errors (unknown identity, wrong time, ...) are
    /// ordinary replies; only storage faults surface as errors.
    pub async fn handle_message(&self, content: &str, caller: &str) -> Result<String, EngineError> {
        let cmd = match parse_command(content.trim()) {
            Ok(cmd) => cmd,
            Err(ParseError::Empty) => return Ok(text::NO_COMMAND.to_string()),
            Err(ParseError::UnknownVerb(verb)) => {
                debug!(verb, "Unrecognized command verb");
                return Ok(text::UNRECOGNIZED.to_string());
            }
            Err(ParseError::MissingArgs(verb)) => {
                debug!(verb, "Command missing arguments");
                return Ok(text::NOT_ENOUGH_ARGS.to_string());
            }
        };

        // Static replies need no state access
        match &cmd {
            Command::Help => return Ok(text::USAGE.to_string()),
            Command::ListCommands => return Ok(text::list_commands_reply()),
            _ => {}
        }

        let doc = self.store.load_or_init().await?;
        let now = self.clock.now();
        let outcome = apply_command(&doc, &cmd, caller, &self.schedule, &now);

        // Commit the full replacement in one write; save_document
        // re-validates so a bad transition can never be persisted.
        if let Some(updated) = &outcome.updated {
            self.store.save_document(updated).await?;
        }
        Ok(outcome.reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{FixedClock, LocalMoment};
    use chrono::NaiveDate;
    use fcbot_types::Slot;

    const CALLER: &str = "user@example.com";

    fn engine_at(hour: u32) -> CheckinEngine {
        // 2024-01-04 was a Thursday
        let moment = LocalMoment::new(NaiveDate::from_ymd_opt(2024, 1, 4).unwrap(), hour);
        CheckinEngine::new(
            Arc::new(CheckinStore::open_in_memory().unwrap()),
            Arc::new(FixedClock(moment)),
            EventSchedule::default(),
        )
    }

    #[tokio::test]
    async fn test_empty_input() {
        let engine = engine_at(10);
        let reply = engine.handle_message("  ", CALLER).await.unwrap();
        assert_eq!(reply, text::NO_COMMAND);
    }

    #[tokio::test]
    async fn test_unknown_verb() {
        let engine = engine_at(10);
        let reply = engine.handle_message("frobnicate", CALLER).await.unwrap();
        assert_eq!(reply, text::UNRECOGNIZED);
    }

    #[tokio::test]
    async fn test_missing_args() {
        let engine = engine_at(10);
        let reply = engine.handle_message("make-id", CALLER).await.unwrap();
        assert_eq!(reply, text::NOT_ENOUGH_ARGS);
    }

    #[tokio::test]
    async fn test_help_needs_no_state() {
        let engine = engine_at(10);
        let reply = engine.handle_message("help", CALLER).await.unwrap();
        assert_eq!(reply, text::USAGE);
        // The document was never created for a static reply
        assert!(engine.store.load_document().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_state_persists_across_commands() {
        let engine = engine_at(10);
        let reply = engine.handle_message("make-id alice", CALLER).await.unwrap();
        assert_eq!(reply, "Made ID `alice`");

        let reply = engine.handle_message("make-id alice", CALLER).await.unwrap();
        assert_eq!(reply, "I already know that ID.");

        let reply = engine
            .handle_message("cw-request -id alice -r spiders -r loud noises", CALLER)
            .await
            .unwrap();
        assert_eq!(
            reply,
            "I set the following topics as alice's content warnings: spiders, loud noises"
        );

        let doc = engine.store.load_or_init().await.unwrap();
        assert_eq!(doc.ids["alice"].requests, vec!["spiders", "loud noises"]);
    }

    #[tokio::test]
    async fn test_failed_operation_commits_nothing() {
        let engine = engine_at(17);
        let reply = engine
            .handle_message("cw-request -r spiders", CALLER)
            .await
            .unwrap();
        assert_eq!(reply, text::WRONG_TIME);

        let doc = engine.store.load_or_init().await.unwrap();
        assert!(doc.requests.is_empty());
    }

    #[tokio::test]
    async fn test_subscribe_all_reply() {
        let engine = engine_at(22);
        let reply = engine.handle_message("subscribe", CALLER).await.unwrap();
        assert_eq!(
            reply,
            "I updated your subscription for these notifications: 9am 2pm 3pm"
        );
        let doc = engine.store.load_or_init().await.unwrap();
        for slot in Slot::ALL {
            assert!(doc.subscribers(slot).contains(CALLER));
        }
    }

    #[tokio::test]
    async fn test_leading_whitespace_tolerated() {
        let engine = engine_at(10);
        let reply = engine
            .handle_message("   make-id alice  ", CALLER)
            .await
            .unwrap();
        assert_eq!(reply, "Made ID `alice`");
    }
}
