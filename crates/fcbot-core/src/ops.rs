//! Command application against the checkin document.
//!
//! Every operation is a pure function: it inspects the current document
//! and either fails with a reply (leaving the document untouched) or
//! produces both a reply and the complete replacement document. The
//! caller commits the replacement in one storage write.

use fcbot_types::{CheckinDocument, IdentityRecord, RESERVED_IDENTITY, Slot};

use crate::clock::{EventSchedule, LocalMoment};
use crate::command::Command;
use crate::text;

/// The result of applying one command.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutcome {
    /// Reply shown to the caller.
    pub reply: String,
    /// Full replacement document, present only when state changed.
    pub updated: Option<CheckinDocument>,
}

impl CommandOutcome {
    fn reply_only(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            updated: None,
        }
    }

    fn changed(reply: impl Into<String>, doc: CheckinDocument) -> Self {
        Self {
            reply: reply.into(),
            updated: Some(doc),
        }
    }
}

/// Apply a parsed command for `caller` at the given local moment.
pub fn apply_command(
    doc: &CheckinDocument,
    cmd: &Command,
    caller: &str,
    schedule: &EventSchedule,
    now: &LocalMoment,
) -> CommandOutcome {
    match cmd {
        Command::Help => CommandOutcome::reply_only(text::USAGE),
        Command::ListCommands => CommandOutcome::reply_only(text::list_commands_reply()),
        Command::MakeId { id } => make_id(doc, id, now.date),
        Command::CwRequest { id, topics } => match id {
            None => add_anonymous_requests(doc, topics, schedule, now),
            Some(id) => set_identity_requests(doc, id, topics, now.date),
        },
        Command::WillAttend { id } => mark_attendance(doc, id, true, schedule, now),
        Command::WillNotAttend { id } => mark_attendance(doc, id, false, schedule, now),
        Command::Subscribe { slots } => manage_subscriptions(doc, slots, caller, true),
        Command::Unsubscribe { slots } => manage_subscriptions(doc, slots, caller, false),
    }
}

fn make_id(doc: &CheckinDocument, id: &str, date: chrono::NaiveDate) -> CommandOutcome {
    if id == RESERVED_IDENTITY {
        return CommandOutcome::reply_only("You can't use that ID!");
    }
    if doc.ids.contains_key(id) {
        return CommandOutcome::reply_only("I already know that ID.");
    }
    let mut updated = doc.clone();
    updated.ids.insert(id.to_string(), IdentityRecord::new(date));
    CommandOutcome::changed(format!("Made ID `{id}`"), updated)
}

/// Anonymous path: topics accumulate on the occurrence itself. Only
/// accepted inside the submission window.
fn add_anonymous_requests(
    doc: &CheckinDocument,
    topics: &[String],
    schedule: &EventSchedule,
    now: &LocalMoment,
) -> CommandOutcome {
    if !schedule.submission_window_contains(now) {
        return CommandOutcome::reply_only(text::WRONG_TIME);
    }
    let mut updated = doc.clone();
    updated.requests.extend(topics.iter().cloned());
    CommandOutcome::changed(
        format!(
            "The following topics were added to today's content warnings: {}",
            topics.join(", ")
        ),
        updated,
    )
}

/// Named path: overwrites the identity's request list. Not time-gated.
fn set_identity_requests(
    doc: &CheckinDocument,
    id: &str,
    topics: &[String],
    date: chrono::NaiveDate,
) -> CommandOutcome {
    let Some(record) = doc.ids.get(id) else {
        return CommandOutcome::reply_only(format!("I don't know `{id}`"));
    };
    let mut record = record.clone();
    record.requests = topics.to_vec();
    record.last_accessed = date;
    let mut updated = doc.clone();
    updated.ids.insert(id.to_string(), record);
    CommandOutcome::changed(
        format!(
            "I set the following topics as {id}'s content warnings: {}",
            topics.join(", ")
        ),
        updated,
    )
}

fn mark_attendance(
    doc: &CheckinDocument,
    id: &str,
    attending: bool,
    schedule: &EventSchedule,
    now: &LocalMoment,
) -> CommandOutcome {
    if !schedule.submission_window_contains(now) {
        return CommandOutcome::reply_only(text::WRONG_TIME_SHORT);
    }
    if !doc.ids.contains_key(id) {
        return CommandOutcome::reply_only(format!("I don't know {id}"));
    }

    let mut updated = doc.clone();
    let state = if attending {
        // Idempotent: repeat attends do not duplicate the entry.
        if !updated.attending.iter().any(|a| a == id) {
            updated.attending.push(id.to_string());
        }
        "attending"
    } else {
        let Some(pos) = updated.attending.iter().position(|a| a == id) else {
            return CommandOutcome::reply_only("You weren't marked as attending to start with.");
        };
        updated.attending.remove(pos);
        "not attending"
    };
    if let Some(record) = updated.ids.get_mut(id) {
        record.last_accessed = now.date;
    }
    CommandOutcome::changed(format!("I marked {id} as {state}."), updated)
}

fn manage_subscriptions(
    doc: &CheckinDocument,
    slot_tokens: &[String],
    caller: &str,
    subscribe: bool,
) -> CommandOutcome {
    // Resolve every token before touching anything, so an unknown slot
    // aborts the whole command with nothing half-applied.
    let slots: Vec<Slot> = if slot_tokens.is_empty() {
        Slot::ALL.to_vec()
    } else {
        let mut slots = Vec::with_capacity(slot_tokens.len());
        for token in slot_tokens {
            match Slot::from_token(token) {
                Some(slot) => slots.push(slot),
                None => {
                    return CommandOutcome::reply_only(format!(
                        "{token} isn't in the list of notifications I understand. \
Type `list-commands` for more information and try again!"
                    ));
                }
            }
        }
        slots
    };

    let mut updated = doc.clone();
    let mut reply = String::new();
    let mut changed_labels = Vec::new();

    for slot in slots {
        let subscribers = updated.subscribers_mut(slot);
        if subscribe {
            if subscribers.contains(caller) {
                reply.push_str(&format!(
                    "You're already subscribed to a notification for {}. ",
                    slot.label()
                ));
            } else {
                subscribers.insert(caller.to_string());
                changed_labels.push(slot.label());
            }
        } else if subscribers.remove(caller) {
            changed_labels.push(slot.label());
        } else {
            reply.push_str(&format!(
                "You're not subscribed to a notification for {}. ",
                slot.label()
            ));
        }
    }

    if changed_labels.is_empty() {
        return CommandOutcome::reply_only(reply);
    }
    reply.push_str(&format!(
        "I updated your subscription for these notifications: {}",
        changed_labels.join(" ")
    ));
    CommandOutcome::changed(reply, updated)
}
