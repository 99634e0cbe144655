use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identity name reserved for the bot itself. Routes the anonymous
/// content-warning path and is never stored as a user identity.
pub const RESERVED_IDENTITY: &str = "feelings-checkin-bot";

// ──────────────────── Notification Slots ────────────────────

/// One of the three daily reminder buckets.
///
/// Wire form is the bare token users type (`"9"`, `"2"`, `"3"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Slot {
    #[serde(rename = "9")]
    Nine,
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "3")]
    Three,
}

impl Slot {
    /// All slots, in announcement order.
    pub const ALL: [Slot; 3] = [Slot::Nine, Slot::Two, Slot::Three];

    /// The token users type in `subscribe` / `unsubscribe`.
    pub fn token(self) -> &'static str {
        match self {
            Slot::Nine => "9",
            Slot::Two => "2",
            Slot::Three => "3",
        }
    }

    /// Human label used in replies ("9am", "2pm", "3pm").
    pub fn label(self) -> &'static str {
        match self {
            Slot::Nine => "9am",
            Slot::Two => "2pm",
            Slot::Three => "3pm",
        }
    }

    /// Parse a user-supplied slot token.
    pub fn from_token(token: &str) -> Option<Slot> {
        match token {
            "9" => Some(Slot::Nine),
            "2" => Some(Slot::Two),
            "3" => Some(Slot::Three),
            _ => None,
        }
    }
}

/// A scheduler checkpoint in the weekly cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointKind {
    /// Morning announcement; resets the occurrence.
    Morning,
    /// One-hour-to-go reminder.
    OneHour,
    /// Starting announcement with the content-warning report.
    Starting,
}

impl CheckpointKind {
    /// The slot whose subscribers this checkpoint notifies.
    pub fn slot(self) -> Slot {
        match self {
            CheckpointKind::Morning => Slot::Nine,
            CheckpointKind::OneHour => Slot::Two,
            CheckpointKind::Starting => Slot::Three,
        }
    }
}

// ──────────────────── State Document ────────────────────

/// A pseudonymous identity and its persistent request list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityRecord {
    /// Date the identity was last created or touched; drives retention.
    pub last_accessed: NaiveDate,
    /// Content-warning topics attached to this identity.
    #[serde(default)]
    pub requests: Vec<String>,
}

impl IdentityRecord {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            last_accessed: date,
            requests: Vec::new(),
        }
    }
}

/// The single persisted state document.
///
/// Every command and scheduler step reads the whole document, computes a
/// full replacement, and writes it back in one storage call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckinDocument {
    /// Identities marked present for the current occurrence.
    /// Invariant: every entry exists in `ids`; no duplicates.
    #[serde(default)]
    pub attending: Vec<String>,
    /// Topics submitted anonymously for the current occurrence.
    #[serde(default)]
    pub requests: Vec<String>,
    /// All known pseudonymous identities.
    /// Invariant: never contains [`RESERVED_IDENTITY`].
    #[serde(default)]
    pub ids: BTreeMap<String, IdentityRecord>,
    /// Per-slot subscriber sets.
    #[serde(default)]
    pub subscriptions: BTreeMap<Slot, BTreeSet<String>>,
    /// Calendar date each checkpoint last fired. Persisted here so a
    /// restart within the checkpoint hour cannot double-fire.
    #[serde(default)]
    pub last_fired: BTreeMap<CheckpointKind, NaiveDate>,
}

impl Default for CheckinDocument {
    fn default() -> Self {
        let mut doc = Self {
            attending: Vec::new(),
            requests: Vec::new(),
            ids: BTreeMap::new(),
            subscriptions: BTreeMap::new(),
            last_fired: BTreeMap::new(),
        };
        doc.normalize();
        doc
    }
}

impl CheckinDocument {
    /// Fill in slot keys missing from an older stored document.
    pub fn normalize(&mut self) {
        for slot in Slot::ALL {
            self.subscriptions.entry(slot).or_default();
        }
    }

    /// Subscribers of one slot.
    pub fn subscribers(&self, slot: Slot) -> &BTreeSet<String> {
        static EMPTY: BTreeSet<String> = BTreeSet::new();
        self.subscriptions.get(&slot).unwrap_or(&EMPTY)
    }

    pub fn subscribers_mut(&mut self, slot: Slot) -> &mut BTreeSet<String> {
        self.subscriptions.entry(slot).or_default()
    }

    /// Check the document invariants. Run after load and before commit.
    pub fn validate(&self) -> Result<(), DocumentError> {
        if self.ids.contains_key(RESERVED_IDENTITY) {
            return Err(DocumentError::ReservedIdentityStored);
        }
        let mut seen = BTreeSet::new();
        for id in &self.attending {
            if !self.ids.contains_key(id) {
                return Err(DocumentError::UnknownAttendee(id.clone()));
            }
            if !seen.insert(id) {
                return Err(DocumentError::DuplicateAttendee(id.clone()));
            }
        }
        Ok(())
    }
}

/// Invariant violations found in a stored or computed document.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("reserved identity `{RESERVED_IDENTITY}` stored as a user identity")]
    ReservedIdentityStored,
    #[error("attending identity `{0}` has no identity record")]
    UnknownAttendee(String),
    #[error("identity `{0}` appears in attending more than once")]
    DuplicateAttendee(String),
}

// ──────────────────── Channel Types ────────────────────

/// Where an inbound message arrived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageOrigin {
    Private,
    Stream { stream: String, topic: String },
}

/// Delivery target for an outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Recipient {
    Private { email: String },
    Stream { stream: String, topic: String },
}

/// Message from the chat transport to the bot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// External sender identifier (Zulip email).
    pub sender_id: String,
    /// Display name of the sender.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    /// Message text content.
    pub content: String,
    /// Where the message arrived.
    pub origin: MessageOrigin,
    /// Message timestamp (unix millis).
    pub timestamp: i64,
}

impl InboundMessage {
    /// The recipient a reply to this message should go to.
    pub fn reply_recipient(&self) -> Recipient {
        match &self.origin {
            MessageOrigin::Private => Recipient::Private {
                email: self.sender_id.clone(),
            },
            MessageOrigin::Stream { stream, topic } => Recipient::Stream {
                stream: stream.clone(),
                topic: topic.clone(),
            },
        }
    }
}

/// Message from the bot to the chat transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub recipient: Recipient,
    pub content: String,
}

/// Status of the chat channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChannelStatus {
    /// Channel is not running.
    Stopped,
    /// Channel is initializing.
    Starting,
    /// Channel is running and accepting messages.
    Running,
    /// Channel encountered an error.
    Error(String),
}
