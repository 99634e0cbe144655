//! fcbot-core: command interpretation and state management.
//!
//! Inbound text goes through [`command::parse_command`] into a typed
//! [`command::Command`], which [`ops::apply_command`] applies against the
//! persisted document as a pure function: the full replacement state is
//! computed and validated before anything is written, so a failed
//! operation never leaves a partial mutation behind.

pub mod clock;
pub mod command;
pub mod engine;
pub mod notify;
pub mod occurrence;
pub mod ops;
pub mod text;

pub use clock::{EventClock, EventSchedule, FixedClock, LocalMoment, SystemClock};
pub use command::{Command, ParseError, parse_command};
pub use engine::{CheckinEngine, EngineError};
pub use notify::Notifier;
pub use ops::{CommandOutcome, apply_command};
