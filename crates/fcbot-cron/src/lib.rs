//! fcbot-cron: the weekly checkpoint scheduler.
//!
//! Three checkpoints fire on the event day: the morning announcement
//! (which also resets the occurrence), the one-hour reminder, and the
//! starting report. Firing state is kept in the persisted document, so
//! a restart within the checkpoint hour cannot double-fire and nothing
//! is lost to process memory.

pub mod scheduler;

use chrono::Weekday;
use fcbot_core::clock::{EventSchedule, LocalMoment};
use fcbot_types::{CheckinDocument, CheckpointKind};

pub use scheduler::CheckinScheduler;

/// One (weekday, hour) firing point in the weekly cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    pub kind: CheckpointKind,
    pub weekday: Weekday,
    pub hour: u32,
}

/// The checkpoint table for a schedule.
pub fn checkpoints(schedule: &EventSchedule) -> [Checkpoint; 3] {
    [
        Checkpoint {
            kind: CheckpointKind::Morning,
            weekday: schedule.weekday,
            hour: schedule.morning_hour,
        },
        Checkpoint {
            kind: CheckpointKind::OneHour,
            weekday: schedule.weekday,
            hour: schedule.one_hour_hour,
        },
        Checkpoint {
            kind: CheckpointKind::Starting,
            weekday: schedule.weekday,
            hour: schedule.starting_hour,
        },
    ]
}

/// Checkpoints that should fire at this moment: local weekday and hour
/// match and the checkpoint has not already fired today. Hours missed
/// while the process was down are skipped, not caught up.
pub fn due_checkpoints(
    doc: &CheckinDocument,
    schedule: &EventSchedule,
    moment: &LocalMoment,
) -> Vec<CheckpointKind> {
    checkpoints(schedule)
        .iter()
        .filter(|cp| cp.weekday == moment.weekday && cp.hour == moment.hour)
        .filter(|cp| doc.last_fired.get(&cp.kind) != Some(&moment.date))
        .map(|cp| cp.kind)
        .collect()
}
