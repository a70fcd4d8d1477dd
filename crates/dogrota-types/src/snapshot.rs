//! The read-only projection of schedule state sent to clients.
//!
//! A [`Snapshot`] is what the `/today` endpoint returns and what every
//! streaming observer receives, wrapped in a [`StreamMessage`] that tells
//! the client whether it is the initial state or a change.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::schedule::{MetaConfig, WeekdayIndex};

/// One row of the weekly table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DayEntry {
    /// Which day this row describes.
    pub weekday: WeekdayIndex,
    /// Display label for the day.
    pub label: String,
    /// Who is on duty that day.
    pub name: String,
    /// Whether the walk was reported done.
    pub completed: bool,
    /// Who reported it (empty while pending).
    pub reporter: String,
    /// When it was reported.
    pub date: Option<NaiveDate>,
}

/// Full "today" view of the schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Snapshot {
    /// Today's calendar date.
    pub date: NaiveDate,
    /// Today's weekday index, `0 = Sunday`.
    pub weekday: WeekdayIndex,
    /// Who walks the dog today.
    pub today_name: String,
    /// Participants in rotation order.
    pub roster: Vec<String>,
    /// The week, Sunday first.
    pub shifts_table: Vec<DayEntry>,
    /// Non-schedule settings (dog name and image reference).
    pub meta: MetaConfig,
}

impl Snapshot {
    /// The table row for `weekday`.
    pub fn day(&self, weekday: WeekdayIndex) -> Option<&DayEntry> {
        self.shifts_table.iter().find(|entry| entry.weekday == weekday)
    }
}

/// Whether a streamed snapshot is the first one on a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum StreamKind {
    /// Sent once, immediately after subscribing.
    Init,
    /// Sent after every state change.
    Update,
}

/// Envelope for snapshots pushed over a streaming connection.
///
/// Serializes as `{"type": "init" | "update", "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct StreamMessage {
    /// Initial state or change notification.
    #[serde(rename = "type")]
    pub kind: StreamKind,
    /// The snapshot itself.
    pub payload: Snapshot,
}

impl StreamMessage {
    /// Wrap the snapshot sent right after subscribing.
    pub const fn init(payload: Snapshot) -> Self {
        Self {
            kind: StreamKind::Init,
            payload,
        }
    }

    /// Wrap a change notification.
    pub const fn update(payload: Snapshot) -> Self {
        Self {
            kind: StreamKind::Update,
            payload,
        }
    }
}
