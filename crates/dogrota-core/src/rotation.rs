//! The rotation engine.
//!
//! Pure decision logic over a [`FullState`] value: it never touches
//! storage. Operations that change state return a plan ([`WeeklyReset`],
//! [`CompletionReport`]) describing exactly which fields to write. The
//! store applies a plan in one transaction; [`WeeklyReset::apply`] and
//! [`CompletionReport::apply`] perform the same change on an in-memory
//! state so callers can project the post-write state without re-reading.
//!
//! # Calendar
//!
//! The service numbers days Sunday-first (`0 = Sunday` .. `6 = Saturday`),
//! while `chrono` numbers them Monday-first. [`compute_weekday`] performs
//! the remap `(monday_index + 1) mod 7`.
//!
//! # Rules
//!
//! - Sunday to Friday are assigned statically from the weekday map.
//! - Saturday goes round-robin over the roster via the current pointer.
//! - A weekday query that sees a completed slot *later* in the week than
//!   today concludes the week has rolled over and resets every slot.
//!   Saturday never triggers the reset.
//! - Reporting Saturday as the participant on duty moves the next pointer
//!   one step along the roster; anyone else reporting pins it in place.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate};
use dogrota_types::{FullState, RotationPointers, WeekdayIndex, WeekdaySlot};

use crate::error::RotationError;

/// Placeholder shown when no assignee can be determined.
pub const UNASSIGNED: &str = "-";

// ---------------------------------------------------------------------------
// Calendar
// ---------------------------------------------------------------------------

/// Map a calendar date to the service's Sunday-first weekday index.
pub fn compute_weekday(date: NaiveDate) -> WeekdayIndex {
    let sunday_first = match date.weekday().num_days_from_monday() {
        6 => 0,
        monday_first => monday_first.saturating_add(1),
    };
    WeekdayIndex::new(u8::try_from(sunday_first).unwrap_or(0)).unwrap_or(WeekdayIndex::SUNDAY)
}

/// Whether `idx` is one of the statically assigned days (Sunday to Friday).
pub const fn is_weekday(idx: WeekdayIndex) -> bool {
    !idx.is_saturday()
}

// ---------------------------------------------------------------------------
// Assignment
// ---------------------------------------------------------------------------

/// Roster index `index` taken modulo the roster length.
///
/// Returns `None` only for an empty roster.
fn wrap(index: usize, len: usize) -> Option<usize> {
    index.checked_rem(len)
}

/// The participant on duty this Saturday: `roster[current_index mod len]`.
pub fn saturday_assignee(state: &FullState) -> Option<&str> {
    let position = wrap(state.pointers.current_index, state.roster.len())?;
    state.roster.get(position).map(String::as_str)
}

/// Who is on duty on `idx`.
///
/// Sunday to Friday read the static weekday map regardless of the rotation
/// pointers; Saturday reads the roster at the current pointer.
pub fn today_assignee(state: &FullState, idx: WeekdayIndex) -> Option<&str> {
    if is_weekday(idx) {
        state.slot(idx).map(|slot| slot.name.as_str())
    } else {
        saturday_assignee(state)
    }
}

// ---------------------------------------------------------------------------
// Weekly reset
// ---------------------------------------------------------------------------

/// Whether the stored slots belong to a previous week.
///
/// True iff `idx` is Sunday to Friday and some slot strictly later in the
/// week is already completed.
pub fn detect_new_week(state: &FullState, idx: WeekdayIndex) -> bool {
    is_weekday(idx)
        && state
            .slots
            .iter()
            .any(|slot| slot.weekday > idx && slot.completed)
}

/// Writes performed by a weekly reset.
///
/// Every slot becomes pending and the current pointer takes the value of
/// the next pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklyReset {
    /// New value of the current pointer.
    pub current_index: usize,
}

impl WeeklyReset {
    /// Apply the reset to an in-memory state.
    pub fn apply(&self, state: &mut FullState) {
        for slot in &mut state.slots {
            slot.clear();
        }
        state.pointers.current_index = self.current_index;
    }
}

/// Plan the weekly reset for `state`.
pub const fn plan_weekly_reset(state: &FullState) -> WeeklyReset {
    WeeklyReset {
        current_index: state.pointers.next_index,
    }
}

/// Plan and apply a weekly reset to an in-memory state.
pub fn apply_weekly_reset(state: &mut FullState) -> WeeklyReset {
    let plan = plan_weekly_reset(state);
    plan.apply(state);
    plan
}

// ---------------------------------------------------------------------------
// Completion reports
// ---------------------------------------------------------------------------

/// Writes performed by a completion report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionReport {
    /// The slot being marked done.
    pub weekday: WeekdayIndex,
    /// Who reported it.
    pub reporter: String,
    /// When it was reported.
    pub date: NaiveDate,
    /// New value of the next pointer (Saturday reports only).
    pub next_index: Option<usize>,
}

impl CompletionReport {
    /// Apply the report to an in-memory state.
    pub fn apply(&self, state: &mut FullState) {
        if let Some(next) = self.next_index {
            state.pointers.next_index = next;
        }
        if let Some(slot) = state.slot_mut(self.weekday) {
            slot.complete(&self.reporter, self.date);
        }
    }
}

/// Validate and plan a completion report by `name` for day `idx`.
///
/// The slot is marked completed unconditionally, overwriting any stale
/// reporter or date. On Saturday the next pointer is evaluated against the
/// current pointer *before* the slot changes: the participant on duty moves
/// it to `(current + 1) mod len`, anyone else pins it to `current`.
///
/// # Errors
///
/// Returns [`RotationError::InvalidParticipant`] if `name` is not on the
/// roster.
pub fn report_completion(
    state: &FullState,
    name: &str,
    idx: WeekdayIndex,
    today: NaiveDate,
) -> Result<CompletionReport, RotationError> {
    if !state.has_participant(name) {
        return Err(RotationError::InvalidParticipant {
            name: name.to_owned(),
        });
    }

    let next_index = if idx.is_saturday() {
        let current = state.pointers.current_index;
        let on_duty = saturday_assignee(state) == Some(name);
        if on_duty {
            let len = state.roster.len();
            wrap(current, len)
                .and_then(|position| position.checked_add(1))
                .and_then(|advanced| wrap(advanced, len))
        } else {
            Some(current)
        }
    } else {
        None
    };

    Ok(CompletionReport {
        weekday: idx,
        reporter: name.to_owned(),
        date: today,
        next_index,
    })
}

// ---------------------------------------------------------------------------
// Reconfiguration
// ---------------------------------------------------------------------------

/// Validate a replacement roster.
///
/// Names are trimmed. The roster must be non-empty, contain no blank
/// names, and contain no duplicates (names are participant identity).
///
/// # Errors
///
/// Returns [`RotationError::InvalidRoster`] describing the first problem.
pub fn validate_roster(names: &[String]) -> Result<Vec<String>, RotationError> {
    if names.is_empty() {
        return Err(RotationError::InvalidRoster {
            reason: "roster must name at least one participant".to_owned(),
        });
    }

    let mut seen = BTreeSet::new();
    let mut roster = Vec::with_capacity(names.len());
    for raw in names {
        let name = raw.trim();
        if name.is_empty() {
            return Err(RotationError::InvalidRoster {
                reason: "participant names must not be blank".to_owned(),
            });
        }
        if !seen.insert(name) {
            return Err(RotationError::InvalidRoster {
                reason: format!("duplicate participant: {name}"),
            });
        }
        roster.push(name.to_owned());
    }
    Ok(roster)
}

/// Fold stored pointers into the bounds of a roster of `len` participants.
///
/// Lookups already take the pointers modulo the roster length, so folding
/// keeps the same Saturday assignee while keeping stored values in range.
pub fn fold_pointers(pointers: RotationPointers, len: usize) -> RotationPointers {
    RotationPointers {
        current_index: wrap(pointers.current_index, len).unwrap_or(0),
        next_index: wrap(pointers.next_index, len).unwrap_or(0),
    }
}

/// Build the seven weekday rows from a `weekday -> (name, completed)` map.
///
/// Every weekday `0..=6` must be present. Names are not checked against the
/// roster. A row seeded as completed carries no reporter or date.
///
/// # Errors
///
/// Returns [`RotationError::InvalidSchedule`] if a weekday is missing.
pub fn build_weekday_map(
    mapping: &BTreeMap<WeekdayIndex, (String, bool)>,
) -> Result<[WeekdaySlot; WeekdayIndex::COUNT], RotationError> {
    let rows: Vec<WeekdaySlot> = mapping
        .iter()
        .map(|(weekday, (name, completed))| {
            let mut slot = WeekdaySlot::pending(*weekday, name.trim());
            slot.completed = *completed;
            slot
        })
        .collect();

    WeekdaySlot::week_from_rows(rows).ok_or_else(|| {
        let missing: Vec<String> = WeekdayIndex::all()
            .filter(|weekday| !mapping.contains_key(weekday))
            .map(|weekday| weekday.to_string())
            .collect();
        RotationError::InvalidSchedule {
            reason: format!("missing weekdays: {}", missing.join(", ")),
        }
    })
}
