//! Persisted schedule state.
//!
//! Covers the weekday calendar index, the seven per-weekday slots, the
//! Saturday rotation pointers and the free-form meta table. [`FullState`]
//! bundles all of them into the single value that the rotation engine
//! reasons about and the store reconstructs on every load.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Meta key holding the dog's display name.
pub const DOG_NAME_KEY: &str = "dog_name";

/// Meta key holding the reference to the dog's image.
pub const DOG_IMAGE_KEY: &str = "dog_image";

/// Pointer key for the roster index on duty this Saturday.
pub const CURRENT_INDEX_KEY: &str = "current_index";

/// Pointer key for the roster index that becomes current at the next reset.
pub const NEXT_INDEX_KEY: &str = "next_index";

// ---------------------------------------------------------------------------
// WeekdayIndex
// ---------------------------------------------------------------------------

/// Day of the week on the service's calendar, `0 = Sunday` .. `6 = Saturday`.
///
/// The inner value is always in `0..=6`; construction goes through
/// [`WeekdayIndex::new`] or `TryFrom<u8>`, and deserialization rejects
/// anything out of range.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(try_from = "u8", into = "u8")]
#[ts(export, export_to = "bindings/")]
pub struct WeekdayIndex(u8);

impl WeekdayIndex {
    /// Number of days in a week.
    pub const COUNT: usize = 7;

    /// Sunday, the first day of the service's week.
    pub const SUNDAY: Self = Self(0);

    /// Saturday, the round-robin day.
    pub const SATURDAY: Self = Self(6);

    /// Create an index, returning `None` if `value > 6`.
    pub const fn new(value: u8) -> Option<Self> {
        if value <= 6 { Some(Self(value)) } else { None }
    }

    /// The raw index value.
    pub const fn get(self) -> u8 {
        self.0
    }

    /// The index as a `usize`, for positional access into a week.
    pub fn as_usize(self) -> usize {
        usize::from(self.0)
    }

    /// Whether this is Saturday.
    pub const fn is_saturday(self) -> bool {
        self.0 == 6
    }

    /// All seven days in calendar order, Sunday first.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..=6_u8).map(Self)
    }

    /// Human-readable day label used in the weekly table.
    pub const fn label(self) -> &'static str {
        match self.0 {
            0 => "Sunday",
            1 => "Monday",
            2 => "Tuesday",
            3 => "Wednesday",
            4 => "Thursday",
            5 => "Friday",
            _ => "Saturday",
        }
    }
}

impl core::fmt::Display for WeekdayIndex {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned when a raw value is not a valid weekday index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("weekday index {0} is outside 0..=6")]
pub struct InvalidWeekday(pub u8);

impl TryFrom<u8> for WeekdayIndex {
    type Error = InvalidWeekday;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(InvalidWeekday(value))
    }
}

impl From<WeekdayIndex> for u8 {
    fn from(idx: WeekdayIndex) -> Self {
        idx.0
    }
}

// ---------------------------------------------------------------------------
// WeekdaySlot
// ---------------------------------------------------------------------------

/// Assignment and completion record for one weekday of the current week.
///
/// A pending slot always has an empty `reporter` and no `completion_date`.
/// For Saturday the stored `name` is never shown; the assignee is derived
/// from [`RotationPointers`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekdaySlot {
    /// Which day this slot belongs to.
    pub weekday: WeekdayIndex,
    /// Participant statically assigned to this day.
    pub name: String,
    /// Whether the walk was reported done this week.
    pub completed: bool,
    /// Who reported it (empty while pending).
    pub reporter: String,
    /// When it was reported (`None` while pending).
    pub completion_date: Option<NaiveDate>,
}

impl WeekdaySlot {
    /// A pending slot assigned to `name`.
    pub fn pending(weekday: WeekdayIndex, name: impl Into<String>) -> Self {
        Self {
            weekday,
            name: name.into(),
            completed: false,
            reporter: String::new(),
            completion_date: None,
        }
    }

    /// Clear the completion fields, keeping the assignment.
    pub fn clear(&mut self) {
        self.completed = false;
        self.reporter.clear();
        self.completion_date = None;
    }

    /// Mark the slot completed by `reporter` on `date`.
    pub fn complete(&mut self, reporter: &str, date: NaiveDate) {
        self.completed = true;
        reporter.clone_into(&mut self.reporter);
        self.completion_date = Some(date);
    }

    /// Arrange arbitrary rows into a full week.
    ///
    /// Returns `None` unless every weekday `0..=6` appears exactly once.
    pub fn week_from_rows(mut rows: Vec<Self>) -> Option<[Self; WeekdayIndex::COUNT]> {
        rows.sort_by_key(|slot| slot.weekday);
        let in_order = rows
            .iter()
            .zip(WeekdayIndex::all())
            .all(|(slot, expected)| slot.weekday == expected);
        if !in_order {
            return None;
        }
        rows.try_into().ok()
    }
}

// ---------------------------------------------------------------------------
// RotationPointers
// ---------------------------------------------------------------------------

/// Identifies one of the two rotation pointers in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerKey {
    /// The roster index on duty this Saturday.
    Current,
    /// The roster index that becomes current at the next weekly reset.
    Next,
}

impl PointerKey {
    /// Storage key for this pointer.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Current => CURRENT_INDEX_KEY,
            Self::Next => NEXT_INDEX_KEY,
        }
    }

    /// Parse a storage key.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            CURRENT_INDEX_KEY => Some(Self::Current),
            NEXT_INDEX_KEY => Some(Self::Next),
            _ => None,
        }
    }
}

/// Saturday round-robin pointers into the roster.
///
/// Both values are interpreted modulo the roster length wherever they are
/// used to look up a participant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationPointers {
    /// Whose turn it is this Saturday.
    pub current_index: usize,
    /// Whose turn it becomes at the next weekly reset.
    pub next_index: usize,
}

impl RotationPointers {
    /// Read the pointer identified by `key`.
    pub const fn get(&self, key: PointerKey) -> usize {
        match key {
            PointerKey::Current => self.current_index,
            PointerKey::Next => self.next_index,
        }
    }

    /// Overwrite the pointer identified by `key`.
    pub const fn set(&mut self, key: PointerKey, value: usize) {
        match key {
            PointerKey::Current => self.current_index = value,
            PointerKey::Next => self.next_index = value,
        }
    }
}

// ---------------------------------------------------------------------------
// MetaConfig
// ---------------------------------------------------------------------------

/// Free-form key/value settings unrelated to the rotation.
///
/// Holds at least [`DOG_NAME_KEY`] and [`DOG_IMAGE_KEY`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export, export_to = "bindings/")]
pub struct MetaConfig(pub BTreeMap<String, String>);

impl MetaConfig {
    /// An empty meta table.
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Look up a value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Insert or overwrite a value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// The dog's display name, empty if unset.
    pub fn dog_name(&self) -> &str {
        self.get(DOG_NAME_KEY).unwrap_or_default()
    }

    /// The dog's image reference, empty if unset.
    pub fn dog_image(&self) -> &str {
        self.get(DOG_IMAGE_KEY).unwrap_or_default()
    }

    /// Iterate over all entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

// ---------------------------------------------------------------------------
// FullState
// ---------------------------------------------------------------------------

/// Everything persisted about the schedule, as one value.
///
/// `slots[i].weekday == i` for every position; the array length makes
/// "exactly one slot per weekday" structural.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullState {
    /// Participants in rotation order.
    pub roster: Vec<String>,
    /// The seven weekday slots, Sunday first.
    pub slots: [WeekdaySlot; WeekdayIndex::COUNT],
    /// Saturday rotation pointers.
    pub pointers: RotationPointers,
    /// Non-schedule settings.
    pub meta: MetaConfig,
}

impl FullState {
    /// The slot for `weekday`.
    pub fn slot(&self, weekday: WeekdayIndex) -> Option<&WeekdaySlot> {
        self.slots.get(weekday.as_usize())
    }

    /// Mutable access to the slot for `weekday`.
    pub fn slot_mut(&mut self, weekday: WeekdayIndex) -> Option<&mut WeekdaySlot> {
        self.slots.get_mut(weekday.as_usize())
    }

    /// Whether `name` is on the roster.
    pub fn has_participant(&self, name: &str) -> bool {
        self.roster.iter().any(|member| member == name)
    }
}
