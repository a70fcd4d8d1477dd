//! Errors surfaced by schedule queries and commands.

/// Errors that can occur while reading or changing the schedule.
#[derive(Debug, thiserror::Error)]
pub enum RotationError {
    /// The reporting name is not on the roster. Nothing was changed.
    #[error("invalid participant: {name}")]
    InvalidParticipant {
        /// The rejected name.
        name: String,
    },

    /// A replacement roster was rejected.
    #[error("invalid roster: {reason}")]
    InvalidRoster {
        /// Why the roster was rejected.
        reason: String,
    },

    /// A replacement weekday map was rejected.
    #[error("invalid schedule: {reason}")]
    InvalidSchedule {
        /// Why the mapping was rejected.
        reason: String,
    },

    /// The backing store could not be read or written.
    #[error("storage unavailable: {message}")]
    StorageUnavailable {
        /// Description of the storage failure.
        message: String,
    },
}
