//! Data layer for the dog walk rotation service (`SQLite`).
//!
//! The schedule is small and single-household, so one `SQLite` file holds
//! all of it. Every multi-row change runs inside a single transaction so
//! a crash or a concurrent reader can never observe half of a weekly
//! reset.
//!
//! # Layout
//!
//! ```text
//! participants       (position, name)            roster in rotation order
//! weekday_slots      (weekday, name, completed,  seven rows, 0 = Sunday
//!                     reporter, completion_date)
//! rotation_pointers  (key, value)                current_index, next_index
//! meta               (key, value)                dog_name, dog_image
//! ```
//!
//! # Modules
//!
//! - [`sqlite`] -- `SQLite` connection pool, configuration, and migrations
//! - [`schedule_store`] -- Load, seed, and transactional schedule writes
//! - [`error`] -- Shared error types

pub mod error;
pub mod schedule_store;
pub mod sqlite;

// Re-export primary types for convenience.
pub use error::DbError;
pub use schedule_store::ScheduleStore;
pub use sqlite::{SqliteConfig, SqliteStore};
