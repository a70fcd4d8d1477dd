//! Rotation engine, calendar clock, and configuration for the dog walk
//! rotation service.
//!
//! This crate owns the decision logic: which day of the week it is on the
//! service's Sunday-first calendar, who is on duty, when a new week has
//! begun, and how the Saturday round-robin advances. Everything here is
//! pure and synchronous; persistence and transport live in `dogrota-db`
//! and `dogrota-observer`.
//!
//! # Modules
//!
//! - [`clock`] -- [`Clock`] trait with system and fixed implementations.
//! - [`config`] -- Configuration loading from `dogrota-config.yaml` into
//!   strongly-typed structs, including the seed schedule.
//! - [`error`] -- [`RotationError`], the error surfaced by schedule commands.
//! - [`rotation`] -- The rotation engine: pure functions over
//!   [`FullState`](dogrota_types::FullState) that return write plans.
//!
//! [`Clock`]: clock::Clock
//! [`RotationError`]: error::RotationError

pub mod clock;
pub mod config;
pub mod error;
pub mod rotation;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{AppConfig, ConfigError};
pub use error::RotationError;
pub use rotation::{CompletionReport, WeeklyReset};
