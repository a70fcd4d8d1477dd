//! Schedule service and HTTP API for the dog walk rotation service.
//!
//! This crate provides:
//!
//! - **[`ScheduleService`]** -- the query/command facade over the store
//!   and the rotation engine: builds snapshots (with lazy weekly reset),
//!   marks walks done, and applies reconfiguration
//! - **[`UpdateNotifier`]** -- best-effort fan-out of snapshots to every
//!   subscribed observer
//! - **REST endpoints** for the snapshot, commands, and the dog's image
//! - **`WebSocket` endpoint** (`/ws`) streaming an `init` snapshot on
//!   connect and an `update` snapshot after every change
//!
//! # Architecture
//!
//! ```text
//! POST /mark_done --> ScheduleService --(write boundary)--> ScheduleStore
//!                          |
//!                          +--> UpdateNotifier --> each /ws observer
//! ```
//!
//! The service serializes every mutation (and any read that has to apply
//! the weekly reset) behind one exclusion boundary. The notifier keeps its
//! own lock so slow observers never hold up store writes.

pub mod error;
pub mod handlers;
pub mod images;
pub mod notifier;
pub mod router;
pub mod server;
pub mod service;
pub mod startup;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use error::ObserverError;
pub use notifier::{Subscription, UpdateNotifier};
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use service::ScheduleService;
pub use startup::{RunningServer, StartupError, spawn_server};
pub use state::AppState;
