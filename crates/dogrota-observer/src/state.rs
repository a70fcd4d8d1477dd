//! Shared application state for the HTTP server.
//!
//! [`AppState`] bundles the [`ScheduleService`] with the transport-level
//! settings the handlers need. It is wrapped in [`Arc`] and injected via
//! Axum's `State` extractor.

use std::path::PathBuf;
use std::sync::Arc;

use crate::service::ScheduleService;

/// Shared state for the Axum application.
#[derive(Clone)]
pub struct AppState {
    /// The schedule facade.
    pub service: Arc<ScheduleService>,
    /// Directory uploaded images are written to.
    pub upload_dir: PathBuf,
}

impl AppState {
    /// Create application state around a service.
    pub fn new(service: Arc<ScheduleService>, upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            service,
            upload_dir: upload_dir.into(),
        }
    }
}
