//! Server binary for the dog walk rotation service.
//!
//! Loads configuration, prepares the `SQLite` store, and serves the HTTP
//! and `WebSocket` API until the process is terminated.
//!
//! # Startup Sequence
//!
//! 1. Load configuration (first argument, `DOGROTA_CONFIG`, or
//!    `dogrota-config.yaml`; defaults when the file is absent)
//! 2. Initialize structured logging (tracing)
//! 3. Open the database and run migrations
//! 4. Seed the schedule if the database is empty
//! 5. Build the schedule service on the system clock
//! 6. Serve requests

mod error;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use dogrota_core::config::{LogFormat, StorageSection};
use dogrota_core::{AppConfig, Clock, SystemClock};
use dogrota_db::{ScheduleStore, SqliteConfig, SqliteStore};
use dogrota_observer::{AppState, ScheduleService, ServerConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::AppError;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "dogrota-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, storage, or the server fails.
#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Load configuration.
    let config_path = config_path(std::env::args().nth(1), std::env::var("DOGROTA_CONFIG").ok());
    let config = load_config(&config_path)?;

    // 2. Initialize structured logging.
    init_tracing(&config)?;
    info!(config = %config_path.display(), "dogrota-server starting");

    // 3. Open the database.
    let sqlite = sqlite_config(&config.storage);
    let store = SqliteStore::connect(&sqlite).await?;
    store.run_migrations().await?;

    // 4. Seed on first start.
    let seed = config.seed.to_state()?;
    if ScheduleStore::new(store.pool()).seed_if_empty(&seed).await? {
        info!(
            participants = seed.roster.len(),
            dog_name = seed.meta.dog_name(),
            "Seeded empty database"
        );
    }

    // 5. Build the service.
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let service = Arc::new(ScheduleService::new(store.clone(), clock));
    let state = Arc::new(AppState::new(service, &config.storage.upload_dir));

    // 6. Serve.
    let server = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };
    let result = dogrota_observer::start_server(&server, state).await;
    store.close().await;
    result?;

    info!("dogrota-server stopped");
    Ok(())
}

/// Resolve the configuration path: CLI argument, then environment, then
/// the default file name.
fn config_path(arg: Option<String>, env: Option<String>) -> PathBuf {
    arg.or(env)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

/// Load configuration from `path`, falling back to defaults (with
/// environment overrides) if the file does not exist.
fn load_config(path: &Path) -> Result<AppConfig, AppError> {
    if path.exists() {
        Ok(AppConfig::from_file(path)?)
    } else {
        Ok(AppConfig::parse("")?)
    }
}

/// Pool settings for the configured storage section.
fn sqlite_config(storage: &StorageSection) -> SqliteConfig {
    SqliteConfig::new(&storage.database_url)
        .with_max_connections(storage.max_connections)
        .with_connect_timeout(Duration::from_secs(storage.connect_timeout_secs))
        .with_idle_timeout(storage.idle_timeout_secs.map(Duration::from_secs))
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_tracing(config: &AppConfig) -> Result<(), AppError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let installed = match config.logging.format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| AppError::Logging {
        message: e.to_string(),
    })
}
