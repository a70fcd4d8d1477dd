//! Configuration loading and typed config structures for the rotation
//! service.
//!
//! The canonical configuration lives in `dogrota-config.yaml`. Every field
//! has a default, so an empty or missing file yields a runnable service
//! seeded with the two-person household schedule.

use std::collections::BTreeMap;
use std::path::Path;

use dogrota_types::{
    DOG_IMAGE_KEY, DOG_NAME_KEY, FullState, MetaConfig, RotationPointers, WeekdayIndex,
};
use serde::Deserialize;

use crate::error::RotationError;
use crate::rotation::{build_weekday_map, validate_roster};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The configured seed schedule is not usable.
    #[error("invalid seed schedule: {source}")]
    Seed {
        /// The underlying validation error.
        #[from]
        source: RotationError,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level service configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AppConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerSection,

    /// Persistence settings.
    #[serde(default)]
    pub storage: StorageSection,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Initial schedule written on first start.
    #[serde(default)]
    pub seed: SeedConfig,
}

impl AppConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override file values:
    /// - `DATABASE_URL` overrides `storage.database_url`
    /// - `DOGROTA_UPLOAD_DIR` overrides `storage.upload_dir`
    /// - `DOGROTA_HOST` overrides `server.host`
    /// - `DOGROTA_PORT` overrides `server.port`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Override settings with environment variables when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("DATABASE_URL") {
            self.storage.database_url = val;
        }
        if let Ok(val) = std::env::var("DOGROTA_UPLOAD_DIR") {
            self.storage.upload_dir = val;
        }
        if let Ok(val) = std::env::var("DOGROTA_HOST") {
            self.server.host = val;
        }
        if let Some(port) = std::env::var("DOGROTA_PORT")
            .ok()
            .and_then(|val| val.parse().ok())
        {
            self.server.port = port;
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSection {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Persistence settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageSection {
    /// `SQLite` connection URL.
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Maximum pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Seconds to wait for a pooled connection.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Seconds an idle connection is kept open; `null` keeps it forever.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: Option<u64>,

    /// Directory uploaded images are written to.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            max_connections: default_max_connections(),
            connect_timeout_secs: default_connect_timeout_secs(),
            idle_timeout_secs: default_idle_timeout_secs(),
            upload_dir: default_upload_dir(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Initial schedule written into an empty store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SeedConfig {
    /// Participants in rotation order.
    #[serde(default = "default_roster")]
    pub roster: Vec<String>,

    /// Static assignment per weekday (`0 = Sunday`). Every day must appear.
    #[serde(default = "default_weekday_map")]
    pub weekday_map: BTreeMap<u8, String>,

    /// The dog's display name.
    #[serde(default = "default_dog_name")]
    pub dog_name: String,

    /// Reference to the dog's image.
    #[serde(default)]
    pub dog_image: String,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            roster: default_roster(),
            weekday_map: default_weekday_map(),
            dog_name: default_dog_name(),
            dog_image: String::new(),
        }
    }
}

impl SeedConfig {
    /// Build the initial state: all slots pending, both pointers at zero.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Seed`] if the roster is invalid or the
    /// weekday map does not cover every day `0..=6`.
    pub fn to_state(&self) -> Result<FullState, ConfigError> {
        let roster = validate_roster(&self.roster)?;

        let mut mapping = BTreeMap::new();
        for (raw, name) in &self.weekday_map {
            let weekday =
                WeekdayIndex::new(*raw).ok_or_else(|| RotationError::InvalidSchedule {
                    reason: format!("weekday index {raw} is outside 0..=6"),
                })?;
            mapping.insert(weekday, (name.clone(), false));
        }
        let slots = build_weekday_map(&mapping)?;

        let mut meta = MetaConfig::new();
        meta.set(DOG_NAME_KEY, self.dog_name.as_str());
        meta.set(DOG_IMAGE_KEY, self.dog_image.as_str());

        Ok(FullState {
            roster,
            slots,
            pointers: RotationPointers::default(),
            meta,
        })
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_host() -> String {
    String::from("0.0.0.0")
}

const fn default_port() -> u16 {
    8000
}

fn default_database_url() -> String {
    String::from("sqlite://dogrota.sqlite")
}

const fn default_max_connections() -> u32 {
    5
}

const fn default_connect_timeout_secs() -> u64 {
    5
}

#[allow(clippy::unnecessary_wraps)]
const fn default_idle_timeout_secs() -> Option<u64> {
    Some(300)
}

fn default_upload_dir() -> String {
    String::from("uploads")
}

fn default_log_level() -> String {
    String::from("info")
}

fn default_roster() -> Vec<String> {
    vec![String::from("Eden"), String::from("Shaked")]
}

fn default_weekday_map() -> BTreeMap<u8, String> {
    (0..=6_u8)
        .map(|wd| {
            let name = if wd % 2 == 0 { "Eden" } else { "Shaked" };
            (wd, String::from(name))
        })
        .collect()
}

fn default_dog_name() -> String {
    String::from("Lucky")
}
