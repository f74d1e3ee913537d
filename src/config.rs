//! Configuration management for the `ringlogd` server.
//!
//! Settings are assembled in layers, lowest priority first: built-in defaults (matching
//! the original fixed constants — port 9000, capacity 10, a 10 second ticker, etc.), an
//! optional TOML file, and `RINGLOGD_`-prefixed environment variables. CLI flags (see
//! [`crate::cli`]) are applied last, directly onto the resulting [`Settings`] value.
//!
//! After assembly, [`Settings::validate`] checks that every field is usable before the
//! server binds a socket or opens the backing file, so a bad configuration fails fast
//! with a descriptive error instead of partway through startup.

use crate::error::LogError;
use crate::validation::{
    is_valid_capacity, is_valid_path, is_valid_period_secs, is_valid_port, is_valid_read_chunk_size,
};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default TCP port the server listens on.
pub const DEFAULT_PORT: u16 = 9000;
/// Default listen backlog.
pub const DEFAULT_BACKLOG: u32 = 3;
/// Default number of slots in the ring log.
pub const DEFAULT_CAPACITY: usize = 10;
/// Default period between Ticker timestamp commands.
pub const DEFAULT_TICKER_PERIOD_SECS: u64 = 10;
/// Default backing file path, matching the original `SOCK_DATA_FILE`.
pub const DEFAULT_FILE: &str = "/var/tmp/aesdsocketdata";
/// Default per-read socket chunk size.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 1024;

/// Assembled, validated server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// TCP port to listen on.
    pub port: u16,
    /// Listen backlog passed to the socket.
    pub backlog: u32,
    /// Number of command slots held by the ring log.
    pub capacity: usize,
    /// Seconds between Ticker timestamp commands.
    pub ticker_period_secs: u64,
    /// Path to the backing file mirrored by `LogStore`.
    pub file: PathBuf,
    /// Bytes read per socket `read` call.
    pub read_chunk_size: usize,
    /// `tracing-subscriber` `EnvFilter` directive, e.g. `"info"` or `"ringlogd=debug"`.
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            backlog: DEFAULT_BACKLOG,
            capacity: DEFAULT_CAPACITY,
            ticker_period_secs: DEFAULT_TICKER_PERIOD_SECS,
            file: PathBuf::from(DEFAULT_FILE),
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            log_filter: "info".to_string(),
        }
    }
}

impl Settings {
    /// Loads settings by layering defaults, an optional TOML file, and environment
    /// variables prefixed `RINGLOGD_`, then validates the result.
    pub fn load(config_path: Option<&Path>) -> Result<Self, LogError> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("RINGLOGD_"));

        let settings: Settings = figment
            .extract()
            .map_err(|err| LogError::Configuration(err.to_string()))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Checks every field for usability. Called by [`Settings::load`]; also useful after
    /// CLI flags have been applied on top of a loaded `Settings`.
    pub fn validate(&self) -> Result<(), LogError> {
        is_valid_port(self.port).map_err(|msg| LogError::Configuration(msg.to_string()))?;
        is_valid_capacity(self.capacity).map_err(|msg| LogError::Configuration(msg.to_string()))?;
        is_valid_period_secs(self.ticker_period_secs)
            .map_err(|msg| LogError::Configuration(msg.to_string()))?;
        is_valid_read_chunk_size(self.read_chunk_size)
            .map_err(|msg| LogError::Configuration(msg.to_string()))?;
        let file_str = self.file.to_string_lossy();
        is_valid_path(&file_str).map_err(|msg| LogError::Configuration(msg.to_string()))?;
        Ok(())
    }
}
