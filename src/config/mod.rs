//! Configuration management for tubefetch
//!
//! Settings are layered, lowest priority first:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables
//!
//! # Usage
//!
//! ```no_run
//! use tubefetch::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Server listening on: {}", config.server.bind_addr);
//! ```
//!
//! # Environment Variables
//!
//! Any key can be overridden with `TUBEFETCH__<section>__<key>`:
//! - `TUBEFETCH__SERVER__BIND_ADDR=127.0.0.1:9000`
//! - `TUBEFETCH__DOWNLOAD__CLEANUP_DELAY_SECS=30`
//! - `TUBEFETCH__DOWNLOAD__MAX_FILESIZE=1GB`
//!
//! `YT_COOKIES_B64` carries a base64-encoded cookie jar for login-gated
//! sources. It is only ever read from the environment.
//!
//! # Configuration File
//!
//! Loaded from `config/tubefetch.toml` unless `TUBEFETCH_CONFIG` points
//! elsewhere. A missing file is not an error.

mod models;
mod sources;
mod validation;

pub use crate::humanize::ByteSize;
pub use models::{
    Config, DownloadConfig, ProgressConfig, RetentionConfig, ServerConfig, ThumbnailConfig,
};
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file is malformed or a value
    /// fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from `path` plus environment and secrets
    pub fn load_with_file(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_with_secrets(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}
