//! Configuration management for teradrop
//!
//! Settings are layered, lowest priority first:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables
//!
//! # Usage
//!
//! ```no_run
//! use teradrop::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Resolver endpoint: {}", config.resolver.endpoint);
//! ```
//!
//! # Environment Variables
//!
//! Any setting can be overridden with `TERADROP__<section>__<key>`:
//! - `TERADROP__SERVER__BIND_ADDR=0.0.0.0:9000`
//! - `TERADROP__RESOLVER__MAX_RETRIES=5`
//! - `TERADROP__DOWNLOAD__MAX_FILE_SIZE=50MB`
//!
//! Secrets are read from plain variables: `TELEGRAM_BOT_TOKEN` (or `BOT_TOKEN`)
//! and `TELEGRAM_WEBHOOK_SECRET`.
//!
//! # Configuration File
//!
//! Loaded from `config/teradrop.toml` unless `TERADROP_CONFIG` points elsewhere.

mod models;
mod sources;
mod validation;

pub use crate::humanize::ByteSize;
pub use models::{
    Config, DownloadConfig, LinksConfig, ResolverConfig, RetentionConfig, ServerConfig,
    StoreConfig, TelegramConfig, TelemetryConfig,
};
pub use sources::load_secrets;
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
    /// Load configuration from all sources (file + environment) and validate it
    ///
    /// # Errors
    ///
    /// Returns an error if the file is malformed or a required setting
    /// (bot token, sane limits, compilable link patterns) is missing.
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration for commands that never call Telegram
    ///
    /// Same sources as [`Config::load`] but the bot token is optional.
    pub fn load_local() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate_local(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path, with secrets from the environment
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let mut config = sources::load_from_sources(path)?;
        sources::load_secrets(&mut config, |key| std::env::var(key).ok());
        validation::validate(&config)?;
        Ok(config)
    }

    /// Validate an already assembled configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate(self)
    }

    /// Validate everything except the bot token
    pub fn validate_local(&self) -> Result<(), ValidationError> {
        validation::validate_local(self)
    }
}
