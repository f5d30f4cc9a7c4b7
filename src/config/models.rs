use crate::humanize::ByteSize;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub download: DownloadConfig,
    #[serde(default)]
    pub links: LinksConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// HTTP control surface
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    /// Largest webhook body accepted
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: ByteSize,
    /// How long shutdown waits for in-flight updates
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            max_body_bytes: default_max_body_bytes(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

impl ServerConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_max_body_bytes() -> ByteSize {
    ByteSize::mib(1)
}

fn default_shutdown_timeout_secs() -> u64 {
    60
}

/// Bot API settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Archive channel receiving a copy of every delivered file
    pub store_channel: Option<i64>,
    /// Operator channel receiving failure reports
    pub error_channel: Option<i64>,
    #[serde(default = "default_telegram_timeout_secs")]
    pub timeout_secs: u64,
    /// Bot token (loaded from environment, not from config file)
    #[serde(skip)]
    pub bot_token: Option<String>,
    /// Webhook secret token (loaded from environment, not from config file)
    #[serde(skip)]
    pub webhook_secret: Option<String>,
}

impl TelegramConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            store_channel: None,
            error_channel: None,
            timeout_secs: default_telegram_timeout_secs(),
            bot_token: None,
            webhook_secret: None,
        }
    }
}

fn default_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_telegram_timeout_secs() -> u64 {
    120
}

/// Link resolver API settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolverConfig {
    #[serde(default = "default_resolver_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_resolver_timeout_secs")]
    pub timeout_secs: u64,
    /// Total attempts for retryable failures (including the first)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl ResolverConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            endpoint: default_resolver_endpoint(),
            timeout_secs: default_resolver_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_resolver_endpoint() -> String {
    "https://my-noor-queen-api.woodmirror.workers.dev/api".to_string()
}

fn default_resolver_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

/// File fetcher settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloadConfig {
    #[serde(default = "default_download_dir")]
    pub directory: PathBuf,
    #[serde(default = "default_max_file_size")]
    pub max_file_size: ByteSize,
    #[serde(default = "default_download_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: ByteSize,
    /// Remove delivered files and everything left at shutdown
    #[serde(default = "default_true")]
    pub cleanup: bool,
    /// Keep partially written files after a failed transfer
    #[serde(default)]
    pub keep_failed: bool,
}

impl DownloadConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            directory: default_download_dir(),
            max_file_size: default_max_file_size(),
            timeout_secs: default_download_timeout_secs(),
            chunk_size: default_chunk_size(),
            cleanup: true,
            keep_failed: false,
        }
    }
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_max_file_size() -> ByteSize {
    ByteSize::mib(2000)
}

fn default_download_timeout_secs() -> u64 {
    3600
}

fn default_chunk_size() -> ByteSize {
    ByteSize::mib(1)
}

fn default_true() -> bool {
    true
}

/// Link extraction patterns
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LinksConfig {
    #[serde(default = "default_link_patterns")]
    pub patterns: Vec<String>,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            patterns: default_link_patterns(),
        }
    }
}

fn default_link_patterns() -> Vec<String> {
    crate::links::DEFAULT_PATTERNS
        .iter()
        .map(|p| p.to_string())
        .collect()
}

/// User record store
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    /// Oldest history entries are dropped beyond this count
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            history_limit: default_history_limit(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("data/users")
}

fn default_history_limit() -> usize {
    100
}

/// Retention configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetentionConfig {
    #[serde(default = "default_logs_ttl_days")]
    pub logs_ttl_days: u32,
}

impl RetentionConfig {
    pub fn logs_ttl(&self) -> Duration {
        Duration::from_secs(u64::from(self.logs_ttl_days) * 24 * 60 * 60)
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            logs_ttl_days: default_logs_ttl_days(),
        }
    }
}

fn default_logs_ttl_days() -> u32 {
    30
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    /// Default filter when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
