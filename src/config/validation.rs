use super::models::Config;
use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Bot token missing: set TELEGRAM_BOT_TOKEN (or BOT_TOKEN)")]
    MissingBotToken,

    #[error("Resolver endpoint must be an http(s) URL, got '{0}'")]
    InvalidResolverEndpoint(String),

    #[error("resolver.max_retries must be at least 1")]
    ZeroRetries,

    #[error("Timeout must be positive: {field} = 0")]
    ZeroTimeout { field: &'static str },

    #[error("Size must be positive: {field} = 0")]
    ZeroSize { field: &'static str },

    #[error("No link patterns configured")]
    NoLinkPatterns,

    #[error("Invalid link pattern '{pattern}': {reason}")]
    InvalidLinkPattern { pattern: String, reason: String },

    #[error("Retention TTL must be positive: {field} = {value}")]
    InvalidRetentionTTL { field: String, value: u32 },
}

/// Validate the entire configuration, including the bot token
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    if config.telegram.bot_token.is_none() {
        return Err(ValidationError::MissingBotToken);
    }
    validate_local(config)
}

/// Validate everything that local maintenance commands rely on
///
/// Skips the bot token, which only commands talking to Telegram need.
pub fn validate_local(config: &Config) -> Result<(), ValidationError> {
    validate_server(config)?;
    validate_telegram(config)?;
    validate_resolver(config)?;
    validate_download(config)?;
    validate_links(config)?;
    validate_retention(config)?;
    Ok(())
}

fn validate_server(config: &Config) -> Result<(), ValidationError> {
    if config.server.shutdown_timeout_secs == 0 {
        return Err(ValidationError::ZeroTimeout {
            field: "server.shutdown_timeout_secs",
        });
    }
    Ok(())
}

fn validate_telegram(config: &Config) -> Result<(), ValidationError> {
    if config.telegram.timeout_secs == 0 {
        return Err(ValidationError::ZeroTimeout {
            field: "telegram.timeout_secs",
        });
    }
    Ok(())
}

fn validate_resolver(config: &Config) -> Result<(), ValidationError> {
    let endpoint = &config.resolver.endpoint;
    if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
        return Err(ValidationError::InvalidResolverEndpoint(endpoint.clone()));
    }
    if config.resolver.max_retries == 0 {
        return Err(ValidationError::ZeroRetries);
    }
    if config.resolver.timeout_secs == 0 {
        return Err(ValidationError::ZeroTimeout {
            field: "resolver.timeout_secs",
        });
    }
    Ok(())
}

fn validate_download(config: &Config) -> Result<(), ValidationError> {
    let download = &config.download;
    if download.timeout_secs == 0 {
        return Err(ValidationError::ZeroTimeout {
            field: "download.timeout_secs",
        });
    }
    if download.chunk_size.as_u64() == 0 {
        return Err(ValidationError::ZeroSize {
            field: "download.chunk_size",
        });
    }
    if download.max_file_size.as_u64() == 0 {
        return Err(ValidationError::ZeroSize {
            field: "download.max_file_size",
        });
    }
    Ok(())
}

fn validate_links(config: &Config) -> Result<(), ValidationError> {
    if config.links.patterns.is_empty() {
        return Err(ValidationError::NoLinkPatterns);
    }
    for pattern in &config.links.patterns {
        Regex::new(pattern).map_err(|e| ValidationError::InvalidLinkPattern {
            pattern: pattern.clone(),
            reason: e.to_string(),
        })?;
    }
    Ok(())
}

fn validate_retention(config: &Config) -> Result<(), ValidationError> {
    if config.retention.logs_ttl_days == 0 {
        return Err(ValidationError::InvalidRetentionTTL {
            field: "logs_ttl_days".to_string(),
            value: 0,
        });
    }
    Ok(())
}
