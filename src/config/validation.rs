use crate::config::types::{Config, ExtractorConfig, FetcherConfig, MailConfig, OutputConfig, ServerConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_fetcher_config(&config.fetcher)?;
    validate_extractor_config(&config.extractor)?;
    validate_output_config(&config.output)?;
    validate_mail_config(&config.mail)?;
    validate_server_config(&config.server)?;
    Ok(())
}

/// Validates fetcher configuration
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.retries > 20 {
        return Err(ConfigError::Validation(format!(
            "retries must be <= 20, got {}",
            config.retries
        )));
    }

    if config.base_delay_ms < 1 {
        return Err(ConfigError::Validation(format!(
            "base_delay_ms must be >= 1ms, got {}ms",
            config.base_delay_ms
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    Ok(())
}

/// Validates extractor configuration
fn validate_extractor_config(config: &ExtractorConfig) -> Result<(), ConfigError> {
    validate_origin("roster_origin", &config.roster_origin)?;
    validate_origin("killboard_origin", &config.killboard_origin)?;

    if config.killboard_concurrency < 1 || config.killboard_concurrency > 32 {
        return Err(ConfigError::Validation(format!(
            "killboard_concurrency must be between 1 and 32, got {}",
            config.killboard_concurrency
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.csv_dir.is_empty() {
        return Err(ConfigError::Validation(
            "csv_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_mail_config(config: &MailConfig) -> Result<(), ConfigError> {
    validate_origin("esi_origin", &config.esi_origin)
}

fn validate_server_config(config: &ServerConfig) -> Result<(), ConfigError> {
    if config.port == 0 {
        return Err(ConfigError::Validation("port cannot be 0".to_string()));
    }

    if config.host.is_empty() {
        return Err(ConfigError::Validation("host cannot be empty".to_string()));
    }

    Ok(())
}

/// Validates that an origin is an absolute http(s) URL without a trailing path
fn validate_origin(field: &str, origin: &str) -> Result<(), ConfigError> {
    let url = Url::parse(origin)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {}: {}", field, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            field, origin
        )));
    }

    if url.path().len() > 1 {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must not carry a path",
            field, origin
        )));
    }

    Ok(())
}
