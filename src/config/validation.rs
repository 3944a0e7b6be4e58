use crate::config::types::{ApiConfig, Config, FetchConfig, InputConfig, OutputConfig, RegionsConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_api_config(&config.api)?;
    validate_fetch_config(&config.fetch)?;
    validate_input_config(&config.input)?;
    validate_output_config(&config.output)?;
    if let Some(regions) = &config.regions {
        validate_regions_config(regions)?;
    }
    Ok(())
}

/// Validates the weather API configuration
fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    validate_http_url("base-url", &config.base_url)?;
    Ok(())
}

/// Validates fetch configuration
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > 100 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 100, got {}",
            config.workers
        )));
    }

    if config.timeout_ms < 1 {
        return Err(ConfigError::Validation(
            "timeout-ms must be >= 1".to_string(),
        ));
    }

    if config.max_attempts < 1 || config.max_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "max-attempts must be between 1 and 10, got {}",
            config.max_attempts
        )));
    }

    if config.backoff_base_ms > 60_000 {
        return Err(ConfigError::Validation(format!(
            "backoff-base-ms must be <= 60000ms, got {}ms",
            config.backoff_base_ms
        )));
    }

    Ok(())
}

/// Validates key file configuration
fn validate_input_config(config: &InputConfig) -> Result<(), ConfigError> {
    if config.keys_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "keys-path cannot be empty".to_string(),
        ));
    }

    if config.column.trim().is_empty() {
        return Err(ConfigError::Validation(
            "column cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.results_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "results-path cannot be empty".to_string(),
        ));
    }

    if matches!(&config.database_path, Some(p) if p.as_os_str().is_empty()) {
        return Err(ConfigError::Validation(
            "database-path cannot be empty when set".to_string(),
        ));
    }

    if matches!(&config.summary_path, Some(p) if p.as_os_str().is_empty()) {
        return Err(ConfigError::Validation(
            "summary-path cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates region crawl configuration
fn validate_regions_config(config: &RegionsConfig) -> Result<(), ConfigError> {
    validate_http_url("regions.base-url", &config.base_url)?;

    if config.province.trim().is_empty() {
        return Err(ConfigError::Validation(
            "province cannot be empty".to_string(),
        ));
    }

    if config.timeout_ms < 1 {
        return Err(ConfigError::Validation(
            "regions.timeout-ms must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Checks that a URL parses and uses HTTP or HTTPS
fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} must use http or https, got '{}'",
            field,
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "{} has no host: '{}'",
            field, value
        )));
    }

    Ok(())
}
