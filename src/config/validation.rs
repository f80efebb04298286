use crate::config::types::{
    BrowserConfig, Config, ExtractionConfig, LimitsConfig, StorageConfig, WorkerConfig,
};
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_storage_config(&config.storage)?;
    validate_worker_config(&config.worker)?;
    validate_browser_config(&config.browser)?;
    validate_extraction_config(&config.extraction)?;
    validate_limits_config(&config.limits)?;
    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_worker_config(config: &WorkerConfig) -> Result<(), ConfigError> {
    if config.concurrency < 1 || config.concurrency > 64 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 64, got {}",
            config.concurrency
        )));
    }

    if config.poll_interval_ms < 10 {
        return Err(ConfigError::Validation(format!(
            "poll_interval_ms must be >= 10ms, got {}ms",
            config.poll_interval_ms
        )));
    }

    Ok(())
}

fn validate_browser_config(config: &BrowserConfig) -> Result<(), ConfigError> {
    if config.navigation_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "navigation_timeout_ms must be >= 100ms, got {}ms",
            config.navigation_timeout_ms
        )));
    }

    if config.user_agents.is_empty() {
        return Err(ConfigError::Validation(
            "user_agents must contain at least one entry".to_string(),
        ));
    }

    for agent in &config.user_agents {
        validate_header_value("user agent", agent)?;
    }

    validate_header_value("accept_language", &config.accept_language)?;

    Ok(())
}

fn validate_extraction_config(config: &ExtractionConfig) -> Result<(), ConfigError> {
    if config.default_language.trim().is_empty() {
        return Err(ConfigError::Validation(
            "default_language cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_limits_config(config: &LimitsConfig) -> Result<(), ConfigError> {
    if config.max_max_depth < 1 {
        return Err(ConfigError::Validation(format!(
            "max_max_depth must be >= 1, got {}",
            config.max_max_depth
        )));
    }

    if config.default_max_depth < 1 || config.default_max_depth > config.max_max_depth {
        return Err(ConfigError::Validation(format!(
            "default_max_depth must be between 1 and {}, got {}",
            config.max_max_depth, config.default_max_depth
        )));
    }

    if config.max_limit < 1 {
        return Err(ConfigError::Validation(format!(
            "max_limit must be >= 1, got {}",
            config.max_limit
        )));
    }

    if config.default_limit < 1 || config.default_limit > config.max_limit {
        return Err(ConfigError::Validation(format!(
            "default_limit must be between 1 and {}, got {}",
            config.max_limit, config.default_limit
        )));
    }

    Ok(())
}

/// Header values must be non-empty visible ASCII
fn validate_header_value(name: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
    }

    if !value.chars().all(|c| c == ' ' || c.is_ascii_graphic()) {
        return Err(ConfigError::Validation(format!(
            "{} contains characters not allowed in a header: '{}'",
            name, value
        )));
    }

    Ok(())
}
