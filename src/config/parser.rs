use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use ghostcrawl::config::load_config;
///
/// let config = load_config(Path::new("ghostcrawl.toml")).unwrap();
/// println!("Database: {}", config.storage.database_path);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    // Read the configuration file
    let content = std::fs::read_to_string(path)?;

    // Parse TOML
    let config: Config = toml::from_str(&content)?;

    // Validate the configuration
    validate(&config)?;

    Ok(config)
}

/// Loads the configuration file if one was given, otherwise the defaults
pub fn load_config_or_default(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => {
            let config = Config::default();
            validate(&config)?;
            Ok(config)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
[storage]
database-path = "./test.db"

[worker]
concurrency = 4
poll-interval-ms = 250

[browser]
navigation-timeout-ms = 5000
user-agents = ["TestAgent/1.0"]
accept-language = "de-DE"

[extraction]
min-content-length = 50

[limits]
default-max-depth = 3
max-max-depth = 5
default-limit = 20
max-limit = 50
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.storage.database_path, "./test.db");
        assert_eq!(config.worker.concurrency, 4);
        assert_eq!(config.browser.navigation_timeout_ms, 5000);
        assert_eq!(config.browser.user_agents, vec!["TestAgent/1.0".to_string()]);
        assert_eq!(config.extraction.min_content_length, 50);
        assert_eq!(config.extraction.default_language, "en");
        assert_eq!(config.limits.max_limit, 50);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let file = create_temp_config("");
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.storage.database_path, "./ghostcrawl.db");
        assert_eq!(config.browser.navigation_timeout_ms, 30_000);
        assert_eq!(config.limits.default_max_depth, 2);
        assert_eq!(config.limits.max_max_depth, 10);
        assert_eq!(config.limits.default_limit, 10);
        assert_eq!(config.limits.max_limit, 100);
        assert!(!config.browser.user_agents.is_empty());
    }

    #[test]
    fn test_partial_section_fills_defaults() {
        let file = create_temp_config("[worker]\nconcurrency = 8\n");
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.worker.concurrency, 8);
        assert_eq!(config.worker.poll_interval_ms, 500);
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/ghostcrawl.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let file = create_temp_config("[worker]\nconcurrency = 0\n");
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_load_config_or_default_without_path() {
        let config = load_config_or_default(None).unwrap();
        assert_eq!(config.worker.concurrency, 2);
    }
}
