use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Ghostcrawl
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// Location of the shared queue and frontier database
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Worker pool configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// Number of worker tasks started per process
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Idle sleep between queue polls (milliseconds)
    #[serde(rename = "poll-interval-ms", default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl WorkerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// Browser session and outbound identity configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserConfig {
    /// Navigation timeout per page (milliseconds)
    #[serde(
        rename = "navigation-timeout-ms",
        default = "default_navigation_timeout_ms"
    )]
    pub navigation_timeout_ms: u64,

    /// User agents rotated across pages
    #[serde(rename = "user-agents", default = "default_user_agents")]
    pub user_agents: Vec<String>,

    /// Accept-Language header sent with every navigation
    #[serde(rename = "accept-language", default = "default_accept_language")]
    pub accept_language: String,
}

impl BrowserConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            navigation_timeout_ms: default_navigation_timeout_ms(),
            user_agents: default_user_agents(),
            accept_language: default_accept_language(),
        }
    }
}

/// Readable-content extraction configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    /// Minimum number of readable text characters for a page to count as an article
    #[serde(rename = "min-content-length", default = "default_min_content_length")]
    pub min_content_length: usize,

    /// Language reported when the document does not declare one
    #[serde(rename = "default-language", default = "default_language")]
    pub default_language: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_content_length: default_min_content_length(),
            default_language: default_language(),
        }
    }
}

/// Bounds accepted at submission time
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    #[serde(rename = "default-max-depth", default = "default_max_depth")]
    pub default_max_depth: u32,

    /// Largest maxDepth a crawl may request
    #[serde(rename = "max-max-depth", default = "max_max_depth")]
    pub max_max_depth: u32,

    #[serde(rename = "default-limit", default = "default_limit")]
    pub default_limit: u32,

    /// Largest page limit a crawl or map may request
    #[serde(rename = "max-limit", default = "max_limit")]
    pub max_limit: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            default_max_depth: default_max_depth(),
            max_max_depth: max_max_depth(),
            default_limit: default_limit(),
            max_limit: max_limit(),
        }
    }
}

fn default_database_path() -> String {
    "./ghostcrawl.db".to_string()
}

fn default_concurrency() -> u32 {
    2
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_navigation_timeout_ms() -> u64 {
    30_000
}

fn default_user_agents() -> Vec<String> {
    vec![
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36".to_string(),
    ]
}

fn default_accept_language() -> String {
    "en-US,en;q=0.9".to_string()
}

fn default_min_content_length() -> usize {
    1
}

fn default_language() -> String {
    "en".to_string()
}

fn default_max_depth() -> u32 {
    2
}

fn max_max_depth() -> u32 {
    10
}

fn default_limit() -> u32 {
    10
}

fn max_limit() -> u32 {
    100
}
