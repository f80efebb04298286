//! Configuration module for Ghostcrawl
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section is optional; missing sections fall back to their defaults.
//!
//! # Example
//!
//! ```no_run
//! use ghostcrawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("ghostcrawl.toml")).unwrap();
//! println!("Workers per process: {}", config.worker.concurrency);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BrowserConfig, Config, ExtractionConfig, LimitsConfig, StorageConfig, WorkerConfig,
};

// Re-export parser functions
pub use parser::{load_config, load_config_or_default};
pub use validation::validate;
