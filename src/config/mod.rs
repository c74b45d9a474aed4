//! Configuration module for Job-Sift
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use job_sift::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("job-sift.toml")).unwrap();
//! println!("Configured sources: {}", config.sources.len());
//! ```

mod parser;
pub(crate) mod types;
mod validation;

// Re-export types
pub use types::{default_page_delay, Config, HttpConfig, SourceConfig, StorageConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
