//! Configuration module for wp-harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use wp_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Harvesting {} sites", config.sites.len());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, HarvesterConfig, HttpConfig, OutputConfig, SiteEntry};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
