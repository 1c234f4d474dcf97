//! Configuration module
//!
//! Loads, parses and validates the TOML configuration, and provides the
//! built-in site profiles.
//!
//! # Example
//!
//! ```no_run
//! use finsight_crawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("finsight.toml")).unwrap();
//! for profile in config.all_profiles() {
//!     println!("{} -> {}", profile.name, profile.seed_url);
//! }
//! ```

mod parser;
mod profiles;
mod types;
mod validation;

pub use types::{
    BrowserName, BrowserSettings, Config, DeepConfig, DriverKind, ExtractionConfig,
    InferSchemaConfig, LlmConfig, ProfileConfig, StorageConfig, UserAgentConfig,
};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use profiles::{builtin_profiles, yahoo_finance, YAHOO_FINANCE};
