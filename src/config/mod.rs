//! Configuration module for Vitrin
//!
//! This module handles loading, parsing, and validating TOML source
//! configuration files. One file describes one paginated source: its
//! endpoint template, discovery mode, extraction rules, identity keys,
//! and output destination.
//!
//! # Example
//!
//! ```no_run
//! use vitrin::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("sources/shop.toml")).unwrap();
//! println!("Fetching up to {} pages", config.source.max_pages);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, DiscoveryMode, ExtractConfig, ExtractStep, FieldRule, HttpMethod, IdentityConfig,
    OutputConfig, PaginationKind, PaginationRule, PayloadFormat, SourceConfig,
};

// Re-export parser functions
pub use parser::load_config;
