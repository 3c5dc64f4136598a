//! Vitrin: a bounded-concurrency catalog collector
//!
//! This crate harvests paginated listings (server-rendered HTML, AJAX fragments,
//! or JSON APIs) into a single de-duplicated record set, fanning page requests
//! out under a fixed concurrency limit.

pub mod config;
pub mod engine;
pub mod extract;
pub mod output;
pub mod record;

use thiserror::Error;

/// Main error type for Vitrin operations
#[derive(Debug, Error)]
pub enum VitrinError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Output error: {0}")]
    Sink(#[from] output::SinkError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid CSS selector: {0}")]
    InvalidSelector(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
}

/// Result type alias for Vitrin operations
pub type Result<T> = std::result::Result<T, VitrinError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use engine::{collect, Continuation, PageResult, SessionPhase, SessionReport};
pub use extract::{Extraction, ExtractionAdapter};
pub use output::{CsvSink, ResultSink};
pub use record::{KeyChain, Record};
