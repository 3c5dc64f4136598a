//! Payload extraction
//!
//! This module turns raw page payloads into records plus a continuation
//! signal. Three adapter implementations cover the payload shapes sources
//! serve: full HTML documents, JSON APIs, and JSON envelopes wrapping a
//! rendered HTML fragment. Which adapter runs, and what it looks for, is
//! driven entirely by the `[extract]` section of the source config.

mod envelope;
mod html;
mod json;

pub use envelope::EnvelopeAdapter;
pub use html::HtmlAdapter;
pub use json::JsonAdapter;

use crate::config::{ExtractConfig, PayloadFormat};
use crate::engine::Continuation;
use crate::record::Record;
use crate::ConfigError;
use regex::Regex;
use scraper::Selector;
use std::sync::Arc;
use thiserror::Error;

/// Extraction-specific errors
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no value at '{0}' in payload")]
    MissingPath(String),

    #[error("value at '{path}' is not {expected}")]
    UnexpectedShape { path: String, expected: &'static str },
}

/// Records and continuation signal extracted from one page payload
#[derive(Debug, Clone)]
pub struct Extraction {
    pub records: Vec<Record>,
    pub continuation: Continuation,
}

/// Turns one page payload into records plus a continuation signal
///
/// Implementations are pure: the same payload always yields the same
/// extraction, and nothing here performs I/O. That keeps adapters safe to
/// share across concurrent page tasks.
pub trait ExtractionAdapter: Send + Sync {
    fn parse(&self, payload: &str) -> Result<Extraction, ParseError>;
}

/// Builds the adapter matching the configured payload format
pub fn adapter_for(config: &ExtractConfig) -> Result<Arc<dyn ExtractionAdapter>, ConfigError> {
    match config.format {
        PayloadFormat::Html => Ok(Arc::new(HtmlAdapter::from_config(config)?)),
        PayloadFormat::Json => Ok(Arc::new(JsonAdapter::from_config(config)?)),
        PayloadFormat::JsonHtml => Ok(Arc::new(EnvelopeAdapter::from_config(config)?)),
    }
}

pub(crate) fn compile_selector(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector)
        .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {}", selector, e)))
}

pub(crate) fn compile_pattern(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", pattern, e)))
}

/// Applies an optional refinement pattern to a raw extracted value
///
/// With a pattern, the first capture group (or the whole match when the
/// pattern has no groups) becomes the value; no match means no value.
pub(crate) fn refine(value: &str, pattern: Option<&Regex>) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    match pattern {
        None => Some(value.to_string()),
        Some(regex) => {
            let captures = regex.captures(value)?;
            let matched = captures.get(1).or_else(|| captures.get(0))?;
            Some(matched.as_str().to_string())
        }
    }
}
