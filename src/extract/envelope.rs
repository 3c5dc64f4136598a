//! JSON envelope extraction
//!
//! Some AJAX endpoints answer with a JSON object that carries a rendered
//! HTML fragment next to pagination bookkeeping, e.g.
//! `{"html": "...", "hasMore": "True", "totalCount": "478"}`. This adapter
//! unwraps the fragment, runs the HTML card extraction over it, and reads
//! the continuation signal from the envelope.

use crate::config::ExtractConfig;
use crate::extract::html::CardExtractor;
use crate::extract::json::{DotPath, JsonContinuation};
use crate::extract::{Extraction, ExtractionAdapter, ParseError};
use crate::ConfigError;
use scraper::Html;
use serde_json::Value;

/// Extraction adapter for JSON envelopes wrapping an HTML fragment
pub struct EnvelopeAdapter {
    fragment_path: DotPath,
    cards: CardExtractor,
    pagination: JsonContinuation,
}

impl EnvelopeAdapter {
    /// Compiles the configured paths, selectors and patterns into an adapter
    pub fn from_config(config: &ExtractConfig) -> Result<Self, ConfigError> {
        let fragment_path = config.fragment_path.as_deref().ok_or_else(|| {
            ConfigError::Validation("fragment-path is required".to_string())
        })?;

        Ok(Self {
            fragment_path: DotPath::parse(fragment_path),
            cards: CardExtractor::from_config(config)?,
            pagination: JsonContinuation::from_rule(&config.pagination)?,
        })
    }
}

impl ExtractionAdapter for EnvelopeAdapter {
    fn parse(&self, payload: &str) -> Result<Extraction, ParseError> {
        let root: Value = serde_json::from_str(payload)?;

        let fragment = self
            .fragment_path
            .resolve(&root)
            .ok_or_else(|| ParseError::MissingPath(self.fragment_path.to_string()))?;

        let fragment = fragment.as_str().ok_or_else(|| ParseError::UnexpectedShape {
            path: self.fragment_path.to_string(),
            expected: "a string",
        })?;

        let document = Html::parse_document(fragment);
        let records = self.cards.extract(&document);
        let continuation = self.pagination.evaluate(&root, &records);

        Ok(Extraction {
            records,
            continuation,
        })
    }
}
