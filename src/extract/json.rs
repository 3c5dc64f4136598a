//! JSON payload extraction
//!
//! Locates the record array by dot path, maps each item's values into
//! record fields, and reads the continuation signal from a total count or
//! a has-more flag elsewhere in the document.

use crate::config::{ExtractConfig, FieldRule, PaginationKind, PaginationRule};
use crate::engine::Continuation;
use crate::extract::{compile_pattern, refine, Extraction, ExtractionAdapter, ParseError};
use crate::record::Record;
use crate::ConfigError;
use regex::Regex;
use serde_json::Value;

/// Extraction adapter for JSON API payloads
pub struct JsonAdapter {
    records_path: DotPath,
    fields: Vec<JsonField>,
    pagination: JsonContinuation,
}

struct JsonField {
    name: String,
    steps: Vec<JsonStep>,
}

struct JsonStep {
    path: DotPath,
    pattern: Option<Regex>,
}

impl JsonAdapter {
    /// Compiles the configured paths and patterns into an adapter
    pub fn from_config(config: &ExtractConfig) -> Result<Self, ConfigError> {
        let records_path = config.records_path.as_deref().ok_or_else(|| {
            ConfigError::Validation("records-path is required".to_string())
        })?;

        Ok(Self {
            records_path: DotPath::parse(records_path),
            fields: config
                .fields
                .iter()
                .map(compile_field)
                .collect::<Result<_, _>>()?,
            pagination: JsonContinuation::from_rule(&config.pagination)?,
        })
    }

    fn extract_item(&self, item: &Value) -> Record {
        let mut record = Record::new();

        for field in &self.fields {
            for step in &field.steps {
                let value = step
                    .path
                    .resolve(item)
                    .and_then(value_to_string)
                    .and_then(|raw| refine(&raw, step.pattern.as_ref()));

                if let Some(value) = value {
                    record.insert(&field.name, value);
                    break;
                }
            }
        }

        record
    }
}

impl ExtractionAdapter for JsonAdapter {
    fn parse(&self, payload: &str) -> Result<Extraction, ParseError> {
        let root: Value = serde_json::from_str(payload)?;

        let items = self
            .records_path
            .resolve(&root)
            .ok_or_else(|| ParseError::MissingPath(self.records_path.to_string()))?;

        let items = items.as_array().ok_or_else(|| ParseError::UnexpectedShape {
            path: self.records_path.to_string(),
            expected: "an array",
        })?;

        let records: Vec<Record> = items.iter().map(|item| self.extract_item(item)).collect();
        let continuation = self.pagination.evaluate(&root, &records);

        Ok(Extraction {
            records,
            continuation,
        })
    }
}

fn compile_field(rule: &FieldRule) -> Result<JsonField, ConfigError> {
    let steps = rule
        .steps
        .iter()
        .map(|step| {
            let path = step.path.as_deref().ok_or_else(|| {
                ConfigError::Validation(format!("field '{}': json steps require a path", rule.name))
            })?;

            Ok(JsonStep {
                path: DotPath::parse(path),
                pattern: step.pattern.as_deref().map(compile_pattern).transpose()?,
            })
        })
        .collect::<Result<_, ConfigError>>()?;

    Ok(JsonField {
        name: rule.name.clone(),
        steps,
    })
}

/// Dot-separated path into a JSON document, e.g. `pageProps.products.items`
#[derive(Debug, Clone)]
pub(crate) struct DotPath {
    segments: Vec<String>,
}

impl DotPath {
    pub(crate) fn parse(path: &str) -> Self {
        Self {
            segments: path
                .split('.')
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// Follows the path through nested objects
    pub(crate) fn resolve<'v>(&self, root: &'v Value) -> Option<&'v Value> {
        self.segments
            .iter()
            .try_fold(root, |value, segment| value.get(segment))
    }
}

impl std::fmt::Display for DotPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

/// Renders a scalar JSON value as a field string
///
/// Arrays, objects and null yield nothing; a record field has to be flat.
pub(crate) fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Continuation rules readable from a JSON document
///
/// Shared with the envelope adapter, which evaluates them against the
/// envelope while the records come from the embedded fragment.
pub(crate) enum JsonContinuation {
    TotalField {
        path: DotPath,
        pattern: Option<Regex>,
    },
    MoreMarker {
        path: DotPath,
        pattern: Option<Regex>,
    },
    NonEmpty,
}

impl JsonContinuation {
    pub(crate) fn from_rule(rule: &PaginationRule) -> Result<Self, ConfigError> {
        let pattern = rule.pattern.as_deref().map(compile_pattern).transpose()?;

        match rule.rule {
            PaginationKind::TotalField => Ok(Self::TotalField {
                path: require_path(rule)?,
                pattern,
            }),
            PaginationKind::MoreMarker => Ok(Self::MoreMarker {
                path: require_path(rule)?,
                pattern,
            }),
            PaginationKind::NonEmpty => Ok(Self::NonEmpty),
            PaginationKind::PageLinks => Err(ConfigError::Validation(
                "page-links rule does not apply to json payloads".to_string(),
            )),
        }
    }

    pub(crate) fn evaluate(&self, root: &Value, records: &[Record]) -> Continuation {
        match self {
            Self::TotalField { path, pattern } => path
                .resolve(root)
                .and_then(|value| read_total(value, pattern.as_ref()))
                .map_or(Continuation::Unknown, Continuation::Total),
            Self::MoreMarker { path, pattern } => {
                let more = path
                    .resolve(root)
                    .map(|value| read_marker(value, pattern.as_ref()))
                    .unwrap_or(false);
                Continuation::HasMore(more)
            }
            Self::NonEmpty => Continuation::HasMore(!records.is_empty()),
        }
    }
}

fn require_path(rule: &PaginationRule) -> Result<DotPath, ConfigError> {
    let path = rule.path.as_deref().ok_or_else(|| {
        ConfigError::Validation("pagination path is required".to_string())
    })?;
    Ok(DotPath::parse(path))
}

/// Reads a total count that may arrive as a number or embedded in a string
fn read_total(value: &Value, pattern: Option<&Regex>) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => refine(text, pattern).and_then(|total| total.parse().ok()),
        _ => None,
    }
}

/// Reads a has-more flag that may arrive as a bool, number, or string
fn read_marker(value: &Value, pattern: Option<&Regex>) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().unwrap_or(0.0) != 0.0,
        Value::String(text) => match pattern {
            Some(pattern) => pattern.is_match(text),
            None => text.trim().eq_ignore_ascii_case("true"),
        },
        _ => false,
    }
}
