//! HTML payload extraction
//!
//! This module handles server-rendered HTML documents and bare HTML
//! fragments: selecting record elements, walking each field's extraction
//! steps, and reading the page's continuation signal out of pager links,
//! a total label, or a "load more" marker.

use crate::config::{ExtractConfig, ExtractStep, FieldRule, PaginationKind, PaginationRule};
use crate::engine::Continuation;
use crate::extract::{compile_pattern, compile_selector, refine, Extraction, ExtractionAdapter, ParseError};
use crate::record::Record;
use crate::ConfigError;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

/// Extraction adapter for HTML documents and fragments
pub struct HtmlAdapter {
    cards: CardExtractor,
    pagination: HtmlPagination,
}

impl HtmlAdapter {
    /// Compiles the configured selectors and patterns into an adapter
    pub fn from_config(config: &ExtractConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            cards: CardExtractor::from_config(config)?,
            pagination: HtmlPagination::from_rule(&config.pagination)?,
        })
    }
}

impl ExtractionAdapter for HtmlAdapter {
    fn parse(&self, payload: &str) -> Result<Extraction, ParseError> {
        let document = Html::parse_document(payload);
        let records = self.cards.extract(&document);
        let continuation = self.pagination.evaluate(&document, &records);

        Ok(Extraction {
            records,
            continuation,
        })
    }
}

/// Selects record elements and extracts configured fields from each
///
/// Shared between the plain HTML adapter and the JSON envelope adapter,
/// which applies it to the embedded fragment instead of the full payload.
pub(crate) struct CardExtractor {
    records: Selector,
    fields: Vec<CompiledField>,
}

struct CompiledField {
    name: String,
    steps: Vec<CompiledStep>,
}

struct CompiledStep {
    selector: Option<Selector>,
    attr: Option<String>,
    pattern: Option<Regex>,
}

impl CardExtractor {
    pub(crate) fn from_config(config: &ExtractConfig) -> Result<Self, ConfigError> {
        let selector = config.record_selector.as_deref().ok_or_else(|| {
            ConfigError::Validation("record-selector is required".to_string())
        })?;

        Ok(Self {
            records: compile_selector(selector)?,
            fields: config
                .fields
                .iter()
                .map(compile_field)
                .collect::<Result<_, _>>()?,
        })
    }

    /// Extracts one record per matching element, in document order
    pub(crate) fn extract(&self, document: &Html) -> Vec<Record> {
        document
            .select(&self.records)
            .map(|card| self.extract_card(card))
            .collect()
    }

    fn extract_card(&self, card: ElementRef) -> Record {
        let mut record = Record::new();

        for field in &self.fields {
            // First step that yields a value wins
            for step in &field.steps {
                if let Some(value) = extract_step(card, step) {
                    record.insert(&field.name, value);
                    break;
                }
            }
        }

        record
    }
}

fn compile_field(rule: &FieldRule) -> Result<CompiledField, ConfigError> {
    Ok(CompiledField {
        name: rule.name.clone(),
        steps: rule
            .steps
            .iter()
            .map(compile_step)
            .collect::<Result<_, _>>()?,
    })
}

fn compile_step(step: &ExtractStep) -> Result<CompiledStep, ConfigError> {
    Ok(CompiledStep {
        selector: step
            .selector
            .as_deref()
            .map(compile_selector)
            .transpose()?,
        attr: step.attr.clone(),
        pattern: step
            .pattern
            .as_deref()
            .map(compile_pattern)
            .transpose()?,
    })
}

/// Runs one extraction step against a record element
///
/// Without a selector the step reads the record element itself, which is
/// how card-level attributes like `data-id` are reached.
fn extract_step(card: ElementRef, step: &CompiledStep) -> Option<String> {
    let element = match &step.selector {
        Some(selector) => card.select(selector).next()?,
        None => card,
    };

    let raw = read_element(element, step.attr.as_deref())?;
    refine(&raw, step.pattern.as_ref())
}

fn read_element(element: ElementRef, attr: Option<&str>) -> Option<String> {
    match attr {
        Some(name) => element.value().attr(name).map(str::to_string),
        None => Some(element.text().collect::<String>()),
    }
}

enum HtmlPagination {
    /// Highest page number captured from pager link attributes
    PageLinks {
        selector: Selector,
        attr: String,
        pattern: Regex,
    },
    /// Total record count captured from a label element
    TotalField {
        selector: Selector,
        attr: Option<String>,
        pattern: Regex,
    },
    /// Marker element whose presence (or matching value) promises more
    MoreMarker {
        selector: Selector,
        attr: Option<String>,
        pattern: Option<Regex>,
    },
    /// More follows while the page yields records
    NonEmpty,
}

impl HtmlPagination {
    fn from_rule(rule: &PaginationRule) -> Result<Self, ConfigError> {
        match rule.rule {
            PaginationKind::PageLinks => Ok(Self::PageLinks {
                selector: require_selector(rule)?,
                attr: rule.attr.clone().unwrap_or_else(|| "href".to_string()),
                pattern: require_pattern(rule)?,
            }),
            PaginationKind::TotalField => Ok(Self::TotalField {
                selector: require_selector(rule)?,
                attr: rule.attr.clone(),
                pattern: require_pattern(rule)?,
            }),
            PaginationKind::MoreMarker => Ok(Self::MoreMarker {
                selector: require_selector(rule)?,
                attr: rule.attr.clone(),
                pattern: rule.pattern.as_deref().map(compile_pattern).transpose()?,
            }),
            PaginationKind::NonEmpty => Ok(Self::NonEmpty),
        }
    }

    fn evaluate(&self, document: &Html, records: &[Record]) -> Continuation {
        match self {
            Self::PageLinks {
                selector,
                attr,
                pattern,
            } => {
                let mut last: Option<u32> = None;

                for element in document.select(selector) {
                    let Some(value) = element.value().attr(attr) else {
                        continue;
                    };

                    // A link can mention several numbers; consider them all
                    for captures in pattern.captures_iter(value) {
                        let matched = match captures.get(1).or_else(|| captures.get(0)) {
                            Some(m) => m,
                            None => continue,
                        };
                        if let Ok(number) = matched.as_str().parse::<u32>() {
                            last = Some(last.map_or(number, |seen| seen.max(number)));
                        }
                    }
                }

                match last {
                    Some(index) => Continuation::LastPage(index),
                    None => Continuation::Unknown,
                }
            }
            Self::TotalField {
                selector,
                attr,
                pattern,
            } => document
                .select(selector)
                .next()
                .and_then(|element| read_element(element, attr.as_deref()))
                .and_then(|value| refine(&value, Some(pattern)))
                .and_then(|total| total.parse::<u64>().ok())
                .map_or(Continuation::Unknown, Continuation::Total),
            Self::MoreMarker {
                selector,
                attr,
                pattern,
            } => {
                let marker = document.select(selector).next();

                let more = match (marker, pattern) {
                    (None, _) => false,
                    (Some(_), None) => true,
                    (Some(element), Some(pattern)) => read_element(element, attr.as_deref())
                        .map(|value| pattern.is_match(&value))
                        .unwrap_or(false),
                };

                Continuation::HasMore(more)
            }
            Self::NonEmpty => Continuation::HasMore(!records.is_empty()),
        }
    }
}

fn require_selector(rule: &PaginationRule) -> Result<Selector, ConfigError> {
    let selector = rule.selector.as_deref().ok_or_else(|| {
        ConfigError::Validation("pagination selector is required".to_string())
    })?;
    compile_selector(selector)
}

fn require_pattern(rule: &PaginationRule) -> Result<Regex, ConfigError> {
    let pattern = rule.pattern.as_deref().ok_or_else(|| {
        ConfigError::Validation("pagination pattern is required".to_string())
    })?;
    compile_pattern(pattern)
}
