//! Collected records and identity resolution
//!
//! A [`Record`] is one extracted listing entry: a flat map of named string
//! fields. Which fields exist depends entirely on the extraction rules in the
//! source config, so the engine treats records as opaque field bags and only
//! the [`KeyChain`] interprets them, to decide which entries are duplicates.

use std::collections::HashMap;

/// One extracted entry from a listing page.
///
/// Fields are stored as trimmed, non-empty strings. Extraction rules that
/// matched nothing simply leave the field absent, so `get` returning `None`
/// means "not found on the page" rather than "found empty".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: HashMap<String, String>,
}

impl Record {
    /// Creates an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a field value; empty or whitespace-only values are discarded
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            self.fields.insert(name.into(), trimmed.to_string());
        }
    }

    /// Returns the value of a field, if it was extracted
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Number of populated fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when no field was populated
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (name, value) in iter {
            record.insert(name, value);
        }
        record
    }
}

/// Ordered chain of candidate identity fields.
///
/// De-duplication resolves each record's identity by walking the chain and
/// taking the first field that is present. A record where no candidate
/// resolves has no identity and is dropped rather than risk colliding every
/// keyless record into one.
#[derive(Debug, Clone)]
pub struct KeyChain {
    fields: Vec<String>,
}

impl KeyChain {
    /// Creates a chain from the configured field names, highest priority first
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }

    /// Resolves a record's identity key, or `None` if no candidate is present
    pub fn resolve<'r>(&self, record: &'r Record) -> Option<&'r str> {
        self.fields
            .iter()
            .find_map(|field| record.get(field))
    }
}
