//! Result merging and de-duplication
//!
//! Page results arrive in completion order; the merge sorts them back into
//! ascending page order, concatenates their records, and drops duplicates
//! so that the first occurrence in page order wins. The outcome is the
//! same whatever concurrency produced the inputs.

use crate::engine::types::PageResult;
use crate::record::{KeyChain, Record};
use std::collections::HashSet;

/// Counters and records produced by one merge
#[derive(Debug)]
pub struct MergeOutcome {
    /// De-duplicated records in ascending page order
    pub records: Vec<Record>,

    /// Records seen before de-duplication
    pub records_seen: usize,

    /// Records dropped because an earlier record had the same key
    pub duplicates_removed: usize,

    /// Records dropped because no identity key resolved
    pub keyless_dropped: usize,
}

/// Merges page results into the final record sequence
///
/// Within a page, records keep their extraction order. Across pages, the
/// page index decides order regardless of when each page finished.
pub fn merge(mut pages: Vec<PageResult>, keys: &KeyChain) -> MergeOutcome {
    pages.sort_by_key(|page| page.index);

    let mut seen: HashSet<String> = HashSet::new();
    let mut records = Vec::new();
    let mut records_seen = 0;
    let mut duplicates_removed = 0;
    let mut keyless_dropped = 0;

    for page in pages {
        for record in page.records {
            records_seen += 1;

            let key = match keys.resolve(&record) {
                Some(key) => key.to_string(),
                None => {
                    keyless_dropped += 1;
                    continue;
                }
            };

            if !seen.insert(key) {
                duplicates_removed += 1;
                continue;
            }

            records.push(record);
        }
    }

    MergeOutcome {
        records,
        records_seen,
        duplicates_removed,
        keyless_dropped,
    }
}
