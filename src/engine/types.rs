//! Shared types for collection sessions
//!
//! This module defines the vocabulary the engine components exchange: page
//! requests and their results, the continuation signal a page carries, the
//! phases a session moves through, and the final session report.

use crate::record::Record;
use std::fmt;

/// Identifies one page of the listing
///
/// Page indices are 1-based. The offset is derived from the index and the
/// configured page size, for sources that paginate by record offset instead
/// of page number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page index
    pub index: u32,

    /// Record offset of the first entry on this page
    pub offset: u64,
}

impl PageRequest {
    /// Creates a request for the given page index
    pub fn new(index: u32, page_size: u32) -> Self {
        let offset = u64::from(index.saturating_sub(1)) * u64::from(page_size);
        Self { index, offset }
    }
}

/// What a page reveals about the rest of the listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    /// The listing advertises a total record count
    Total(u64),

    /// The listing advertises its highest page index
    LastPage(u32),

    /// The page states whether at least one more page follows
    HasMore(bool),

    /// The page reveals nothing about further pages
    Unknown,
}

impl Continuation {
    /// True when the signal positively promises another page
    ///
    /// Everything else, including `Unknown`, reads as "no further pages".
    /// Failed pages report `Unknown`, so a failure never extends the probe.
    pub fn more_follows(&self) -> bool {
        matches!(self, Self::HasMore(true))
    }
}

impl fmt::Display for Continuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Total(count) => write!(f, "total {}", count),
            Self::LastPage(index) => write!(f, "last page {}", index),
            Self::HasMore(true) => write!(f, "more follows"),
            Self::HasMore(false) => write!(f, "no more"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Outcome of fetching and extracting one page
///
/// Failures are folded in rather than surfaced: a failed page yields an
/// empty record list, an `Unknown` continuation, and a description of what
/// went wrong. One bad page never aborts the session.
#[derive(Debug, Clone)]
pub struct PageResult {
    /// 1-based page index this result belongs to
    pub index: u32,

    /// Records extracted from the page, in page order
    pub records: Vec<Record>,

    /// Continuation signal the page carried
    pub continuation: Continuation,

    /// Description of the failure, if the page could not be collected
    pub failure: Option<String>,
}

impl PageResult {
    /// Creates a successful result
    pub fn new(index: u32, records: Vec<Record>, continuation: Continuation) -> Self {
        Self {
            index,
            records,
            continuation,
            failure: None,
        }
    }

    /// Creates the degraded result for a page that could not be collected
    pub fn failed(index: u32, message: impl Into<String>) -> Self {
        Self {
            index,
            records: Vec::new(),
            continuation: Continuation::Unknown,
            failure: Some(message.into()),
        }
    }

    /// True when this page failed to fetch or parse
    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }
}

/// Phase of a collection session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Session created, nothing fetched yet
    Init,

    /// Fetching page 1 to learn the listing's extent
    Discovering,

    /// Known-total mode: fetching the computed remainder in one batch
    Expanding,

    /// Sentinel mode: probing batches until a page signals the end
    Iterating,

    /// All fetching done; ordering, de-duplicating and counting
    Merging,

    /// Final record sequence ready
    Done,
}

impl SessionPhase {
    /// Short lowercase label for logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Discovering => "discovering",
            Self::Expanding => "expanding",
            Self::Iterating => "iterating",
            Self::Merging => "merging",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Final accounting for one collection session
///
/// A session always produces a report. Page-level failures and an absent
/// total are reflected in the counters, never as an error.
#[derive(Debug, Clone)]
pub struct SessionReport {
    /// Merged, de-duplicated records in ascending page order
    pub records: Vec<Record>,

    /// Pages the session requested, including discarded and failed ones
    pub pages_requested: u32,

    /// Requested pages whose results entered the merge with a failure
    pub pages_failed: u32,

    /// Records seen before de-duplication
    pub records_seen: usize,

    /// Records dropped as duplicates of an earlier record
    pub duplicates_removed: usize,

    /// Records dropped because no identity key resolved
    pub keyless_dropped: usize,

    /// Page index that signalled the end, when one did
    pub terminal_page: Option<u32>,

    /// True when the page ceiling stopped the session first
    pub capped: bool,
}
