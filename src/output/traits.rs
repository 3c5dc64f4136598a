//! Output sink trait and types
//!
//! This module defines the trait interface that receives the final record
//! sequence of a session.

use crate::record::Record;
use thiserror::Error;

/// Errors that can occur while writing output
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// Receives the merged record sequence of a completed session
///
/// A sink is handed the whole sequence in a single call once merging is
/// done; nothing is written while pages are still in flight.
pub trait ResultSink {
    /// Writes the final record sequence
    ///
    /// # Arguments
    ///
    /// * `records` - De-duplicated records in ascending page order
    fn write(&self, records: &[Record]) -> SinkResult<()>;
}
