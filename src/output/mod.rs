//! Output module for persisting collected records
//!
//! This module handles:
//! - The sink trait that receives a session's final record sequence
//! - CSV formatting and file writing

mod csv;
mod traits;

pub use csv::{format_csv, CsvSink};
pub use traits::{ResultSink, SinkError, SinkResult};
