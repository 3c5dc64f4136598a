//! Collection engine
//!
//! This module contains the core collection logic, including:
//! - HTTP page fetching with typed failures
//! - Discovery of the listing extent (known-total and sentinel modes)
//! - Bounded-concurrency page fan-out
//! - Merging and de-duplication of page results

mod aggregator;
mod controller;
mod fetcher;
mod types;

pub use aggregator::{merge, MergeOutcome};
pub use controller::PaginationController;
pub use fetcher::{build_http_client, FetchError, PageFetcher};
pub use types::{Continuation, PageRequest, PageResult, SessionPhase, SessionReport};

use crate::config::Config;

/// Runs one collection session for a source configuration
///
/// This is the main entry point for collecting a source. It will:
/// 1. Compile the extraction rules into an adapter
/// 2. Build the HTTP client
/// 3. Fetch page 1 and discover the listing extent
/// 4. Fan out the remaining pages under the concurrency limit
/// 5. Merge and de-duplicate the results
///
/// # Arguments
///
/// * `config` - The validated source configuration
///
/// # Returns
///
/// * `Ok(SessionReport)` - Merged records and session counters
/// * `Err(VitrinError)` - Setup failed before any page was fetched
///
/// # Example
///
/// ```no_run
/// use vitrin::config::load_config;
/// use vitrin::engine::collect;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("sources/shop.toml"))?;
/// let report = collect(config).await?;
/// println!("{} records", report.records.len());
/// # Ok(())
/// # }
/// ```
pub async fn collect(config: Config) -> crate::Result<SessionReport> {
    let controller = PaginationController::new(config)?;
    Ok(controller.collect().await)
}
