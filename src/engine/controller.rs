//! Pagination controller - session orchestration
//!
//! This module drives one collection session from first fetch to merged
//! records. Page 1 is fetched alone to discover the listing's extent, then
//! the remaining pages fan out as concurrent tasks behind a semaphore,
//! either as one computed batch (`known-total`) or as successive probe
//! batches until a page signals the end (`sentinel`). A hard page ceiling
//! bounds both modes.
//!
//! Failures stay page-local: a page that cannot be fetched or parsed
//! enters the merge as an empty result. A session never aborts once it
//! has started.

use crate::config::{Config, DiscoveryMode};
use crate::engine::aggregator::merge;
use crate::engine::fetcher::PageFetcher;
use crate::engine::types::{Continuation, PageRequest, PageResult, SessionPhase, SessionReport};
use crate::extract::{adapter_for, ExtractionAdapter};
use crate::record::KeyChain;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Drives collection sessions for one configured source
pub struct PaginationController {
    config: Arc<Config>,
    fetcher: Arc<PageFetcher>,
    adapter: Arc<dyn ExtractionAdapter>,
    limiter: Arc<Semaphore>,
}

impl PaginationController {
    /// Creates a controller, compiling extraction rules and building the
    /// HTTP client
    ///
    /// # Arguments
    ///
    /// * `config` - The validated source configuration
    ///
    /// # Returns
    ///
    /// * `Ok(PaginationController)` - Ready to run sessions
    /// * `Err(VitrinError)` - Invalid extraction rules or client build failure
    pub fn new(config: Config) -> crate::Result<Self> {
        let adapter = adapter_for(&config.extract)?;
        let fetcher = Arc::new(PageFetcher::new(&config.source)?);
        let limiter = Arc::new(Semaphore::new(config.source.concurrency as usize));

        Ok(Self {
            config: Arc::new(config),
            fetcher,
            adapter,
            limiter,
        })
    }

    /// Runs one collection session to completion
    ///
    /// Always produces a report; page failures and a missing total are
    /// reflected in its counters rather than surfaced as errors.
    pub async fn collect(&self) -> SessionReport {
        let source = &self.config.source;
        let mut session = Session::new();

        tracing::info!(
            "collecting '{}' ({:?}, page size {}, concurrency {})",
            source.name,
            source.discovery,
            source.page_size,
            source.concurrency
        );

        session.advance(SessionPhase::Discovering);
        let first = collect_page(
            &self.fetcher,
            self.adapter.as_ref(),
            PageRequest::new(1, source.page_size),
        )
        .await;
        session.issued += 1;

        match source.discovery {
            DiscoveryMode::KnownTotal => {
                session.advance(SessionPhase::Expanding);
                self.expand(first, &mut session).await;
            }
            DiscoveryMode::Sentinel => {
                session.advance(SessionPhase::Iterating);
                self.iterate(first, &mut session).await;
            }
        }

        session.advance(SessionPhase::Merging);
        let keys = KeyChain::new(self.config.identity.key_fields.clone());
        let outcome = merge(std::mem::take(&mut session.results), &keys);
        session.advance(SessionPhase::Done);

        tracing::info!(
            "'{}': {} unique records from {} pages ({} duplicates, {} keyless, {} failed pages)",
            source.name,
            outcome.records.len(),
            session.issued,
            outcome.duplicates_removed,
            outcome.keyless_dropped,
            session.failed
        );

        SessionReport {
            records: outcome.records,
            pages_requested: session.issued,
            pages_failed: session.failed,
            records_seen: outcome.records_seen,
            duplicates_removed: outcome.duplicates_removed,
            keyless_dropped: outcome.keyless_dropped,
            terminal_page: session.terminal,
            capped: session.capped,
        }
    }

    /// Known-total mode: compute the remaining extent from page 1's signal
    /// and fetch it as one batch
    async fn expand(&self, first: PageResult, session: &mut Session) {
        let source = &self.config.source;

        let additional = match first.continuation {
            Continuation::Total(total) => {
                pages_after_first(total, first.records.len(), source.page_size)
            }
            Continuation::LastPage(last) => last.saturating_sub(1),
            Continuation::HasMore(_) | Continuation::Unknown => {
                tracing::warn!(
                    "'{}' revealed no listing extent on page 1; keeping page 1 only",
                    source.name
                );
                session.push(first);
                return;
            }
        };

        tracing::info!(
            "discovery: {} ({} additional pages)",
            first.continuation,
            additional
        );
        session.push(first);

        let ceiling = source.max_pages.saturating_sub(1);
        let additional = if additional > ceiling {
            tracing::warn!(
                "'{}' advertises {} additional pages; clamping to ceiling {}",
                source.name,
                additional,
                source.max_pages
            );
            session.capped = true;
            ceiling
        } else {
            additional
        };

        if additional == 0 {
            return;
        }

        let indices: Vec<u32> = (2..=additional + 1).collect();
        session.issued += indices.len() as u32;

        for result in self.dispatch_batch(indices).await {
            session.push(result);
        }
    }

    /// Sentinel mode: probe batches of contiguous indices until a page
    /// signals the end or the ceiling is reached
    ///
    /// Each batch is scanned in ascending index order. The first page that
    /// does not promise more is the terminal page: its records are kept,
    /// every later index in the batch is discarded, and the session stops.
    /// Completion order never influences the outcome.
    async fn iterate(&self, first: PageResult, session: &mut Session) {
        let source = &self.config.source;

        let more = first.continuation.more_follows();
        session.push(first);
        if !more {
            session.terminal = Some(1);
            tracing::info!("'{}' ended at page 1", source.name);
            return;
        }

        let mut next = 2u32;
        while next <= source.max_pages {
            let batch_end = next
                .saturating_add(source.concurrency.saturating_sub(1))
                .min(source.max_pages);
            let indices: Vec<u32> = (next..=batch_end).collect();
            session.issued += indices.len() as u32;

            let mut results = self.dispatch_batch(indices).await;
            results.sort_by_key(|result| result.index);

            for result in results {
                if let Some(terminal) = session.terminal {
                    tracing::debug!(
                        "discarding page {} past the end at page {}",
                        result.index,
                        terminal
                    );
                    continue;
                }

                let more = result.continuation.more_follows();
                let index = result.index;
                session.push(result);

                if !more {
                    session.terminal = Some(index);
                }
            }

            if let Some(terminal) = session.terminal {
                tracing::info!("'{}' ended at page {}", source.name, terminal);
                return;
            }

            next = match next_probe_index(batch_end) {
                Some(index) => index,
                None => break,
            };
        }

        tracing::warn!(
            "page ceiling {} reached before '{}' signalled an end",
            source.max_pages,
            source.name
        );
        session.capped = true;
    }

    /// Fans a batch of page indices out as concurrent tasks and waits for
    /// all of them
    ///
    /// The semaphore keeps at most `concurrency` fetches in flight. Every
    /// index comes back as a result; a panicked task degrades to a failed
    /// page like any other failure.
    async fn dispatch_batch(&self, indices: Vec<u32>) -> Vec<PageResult> {
        let page_size = self.config.source.page_size;
        let mut handles = Vec::with_capacity(indices.len());

        for &index in &indices {
            let fetcher = Arc::clone(&self.fetcher);
            let adapter = Arc::clone(&self.adapter);
            let limiter = Arc::clone(&self.limiter);

            handles.push(tokio::spawn(async move {
                let _permit = match limiter.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return PageResult::failed(index, "concurrency limiter closed"),
                };

                collect_page(&fetcher, adapter.as_ref(), PageRequest::new(index, page_size))
                    .await
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (joined, index) in join_all(handles).await.into_iter().zip(indices) {
            match joined {
                Ok(result) => results.push(result),
                Err(err) => {
                    tracing::warn!("page {} task failed: {}", index, err);
                    results.push(PageResult::failed(index, format!("task failed: {}", err)));
                }
            }
        }

        results
    }
}

/// Fetches and extracts one page, folding any failure into the result
async fn collect_page(
    fetcher: &PageFetcher,
    adapter: &dyn ExtractionAdapter,
    request: PageRequest,
) -> PageResult {
    let payload = match fetcher.fetch(&request).await {
        Ok(payload) => payload,
        Err(err) => {
            tracing::warn!("page {} failed: {}", request.index, err);
            return PageResult::failed(request.index, err.to_string());
        }
    };

    match adapter.parse(&payload) {
        Ok(extraction) => {
            tracing::info!(
                "page {:>3} -> {:>3} records",
                request.index,
                extraction.records.len()
            );
            PageResult::new(request.index, extraction.records, extraction.continuation)
        }
        Err(err) => {
            tracing::warn!("page {} failed: {}", request.index, err);
            PageResult::failed(request.index, err.to_string())
        }
    }
}

/// Number of pages after page 1 needed to cover an advertised total
///
/// Uses the observed page 1 record count, so a short first page is not
/// over-trusted and a total at or below it means nothing more to fetch.
/// Oversized totals saturate to `u32::MAX` pages for the ceiling to clamp.
fn pages_after_first(total: u64, first_count: usize, page_size: u32) -> u32 {
    let page_size = u64::from(page_size.max(1));
    let remaining = total.saturating_sub(first_count as u64);
    let pages = remaining.div_ceil(page_size);

    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// First index to probe after a wave ending at `batch_end`
///
/// `None` once the wave has reached the last representable index.
fn next_probe_index(batch_end: u32) -> Option<u32> {
    batch_end.checked_add(1)
}

/// Per-session bookkeeping while pages are in flight
struct Session {
    phase: SessionPhase,
    results: Vec<PageResult>,
    issued: u32,
    failed: u32,
    terminal: Option<u32>,
    capped: bool,
}

impl Session {
    fn new() -> Self {
        Self {
            phase: SessionPhase::Init,
            results: Vec::new(),
            issued: 0,
            failed: 0,
            terminal: None,
            capped: false,
        }
    }

    fn advance(&mut self, phase: SessionPhase) {
        tracing::debug!("session phase: {} -> {}", self.phase, phase);
        self.phase = phase;
    }

    /// Records a page result destined for the merge
    fn push(&mut self, result: PageResult) {
        if result.is_failed() {
            self.failed += 1;
        }
        self.results.push(result);
    }
}
