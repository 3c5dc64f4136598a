//! Vitrin main entry point
//!
//! This is the command-line interface for the Vitrin catalog collector.

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use vitrin::config::{load_config, Config, DiscoveryMode, HttpMethod};
use vitrin::engine::collect;
use vitrin::output::{CsvSink, ResultSink};

/// Vitrin: a bounded-concurrency catalog collector
///
/// Vitrin harvests a paginated listing into a de-duplicated CSV file. One
/// TOML file describes the source: where the pages live, how the end of
/// the listing is discovered, and how records are extracted from each page.
#[derive(Parser, Debug)]
#[command(name = "vitrin")]
#[command(version = "0.1.0")]
#[command(about = "A bounded-concurrency catalog collector", long_about = None)]
struct Cli {
    /// Path to TOML source configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be fetched without fetching
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_collect(config).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("vitrin=info,warn"),
            1 => EnvFilter::new("vitrin=debug,info"),
            2 => EnvFilter::new("vitrin=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows the session plan
fn handle_dry_run(config: &Config) {
    let method = match config.source.method {
        HttpMethod::Get => "GET",
        HttpMethod::Post => "POST",
    };
    let discovery = match config.source.discovery {
        DiscoveryMode::KnownTotal => "known-total",
        DiscoveryMode::Sentinel => "sentinel",
    };

    println!("=== Vitrin Dry Run ===\n");

    println!("Source:");
    println!("  Name: {}", config.source.name);
    println!("  Endpoint: {} {}", method, config.source.endpoint);
    println!("  First page URL: {}", config.source.page_url(1, 0));
    println!("  Discovery: {}", discovery);
    println!("  Page size: {}", config.source.page_size);
    println!("  Concurrency: {}", config.source.concurrency);
    println!("  Page ceiling: {}", config.source.max_pages);
    println!("  Request timeout: {}s", config.source.request_timeout);

    println!("\nExtraction ({} fields):", config.extract.fields.len());
    for field in &config.extract.fields {
        println!("  - {} ({} steps)", field.name, field.steps.len());
    }

    println!("\nIdentity keys:");
    for key in &config.identity.key_fields {
        println!("  - {}", key);
    }

    println!("\nOutput:");
    println!("  Path: {}", config.output.path);
    println!("  Columns: {}", config.output.columns.join(", "));

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would fetch up to {} pages from '{}'",
        config.source.max_pages, config.source.name
    );
}

/// Handles the main collection operation
async fn handle_collect(config: Config) -> anyhow::Result<()> {
    let sink = CsvSink::from_config(&config.output);
    let source_name = config.source.name.clone();

    let report = collect(config).await?;

    if report.pages_failed > 0 {
        tracing::warn!(
            "{} of {} pages failed and contributed no records",
            report.pages_failed,
            report.pages_requested
        );
    }

    if report.records.is_empty() {
        anyhow::bail!("no records collected from '{}'", source_name);
    }

    sink.write(&report.records)?;

    println!(
        "Collected {} unique records from '{}' ({} pages, {} duplicates removed)",
        report.records.len(),
        source_name,
        report.pages_requested,
        report.duplicates_removed
    );
    println!("✓ Saved to: {}", sink.path().display());

    Ok(())
}
