//! CLI entry point for the fdroidswh tool.

use std::collections::HashSet;

use anyhow::{Context, Result, bail};
use clap::Parser;
use fdroidswh::{ArchiveConfig, IndexSource, Ledger, Scheduler, load_or_fetch};
use tracing::{debug, info};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");
    info!("fdroidswh starting");

    // Fail fast on a missing credential before any network activity.
    let token = if args.list_only {
        String::new()
    } else {
        match args.resolve_token() {
            Some(token) => token,
            None => bail!("missing Software Heritage token: pass --swh-token or set SWH_TOKEN"),
        }
    };

    let client = reqwest::Client::builder()
        .gzip(true)
        .build()
        .context("failed to build index HTTP client")?;

    let source = IndexSource::new(args.index_url.clone(), args.index_cache.clone());
    let index = load_or_fetch(&client, &source, args.refresh)
        .await
        .context("failed to load package index")?;

    // Write the worklist listing (newest packages first) on every run.
    let listing = index.worklist_newest_first();
    let mut contents = listing.join("\n");
    contents.push('\n');
    tokio::fs::write(&args.worklist_out, contents)
        .await
        .with_context(|| format!("failed to write {}", args.worklist_out.display()))?;
    info!(
        path = %args.worklist_out.display(),
        repos = listing.len(),
        "worklist written"
    );

    if args.list_only {
        return Ok(());
    }

    let worklist: HashSet<String> = index.source_code_worklist();

    let config = ArchiveConfig::default().with_concurrency(usize::from(args.concurrency));
    let ledger = Ledger::load(&args.ledger)
        .await
        .context("failed to load progress ledger")?;
    let mut scheduler = Scheduler::new(&token, config, ledger)?;

    let stats = scheduler.run(&worklist).await?;

    info!(
        submitted = stats.submitted(),
        rate_limited = stats.rate_limited(),
        invalid = stats.invalid(),
        failed = stats.failed(),
        skipped = stats.skipped(),
        total = stats.processed(),
        "run complete"
    );

    Ok(())
}
