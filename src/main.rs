//! CLI entry point for the clip scraper tool.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use clipscraper_core::{
    CommandEnhancer, Enhancer, MediaPreference, RunConfig, ScrapeOrchestrator, YtDlpResolver,
};
use tracing::{debug, info, warn};

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

    let mut config = RunConfig::load_or_create(&args.config)?;

    let enhancer: Box<dyn Enhancer> = Box::new(CommandEnhancer::new(config.enhance.clone()));

    // Enhance-only mode: no scraping, just run the upscaler over a directory.
    if let Some(dir) = &args.enhance_only {
        let outcomes = enhancer.enhance_directory(dir).await?;
        info!(enhanced = outcomes.len(), dir = %dir.display(), "enhancement pass complete");
        return Ok(());
    }

    // CLI flags override the config file for this run only.
    if let Some(limit) = args.limit {
        config.download_limit = limit;
    }
    if args.prefer_video {
        config.media_preference = MediaPreference::Strict;
    }
    if let Some(query) = &args.search {
        info!(query = %query, "applying search query override");
        config.apply_search_query(query);
    }
    let run_enhance = args.enhance || config.enhance.enabled;

    info!(
        sources = config.sources.len(),
        limit = config.download_limit,
        "clip scraper starting"
    );

    let orchestrator = ScrapeOrchestrator::new(config.clone(), Some(Arc::new(YtDlpResolver::new())));
    let summary = orchestrator.run(&args.output, args.category.as_deref()).await;

    info!(
        attempted = summary.attempted,
        succeeded = summary.succeeded,
        failed = summary.failed,
        skipped_duplicate = summary.skipped_duplicate,
        skipped_filtered = summary.skipped_filtered,
        source_errors = summary.source_errors,
        "scrape complete"
    );

    if run_enhance {
        let saved = summary.saved_paths();
        if saved.is_empty() {
            warn!("enhancement requested but no clips were downloaded");
        } else {
            let outcomes = enhancer.enhance_files(&saved).await;
            info!(enhanced = outcomes.len(), "enhancement pass complete");
        }
    }

    if summary.is_failure() {
        anyhow::bail!("no clips downloaded and at least one source failed");
    }

    Ok(())
}
