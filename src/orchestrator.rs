//! Run orchestration: drives every configured source through discovery,
//! filtering and download, under one run-wide ceiling.
//!
//! Sources are processed strictly one at a time, in configured order, and
//! pagination within a source is strictly sequential. At no point do two
//! network operations overlap, so the rate limiter's per-call delay is the
//! entire backpressure mechanism. The only early-exit is the ceiling,
//! checked between completed operations, never by interrupting one in
//! flight.
//!
//! Failure isolation: a bad source descriptor or a mid-pagination fetch
//! error finishes that source (keeping partial results) and the run moves to
//! the next source. Nothing short of ceiling-reached or source-list
//! exhaustion ends the run.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::config::RunConfig;
use crate::download::{DownloadPipeline, DownloadResult};
use crate::extract::MediaResolver;
use crate::filter::{CandidateFilter, Verdict};
use crate::limiter::RateLimiter;
use crate::source::{PageTurn, build_adapter};

/// Aggregate counters and per-candidate results for one invocation.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Candidates that passed the filter and were handed to the pipeline.
    pub attempted: usize,
    /// Downloads that produced a file on disk.
    pub succeeded: usize,
    /// Downloads that failed (network, extraction, disk).
    pub failed: usize,
    /// Candidates rejected as duplicates of an earlier accepted one.
    pub skipped_duplicate: usize,
    /// Candidates rejected by the media-type or duration rules.
    pub skipped_filtered: usize,
    /// Sources that ended on a configuration or fetch error.
    pub source_errors: usize,
    /// Every download attempt's outcome, in run order.
    pub results: Vec<DownloadResult>,
}

impl RunSummary {
    /// Paths of every successfully saved clip, in run order.
    #[must_use]
    pub fn saved_paths(&self) -> Vec<PathBuf> {
        self.results
            .iter()
            .filter_map(|r| r.path().map(Path::to_path_buf))
            .collect()
    }

    /// Whether the run produced nothing and at least one source was broken,
    /// the condition the CLI maps to a non-zero exit.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.succeeded == 0 && self.source_errors > 0
    }
}

/// Owns one scrape run over the configured source list.
pub struct ScrapeOrchestrator {
    config: RunConfig,
    client: reqwest::Client,
    limiter: Arc<RateLimiter>,
    resolver: Option<Arc<dyn MediaResolver>>,
    pipeline: DownloadPipeline,
}

impl ScrapeOrchestrator {
    /// Creates an orchestrator from an immutable run configuration and an
    /// optional extraction backend.
    ///
    /// Without a backend, video-search sources are skipped (recorded as
    /// source errors) and candidates needing resolution fail individually.
    #[must_use]
    pub fn new(config: RunConfig, resolver: Option<Arc<dyn MediaResolver>>) -> Self {
        let client = reqwest::Client::new();
        let limiter = Arc::new(RateLimiter::from_secs(config.min_delay, config.max_delay));
        let pipeline =
            DownloadPipeline::new(client.clone(), Arc::clone(&limiter), resolver.clone());
        Self {
            config,
            client,
            limiter,
            resolver,
            pipeline,
        }
    }

    /// Runs the full scrape: every source in order, until the source list is
    /// exhausted or the download ceiling is reached.
    ///
    /// Clips land under `output_dir`, or `output_dir/<category>` when a
    /// category is given.
    #[instrument(skip(self), fields(sources = self.config.sources.len(), limit = self.config.download_limit))]
    pub async fn run(&self, output_dir: &Path, category: Option<&str>) -> RunSummary {
        let target_dir = match category {
            Some(category) => output_dir.join(category),
            None => output_dir.to_path_buf(),
        };

        let ceiling = self.config.download_limit;
        let mut summary = RunSummary::default();
        let mut seen: HashSet<String> = HashSet::new();
        let mut filter = CandidateFilter::new(self.config.media_preference, ceiling);

        info!(target_dir = %target_dir.display(), "scrape run starting");

        'sources: for source in &self.config.sources {
            if ceiling > 0 && summary.succeeded >= ceiling {
                break;
            }

            let mut adapter = match build_adapter(
                source,
                &self.client,
                Arc::clone(&self.limiter),
                self.resolver.clone(),
            ) {
                Ok(adapter) => adapter,
                Err(error) => {
                    warn!(source = %source.name, error = %error, "skipping unusable source");
                    summary.source_errors += 1;
                    continue;
                }
            };

            info!(source = %source.name, "scraping source");

            loop {
                let page = match adapter.fetch_page().await {
                    Ok(page) => page,
                    Err(error) => {
                        // Partial results from earlier pages stand; only this
                        // source's loop ends here.
                        warn!(source = %source.name, error = %error, "source ended on fetch error");
                        summary.source_errors += 1;
                        break;
                    }
                };

                for candidate in &page.candidates {
                    match filter.accept(candidate, &mut seen) {
                        Verdict::Accept => {
                            summary.attempted += 1;
                            let result = self.pipeline.download(candidate, &target_dir).await;
                            if result.is_success() {
                                summary.succeeded += 1;
                            } else {
                                summary.failed += 1;
                            }
                            summary.results.push(result);

                            if ceiling > 0 && summary.succeeded >= ceiling {
                                info!(ceiling, "download ceiling reached");
                                break 'sources;
                            }
                        }
                        Verdict::RejectedDuplicate => summary.skipped_duplicate += 1,
                        Verdict::RejectedMediaType | Verdict::RejectedDuration => {
                            summary.skipped_filtered += 1;
                        }
                    }
                }

                match page.turn {
                    PageTurn::Next => {}
                    PageTurn::End => break,
                }
            }
        }

        info!(
            attempted = summary.attempted,
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped_duplicate = summary.skipped_duplicate,
            skipped_filtered = summary.skipped_filtered,
            source_errors = summary.source_errors,
            "scrape run complete"
        );
        summary
    }
}
