//! Video-search adapter, backed by the extraction collaborator.
//!
//! Issues one bounded search against the configured backend and maps the
//! results to candidates. This is the only adapter with duration metadata in
//! hand at query time, so results outside the configured window are dropped
//! here rather than left to the generic filter. Terminates after one call.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::config::VideoSearchSource;
use crate::extract::{MediaResolver, ResolvedMedia, duration_in_window};
use crate::limiter::RateLimiter;
use crate::source::{Candidate, FetchError, FetchedPage, MediaKind, SourceAdapter};

/// Adapter over one configured video-search source.
pub struct VideoSearchAdapter {
    name: String,
    config: VideoSearchSource,
    limiter: Arc<RateLimiter>,
    resolver: Arc<dyn MediaResolver>,
    done: bool,
}

impl VideoSearchAdapter {
    /// Creates the adapter for one search source.
    #[must_use]
    pub fn new(
        name: &str,
        config: VideoSearchSource,
        limiter: Arc<RateLimiter>,
        resolver: Arc<dyn MediaResolver>,
    ) -> Self {
        Self {
            name: name.to_string(),
            config,
            limiter,
            resolver,
            done: false,
        }
    }

    /// Maps one search result to a candidate.
    ///
    /// Results whose URL is not a plain media file are flagged for the
    /// extraction step at download time, carrying the same duration window.
    fn map_result(&self, result: ResolvedMedia) -> Candidate {
        let needs_resolve = MediaKind::from_url(&result.media_url).is_none();
        Candidate {
            source: self.name.clone(),
            media: MediaKind::from_url(&result.media_url).or(Some(MediaKind::Video)),
            url: result.media_url,
            needs_resolve,
            duration: result.duration,
            title: result.title,
            id: result.id,
            tags: Vec::new(),
            duration_window: Some((self.config.min_duration, self.config.max_duration)),
        }
    }
}

#[async_trait]
impl SourceAdapter for VideoSearchAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self), fields(source = %self.name, query = %self.config.query))]
    async fn fetch_page(&mut self) -> Result<FetchedPage, FetchError> {
        if self.done {
            return Ok(FetchedPage::last(Vec::new()));
        }
        self.done = true;

        self.limiter.wait().await;
        let results = self
            .resolver
            .search(
                &self.config.query,
                self.config.max_results,
                self.config.min_duration,
                self.config.max_duration,
            )
            .await?;

        // The backend is asked to honor the window, but nothing downstream
        // may ever see an out-of-window duration, so it is enforced again.
        let candidates: Vec<Candidate> = results
            .into_iter()
            .filter(|r| {
                duration_in_window(r.duration, self.config.min_duration, self.config.max_duration)
            })
            .take(self.config.max_results)
            .map(|r| self.map_result(r))
            .collect();

        debug!(found = candidates.len(), "search results mapped");
        Ok(FetchedPage::last(candidates))
    }
}
