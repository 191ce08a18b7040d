//! Source adapters: one uniform paging contract over structurally different
//! clip origins.
//!
//! Every configured source is driven through the [`SourceAdapter`] trait. The
//! orchestrator calls [`SourceAdapter::fetch_page`] in a loop; each call
//! yields a batch of [`Candidate`]s plus a [`PageTurn`] saying whether another
//! page exists. Pagination state (current page, remaining quota) lives inside
//! the adapter instance and is never shared between sources.
//!
//! # Architecture
//!
//! - [`SourceAdapter`] - async trait implemented by the closed set of variants
//! - [`GalleryAdapter`](gallery::GalleryAdapter) - paginated HTML gallery with CSS-selector extraction
//! - [`JsonFeedAdapter`](feed::JsonFeedAdapter) - single-shot JSON listing
//! - [`VideoSearchAdapter`](search::VideoSearchAdapter) - search backend via the extraction collaborator
//! - [`build_adapter`] - tagged dispatch from a [`SourceConfig`] `kind` to an adapter
//!
//! Dispatch is deliberately a closed tagged set rather than open subclassing:
//! adding a source kind means adding a config variant and an adapter, and the
//! match in [`build_adapter`] stays exhaustive.

mod error;
pub mod feed;
pub mod gallery;
pub mod search;

pub use error::FetchError;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{ConfigError, SourceConfig, SourceKind};
use crate::extract::MediaResolver;
use crate::limiter::RateLimiter;

/// Browser-like user agent sent with every scrape request.
pub(crate) const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Media kind of a candidate, derived from its URL extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Proper video container (mp4, webm, mkv, mov).
    Video,
    /// Animated GIF.
    Gif,
    /// Still image.
    Image,
}

impl MediaKind {
    /// Classifies a URL by its path extension. Returns `None` for unknown
    /// extensions or extension-less URLs.
    #[must_use]
    pub fn from_url(url: &str) -> Option<Self> {
        let path = url.split(['?', '#']).next().unwrap_or(url).to_lowercase();
        if [".mp4", ".webm", ".mkv", ".mov"]
            .iter()
            .any(|ext| path.ends_with(ext))
        {
            Some(Self::Video)
        } else if path.ends_with(".gif") {
            Some(Self::Gif)
        } else if [".jpg", ".jpeg", ".png", ".webp"]
            .iter()
            .any(|ext| path.ends_with(ext))
        {
            Some(Self::Image)
        } else {
            None
        }
    }

    /// Whether this kind counts as non-video for the media-preference rule.
    #[must_use]
    pub fn is_image_like(self) -> bool {
        matches!(self, Self::Gif | Self::Image)
    }
}

/// One discovered clip, not yet downloaded.
///
/// Created by an adapter, judged by the filter, consumed by the download
/// pipeline. Immutable once yielded; never persisted.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Name of the source that produced this candidate.
    pub source: String,
    /// Media URL (direct) or page URL (when `needs_resolve` is set).
    pub url: String,
    /// Whether the URL must go through the extraction collaborator before a
    /// plain HTTP transfer can fetch it.
    pub needs_resolve: bool,
    /// Clip duration in seconds, when known at discovery time.
    pub duration: Option<f64>,
    /// Media kind, when derivable.
    pub media: Option<MediaKind>,
    /// Human-readable title, used for filename derivation.
    pub title: Option<String>,
    /// Backend identifier, used for filename derivation and dedup.
    pub id: Option<String>,
    /// Tag metadata exposed by the source, advisory only.
    pub tags: Vec<String>,
    /// Duration window the downstream resolve step must re-apply, for
    /// candidates discovered through a duration-bounded search.
    pub duration_window: Option<(f64, f64)>,
}

impl Candidate {
    /// Creates a direct-link candidate with media kind derived from the URL.
    #[must_use]
    pub fn direct(source: impl Into<String>, url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            source: source.into(),
            media: MediaKind::from_url(&url),
            url,
            needs_resolve: false,
            duration: None,
            title: None,
            id: None,
            tags: Vec::new(),
            duration_window: None,
        }
    }

    /// The identity used for duplicate suppression within a run.
    ///
    /// The backend id wins when present (the same clip can surface under
    /// several URLs); otherwise the resolved URL is the identity.
    #[must_use]
    pub fn dedup_key(&self) -> String {
        match &self.id {
            Some(id) => format!("{}:{id}", self.source),
            None => self.url.clone(),
        }
    }
}

/// Whether another page can be fetched after the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageTurn {
    /// A further page exists; call `fetch_page` again.
    Next,
    /// The source is exhausted; no further network calls for it.
    End,
}

/// The result of fetching one page: a batch of candidates plus the
/// continuation signal.
#[derive(Debug)]
pub struct FetchedPage {
    /// Candidates extracted from this page, in page order.
    pub candidates: Vec<Candidate>,
    /// Whether the adapter has more pages to offer.
    pub turn: PageTurn,
}

impl FetchedPage {
    /// A terminal page carrying the given candidates.
    #[must_use]
    pub fn last(candidates: Vec<Candidate>) -> Self {
        Self {
            candidates,
            turn: PageTurn::End,
        }
    }

    /// A non-terminal page carrying the given candidates.
    #[must_use]
    pub fn more(candidates: Vec<Candidate>) -> Self {
        Self {
            candidates,
            turn: PageTurn::Next,
        }
    }
}

/// Uniform paging contract over one configured source.
///
/// # Object Safety
///
/// Uses `async_trait` so the orchestrator can hold `Box<dyn SourceAdapter>`
/// built from the config's `kind` tag.
///
/// # Error policy
///
/// A returned [`FetchError`] means this source is done for the run; partial
/// results from earlier pages stay valid. Adapters never retry internally.
#[async_trait]
pub trait SourceAdapter: Send {
    /// Returns the configured source name.
    fn name(&self) -> &str;

    /// Fetches the next page of candidates.
    ///
    /// Every call that performs a network request first passes through the
    /// shared rate limiter. After a page with [`PageTurn::End`] (or an error)
    /// the adapter must not be called again; if it is, it returns an empty
    /// terminal page.
    async fn fetch_page(&mut self) -> Result<FetchedPage, FetchError>;
}

/// Builds the adapter for a source config, dispatching on its `kind` tag.
///
/// # Errors
///
/// Returns [`ConfigError`] if the descriptor fails validation or if a
/// video-search source is configured but no extraction backend is available.
/// Either way the orchestrator skips just this source.
pub fn build_adapter(
    config: &SourceConfig,
    client: &reqwest::Client,
    limiter: Arc<RateLimiter>,
    resolver: Option<Arc<dyn MediaResolver>>,
) -> Result<Box<dyn SourceAdapter>, ConfigError> {
    config.validate()?;
    match &config.kind {
        SourceKind::Gallery(gallery) => Ok(Box::new(gallery::GalleryAdapter::new(
            &config.name,
            gallery.clone(),
            client.clone(),
            limiter,
        )?)),
        SourceKind::JsonFeed(feed) => Ok(Box::new(feed::JsonFeedAdapter::new(
            &config.name,
            feed.clone(),
            client.clone(),
            limiter,
        ))),
        SourceKind::VideoSearch(search) => {
            let resolver = resolver.ok_or_else(|| {
                ConfigError::invalid_source(&config.name, "no video-extraction backend available")
            })?;
            Ok(Box::new(search::VideoSearchAdapter::new(
                &config.name,
                search.clone(),
                limiter,
                resolver,
            )))
        }
    }
}

/// Fetches a page body as text, applying the shared request delay first.
pub(crate) async fn fetch_text(
    client: &reqwest::Client,
    limiter: &RateLimiter,
    url: &str,
    accept: Option<&str>,
) -> Result<String, FetchError> {
    limiter.wait().await;

    let mut request = client.get(url).header(reqwest::header::USER_AGENT, USER_AGENT);
    if let Some(accept) = accept {
        request = request.header(reqwest::header::ACCEPT, accept);
    }

    let response = request
        .send()
        .await
        .map_err(|source| FetchError::network(url, source))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::http_status(url, status.as_u16()));
    }

    response
        .text()
        .await
        .map_err(|source| FetchError::network(url, source))
}
