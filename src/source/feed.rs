//! Single-shot JSON feed adapter.
//!
//! Fetches one structured listing (subreddit-style shape: `data.children[]`
//! with a `data` record per post), maps up to `max_items` entries to
//! candidates, and terminates after that single call. There is no pagination
//! for this kind.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::config::JsonFeedSource;
use crate::limiter::RateLimiter;
use crate::source::{
    Candidate, FetchError, FetchedPage, MediaKind, SourceAdapter, fetch_text,
};

/// Adapter over one configured JSON feed source.
pub struct JsonFeedAdapter {
    name: String,
    config: JsonFeedSource,
    client: reqwest::Client,
    limiter: Arc<RateLimiter>,
    done: bool,
}

/// Feed shape; unknown fields are ignored throughout.
#[derive(Debug, Deserialize)]
struct Listing {
    #[serde(default)]
    data: ListingData,
}

#[derive(Debug, Default, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Post>,
}

#[derive(Debug, Deserialize)]
struct Post {
    #[serde(default)]
    data: PostData,
}

#[derive(Debug, Default, Deserialize)]
struct PostData {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    secure_media: Option<SecureMedia>,
}

#[derive(Debug, Deserialize)]
struct SecureMedia {
    #[serde(default)]
    reddit_video: Option<RedditVideo>,
}

#[derive(Debug, Deserialize)]
struct RedditVideo {
    #[serde(default)]
    fallback_url: Option<String>,
}

impl JsonFeedAdapter {
    /// Creates the adapter for one feed source.
    #[must_use]
    pub fn new(
        name: &str,
        config: JsonFeedSource,
        client: reqwest::Client,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            name: name.to_string(),
            config,
            client,
            limiter,
            done: false,
        }
    }

    /// Maps the first `max_items` feed posts to candidates.
    fn map_listing(&self, listing: Listing) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        for post in listing.data.children.into_iter().take(self.config.max_items) {
            let Some(candidate) = map_post(&self.name, post.data) else {
                continue;
            };
            candidates.push(candidate);
        }
        candidates
    }
}

/// Maps one post record to a candidate, or `None` if the post carries no
/// usable direct media link.
fn map_post(source: &str, post: PostData) -> Option<Candidate> {
    let mut url = post.url?;

    // Gallery posts bundle several images behind one link; skip them.
    if url.contains("gallery") {
        return None;
    }

    // Hosted video links need the fallback URL, which is a plain media file.
    if url.contains("v.redd.it") {
        url = post
            .secure_media
            .and_then(|m| m.reddit_video)
            .and_then(|v| v.fallback_url)?;
    }

    // Only direct links to media files are usable without extraction.
    MediaKind::from_url(&url)?;

    let mut candidate = Candidate::direct(source, url);
    candidate.title = post.title;
    Some(candidate)
}

#[async_trait]
impl SourceAdapter for JsonFeedAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self), fields(source = %self.name))]
    async fn fetch_page(&mut self) -> Result<FetchedPage, FetchError> {
        if self.done {
            return Ok(FetchedPage::last(Vec::new()));
        }
        self.done = true;

        let body = fetch_text(
            &self.client,
            &self.limiter,
            &self.config.url,
            Some("application/json"),
        )
        .await?;

        let listing: Listing = serde_json::from_str(&body)
            .map_err(|error| FetchError::body(&self.config.url, error.to_string()))?;

        let candidates = self.map_listing(listing);
        debug!(found = candidates.len(), "feed mapped");
        Ok(FetchedPage::last(candidates))
    }
}
