//! Error type for source page fetches.

use thiserror::Error;

use crate::extract::ExtractError;

/// A transient failure while fetching or parsing one page of a source.
///
/// Any of these ends that source's pagination loop early. Candidates already
/// yielded by previous pages are kept; the orchestrator moves on to the next
/// source rather than aborting the run. No retry happens inside an adapter.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connect, TLS, timeout).
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The page URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Non-2xx HTTP response for a page fetch.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The page URL that failed.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The response body could not be read or parsed as the expected format.
    #[error("unparsable response body from {url}: {detail}")]
    Body {
        /// The page URL that failed.
        url: String,
        /// What went wrong while decoding.
        detail: String,
    },

    /// The video-extraction backend failed for a whole search call.
    #[error(transparent)]
    Extractor(#[from] ExtractError),
}

impl FetchError {
    /// Creates a network error for the given page URL.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a body-decoding error.
    pub fn body(url: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Body {
            url: url.into(),
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_display() {
        let error = FetchError::http_status("https://gallery.example/posts", 503);
        let msg = error.to_string();
        assert!(msg.contains("503"), "expected status in: {msg}");
        assert!(
            msg.contains("https://gallery.example/posts"),
            "expected URL in: {msg}"
        );
    }

    #[test]
    fn test_body_display() {
        let error = FetchError::body("https://feed.example/.json", "expected JSON object");
        let msg = error.to_string();
        assert!(msg.contains("unparsable"), "got: {msg}");
        assert!(msg.contains("expected JSON object"), "got: {msg}");
    }
}
