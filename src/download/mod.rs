//! Download pipeline: fetches accepted candidates to disk.
//!
//! Direct-link candidates are streamed straight to the target directory;
//! candidates flagged `needs_resolve` first go through the video-extraction
//! collaborator to obtain a fetchable media URL. Every transfer passes
//! through the shared rate limiter, writes to a collision-avoided path, and
//! must produce a non-zero byte count to be declared a success. Failures are
//! strictly per-candidate; the pipeline never aborts a run.

mod filename;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::StreamExt;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

use crate::extract::{ExtractError, MediaResolver};
use crate::limiter::RateLimiter;
use crate::source::{Candidate, USER_AGENT};

/// Errors that can fail one download attempt.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Network-level error during the transfer.
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The media URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Non-2xx HTTP response for the media URL.
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// The media URL that failed.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// File system error while writing the clip.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The destination path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The transfer completed but produced zero bytes.
    #[error("empty body downloading {url}")]
    EmptyBody {
        /// The media URL that produced no data.
        url: String,
    },

    /// The extraction collaborator failed for this candidate.
    #[error(transparent)]
    Extraction(#[from] ExtractError),

    /// The extraction collaborator found no usable media for the URL.
    #[error("no media resolved for {url}")]
    NoMedia {
        /// The page URL that could not be resolved.
        url: String,
    },

    /// The candidate needs extraction but no backend is configured.
    #[error("no extraction backend available for {url}")]
    NoResolver {
        /// The page URL that needed resolution.
        url: String,
    },
}

impl DownloadError {
    fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// How one download attempt ended.
#[derive(Debug)]
pub enum DownloadOutcome {
    /// The clip was written to disk.
    Saved {
        /// Final destination path.
        path: PathBuf,
        /// Bytes written; always non-zero.
        bytes: u64,
    },
    /// The attempt failed; the run continues with the next candidate.
    Failed(DownloadError),
}

/// Outcome of one download attempt, returned to the orchestrator for
/// tallying and logging.
#[derive(Debug)]
pub struct DownloadResult {
    /// Name of the source the candidate came from.
    pub source: String,
    /// The candidate's URL as discovered.
    pub url: String,
    /// Success or failure detail.
    pub outcome: DownloadOutcome,
}

impl DownloadResult {
    /// Whether the clip landed on disk.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, DownloadOutcome::Saved { .. })
    }

    /// The saved path, when successful.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match &self.outcome {
            DownloadOutcome::Saved { path, .. } => Some(path),
            DownloadOutcome::Failed(_) => None,
        }
    }
}

/// Streams accepted candidates to the target directory.
pub struct DownloadPipeline {
    client: reqwest::Client,
    limiter: Arc<RateLimiter>,
    resolver: Option<Arc<dyn MediaResolver>>,
}

impl DownloadPipeline {
    /// Creates a pipeline sharing the run's HTTP client and rate limiter.
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        limiter: Arc<RateLimiter>,
        resolver: Option<Arc<dyn MediaResolver>>,
    ) -> Self {
        Self {
            client,
            limiter,
            resolver,
        }
    }

    /// Downloads one candidate into `target_dir`.
    ///
    /// Never returns an error: every failure mode is folded into the
    /// [`DownloadResult`] so the orchestrator can tally it and move on.
    #[instrument(skip(self, candidate), fields(source = %candidate.source, url = %candidate.url))]
    pub async fn download(&self, candidate: &Candidate, target_dir: &Path) -> DownloadResult {
        let outcome = match self.try_download(candidate, target_dir).await {
            Ok((path, bytes)) => {
                info!(path = %path.display(), bytes, "download complete");
                DownloadOutcome::Saved { path, bytes }
            }
            Err(error) => {
                warn!(error = %error, "download failed");
                DownloadOutcome::Failed(error)
            }
        };
        DownloadResult {
            source: candidate.source.clone(),
            url: candidate.url.clone(),
            outcome,
        }
    }

    async fn try_download(
        &self,
        candidate: &Candidate,
        target_dir: &Path,
    ) -> Result<(PathBuf, u64), DownloadError> {
        tokio::fs::create_dir_all(target_dir)
            .await
            .map_err(|source| DownloadError::io(target_dir, source))?;

        let media_url = self.transfer_url(candidate).await?;
        let filename = filename::candidate_filename(candidate);
        let path = filename::resolve_unique_path(target_dir, &filename);

        self.limiter.wait().await;
        let bytes = self.stream_to_file(&media_url, &path).await?;
        if bytes == 0 {
            // Leave no empty artifact behind; removal failure is irrelevant.
            let _ = tokio::fs::remove_file(&path).await;
            return Err(DownloadError::EmptyBody { url: media_url });
        }
        Ok((path, bytes))
    }

    /// Returns the directly fetchable URL for a candidate, running the
    /// extraction collaborator when required.
    async fn transfer_url(&self, candidate: &Candidate) -> Result<String, DownloadError> {
        if !candidate.needs_resolve {
            return Ok(candidate.url.clone());
        }

        let resolver = self.resolver.as_ref().ok_or_else(|| DownloadError::NoResolver {
            url: candidate.url.clone(),
        })?;

        // Resolution fetches the page itself, so it pays the request delay
        // like any other outbound call.
        self.limiter.wait().await;
        let (min, max) = candidate.duration_window.unwrap_or((0.0, f64::INFINITY));
        let resolved = resolver.resolve(&candidate.url, min, max).await?;
        match resolved {
            Some(media) => {
                debug!(media_url = %media.media_url, "candidate resolved");
                Ok(media.media_url)
            }
            None => Err(DownloadError::NoMedia {
                url: candidate.url.clone(),
            }),
        }
    }

    /// Streams the response body to `path`, returning the byte count.
    async fn stream_to_file(&self, url: &str, path: &Path) -> Result<u64, DownloadError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await
            .map_err(|source| DownloadError::network(url, source))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let result = Self::write_body(response, url, path).await;
        if result.is_err() {
            // No partial artifact may survive a failed transfer.
            let _ = tokio::fs::remove_file(path).await;
        }
        result
    }

    async fn write_body(
        response: reqwest::Response,
        url: &str,
        path: &Path,
    ) -> Result<u64, DownloadError> {
        let mut file = tokio::fs::File::create(path)
            .await
            .map_err(|source| DownloadError::io(path, source))?;

        let mut bytes: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|source| DownloadError::network(url, source))?;
            file.write_all(&chunk)
                .await
                .map_err(|source| DownloadError::io(path, source))?;
            bytes += chunk.len() as u64;
        }

        file.flush()
            .await
            .map_err(|source| DownloadError::io(path, source))?;
        Ok(bytes)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::extract::ResolvedMedia;
    use async_trait::async_trait;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn pipeline(resolver: Option<Arc<dyn MediaResolver>>) -> DownloadPipeline {
        DownloadPipeline::new(
            reqwest::Client::new(),
            Arc::new(RateLimiter::disabled()),
            resolver,
        )
    }

    #[tokio::test]
    async fn test_direct_download_writes_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/clip.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"video-bytes".to_vec()))
            .mount(&server)
            .await;

        let temp = TempDir::new().unwrap();
        let candidate = Candidate::direct("g", format!("{}/clip.mp4", server.uri()));

        let result = pipeline(None).download(&candidate, temp.path()).await;
        assert!(result.is_success());
        let path = result.path().unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"video-bytes");
    }

    #[tokio::test]
    async fn test_existing_file_gets_suffixed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/clip.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"x".to_vec()))
            .mount(&server)
            .await;

        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("clip.mp4"), b"already here").unwrap();

        let candidate = Candidate::direct("g", format!("{}/clip.mp4", server.uri()));
        let result = pipeline(None).download(&candidate, temp.path()).await;
        assert_eq!(result.path().unwrap(), temp.path().join("clip_1.mp4"));
    }

    #[tokio::test]
    async fn test_http_error_is_per_candidate_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/clip.mp4"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let temp = TempDir::new().unwrap();
        let candidate = Candidate::direct("g", format!("{}/clip.mp4", server.uri()));
        let result = pipeline(None).download(&candidate, temp.path()).await;

        assert!(!result.is_success());
        let DownloadOutcome::Failed(DownloadError::HttpStatus { status, .. }) = result.outcome
        else {
            panic!("expected HTTP status failure");
        };
        assert_eq!(status, 404);
    }

    #[tokio::test]
    async fn test_empty_body_fails_and_removes_artifact() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/clip.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(Vec::new()))
            .mount(&server)
            .await;

        let temp = TempDir::new().unwrap();
        let candidate = Candidate::direct("g", format!("{}/clip.mp4", server.uri()));
        let result = pipeline(None).download(&candidate, temp.path()).await;

        assert!(matches!(
            result.outcome,
            DownloadOutcome::Failed(DownloadError::EmptyBody { .. })
        ));
        assert!(!temp.path().join("clip.mp4").exists());
    }

    /// Resolver stub mapping any page URL to a fixed media URL.
    struct OneShotResolver {
        media_url: String,
    }

    #[async_trait]
    impl MediaResolver for OneShotResolver {
        async fn search(
            &self,
            _query: &str,
            _max_results: usize,
            _min: f64,
            _max: f64,
        ) -> Result<Vec<ResolvedMedia>, ExtractError> {
            Ok(Vec::new())
        }

        async fn resolve(
            &self,
            _url: &str,
            _min: f64,
            _max: f64,
        ) -> Result<Option<ResolvedMedia>, ExtractError> {
            Ok(Some(ResolvedMedia {
                media_url: self.media_url.clone(),
                duration: Some(30.0),
                title: None,
                id: None,
            }))
        }
    }

    #[tokio::test]
    async fn test_resolved_candidate_streams_media_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/real/media.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"resolved".to_vec()))
            .mount(&server)
            .await;

        let resolver = Arc::new(OneShotResolver {
            media_url: format!("{}/real/media.mp4", server.uri()),
        });

        let temp = TempDir::new().unwrap();
        let mut candidate = Candidate::direct("yt", "https://video.example/watch?v=abc");
        candidate.needs_resolve = true;
        candidate.id = Some("abc".to_string());
        candidate.title = Some("Some Clip".to_string());

        let result = pipeline(Some(resolver)).download(&candidate, temp.path()).await;
        assert!(result.is_success());
        assert_eq!(
            std::fs::read(result.path().unwrap()).unwrap(),
            b"resolved"
        );
    }

    #[tokio::test]
    async fn test_resolve_and_transfer_each_pay_the_request_delay() {
        use std::time::{Duration, Instant};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/real/media.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"resolved".to_vec()))
            .mount(&server)
            .await;

        let resolver = Arc::new(OneShotResolver {
            media_url: format!("{}/real/media.mp4", server.uri()),
        });
        // Fixed 50ms delay: one wait for the resolve call, one for the
        // transfer, so the whole download takes at least 100ms.
        let pipeline = DownloadPipeline::new(
            reqwest::Client::new(),
            Arc::new(RateLimiter::new(
                Duration::from_millis(50),
                Duration::from_millis(50),
            )),
            Some(resolver),
        );

        let temp = TempDir::new().unwrap();
        let mut candidate = Candidate::direct("yt", "https://video.example/watch?v=abc");
        candidate.needs_resolve = true;

        let start = Instant::now();
        let result = pipeline.download(&candidate, temp.path()).await;
        assert!(result.is_success());
        assert!(
            start.elapsed() >= Duration::from_millis(100),
            "expected two request delays, elapsed: {:?}",
            start.elapsed()
        );
    }

    #[tokio::test]
    async fn test_truncated_transfer_removes_partial_file() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        // wiremock cannot truncate a body mid-stream, so a raw socket
        // advertises more bytes than it sends and then drops the connection.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\npartial")
                .await
                .unwrap();
            let _ = socket.shutdown().await;
        });

        let temp = TempDir::new().unwrap();
        let candidate = Candidate::direct("g", format!("http://{addr}/clip.mp4"));
        let result = pipeline(None).download(&candidate, temp.path()).await;

        assert!(matches!(
            result.outcome,
            DownloadOutcome::Failed(DownloadError::Network { .. })
        ));
        assert!(
            !temp.path().join("clip.mp4").exists(),
            "partial file must be removed after a failed transfer"
        );
    }

    #[tokio::test]
    async fn test_needs_resolve_without_resolver_fails() {
        let temp = TempDir::new().unwrap();
        let mut candidate = Candidate::direct("yt", "https://video.example/watch?v=abc");
        candidate.needs_resolve = true;

        let result = pipeline(None).download(&candidate, temp.path()).await;
        assert!(matches!(
            result.outcome,
            DownloadOutcome::Failed(DownloadError::NoResolver { .. })
        ));
    }
}
