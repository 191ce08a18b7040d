//! Video-extraction collaborator: turns search queries and host pages into
//! direct media URLs.
//!
//! The scrape core never talks to a video backend directly. It goes through
//! the [`MediaResolver`] trait so the backend can be swapped out (and stubbed
//! in tests). The shipped implementation, [`YtDlpResolver`], shells out to the
//! `yt-dlp` binary in JSON mode and parses one entry per output line.

use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Errors raised by the extraction collaborator.
///
/// All of these are candidate-local: a failed extraction counts as one failed
/// download and never affects other candidates.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The extractor process could not be started.
    #[error("failed to spawn extractor '{program}': {source}")]
    Spawn {
        /// The configured extractor binary.
        program: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The extractor process exited with a failure status.
    #[error("extractor exited with {status}: {stderr}")]
    Failed {
        /// The exit status description.
        status: String,
        /// Trailing stderr output, for diagnostics.
        stderr: String,
    },

    /// The extractor produced output that is not valid entry JSON.
    #[error("unparsable extractor output: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One resolved media item: a directly fetchable URL plus metadata.
#[derive(Debug, Clone)]
pub struct ResolvedMedia {
    /// Direct media URL suitable for a plain HTTP transfer.
    pub media_url: String,
    /// Clip duration in seconds, when the backend reports one.
    pub duration: Option<f64>,
    /// Human-readable title.
    pub title: Option<String>,
    /// Backend-assigned identifier.
    pub id: Option<String>,
}

/// Async collaborator that resolves queries and page URLs into media.
///
/// `search` returns up to `max_results` entries whose duration falls inside
/// `[min_duration, max_duration]`; `resolve` maps one page URL to its media,
/// returning `Ok(None)` when there is no match or the clip falls outside the
/// duration window.
#[async_trait]
pub trait MediaResolver: Send + Sync {
    /// Searches the backend for clips matching `query`.
    async fn search(
        &self,
        query: &str,
        max_results: usize,
        min_duration: f64,
        max_duration: f64,
    ) -> Result<Vec<ResolvedMedia>, ExtractError>;

    /// Resolves one page URL into its underlying media, if any.
    async fn resolve(
        &self,
        url: &str,
        min_duration: f64,
        max_duration: f64,
    ) -> Result<Option<ResolvedMedia>, ExtractError>;
}

/// Shape of one `yt-dlp -j` output line; unknown fields are ignored.
#[derive(Debug, Deserialize)]
struct ExtractorEntry {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    /// Direct media URL when the format has been selected.
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    webpage_url: Option<String>,
}

impl ExtractorEntry {
    fn into_resolved(self) -> Option<ResolvedMedia> {
        let media_url = self.url.or(self.webpage_url)?;
        Some(ResolvedMedia {
            media_url,
            duration: self.duration,
            title: self.title,
            id: self.id,
        })
    }
}

/// [`MediaResolver`] backed by the `yt-dlp` command-line extractor.
#[derive(Debug, Clone)]
pub struct YtDlpResolver {
    program: String,
}

impl YtDlpResolver {
    /// Creates a resolver invoking the default `yt-dlp` binary.
    #[must_use]
    pub fn new() -> Self {
        Self::with_program("yt-dlp")
    }

    /// Creates a resolver invoking a specific extractor binary.
    #[must_use]
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Runs the extractor with the given arguments and returns stdout.
    async fn run(&self, args: &[&str]) -> Result<String, ExtractError> {
        debug!(program = %self.program, ?args, "invoking extractor");
        let output = tokio::process::Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| ExtractError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: String = stderr.lines().rev().take(3).collect::<Vec<_>>().join(" | ");
            return Err(ExtractError::Failed {
                status: output.status.to_string(),
                stderr: tail,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for YtDlpResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaResolver for YtDlpResolver {
    #[instrument(skip(self))]
    async fn search(
        &self,
        query: &str,
        max_results: usize,
        min_duration: f64,
        max_duration: f64,
    ) -> Result<Vec<ResolvedMedia>, ExtractError> {
        // Ask for twice the target so the duration window can discard half
        // without starving the result set.
        let target = format!("ytsearch{}:{}", max_results.saturating_mul(2), query);
        let stdout = self
            .run(&[
                "-j",
                "--no-warnings",
                "--format",
                "best[ext=mp4]/best",
                &target,
            ])
            .await?;

        let mut results = Vec::new();
        for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
            let entry: ExtractorEntry = match serde_json::from_str(line) {
                Ok(entry) => entry,
                Err(error) => {
                    warn!(error = %error, "skipping unparsable extractor line");
                    continue;
                }
            };
            let Some(resolved) = entry.into_resolved() else {
                continue;
            };
            if duration_in_window(resolved.duration, min_duration, max_duration) {
                results.push(resolved);
            }
            if results.len() >= max_results {
                break;
            }
        }
        debug!(found = results.len(), "search complete");
        Ok(results)
    }

    #[instrument(skip(self))]
    async fn resolve(
        &self,
        url: &str,
        min_duration: f64,
        max_duration: f64,
    ) -> Result<Option<ResolvedMedia>, ExtractError> {
        let stdout = self
            .run(&[
                "-j",
                "--no-warnings",
                "--no-playlist",
                "--format",
                "best[ext=mp4]/best",
                url,
            ])
            .await?;

        let Some(line) = stdout.lines().find(|l| !l.trim().is_empty()) else {
            return Ok(None);
        };
        let entry: ExtractorEntry = serde_json::from_str(line)?;
        let Some(resolved) = entry.into_resolved() else {
            return Ok(None);
        };
        if !duration_in_window(resolved.duration, min_duration, max_duration) {
            debug!(url, duration = ?resolved.duration, "media outside duration window");
            return Ok(None);
        }
        Ok(Some(resolved))
    }
}

/// A missing duration passes the window; only a reported out-of-window value
/// disqualifies the entry.
pub(crate) fn duration_in_window(duration: Option<f64>, min: f64, max: f64) -> bool {
    match duration {
        Some(d) => d >= min && d <= max,
        None => true,
    }
}
