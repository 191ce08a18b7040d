//! Clip Scraper Core Library
//!
//! This library provides the core functionality for the clip scraper tool,
//! which discovers short video clips across heterogeneous web sources
//! (HTML galleries, JSON feeds, video search backends) and downloads them
//! into a local collection.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`config`] - Run configuration and per-source descriptors
//! - [`source`] - Source adapters behind one paginated fetch contract
//! - [`limiter`] - Randomized politeness delay before every network call
//! - [`filter`] - Candidate acceptance rules and duplicate suppression
//! - [`extract`] - External extraction backend for non-direct media URLs
//! - [`download`] - Streaming download pipeline with filename derivation
//! - [`orchestrator`] - Sequential run loop over all configured sources
//! - [`enhance`] - Optional post-download upscaling pass

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod download;
pub mod enhance;
pub mod extract;
pub mod filter;
pub mod limiter;
pub mod orchestrator;
pub mod source;

// Re-export commonly used types
pub use config::{
    ConfigError, EnhanceConfig, GallerySource, JsonFeedSource, MediaPreference, RunConfig,
    SourceConfig, SourceKind, VideoSearchSource,
};
pub use download::{DownloadError, DownloadOutcome, DownloadPipeline, DownloadResult};
pub use enhance::{CommandEnhancer, EnhanceError, EnhanceOutcome, Enhancer};
pub use extract::{ExtractError, MediaResolver, ResolvedMedia, YtDlpResolver};
pub use filter::{CandidateFilter, Verdict};
pub use limiter::RateLimiter;
pub use orchestrator::{RunSummary, ScrapeOrchestrator};
pub use source::{Candidate, FetchError, FetchedPage, MediaKind, PageTurn, SourceAdapter};
