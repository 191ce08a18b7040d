//! Run configuration: source descriptors and run-wide options.
//!
//! Configuration is loaded once, up front, into an immutable [`RunConfig`]
//! that is handed to the orchestrator's constructor. There is no module-level
//! config state and nothing mutates the config during a run. If no config
//! file exists, [`RunConfig::load_or_create`] writes a default one as an
//! explicit step so the generated file can be inspected and edited.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File system error reading or writing the config file.
    #[error("IO error on config file {path}: {source}")]
    Io {
        /// The config file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid JSON or has the wrong shape.
    #[error("malformed config file {path}: {source}")]
    Parse {
        /// The config file path.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The delay window is inverted or negative.
    #[error("invalid delay window: min_delay={min} max_delay={max}")]
    InvalidDelayWindow {
        /// Configured lower bound in seconds.
        min: f64,
        /// Configured upper bound in seconds.
        max: f64,
    },

    /// One source descriptor is unusable; the source is skipped, the run continues.
    #[error("invalid source '{name}': {reason}")]
    InvalidSource {
        /// The source's configured name.
        name: String,
        /// Why the descriptor was rejected.
        reason: String,
    },
}

impl ConfigError {
    /// Creates an invalid-source error.
    pub fn invalid_source(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSource {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// How strongly video content is preferred over images and GIFs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MediaPreference {
    /// No media-type rule; everything passes.
    Any,
    /// Images/GIFs are admitted only while they occupy less than half of the
    /// requested download ceiling. Default.
    #[default]
    Soft,
    /// Images/GIFs are always rejected.
    Strict,
}

/// One configured gallery source: paginated HTML with CSS-selector extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GallerySource {
    /// Base listing URL, may already carry a query string.
    pub base_url: String,
    /// Page-number query template, e.g. `page={}`. Appended from page 2 on.
    #[serde(default = "default_page_param")]
    pub page_param: String,
    /// CSS selector matching one item container per clip.
    pub clip_selector: String,
    /// CSS selector, inside a container, for the direct-link element.
    pub link_selector: String,
    /// CSS selector whose presence indicates a further page exists.
    pub next_page_selector: String,
    /// Upper bound on pages fetched for this source.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
}

/// One configured JSON feed source: single endpoint, no pagination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonFeedSource {
    /// Feed endpoint returning a structured listing.
    pub url: String,
    /// Maximum number of feed entries mapped to candidates.
    #[serde(default = "default_max_items")]
    pub max_items: usize,
}

/// One configured video-search source, backed by the extraction collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoSearchSource {
    /// Search query issued against the backend.
    pub query: String,
    /// Maximum number of results requested.
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// Minimum clip duration in seconds; shorter results are dropped at the source.
    #[serde(default = "default_min_duration")]
    pub min_duration: f64,
    /// Maximum clip duration in seconds; longer results are dropped at the source.
    #[serde(default = "default_max_duration")]
    pub max_duration: f64,
}

fn default_page_param() -> String {
    "page={}".to_string()
}
fn default_max_pages() -> u32 {
    3
}
fn default_max_items() -> usize {
    20
}
fn default_max_results() -> usize {
    10
}
fn default_min_duration() -> f64 {
    10.0
}
fn default_max_duration() -> f64 {
    180.0
}

/// The closed set of source kinds, dispatched by the `kind` tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SourceKind {
    /// Paginated HTML gallery.
    Gallery(GallerySource),
    /// Single-shot JSON listing.
    JsonFeed(JsonFeedSource),
    /// Video-search backend.
    VideoSearch(VideoSearchSource),
}

/// Immutable description of one configured source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Identifying name, used in logs, candidates and the run summary.
    pub name: String,
    /// Kind tag plus per-kind fields.
    #[serde(flatten)]
    pub kind: SourceKind,
}

impl SourceConfig {
    /// Checks the descriptor for per-source configuration errors.
    ///
    /// A failing source is skipped by the orchestrator; it never aborts the run.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSource`] naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.kind {
            SourceKind::Gallery(g) => {
                if g.base_url.trim().is_empty() {
                    return Err(ConfigError::invalid_source(&self.name, "empty base_url"));
                }
                if g.max_pages == 0 {
                    return Err(ConfigError::invalid_source(&self.name, "max_pages is 0"));
                }
                for (field, selector) in [
                    ("clip_selector", &g.clip_selector),
                    ("link_selector", &g.link_selector),
                    ("next_page_selector", &g.next_page_selector),
                ] {
                    if scraper::Selector::parse(selector).is_err() {
                        return Err(ConfigError::invalid_source(
                            &self.name,
                            format!("unparsable {field}: '{selector}'"),
                        ));
                    }
                }
                Ok(())
            }
            SourceKind::JsonFeed(f) => {
                if f.url.trim().is_empty() {
                    return Err(ConfigError::invalid_source(&self.name, "empty url"));
                }
                if f.max_items == 0 {
                    return Err(ConfigError::invalid_source(&self.name, "max_items is 0"));
                }
                Ok(())
            }
            SourceKind::VideoSearch(s) => {
                if s.query.trim().is_empty() {
                    return Err(ConfigError::invalid_source(&self.name, "empty query"));
                }
                if s.max_results == 0 {
                    return Err(ConfigError::invalid_source(&self.name, "max_results is 0"));
                }
                if s.min_duration < 0.0 || s.min_duration > s.max_duration {
                    return Err(ConfigError::invalid_source(
                        &self.name,
                        format!(
                            "invalid duration window [{}, {}]",
                            s.min_duration, s.max_duration
                        ),
                    ));
                }
                Ok(())
            }
        }
    }
}

/// Options forwarded, uninterpreted, to the enhancement collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhanceConfig {
    /// Whether the post-download enhancement pass runs at all.
    #[serde(default)]
    pub enabled: bool,
    /// External command invoked per file (input/output paths appended).
    #[serde(default = "default_enhance_command")]
    pub command: String,
    /// Upscale factor.
    #[serde(default = "default_enhance_scale")]
    pub scale: u8,
    /// Denoise strength in `[0, 1]`.
    #[serde(default = "default_enhance_denoise")]
    pub denoise: f64,
    /// Model identifier, passed through verbatim.
    #[serde(default = "default_enhance_model")]
    pub model: String,
    /// Compute device, passed through verbatim.
    #[serde(default = "default_enhance_device")]
    pub device: String,
}

fn default_enhance_command() -> String {
    "realesrgan-video".to_string()
}
fn default_enhance_scale() -> u8 {
    2
}
fn default_enhance_denoise() -> f64 {
    0.5
}
fn default_enhance_model() -> String {
    "realesr-animevideov3".to_string()
}
fn default_enhance_device() -> String {
    "auto".to_string()
}

impl Default for EnhanceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            command: default_enhance_command(),
            scale: default_enhance_scale(),
            denoise: default_enhance_denoise(),
            model: default_enhance_model(),
            device: default_enhance_device(),
        }
    }
}

/// Run-wide configuration: ordered sources plus global options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Ordered list of sources, polled one at a time.
    pub sources: Vec<SourceConfig>,
    /// Run-wide ceiling on successful downloads. `0` means unlimited.
    #[serde(default = "default_download_limit")]
    pub download_limit: usize,
    /// Lower bound of the inter-request delay window, in seconds.
    #[serde(default = "default_min_delay")]
    pub min_delay: f64,
    /// Upper bound of the inter-request delay window, in seconds.
    #[serde(default = "default_max_delay")]
    pub max_delay: f64,
    /// Advisory category labels; clips land under `<output>/<category>/`.
    #[serde(default)]
    pub categories: Vec<String>,
    /// How strongly video is preferred over images/GIFs.
    #[serde(default)]
    pub media_preference: MediaPreference,
    /// Enhancement collaborator options, opaque to the scrape core.
    #[serde(default)]
    pub enhance: EnhanceConfig,
}

fn default_download_limit() -> usize {
    10
}
fn default_min_delay() -> f64 {
    1.0
}
fn default_max_delay() -> f64 {
    3.0
}

impl Default for RunConfig {
    /// The stock configuration written on first run: one source of each kind
    /// plus a GIF gallery, matching the sites the tool was built around.
    fn default() -> Self {
        Self {
            sources: vec![
                SourceConfig {
                    name: "youtube_anime".to_string(),
                    kind: SourceKind::VideoSearch(VideoSearchSource {
                        query: "anime fight scenes".to_string(),
                        max_results: 10,
                        min_duration: 10.0,
                        max_duration: 180.0,
                    }),
                },
                SourceConfig {
                    name: "sakugabooru".to_string(),
                    kind: SourceKind::Gallery(GallerySource {
                        base_url: "https://www.sakugabooru.com/post?tags=animated+mp4"
                            .to_string(),
                        page_param: "page={}".to_string(),
                        clip_selector: "article.post-preview".to_string(),
                        link_selector: "a.directlink".to_string(),
                        next_page_selector: "a.next_page".to_string(),
                        max_pages: 3,
                    }),
                },
                SourceConfig {
                    name: "animeclips_reddit".to_string(),
                    kind: SourceKind::JsonFeed(JsonFeedSource {
                        url: "https://www.reddit.com/r/AnimeSakuga/hot/.json".to_string(),
                        max_items: 20,
                    }),
                },
                SourceConfig {
                    name: "tenor_anime".to_string(),
                    kind: SourceKind::Gallery(GallerySource {
                        base_url: "https://tenor.com/search/anime-gifs".to_string(),
                        page_param: "page={}".to_string(),
                        clip_selector: "div.GifList div.Gif".to_string(),
                        link_selector: "img.GifListItem".to_string(),
                        next_page_selector: "a.next".to_string(),
                        max_pages: 2,
                    }),
                },
            ],
            download_limit: default_download_limit(),
            min_delay: default_min_delay(),
            max_delay: default_max_delay(),
            categories: vec![
                "action".to_string(),
                "fight".to_string(),
                "emotional".to_string(),
                "comedy".to_string(),
            ],
            media_preference: MediaPreference::Soft,
            enhance: EnhanceConfig::default(),
        }
    }
}

impl RunConfig {
    /// Loads and validates configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] or [`ConfigError::Parse`] for file-level
    /// failures, and [`ConfigError::InvalidDelayWindow`] for an unusable
    /// delay window. Per-source problems are deliberately NOT checked here;
    /// the orchestrator validates each source as it reaches it so one bad
    /// descriptor only skips that source.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate_run_options()?;
        Ok(config)
    }

    /// Loads the config file, writing the default configuration first if the
    /// file does not exist yet.
    ///
    /// # Errors
    ///
    /// Same as [`RunConfig::load`], plus IO errors writing the default file.
    pub fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!(path = %path.display(), "no config file found, writing defaults");
            let config = Self::default();
            config.save(path)?;
            return Ok(config);
        }
        Self::load(path)
    }

    /// Writes the configuration as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] on write failure.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let text = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, text).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Points the video-search source at `query`.
    ///
    /// Updates the first configured video-search source in place; when none
    /// is configured, a new one with default bounds is inserted at the front
    /// of the source list. Other sources are untouched.
    pub fn apply_search_query(&mut self, query: &str) {
        for source in &mut self.sources {
            if let SourceKind::VideoSearch(search) = &mut source.kind {
                search.query = query.to_string();
                return;
            }
        }
        self.sources.insert(
            0,
            SourceConfig {
                name: "search".to_string(),
                kind: SourceKind::VideoSearch(VideoSearchSource {
                    query: query.to_string(),
                    max_results: default_max_results(),
                    min_duration: default_min_duration(),
                    max_duration: default_max_duration(),
                }),
            },
        );
    }

    fn validate_run_options(&self) -> Result<(), ConfigError> {
        if self.min_delay < 0.0 || self.max_delay < self.min_delay {
            return Err(ConfigError::InvalidDelayWindow {
                min: self.min_delay,
                max: self.max_delay,
            });
        }
        Ok(())
    }
}
