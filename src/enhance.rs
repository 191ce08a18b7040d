//! Optional post-download enhancement pass.
//!
//! Downloaded clips are handed one at a time to an external upscaling
//! command (Real-ESRGAN style by default). Each input `clip.mp4` produces a
//! sibling `clip_enhanced.mp4`; inputs whose enhanced sibling already exists
//! are skipped, which makes the pass safe to re-run over a directory.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use crate::config::EnhanceConfig;

/// Extensions treated as enhanceable video containers.
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mkv"];

/// Errors from the enhancement pass.
#[derive(Debug, Error)]
pub enum EnhanceError {
    /// The configured command could not be started.
    #[error("failed to spawn enhancement command '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The command ran but exited unsuccessfully.
    #[error("enhancement of '{input}' failed with status {status}: {stderr}")]
    Failed {
        input: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    /// Directory walk failed.
    #[error("failed to read directory '{path}': {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Outcome for one input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnhanceOutcome {
    /// Enhanced file written to the given path.
    Enhanced(PathBuf),
    /// Enhanced sibling already existed; command not run.
    AlreadyEnhanced(PathBuf),
}

/// Post-download enhancement seam.
///
/// Implementations supply the per-file step; the batch operations are
/// provided here so every implementation shares the same skip rules
/// (non-video inputs, already-enhanced outputs, continue past failures).
#[async_trait]
pub trait Enhancer: Send + Sync {
    /// Enhances one video file, producing its `_enhanced` sibling.
    async fn enhance_file(&self, input: &Path) -> Result<EnhanceOutcome, EnhanceError>;

    /// Enhances a list of files, continuing past per-file failures.
    ///
    /// Returns the outcomes of the files that succeeded or were skipped.
    async fn enhance_files(&self, inputs: &[PathBuf]) -> Vec<EnhanceOutcome> {
        let mut outcomes = Vec::new();
        for input in inputs {
            if !is_video_file(input) {
                debug!(input = %input.display(), "not a video file, skipping");
                continue;
            }
            match self.enhance_file(input).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(error) => {
                    warn!(input = %input.display(), error = %error, "enhancement failed");
                }
            }
        }
        outcomes
    }

    /// Enhances every video file directly under `dir`.
    ///
    /// Already-enhanced outputs (`*_enhanced.*`) are never used as inputs.
    async fn enhance_directory(&self, dir: &Path) -> Result<Vec<EnhanceOutcome>, EnhanceError> {
        let entries = std::fs::read_dir(dir).map_err(|source| EnhanceError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut inputs: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.is_file() && is_video_file(p) && !is_enhanced_output(p))
            .collect();
        inputs.sort();

        info!(count = inputs.len(), dir = %dir.display(), "enhancing directory");
        Ok(self.enhance_files(&inputs).await)
    }
}

/// [`Enhancer`] running the configured external upscaler command.
#[derive(Debug, Clone)]
pub struct CommandEnhancer {
    config: EnhanceConfig,
}

impl CommandEnhancer {
    /// Creates an enhancer around an external command configuration.
    #[must_use]
    pub fn new(config: EnhanceConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Enhancer for CommandEnhancer {
    /// Runs the upscaler once, writing the `_enhanced` sibling.
    ///
    /// Skips (without running the command) when the output already exists.
    #[instrument(skip(self), fields(input = %input.display()))]
    async fn enhance_file(&self, input: &Path) -> Result<EnhanceOutcome, EnhanceError> {
        let output = enhanced_output_path(input);
        if output.exists() {
            debug!(output = %output.display(), "enhanced output already present");
            return Ok(EnhanceOutcome::AlreadyEnhanced(output));
        }

        info!(command = %self.config.command, "enhancing clip");
        let result = Command::new(&self.config.command)
            .arg("--scale")
            .arg(self.config.scale.to_string())
            .arg("--denoise")
            .arg(self.config.denoise.to_string())
            .arg("--model")
            .arg(&self.config.model)
            .arg("--device")
            .arg(&self.config.device)
            .arg("--input")
            .arg(input)
            .arg("--output")
            .arg(&output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| EnhanceError::Spawn {
                program: self.config.command.clone(),
                source,
            })?;

        if !result.status.success() {
            return Err(EnhanceError::Failed {
                input: input.display().to_string(),
                status: result.status,
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        Ok(EnhanceOutcome::Enhanced(output))
    }
}

/// Derives the enhanced sibling path: `clip.mp4` becomes `clip_enhanced.mp4`.
#[must_use]
pub fn enhanced_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "clip".to_string());
    let name = match input.extension() {
        Some(ext) => format!("{stem}_enhanced.{}", ext.to_string_lossy()),
        None => format!("{stem}_enhanced"),
    };
    input.with_file_name(name)
}

fn is_video_file(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
}

fn is_enhanced_output(path: &Path) -> bool {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .is_some_and(|stem| stem.ends_with("_enhanced"))
}
