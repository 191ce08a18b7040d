//! Destination filename derivation for downloaded clips.
//!
//! Names come from the candidate's title+id when a backend supplied them,
//! otherwise from the URL's last path segment. Everything is sanitized for
//! filesystem safety, given a media extension, and collision-avoided with a
//! numeric suffix.

use std::path::{Path, PathBuf};

use url::Url;

use crate::source::Candidate;

/// Maximum characters kept from a title when building a filename.
const MAX_TITLE_CHARS: usize = 50;

/// Derives the destination filename for a candidate.
///
/// Backend-identified clips get `Title_id.ext`; plain links get the URL's
/// final path segment. A missing or unusable extension defaults to `.mp4`.
#[must_use]
pub(crate) fn candidate_filename(candidate: &Candidate) -> String {
    let extension = extension_from_url(&candidate.url).unwrap_or_else(|| ".mp4".to_string());

    if let (Some(title), Some(id)) = (&candidate.title, &candidate.id) {
        let cleaned: String = sanitize_filename(title)
            .chars()
            .take(MAX_TITLE_CHARS)
            .collect();
        let cleaned = cleaned.trim_matches('_');
        if !cleaned.is_empty() {
            return format!("{cleaned}_{}{extension}", sanitize_filename(id));
        }
    }

    let basename = Url::parse(&candidate.url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut s| s.next_back().map(str::to_string))
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "clip".to_string());

    let mut name = sanitize_filename(&basename);
    if extension_of(&name).is_none() {
        name.push_str(&extension);
    }
    name
}

/// Extracts a lowercase extension (with dot) from a URL's last path segment.
pub(crate) fn extension_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    extension_of(last)
}

fn extension_of(name: &str) -> Option<String> {
    let dot = name.rfind('.')?;
    let ext = &name[dot..];
    if ext.len() <= 1 || ext.len() > 6 || !ext[1..].chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_lowercase())
}

/// Replaces characters that are unsafe on common filesystems, collapsing
/// runs of replacements into one underscore.
pub(crate) fn sanitize_filename(name: &str) -> String {
    let mut out = String::new();
    let mut prev_sep = false;
    for ch in name.chars() {
        let mapped = match ch {
            c if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') => c,
            _ => '_',
        };
        if mapped == '_' {
            if !prev_sep {
                out.push('_');
                prev_sep = true;
            }
        } else {
            out.push(mapped);
            prev_sep = false;
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() || trimmed.chars().all(|c| c == '.') {
        return "clip".to_string();
    }
    trimmed.to_string()
}

/// Resolves a unique path under `dir`, appending `_1`, `_2`, ... before the
/// extension while a file of that name already exists.
pub(crate) fn resolve_unique_path(dir: &Path, filename: &str) -> PathBuf {
    let base_path = dir.join(filename);
    if !base_path.exists() {
        return base_path;
    }

    let (stem, ext) = match filename.rfind('.') {
        Some(pos) => (&filename[..pos], &filename[pos..]),
        None => (filename, ""),
    };

    for i in 1..1000 {
        let path = dir.join(format!("{stem}_{i}{ext}"));
        if !path.exists() {
            return path;
        }
    }

    // Unreachable in practice; fall back to a timestamped name.
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    dir.join(format!("{stem}_{timestamp}{ext}"))
}
