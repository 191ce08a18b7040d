//! Per-candidate acceptance rules applied before anything is queued for
//! download.
//!
//! Rules run in a fixed order and the first failing rule rejects:
//! media-type preference, second-chance duration bound (against the window
//! the candidate carries from its source), duplicate suppression. Accepting
//! a candidate registers its dedup key in the run-scoped seen set; the
//! candidate itself is never mutated.

use std::collections::HashSet;

use tracing::debug;

use crate::config::MediaPreference;
use crate::source::Candidate;

/// Why a candidate was rejected, for summary bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Passed every rule; dedup key registered.
    Accept,
    /// Image/GIF rejected by the media-preference rule.
    RejectedMediaType,
    /// Known duration outside the second-chance window.
    RejectedDuration,
    /// Dedup key already seen this run.
    RejectedDuplicate,
}

impl Verdict {
    /// Whether the candidate may proceed to download.
    #[must_use]
    pub fn is_accept(self) -> bool {
        matches!(self, Self::Accept)
    }
}

/// Run-scoped acceptance filter.
///
/// With the default soft preference, images and GIFs are admitted only while
/// they occupy less than half of the requested download ceiling, so video
/// candidates always have at least half of the budget reserved. An unlimited
/// run (`ceiling = 0`) admits everything under the soft rule.
#[derive(Debug)]
pub struct CandidateFilter {
    preference: MediaPreference,
    /// Run-wide download ceiling; 0 means unlimited.
    ceiling: usize,
    /// Image/GIF candidates accepted so far, for the soft-preference budget.
    images_accepted: usize,
}

impl CandidateFilter {
    /// Creates a filter for one run.
    #[must_use]
    pub fn new(preference: MediaPreference, ceiling: usize) -> Self {
        Self {
            preference,
            ceiling,
            images_accepted: 0,
        }
    }

    /// Judges one candidate, registering its dedup key on acceptance.
    ///
    /// The duration rule applies when the candidate carries both a known
    /// duration and the window its source was configured with.
    pub fn accept(&mut self, candidate: &Candidate, seen: &mut HashSet<String>) -> Verdict {
        if !self.media_rule_passes(candidate) {
            debug!(url = %candidate.url, "rejected by media-type rule");
            return Verdict::RejectedMediaType;
        }

        if let (Some((min, max)), Some(duration)) = (candidate.duration_window, candidate.duration)
            && (duration < min || duration > max)
        {
            debug!(url = %candidate.url, duration, "rejected by duration rule");
            return Verdict::RejectedDuration;
        }

        let key = candidate.dedup_key();
        if !seen.insert(key) {
            debug!(url = %candidate.url, "rejected as duplicate");
            return Verdict::RejectedDuplicate;
        }

        if candidate.media.is_some_and(crate::source::MediaKind::is_image_like) {
            self.images_accepted += 1;
        }
        Verdict::Accept
    }

    fn media_rule_passes(&self, candidate: &Candidate) -> bool {
        let image_like = candidate
            .media
            .is_some_and(crate::source::MediaKind::is_image_like);
        if !image_like {
            return true;
        }
        match self.preference {
            MediaPreference::Any => true,
            MediaPreference::Strict => false,
            MediaPreference::Soft => {
                // Unlimited runs have no budget to protect.
                self.ceiling == 0 || self.images_accepted < self.ceiling / 2
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::source::Candidate;

    fn video(url: &str) -> Candidate {
        Candidate::direct("src", url)
    }

    fn gif(url: &str) -> Candidate {
        Candidate::direct("src", url)
    }

    #[test]
    fn test_accept_registers_dedup_key() {
        let mut filter = CandidateFilter::new(MediaPreference::Any, 0);
        let mut seen = HashSet::new();
        let candidate = video("https://cdn.example/a.mp4");

        assert_eq!(filter.accept(&candidate, &mut seen), Verdict::Accept);
        assert!(seen.contains("https://cdn.example/a.mp4"));
    }

    #[test]
    fn test_duplicate_rejected_second_time() {
        let mut filter = CandidateFilter::new(MediaPreference::Any, 0);
        let mut seen = HashSet::new();
        let candidate = video("https://cdn.example/a.mp4");

        assert_eq!(filter.accept(&candidate, &mut seen), Verdict::Accept);
        assert_eq!(
            filter.accept(&candidate, &mut seen),
            Verdict::RejectedDuplicate
        );
    }

    #[test]
    fn test_duplicate_suppression_across_sources_by_url() {
        let mut filter = CandidateFilter::new(MediaPreference::Any, 0);
        let mut seen = HashSet::new();

        let from_gallery = Candidate::direct("gallery", "https://cdn.example/a.mp4");
        let from_feed = Candidate::direct("feed", "https://cdn.example/a.mp4");

        assert_eq!(filter.accept(&from_gallery, &mut seen), Verdict::Accept);
        assert_eq!(
            filter.accept(&from_feed, &mut seen),
            Verdict::RejectedDuplicate
        );
    }

    #[test]
    fn test_strict_preference_rejects_images() {
        let mut filter = CandidateFilter::new(MediaPreference::Strict, 10);
        let mut seen = HashSet::new();

        assert_eq!(
            filter.accept(&gif("https://cdn.example/a.gif"), &mut seen),
            Verdict::RejectedMediaType
        );
        assert_eq!(
            filter.accept(&video("https://cdn.example/a.mp4"), &mut seen),
            Verdict::Accept
        );
    }

    #[test]
    fn test_soft_preference_caps_images_at_half_ceiling() {
        let mut filter = CandidateFilter::new(MediaPreference::Soft, 4);
        let mut seen = HashSet::new();

        // Half of 4 is 2: two GIFs pass, the third is rejected.
        assert!(filter
            .accept(&gif("https://cdn.example/1.gif"), &mut seen)
            .is_accept());
        assert!(filter
            .accept(&gif("https://cdn.example/2.gif"), &mut seen)
            .is_accept());
        assert_eq!(
            filter.accept(&gif("https://cdn.example/3.gif"), &mut seen),
            Verdict::RejectedMediaType
        );
        // Video is unaffected by the image budget.
        assert!(filter
            .accept(&video("https://cdn.example/a.mp4"), &mut seen)
            .is_accept());
    }

    #[test]
    fn test_soft_preference_unlimited_run_admits_images() {
        let mut filter = CandidateFilter::new(MediaPreference::Soft, 0);
        let mut seen = HashSet::new();
        for i in 0..10 {
            let candidate = gif(&format!("https://cdn.example/{i}.gif"));
            assert!(filter.accept(&candidate, &mut seen).is_accept());
        }
    }

    #[test]
    fn test_candidate_duration_window_enforced() {
        let mut filter = CandidateFilter::new(MediaPreference::Any, 0);
        let mut seen = HashSet::new();

        let mut too_long = video("https://cdn.example/long.mp4");
        too_long.duration = Some(300.0);
        too_long.duration_window = Some((10.0, 180.0));
        assert_eq!(
            filter.accept(&too_long, &mut seen),
            Verdict::RejectedDuration
        );

        let mut in_window = video("https://cdn.example/ok.mp4");
        in_window.duration = Some(60.0);
        in_window.duration_window = Some((10.0, 180.0));
        assert!(filter.accept(&in_window, &mut seen).is_accept());

        // Unknown duration is not penalized.
        let mut unknown = video("https://cdn.example/unknown.mp4");
        unknown.duration_window = Some((10.0, 180.0));
        assert!(filter.accept(&unknown, &mut seen).is_accept());

        // No window means no duration rule, however long the clip.
        let mut windowless = video("https://cdn.example/windowless.mp4");
        windowless.duration = Some(300.0);
        assert!(filter.accept(&windowless, &mut seen).is_accept());
    }

    #[test]
    fn test_rejected_candidate_not_registered() {
        let mut filter = CandidateFilter::new(MediaPreference::Strict, 10);
        let mut seen = HashSet::new();

        filter.accept(&gif("https://cdn.example/a.gif"), &mut seen);
        assert!(seen.is_empty(), "rejected candidates must not enter seen set");
    }
}
