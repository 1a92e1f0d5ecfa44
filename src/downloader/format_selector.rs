// FormatSelector - picks the one URL a handler hands back
//
// yt-dlp is already asked for a good format; this re-ranks whatever it
// actually returned so that clients get a single playable file, never a
// manifest, whenever one exists.

use std::cmp::Ordering;

use super::extractors::{ExtractionResult, RenditionCandidate};

/// Which rule produced the selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionTier {
    /// Single-file mp4 with both audio and video
    ProgressiveMp4,
    /// Single file with both audio and video, any container
    SingleFile,
    /// The extraction's top-level URL (may be HLS/DASH)
    TopLevel,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub url: String,
    pub tier: SelectionTier,
    /// Set for the rendition tiers
    pub format_id: Option<String>,
}

/// Format selector with tiered preference
pub struct FormatSelector;

impl FormatSelector {
    /// Best direct URL, or None when nothing is resolvable. Never fails.
    pub fn select_best(
        renditions: &[RenditionCandidate],
        top_level_url: Option<&str>,
    ) -> Option<String> {
        Self::select(renditions, top_level_url).map(|s| s.url)
    }

    /// Like [`select_best`](Self::select_best), reporting the tier as well
    pub fn select(
        renditions: &[RenditionCandidate],
        top_level_url: Option<&str>,
    ) -> Option<Selection> {
        let progressive = Self::best_by(renditions, |f| f.is_mp4() && Self::is_single_file(f));
        if let Some(f) = progressive {
            return Some(Self::from_candidate(f, SelectionTier::ProgressiveMp4));
        }

        if let Some(f) = Self::best_by(renditions, Self::is_single_file) {
            return Some(Self::from_candidate(f, SelectionTier::SingleFile));
        }

        top_level_url
            .filter(|u| !u.is_empty())
            .map(|u| Selection {
                url: u.to_string(),
                tier: SelectionTier::TopLevel,
                format_id: None,
            })
    }

    /// Convenience over a whole extraction
    pub fn select_from(info: &ExtractionResult) -> Option<Selection> {
        Self::select(&info.renditions, info.url.as_deref())
    }

    fn is_single_file(f: &RenditionCandidate) -> bool {
        f.has_video() && f.has_audio() && f.direct_url().is_some()
    }

    /// Highest (height, tbr) among matches; first in source order on ties
    fn best_by<'a, P>(formats: &'a [RenditionCandidate], pred: P) -> Option<&'a RenditionCandidate>
    where
        P: Fn(&RenditionCandidate) -> bool,
    {
        formats.iter().filter(|f| pred(*f)).fold(None, |best, f| match best {
            Some(b) if Self::rank(f, b) != Ordering::Greater => Some(b),
            _ => Some(f),
        })
    }

    fn rank(a: &RenditionCandidate, b: &RenditionCandidate) -> Ordering {
        a.height
            .unwrap_or(0)
            .cmp(&b.height.unwrap_or(0))
            .then_with(|| a.tbr.unwrap_or(0.0).total_cmp(&b.tbr.unwrap_or(0.0)))
    }

    fn from_candidate(f: &RenditionCandidate, tier: SelectionTier) -> Selection {
        Selection {
            url: f.direct_url().unwrap_or_default().to_string(),
            tier,
            format_id: Some(f.format_id.clone()),
        }
    }
}
