//! Album equivalence decisions between two listing titles.
//!
//! Two titles match when their normalized forms are equal, or when one
//! normalized form is long enough and contained in the other. The relation is
//! reflexive and symmetric but NOT transitive; callers that consume matches
//! greedily (see `reconcile`) accept that as a precision trade-off.

use crate::normalize::{normalize_title, NoiseFilter, NoisePreset};

// ============================================================================
// Thresholds
// ============================================================================

/// Containment only counts when the contained form has more than this many chars.
/// Tuned against Chinese album titles; shorter forms match too many unrelated titles.
pub const DEFAULT_MIN_MATCH_LEN: usize = 10;

/// Historical-record candidates with fewer chars than this are discarded as noise.
pub const DEFAULT_MIN_CANDIDATE_LEN: usize = 6;

// ============================================================================
// Configuration
// ============================================================================

/// Tunables for matching. Defaults: rich noise list, thresholds 10 and 6.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchConfig {
    pub noise: NoiseFilter,
    pub min_match_len: usize,
    pub min_candidate_len: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            noise: NoiseFilter::default(),
            min_match_len: DEFAULT_MIN_MATCH_LEN,
            min_candidate_len: DEFAULT_MIN_CANDIDATE_LEN,
        }
    }
}

impl MatchConfig {
    pub fn with_noise(mut self, noise: NoiseFilter) -> Self {
        self.noise = noise;
        self
    }

    pub fn with_preset(self, preset: NoisePreset) -> Self {
        self.with_noise(NoiseFilter::preset(preset))
    }

    pub fn with_min_match_len(mut self, len: usize) -> Self {
        self.min_match_len = len;
        self
    }

    pub fn with_min_candidate_len(mut self, len: usize) -> Self {
        self.min_candidate_len = len;
        self
    }
}

// ============================================================================
// Prepared titles
// ============================================================================

/// Raw title paired with its normalized form, computed once per snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedTitle<'a> {
    pub raw: &'a str,
    pub norm: String,
}

// ============================================================================
// Matcher
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct AlbumMatcher {
    config: MatchConfig,
}

impl AlbumMatcher {
    pub fn new(config: MatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn normalize(&self, raw: &str) -> String {
        normalize_title(raw, &self.config.noise)
    }

    /// Decide whether two raw titles name the same album.
    pub fn is_match(&self, a: &str, b: &str) -> bool {
        self.matches_normalized(&self.normalize(a), &self.normalize(b))
    }

    /// Same decision on already-normalized forms.
    /// Rule order: exact equality, a contained in b, b contained in a.
    pub fn matches_normalized(&self, a: &str, b: &str) -> bool {
        if a == b {
            return true;
        }
        is_contained(a, b, self.config.min_match_len) || is_contained(b, a, self.config.min_match_len)
    }

    /// Normalize every title of a snapshot once, preserving order.
    pub fn prepare<'a, S: AsRef<str>>(&self, snapshot: &'a [S]) -> Vec<PreparedTitle<'a>> {
        snapshot
            .iter()
            .map(|raw| {
                let raw = raw.as_ref();
                PreparedTitle {
                    raw,
                    norm: self.normalize(raw),
                }
            })
            .collect()
    }
}

/// True if `needle` has more than `min_len` chars and occurs inside `haystack`.
/// Length counts chars, so one CJK glyph weighs the same as one Latin letter.
pub fn is_contained(needle: &str, haystack: &str, min_len: usize) -> bool {
    needle.chars().count() > min_len && haystack.contains(needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match_after_normalization() {
        let m = AlbumMatcher::default();
        assert!(m.is_match("【现货】Blue Train 黑胶", "blue train LP"));
    }

    #[test]
    fn test_containment_match_long_title() {
        let m = AlbumMatcher::default();
        assert!(m.is_match(
            "Pink Floyd - The Dark Side of the Moon 黑胶LP双张",
            "The Dark Side of the Moon 黑胶2LP"
        ));
    }

    #[test]
    fn test_short_form_never_contained() {
        let m = AlbumMatcher::default();
        // "the wall" is 8 chars, below the default threshold
        assert!(!m.is_match("Pink Floyd - The Wall 黑胶LP双张", "The Wall 黑胶2LP"));

        let relaxed = AlbumMatcher::new(MatchConfig::default().with_min_match_len(7));
        assert!(relaxed.is_match("Pink Floyd - The Wall 黑胶LP双张", "The Wall 黑胶2LP"));
    }

    #[test]
    fn test_threshold_is_strictly_greater() {
        let m = AlbumMatcher::new(MatchConfig::default().with_noise(NoiseFilter::empty()));
        // exactly 10 chars: not enough
        assert!(!m.matches_normalized("abcdefghij", "xx abcdefghij xx"));
        // 11 chars: enough
        assert!(m.matches_normalized("abcdefghijk", "xx abcdefghijk xx"));
    }

    #[test]
    fn test_zero_threshold_allows_any_nonempty_containment() {
        let m = AlbumMatcher::new(
            MatchConfig::default()
                .with_noise(NoiseFilter::empty())
                .with_min_match_len(0),
        );
        assert!(m.matches_normalized("b", "abc"));
        assert!(m.is_match("Blue", "Blue Train"));
        // The empty form still only equals itself
        assert!(!m.matches_normalized("", "abc"));
        assert!(m.matches_normalized("", ""));
    }

    #[test]
    fn test_threshold_counts_chars_not_bytes() {
        let m = AlbumMatcher::new(MatchConfig::default().with_noise(NoiseFilter::empty()));
        // 4 CJK glyphs = 12 bytes, still under 10 chars
        assert!(!m.matches_normalized("最伟大的", "周杰伦 最伟大的作品"));
        // 11 glyphs
        assert!(m.matches_normalized("一二三四五六七八九十百", "序 一二三四五六七八九十百 跋"));
    }

    #[test]
    fn test_symmetric() {
        let m = AlbumMatcher::default();
        let a = "Miles Davis - Kind of Blue 日版";
        let b = "Kind of Blue Legacy Edition Miles Davis";
        assert_eq!(m.is_match(a, b), m.is_match(b, a));
    }

    #[test]
    fn test_unrelated_titles_do_not_match() {
        let m = AlbumMatcher::default();
        assert!(!m.is_match("Nevermind 黑胶", "In Utero 黑胶"));
    }

    #[test]
    fn test_prepare_preserves_order() {
        let m = AlbumMatcher::default();
        let titles = vec!["B 黑胶".to_string(), "A".to_string()];
        let prepared = m.prepare(&titles);
        assert_eq!(prepared[0].raw, "B 黑胶");
        assert_eq!(prepared[0].norm, "b");
        assert_eq!(prepared[1].norm, "a");
    }
}
