//! Temporal delta: titles one seller offers now that a competitor used to
//! carry (per a historical record) but no longer carries (per a current snapshot).
//!
//! Each current title is tested independently against both reference sets.
//! Unlike `reconcile`, nothing is consumed: many current titles may match the
//! same historical entry.

use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::dedup::NormalizedIndex;
use crate::matcher::AlbumMatcher;

// ============================================================================
// Tolerant historical scan
// ============================================================================

/// `title:` field marker, with or without JSON quoting: `title:`, `"title": "`.
pub static TITLE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""?title"?\s*[:：]\s*"?"#).unwrap());

/// Characters ending a scanned title value.
const VALUE_DELIMITERS: &[char] = &[',', '}', '\n', '\r'];

/// Scan a possibly broken serialized record for `title:<value>` fields.
///
/// A value ends at the first delimiter (`,` `}` or a line break), at the next
/// `title:` marker, or at the end of the blob. Surrounding quotes and
/// whitespace are trimmed; values with fewer than `min_len` chars are dropped.
/// Fails only when no marker appears anywhere.
pub fn try_extract_titles(blob: &str, min_len: usize) -> Result<Vec<String>> {
    let markers: Vec<_> = TITLE_MARKER.find_iter(blob).collect();
    if markers.is_empty() {
        bail!("no title fields found in historical record ({} bytes)", blob.len());
    }

    let mut titles = Vec::new();
    for (i, marker) in markers.iter().enumerate() {
        let end = markers.get(i + 1).map_or(blob.len(), |next| next.start());
        let segment = &blob[marker.end()..end];
        let value = segment
            .split(VALUE_DELIMITERS)
            .next()
            .unwrap_or("")
            .trim()
            .trim_matches('"')
            .trim();

        if value.chars().count() >= min_len {
            titles.push(value.to_string());
        }
    }

    Ok(titles)
}

/// Best-effort extraction: any scan failure means "no history available".
pub fn extract_titles(blob: &str, min_len: usize) -> Vec<String> {
    match try_extract_titles(blob, min_len) {
        Ok(titles) => titles,
        Err(e) => {
            eprintln!("[DELTA] {:#}; treating history as empty", e);
            Vec::new()
        }
    }
}

// ============================================================================
// Delta computation
// ============================================================================

/// Titles from `current` that the competitor listed historically but not now.
///
/// `historical_blob` is raw legacy text, scanned with [`extract_titles`] using
/// the matcher's `min_candidate_len`.
pub fn listings_sold_elsewhere<C, R>(
    current: &[C],
    historical_blob: &str,
    competitor_now: &[R],
    matcher: &AlbumMatcher,
) -> Vec<String>
where
    C: AsRef<str>,
    R: AsRef<str>,
{
    let history = extract_titles(historical_blob, matcher.config().min_candidate_len);
    listings_delisted(current, &history, competitor_now, matcher)
}

/// Same as [`listings_sold_elsewhere`] with an already-parsed history.
pub fn listings_delisted<C, H, R>(
    current: &[C],
    history: &[H],
    competitor_now: &[R],
    matcher: &AlbumMatcher,
) -> Vec<String>
where
    C: AsRef<str>,
    H: AsRef<str>,
    R: AsRef<str>,
{
    let history = matcher.prepare(history);
    let competitor = matcher.prepare(competitor_now);
    let competitor_index = NormalizedIndex::from_prepared(&competitor);

    matcher
        .prepare(current)
        .into_iter()
        .filter(|title| {
            let was_listed = history
                .iter()
                .any(|h| matcher.matches_normalized(&title.norm, &h.norm));
            if !was_listed {
                return false;
            }
            // Exact normalized hit is the common case; fall back to containment scan
            let still_listed = competitor_index.contains(&title.norm)
                || competitor
                    .iter()
                    .any(|c| matcher.matches_normalized(&title.norm, &c.norm));
            !still_listed
        })
        .map(|title| title.raw.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::MatchConfig;
    use crate::normalize::NoisePreset;

    fn narrow() -> AlbumMatcher {
        AlbumMatcher::new(MatchConfig::default().with_preset(NoisePreset::Narrow))
    }

    #[test]
    fn test_extract_broken_json_fields() {
        let blob = r#"[{id:1,title:Abbey Road 黑胶,price:128},{id:2,title:Kind of Blue}]"#;
        let titles = try_extract_titles(blob, 6).unwrap();
        assert_eq!(titles, vec!["Abbey Road 黑胶", "Kind of Blue"]);
    }

    #[test]
    fn test_extract_quoted_json_fields() {
        let blob = r#"{"products":[{"title": "Blue Train 黑胶","id":"1"}]}"#;
        let titles = try_extract_titles(blob, 6).unwrap();
        assert_eq!(titles, vec!["Blue Train 黑胶"]);
    }

    #[test]
    fn test_extract_space_separated_markers() {
        let titles = try_extract_titles("title:Abbey Road title:Giant Steps", 6).unwrap();
        assert_eq!(titles, vec!["Abbey Road", "Giant Steps"]);
    }

    #[test]
    fn test_extract_drops_short_candidates() {
        let titles = try_extract_titles("title:X, title:Nevermind, title:12345}", 6).unwrap();
        assert_eq!(titles, vec!["Nevermind"]);
        // Exactly six chars survives
        let titles = try_extract_titles("title:最伟大的作品,", 6).unwrap();
        assert_eq!(titles, vec!["最伟大的作品"]);
    }

    #[test]
    fn test_extract_without_marker_fails_then_degrades() {
        assert!(try_extract_titles("garbage {{ not json", 6).is_err());
        assert!(extract_titles("garbage {{ not json", 6).is_empty());
        assert!(extract_titles("", 6).is_empty());
    }

    #[test]
    fn test_sold_elsewhere_basic() {
        let m = narrow();
        let blob = "title:Abbey Road Remaster, title:Giant Steps Deluxe}";
        let result = listings_sold_elsewhere(
            &["Abbey Road Remaster 黑胶", "Blue Train"],
            blob,
            &["Giant Steps Deluxe"],
            &m,
        );
        assert_eq!(result, vec!["Abbey Road Remaster 黑胶"]);
    }

    #[test]
    fn test_sold_elsewhere_still_listed_by_containment() {
        let m = narrow();
        let blob = "title:The Dark Side of the Moon,";
        let result = listings_sold_elsewhere(
            &["The Dark Side of the Moon"],
            blob,
            &["Pink Floyd The Dark Side of the Moon 50th Anniversary"],
            &m,
        );
        assert!(result.is_empty());
    }

    #[test]
    fn test_sold_elsewhere_without_history_is_empty() {
        let m = narrow();
        let result = listings_sold_elsewhere(
            &["Abbey Road Remaster", "Blue Train"],
            "no markers in here at all",
            &[] as &[&str],
            &m,
        );
        assert!(result.is_empty());
    }

    #[test]
    fn test_history_is_not_consumed() {
        let m = narrow();
        let history = ["Abbey Road Remaster"];
        let empty: [&str; 0] = [];
        let result = listings_delisted(
            &["Abbey Road Remaster", "abbey road remaster LP"],
            &history,
            &empty,
            &m,
        );
        assert_eq!(result, vec!["Abbey Road Remaster", "abbey road remaster LP"]);
    }
}
