//! Title normalization for cross-seller album matching.
//! Used by the matcher, the deduplicator and every reconciliation pass.
//!
//! CRITICAL: Any change here shifts every match decision downstream
//! (overlap counts, delisted lists). Run tests after changes.

use once_cell::sync::Lazy;
use regex::Regex;

// ============================================================================
// CHARACTER AND PHRASE TABLES
// ============================================================================

/// Characters replaced with a space before phrase removal.
/// Covers middle dots, bullets, colon/comma variants, quotes, brackets and parentheses
/// in both ASCII and full-width forms.
pub const PUNCTUATION: &[char] = &[
    '·', '•', ':', '：', ',', '，', '、',
    '"', '\'', '\u{201C}', '\u{201D}', '\u{2018}', '\u{2019}',
    '「', '」', '『', '』', '【', '】', '《', '》',
    '（', '）', '(', ')', '[', ']',
];

/// Format and edition words. Used for stale-listing detection where only the
/// obvious decorations should be dropped.
pub const NARROW_NOISE: &[&str] = &[
    "黑胶", "唱片", "专辑", "新专辑",
    "限量", "带独立编号", "带编", "日版", "台版",
    "cd", "lp", "1lp", "2lp",
];

/// Extra phrases for seller-to-seller comparison: disc counts, colour variants,
/// sales-status markers and listing freshness badges.
pub const RICH_EXTRA_NOISE: &[&str] = &[
    "双", "三",
    "彩胶", "紫胶", "红胶", "黄胶", "绿胶", "金胶", "灰胶", "蓝胶",
    "白胶", "透明胶", "动画胶",
    "电影原声", "买家评价",
    "预定", "现货", "粉丝更优惠", "2人小刀价", "人气第", "热销第",
    "24小时内发布", "48小时内发布", "72小时内发布", "一周内发布",
];

/// Collapses any whitespace run (including full-width spaces) to one ASCII space.
pub static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

// ============================================================================
// NOISE FILTER
// ============================================================================

/// Built-in noise phrase lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoisePreset {
    /// Format/edition words only
    Narrow,
    /// Narrow list plus colours, disc counts and promo markers
    Rich,
}

impl NoisePreset {
    pub fn phrases(self) -> Vec<&'static str> {
        match self {
            NoisePreset::Narrow => NARROW_NOISE.to_vec(),
            NoisePreset::Rich => NARROW_NOISE
                .iter()
                .chain(RICH_EXTRA_NOISE.iter())
                .copied()
                .collect(),
        }
    }
}

/// Ordered set of phrases stripped from titles during normalization.
///
/// Phrases are stored in their own normalized form (lowercase, punctuation
/// split, whitespace collapsed) and sorted longest first, so compound phrases
/// such as "2lp" or "新专辑" go before their fragments "lp" and "专辑".
/// Older result files stripped in list order ("2lp" became "2"), so overlap
/// counts against them can differ.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoiseFilter {
    phrases: Vec<String>,
}

impl NoiseFilter {
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut filter = Self {
            phrases: Vec::new(),
        };
        filter.extend(phrases);
        filter
    }

    pub fn preset(preset: NoisePreset) -> Self {
        Self::new(preset.phrases())
    }

    /// Filter that strips nothing (punctuation and whitespace are still normalized).
    pub fn empty() -> Self {
        Self {
            phrases: Vec::new(),
        }
    }

    /// Add caller-supplied phrases on top of the current list.
    pub fn with_extra<I, S>(mut self, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extend(phrases);
        self
    }

    fn extend<I, S>(&mut self, phrases: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for phrase in phrases {
            let cleaned = clean_phrase(phrase.as_ref());
            if !cleaned.is_empty() && !self.phrases.contains(&cleaned) {
                self.phrases.push(cleaned);
            }
        }
        // Stable sort keeps caller order among equal-length phrases
        self.phrases
            .sort_by_key(|p| std::cmp::Reverse(p.chars().count()));
    }

    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }

    /// One pass of plain substring removal (not word-boundary aware).
    pub fn strip(&self, text: &str) -> String {
        let mut result = text.to_string();
        for phrase in &self.phrases {
            if result.contains(phrase.as_str()) {
                result = result.replace(phrase.as_str(), "");
            }
        }
        result
    }
}

impl Default for NoiseFilter {
    fn default() -> Self {
        Self::preset(NoisePreset::Rich)
    }
}

fn clean_phrase(phrase: &str) -> String {
    collapse_whitespace(&replace_punctuation(&phrase.to_lowercase()))
        .trim()
        .to_string()
}

// ============================================================================
// NORMALIZATION FUNCTIONS
// ============================================================================

/// Replace every character of [`PUNCTUATION`] with a space.
pub fn replace_punctuation(s: &str) -> String {
    s.chars()
        .map(|c| if PUNCTUATION.contains(&c) { ' ' } else { c })
        .collect()
}

pub fn collapse_whitespace(s: &str) -> String {
    WHITESPACE_RUN.replace_all(s, " ").into_owned()
}

/// Normalize a raw listing title for matching.
///
/// Steps: lowercase, punctuation to spaces, collapse whitespace, strip noise
/// phrases, trim. Phrase removal repeats (re-collapsing in between) until no
/// phrase is left, so "黑黑胶胶" or "a  cd  b" cannot leave a fresh phrase or a
/// double space behind. That keeps the function idempotent.
///
/// e.g., "黑胶唱片·Abbey Road（限量编号版）" → "abbey road 编号版" (narrow list)
pub fn normalize_title(raw: &str, noise: &NoiseFilter) -> String {
    let mut result = collapse_whitespace(&replace_punctuation(&raw.to_lowercase()));

    loop {
        let stripped = noise.strip(&result);
        if stripped == result {
            break;
        }
        result = collapse_whitespace(&stripped);
    }

    result.trim().to_string()
}

// ============================================================================
// TESTS
// ============================================================================
