//! Deduplication at two levels:
//! - normalized-title membership for one snapshot (fast exact pre-filter)
//! - listing records across crawl runs, keyed by product id or content key

use rustc_hash::{FxHashMap, FxHashSet};

use crate::matcher::{AlbumMatcher, PreparedTitle};
use crate::models::Listing;

// ============================================================================
// Normalized-title index
// ============================================================================

/// Set of normalized forms present in one snapshot.
/// Coarser than full matching: only exact normalized equality is answered here.
#[derive(Debug, Clone, Default)]
pub struct NormalizedIndex {
    forms: FxHashSet<String>,
}

impl NormalizedIndex {
    pub fn build<S: AsRef<str>>(snapshot: &[S], matcher: &AlbumMatcher) -> Self {
        Self {
            forms: snapshot.iter().map(|t| matcher.normalize(t.as_ref())).collect(),
        }
    }

    pub fn from_prepared(prepared: &[PreparedTitle<'_>]) -> Self {
        Self {
            forms: prepared.iter().map(|p| p.norm.clone()).collect(),
        }
    }

    pub fn contains(&self, norm: &str) -> bool {
        self.forms.contains(norm)
    }

    pub fn len(&self) -> usize {
        self.forms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }
}

/// Titles sharing one normalized form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollisionGroup<'a> {
    pub norm: String,
    pub titles: Vec<&'a str>,
}

/// Group a snapshot by normalized form, in order of first appearance.
pub fn group_by_normalized<'a, S: AsRef<str>>(
    snapshot: &'a [S],
    matcher: &AlbumMatcher,
) -> Vec<CollisionGroup<'a>> {
    let mut positions: FxHashMap<String, usize> = FxHashMap::default();
    let mut groups: Vec<CollisionGroup<'a>> = Vec::new();

    for prepared in matcher.prepare(snapshot) {
        match positions.get(&prepared.norm) {
            Some(&idx) => groups[idx].titles.push(prepared.raw),
            None => {
                positions.insert(prepared.norm.clone(), groups.len());
                groups.push(CollisionGroup {
                    norm: prepared.norm,
                    titles: vec![prepared.raw],
                });
            }
        }
    }

    groups
}

// ============================================================================
// Listing deduplication across runs
// ============================================================================

/// Keep the first listing per product id, preserving order.
/// Listings with an empty product id are dropped.
pub fn filter_duplicates(listings: Vec<Listing>) -> Vec<Listing> {
    let total = listings.len();
    let mut seen: FxHashSet<String> = FxHashSet::default();
    let unique: Vec<Listing> = listings
        .into_iter()
        .filter(|l| !l.product_id.is_empty() && seen.insert(l.product_id.clone()))
        .collect();

    let filtered = total - unique.len();
    if filtered > 0 {
        eprintln!("[DEDUP] Filtered out {} duplicate listings", filtered);
    }
    unique
}

/// Merge a new crawl into an existing one by product id.
/// A re-crawled listing replaces the old record in place; unseen ids append in order.
pub fn merge_and_deduplicate(existing: Vec<Listing>, new: Vec<Listing>) -> Vec<Listing> {
    let mut merged: Vec<Listing> = Vec::with_capacity(existing.len() + new.len());
    let mut index: FxHashMap<String, usize> = FxHashMap::default();

    for listing in existing.into_iter().chain(new) {
        if listing.product_id.is_empty() {
            continue;
        }
        match index.get(&listing.product_id) {
            Some(&idx) => merged[idx] = listing,
            None => {
                index.insert(listing.product_id.clone(), merged.len());
                merged.push(listing);
            }
        }
    }

    merged
}

/// Content key for listings re-posted under a new product id.
pub fn content_key(listing: &Listing) -> String {
    format!(
        "{}|{:.2}|{}",
        listing.title,
        listing.price,
        listing.seller_name.as_deref().unwrap_or("")
    )
}

/// Product ids and content keys already seen in earlier runs.
#[derive(Debug, Clone, Default)]
pub struct SeenSet {
    ids: FxHashSet<String>,
    content: FxHashSet<String>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from a previous export.
    pub fn from_listings(listings: &[Listing]) -> Self {
        let mut seen = Self::new();
        for listing in listings {
            seen.record(listing);
        }
        seen
    }

    pub fn record(&mut self, listing: &Listing) {
        if !listing.product_id.is_empty() {
            self.ids.insert(listing.product_id.clone());
        }
        self.content.insert(content_key(listing));
    }

    pub fn is_seen(&self, listing: &Listing) -> bool {
        (!listing.product_id.is_empty() && self.ids.contains(&listing.product_id))
            || self.content.contains(&content_key(listing))
    }

    /// Returns true (and records it) if neither the id nor the content key was seen.
    pub fn is_new(&mut self, listing: &Listing) -> bool {
        if self.is_seen(listing) {
            return false;
        }
        self.record(listing);
        true
    }

    pub fn id_count(&self) -> usize {
        self.ids.len()
    }

    pub fn content_count(&self) -> usize {
        self.content.len()
    }
}
