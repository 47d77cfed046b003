//! Core data models for listing snapshots and result files.
//!
//! Snapshots themselves are plain ordered title lists (`Vec<String>`); the
//! structs here describe the records around them: crawled listings, the
//! crawler's export file, and the files reconciliation results are written to.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Snapshot Models
// ============================================================================

/// One capture of a seller's titles, named after its source (usually the file stem).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NamedSnapshot {
    pub name: String,
    pub titles: Vec<String>,
}

impl NamedSnapshot {
    pub fn new(name: impl Into<String>, titles: Vec<String>) -> Self {
        Self {
            name: name.into(),
            titles,
        }
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }
}

// ============================================================================
// Listing Models
// ============================================================================

/// Listing record as handed over by the extractor, before cleaning.
/// Every field is loosely typed: prices arrive as "¥128.00" or 128, counts as "258次浏览".
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawListing {
    pub product_id: Option<Value>,
    pub title: Option<Value>,
    pub price: Option<Value>,
    pub link: Option<Value>,
    pub seller_name: Option<Value>,
    pub seller_credit: Option<Value>,
    pub seller_id: Option<Value>,
    pub seller_location: Option<Value>,
    pub description: Option<Value>,
    pub condition: Option<Value>,
    pub trade_type: Option<Value>,
    pub location: Option<Value>,
    pub publish_time: Option<Value>,
    pub view_count: Option<Value>,
    pub want_count: Option<Value>,
    pub images: Option<Value>,
    pub tags: Option<Value>,
}

fn default_available() -> bool {
    true
}

/// Validated vinyl listing (see `validate::clean_listing`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub product_id: String,
    pub title: String,
    pub price: f64,
    #[serde(default)]
    pub link: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller_credit: Option<u8>, // 0-100
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller_location: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>, // e.g. "99新"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trade_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub want_count: Option<u64>,

    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,

    /// RFC 3339 timestamp; older exports carry naive ISO strings, so kept as text
    #[serde(default)]
    pub crawled_at: String,
    #[serde(default = "default_available")]
    pub is_available: bool,
}

impl Default for Listing {
    fn default() -> Self {
        Self {
            product_id: String::new(),
            title: String::new(),
            price: 0.0,
            link: String::new(),
            seller_name: None,
            seller_credit: None,
            seller_id: None,
            seller_location: None,
            description: None,
            condition: None,
            trade_type: None,
            location: None,
            publish_time: None,
            view_count: None,
            want_count: None,
            images: Vec::new(),
            tags: Vec::new(),
            crawled_at: String::new(),
            is_available: true,
        }
    }
}

// ============================================================================
// File Models
// ============================================================================

/// Price and popularity bounds applied before export. Unset bounds accept everything.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingFilter {
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_want_count: Option<u64>,
}

impl ListingFilter {
    pub fn is_empty(&self) -> bool {
        self.min_price.is_none() && self.max_price.is_none() && self.min_want_count.is_none()
    }

    /// A missing want count counts as 0.
    pub fn accepts(&self, listing: &Listing) -> bool {
        if self.min_price.is_some_and(|min| listing.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| listing.price > max) {
            return false;
        }
        let wants = listing.want_count.unwrap_or(0);
        !self.min_want_count.is_some_and(|min| wants < min)
    }
}

/// Crawler export: `{ "export_time": ..., "total": N, "data": [...] }`.
/// Filtered exports also record the bounds under `filters`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportFile {
    #[serde(default)]
    pub export_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<ListingFilter>,
    #[serde(default)]
    pub total: usize,
    #[serde(default)]
    pub data: Vec<Listing>,
}

impl ExportFile {
    pub fn new(data: Vec<Listing>) -> Self {
        Self {
            export_time: chrono::Local::now().to_rfc3339(),
            filters: None,
            total: data.len(),
            data,
        }
    }

    pub fn with_filters(mut self, filters: Option<ListingFilter>) -> Self {
        self.filters = filters;
        self
    }
}

/// One entry of a persisted title list: `[{ "title": ... }]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleRecord {
    pub title: String,
}
