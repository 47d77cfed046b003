//! Cleaning and validation for listing records coming from the extractor.
//!
//! Scraped fields are loosely typed text ("¥128.00", "258次浏览", links with
//! the id buried in a query string). Everything here turns them into the
//! typed `Listing` or rejects the record with a reason.

use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::models::{Listing, ListingFilter, RawListing};

// ============================================================================
// Regex Patterns
// ============================================================================

pub static PRICE_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+\.?\d*)").unwrap());

pub static COUNT_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

/// Product id locations in listing links, most specific first.
pub static PRODUCT_ID_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"item\.htm\?id=(\d+)").unwrap(),
        Regex::new(r"item/(\d+)").unwrap(),
        Regex::new(r"id=(\d+)").unwrap(),
    ]
});

pub static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^https?://(?:(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,6}\.?|localhost|\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})(?:/[^/\s]*)*$",
    )
    .unwrap()
});

pub static INVALID_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[<>:"/\\|?*]"#).unwrap());

const MAX_FILENAME_CHARS: usize = 200;
const MAX_SELLER_CREDIT: u64 = 100;

// ============================================================================
// Field Parsers
// ============================================================================

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Parse a price string: currency symbols and thousands separators are
/// dropped, the first decimal number wins. 0.0 when no number is present.
/// e.g., "¥1,280.50" → 1280.5
pub fn parse_price(text: &str) -> f64 {
    let cleaned = text.trim().replace(['¥', '￥', '$', ','], "");
    PRICE_NUMBER
        .captures(&cleaned)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .map(round_cents)
        .unwrap_or(0.0)
}

/// First integer in the text. e.g., "258次浏览" → 258
pub fn parse_count(text: &str) -> Option<u64> {
    COUNT_NUMBER
        .find(text)
        .and_then(|m| m.as_str().parse().ok())
}

pub fn extract_product_id(url: &str) -> Option<String> {
    if url.is_empty() {
        return None;
    }
    PRODUCT_ID_PATTERNS
        .iter()
        .find_map(|p| p.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn validate_url(url: &str) -> bool {
    !url.is_empty() && URL_PATTERN.is_match(url)
}

/// Make a string safe to use as a file name.
pub fn sanitize_filename(name: &str) -> String {
    let replaced = INVALID_FILENAME_CHARS.replace_all(name, "_");
    let trimmed = replaced.trim_matches(|c: char| c == '.' || c == ' ');
    let capped: String = trimmed.chars().take(MAX_FILENAME_CHARS).collect();
    if capped.is_empty() {
        "unnamed".to_string()
    } else {
        capped
    }
}

// ============================================================================
// Value helpers
// ============================================================================

/// Text form of a scalar JSON value; None for null, arrays and objects.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn value_text(value: &Option<Value>) -> Option<String> {
    value.as_ref().and_then(scalar_text)
}

/// Trimmed, non-empty text.
fn value_field(value: &Option<Value>) -> Option<String> {
    value_text(value)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn value_count(value: &Option<Value>) -> Option<u64> {
    match value.as_ref()? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => parse_count(s),
        _ => None,
    }
}

fn value_price(value: &Option<Value>) -> f64 {
    match value.as_ref() {
        Some(Value::Number(n)) => n.as_f64().map(round_cents).unwrap_or(0.0),
        Some(Value::String(s)) => parse_price(s),
        _ => 0.0,
    }
}

/// Array of strings, or a single string promoted to a one-item list.
fn value_list(value: &Option<Value>) -> Vec<String> {
    match value.as_ref() {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(scalar_text)
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

// ============================================================================
// Listing cleaning
// ============================================================================

/// Clean and validate one raw listing.
///
/// Rejects records without a title, without any product id (explicit or in
/// the link), with a negative price, or with a seller credit above 100.
pub fn clean_listing(raw: &RawListing, crawled_at: &str) -> Result<Listing> {
    let title = value_field(&raw.title).unwrap_or_default();
    if title.is_empty() {
        bail!("listing has an empty title");
    }

    let raw_link = value_field(&raw.link).unwrap_or_default();
    let product_id = match value_field(&raw.product_id).or_else(|| extract_product_id(&raw_link)) {
        Some(id) => id,
        None => bail!("listing '{}' has no product id", title),
    };
    // Malformed links are dropped, the record itself is kept
    let link = if validate_url(&raw_link) { raw_link } else { String::new() };

    let price = value_price(&raw.price);
    if price < 0.0 {
        bail!("listing {} has a negative price {}", product_id, price);
    }

    let seller_credit = match value_count(&raw.seller_credit) {
        Some(credit) if credit > MAX_SELLER_CREDIT => {
            bail!("listing {} has seller credit {} above {}", product_id, credit, MAX_SELLER_CREDIT)
        }
        Some(credit) => Some(credit as u8),
        None => None,
    };

    Ok(Listing {
        product_id,
        title,
        price,
        link,
        seller_name: value_field(&raw.seller_name),
        seller_credit,
        seller_id: value_field(&raw.seller_id),
        seller_location: value_field(&raw.seller_location),
        description: value_field(&raw.description),
        condition: value_field(&raw.condition),
        trade_type: value_field(&raw.trade_type),
        location: value_field(&raw.location),
        publish_time: value_field(&raw.publish_time),
        view_count: value_count(&raw.view_count),
        want_count: value_count(&raw.want_count),
        images: value_list(&raw.images),
        tags: value_list(&raw.tags),
        crawled_at: crawled_at.to_string(),
        is_available: true,
    })
}

/// Clean a batch, skipping (and logging) rejected records.
pub fn clean_listings(raws: &[RawListing], crawled_at: &str) -> Vec<Listing> {
    let mut rejected = 0usize;
    let listings: Vec<Listing> = raws
        .iter()
        .filter_map(|raw| match clean_listing(raw, crawled_at) {
            Ok(listing) => Some(listing),
            Err(e) => {
                rejected += 1;
                eprintln!("[VALIDATE] Skipping listing: {:#}", e);
                None
            }
        })
        .collect();

    if rejected > 0 {
        eprintln!("[VALIDATE] Rejected {} of {} listings", rejected, raws.len());
    }
    listings
}

/// Keep the listings inside the filter's price and want-count bounds, in order.
pub fn filter_listings(listings: Vec<Listing>, filter: &ListingFilter) -> Vec<Listing> {
    let total = listings.len();
    let kept: Vec<Listing> = listings.into_iter().filter(|l| filter.accepts(l)).collect();
    if kept.len() < total {
        eprintln!(
            "[FILTER] Dropped {} of {} listings outside {:?}",
            total - kept.len(),
            total,
            filter
        );
    }
    kept
}
