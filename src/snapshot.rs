//! Reading and writing snapshot, export and result files.
//!
//! Snapshot files accumulated over several crawler generations, so reading is
//! shape-tolerant: `{"data": [{title,..}]}`, `{"albums": [..]}`,
//! `{"products": [{title,..}]}`, or a bare JSON list of strings or records.
//! Titles that are null, non-string or blank are dropped here, at the
//! boundary, so the matching core only ever sees real strings.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::models::{ExportFile, Listing, ListingFilter, NamedSnapshot, RawListing, TitleRecord};
use crate::reconcile::{ReconcileStats, ReconciliationResult};

/// Object keys holding the record list, in lookup order.
const LIST_KEYS: &[&str] = &["data", "albums", "products", "items"];

// ============================================================================
// Reading
// ============================================================================

fn read_json(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse JSON in {}", path.display()))
}

fn record_list(value: &Value) -> Result<&Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(map) => {
            for key in LIST_KEYS {
                if let Some(Value::Array(items)) = map.get(*key) {
                    return Ok(items);
                }
            }
            bail!("snapshot object has none of the list keys {:?}", LIST_KEYS)
        }
        _ => bail!("snapshot is neither a JSON list nor an object"),
    }
}

fn item_title(item: &Value) -> Option<&str> {
    match item {
        Value::String(s) => Some(s.as_str()),
        Value::Object(map) => map.get("title").and_then(Value::as_str),
        _ => None,
    }
}

/// Titles of an in-memory snapshot document, in file order.
pub fn titles_from_value(value: &Value) -> Result<Vec<String>> {
    let items = record_list(value)?;
    let titles: Vec<String> = items
        .iter()
        .filter_map(item_title)
        .filter(|t| !t.trim().is_empty())
        .map(str::to_string)
        .collect();

    let skipped = items.len() - titles.len();
    if skipped > 0 {
        eprintln!("[LOAD] Skipped {} records without a usable title", skipped);
    }
    Ok(titles)
}

pub fn load_titles(path: &Path) -> Result<Vec<String>> {
    let value = read_json(path)?;
    titles_from_value(&value).with_context(|| format!("Unrecognized snapshot layout in {}", path.display()))
}

/// Load a snapshot named after its file stem (e.g. `mengde_20260208`).
pub fn load_named(path: &Path) -> Result<NamedSnapshot> {
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("snapshot")
        .to_string();
    Ok(NamedSnapshot::new(name, load_titles(path)?))
}

/// Read a historical record as raw text. Invalid UTF-8 is replaced, not rejected.
pub fn load_blob(path: &Path) -> Result<String> {
    let bytes = fs::read(path)
        .with_context(|| format!("Failed to read historical record {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Raw listing records of a crawl or export file, for cleaning and merging.
pub fn load_raw_listings(path: &Path) -> Result<Vec<RawListing>> {
    let value = read_json(path)?;
    let items = record_list(&value)
        .with_context(|| format!("Unrecognized listing layout in {}", path.display()))?;
    items
        .iter()
        .filter(|item| item.is_object())
        .map(|item| {
            serde_json::from_value(item.clone())
                .with_context(|| format!("Malformed listing record in {}", path.display()))
        })
        .collect()
}

pub fn load_export(path: &Path) -> Result<ExportFile> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read export {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse export {}", path.display()))
}

// ============================================================================
// Writing
// ============================================================================

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

pub fn write_export(
    path: &Path,
    listings: Vec<Listing>,
    filters: Option<ListingFilter>,
) -> Result<ExportFile> {
    let export = ExportFile::new(listings).with_filters(filters);
    write_json(path, &export)?;
    eprintln!("[EXPORT] Wrote {} listings to {}", export.total, path.display());
    Ok(export)
}

/// Write a title list as `[{"title": ...}, ...]`.
pub fn write_titles(path: &Path, titles: &[String]) -> Result<()> {
    let records: Vec<TitleRecord> = titles
        .iter()
        .map(|t| TitleRecord { title: t.clone() })
        .collect();
    write_json(path, &records)
}

#[derive(Serialize)]
struct ReconciliationFile<'a> {
    generated_at: String,
    stats: &'a ReconcileStats,
    #[serde(flatten)]
    result: &'a ReconciliationResult,
}

pub fn write_reconciliation(
    path: &Path,
    result: &ReconciliationResult,
    stats: &ReconcileStats,
) -> Result<()> {
    let file = ReconciliationFile {
        generated_at: chrono::Local::now().to_rfc3339(),
        stats,
        result,
    };
    write_json(path, &file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_titles_from_export_shape() {
        let value = json!({
            "export_time": "2026-02-08T10:00:00",
            "total": 3,
            "data": [
                { "title": "Abbey Road", "price": 100 },
                { "title": null },
                { "title": "Blue Train" }
            ]
        });
        assert_eq!(titles_from_value(&value).unwrap(), vec!["Abbey Road", "Blue Train"]);
    }

    #[test]
    fn test_titles_from_albums_and_plain_list() {
        let albums = json!({ "total": 2, "albums": ["Giant Steps", "  ", "Ballads"] });
        assert_eq!(titles_from_value(&albums).unwrap(), vec!["Giant Steps", "Ballads"]);

        let plain = json!(["Kind of Blue", 42, { "title": "Nefertiti" }]);
        assert_eq!(titles_from_value(&plain).unwrap(), vec!["Kind of Blue", "Nefertiti"]);
    }

    #[test]
    fn test_titles_from_products_shape() {
        let value = json!({ "products": [{ "id": "1", "title": "Head Hunters" }] });
        assert_eq!(titles_from_value(&value).unwrap(), vec!["Head Hunters"]);
    }

    #[test]
    fn test_unknown_layout_is_error() {
        assert!(titles_from_value(&json!({ "rows": [] })).is_err());
        assert!(titles_from_value(&json!("just a string")).is_err());
    }

    #[test]
    fn test_titles_keep_raw_decoration() {
        let value = json!(["  【现货】Abbey Road 黑胶  "]);
        assert_eq!(titles_from_value(&value).unwrap(), vec!["  【现货】Abbey Road 黑胶  "]);
    }
}
