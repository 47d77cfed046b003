// File-backed tests: snapshot loading, result writing, listing merges and
// output path safety.

use std::fs;
use std::path::Path;

use serde_json::{json, Value};
use tempfile::TempDir;
use vinyl_reconcile::dedup::merge_and_deduplicate;
use vinyl_reconcile::matcher::AlbumMatcher;
use vinyl_reconcile::models::ListingFilter;
use vinyl_reconcile::reconcile::reconcile_named;
use vinyl_reconcile::safety::validate_output_path;
use vinyl_reconcile::snapshot::*;
use vinyl_reconcile::validate::{clean_listings, filter_listings};

fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn load_titles_from_every_snapshot_shape() {
    let dir = TempDir::new().unwrap();
    let export = write(
        &dir,
        "export.json",
        r#"{"export_time":"2026-02-08T10:00:00","total":2,"data":[{"title":"Abbey Road"},{"title":null}]}"#,
    );
    let albums = write(&dir, "albums.json", r#"{"total":1,"albums":["Blue Train"]}"#);
    let products = write(&dir, "products.json", r#"{"products":[{"id":"7","title":"Giant Steps"}]}"#);
    let plain = write(&dir, "plain.json", r#"["Kind of Blue", ""]"#);

    assert_eq!(load_titles(&export).unwrap(), vec!["Abbey Road"]);
    assert_eq!(load_titles(&albums).unwrap(), vec!["Blue Train"]);
    assert_eq!(load_titles(&products).unwrap(), vec!["Giant Steps"]);
    assert_eq!(load_titles(&plain).unwrap(), vec!["Kind of Blue"]);
}

#[test]
fn load_titles_errors_name_the_file() {
    let dir = TempDir::new().unwrap();
    let broken = write(&dir, "broken.json", "{not json");
    let err = load_titles(&broken).unwrap_err();
    assert!(format!("{:#}", err).contains("broken.json"));

    let missing = dir.path().join("missing.json");
    assert!(load_titles(&missing).is_err());
}

#[test]
fn load_named_uses_file_stem() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "mengde_20260208.json", r#"["Abbey Road"]"#);
    let snapshot = load_named(&path).unwrap();
    assert_eq!(snapshot.name, "mengde_20260208");
    assert_eq!(snapshot.titles, vec!["Abbey Road"]);
}

#[test]
fn load_blob_tolerates_invalid_utf8() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("history.txt");
    let mut bytes = b"title:Abbey Road Remaster,".to_vec();
    bytes.extend_from_slice(&[0xff, 0xfe]);
    fs::write(&path, bytes).unwrap();

    let blob = load_blob(&path).unwrap();
    assert!(blob.starts_with("title:Abbey Road Remaster,"));
}

#[test]
fn write_titles_as_records() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("nested").join("sold.json");
    write_titles(&out, &["Abbey Road".to_string(), "黑胶 Blue Train".to_string()]).unwrap();

    assert_eq!(
        read_json(&out),
        json!([{ "title": "Abbey Road" }, { "title": "黑胶 Blue Train" }])
    );
    // Written titles load back through the plain-list shape
    assert_eq!(load_titles(&out).unwrap(), vec!["Abbey Road", "黑胶 Blue Train"]);
}

#[test]
fn write_reconciliation_file() {
    let dir = TempDir::new().unwrap();
    let left = write(&dir, "left.json", r#"["A", "B", "C"]"#);
    let right = write(&dir, "right.json", r#"["B", "D"]"#);
    let (result, stats) = reconcile_named(
        &load_named(&left).unwrap(),
        &load_named(&right).unwrap(),
        &AlbumMatcher::default(),
    );

    let out = dir.path().join("compare.json");
    write_reconciliation(&out, &result, &stats).unwrap();

    let value = read_json(&out);
    assert_eq!(value["overlap"], json!(["B"]));
    assert_eq!(value["left_only"], json!(["A", "C"]));
    assert_eq!(value["right_only"], json!(["D"]));
    assert_eq!(value["stats"]["left_name"], json!("left"));
    assert_eq!(value["stats"]["left_total"], json!(3));
    assert!(value["generated_at"].is_string());
}

#[test]
fn merge_crawls_into_export() {
    let dir = TempDir::new().unwrap();
    let existing = write(
        &dir,
        "existing.json",
        r#"{"data":[
            {"product_id":"1","title":"Abbey Road","price":"¥128.00"},
            {"product_id":"2","title":"Blue Train","price":100}
        ]}"#,
    );
    let new = write(
        &dir,
        "new.json",
        r#"[
            {"title":"Abbey Road 黑胶","price":"¥118","link":"https://www.goofish.com/item?id=1"},
            {"product_id":"3","title":"Giant Steps","price":"88"},
            {"product_id":"4","title":""}
        ]"#,
    );

    let crawled_at = "2026-02-08T10:00:00+08:00";
    let old = clean_listings(&load_raw_listings(&existing).unwrap(), crawled_at);
    let fresh = clean_listings(&load_raw_listings(&new).unwrap(), crawled_at);
    assert_eq!(old.len(), 2);
    assert_eq!(fresh.len(), 2);

    let out = dir.path().join("merged.json");
    let export = write_export(&out, merge_and_deduplicate(old, fresh), None).unwrap();
    assert_eq!(export.total, 3);

    let loaded = load_export(&out).unwrap();
    let ids: Vec<&str> = loaded.data.iter().map(|l| l.product_id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
    assert_eq!(loaded.data[0].title, "Abbey Road 黑胶");
    assert!((loaded.data[0].price - 118.0).abs() < 1e-9);
    assert_eq!(load_titles(&out).unwrap().len(), 3);
    assert!(loaded.filters.is_none());
    assert!(read_json(&out).get("filters").is_none());
}

#[test]
fn filtered_export_records_bounds() {
    let dir = TempDir::new().unwrap();
    let crawl = write(
        &dir,
        "crawl.json",
        r#"[
            {"product_id":"1","title":"Abbey Road","price":"¥128","want_count":"12人想要"},
            {"product_id":"2","title":"Blue Train","price":"¥30","want_count":40},
            {"product_id":"3","title":"Giant Steps","price":"¥88"}
        ]"#,
    );
    let listings = clean_listings(&load_raw_listings(&crawl).unwrap(), "");
    let filter = ListingFilter {
        min_price: Some(50.0),
        max_price: None,
        min_want_count: Some(1),
    };

    let out = dir.path().join("filtered.json");
    let kept = filter_listings(listings, &filter);
    write_export(&out, kept, Some(filter.clone())).unwrap();

    let value = read_json(&out);
    assert_eq!(value["total"], json!(1));
    assert_eq!(value["data"][0]["product_id"], json!("1"));
    assert_eq!(
        value["filters"],
        json!({ "min_price": 50.0, "max_price": null, "min_want_count": 1 })
    );
    assert_eq!(load_export(&out).unwrap().filters, Some(filter));
}

#[test]
fn output_path_safety() {
    let dir = TempDir::new().unwrap();
    let source = write(&dir, "mengde.json", r#"["Abbey Road"]"#);

    assert!(validate_output_path(&dir.path().join("result.json"), &[&source]).is_ok());
    assert!(validate_output_path(&source, &[&source]).is_err());
    assert!(validate_output_path(&dir.path().join("result.txt"), &[&source]).is_err());

    // Same file reached through a different spelling
    let indirect = dir.path().join(".").join("mengde.json");
    assert!(validate_output_path(&indirect, &[&source]).is_err());
}
