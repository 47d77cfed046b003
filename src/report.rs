//! Console rendering for reconciliation and delta results.

use std::fmt::Write;

use crate::reconcile::ReconciliationResult;

const RULE_WIDTH: usize = 40;
const RECONCILE_TITLE_WIDTH: usize = 55;
const DELTA_TITLE_WIDTH: usize = 65;

/// Truncate to at most `max` chars, never splitting a code point.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

fn write_numbered(out: &mut String, titles: &[String], width: usize) {
    for (i, title) in titles.iter().enumerate() {
        let _ = writeln!(out, "  {}. {}", i + 1, truncate_chars(title, width));
    }
}

pub fn render_reconciliation(
    result: &ReconciliationResult,
    left_name: &str,
    right_name: &str,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n{}", rule());
    let _ = writeln!(out, "   Seller catalog comparison");
    let _ = writeln!(out, "{}\n", rule());

    let _ = writeln!(out, "[Counts]");
    let _ = writeln!(out, "  {}: {}", left_name, result.left_total());
    let _ = writeln!(out, "  {}: {}", right_name, result.right_total());
    let _ = writeln!(out, "  Overlap: {}", result.overlap.len());
    let _ = writeln!(out, "  Only {}: {}", left_name, result.left_only.len());
    let _ = writeln!(out, "  Only {}: {}", right_name, result.right_only.len());

    let sections = [
        ("Overlap".to_string(), &result.overlap),
        (format!("Only {}", left_name), &result.left_only),
        (format!("Only {}", right_name), &result.right_only),
    ];
    for (heading, titles) in sections {
        let _ = writeln!(out, "\n[{}] ({})", heading, titles.len());
        write_numbered(&mut out, titles, RECONCILE_TITLE_WIDTH);
    }

    let _ = writeln!(out, "\n{}", rule());
    out
}

pub fn render_delta(titles: &[String], current_name: &str, competitor_name: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n{}", rule());
    let _ = writeln!(
        out,
        "   Listed by {}, delisted by {}",
        current_name, competitor_name
    );
    let _ = writeln!(out, "{}\n", rule());
    let _ = writeln!(out, "Found {} titles:\n", titles.len());
    write_numbered(&mut out, titles, DELTA_TITLE_WIDTH);
    let _ = writeln!(out, "\n{}", rule());
    out
}
