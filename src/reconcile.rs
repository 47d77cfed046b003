//! Two-snapshot reconciliation: overlap, left-only and right-only titles.
//!
//! Matching is greedy and order-sensitive: each left title, in snapshot order,
//! consumes the first unconsumed right title it matches. Because the match
//! relation is not transitive, a different input order can pair titles
//! differently; for a fixed order the output is fully deterministic.

use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;

use crate::matcher::AlbumMatcher;
use crate::models::NamedSnapshot;
use crate::progress::{create_progress_bar, finish_phase, log_progress};

// ============================================================================
// Result Models
// ============================================================================

/// Overlap / left-only / right-only titles, each list in original snapshot order.
/// `overlap` holds the left-side representative of each matched pair.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationResult {
    pub overlap: Vec<String>,
    pub left_only: Vec<String>,
    pub right_only: Vec<String>,
}

impl ReconciliationResult {
    /// Left snapshot size: every left title is in overlap or left_only.
    pub fn left_total(&self) -> usize {
        self.overlap.len() + self.left_only.len()
    }

    /// Right snapshot size: every consumed right title pairs with one overlap entry.
    pub fn right_total(&self) -> usize {
        self.overlap.len() + self.right_only.len()
    }
}

/// Per-comparison counts for logging and the persisted result file.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ReconcileStats {
    pub left_name: String,
    pub right_name: String,
    pub left_total: usize,
    pub right_total: usize,
    pub overlap: usize,
    pub left_only: usize,
    pub right_only: usize,
    pub elapsed_seconds: f64,
}

impl ReconcileStats {
    pub fn from_result(
        result: &ReconciliationResult,
        left_name: &str,
        right_name: &str,
        elapsed_seconds: f64,
    ) -> Self {
        Self {
            left_name: left_name.to_string(),
            right_name: right_name.to_string(),
            left_total: result.left_total(),
            right_total: result.right_total(),
            overlap: result.overlap.len(),
            left_only: result.left_only.len(),
            right_only: result.right_only.len(),
            elapsed_seconds,
        }
    }

    /// Share of the left snapshot also carried on the right, in percent
    pub fn overlap_rate(&self) -> f64 {
        if self.left_total == 0 {
            0.0
        } else {
            100.0 * self.overlap as f64 / self.left_total as f64
        }
    }

    /// Log stats to stderr in JSON format
    pub fn log_phase(&self, phase: &str) {
        if let Ok(json) = serde_json::to_string_pretty(self) {
            eprintln!("[STATS:{}]\n{}", phase, json);
        }
    }

    /// Write stats to a JSON file
    pub fn write_to_file(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

// ============================================================================
// Reconciliation
// ============================================================================

/// Reconcile two snapshots with greedy one-to-one consumption. O(n·m) comparisons.
///
/// Duplicate raw titles are separate subjects: two identical left titles each
/// need their own right-side partner, otherwise the second lands in `left_only`.
pub fn reconcile<L, R>(left: &[L], right: &[R], matcher: &AlbumMatcher) -> ReconciliationResult
where
    L: AsRef<str>,
    R: AsRef<str>,
{
    let left_prepared = matcher.prepare(left);
    let right_prepared = matcher.prepare(right);

    // Consumption is tracked by index since raw titles need not be unique
    let mut consumed_right = vec![false; right_prepared.len()];
    let mut result = ReconciliationResult::default();

    for l in &left_prepared {
        let partner = right_prepared
            .iter()
            .enumerate()
            .find(|(j, r)| !consumed_right[*j] && matcher.matches_normalized(&l.norm, &r.norm))
            .map(|(j, _)| j);

        match partner {
            Some(j) => {
                consumed_right[j] = true;
                result.overlap.push(l.raw.to_string());
            }
            None => result.left_only.push(l.raw.to_string()),
        }
    }

    result.right_only = right_prepared
        .iter()
        .zip(&consumed_right)
        .filter(|(_, consumed)| !**consumed)
        .map(|(r, _)| r.raw.to_string())
        .collect();

    result
}

/// Reconcile two named snapshots and time the run.
pub fn reconcile_named(
    left: &NamedSnapshot,
    right: &NamedSnapshot,
    matcher: &AlbumMatcher,
) -> (ReconciliationResult, ReconcileStats) {
    let start = Instant::now();
    let result = reconcile(&left.titles, &right.titles, matcher);
    let stats = ReconcileStats::from_result(
        &result,
        &left.name,
        &right.name,
        start.elapsed().as_secs_f64(),
    );
    (result, stats)
}

/// Result of one pair in a batch comparison.
#[derive(Clone, Debug, Serialize)]
pub struct PairReport {
    pub left: String,
    pub right: String,
    pub result: ReconciliationResult,
    pub stats: ReconcileStats,
}

/// Reconcile every unordered pair of snapshots in parallel.
///
/// Pairs are independent, so they run on the rayon pool; the returned order is
/// the fixed pair order (0,1), (0,2), .., (1,2), .. regardless of scheduling.
pub fn reconcile_all(snapshots: &[NamedSnapshot], matcher: &AlbumMatcher) -> Vec<PairReport> {
    let pairs: Vec<(usize, usize)> = (0..snapshots.len())
        .flat_map(|i| ((i + 1)..snapshots.len()).map(move |j| (i, j)))
        .collect();

    let total = pairs.len() as u64;
    let pb = create_progress_bar(total, "Comparing seller pairs");

    let reports: Vec<PairReport> = pairs
        .par_iter()
        .map(|&(i, j)| {
            let (left, right) = (&snapshots[i], &snapshots[j]);
            let (result, stats) = reconcile_named(left, right, matcher);
            pb.inc(1);
            log_progress("COMPARE", pb.position(), total, 10);
            PairReport {
                left: left.name.clone(),
                right: right.name.clone(),
                result,
                stats,
            }
        })
        .collect();

    finish_phase(&pb, &format!("Compared {} seller pairs", reports.len()));
    reports
}
