//! Analyze how a snapshot collapses under normalization
//!
//! Usage: analyze-collisions <snapshot.json> [--narrow] [--top N] [--min-match-len N]

use anyhow::{Context, Result};
use rayon::prelude::*;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use vinyl_reconcile::dedup::group_by_normalized;
use vinyl_reconcile::matcher::{AlbumMatcher, MatchConfig, DEFAULT_MIN_MATCH_LEN};
use vinyl_reconcile::normalize::NoisePreset;
use vinyl_reconcile::progress::format_duration;
use vinyl_reconcile::report::truncate_chars;
use vinyl_reconcile::snapshot::load_titles;

fn flag_value(args: &[String], flag: &str) -> Option<usize> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: analyze-collisions <snapshot.json> [--narrow] [--top N] [--min-match-len N]");
        std::process::exit(1);
    }

    let path = Path::new(&args[1]);
    let top = flag_value(&args, "--top").unwrap_or(20);
    let min_match_len = flag_value(&args, "--min-match-len").unwrap_or(DEFAULT_MIN_MATCH_LEN);
    let preset = if args.iter().any(|a| a == "--narrow") {
        NoisePreset::Narrow
    } else {
        NoisePreset::Rich
    };

    let start = Instant::now();
    let matcher = AlbumMatcher::new(
        MatchConfig::default()
            .with_preset(preset)
            .with_min_match_len(min_match_len),
    );

    println!("Loading snapshot {}...", path.display());
    let titles = load_titles(path).with_context(|| format!("Failed to load {}", path.display()))?;
    println!("  Loaded {} titles", titles.len());

    let groups = group_by_normalized(&titles, &matcher);
    let mut collisions: Vec<_> = groups.iter().filter(|g| g.titles.len() > 1).collect();
    collisions.sort_by(|a, b| b.titles.len().cmp(&a.titles.len()));

    // Titles too short to take part in containment matches, counted per group
    let short = AtomicUsize::new(0);
    let empty = AtomicUsize::new(0);
    groups.par_iter().for_each(|g| {
        let len = g.norm.chars().count();
        if len == 0 {
            empty.fetch_add(g.titles.len(), Ordering::Relaxed);
        }
        if len <= min_match_len {
            short.fetch_add(g.titles.len(), Ordering::Relaxed);
        }
    });

    let total = titles.len().max(1) as f64;
    let short = short.load(Ordering::Relaxed);
    let empty = empty.load(Ordering::Relaxed);

    println!("\n{:=<60}", "");
    println!("Normalization summary ({:?} noise list)", preset);
    println!("  Titles:              {}", titles.len());
    println!("  Distinct normalized: {}", groups.len());
    println!("  Collision groups:    {}", collisions.len());
    println!(
        "  Exact-only titles:   {} ({:.1}%, normalized length <= {})",
        short,
        100.0 * short as f64 / total,
        min_match_len
    );
    println!("  Empty after noise:   {}", empty);
    println!("{:=<60}", "");

    if !collisions.is_empty() {
        println!("\nLargest collision groups:");
        for group in collisions.iter().take(top) {
            println!("  [{}] \"{}\"", group.titles.len(), group.norm);
            for title in &group.titles {
                println!("      {}", truncate_chars(title, 65));
            }
        }
    }

    println!("\nElapsed: {}", format_duration(start.elapsed()));
    Ok(())
}
