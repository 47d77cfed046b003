use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Instant;

use vinyl_reconcile::dedup::{filter_duplicates, merge_and_deduplicate, SeenSet};
use vinyl_reconcile::delta::listings_sold_elsewhere;
use vinyl_reconcile::matcher::{AlbumMatcher, MatchConfig, DEFAULT_MIN_CANDIDATE_LEN, DEFAULT_MIN_MATCH_LEN};
use vinyl_reconcile::normalize::{NoiseFilter, NoisePreset};
use vinyl_reconcile::progress::{format_duration, set_log_only};
use vinyl_reconcile::reconcile::{reconcile_all, reconcile_named};
use vinyl_reconcile::report::{render_delta, render_reconciliation};
use vinyl_reconcile::safety::validate_output_path;
use vinyl_reconcile::snapshot::{
    load_blob, load_named, load_raw_listings, load_titles, write_export, write_reconciliation,
    write_titles,
};
use vinyl_reconcile::models::ListingFilter;
use vinyl_reconcile::validate::{clean_listings, filter_listings, sanitize_filename};

#[derive(Parser)]
#[command(name = "vinyl-reconcile")]
#[command(about = "Compare vinyl seller catalogs across snapshots")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Noise phrase list (default: rich, narrow for sold-elsewhere)
    #[arg(long, global = true, value_enum)]
    noise: Option<NoiseArg>,

    /// Extra noise phrases (comma-separated)
    #[arg(long, global = true, value_delimiter = ',')]
    extra_noise: Vec<String>,

    /// Minimum normalized length for containment matches
    #[arg(long, global = true, default_value_t = DEFAULT_MIN_MATCH_LEN)]
    min_match_len: usize,

    /// Minimum length of titles scanned from historical records
    #[arg(long, global = true, default_value_t = DEFAULT_MIN_CANDIDATE_LEN)]
    min_candidate_len: usize,

    #[arg(long, global = true, default_value = "0")]
    workers: usize,

    /// Log-only mode: no progress bars, bracketed stderr lines instead
    #[arg(long, global = true)]
    log_only: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum NoiseArg {
    Narrow,
    Rich,
}

impl From<NoiseArg> for NoisePreset {
    fn from(arg: NoiseArg) -> Self {
        match arg {
            NoiseArg::Narrow => NoisePreset::Narrow,
            NoiseArg::Rich => NoisePreset::Rich,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compare two seller snapshots
    Compare {
        left: PathBuf,
        right: PathBuf,

        #[arg(long)]
        left_name: Option<String>,

        #[arg(long)]
        right_name: Option<String>,

        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write comparison stats as JSON to this path
        #[arg(long)]
        stats: Option<PathBuf>,
    },

    /// Titles still listed by one seller that a competitor has delisted
    SoldElsewhere {
        current: PathBuf,

        /// Historical competitor record (raw text, may be broken JSON)
        historical: PathBuf,

        /// Current competitor snapshot
        competitor_now: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compare every pair of snapshots
    CompareAll {
        #[arg(required = true, num_args = 2..)]
        files: Vec<PathBuf>,

        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Write per-pair stats as a JSON list to this path
        #[arg(long)]
        stats: Option<PathBuf>,
    },

    /// Merge two crawls, deduplicating listings by product id
    Merge {
        existing: PathBuf,
        new: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        /// Drop listings priced below this
        #[arg(long)]
        min_price: Option<f64>,

        /// Drop listings priced above this
        #[arg(long)]
        max_price: Option<f64>,

        /// Drop listings with fewer "want" marks (missing counts as 0)
        #[arg(long)]
        min_want_count: Option<u64>,
    },

    /// Print normalized forms of titles
    Normalize {
        #[arg(required = true)]
        titles: Vec<String>,
    },
}

fn build_matcher(global: &GlobalArgs, default_preset: NoisePreset) -> AlbumMatcher {
    let preset = global.noise.map(NoisePreset::from).unwrap_or(default_preset);
    let noise = NoiseFilter::preset(preset).with_extra(global.extra_noise.iter().map(|s| s.trim()));
    AlbumMatcher::new(
        MatchConfig::default()
            .with_noise(noise)
            .with_min_match_len(global.min_match_len)
            .with_min_candidate_len(global.min_candidate_len),
    )
}

fn stem_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("snapshot")
        .to_string()
}

/// Validate every file a command will write against its inputs, before any work.
fn check_outputs(cmd: &Command) -> Result<()> {
    match cmd {
        Command::Compare {
            left,
            right,
            output,
            stats,
            ..
        } => {
            let sources = [left.as_path(), right.as_path()];
            if let Some(out) = output {
                validate_output_path(out, &sources)?;
            }
            if let Some(path) = stats {
                validate_output_path(path, &sources)?;
                if let Some(out) = output {
                    validate_output_path(path, &[out.as_path()])?;
                }
            }
        }
        Command::SoldElsewhere {
            current,
            historical,
            competitor_now,
            output: Some(out),
        } => validate_output_path(
            out,
            &[current.as_path(), historical.as_path(), competitor_now.as_path()],
        )?,
        Command::CompareAll {
            files,
            stats: Some(path),
            ..
        } => {
            let sources: Vec<&Path> = files.iter().map(PathBuf::as_path).collect();
            validate_output_path(path, &sources)?;
        }
        Command::Merge {
            existing,
            new,
            output,
            ..
        } => validate_output_path(output, &[existing.as_path(), new.as_path()])?,
        _ => {}
    }
    Ok(())
}

fn run_compare(
    global: &GlobalArgs,
    left: &Path,
    right: &Path,
    left_name: Option<String>,
    right_name: Option<String>,
    output: Option<&Path>,
    stats_path: Option<&Path>,
) -> Result<()> {
    let matcher = build_matcher(global, NoisePreset::Rich);

    let mut left_snap = load_named(left)?;
    let mut right_snap = load_named(right)?;
    if let Some(name) = left_name {
        left_snap.name = name;
    }
    if let Some(name) = right_name {
        right_snap.name = name;
    }
    eprintln!(
        "[LOAD] {}: {} titles, {}: {} titles",
        left_snap.name,
        left_snap.len(),
        right_snap.name,
        right_snap.len()
    );

    let (result, stats) = reconcile_named(&left_snap, &right_snap, &matcher);
    print!("{}", render_reconciliation(&result, &left_snap.name, &right_snap.name));
    stats.log_phase("compare");

    if let Some(out) = output {
        write_reconciliation(out, &result, &stats)?;
        println!("Saved to {}", out.display());
    }
    if let Some(path) = stats_path {
        stats.write_to_file(path)?;
    }
    Ok(())
}

fn run_sold_elsewhere(
    global: &GlobalArgs,
    current: &Path,
    historical: &Path,
    competitor_now: &Path,
    output: Option<&Path>,
) -> Result<()> {
    let matcher = build_matcher(global, NoisePreset::Narrow);

    let current_titles = load_titles(current)?;
    let blob = load_blob(historical)?;
    let competitor_titles = load_titles(competitor_now)?;

    let results = listings_sold_elsewhere(&current_titles, &blob, &competitor_titles, &matcher);
    print!(
        "{}",
        render_delta(&results, &stem_name(current), &stem_name(competitor_now))
    );

    if let Some(out) = output {
        write_titles(out, &results)?;
        println!("Saved to {}", out.display());
    }
    Ok(())
}

fn run_compare_all(
    global: &GlobalArgs,
    files: &[PathBuf],
    output_dir: Option<&Path>,
    stats_path: Option<&Path>,
) -> Result<()> {
    let matcher = build_matcher(global, NoisePreset::Rich);
    let snapshots = files
        .iter()
        .map(|f| load_named(f))
        .collect::<Result<Vec<_>>>()?;

    let reports = reconcile_all(&snapshots, &matcher);

    println!("\n{:=<60}", "");
    for report in &reports {
        println!(
            "  {} vs {}: overlap {} ({:.1}%), only {} {}, only {} {}",
            report.left,
            report.right,
            report.stats.overlap,
            report.stats.overlap_rate(),
            report.left,
            report.stats.left_only,
            report.right,
            report.stats.right_only
        );
    }
    println!("{:=<60}", "");

    if let Some(dir) = output_dir {
        let sources: Vec<&Path> = files.iter().map(PathBuf::as_path).collect();
        for report in &reports {
            let name = sanitize_filename(&format!("compare_{}_{}", report.left, report.right));
            let out = dir.join(format!("{}.json", name));
            validate_output_path(&out, &sources)?;
            write_reconciliation(&out, &report.result, &report.stats)?;
        }
        println!("Saved {} results to {}", reports.len(), dir.display());
    }

    if let Some(path) = stats_path {
        let stats: Vec<_> = reports.iter().map(|r| &r.stats).collect();
        std::fs::write(path, serde_json::to_string_pretty(&stats)?)
            .with_context(|| format!("Failed to write stats to {}", path.display()))?;
    }
    Ok(())
}

fn run_merge(existing: &Path, new: &Path, output: &Path, filter: &ListingFilter) -> Result<()> {
    let crawled_at = chrono::Local::now().to_rfc3339();

    let old_listings = clean_listings(&load_raw_listings(existing)?, &crawled_at);
    let new_listings = filter_duplicates(clean_listings(&load_raw_listings(new)?, &crawled_at));

    let mut seen = SeenSet::from_listings(&old_listings);
    let fresh = new_listings.iter().filter(|l| seen.is_new(l)).count();

    let mut merged = merge_and_deduplicate(old_listings, new_listings);
    let filters = if filter.is_empty() {
        None
    } else {
        merged = filter_listings(merged, filter);
        Some(filter.clone())
    };
    let export = write_export(output, merged, filters)?;

    println!("Merged {} listings ({} new)", export.total, fresh);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let global = &cli.global;

    set_log_only(global.log_only);
    check_outputs(&cli.cmd)?;

    if global.workers > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(global.workers)
            .build_global()
            .context("Failed to set thread pool size")?;
    }
    let start = Instant::now();

    match &cli.cmd {
        Command::Compare {
            left,
            right,
            left_name,
            right_name,
            output,
            stats,
        } => run_compare(
            global,
            left,
            right,
            left_name.clone(),
            right_name.clone(),
            output.as_deref(),
            stats.as_deref(),
        )?,
        Command::SoldElsewhere {
            current,
            historical,
            competitor_now,
            output,
        } => run_sold_elsewhere(global, current, historical, competitor_now, output.as_deref())?,
        Command::CompareAll {
            files,
            output_dir,
            stats,
        } => run_compare_all(global, files, output_dir.as_deref(), stats.as_deref())?,
        Command::Merge {
            existing,
            new,
            output,
            min_price,
            max_price,
            min_want_count,
        } => {
            let filter = ListingFilter {
                min_price: *min_price,
                max_price: *max_price,
                min_want_count: *min_want_count,
            };
            run_merge(existing, new, output, &filter)?
        }
        Command::Normalize { titles } => {
            let matcher = build_matcher(global, NoisePreset::Rich);
            for title in titles {
                println!("{}\t{}", title, matcher.normalize(title));
            }
        }
    }

    eprintln!("[DONE] {}", format_duration(start.elapsed()));
    Ok(())
}
