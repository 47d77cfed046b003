//! Safety checks before writing result files.
//!
//! Snapshots are irreplaceable once a crawl day has passed, so every write
//! path is validated against the inputs of the same run first.

use anyhow::{bail, Result};
use std::path::Path;

/// Validates that an output path is safe to write.
///
/// Checks:
/// - Output must have a `.json` extension
/// - Output cannot be any of the source paths, either literally or after
///   resolving symlinks and relative components
pub fn validate_output_path(output: &Path, source_paths: &[&Path]) -> Result<()> {
    let is_json = output
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if !is_json {
        bail!(
            "Safety check failed: output file '{}' must have a .json extension",
            output.display()
        );
    }

    let output_resolved = output.canonicalize().ok();
    for source in source_paths {
        let same_resolved = match (&output_resolved, source.canonicalize().ok()) {
            (Some(out), Some(src)) => *out == src,
            _ => false,
        };
        if output == *source || same_resolved {
            bail!(
                "Safety check failed: output '{}' cannot be the same as source '{}'",
                output.display(),
                source.display()
            );
        }
    }

    Ok(())
}
