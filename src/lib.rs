//! Vinyl listing reconciliation library - shared modules for all binaries.

pub mod dedup;
pub mod delta;
pub mod matcher;
pub mod models;
pub mod normalize;
pub mod progress;
pub mod reconcile;
pub mod report;
pub mod safety;
pub mod snapshot;
pub mod validate;

pub use matcher::{AlbumMatcher, MatchConfig};
pub use normalize::{normalize_title, NoiseFilter, NoisePreset};
pub use reconcile::{reconcile, ReconciliationResult};
