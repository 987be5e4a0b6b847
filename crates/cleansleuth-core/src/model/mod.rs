/// Data model for CleanSleuth scan, analysis, and cleanup results.
///
/// Every type here is a plain value object owned by the caller and is
/// serde-serialisable so the cache and trend store can persist copies.
pub mod category;
pub mod clean;
pub mod duplicate;
pub mod file_node;
pub mod recommendation;
pub mod size;
pub mod trend;

pub use category::{Category, DevScanResult};
pub use clean::{CleanError, CleanErrorCode, CleanResult, CleanStatus};
pub use duplicate::{DuplicateFile, DuplicateGroup, DuplicatesResult};
pub use file_node::FileNode;
pub use recommendation::{Recommendation, RecommendationKind, RecommendationsResult};
pub use trend::{DiskUsageSnapshot, DiskUsageTrend, TrendPoint, TrendsResult};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::SystemTime;

/// Which kind of scan produced a result or event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// Full developer-cache scan over the whole catalog.
    Dev,
    /// Low-latency subset of the catalog.
    QuickDev,
    /// Lazy directory tree of an arbitrary root.
    Normal,
    Duplicates,
    LargeFiles,
    DependencyDirs,
}

impl ScanMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::QuickDev => "quick",
            Self::Normal => "normal",
            Self::Duplicates => "duplicates",
            Self::LargeFiles => "large-files",
            Self::DependencyDirs => "dependency-dirs",
        }
    }
}

/// Result of a normal (tree) scan: the root with one expanded level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullScanResult {
    pub root: FileNode,
    pub total_size: u64,
    pub total_items: u64,
    pub scanned_at: DateTime<Utc>,
    pub duration_ms: u64,
}

/// Convert a filesystem timestamp into the UTC form stored in results.
pub fn to_utc(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}

/// Display name for a path: its final component, or the whole path for
/// roots such as `/` or `C:\`.
pub fn display_name(path: &std::path::Path) -> String {
    if let Some(name) = path.file_name() {
        return name.to_string_lossy().into_owned();
    }
    let s = path.to_string_lossy();
    match s.trim_end_matches(['\\', '/']) {
        "" => s.into_owned(),
        trimmed => trimmed.to_string(),
    }
}

/// Strip duplicate targets while keeping first-seen order.
pub fn dedup_paths(paths: impl IntoIterator<Item = PathBuf>) -> Vec<PathBuf> {
    let mut seen = std::collections::HashSet::new();
    paths
        .into_iter()
        .filter(|p| seen.insert(p.clone()))
        .collect()
}
