/// Trend tracker: dev-scan size history and the growth derived from it.
///
/// Every completed full dev scan appends one snapshot (timestamp, total,
/// and a flattened id → size map covering groups and their children). The
/// history is one JSON file, rewritten atomically on each change and pruned
/// on write: snapshots older than the retention window go first, then only
/// the newest `max_snapshots` are kept.
///
/// Growth is the two-point rate between the earliest and the latest
/// retained snapshot that contains a category. It is not a regression.
use crate::cache::write_json_atomic;
use crate::error::Result;
use crate::model::trend::TOTAL_TREND_ID;
use crate::model::{DevScanResult, DiskUsageSnapshot, DiskUsageTrend, TrendPoint, TrendsResult};
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const DEFAULT_RETENTION_DAYS: u32 = 365;
pub const DEFAULT_MAX_SNAPSHOTS: usize = 1_000;

const HISTORY_VERSION: u32 = 1;

#[derive(Debug, Default, Serialize, Deserialize)]
struct History {
    version: u32,
    snapshots: Vec<DiskUsageSnapshot>,
}

pub struct TrendTracker {
    path: PathBuf,
    retention_days: u32,
    max_snapshots: usize,
    snapshots: Mutex<Vec<DiskUsageSnapshot>>,
}

impl TrendTracker {
    /// Open the history at `path`. A missing file starts an empty history;
    /// an unreadable or corrupt one is logged and treated the same way.
    pub fn new(path: impl Into<PathBuf>, retention_days: u32, max_snapshots: usize) -> Self {
        let path = path.into();
        let snapshots = load_history(&path);
        debug!(
            "Trend history {}: {} snapshots",
            path.display(),
            snapshots.len()
        );
        Self {
            path,
            retention_days,
            max_snapshots: max_snapshots.max(1),
            snapshots: Mutex::new(snapshots),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record `result` as of now.
    pub fn record_snapshot(&self, result: &DevScanResult) -> Result<()> {
        self.record_snapshot_at(result, Utc::now())
    }

    /// Record `result` with an explicit timestamp, then prune relative to it.
    pub fn record_snapshot_at(&self, result: &DevScanResult, now: DateTime<Utc>) -> Result<()> {
        let snapshot = DiskUsageSnapshot {
            timestamp: now,
            total_size: result.categories.iter().map(|c| c.size).sum(),
            categories: result.iter().map(|c| (c.id.clone(), c.size)).collect(),
        };

        let mut snapshots = self.snapshots.lock();
        snapshots.push(snapshot);
        snapshots.sort_by_key(|s| s.timestamp);

        let cutoff = now - Duration::days(i64::from(self.retention_days));
        snapshots.retain(|s| s.timestamp >= cutoff);
        if snapshots.len() > self.max_snapshots {
            let excess = snapshots.len() - self.max_snapshots;
            snapshots.drain(..excess);
        }

        // Write under the lock: the file must match the in-memory history.
        let history = History {
            version: HISTORY_VERSION,
            snapshots: snapshots.clone(),
        };
        write_json_atomic(&self.path, &history)
    }

    /// Retained snapshots, oldest first.
    pub fn snapshots(&self) -> Vec<DiskUsageSnapshot> {
        self.snapshots.lock().clone()
    }

    pub fn trends(&self) -> TrendsResult {
        trends_from(&self.snapshots.lock())
    }

    /// Category trends growing faster than `threshold` bytes per day,
    /// fastest first.
    pub fn growth_alerts(&self, threshold: f64) -> Vec<DiskUsageTrend> {
        self.trends()
            .trends
            .into_iter()
            .filter(|t| t.growth_rate > threshold)
            .collect()
    }

    /// Drop the whole history, in memory and on disk.
    pub fn clear(&self) -> Result<()> {
        let mut snapshots = self.snapshots.lock();
        snapshots.clear();
        match fs::remove_file(&self.path) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err.into()),
            _ => {
                info!("Trend history cleared");
                Ok(())
            }
        }
    }
}

/// Derive every category trend plus the total trend from chronological
/// snapshots.
pub fn trends_from(snapshots: &[DiskUsageSnapshot]) -> TrendsResult {
    let ids: BTreeSet<&str> = snapshots
        .iter()
        .flat_map(|s| s.categories.keys().map(String::as_str))
        .collect();

    let mut series: BTreeMap<&str, Vec<TrendPoint>> = BTreeMap::new();
    for snapshot in snapshots {
        for (id, size) in &snapshot.categories {
            series.entry(id.as_str()).or_default().push(TrendPoint {
                timestamp: snapshot.timestamp,
                size: *size,
            });
        }
    }

    let mut trends: Vec<DiskUsageTrend> = ids
        .into_iter()
        .map(|id| DiskUsageTrend::from_points(id, series.remove(id).unwrap_or_default()))
        .collect();
    trends.sort_by(|a, b| {
        b.growth_rate
            .total_cmp(&a.growth_rate)
            .then_with(|| a.category_id.cmp(&b.category_id))
    });

    let total = DiskUsageTrend::from_points(
        TOTAL_TREND_ID,
        snapshots
            .iter()
            .map(|s| TrendPoint {
                timestamp: s.timestamp,
                size: s.total_size,
            })
            .collect(),
    );

    TrendsResult {
        trends,
        total,
        snapshot_count: snapshots.len(),
        first_snapshot: snapshots.first().map(|s| s.timestamp),
        last_snapshot: snapshots.last().map(|s| s.timestamp),
    }
}

fn load_history(path: &Path) -> Vec<DiskUsageSnapshot> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Vec::new(),
        Err(err) => {
            warn!("Cannot read trend history {}: {err}", path.display());
            return Vec::new();
        }
    };
    match serde_json::from_str::<History>(&text) {
        Ok(history) if history.version == HISTORY_VERSION => {
            let mut snapshots = history.snapshots;
            snapshots.sort_by_key(|s| s.timestamp);
            snapshots
        }
        Ok(history) => {
            warn!(
                "Ignoring trend history {} with version {}",
                path.display(),
                history.version
            );
            Vec::new()
        }
        Err(err) => {
            warn!("Ignoring corrupt trend history {}: {err}", path.display());
            Vec::new()
        }
    }
}
