/// Scan history snapshots and the trends derived from them.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Category id used for the whole-scan total series.
pub const TOTAL_TREND_ID: &str = "total";

/// One point-in-time record of dev-cache usage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskUsageSnapshot {
    pub timestamp: DateTime<Utc>,
    pub total_size: u64,
    /// Flattened id → size map (groups and their children).
    pub categories: BTreeMap<String, u64>,
}

/// A single point on a trend line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub timestamp: DateTime<Utc>,
    pub size: u64,
}

/// Growth of one category (or the total) across retained snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskUsageTrend {
    pub category_id: String,
    /// Chronological points.
    pub points: Vec<TrendPoint>,
    /// `(latest − earliest) / days_between`, bytes per day.
    pub growth_rate: f64,
    /// `latest − earliest`, bytes.
    pub total_change: i64,
}

impl DiskUsageTrend {
    /// Derive a trend from chronological points using the two-point rate
    /// between the earliest and latest point. Fewer than two points, or no
    /// elapsed time between them, yields a zero rate.
    pub fn from_points(category_id: impl Into<String>, points: Vec<TrendPoint>) -> Self {
        let (growth_rate, total_change) = match (points.first(), points.last()) {
            (Some(first), Some(last)) if points.len() >= 2 => {
                let change = last.size as i64 - first.size as i64;
                let days = (last.timestamp - first.timestamp).num_seconds() as f64 / 86_400.0;
                let rate = if days > 0.0 { change as f64 / days } else { 0.0 };
                (rate, change)
            }
            _ => (0.0, 0),
        };
        Self {
            category_id: category_id.into(),
            points,
            growth_rate,
            total_change,
        }
    }

    pub fn latest_size(&self) -> u64 {
        self.points.last().map(|p| p.size).unwrap_or(0)
    }
}

/// Everything the trend view needs in one response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendsResult {
    /// Per-category trends, fastest growing first.
    pub trends: Vec<DiskUsageTrend>,
    pub total: DiskUsageTrend,
    pub snapshot_count: usize,
    pub first_snapshot: Option<DateTime<Utc>>,
    pub last_snapshot: Option<DateTime<Utc>>,
}
