/// Prioritised cleanup suggestions.
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Recommendations at or above this priority count as high priority.
pub const HIGH_PRIORITY_THRESHOLD: u8 = 70;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    LargeCategory,
    QuickWin,
    FastGrowing,
    StaleCache,
    DuplicateCluster,
    LargeFiles,
    DependencyDirs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub title: String,
    pub description: String,
    /// Estimated reclaimable bytes.
    pub size: u64,
    /// 0–100, higher is more urgent.
    pub priority: u8,
    /// Set when the action is "clean this category".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    /// Set when the action is "delete these paths".
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationsResult {
    recommendations: Vec<Recommendation>,
    total_savings: u64,
    high_priority_count: usize,
}

impl RecommendationsResult {
    /// Sort by priority then size (both descending) and derive the totals.
    pub fn new(mut recommendations: Vec<Recommendation>) -> Self {
        recommendations.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| b.size.cmp(&a.size))
                .then_with(|| a.title.cmp(&b.title))
        });
        let total_savings = recommendations.iter().map(|r| r.size).sum();
        let high_priority_count = recommendations
            .iter()
            .filter(|r| r.priority >= HIGH_PRIORITY_THRESHOLD)
            .count();
        Self {
            recommendations,
            total_savings,
            high_priority_count,
        }
    }

    pub fn recommendations(&self) -> &[Recommendation] {
        &self.recommendations
    }

    pub fn total_savings(&self) -> u64 {
        self.total_savings
    }

    pub fn high_priority_count(&self) -> usize {
        self.high_priority_count
    }

    pub fn is_empty(&self) -> bool {
        self.recommendations.is_empty()
    }
}
