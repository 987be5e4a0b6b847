/// Recommendation rules.
///
/// Pure function of whatever results are available: the latest completed
/// dev scan, trends, and the most recent duplicate, large-file, and
/// dependency-directory searches. Missing inputs simply produce no
/// recommendations of that kind.
use super::dependencies::DependencyDirsResult;
use super::large_files::LargeFilesResult;
use crate::model::size::{format_rate, format_size, GIB, MIB};
use crate::model::{
    Category, DevScanResult, DuplicatesResult, Recommendation, RecommendationKind,
    RecommendationsResult, TrendsResult,
};
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};

pub const LARGE_CATEGORY_MIN: u64 = GIB;
pub const QUICK_WIN_MIN: u64 = 100 * MIB;
pub const FAST_GROWTH_MIN_PER_DAY: f64 = (100 * MIB) as f64;
pub const STALE_CACHE_MIN: u64 = 100 * MIB;
pub const STALE_CACHE_DAYS: i64 = 90;
pub const DUPLICATE_WASTE_MIN: u64 = 100 * MIB;
pub const LARGE_FILES_MIN: u64 = GIB;
pub const DEPENDENCY_DIRS_MIN: u64 = 500 * MIB;
pub const DEPENDENCY_IDLE_DAYS: i64 = 30;

/// Everything the rules can look at.
#[derive(Debug, Clone, Copy)]
pub struct RecommendationInputs<'a> {
    pub dev_scan: Option<&'a DevScanResult>,
    pub trends: Option<&'a TrendsResult>,
    pub duplicates: Option<&'a DuplicatesResult>,
    pub large_files: Option<&'a LargeFilesResult>,
    pub dependency_dirs: Option<&'a DependencyDirsResult>,
    pub now: DateTime<Utc>,
}

impl<'a> RecommendationInputs<'a> {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            dev_scan: None,
            trends: None,
            duplicates: None,
            large_files: None,
            dependency_dirs: None,
            now,
        }
    }
}

pub fn recommend(inputs: &RecommendationInputs<'_>) -> RecommendationsResult {
    let mut out = Vec::new();

    if let Some(scan) = inputs.dev_scan {
        for category in &scan.categories {
            if let Some(rec) = category_recommendation(category, inputs.now) {
                out.push(rec);
            }
        }
    }

    if let Some(trends) = inputs.trends {
        // Ids whose bytes are already claimed by a size-based entry.
        let sized: HashSet<String> = out.iter().filter_map(|r| r.category_id.clone()).collect();
        let parents: HashMap<&str, &str> = inputs
            .dev_scan
            .map(|scan| {
                scan.categories
                    .iter()
                    .flat_map(|p| p.children.iter().map(move |c| (c.id.as_str(), p.id.as_str())))
                    .collect()
            })
            .unwrap_or_default();
        let fast: HashSet<&str> = trends
            .trends
            .iter()
            .filter(|t| t.growth_rate >= FAST_GROWTH_MIN_PER_DAY)
            .map(|t| t.category_id.as_str())
            .collect();

        for trend in &trends.trends {
            let id = trend.category_id.as_str();
            if !fast.contains(id) || sized.contains(id) {
                continue;
            }
            // A qualifying group already covers its children.
            if parents
                .get(id)
                .is_some_and(|parent| fast.contains(parent) || sized.contains(*parent))
            {
                continue;
            }
            let name = inputs
                .dev_scan
                .and_then(|s| s.find(&trend.category_id))
                .map(|c| c.name.clone())
                .unwrap_or_else(|| trend.category_id.clone());
            out.push(Recommendation {
                kind: RecommendationKind::FastGrowing,
                title: format!("{name} is growing fast"),
                description: format!(
                    "{name} grows {} on average; consider cleaning it regularly.",
                    format_rate(trend.growth_rate)
                ),
                size: trend.latest_size(),
                priority: 75,
                category_id: Some(trend.category_id.clone()),
                paths: Vec::new(),
            });
        }
    }

    if let Some(dupes) = inputs.duplicates {
        // Only the listed groups; a capped search reports more in total.
        let listed: u64 = dupes.groups.iter().map(|g| g.wasted_size).sum();
        if listed >= DUPLICATE_WASTE_MIN {
            let paths = dupes
                .groups
                .iter()
                .flat_map(|g| g.removal_paths(0))
                .collect();
            let mut description = format!(
                "{} groups of identical files waste {}. The oldest copy of each is kept.",
                dupes.groups.len(),
                format_size(listed)
            );
            if dupes.total_groups > dupes.groups.len() {
                description.push_str(&format!(
                    " {} groups wasting {} were found in total.",
                    dupes.total_groups,
                    format_size(dupes.total_wasted)
                ));
            }
            out.push(Recommendation {
                kind: RecommendationKind::DuplicateCluster,
                title: "Remove duplicate files".into(),
                description,
                size: listed,
                priority: 65,
                category_id: None,
                paths,
            });
        }
    }

    if let Some(large) = inputs.large_files {
        let total: u64 = large.files.iter().map(|f| f.size).sum();
        if total >= LARGE_FILES_MIN {
            out.push(Recommendation {
                kind: RecommendationKind::LargeFiles,
                title: "Review large files".into(),
                description: format!(
                    "{} files take {}. Archive or delete the ones you no longer need.",
                    large.files.len(),
                    format_size(total)
                ),
                size: total,
                priority: 45,
                category_id: None,
                paths: large.files.iter().map(|f| f.path.clone()).collect(),
            });
        }
    }

    if let Some(deps) = inputs.dependency_dirs {
        let idle: Vec<_> = deps
            .untouched_for(DEPENDENCY_IDLE_DAYS, inputs.now)
            .collect();
        let total: u64 = idle.iter().map(|d| d.size).sum();
        if total >= DEPENDENCY_DIRS_MIN {
            out.push(Recommendation {
                kind: RecommendationKind::DependencyDirs,
                title: "Remove unused dependency directories".into(),
                description: format!(
                    "{} dependency directories untouched for {DEPENDENCY_IDLE_DAYS}+ days take {}. \
                     They are rebuilt on the next install or build.",
                    idle.len(),
                    format_size(total)
                ),
                size: total,
                priority: 55,
                category_id: None,
                paths: idle.iter().map(|d| d.path.clone()).collect(),
            });
        }
    }

    RecommendationsResult::new(out)
}

/// At most one of large / stale / quick-win per top-level category.
fn category_recommendation(category: &Category, now: DateTime<Utc>) -> Option<Recommendation> {
    let size = category.size;
    let name = &category.name;
    let (kind, priority, title, description) = if size >= LARGE_CATEGORY_MIN {
        let priority = if size >= 10 * GIB {
            90
        } else if size >= 5 * GIB {
            80
        } else {
            70
        };
        (
            RecommendationKind::LargeCategory,
            priority,
            format!("Clean {name}"),
            format!("{name} uses {}.", format_size(size)),
        )
    } else if size >= STALE_CACHE_MIN && is_stale(category, now) {
        (
            RecommendationKind::StaleCache,
            60,
            format!("{name} looks stale"),
            format!(
                "{name} ({}) has not changed in over {STALE_CACHE_DAYS} days.",
                format_size(size)
            ),
        )
    } else if size >= QUICK_WIN_MIN {
        (
            RecommendationKind::QuickWin,
            50,
            format!("Quick win: {name}"),
            format!("Cleaning {name} frees {} with little risk.", format_size(size)),
        )
    } else {
        return None;
    };
    Some(Recommendation {
        kind,
        title,
        description,
        size,
        priority,
        category_id: Some(category.id.clone()),
        paths: Vec::new(),
    })
}

fn is_stale(category: &Category, now: DateTime<Utc>) -> bool {
    category
        .last_modified
        .is_some_and(|m| now - m >= Duration::days(STALE_CACHE_DAYS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::dependencies::{DependencyDir, DependencyKind};
    use crate::model::{DiskUsageTrend, DuplicateFile, DuplicateGroup, ScanMode, TrendPoint};
    use std::path::PathBuf;

    fn category(id: &str, size: u64, last_modified: Option<DateTime<Utc>>) -> Category {
        Category {
            id: id.into(),
            name: id.into(),
            icon: String::new(),
            color: String::new(),
            paths: Vec::new(),
            size,
            item_count: 1,
            last_modified,
            children: Vec::new(),
            selected: false,
        }
    }

    fn kinds(result: &RecommendationsResult) -> Vec<(RecommendationKind, u8)> {
        result
            .recommendations()
            .iter()
            .map(|r| (r.kind, r.priority))
            .collect()
    }

    #[test]
    fn category_thresholds() {
        let now = Utc::now();
        let old = Some(now - Duration::days(200));
        let scan = DevScanResult::new(
            ScanMode::Dev,
            vec![
                category("huge", 12 * GIB, Some(now)),
                category("big", 6 * GIB, Some(now)),
                category("large", 2 * GIB, old),
                category("stale", 200 * MIB, old),
                category("quick", 200 * MIB, Some(now)),
                category("small", MIB, old),
            ],
            0,
        );
        let mut inputs = RecommendationInputs::new(now);
        inputs.dev_scan = Some(&scan);
        let result = recommend(&inputs);

        assert_eq!(
            kinds(&result),
            vec![
                (RecommendationKind::LargeCategory, 90),
                (RecommendationKind::LargeCategory, 80),
                (RecommendationKind::LargeCategory, 70),
                (RecommendationKind::StaleCache, 60),
                (RecommendationKind::QuickWin, 50),
            ]
        );
        assert_eq!(result.high_priority_count(), 3);
        assert_eq!(
            result.total_savings(),
            12 * GIB + 6 * GIB + 2 * GIB + 400 * MIB
        );
    }

    #[test]
    fn fast_growth_and_duplicates() {
        let now = Utc::now();
        let trend = DiskUsageTrend::from_points(
            "npm",
            vec![
                TrendPoint { timestamp: now - Duration::days(2), size: 0 },
                TrendPoint { timestamp: now, size: 400 * MIB },
            ],
        );
        let slow = DiskUsageTrend::from_points("pip", Vec::new());
        let trends = TrendsResult {
            trends: vec![trend, slow],
            total: DiskUsageTrend::from_points("total", Vec::new()),
            snapshot_count: 2,
            first_snapshot: None,
            last_snapshot: None,
        };

        let file = |p: &str| DuplicateFile {
            path: PathBuf::from(p),
            name: p.into(),
            size: 150 * MIB,
            modified: None,
            hash: "h".into(),
        };
        let group = DuplicateGroup::new("h".into(), 150 * MIB, vec![file("/a"), file("/b")]);
        let dupes = DuplicatesResult {
            total_groups: 1,
            total_wasted: group.wasted_size,
            groups: vec![group],
            ..Default::default()
        };

        let mut inputs = RecommendationInputs::new(now);
        inputs.trends = Some(&trends);
        inputs.duplicates = Some(&dupes);
        let result = recommend(&inputs);

        assert_eq!(
            kinds(&result),
            vec![
                (RecommendationKind::FastGrowing, 75),
                (RecommendationKind::DuplicateCluster, 65),
            ]
        );
        let cluster = &result.recommendations()[1];
        assert_eq!(cluster.paths, vec![PathBuf::from("/b")]);
    }

    fn growing(id: &str, now: DateTime<Utc>) -> DiskUsageTrend {
        DiskUsageTrend::from_points(
            id,
            vec![
                TrendPoint { timestamp: now - Duration::days(2), size: 0 },
                TrendPoint { timestamp: now, size: 400 * MIB },
            ],
        )
    }

    fn trends_of(trends: Vec<DiskUsageTrend>) -> TrendsResult {
        TrendsResult {
            trends,
            total: DiskUsageTrend::from_points("total", Vec::new()),
            snapshot_count: 2,
            first_snapshot: None,
            last_snapshot: None,
        }
    }

    #[test]
    fn growth_is_reported_once_per_category() {
        let now = Utc::now();
        let mut go = category("go", MIB, Some(now));
        go.children = vec![category("go-mod", MIB, Some(now))];
        let scan = DevScanResult::new(
            ScanMode::Dev,
            vec![go, category("docker", 2 * GIB, Some(now))],
            0,
        );
        let trends = trends_of(vec![
            growing("go-mod", now),
            growing("go", now),
            growing("docker", now),
        ]);

        let mut inputs = RecommendationInputs::new(now);
        inputs.dev_scan = Some(&scan);
        inputs.trends = Some(&trends);
        let result = recommend(&inputs);

        let ids: Vec<_> = result
            .recommendations()
            .iter()
            .map(|r| (r.kind, r.category_id.as_deref().unwrap_or("")))
            .collect();
        assert_eq!(
            ids,
            vec![
                (RecommendationKind::FastGrowing, "go"),
                (RecommendationKind::LargeCategory, "docker"),
            ]
        );
        assert_eq!(result.total_savings(), 400 * MIB + 2 * GIB);
    }

    #[test]
    fn duplicate_savings_cover_listed_groups_only() {
        let file = |p: &str| DuplicateFile {
            path: PathBuf::from(p),
            name: p.into(),
            size: 150 * MIB,
            modified: None,
            hash: "h".into(),
        };
        let group = DuplicateGroup::new("h".into(), 150 * MIB, vec![file("/a"), file("/b")]);
        let dupes = DuplicatesResult {
            total_groups: 40,
            total_wasted: 20 * GIB,
            groups: vec![group],
            ..Default::default()
        };

        let mut inputs = RecommendationInputs::new(Utc::now());
        inputs.duplicates = Some(&dupes);
        let result = recommend(&inputs);

        let rec = &result.recommendations()[0];
        assert_eq!(rec.kind, RecommendationKind::DuplicateCluster);
        assert_eq!(rec.size, 150 * MIB);
        assert_eq!(rec.paths, vec![PathBuf::from("/b")]);
        assert_eq!(result.total_savings(), 150 * MIB);
    }

    #[test]
    fn only_idle_dependency_dirs_count() {
        let now = Utc::now();
        let dir = |p: &str, size: u64, days: i64| DependencyDir {
            path: PathBuf::from(p),
            kind: DependencyKind::NodeModules,
            project_path: PathBuf::from("/p"),
            size,
            item_count: 1,
            last_modified: Some(now - Duration::days(days)),
        };
        let deps = DependencyDirsResult {
            dirs: vec![dir("/old", 600 * MIB, 45), dir("/fresh", GIB, 1)],
            total_size: 600 * MIB + GIB,
            duration_ms: 0,
        };
        let mut inputs = RecommendationInputs::new(now);
        inputs.dependency_dirs = Some(&deps);
        let result = recommend(&inputs);

        let rec = &result.recommendations()[0];
        assert_eq!(rec.kind, RecommendationKind::DependencyDirs);
        assert_eq!(rec.size, 600 * MIB);
        assert_eq!(rec.paths, vec![PathBuf::from("/old")]);
    }

    #[test]
    fn no_inputs_no_recommendations() {
        assert!(recommend(&RecommendationInputs::new(Utc::now())).is_empty());
    }
}
