/// Dependency directory discovery.
///
/// Finds regenerable per-project directories (`node_modules`, Cargo
/// `target`, Python virtualenvs, CocoaPods `Pods`, `.dart_tool`) under a
/// root. Discovery is a depth-limited serial walk that never descends into a
/// match or into other hidden directories; each match is then sized by the
/// walker as a task on the shared pool.
use crate::error::Result;
use crate::model::{to_utc, ScanMode};
use crate::scanner::progress::{ProgressEvent, ProgressSink};
use crate::scanner::walker;
use crate::scanner::{require_directory, CancelToken, ScanOutcome, CANCEL_CHECK_INTERVAL};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use rayon::ThreadPool;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info};

/// Default discovery depth below the root.
pub const DEFAULT_DISCOVERY_DEPTH: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    NodeModules,
    CargoTarget,
    PythonVenv,
    CocoaPods,
    DartTool,
}

impl DependencyKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::NodeModules => "node_modules",
            Self::CargoTarget => "Cargo target",
            Self::PythonVenv => "Python virtualenv",
            Self::CocoaPods => "CocoaPods",
            Self::DartTool => "Dart tool cache",
        }
    }

    /// Classify directory `dir` (a child of `parent`), if it is a dependency
    /// directory.
    pub fn classify(parent: &Path, dir: &Path) -> Option<Self> {
        let name = dir.file_name()?.to_str()?;
        match name {
            "node_modules" => Some(Self::NodeModules),
            ".dart_tool" => Some(Self::DartTool),
            "target" if parent.join("Cargo.toml").is_file() => Some(Self::CargoTarget),
            "Pods" if parent.join("Podfile").is_file() => Some(Self::CocoaPods),
            ".venv" | "venv" if dir.join("pyvenv.cfg").is_file() => Some(Self::PythonVenv),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyDir {
    pub path: PathBuf,
    pub kind: DependencyKind,
    /// The project the directory belongs to.
    pub project_path: PathBuf,
    pub size: u64,
    pub item_count: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyDirsResult {
    /// Largest first.
    pub dirs: Vec<DependencyDir>,
    pub total_size: u64,
    pub duration_ms: u64,
}

impl DependencyDirsResult {
    /// Directories whose newest entry is at least `days` old at `now`.
    pub fn untouched_for(
        &self,
        days: i64,
        now: DateTime<Utc>,
    ) -> impl Iterator<Item = &DependencyDir> {
        let cutoff = now - chrono::Duration::days(days);
        self.dirs
            .iter()
            .filter(move |d| d.last_modified.is_some_and(|m| m <= cutoff))
    }
}

/// Discover and size dependency directories under `root`, at most
/// `max_depth` levels deep.
pub fn find_dependency_dirs(
    root: &Path,
    max_depth: usize,
    pool: &ThreadPool,
    cancel: &CancelToken,
    progress: &dyn ProgressSink,
) -> Result<ScanOutcome<DependencyDirsResult>> {
    require_directory(root)?;
    let start = Instant::now();
    info!("Dependency discovery under {} (depth {max_depth})", root.display());

    let (found, discovery_cancelled) = discover(root, max_depth, cancel);
    debug!("Discovered {} dependency dirs in {:?}", found.len(), start.elapsed());

    let total = found.len() as u64;
    let bytes_scanned = AtomicU64::new(0);
    let completed = AtomicU64::new(0);
    let truncated = AtomicBool::new(discovery_cancelled);

    let mut dirs: Vec<DependencyDir> = pool.install(|| {
        found
            .into_par_iter()
            .filter_map(|(path, kind)| {
                if cancel.is_cancelled() {
                    truncated.store(true, Ordering::Relaxed);
                    return None;
                }
                let totals = match walker::walk(&path, cancel) {
                    ScanOutcome::Completed(totals) => totals,
                    ScanOutcome::Cancelled(totals) => {
                        truncated.store(true, Ordering::Relaxed);
                        totals
                    }
                };
                let bytes =
                    bytes_scanned.fetch_add(totals.size, Ordering::Relaxed) + totals.size;
                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                progress.emit(ProgressEvent::ScanProgress {
                    mode: ScanMode::DependencyDirs,
                    completed: done,
                    total: Some(total),
                    bytes_scanned: bytes,
                    current_path: path.to_string_lossy().into_owned(),
                });
                let project_path = path.parent().map(Path::to_path_buf).unwrap_or_default();
                Some(DependencyDir {
                    project_path,
                    kind,
                    size: totals.size,
                    item_count: totals.items(),
                    last_modified: totals.newest.map(to_utc),
                    path,
                })
            })
            .collect()
    });
    dirs.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.path.cmp(&b.path)));

    let result = DependencyDirsResult {
        total_size: dirs.iter().map(|d| d.size).sum(),
        dirs,
        duration_ms: start.elapsed().as_millis() as u64,
    };
    Ok(if truncated.load(Ordering::Relaxed) {
        ScanOutcome::Cancelled(result)
    } else {
        ScanOutcome::Completed(result)
    })
}

/// Depth-limited walk that stops at every match.
fn discover(
    root: &Path,
    max_depth: usize,
    cancel: &CancelToken,
) -> (Vec<(PathBuf, DependencyKind)>, bool) {
    let dir_cancel = cancel.clone();
    let entries = jwalk::WalkDir::new(root)
        .skip_hidden(false)
        .follow_links(false)
        .max_depth(max_depth)
        .parallelism(jwalk::Parallelism::Serial)
        .process_read_dir(move |depth, parent, _state, children| {
            if dir_cancel.is_cancelled() {
                children.clear();
                return;
            }
            // The root itself arrives with no depth and is always walked.
            if depth.is_none() {
                return;
            }
            for entry in children.iter_mut().flatten() {
                if !entry.file_type.is_dir() {
                    continue;
                }
                let path = entry.path();
                let hidden = entry.file_name.to_str().is_some_and(|n| n.starts_with('.'));
                if hidden || DependencyKind::classify(parent, &path).is_some() {
                    entry.read_children_path = None;
                }
            }
        });

    let mut found = Vec::new();
    let mut visited: u64 = 0;
    for entry_result in entries {
        visited += 1;
        if visited % CANCEL_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
            return (found, true);
        }
        let Ok(entry) = entry_result else { continue };
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            continue;
        }
        let path = entry.path();
        let Some(parent) = path.parent() else { continue };
        if let Some(kind) = DependencyKind::classify(parent, &path) {
            found.push((path, kind));
        }
    }
    let cancelled = cancel.is_cancelled();
    (found, cancelled)
}
