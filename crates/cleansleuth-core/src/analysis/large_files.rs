/// Largest individual files under a root.
///
/// One serial walk collects every regular file at or above the threshold;
/// the top `max_results` are then picked with a partial select before the
/// final sort, so the cost is dominated by the walk, not by ordering.
use crate::error::Result;
use crate::model::{display_name, to_utc, ScanMode};
use crate::scanner::progress::{ProgressEvent, ProgressSink};
use crate::scanner::{require_directory, CancelToken, ScanOutcome, CANCEL_CHECK_INTERVAL};
use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Default cap on returned files.
pub const DEFAULT_MAX_LARGE_FILES: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LargeFile {
    pub path: PathBuf,
    pub name: CompactString,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LargeFilesResult {
    /// Largest first, capped.
    pub files: Vec<LargeFile>,
    /// Size of every file at or above the threshold, before the cap.
    pub total_size: u64,
    /// Files at or above the threshold, before the cap.
    pub total_count: u64,
    pub threshold: u64,
    pub duration_ms: u64,
}

/// Find files of at least `min_size` bytes under `root`, largest first.
///
/// Returns an empty result immediately when `max_results == 0`.
pub fn find_large_files(
    root: &Path,
    min_size: u64,
    max_results: usize,
    cancel: &CancelToken,
    progress: &dyn ProgressSink,
) -> Result<ScanOutcome<LargeFilesResult>> {
    require_directory(root)?;
    let start = Instant::now();
    let mut result = LargeFilesResult {
        threshold: min_size,
        ..Default::default()
    };
    if max_results == 0 {
        return Ok(ScanOutcome::Completed(result));
    }
    info!(
        "Large-file search under {} (>= {min_size} bytes)",
        root.display()
    );

    let dir_cancel = cancel.clone();
    let walker = jwalk::WalkDir::new(root)
        .skip_hidden(false)
        .follow_links(false)
        .parallelism(jwalk::Parallelism::Serial)
        .process_read_dir(move |_depth, _path, _state, children| {
            if dir_cancel.is_cancelled() {
                children.clear();
            }
        });

    let mut found: Vec<LargeFile> = Vec::new();
    let mut visited: u64 = 0;
    let mut cancelled = false;
    for entry_result in walker {
        visited += 1;
        if visited % CANCEL_CHECK_INTERVAL == 0 {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            progress.emit(ProgressEvent::ScanProgress {
                mode: ScanMode::LargeFiles,
                completed: visited,
                total: None,
                bytes_scanned: result.total_size,
                current_path: root.to_string_lossy().into_owned(),
            });
        }

        let Ok(entry) = entry_result else { continue };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Ok(meta) = fs::symlink_metadata(&path) else { continue };
        let size = meta.len();
        if size < min_size {
            continue;
        }
        result.total_size += size;
        result.total_count += 1;
        found.push(LargeFile {
            name: CompactString::new(display_name(&path)),
            path,
            size,
            modified: meta.modified().ok().map(to_utc),
        });
    }

    cancelled |= cancel.is_cancelled();
    if found.len() > max_results {
        found.select_nth_unstable_by(max_results - 1, |a, b| b.size.cmp(&a.size));
        found.truncate(max_results);
    }
    found.sort_unstable_by(|a, b| b.size.cmp(&a.size).then_with(|| a.path.cmp(&b.path)));
    result.files = found;
    result.duration_ms = start.elapsed().as_millis() as u64;

    debug!(
        "Large-file search: {} matches, {} bytes in {:?}",
        result.total_count,
        result.total_size,
        start.elapsed()
    );
    Ok(if cancelled {
        ScanOutcome::Cancelled(result)
    } else {
        ScanOutcome::Completed(result)
    })
}
