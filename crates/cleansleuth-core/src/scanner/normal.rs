/// Normal scanner: one directory level at a time, with full recursive sizes.
///
/// Listing a directory stats its immediate children; every child directory
/// is then sized by the walker as an independent task on the shared pool.
/// Only that one level is kept in memory, so drilling through a huge tree
/// costs one listing per level visited rather than a full in-memory index.
/// Children come back sorted by size descending; callers may rely on it.
use super::progress::{ProgressEvent, ProgressSink};
use super::walker::{self, allocated_size};
use super::{require_directory, CancelToken, ScanOutcome};
use crate::error::Result;
use crate::model::file_node::sort_by_size_desc;
use crate::model::{display_name, to_utc, FileNode, FullScanResult, ScanMode};
use chrono::Utc;
use compact_str::CompactString;
use rayon::prelude::*;
use rayon::ThreadPool;
use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, trace};

pub struct NormalScanner {
    pool: Arc<ThreadPool>,
}

impl NormalScanner {
    pub fn new(pool: Arc<ThreadPool>) -> Self {
        Self { pool }
    }

    /// Scan `root`: the root node plus its immediate children, each child
    /// carrying its full recursive size.
    ///
    /// Fails only when `root` itself is missing, not a directory, or cannot
    /// be listed.
    pub fn scan_path(
        &self,
        root: &Path,
        cancel: &CancelToken,
        progress: &dyn ProgressSink,
    ) -> Result<ScanOutcome<FullScanResult>> {
        let start = Instant::now();
        info!("Normal scan of {}", root.display());
        let root_meta = require_directory(root)?;

        let outcome = self.list_level(root, cancel, progress)?;
        let cancelled = outcome.is_cancelled();
        let mut node = FileNode::new_dir(
            CompactString::new(display_name(root)),
            root.to_path_buf(),
            0,
            0,
            root_meta.modified().ok().map(to_utc),
        );
        node.set_children(outcome.into_inner());

        let duration = start.elapsed();
        debug!(
            "Normal scan of {} finished in {duration:?}: {} bytes",
            root.display(),
            node.size
        );
        let result = FullScanResult {
            total_size: node.size,
            total_items: node.item_count,
            root: node,
            scanned_at: Utc::now(),
            duration_ms: duration.as_millis() as u64,
        };
        Ok(if cancelled {
            ScanOutcome::Cancelled(result)
        } else {
            ScanOutcome::Completed(result)
        })
    }

    /// List the children of any directory for lazy drill-down, sorted by
    /// size descending.
    pub fn directory_children(
        &self,
        path: &Path,
        cancel: &CancelToken,
        progress: &dyn ProgressSink,
    ) -> Result<ScanOutcome<Vec<FileNode>>> {
        require_directory(path)?;
        self.list_level(path, cancel, progress)
    }

    fn list_level(
        &self,
        dir: &Path,
        cancel: &CancelToken,
        progress: &dyn ProgressSink,
    ) -> Result<ScanOutcome<Vec<FileNode>>> {
        let mut files = Vec::new();
        let mut subdirs: Vec<(PathBuf, Metadata)> = Vec::new();

        for entry_result in fs::read_dir(dir)? {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(err) => {
                    trace!("list: skipping entry in {}: {err}", dir.display());
                    continue;
                }
            };
            let path = entry.path();
            let meta = match fs::symlink_metadata(&path) {
                Ok(meta) => meta,
                Err(err) => {
                    trace!("list: cannot stat {}: {err}", path.display());
                    continue;
                }
            };
            if meta.file_type().is_symlink() {
                continue;
            }
            if meta.is_dir() {
                subdirs.push((path, meta));
            } else {
                files.push(FileNode::new_file(
                    CompactString::new(display_name(&path)),
                    path,
                    allocated_size(&meta),
                    meta.modified().ok().map(to_utc),
                ));
            }
        }

        let total = subdirs.len() as u64;
        let bytes_scanned = AtomicU64::new(files.iter().map(|f| f.size).sum());
        let completed = AtomicU64::new(0);
        let truncated = AtomicBool::new(false);

        let dirs: Vec<FileNode> = self.pool.install(|| {
            subdirs
                .par_iter()
                .filter_map(|(path, meta)| {
                    if cancel.is_cancelled() {
                        truncated.store(true, Ordering::Relaxed);
                        return None;
                    }
                    let totals = match walker::walk(path, cancel) {
                        ScanOutcome::Completed(totals) => totals,
                        ScanOutcome::Cancelled(totals) => {
                            truncated.store(true, Ordering::Relaxed);
                            totals
                        }
                    };
                    let bytes = bytes_scanned.fetch_add(totals.size, Ordering::Relaxed)
                        + totals.size;
                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    progress.emit(ProgressEvent::ScanProgress {
                        mode: ScanMode::Normal,
                        completed: done,
                        total: Some(total),
                        bytes_scanned: bytes,
                        current_path: path.to_string_lossy().into_owned(),
                    });
                    Some(FileNode::new_dir(
                        CompactString::new(display_name(path)),
                        path.clone(),
                        totals.size,
                        totals.items(),
                        meta.modified().ok().map(to_utc),
                    ))
                })
                .collect()
        });

        let mut children = files;
        children.extend(dirs);
        sort_by_size_desc(&mut children);

        Ok(if truncated.load(Ordering::Relaxed) {
            ScanOutcome::Cancelled(children)
        } else {
            ScanOutcome::Completed(children)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::scanner::build_pool;
    use crate::scanner::progress::NoProgress;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_bytes(path: &Path, n: usize) {
        let mut f = fs::File::create(path).unwrap();
        f.write_all(&vec![3u8; n]).unwrap();
    }

    fn scanner() -> NormalScanner {
        NormalScanner::new(build_pool(2).unwrap())
    }

    #[test]
    fn root_equals_sum_of_children() {
        let tmp = TempDir::new().unwrap();
        let big = tmp.path().join("big");
        fs::create_dir(&big).unwrap();
        write_bytes(&big.join("x"), 64 * 1024);
        write_bytes(&tmp.path().join("small"), 10);

        let result = scanner()
            .scan_path(tmp.path(), &CancelToken::new(), &NoProgress)
            .unwrap()
            .completed()
            .unwrap();
        let children = result.root.children.as_ref().unwrap();

        assert_eq!(children.len(), 2);
        assert_eq!(children[0].name, "big");
        assert!(children[0].is_dir);
        assert_eq!(children[0].item_count, 1);
        assert_eq!(result.total_size, children.iter().map(|c| c.size).sum::<u64>());
        assert_eq!(result.total_items, 3);
    }

    #[test]
    fn missing_root_and_file_root_are_errors() {
        let tmp = TempDir::new().unwrap();
        let missing = scanner().scan_path(&tmp.path().join("nope"), &CancelToken::new(), &NoProgress);
        assert!(matches!(missing, Err(EngineError::PathNotFound(_))));

        let file = tmp.path().join("f");
        write_bytes(&file, 1);
        let not_dir = scanner().directory_children(&file, &CancelToken::new(), &NoProgress);
        assert!(matches!(not_dir, Err(EngineError::NotADirectory(_))));
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_children_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let real = tmp.path().join("real");
        fs::create_dir(&real).unwrap();
        write_bytes(&real.join("data"), 8_192);
        std::os::unix::fs::symlink(&real, tmp.path().join("link")).unwrap();
        std::os::unix::fs::symlink(tmp.path(), real.join("up")).unwrap();

        let children = scanner()
            .directory_children(tmp.path(), &CancelToken::new(), &NoProgress)
            .unwrap()
            .into_inner();
        let names: Vec<_> = children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["real"]);
    }
}
