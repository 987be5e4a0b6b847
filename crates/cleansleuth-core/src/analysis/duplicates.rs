/// Duplicate file detection: size bucketing, then full-content hashing.
///
/// 1. **Size buckets.** One walk groups regular files by exact byte length,
///    applying the size filters and pruning excluded directories (VCS
///    metadata, trash, well-known caches). Hidden entries and symlinks are
///    skipped. Buckets with a single member cannot contain duplicates and
///    are dropped before any file is opened.
/// 2. **Content hash.** Every file in a surviving bucket is hashed over its
///    entire content with BLAKE3 on the shared pool. Workers hash first and
///    only then take the mutex on the hash → files map, so no lock is ever
///    held across I/O.
///
/// A hash match on a surviving size collision is treated as byte equality.
/// Groups are sorted by wasted size and capped; members are ordered oldest
/// first so index 0 is the default copy to keep.
use crate::error::Result;
use crate::model::{
    display_name, to_utc, DuplicateFile, DuplicateGroup, DuplicatesResult, ScanMode,
};
use crate::scanner::progress::{ProgressEvent, ProgressSink};
use crate::scanner::{require_directory, CancelToken, ScanOutcome, CANCEL_CHECK_INTERVAL};
use compact_str::CompactString;
use globset::{Glob, GlobSet, GlobSetBuilder};
use parking_lot::Mutex;
use rayon::prelude::*;
use rayon::ThreadPool;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime};
use tracing::{debug, info, trace, warn};

/// Directory names pruned from duplicate searches by default.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    ".git",
    ".svn",
    ".hg",
    ".Trash",
    ".Trashes",
    "$RECYCLE.BIN",
    "node_modules",
    ".cache",
    "__pycache__",
    ".gradle",
];

/// Files hashed between two progress events.
const HASH_PROGRESS_INTERVAL: u64 = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DuplicateOptions {
    /// Smallest file considered, in bytes. Empty files are never duplicates
    /// worth reporting, so values below 1 are treated as 1.
    pub min_size: u64,
    pub max_size: Option<u64>,
    /// Glob patterns matched against entry names and full paths.
    pub exclude: Vec<String>,
    /// Cap on returned groups (largest waste first).
    pub max_groups: Option<usize>,
}

impl Default for DuplicateOptions {
    fn default() -> Self {
        Self {
            min_size: 1,
            max_size: None,
            exclude: DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect(),
            max_groups: None,
        }
    }
}

impl DuplicateOptions {
    fn accepts(&self, size: u64) -> bool {
        size >= self.min_size.max(1) && self.max_size.map_or(true, |max| size <= max)
    }
}

/// Compiled exclusion patterns.
#[derive(Debug, Clone)]
pub struct Excludes(GlobSet);

impl Excludes {
    pub fn new(patterns: &[String]) -> Self {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            match Glob::new(pattern) {
                Ok(glob) => {
                    builder.add(glob);
                }
                Err(err) => warn!("Ignoring invalid exclude pattern '{pattern}': {err}"),
            }
        }
        Self(builder.build().unwrap_or_else(|_| GlobSet::empty()))
    }

    pub fn is_excluded(&self, path: &Path) -> bool {
        path.file_name().is_some_and(|name| self.0.is_match(name)) || self.0.is_match(path)
    }
}

/// A Phase 1 candidate.
#[derive(Debug, Clone)]
struct Candidate {
    path: PathBuf,
    modified: Option<SystemTime>,
}

pub struct DuplicateDetector {
    pool: Arc<ThreadPool>,
}

impl DuplicateDetector {
    pub fn new(pool: Arc<ThreadPool>) -> Self {
        Self { pool }
    }

    /// Find duplicate files under `root`. Fails only if `root` is missing or
    /// not a directory.
    pub fn find_duplicates(
        &self,
        root: &Path,
        options: &DuplicateOptions,
        cancel: &CancelToken,
        progress: &dyn ProgressSink,
    ) -> Result<ScanOutcome<DuplicatesResult>> {
        require_directory(root)?;

        let start = Instant::now();
        info!("Duplicate search under {}", root.display());

        let excludes = Excludes::new(&options.exclude);
        let (buckets, files_scanned, walk_cancelled) =
            bucket_by_size(root, options, &excludes, cancel, progress);
        debug!(
            "Size bucketing: {} files, {} colliding sizes in {:?}",
            files_scanned,
            buckets.len(),
            start.elapsed()
        );
        if walk_cancelled {
            return Ok(ScanOutcome::Cancelled(DuplicatesResult {
                files_scanned,
                duration_ms: start.elapsed().as_millis() as u64,
                ..Default::default()
            }));
        }

        let candidates: Vec<(u64, Candidate)> = buckets
            .into_iter()
            .flat_map(|(size, files)| files.into_iter().map(move |c| (size, c)))
            .collect();
        let total = candidates.len() as u64;

        let by_hash: Mutex<HashMap<String, Vec<DuplicateFile>>> = Mutex::new(HashMap::new());
        let hashed = AtomicU64::new(0);
        let bytes_hashed = AtomicU64::new(0);
        let truncated = AtomicBool::new(false);

        self.pool.install(|| {
            candidates.par_iter().for_each(|(size, candidate)| {
                if cancel.is_cancelled() {
                    truncated.store(true, Ordering::Relaxed);
                    return;
                }
                let hash = match hash_file(&candidate.path) {
                    Ok(hash) => hash,
                    Err(err) => {
                        trace!("hash: skipping {}: {err}", candidate.path.display());
                        return;
                    }
                };
                let file = DuplicateFile {
                    path: candidate.path.clone(),
                    name: CompactString::new(display_name(&candidate.path)),
                    size: *size,
                    modified: candidate.modified.map(to_utc),
                    hash: hash.clone(),
                };
                by_hash.lock().entry(hash).or_default().push(file);

                let bytes = bytes_hashed.fetch_add(*size, Ordering::Relaxed) + size;
                let done = hashed.fetch_add(1, Ordering::Relaxed) + 1;
                if done % HASH_PROGRESS_INTERVAL == 0 || done == total {
                    progress.emit(ProgressEvent::ScanProgress {
                        mode: ScanMode::Duplicates,
                        completed: done,
                        total: Some(total),
                        bytes_scanned: bytes,
                        current_path: candidate.path.to_string_lossy().into_owned(),
                    });
                }
            });
        });

        let mut groups: Vec<DuplicateGroup> = by_hash
            .into_inner()
            .into_iter()
            .filter(|(_, files)| files.len() >= 2)
            .map(|(hash, files)| {
                let size = files[0].size;
                DuplicateGroup::new(hash, size, files)
            })
            .collect();
        groups.sort_by(|a, b| {
            b.wasted_size
                .cmp(&a.wasted_size)
                .then_with(|| a.hash.cmp(&b.hash))
        });

        let total_groups = groups.len();
        let total_wasted = groups.iter().map(|g| g.wasted_size).sum();
        if let Some(cap) = options.max_groups {
            groups.truncate(cap);
        }

        let duration = start.elapsed();
        info!(
            "Duplicate search found {total_groups} groups wasting {total_wasted} bytes in {duration:?}"
        );
        let result = DuplicatesResult {
            groups,
            total_groups,
            total_wasted,
            files_scanned,
            files_hashed: hashed.load(Ordering::Relaxed),
            duration_ms: duration.as_millis() as u64,
        };
        Ok(if truncated.load(Ordering::Relaxed) {
            ScanOutcome::Cancelled(result)
        } else {
            ScanOutcome::Completed(result)
        })
    }
}

/// Phase 1. Returns colliding buckets only, the number of files considered,
/// and whether the walk was cancelled.
fn bucket_by_size(
    root: &Path,
    options: &DuplicateOptions,
    excludes: &Excludes,
    cancel: &CancelToken,
    progress: &dyn ProgressSink,
) -> (HashMap<u64, Vec<Candidate>>, u64, bool) {
    let mut buckets: HashMap<u64, Vec<Candidate>> = HashMap::new();
    let mut files_scanned: u64 = 0;
    let mut visited: u64 = 0;

    let prune = excludes.clone();
    let dir_cancel = cancel.clone();
    let walker = jwalk::WalkDir::new(root)
        .skip_hidden(true)
        .follow_links(false)
        .parallelism(jwalk::Parallelism::Serial)
        .process_read_dir(move |depth, _path, _state, children| {
            if dir_cancel.is_cancelled() {
                children.clear();
                return;
            }
            if depth.is_none() {
                return;
            }
            children.retain(|entry| match entry {
                Ok(entry) => !prune.is_excluded(&entry.path()),
                Err(_) => true,
            });
        });

    for entry_result in walker {
        visited += 1;
        if visited % CANCEL_CHECK_INTERVAL == 0 {
            if cancel.is_cancelled() {
                return (HashMap::new(), files_scanned, true);
            }
            progress.emit(ProgressEvent::ScanProgress {
                mode: ScanMode::Duplicates,
                completed: files_scanned,
                total: None,
                bytes_scanned: 0,
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
        if !options.accepts(size) {
            continue;
        }
        files_scanned += 1;
        buckets.entry(size).or_default().push(Candidate {
            path,
            modified: meta.modified().ok(),
        });
    }

    if cancel.is_cancelled() {
        return (HashMap::new(), files_scanned, true);
    }
    buckets.retain(|_, files| files.len() > 1);
    (buckets, files_scanned, false)
}

/// Hex BLAKE3 digest of a file's entire content.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hasher.finalize().to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_filter_empty_files() {
        let options = DuplicateOptions::default();
        assert!(!options.accepts(0));
        assert!(options.accepts(1));

        let bounded = DuplicateOptions {
            min_size: 10,
            max_size: Some(20),
            ..Default::default()
        };
        assert!(!bounded.accepts(9));
        assert!(bounded.accepts(20));
        assert!(!bounded.accepts(21));
    }

    #[test]
    fn excludes_match_names_and_paths() {
        let excludes = Excludes::new(&["node_modules".into(), "*.tmp".into(), "[".into()]);
        assert!(excludes.is_excluded(Path::new("/p/node_modules")));
        assert!(excludes.is_excluded(Path::new("/p/x.tmp")));
        assert!(!excludes.is_excluded(Path::new("/p/src")));
    }

    #[test]
    fn hash_is_content_addressed() {
        let tmp = tempfile::TempDir::new().unwrap();
        let a = tmp.path().join("a");
        let b = tmp.path().join("b");
        let c = tmp.path().join("c");
        fs::write(&a, b"same bytes").unwrap();
        fs::write(&b, b"same bytes").unwrap();
        fs::write(&c, b"diff bytes").unwrap();

        assert_eq!(hash_file(&a).unwrap(), hash_file(&b).unwrap());
        assert_ne!(hash_file(&a).unwrap(), hash_file(&c).unwrap());
        assert_eq!(hash_file(&a).unwrap().len(), 64);
    }
}
