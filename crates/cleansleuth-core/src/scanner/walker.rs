/// Directory walker: aggregate size and item count for one subtree.
///
/// Built on `jwalk` with serial parallelism: the caller decides where a walk
/// runs (usually one task on the shared rayon pool), so nested walks never
/// spawn their own threads.
///
/// # Accounting rules
///
/// - Sizes are **allocated** storage (`st_blocks × 512` on Unix), so sparse
///   files report what they actually occupy. Where block accounting is not
///   available the logical length is used.
/// - Symbolic links are detected with a non-following stat and skipped: they
///   contribute neither size nor count and are never descended, which rules
///   out cycles and double-counting of shared targets.
/// - A directory's own inode is not counted; its size is the sum of what is
///   below it.
/// - Unreadable entries are skipped silently.
use super::{CancelToken, ScanOutcome, CANCEL_CHECK_INTERVAL};
use std::fs::{self, Metadata};
use std::path::Path;
use std::time::SystemTime;
use tracing::trace;

/// Running totals for one walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkTotals {
    pub size: u64,
    pub files: u64,
    pub dirs: u64,
    /// Newest modification time of any entry, the root included.
    pub newest: Option<SystemTime>,
}

impl WalkTotals {
    /// Files plus directories below the root.
    pub fn items(&self) -> u64 {
        self.files + self.dirs
    }

    pub fn merge(&mut self, other: &WalkTotals) {
        self.size += other.size;
        self.files += other.files;
        self.dirs += other.dirs;
        self.newest = self.newest.max(other.newest);
    }

    fn touch(&mut self, meta: &Metadata) {
        if let Ok(modified) = meta.modified() {
            self.newest = self.newest.max(Some(modified));
        }
    }
}

/// Bytes `meta` occupies on disk.
#[cfg(unix)]
pub fn allocated_size(meta: &Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    meta.blocks() * 512
}

/// Bytes `meta` occupies on disk.
#[cfg(not(unix))]
pub fn allocated_size(meta: &Metadata) -> u64 {
    meta.len()
}

/// Walk `path` and total everything below it.
///
/// A regular file yields its own size with `files == 1`. A missing path or a
/// symlink yields zero totals. Cancellation is checked before each directory
/// is read and every [`CANCEL_CHECK_INTERVAL`] entries; on cancellation the
/// partial totals are returned as `Cancelled`.
pub fn walk(path: &Path, cancel: &CancelToken) -> ScanOutcome<WalkTotals> {
    let mut totals = WalkTotals::default();

    let root_meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(err) => {
            trace!("walk: cannot stat {}: {err}", path.display());
            return ScanOutcome::Completed(totals);
        }
    };
    if root_meta.file_type().is_symlink() {
        return ScanOutcome::Completed(totals);
    }
    if !root_meta.is_dir() {
        totals.size = allocated_size(&root_meta);
        totals.files = 1;
        totals.touch(&root_meta);
        return ScanOutcome::Completed(totals);
    }
    totals.touch(&root_meta);

    let dir_cancel = cancel.clone();
    let walker = jwalk::WalkDir::new(path)
        .skip_hidden(false)
        .follow_links(false)
        .parallelism(jwalk::Parallelism::Serial)
        .process_read_dir(move |_depth, _path, _state, children| {
            if dir_cancel.is_cancelled() {
                children.clear();
            }
        });

    let mut visited: u64 = 0;
    for entry_result in walker {
        visited += 1;
        if visited % CANCEL_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
            return ScanOutcome::Cancelled(totals);
        }

        let entry = match entry_result {
            Ok(entry) => entry,
            Err(err) => {
                trace!("walk: skipping unreadable entry: {err}");
                continue;
            }
        };
        if entry.depth() == 0 {
            continue;
        }

        let file_type = entry.file_type();
        if file_type.is_symlink() {
            continue;
        }

        // Stat without following links; the entry may have vanished since
        // its directory was read.
        let meta = match fs::symlink_metadata(entry.path()) {
            Ok(meta) => meta,
            Err(err) => {
                trace!("walk: cannot stat {}: {err}", entry.path().display());
                continue;
            }
        };
        totals.touch(&meta);
        if file_type.is_dir() {
            totals.dirs += 1;
        } else {
            totals.files += 1;
            totals.size += allocated_size(&meta);
        }
    }

    // Directories emptied by a cancel leave no trace in the loop.
    if cancel.is_cancelled() {
        return ScanOutcome::Cancelled(totals);
    }
    ScanOutcome::Completed(totals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_bytes(path: &Path, n: usize) {
        let mut f = fs::File::create(path).unwrap();
        f.write_all(&vec![7u8; n]).unwrap();
    }

    fn size_of(path: &Path) -> u64 {
        allocated_size(&fs::symlink_metadata(path).unwrap())
    }

    #[test]
    fn totals_match_sum_of_files() {
        let tmp = TempDir::new().unwrap();
        let sub = tmp.path().join("sub");
        fs::create_dir(&sub).unwrap();
        write_bytes(&tmp.path().join("a.bin"), 5_000);
        write_bytes(&sub.join("b.bin"), 9_000);

        let totals = walk(tmp.path(), &CancelToken::new()).into_inner();
        assert_eq!(totals.files, 2);
        assert_eq!(totals.dirs, 1);
        assert_eq!(totals.items(), 3);
        assert_eq!(
            totals.size,
            size_of(&tmp.path().join("a.bin")) + size_of(&sub.join("b.bin"))
        );
        assert!(totals.newest.is_some());
    }

    #[test]
    fn single_file_and_missing_path() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("f");
        write_bytes(&file, 10);

        let one = walk(&file, &CancelToken::new()).into_inner();
        assert_eq!(one.files, 1);
        assert_eq!(one.size, size_of(&file));

        let missing = walk(&tmp.path().join("nope"), &CancelToken::new());
        assert_eq!(missing, ScanOutcome::Completed(WalkTotals::default()));
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_skipped_and_loops_terminate() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("d");
        fs::create_dir(&dir).unwrap();
        write_bytes(&dir.join("real.bin"), 4_096);
        std::os::unix::fs::symlink(&dir, dir.join("loop")).unwrap();
        std::os::unix::fs::symlink(dir.join("real.bin"), dir.join("alias.bin")).unwrap();

        let totals = walk(&dir, &CancelToken::new()).into_inner();
        assert_eq!(totals.files, 1);
        assert_eq!(totals.dirs, 0);
        assert_eq!(totals.size, size_of(&dir.join("real.bin")));

        let link_itself = walk(&dir.join("loop"), &CancelToken::new()).into_inner();
        assert_eq!(link_itself, WalkTotals::default());
    }

    #[test]
    fn cancelled_walk_reports_cancelled() {
        let tmp = TempDir::new().unwrap();
        for i in 0..(CANCEL_CHECK_INTERVAL + 10) {
            fs::File::create(tmp.path().join(format!("f{i}"))).unwrap();
        }
        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(walk(tmp.path(), &cancel).is_cancelled());
    }

    #[test]
    fn cancel_stops_a_small_tree_before_any_directory_is_read() {
        let tmp = TempDir::new().unwrap();
        let sub = tmp.path().join("sub");
        fs::create_dir(&sub).unwrap();
        write_bytes(&sub.join("big.bin"), 50_000);
        write_bytes(&tmp.path().join("top.bin"), 50_000);

        let cancel = CancelToken::new();
        cancel.cancel();
        let outcome = walk(tmp.path(), &cancel);
        assert!(outcome.is_cancelled());
        let totals = outcome.into_inner();
        assert_eq!(totals.files, 0);
        assert_eq!(totals.size, 0);
    }
}
