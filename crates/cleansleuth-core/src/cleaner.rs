/// Cleaner: deletes a resolved list of paths, to the OS trash or
/// permanently.
///
/// Every target is measured with the walker before removal so the freed
/// byte count reflects what was actually deleted. A target that is already
/// gone is skipped, not an error, which makes re-running a clean harmless.
/// Failures are recorded per path and the batch carries on. Cancellation is
/// observed between targets, never in the middle of one.
use crate::model::{dedup_paths, CleanError, CleanErrorCode, CleanResult, CleanStatus};
use crate::scanner::progress::{ProgressEvent, ProgressSink};
use crate::scanner::walker;
use crate::scanner::{CancelToken, ScanOutcome};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// The actual removal step, separated so tests can inject failures.
pub trait Remover: Send + Sync {
    fn remove(&self, path: &Path, permanent: bool) -> io::Result<()>;
}

/// Removes through the filesystem, or the platform trash via `trash`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsRemover;

impl Remover for FsRemover {
    fn remove(&self, path: &Path, permanent: bool) -> io::Result<()> {
        if !permanent {
            return trash::delete(path).map_err(|e| io::Error::other(e.to_string()));
        }
        let meta = fs::symlink_metadata(path)?;
        if meta.is_dir() {
            fs::remove_dir_all(path)
        } else {
            // Files and symlinks alike; a link is removed, never its target.
            fs::remove_file(path)
        }
    }
}

pub struct Cleaner {
    remover: Box<dyn Remover>,
}

impl Default for Cleaner {
    fn default() -> Self {
        Self::new(Box::new(FsRemover))
    }
}

impl Cleaner {
    pub fn new(remover: Box<dyn Remover>) -> Self {
        Self { remover }
    }

    /// Delete `targets`. Repeated paths are processed once.
    pub fn clean(
        &self,
        targets: Vec<PathBuf>,
        permanent: bool,
        cancel: &CancelToken,
        progress: &dyn ProgressSink,
    ) -> CleanResult {
        let targets = dedup_paths(targets);
        let total = targets.len();
        let start = Instant::now();
        info!(
            "Cleaning {total} paths ({})",
            if permanent { "permanent" } else { "trash" }
        );
        progress.emit(ProgressEvent::CleanStarted { total });

        let mut result = CleanResult::new();
        for (i, path) in targets.iter().enumerate() {
            if cancel.is_cancelled() {
                result.status = CleanStatus::Cancelled;
                break;
            }
            self.clean_one(path, permanent, &mut result);
            progress.emit(ProgressEvent::CleanProgress {
                completed: i + 1,
                total,
                freed_bytes: result.freed_bytes,
                current_path: path.to_string_lossy().into_owned(),
            });
        }

        debug!(
            "Clean finished in {:?}: {} deleted, {} skipped, {} errors, {} bytes freed",
            start.elapsed(),
            result.deleted_paths.len(),
            result.skipped_paths.len(),
            result.errors.len(),
            result.freed_bytes
        );
        if result.is_cancelled() {
            info!("Clean cancelled after freeing {} bytes", result.freed_bytes);
            progress.emit(ProgressEvent::CleanCancelled {
                freed_bytes: result.freed_bytes,
            });
        } else {
            progress.emit(ProgressEvent::CleanCompleted {
                freed_bytes: result.freed_bytes,
                deleted: result.deleted_paths.len(),
                error_count: result.errors.len(),
            });
        }
        result
    }

    fn clean_one(&self, path: &Path, permanent: bool, result: &mut CleanResult) {
        match fs::symlink_metadata(path) {
            Ok(_) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("Already gone: {}", path.display());
                result.skipped_paths.push(path.to_path_buf());
                return;
            }
            Err(err) => {
                record_error(result, path, &err);
                return;
            }
        }

        // Measured in full; the clean's own token is not passed down so a
        // cancel never leaves a half-measured target.
        let size = match walker::walk(path, &CancelToken::new()) {
            ScanOutcome::Completed(totals) | ScanOutcome::Cancelled(totals) => totals.size,
        };

        match self.remover.remove(path, permanent) {
            Ok(()) => {
                result.freed_bytes += size;
                result.deleted_paths.push(path.to_path_buf());
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                result.skipped_paths.push(path.to_path_buf());
            }
            Err(err) => record_error(result, path, &err),
        }
    }
}

fn record_error(result: &mut CleanResult, path: &Path, err: &io::Error) {
    warn!("Failed to remove {}: {err}", path.display());
    result.errors.push(CleanError {
        path: path.to_path_buf(),
        message: err.to_string(),
        code: CleanErrorCode::from(err),
    });
}
