/// Scanner module: filesystem walking under cooperative cancellation.
///
/// - [`walker`] computes aggregate size/count for one subtree. Every other
///   scanner (and the cleaner's pre-delete measurement) is built on it.
/// - [`dev`] walks only the category catalog's predefined paths.
/// - [`normal`] lists one directory level at a time with full recursive
///   sizes, for lazy drill-down through arbitrarily deep trees.
///
/// All parallel work runs on one bounded `rayon` pool built by
/// [`build_pool`] and shared for the lifetime of the engine. Walks inside a
/// pool task are serial, so the pool size alone bounds open directory
/// handles and CPU contention.
pub mod dev;
pub mod normal;
pub mod progress;
pub mod walker;

use crate::error::{EngineError, Result};
use rayon::ThreadPool;
use std::fs::{self, Metadata};
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Default worker count when the configuration does not specify one.
pub const DEFAULT_WORKERS: usize = 4;

/// Entries visited between two cancellation checks inside a single walk.
pub const CANCEL_CHECK_INTERVAL: u64 = 1_000;

/// Cooperative cancellation flag, checked at category, directory, entry-batch,
/// and file boundaries. Cloning shares the flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the operation to stop as soon as possible.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Whether `other` is a clone of this token.
    pub fn same_as(&self, other: &CancelToken) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Terminal state of a cancellable operation that did not fail.
///
/// `Cancelled` carries whatever was aggregated before the stop was observed.
/// Callers must treat it as incomplete: the engine never caches it or
/// records it as a trend snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome<T> {
    Completed(T),
    Cancelled(T),
}

impl<T> ScanOutcome<T> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    /// The value, only if the operation ran to completion.
    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Cancelled(_) => None,
        }
    }

    /// The value regardless of how the operation ended.
    pub fn into_inner(self) -> T {
        match self {
            Self::Completed(value) | Self::Cancelled(value) => value,
        }
    }

    pub fn value(&self) -> &T {
        match self {
            Self::Completed(value) | Self::Cancelled(value) => value,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ScanOutcome<U> {
        match self {
            Self::Completed(value) => ScanOutcome::Completed(f(value)),
            Self::Cancelled(value) => ScanOutcome::Cancelled(f(value)),
        }
    }
}

/// Operations rooted at a directory cannot start unless `path` is one.
pub fn require_directory(path: &Path) -> Result<Metadata> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(meta),
        Ok(_) => Err(EngineError::NotADirectory(path.to_path_buf())),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            Err(EngineError::PathNotFound(path.to_path_buf()))
        }
        Err(err) => Err(err.into()),
    }
}

/// Build the bounded worker pool shared by every scan, hash, and walk.
///
/// `workers == 0` selects [`DEFAULT_WORKERS`] capped at the CPU count.
pub fn build_pool(workers: usize) -> Result<Arc<ThreadPool>> {
    let workers = if workers == 0 {
        DEFAULT_WORKERS.min(num_cpus::get()).max(1)
    } else {
        workers
    };
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("cleansleuth-worker-{i}"))
        .build()?;
    Ok(Arc::new(pool))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
        assert!(token.same_as(&clone));
        assert!(!token.same_as(&CancelToken::new()));
    }

    #[test]
    fn outcome_accessors() {
        let done = ScanOutcome::Completed(3);
        assert!(!done.is_cancelled());
        assert_eq!(done.clone().map(|v| v * 2).completed(), Some(6));

        let stopped = ScanOutcome::Cancelled(1);
        assert!(stopped.is_cancelled());
        assert_eq!(*stopped.value(), 1);
        assert_eq!(stopped.clone().completed(), None);
        assert_eq!(stopped.into_inner(), 1);
    }

    #[test]
    fn pool_uses_requested_size() {
        let pool = build_pool(3).unwrap();
        assert_eq!(pool.current_num_threads(), 3);
        let default = build_pool(0).unwrap();
        assert!(default.current_num_threads() >= 1);
        assert!(default.current_num_threads() <= DEFAULT_WORKERS);
    }
}
