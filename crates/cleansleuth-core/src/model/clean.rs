/// Outcome of one clean invocation.
use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;

/// Terminal state of a clean. Per-item failures do not change the status;
/// they are listed in [`CleanResult::errors`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanStatus {
    Completed,
    Cancelled,
}

/// Coarse failure classification for the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanErrorCode {
    PermissionDenied,
    NotFound,
    InUse,
    Other,
}

impl From<&io::Error> for CleanErrorCode {
    fn from(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            io::ErrorKind::NotFound => Self::NotFound,
            _ if is_in_use(err) => Self::InUse,
            _ => Self::Other,
        }
    }
}

// EBUSY / ETXTBSY
#[cfg(unix)]
fn is_in_use(err: &io::Error) -> bool {
    matches!(err.raw_os_error(), Some(16) | Some(26))
}

// ERROR_SHARING_VIOLATION / ERROR_LOCK_VIOLATION
#[cfg(windows)]
fn is_in_use(err: &io::Error) -> bool {
    matches!(err.raw_os_error(), Some(32) | Some(33))
}

#[cfg(not(any(unix, windows)))]
fn is_in_use(_err: &io::Error) -> bool {
    false
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanError {
    pub path: PathBuf,
    pub message: String,
    pub code: CleanErrorCode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanResult {
    pub status: CleanStatus,
    /// Sum of the sizes of `deleted_paths` only.
    pub freed_bytes: u64,
    pub deleted_paths: Vec<PathBuf>,
    /// Targets that were already gone; they free nothing and are not errors.
    pub skipped_paths: Vec<PathBuf>,
    pub errors: Vec<CleanError>,
}

impl CleanResult {
    pub fn new() -> Self {
        Self {
            status: CleanStatus::Completed,
            freed_bytes: 0,
            deleted_paths: Vec::new(),
            skipped_paths: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == CleanStatus::Cancelled
    }

    /// Completed, but at least one target failed.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

impl Default for CleanResult {
    fn default() -> Self {
        Self::new()
    }
}
