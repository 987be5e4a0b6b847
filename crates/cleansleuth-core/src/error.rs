/// Call-level failures.
///
/// Item-level problems (an unreadable file, a vanished directory, one failed
/// deletion) never surface here; they are absorbed by the scanners or
/// recorded in a [`crate::model::CleanResult`]. An `EngineError` means the
/// whole operation could not be carried out.
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("path does not exist: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("unknown category id: {0}")]
    UnknownCategory(String),

    #[error("keep index {index} is out of range for a group of {len} files")]
    InvalidKeepIndex { index: usize, len: usize },

    #[error("invalid category catalog: {0}")]
    InvalidCatalog(String),

    #[error("could not determine the home directory")]
    NoHomeDirectory,

    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialisation error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
