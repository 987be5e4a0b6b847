/// Engine configuration.
///
/// Stored as JSON; every field is optional in the file and falls back to its
/// default, so a partial or missing config is always usable.
use crate::analysis::dependencies::DEFAULT_DISCOVERY_DEPTH;
use crate::analysis::large_files::DEFAULT_MAX_LARGE_FILES;
use crate::analysis::DuplicateOptions;
use crate::error::Result;
use crate::trends::{DEFAULT_MAX_SNAPSHOTS, DEFAULT_RETENTION_DAYS};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory name under the platform's local data directory.
pub const APP_DIR_NAME: &str = "cleansleuth";

pub const TRENDS_FILE_NAME: &str = "trends-history.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Worker pool size; 0 picks `min(4, cpus)`.
    pub workers: usize,
    /// Where caches and trend history live. `None` uses the platform's
    /// local data directory.
    pub data_dir: Option<PathBuf>,
    /// Root for normal scans and searches when none is given. `None` uses
    /// the home directory.
    pub default_root: Option<PathBuf>,
    pub retention_days: u32,
    pub max_snapshots: usize,
    pub duplicates: DuplicateOptions,
    pub max_large_files: usize,
    pub dependency_depth: usize,
    /// Category cleans bypass the trash.
    pub permanent_delete: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            data_dir: None,
            default_root: None,
            retention_days: DEFAULT_RETENTION_DAYS,
            max_snapshots: DEFAULT_MAX_SNAPSHOTS,
            duplicates: DuplicateOptions::default(),
            max_large_files: DEFAULT_MAX_LARGE_FILES,
            dependency_depth: DEFAULT_DISCOVERY_DEPTH,
            permanent_delete: false,
        }
    }
}

impl EngineConfig {
    /// Read `path`, falling back to defaults when it does not exist.
    /// A file that exists but does not parse is an error.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// The platform default config location.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("config.json"))
    }

    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .map(|d| d.join(APP_DIR_NAME))
                .unwrap_or_else(|| PathBuf::from(".").join(format!(".{APP_DIR_NAME}")))
        })
    }

    pub fn trends_path(&self) -> PathBuf {
        self.resolved_data_dir().join(TRENDS_FILE_NAME)
    }

    pub fn resolved_default_root(&self) -> Option<PathBuf> {
        self.default_root.clone().or_else(dirs::home_dir)
    }
}
