/// Scan cache: the most recent completed result per scan mode, on disk.
///
/// One JSON file per mode (`scan-cache-dev.json`, `scan-cache-quick.json`,
/// `scan-cache-normal.json`) inside the engine data directory. Each file is
/// an envelope carrying a format version, the mode, and the save time
/// around the result. Anything unexpected on load (missing file, other
/// version, other mode, corrupt JSON) reads as "no cache".
use crate::error::Result;
use crate::model::ScanMode;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Bumped whenever a cached result type changes shape.
pub const CACHE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedScan<T> {
    pub version: u32,
    pub mode: ScanMode,
    pub saved_at: DateTime<Utc>,
    pub result: T,
}

/// Just enough of the envelope to reject a file before parsing the result.
#[derive(Deserialize)]
struct Header {
    version: u32,
    mode: ScanMode,
}

#[derive(Debug, Clone)]
pub struct ScanCache {
    dir: PathBuf,
}

impl ScanCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, mode: ScanMode) -> PathBuf {
        self.dir.join(format!("scan-cache-{}.json", mode.label()))
    }

    /// Replace the cached result for `mode`.
    pub fn save<T: Serialize>(&self, mode: ScanMode, result: &T) -> Result<()> {
        let envelope = CachedScan {
            version: CACHE_VERSION,
            mode,
            saved_at: Utc::now(),
            result,
        };
        let path = self.path_for(mode);
        write_json_atomic(&path, &envelope)?;
        debug!("Cached {} scan at {}", mode.label(), path.display());
        Ok(())
    }

    /// The cached result for `mode`, if there is a usable one.
    pub fn load<T: DeserializeOwned>(&self, mode: ScanMode) -> Option<CachedScan<T>> {
        let path = self.path_for(mode);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!("Cannot read scan cache {}: {err}", path.display());
                return None;
            }
        };

        let header: Header = match serde_json::from_str(&text) {
            Ok(header) => header,
            Err(err) => {
                warn!("Ignoring corrupt scan cache {}: {err}", path.display());
                return None;
            }
        };
        if header.version != CACHE_VERSION {
            debug!(
                "Ignoring scan cache {} with version {} (expected {CACHE_VERSION})",
                path.display(),
                header.version
            );
            return None;
        }
        if header.mode != mode {
            debug!(
                "Ignoring scan cache {}: holds a {} scan",
                path.display(),
                header.mode.label()
            );
            return None;
        }

        match serde_json::from_str(&text) {
            Ok(cached) => Some(cached),
            Err(err) => {
                warn!("Ignoring corrupt scan cache {}: {err}", path.display());
                None
            }
        }
    }

    /// Forget the cached result for `mode`. Clearing an absent cache is fine.
    pub fn clear(&self, mode: ScanMode) -> Result<()> {
        match fs::remove_file(self.path_for(mode)) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }
}

/// Serialise `value` next to `path` and rename it into place, so readers
/// never observe a half-written file.
pub(crate) fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let mut writer = BufWriter::new(File::create(&tmp)?);
    serde_json::to_writer(&mut writer, value)?;
    writer.flush()?;
    drop(writer);

    fs::rename(&tmp, path)?;
    Ok(())
}
