/// Platform detection and the user-profile roots catalog paths hang off.
///
/// Resolved once when a catalog is built; scan code never branches on the
/// platform itself.
use crate::error::{EngineError, Result};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformKind {
    MacOs,
    Linux,
    Windows,
}

impl PlatformKind {
    /// The platform this binary was compiled for. Other Unixes use the
    /// Linux (XDG) layout.
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Self::MacOs
        } else if cfg!(windows) {
            Self::Windows
        } else {
            Self::Linux
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::MacOs => "macOS",
            Self::Linux => "Linux",
            Self::Windows => "Windows",
        }
    }
}

/// Per-user directory roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformDirs {
    pub kind: PlatformKind,
    pub home: PathBuf,
    /// `~/Library/Caches`, `~/.cache`, or `%LOCALAPPDATA%`.
    pub cache: PathBuf,
    /// `~/Library/Application Support`, `~/.config`, or `%APPDATA%`.
    pub config: PathBuf,
    /// `~/Library/Application Support`, `~/.local/share`, or `%LOCALAPPDATA%`.
    pub data_local: PathBuf,
}

impl PlatformDirs {
    /// Detect the running user's directories.
    pub fn detect() -> Result<Self> {
        let home = dirs::home_dir().ok_or(EngineError::NoHomeDirectory)?;
        let kind = PlatformKind::current();
        let mut detected = Self::for_home(kind, home);
        if let Some(cache) = dirs::cache_dir() {
            detected.cache = cache;
        }
        if let Some(config) = dirs::config_dir() {
            detected.config = config;
        }
        if let Some(data_local) = dirs::data_local_dir() {
            detected.data_local = data_local;
        }
        Ok(detected)
    }

    /// Conventional layout for `kind` rooted at `home`, without consulting
    /// environment overrides. Used for tests and for `detect` fallbacks.
    pub fn for_home(kind: PlatformKind, home: PathBuf) -> Self {
        let (cache, config, data_local) = match kind {
            PlatformKind::MacOs => (
                home.join("Library/Caches"),
                home.join("Library/Application Support"),
                home.join("Library/Application Support"),
            ),
            PlatformKind::Linux => (
                home.join(".cache"),
                home.join(".config"),
                home.join(".local/share"),
            ),
            PlatformKind::Windows => (
                home.join("AppData").join("Local"),
                home.join("AppData").join("Roaming"),
                home.join("AppData").join("Local"),
            ),
        };
        Self {
            kind,
            home,
            cache,
            config,
            data_local,
        }
    }
}
