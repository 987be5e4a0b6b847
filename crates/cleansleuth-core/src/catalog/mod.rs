/// Category catalog: the static table of developer caches the dev scanner
/// walks.
///
/// Each entry is either a **leaf** (one or more candidate paths) or a
/// **group** of leaves (one level of nesting, for drill-down such as Xcode →
/// DerivedData / Archives / …). The table is resolved against a
/// [`PlatformDirs`] once, at construction; nothing mutates it afterwards.
/// Enabling or disabling categories per session is a presentation concern
/// layered on top.
pub mod platform;

pub use platform::{PlatformDirs, PlatformKind};

use crate::error::{EngineError, Result};
use std::collections::HashSet;
use std::path::PathBuf;

/// Leaf vs. group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryKind {
    Leaf { paths: Vec<PathBuf> },
    Group { children: Vec<CategoryDef> },
}

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryDef {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub color: String,
    /// Included in quick scans.
    pub quick: bool,
    pub kind: CategoryKind,
}

impl CategoryDef {
    pub fn leaf(id: &str, name: &str, paths: Vec<PathBuf>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            icon: String::new(),
            color: String::new(),
            quick: false,
            kind: CategoryKind::Leaf { paths },
        }
    }

    pub fn group(id: &str, name: &str, children: Vec<CategoryDef>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            icon: String::new(),
            color: String::new(),
            quick: false,
            kind: CategoryKind::Group { children },
        }
    }

    pub fn icon(mut self, icon: &str) -> Self {
        self.icon = icon.to_string();
        self
    }

    pub fn color(mut self, color: &str) -> Self {
        self.color = color.to_string();
        self
    }

    pub fn quick(mut self) -> Self {
        self.quick = true;
        self
    }

    pub fn children(&self) -> &[CategoryDef] {
        match &self.kind {
            CategoryKind::Group { children } => children,
            CategoryKind::Leaf { .. } => &[],
        }
    }

    /// This entry and its children, parents first.
    pub fn iter(&self) -> impl Iterator<Item = &CategoryDef> {
        std::iter::once(self).chain(self.children().iter())
    }
}

#[derive(Debug, Clone)]
pub struct CategoryCatalog {
    platform: PlatformKind,
    entries: Vec<CategoryDef>,
}

impl CategoryCatalog {
    /// Build a catalog from explicit entries.
    ///
    /// Rejects duplicate ids, groups nested inside groups, and empty groups.
    pub fn new(platform: PlatformKind, entries: Vec<CategoryDef>) -> Result<Self> {
        let mut seen = HashSet::new();
        for entry in &entries {
            if let CategoryKind::Group { children } = &entry.kind {
                if children.is_empty() {
                    return Err(EngineError::InvalidCatalog(format!(
                        "group '{}' has no children",
                        entry.id
                    )));
                }
                if let Some(nested) = children
                    .iter()
                    .find(|c| matches!(c.kind, CategoryKind::Group { .. }))
                {
                    return Err(EngineError::InvalidCatalog(format!(
                        "group '{}' nests group '{}'",
                        entry.id, nested.id
                    )));
                }
            }
            for def in entry.iter() {
                if !seen.insert(def.id.clone()) {
                    return Err(EngineError::InvalidCatalog(format!(
                        "duplicate category id '{}'",
                        def.id
                    )));
                }
            }
        }
        Ok(Self { platform, entries })
    }

    /// The built-in developer-cache table for the running user.
    pub fn detect() -> Result<Self> {
        let dirs = PlatformDirs::detect()?;
        Ok(Self::for_platform(&dirs))
    }

    /// The built-in table resolved against `dirs`.
    pub fn for_platform(dirs: &PlatformDirs) -> Self {
        Self {
            platform: dirs.kind,
            entries: builtin_entries(dirs),
        }
    }

    pub fn platform(&self) -> PlatformKind {
        self.platform
    }

    /// Top-level entries in display order.
    pub fn entries(&self) -> &[CategoryDef] {
        &self.entries
    }

    /// Top-level entries flagged for quick scans. Always a subset of
    /// [`entries`](Self::entries).
    pub fn quick_entries(&self) -> Vec<&CategoryDef> {
        self.entries.iter().filter(|e| e.quick).collect()
    }

    /// Look up any entry (top-level or child) by id.
    pub fn find(&self, id: &str) -> Option<&CategoryDef> {
        self.entries.iter().flat_map(|e| e.iter()).find(|d| d.id == id)
    }

    /// Every id in the catalog, parents before children.
    pub fn all_ids(&self) -> Vec<&str> {
        self.entries
            .iter()
            .flat_map(|e| e.iter())
            .map(|d| d.id.as_str())
            .collect()
    }

    /// Ids of the entries that carry paths, in scan order.
    pub fn leaf_ids(&self) -> Vec<&str> {
        self.entries
            .iter()
            .flat_map(|e| e.iter())
            .filter(|d| matches!(d.kind, CategoryKind::Leaf { .. }))
            .map(|d| d.id.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn builtin_entries(d: &PlatformDirs) -> Vec<CategoryDef> {
    let home = &d.home;
    let mut entries = Vec::new();

    if d.kind == PlatformKind::MacOs {
        let dev = home.join("Library/Developer");
        entries.push(
            CategoryDef::group(
                "xcode",
                "Xcode",
                vec![
                    CategoryDef::leaf(
                        "xcode-derived-data",
                        "Derived Data",
                        vec![dev.join("Xcode/DerivedData")],
                    ),
                    CategoryDef::leaf("xcode-archives", "Archives", vec![dev.join("Xcode/Archives")]),
                    CategoryDef::leaf(
                        "xcode-device-support",
                        "Device Support",
                        vec![
                            dev.join("Xcode/iOS DeviceSupport"),
                            dev.join("Xcode/watchOS DeviceSupport"),
                        ],
                    ),
                    CategoryDef::leaf(
                        "xcode-simulators",
                        "Simulators",
                        vec![dev.join("CoreSimulator/Devices")],
                    ),
                ],
            )
            .icon("hammer")
            .color("#1575F9")
            .quick(),
        );
    }

    entries.push(
        CategoryDef::group(
            "android",
            "Android",
            vec![
                CategoryDef::leaf("android-avd", "Emulator Images", vec![home.join(".android/avd")]),
                CategoryDef::leaf(
                    "android-build-cache",
                    "Build Cache",
                    vec![home.join(".android/build-cache"), home.join(".android/cache")],
                ),
            ],
        )
        .icon("smartphone")
        .color("#3DDC84"),
    );

    let npm = match d.kind {
        PlatformKind::Windows => d.data_local.join("npm-cache"),
        _ => home.join(".npm"),
    };
    entries.push(
        CategoryDef::leaf("npm", "npm Cache", vec![npm])
            .icon("package")
            .color("#CB3837")
            .quick(),
    );

    let yarn = match d.kind {
        PlatformKind::MacOs => d.cache.join("Yarn"),
        PlatformKind::Linux => d.cache.join("yarn"),
        PlatformKind::Windows => d.data_local.join("Yarn").join("Cache"),
    };
    entries.push(
        CategoryDef::leaf("yarn", "Yarn Cache", vec![yarn])
            .icon("package")
            .color("#2C8EBB")
            .quick(),
    );

    let pnpm = match d.kind {
        PlatformKind::MacOs => home.join("Library/pnpm/store"),
        PlatformKind::Linux => d.data_local.join("pnpm/store"),
        PlatformKind::Windows => d.data_local.join("pnpm").join("store"),
    };
    entries.push(
        CategoryDef::leaf("pnpm", "pnpm Store", vec![pnpm])
            .icon("package")
            .color("#F69220"),
    );

    let pip = match d.kind {
        PlatformKind::Windows => d.data_local.join("pip").join("Cache"),
        _ => d.cache.join("pip"),
    };
    entries.push(
        CategoryDef::leaf("pip", "pip Cache", vec![pip])
            .icon("code")
            .color("#3776AB")
            .quick(),
    );

    let cargo = home.join(".cargo");
    entries.push(
        CategoryDef::group(
            "cargo",
            "Cargo",
            vec![
                CategoryDef::leaf("cargo-registry", "Registry", vec![cargo.join("registry")]),
                CategoryDef::leaf("cargo-git", "Git Checkouts", vec![cargo.join("git")]),
            ],
        )
        .icon("box")
        .color("#DEA584"),
    );

    let go_build = match d.kind {
        PlatformKind::Windows => d.data_local.join("go-build"),
        _ => d.cache.join("go-build"),
    };
    entries.push(
        CategoryDef::group(
            "go",
            "Go",
            vec![
                CategoryDef::leaf("go-mod", "Module Cache", vec![home.join("go/pkg/mod")]),
                CategoryDef::leaf("go-build", "Build Cache", vec![go_build]),
            ],
        )
        .icon("code")
        .color("#00ADD8"),
    );

    entries.push(
        CategoryDef::leaf("gradle", "Gradle Caches", vec![home.join(".gradle/caches")])
            .icon("layers")
            .color("#02303A"),
    );
    entries.push(
        CategoryDef::leaf("maven", "Maven Repository", vec![home.join(".m2/repository")])
            .icon("layers")
            .color("#C71A36"),
    );

    let pub_cache = match d.kind {
        PlatformKind::Windows => d.data_local.join("Pub").join("Cache"),
        _ => home.join(".pub-cache"),
    };
    entries.push(
        CategoryDef::leaf("flutter", "Flutter / Dart Pub Cache", vec![pub_cache])
            .icon("feather")
            .color("#02569B"),
    );

    match d.kind {
        PlatformKind::MacOs => {
            entries.push(
                CategoryDef::leaf("cocoapods", "CocoaPods Cache", vec![d.cache.join("CocoaPods")])
                    .icon("package")
                    .color("#EE3322"),
            );
            entries.push(
                CategoryDef::leaf("homebrew", "Homebrew Cache", vec![d.cache.join("Homebrew")])
                    .icon("coffee")
                    .color("#FBB040"),
            );
        }
        PlatformKind::Linux => {
            entries.push(
                CategoryDef::leaf("homebrew", "Homebrew Cache", vec![d.cache.join("Homebrew")])
                    .icon("coffee")
                    .color("#FBB040"),
            );
        }
        PlatformKind::Windows => {}
    }

    entries.push(
        CategoryDef::leaf(
            "vscode",
            "VS Code Caches",
            vec![
                d.config.join("Code").join("Cache"),
                d.config.join("Code").join("CachedData"),
                d.config.join("Code").join("CachedExtensionVSIXs"),
            ],
        )
        .icon("monitor")
        .color("#007ACC"),
    );

    entries
}
