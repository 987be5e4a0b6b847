/// Dev-scan results: a forest of size-annotated cache categories.
use super::ScanMode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One scanned category. Leaves carry their resolved candidate paths; groups
/// carry children and derive every total from them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    /// Display-only.
    pub icon: String,
    /// Display-only.
    pub color: String,
    /// Candidate paths that existed when the category was scanned.
    pub paths: Vec<PathBuf>,
    pub size: u64,
    pub item_count: u64,
    /// Newest modification time seen anywhere under the category.
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Category>,
    /// Selection state for the presentation layer; the engine never reads it.
    #[serde(default)]
    pub selected: bool,
}

impl Category {
    pub fn is_group(&self) -> bool {
        !self.children.is_empty()
    }

    /// Recompute this category's totals from its children, bottom-up.
    ///
    /// Leaves are left untouched. A group's size, item count, and
    /// last-modified time are always derived, never walked independently.
    pub fn aggregate(&mut self) {
        if self.children.is_empty() {
            return;
        }
        for child in &mut self.children {
            child.aggregate();
        }
        self.size = self.children.iter().map(|c| c.size).sum();
        self.item_count = self.children.iter().map(|c| c.item_count).sum();
        self.last_modified = self.children.iter().filter_map(|c| c.last_modified).max();
    }

    /// Depth-first iterator over this category and all descendants.
    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let next = stack.pop()?;
            stack.extend(next.children.iter().rev());
            Some(next)
        })
    }

    /// Every concrete path this category covers (its own, or its leaves').
    pub fn leaf_paths(&self) -> Vec<PathBuf> {
        self.iter()
            .filter(|c| !c.is_group())
            .flat_map(|c| c.paths.iter().cloned())
            .collect()
    }
}

/// Result of a full or quick dev scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevScanResult {
    pub mode: ScanMode,
    /// Top-level categories in catalog order.
    pub categories: Vec<Category>,
    pub total_size: u64,
    pub total_items: u64,
    pub scanned_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl DevScanResult {
    pub fn new(mode: ScanMode, mut categories: Vec<Category>, duration_ms: u64) -> Self {
        for category in &mut categories {
            category.aggregate();
        }
        let total_size = categories.iter().map(|c| c.size).sum();
        let total_items = categories.iter().map(|c| c.item_count).sum();
        Self {
            mode,
            categories,
            total_size,
            total_items,
            scanned_at: Utc::now(),
            duration_ms,
        }
    }

    /// Find a category (top-level or nested) by id.
    pub fn find(&self, id: &str) -> Option<&Category> {
        self.iter().find(|c| c.id == id)
    }

    /// Every category in the forest, parents before children.
    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter().flat_map(|c| c.iter())
    }
}
