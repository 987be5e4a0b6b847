/// Duplicate-detection results.
use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One member of a duplicate group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateFile {
    pub path: PathBuf,
    pub name: CompactString,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    /// Hex-encoded BLAKE3 digest of the full content.
    pub hash: String,
}

/// Files sharing one content hash. Members are ordered oldest first, so
/// index 0 is the default copy to keep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateGroup {
    pub hash: String,
    pub size: u64,
    pub files: Vec<DuplicateFile>,
    pub wasted_size: u64,
}

impl DuplicateGroup {
    /// Build a group, ordering members by modification time ascending
    /// (unknown times last, ties by path) and deriving `wasted_size`.
    pub fn new(hash: String, size: u64, mut files: Vec<DuplicateFile>) -> Self {
        files.sort_by(|a, b| {
            let a_key = (a.modified.is_none(), a.modified);
            let b_key = (b.modified.is_none(), b.modified);
            a_key.cmp(&b_key).then_with(|| a.path.cmp(&b.path))
        });
        let wasted_size = size * (files.len() as u64).saturating_sub(1);
        Self {
            hash,
            size,
            files,
            wasted_size,
        }
    }

    /// Paths that would be removed when keeping `keep_index`.
    pub fn removal_paths(&self, keep_index: usize) -> Vec<PathBuf> {
        self.files
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != keep_index)
            .map(|(_, f)| f.path.clone())
            .collect()
    }
}

/// Result of one duplicate search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicatesResult {
    /// Groups sorted by wasted size descending, possibly capped.
    pub groups: Vec<DuplicateGroup>,
    /// Number of groups before any cap was applied.
    pub total_groups: usize,
    /// Wasted bytes across all groups before any cap was applied.
    pub total_wasted: u64,
    /// Regular files considered in the size-bucketing phase.
    pub files_scanned: u64,
    /// Files whose full content was hashed.
    pub files_hashed: u64,
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn dup(path: &str, secs: Option<i64>) -> DuplicateFile {
        DuplicateFile {
            path: PathBuf::from(path),
            name: CompactString::new(path),
            size: 10,
            modified: secs.map(|s| Utc.timestamp_opt(s, 0).unwrap()),
            hash: "h".into(),
        }
    }

    #[test]
    fn members_are_oldest_first() {
        let group = DuplicateGroup::new(
            "h".into(),
            10,
            vec![dup("/c", None), dup("/b", Some(200)), dup("/a", Some(100))],
        );
        let order: Vec<_> = group.files.iter().map(|f| f.path.to_str().unwrap()).collect();
        assert_eq!(order, ["/a", "/b", "/c"]);
        assert_eq!(group.wasted_size, 20);
    }

    #[test]
    fn removal_paths_skip_kept_member() {
        let group = DuplicateGroup::new("h".into(), 10, vec![dup("/a", Some(1)), dup("/b", Some(2))]);
        assert_eq!(group.removal_paths(0), vec![PathBuf::from("/b")]);
        assert_eq!(group.removal_paths(1), vec![PathBuf::from("/a")]);
    }
}
