/// A single file or directory in a lazily-expanded scan tree.
///
/// Unlike a full in-memory index, only the levels the caller has asked for
/// carry `children`; every directory node still reports its full recursive
/// size, computed by the directory walker when its parent level was listed.
use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileNode {
    /// File or directory name only.
    pub name: CompactString,

    /// Absolute path, used for drill-down and deletion.
    pub path: PathBuf,

    /// Allocated size in bytes. For directories this is the recursive total.
    pub size: u64,

    /// `true` if this node represents a directory.
    pub is_dir: bool,

    /// Last-modified timestamp, if the filesystem reported one.
    pub modified: Option<DateTime<Utc>>,

    /// Number of files and directories below this node (0 for files).
    pub item_count: u64,

    /// Immediate children, only for levels that have been expanded.
    /// Sorted by size descending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<FileNode>>,
}

impl FileNode {
    /// Create a file node.
    pub fn new_file(
        name: CompactString,
        path: PathBuf,
        size: u64,
        modified: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            name,
            path,
            size,
            is_dir: false,
            modified,
            item_count: 0,
            children: None,
        }
    }

    /// Create a directory node with its already-computed recursive totals.
    pub fn new_dir(
        name: CompactString,
        path: PathBuf,
        size: u64,
        item_count: u64,
        modified: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            name,
            path,
            size,
            is_dir: true,
            modified,
            item_count,
            children: None,
        }
    }

    /// Attach an expanded level, re-deriving size and item count from it so
    /// the node always equals the sum of what it shows.
    pub fn set_children(&mut self, mut children: Vec<FileNode>) {
        sort_by_size_desc(&mut children);
        self.size = children.iter().map(|c| c.size).sum();
        self.item_count = children.iter().map(|c| 1 + c.item_count).sum();
        self.children = Some(children);
    }

    /// Percentage of `parent_size` this node occupies (0.0–100.0).
    pub fn percent_of(&self, parent_size: u64) -> f32 {
        if parent_size == 0 {
            0.0
        } else {
            (self.size as f64 / parent_size as f64 * 100.0) as f32
        }
    }
}

/// Sort nodes by size descending, ties broken by name so the order is
/// stable across runs.
pub fn sort_by_size_desc(nodes: &mut [FileNode]) {
    nodes.sort_unstable_by(|a, b| b.size.cmp(&a.size).then_with(|| a.name.cmp(&b.name)));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, size: u64) -> FileNode {
        FileNode::new_file(CompactString::new(name), PathBuf::from(name), size, None)
    }

    #[test]
    fn set_children_sums_and_sorts() {
        let mut root = FileNode::new_dir(CompactString::new("root"), PathBuf::from("/r"), 0, 0, None);
        let sub = FileNode::new_dir(CompactString::new("sub"), PathBuf::from("/r/sub"), 500, 3, None);
        root.set_children(vec![file("a", 100), sub, file("b", 300)]);

        assert_eq!(root.size, 900);
        assert_eq!(root.item_count, 6);
        let names: Vec<_> = root
            .children
            .as_ref()
            .unwrap()
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, ["sub", "b", "a"]);
    }

    #[test]
    fn ties_are_ordered_by_name() {
        let mut nodes = vec![file("z", 10), file("a", 10), file("m", 20)];
        sort_by_size_desc(&mut nodes);
        let names: Vec<_> = nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, ["m", "a", "z"]);
    }

    #[test]
    fn percent_of_zero_parent_is_zero() {
        assert_eq!(file("a", 10).percent_of(0), 0.0);
        assert_eq!(file("a", 25).percent_of(100), 25.0);
    }
}
