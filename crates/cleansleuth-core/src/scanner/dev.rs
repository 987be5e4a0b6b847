/// Dev scanner: sizes every developer-cache category in the catalog.
///
/// Each **leaf** category is one task on the shared pool; its totals are the
/// sum of walker totals over its candidate paths that exist. Each task
/// writes only its own result slot (rayon's indexed `collect` keeps catalog
/// order), and the one shared counter is an atomic byte total used for
/// progress. **Groups** are never walked: once every leaf is done they are
/// aggregated bottom-up from their children, so a parent always equals the
/// sum of its children.
use super::progress::{ProgressEvent, ProgressSink};
use super::walker::{self, WalkTotals};
use super::{CancelToken, ScanOutcome};
use crate::catalog::{CategoryCatalog, CategoryDef, CategoryKind};
use crate::model::{to_utc, Category, DevScanResult, ScanMode};
use rayon::prelude::*;
use rayon::ThreadPool;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Totals for one leaf category.
#[derive(Debug, Default)]
struct LeafScan {
    totals: WalkTotals,
    existing_paths: Vec<PathBuf>,
}

pub struct DevScanner {
    catalog: Arc<CategoryCatalog>,
    pool: Arc<ThreadPool>,
}

impl DevScanner {
    pub fn new(catalog: Arc<CategoryCatalog>, pool: Arc<ThreadPool>) -> Self {
        Self { catalog, pool }
    }

    pub fn catalog(&self) -> &CategoryCatalog {
        &self.catalog
    }

    /// Scan every catalog entry.
    pub fn scan(
        &self,
        cancel: &CancelToken,
        progress: &dyn ProgressSink,
    ) -> ScanOutcome<DevScanResult> {
        let entries: Vec<&CategoryDef> = self.catalog.entries().iter().collect();
        self.scan_entries(ScanMode::Dev, &entries, cancel, progress)
    }

    /// Scan only the entries flagged `quick`, a strict subset of
    /// [`scan`](Self::scan)'s categories, chosen for low latency.
    pub fn quick_scan(
        &self,
        cancel: &CancelToken,
        progress: &dyn ProgressSink,
    ) -> ScanOutcome<DevScanResult> {
        let entries = self.catalog.quick_entries();
        self.scan_entries(ScanMode::QuickDev, &entries, cancel, progress)
    }

    fn scan_entries(
        &self,
        mode: ScanMode,
        entries: &[&CategoryDef],
        cancel: &CancelToken,
        progress: &dyn ProgressSink,
    ) -> ScanOutcome<DevScanResult> {
        let start = Instant::now();
        let leaves: Vec<&CategoryDef> = entries
            .iter()
            .flat_map(|e| e.iter())
            .filter(|d| matches!(d.kind, CategoryKind::Leaf { .. }))
            .collect();
        let total = leaves.len() as u64;
        info!("{} scan: {} categories, {} leaves", mode.label(), entries.len(), total);

        let bytes_scanned = AtomicU64::new(0);
        let completed = AtomicU64::new(0);
        let truncated = AtomicBool::new(false);

        let scans: Vec<LeafScan> = self.pool.install(|| {
            leaves
                .par_iter()
                .map(|def| {
                    if cancel.is_cancelled() {
                        truncated.store(true, Ordering::Relaxed);
                        return LeafScan::default();
                    }
                    let (scan, cut_short) = scan_leaf(def, cancel);
                    if cut_short {
                        truncated.store(true, Ordering::Relaxed);
                    }
                    let bytes = bytes_scanned.fetch_add(scan.totals.size, Ordering::Relaxed)
                        + scan.totals.size;
                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    progress.emit(ProgressEvent::ScanProgress {
                        mode,
                        completed: done,
                        total: Some(total),
                        bytes_scanned: bytes,
                        current_path: leaf_display_path(def),
                    });
                    scan
                })
                .collect()
        });

        let mut scans = leaves
            .iter()
            .map(|d| d.id.as_str())
            .zip(scans)
            .collect::<std::collections::HashMap<_, _>>();
        let categories = entries
            .iter()
            .map(|def| build_category(def, &mut scans))
            .collect();

        let duration = start.elapsed();
        let result = DevScanResult::new(mode, categories, duration.as_millis() as u64);
        debug!(
            "{} scan finished in {duration:?}: {} bytes, {} items",
            mode.label(),
            result.total_size,
            result.total_items
        );

        if truncated.load(Ordering::Relaxed) {
            info!("{} scan cancelled", mode.label());
            ScanOutcome::Cancelled(result)
        } else {
            ScanOutcome::Completed(result)
        }
    }
}

/// Walk every existing candidate path of a leaf. Returns the totals and
/// whether cancellation cut the walk short.
fn scan_leaf(def: &CategoryDef, cancel: &CancelToken) -> (LeafScan, bool) {
    let mut scan = LeafScan::default();
    let CategoryKind::Leaf { paths } = &def.kind else {
        return (scan, false);
    };
    for path in paths {
        if cancel.is_cancelled() {
            return (scan, true);
        }
        if fs::symlink_metadata(path).is_err() {
            continue;
        }
        scan.existing_paths.push(path.clone());
        match walker::walk(path, cancel) {
            ScanOutcome::Completed(totals) => scan.totals.merge(&totals),
            ScanOutcome::Cancelled(totals) => {
                scan.totals.merge(&totals);
                return (scan, true);
            }
        }
    }
    (scan, false)
}

fn leaf_display_path(def: &CategoryDef) -> String {
    match &def.kind {
        CategoryKind::Leaf { paths } => paths
            .first()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|| def.id.clone()),
        CategoryKind::Group { .. } => def.id.clone(),
    }
}

fn build_category(
    def: &CategoryDef,
    scans: &mut std::collections::HashMap<&str, LeafScan>,
) -> Category {
    let mut category = Category {
        id: def.id.clone(),
        name: def.name.clone(),
        icon: def.icon.clone(),
        color: def.color.clone(),
        paths: Vec::new(),
        size: 0,
        item_count: 0,
        last_modified: None,
        children: Vec::new(),
        selected: false,
    };
    match &def.kind {
        CategoryKind::Leaf { .. } => {
            let scan = scans.remove(def.id.as_str()).unwrap_or_default();
            category.paths = scan.existing_paths;
            category.size = scan.totals.size;
            category.item_count = scan.totals.items();
            category.last_modified = scan.totals.newest.map(to_utc);
        }
        CategoryKind::Group { children } => {
            category.children = children.iter().map(|c| build_category(c, scans)).collect();
            category.aggregate();
        }
    }
    category
}
