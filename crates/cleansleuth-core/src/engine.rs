/// Engine: the request/response surface frontends drive, plus the progress
/// event bus.
///
/// The engine owns the one worker pool, the scan cache, and the trend
/// store. Every call is synchronous and returns its result; progress for
/// long calls is published on the bus while they run, so a frontend runs
/// calls on a worker thread and drains its [`Subscription`] elsewhere.
/// `cancel_scan` / `cancel_clean` may be called from any thread and stop
/// every scan (or clean) in flight.
use crate::analysis::{
    find_dependency_dirs, find_large_files, recommend, DependencyDirsResult, DuplicateDetector,
    LargeFilesResult, RecommendationInputs,
};
use crate::cache::{CachedScan, ScanCache};
use crate::catalog::{CategoryCatalog, CategoryKind};
use crate::cleaner::{Cleaner, FsRemover, Remover};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::model::size::{mb_to_bytes, MIB};
use crate::model::{
    dedup_paths, CleanResult, DevScanResult, DiskUsageTrend, DuplicateGroup, DuplicatesResult,
    FileNode, FullScanResult, RecommendationsResult, ScanMode, TrendsResult,
};
use crate::scanner::dev::DevScanner;
use crate::scanner::normal::NormalScanner;
use crate::scanner::progress::{ProgressEvent, ProgressSink};
use crate::scanner::{build_pool, require_directory, CancelToken, ScanOutcome};
use crate::trends::TrendTracker;
use chrono::Utc;
use crossbeam_channel::{Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use rayon::ThreadPool;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Events a subscriber may fall behind by before new ones are dropped.
pub const PROGRESS_CHANNEL_CAPACITY: usize = 4_096;

/// A live registration on the event bus.
pub struct Subscription {
    pub id: u64,
    pub receiver: Receiver<ProgressEvent>,
}

/// Fan-out of progress events to every subscriber, fire-and-forget.
#[derive(Default)]
pub struct EventBus {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<(u64, Sender<ProgressEvent>)>>,
}

impl EventBus {
    pub fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = crossbeam_channel::bounded(PROGRESS_CHANNEL_CAPACITY);
        self.subscribers.lock().push((id, tx));
        Subscription { id, receiver: rx }
    }

    /// Returns whether `id` was subscribed.
    pub fn unsubscribe(&self, id: u64) -> bool {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|(sub_id, _)| *sub_id != id);
        subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl ProgressSink for EventBus {
    fn emit(&self, event: ProgressEvent) {
        // try_send never blocks, so holding the lock here is fine.
        self.subscribers
            .lock()
            .retain(|(_, tx)| match tx.try_send(event.clone()) {
                Ok(()) | Err(TrySendError::Full(_)) => true,
                Err(TrySendError::Disconnected(_)) => false,
            });
    }
}

/// Cancel tokens of the operations currently running.
#[derive(Default)]
struct ActiveTokens(Mutex<Vec<CancelToken>>);

impl ActiveTokens {
    fn begin(&self) -> CancelToken {
        let token = CancelToken::new();
        self.0.lock().push(token.clone());
        token
    }

    fn end(&self, token: &CancelToken) {
        self.0.lock().retain(|t| !t.same_as(token));
    }

    fn cancel_all(&self) -> usize {
        let tokens = self.0.lock();
        for token in tokens.iter() {
            token.cancel();
        }
        tokens.len()
    }
}

struct RunningScan {
    mode: ScanMode,
    token: CancelToken,
    start: Instant,
}

/// Totals reported in the `ScanCompleted` event.
trait ScanSummary {
    fn total_size(&self) -> u64;
    fn duration_ms(&self) -> u64;
}

impl ScanSummary for DevScanResult {
    fn total_size(&self) -> u64 {
        self.total_size
    }
    fn duration_ms(&self) -> u64 {
        self.duration_ms
    }
}

impl ScanSummary for FullScanResult {
    fn total_size(&self) -> u64 {
        self.total_size
    }
    fn duration_ms(&self) -> u64 {
        self.duration_ms
    }
}

impl ScanSummary for DuplicatesResult {
    fn total_size(&self) -> u64 {
        self.total_wasted
    }
    fn duration_ms(&self) -> u64 {
        self.duration_ms
    }
}

impl ScanSummary for LargeFilesResult {
    fn total_size(&self) -> u64 {
        self.total_size
    }
    fn duration_ms(&self) -> u64 {
        self.duration_ms
    }
}

impl ScanSummary for DependencyDirsResult {
    fn total_size(&self) -> u64 {
        self.total_size
    }
    fn duration_ms(&self) -> u64 {
        self.duration_ms
    }
}

pub struct Engine {
    config: EngineConfig,
    pool: Arc<ThreadPool>,
    dev: DevScanner,
    normal: NormalScanner,
    duplicates: DuplicateDetector,
    cleaner: Cleaner,
    cache: ScanCache,
    trends: TrendTracker,
    bus: EventBus,
    scans: ActiveTokens,
    cleans: ActiveTokens,
    last_duplicates: Mutex<Option<DuplicatesResult>>,
    last_large_files: Mutex<Option<LargeFilesResult>>,
    last_dependency_dirs: Mutex<Option<DependencyDirsResult>>,
}

impl Engine {
    /// An engine over the built-in catalog for the current user.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let catalog = CategoryCatalog::detect()?;
        Self::with_catalog(config, catalog)
    }

    pub fn with_catalog(config: EngineConfig, catalog: CategoryCatalog) -> Result<Self> {
        Self::with_parts(config, catalog, Box::new(FsRemover))
    }

    /// Full control over the catalog and the removal step.
    pub fn with_parts(
        config: EngineConfig,
        catalog: CategoryCatalog,
        remover: Box<dyn Remover>,
    ) -> Result<Self> {
        let pool = build_pool(config.workers)?;
        let data_dir = config.resolved_data_dir();
        info!(
            "Engine: {} workers, {} categories ({}), data in {}",
            pool.current_num_threads(),
            catalog.len(),
            catalog.platform().label(),
            data_dir.display()
        );
        let catalog = Arc::new(catalog);
        Ok(Self {
            dev: DevScanner::new(catalog, pool.clone()),
            normal: NormalScanner::new(pool.clone()),
            duplicates: DuplicateDetector::new(pool.clone()),
            cleaner: Cleaner::new(remover),
            cache: ScanCache::new(&data_dir),
            trends: TrendTracker::new(
                config.trends_path(),
                config.retention_days,
                config.max_snapshots,
            ),
            bus: EventBus::default(),
            scans: ActiveTokens::default(),
            cleans: ActiveTokens::default(),
            last_duplicates: Mutex::new(None),
            last_large_files: Mutex::new(None),
            last_dependency_dirs: Mutex::new(None),
            pool,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &CategoryCatalog {
        self.dev.catalog()
    }

    // ── Events ──────────────────────────────────────────────────

    pub fn subscribe(&self) -> Subscription {
        self.bus.subscribe()
    }

    pub fn unsubscribe(&self, id: u64) -> bool {
        self.bus.unsubscribe(id)
    }

    // ── Scans ───────────────────────────────────────────────────

    /// Full dev-cache scan. A completed scan is cached and recorded as a
    /// trend snapshot; a cancelled one is neither.
    pub fn scan_dev(&self) -> ScanOutcome<DevScanResult> {
        let running = self.begin_scan(ScanMode::Dev, None);
        let outcome = self.dev.scan(&running.token, &self.bus);
        self.finish_scan(running, Ok(&outcome));
        if let ScanOutcome::Completed(result) = &outcome {
            self.save_cache(ScanMode::Dev, result);
            if let Err(err) = self.trends.record_snapshot(result) {
                warn!("Could not record trend snapshot: {err}");
            }
        }
        outcome
    }

    /// Quick dev scan over the low-latency subset. Cached under its own
    /// mode; never recorded as a trend.
    pub fn quick_scan_dev(&self) -> ScanOutcome<DevScanResult> {
        let running = self.begin_scan(ScanMode::QuickDev, None);
        let outcome = self.dev.quick_scan(&running.token, &self.bus);
        self.finish_scan(running, Ok(&outcome));
        if let ScanOutcome::Completed(result) = &outcome {
            self.save_cache(ScanMode::QuickDev, result);
        }
        outcome
    }

    /// Tree scan of `root`, or of the configured default root.
    pub fn scan_normal(&self, root: Option<&Path>) -> Result<ScanOutcome<FullScanResult>> {
        let root = self.resolve_root(root)?;
        let outcome = self.run(ScanMode::Normal, Some(&root), |token| {
            self.normal.scan_path(&root, token, &self.bus)
        })?;
        if let ScanOutcome::Completed(result) = &outcome {
            self.save_cache(ScanMode::Normal, result);
        }
        Ok(outcome)
    }

    /// Children of `path`, largest first, for lazy drill-down.
    pub fn directory_children(&self, path: &Path) -> Result<ScanOutcome<Vec<FileNode>>> {
        require_directory(path)?;
        let token = self.scans.begin();
        let outcome = self.normal.directory_children(path, &token, &self.bus);
        self.scans.end(&token);
        outcome
    }

    /// Stop every scan in flight; returns how many were signalled.
    pub fn cancel_scan(&self) -> usize {
        let n = self.scans.cancel_all();
        debug!("Cancel requested for {n} running scans");
        n
    }

    pub fn cached_dev_scan(&self) -> Option<CachedScan<DevScanResult>> {
        self.cache.load(ScanMode::Dev)
    }

    pub fn cached_quick_scan(&self) -> Option<CachedScan<DevScanResult>> {
        self.cache.load(ScanMode::QuickDev)
    }

    pub fn cached_normal_scan(&self) -> Option<CachedScan<FullScanResult>> {
        self.cache.load(ScanMode::Normal)
    }

    // ── Cleanup ─────────────────────────────────────────────────

    /// Clean catalog categories by id. Every id must exist; a group expands
    /// to all of its children's paths.
    pub fn clean_categories(&self, ids: &[String]) -> Result<CleanResult> {
        let catalog = self.catalog();
        let mut targets = Vec::new();
        for id in ids {
            let def = catalog
                .find(id)
                .ok_or_else(|| EngineError::UnknownCategory(id.clone()))?;
            for leaf in def.iter() {
                if let CategoryKind::Leaf { paths } = &leaf.kind {
                    targets.extend(paths.iter().cloned());
                }
            }
        }
        let result = self.clean(dedup_paths(targets), self.config.permanent_delete);
        if result.freed_bytes > 0 {
            // Cached sizes no longer describe the disk.
            for mode in [ScanMode::Dev, ScanMode::QuickDev] {
                if let Err(err) = self.cache.clear(mode) {
                    warn!("Could not clear {} cache: {err}", mode.label());
                }
            }
        }
        Ok(result)
    }

    pub fn delete_path(&self, path: &Path, permanent: bool) -> CleanResult {
        self.clean(vec![path.to_path_buf()], permanent)
    }

    /// Delete every member of `group` except `keep_index`.
    pub fn delete_duplicate_group(
        &self,
        group: &DuplicateGroup,
        keep_index: usize,
        permanent: bool,
    ) -> Result<CleanResult> {
        if keep_index >= group.files.len() {
            return Err(EngineError::InvalidKeepIndex {
                index: keep_index,
                len: group.files.len(),
            });
        }
        Ok(self.clean(group.removal_paths(keep_index), permanent))
    }

    /// Stop every clean in flight between items.
    pub fn cancel_clean(&self) -> usize {
        let n = self.cleans.cancel_all();
        debug!("Cancel requested for {n} running cleans");
        n
    }

    fn clean(&self, targets: Vec<PathBuf>, permanent: bool) -> CleanResult {
        let token = self.cleans.begin();
        let result = self.cleaner.clean(targets, permanent, &token, &self.bus);
        self.cleans.end(&token);
        result
    }

    // ── Analysis ────────────────────────────────────────────────

    pub fn find_large_files(
        &self,
        min_size_mb: u64,
        root: Option<&Path>,
    ) -> Result<ScanOutcome<LargeFilesResult>> {
        let root = self.resolve_root(root)?;
        let min_size = mb_to_bytes(min_size_mb);
        let max = self.config.max_large_files;
        let outcome = self.run(ScanMode::LargeFiles, Some(&root), |token| {
            self.pool
                .install(|| find_large_files(&root, min_size, max, token, &self.bus))
        })?;
        if let ScanOutcome::Completed(result) = &outcome {
            *self.last_large_files.lock() = Some(result.clone());
        }
        Ok(outcome)
    }

    pub fn find_duplicates(&self, root: Option<&Path>) -> Result<ScanOutcome<DuplicatesResult>> {
        let root = self.resolve_root(root)?;
        let outcome = self.run(ScanMode::Duplicates, Some(&root), |token| {
            self.duplicates
                .find_duplicates(&root, &self.config.duplicates, token, &self.bus)
        })?;
        if let ScanOutcome::Completed(result) = &outcome {
            *self.last_duplicates.lock() = Some(result.clone());
        }
        Ok(outcome)
    }

    pub fn find_dependency_dirs(
        &self,
        root: Option<&Path>,
    ) -> Result<ScanOutcome<DependencyDirsResult>> {
        let root = self.resolve_root(root)?;
        let depth = self.config.dependency_depth;
        let outcome = self.run(ScanMode::DependencyDirs, Some(&root), |token| {
            find_dependency_dirs(&root, depth, &self.pool, token, &self.bus)
        })?;
        if let ScanOutcome::Completed(result) = &outcome {
            *self.last_dependency_dirs.lock() = Some(result.clone());
        }
        Ok(outcome)
    }

    pub fn disk_trends(&self) -> TrendsResult {
        self.trends.trends()
    }

    pub fn growth_alerts(&self, mb_per_day: f64) -> Vec<DiskUsageTrend> {
        self.trends.growth_alerts(mb_per_day * MIB as f64)
    }

    pub fn clear_trends_history(&self) -> Result<()> {
        self.trends.clear()
    }

    /// Recommendations from the latest cached dev scan (full, else quick),
    /// trends, and the most recent searches of this session.
    pub fn recommendations(&self) -> RecommendationsResult {
        let dev = self
            .cached_dev_scan()
            .or_else(|| self.cached_quick_scan())
            .map(|c| c.result);
        let trends = self.disk_trends();
        let duplicates = self.last_duplicates.lock().clone();
        let large_files = self.last_large_files.lock().clone();
        let dependency_dirs = self.last_dependency_dirs.lock().clone();

        let mut inputs = RecommendationInputs::new(Utc::now());
        inputs.dev_scan = dev.as_ref();
        inputs.trends = (trends.snapshot_count >= 2).then_some(&trends);
        inputs.duplicates = duplicates.as_ref();
        inputs.large_files = large_files.as_ref();
        inputs.dependency_dirs = dependency_dirs.as_ref();
        recommend(&inputs)
    }

    // ── Helpers ─────────────────────────────────────────────────

    fn resolve_root(&self, root: Option<&Path>) -> Result<PathBuf> {
        let root = match root {
            Some(root) => root.to_path_buf(),
            None => self
                .config
                .resolved_default_root()
                .ok_or(EngineError::NoHomeDirectory)?,
        };
        require_directory(&root)?;
        Ok(root)
    }

    /// Run one fallible, cancellable scan between `begin_scan` and
    /// `finish_scan`.
    fn run<T: ScanSummary>(
        &self,
        mode: ScanMode,
        root: Option<&Path>,
        op: impl FnOnce(&CancelToken) -> Result<ScanOutcome<T>>,
    ) -> Result<ScanOutcome<T>> {
        let running = self.begin_scan(mode, root);
        let outcome = op(&running.token);
        self.finish_scan(running, outcome.as_ref());
        outcome
    }

    fn begin_scan(&self, mode: ScanMode, root: Option<&Path>) -> RunningScan {
        self.bus.emit(ProgressEvent::ScanStarted {
            mode,
            root: root.map(|r| r.to_string_lossy().into_owned()),
        });
        RunningScan {
            mode,
            token: self.scans.begin(),
            start: Instant::now(),
        }
    }

    fn finish_scan<T: ScanSummary>(
        &self,
        running: RunningScan,
        outcome: std::result::Result<&ScanOutcome<T>, &EngineError>,
    ) {
        self.scans.end(&running.token);
        let mode = running.mode;
        match outcome {
            Ok(ScanOutcome::Completed(result)) => {
                info!("{} scan completed in {:?}", mode.label(), running.start.elapsed());
                self.bus.emit(ProgressEvent::ScanCompleted {
                    mode,
                    total_size: result.total_size(),
                    duration_ms: result.duration_ms(),
                });
            }
            Ok(ScanOutcome::Cancelled(_)) => {
                info!("{} scan cancelled", mode.label());
                self.bus.emit(ProgressEvent::ScanCancelled { mode });
            }
            // Only reachable after the root was validated, e.g. when it
            // disappears before it can be listed.
            Err(err) => {
                warn!("{} scan failed: {err}", mode.label());
                self.bus.emit(ProgressEvent::ScanFailed {
                    mode,
                    message: err.to_string(),
                });
            }
        }
    }

    fn save_cache<T: Serialize>(&self, mode: ScanMode, result: &T) {
        if let Err(err) = self.cache.save(mode, result) {
            warn!("Could not cache {} scan: {err}", mode.label());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CategoryDef, PlatformKind};
    use tempfile::TempDir;

    fn engine(tmp: &TempDir) -> Engine {
        let config = EngineConfig {
            workers: 2,
            data_dir: Some(tmp.path().join("data")),
            default_root: Some(tmp.path().to_path_buf()),
            ..Default::default()
        };
        let catalog = CategoryCatalog::new(
            PlatformKind::Linux,
            vec![CategoryDef::leaf("npm", "npm", vec![tmp.path().join("npm")]).quick()],
        )
        .unwrap();
        Engine::with_catalog(config, catalog).unwrap()
    }

    #[test]
    fn bus_drops_disconnected_subscribers() {
        let bus = EventBus::default();
        let kept = bus.subscribe();
        let dropped = bus.subscribe();
        assert_ne!(kept.id, dropped.id);
        drop(dropped);

        bus.emit(ProgressEvent::ScanCancelled { mode: ScanMode::Dev });
        assert_eq!(bus.subscriber_count(), 1);
        assert!(kept.receiver.try_recv().is_ok());
        assert!(bus.unsubscribe(kept.id));
        assert!(!bus.unsubscribe(kept.id));
    }

    #[test]
    fn cancel_reaches_only_running_operations() {
        let tokens = ActiveTokens::default();
        let a = tokens.begin();
        let b = tokens.begin();
        tokens.end(&a);
        assert_eq!(tokens.cancel_all(), 1);
        assert!(!a.is_cancelled());
        assert!(b.is_cancelled());
    }

    #[test]
    fn unknown_category_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let err = engine(&tmp).clean_categories(&["nope".to_string()]);
        assert!(matches!(err, Err(EngineError::UnknownCategory(id)) if id == "nope"));
    }

    #[test]
    fn bad_keep_index_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let group = DuplicateGroup::new("h".into(), 1, Vec::new());
        let err = engine(&tmp).delete_duplicate_group(&group, 0, true);
        assert!(matches!(err, Err(EngineError::InvalidKeepIndex { index: 0, len: 0 })));
    }

    #[test]
    fn missing_root_fails_before_any_event() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp);
        let sub = engine.subscribe();
        let err = engine.scan_normal(Some(&tmp.path().join("gone")));
        assert!(matches!(err, Err(EngineError::PathNotFound(_))));
        assert!(sub.receiver.try_recv().is_err());
    }

    #[test]
    fn failed_scan_is_not_reported_as_cancelled() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp);
        let sub = engine.subscribe();
        let gone = tmp.path().join("gone");

        let running = engine.begin_scan(ScanMode::Normal, Some(&gone));
        let err = EngineError::PathNotFound(gone.clone());
        engine.finish_scan::<FullScanResult>(running, Err(&err));

        let events: Vec<ProgressEvent> = sub.receiver.try_iter().collect();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], ProgressEvent::ScanStarted { .. }));
        match &events[1] {
            ProgressEvent::ScanFailed { mode, message } => {
                assert_eq!(*mode, ScanMode::Normal);
                assert_eq!(message, &err.to_string());
            }
            other => panic!("expected a failure event, got {other:?}"),
        }
        // The token is released like any finished scan.
        assert_eq!(engine.scans.cancel_all(), 0);
    }
}
