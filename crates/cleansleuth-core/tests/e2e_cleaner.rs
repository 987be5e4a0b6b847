/// End-to-end cleaner tests: per-item error capture, idempotence, and the
/// category path through the engine.
use cleansleuth_core::catalog::{CategoryCatalog, CategoryDef, PlatformKind};
use cleansleuth_core::cleaner::{Cleaner, FsRemover, Remover};
use cleansleuth_core::model::{CleanErrorCode, CleanStatus};
use cleansleuth_core::scanner::progress::{NoProgress, ProgressEvent};
use cleansleuth_core::scanner::{walker, CancelToken};
use cleansleuth_core::{Engine, EngineConfig};
use crossbeam_channel::{Receiver, Sender};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use tempfile::TempDir;

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Removes permanently, except for one path it refuses.
struct RefusingRemover {
    refuse: PathBuf,
}

impl Remover for RefusingRemover {
    fn remove(&self, path: &Path, permanent: bool) -> io::Result<()> {
        if path == self.refuse {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "refused"));
        }
        FsRemover.remove(path, permanent)
    }
}

/// Removes permanently, then reports the path and waits for a go-ahead
/// before returning.
struct GatedRemover {
    removed: Sender<PathBuf>,
    resume: Receiver<()>,
}

impl Remover for GatedRemover {
    fn remove(&self, path: &Path, permanent: bool) -> io::Result<()> {
        FsRemover.remove(path, permanent)?;
        let _ = self.removed.send(path.to_path_buf());
        let _ = self.resume.recv();
        Ok(())
    }
}

fn make_dir_with_file(dir: &Path, bytes: usize) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join("blob"), vec![0u8; bytes]).unwrap();
}

fn measured(path: &Path) -> u64 {
    walker::walk(path, &CancelToken::new()).into_inner().size
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[test]
fn one_failure_does_not_stop_the_rest() {
    let tmp = TempDir::new().unwrap();
    let targets: Vec<PathBuf> = ["one", "two", "three"]
        .iter()
        .map(|n| tmp.path().join(n))
        .collect();
    for target in &targets {
        make_dir_with_file(target, 8_192);
    }
    let sizes: Vec<u64> = targets.iter().map(|t| measured(t)).collect();
    assert!(sizes.iter().all(|&s| s > 0));
    let cleaner = Cleaner::new(Box::new(RefusingRemover {
        refuse: targets[1].clone(),
    }));

    let (tx, rx) = crossbeam_channel::unbounded();
    let result = cleaner.clean(targets.clone(), true, &CancelToken::new(), &tx);
    drop(tx);

    assert_eq!(result.status, CleanStatus::Completed);
    assert_eq!(result.deleted_paths, [targets[0].clone(), targets[2].clone()]);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].path, targets[1]);
    assert_eq!(result.errors[0].code, CleanErrorCode::PermissionDenied);
    assert_eq!(result.freed_bytes, sizes[0] + sizes[2]);
    assert!(!targets[0].exists());
    assert!(targets[1].exists());
    assert!(!targets[2].exists());

    let events: Vec<ProgressEvent> = rx.iter().collect();
    assert_eq!(events.first(), Some(&ProgressEvent::CleanStarted { total: 3 }));
    assert!(matches!(
        events.last(),
        Some(ProgressEvent::CleanCompleted {
            deleted: 2,
            error_count: 1,
            ..
        })
    ));
}

#[test]
fn cleaning_twice_frees_nothing_the_second_time() {
    let tmp = TempDir::new().unwrap();
    let target = tmp.path().join("cache");
    make_dir_with_file(&target, 4_096);
    let cleaner = Cleaner::new(Box::new(FsRemover));

    let first = cleaner.clean(vec![target.clone()], true, &CancelToken::new(), &NoProgress);
    assert!(first.freed_bytes > 0);

    let second = cleaner.clean(vec![target.clone()], true, &CancelToken::new(), &NoProgress);
    assert_eq!(second.freed_bytes, 0);
    assert!(second.deleted_paths.is_empty());
    assert_eq!(second.skipped_paths, [target]);
    assert!(second.errors.is_empty());
}

#[test]
fn cleaning_a_group_category_removes_every_child_path() {
    let tmp = TempDir::new().unwrap();
    let mods = tmp.path().join("gomod");
    let build = tmp.path().join("gobuild");
    let other = tmp.path().join("npm");
    for dir in [&mods, &build, &other] {
        make_dir_with_file(dir, 2_048);
    }

    let config = EngineConfig {
        workers: 2,
        data_dir: Some(tmp.path().join("data")),
        permanent_delete: true,
        ..Default::default()
    };
    let catalog = CategoryCatalog::new(
        PlatformKind::Linux,
        vec![
            CategoryDef::group(
                "go",
                "Go",
                vec![
                    CategoryDef::leaf("go-mod", "Modules", vec![mods.clone()]),
                    CategoryDef::leaf("go-build", "Build cache", vec![build.clone()]),
                ],
            ),
            CategoryDef::leaf("npm", "npm", vec![other.clone()]),
        ],
    )
    .unwrap();
    let engine = Engine::with_catalog(config, catalog).unwrap();

    let result = engine.clean_categories(&["go".to_string()]).unwrap();
    assert_eq!(result.deleted_paths.len(), 2);
    assert!(!mods.exists());
    assert!(!build.exists());
    assert!(other.exists());
}

#[test]
fn cancel_mid_clean_keeps_what_was_already_freed() {
    let tmp = TempDir::new().unwrap();
    let first = tmp.path().join("first");
    let second = tmp.path().join("second");
    let third = tmp.path().join("third");
    for dir in [&first, &second, &third] {
        make_dir_with_file(dir, 16_384);
    }
    let first_size = measured(&first);

    let (removed_tx, removed_rx) = crossbeam_channel::unbounded();
    let (resume_tx, resume_rx) = crossbeam_channel::unbounded();
    let config = EngineConfig {
        workers: 2,
        data_dir: Some(tmp.path().join("data")),
        permanent_delete: true,
        ..Default::default()
    };
    let catalog = CategoryCatalog::new(
        PlatformKind::Linux,
        vec![
            CategoryDef::leaf("first", "First", vec![first.clone()]),
            CategoryDef::leaf("second", "Second", vec![second.clone()]),
            CategoryDef::leaf("third", "Third", vec![third.clone()]),
        ],
    )
    .unwrap();
    let engine = Engine::with_parts(
        config,
        catalog,
        Box::new(GatedRemover {
            removed: removed_tx,
            resume: resume_rx,
        }),
    )
    .unwrap();
    let sub = engine.subscribe();

    let ids = ["first", "second", "third"].map(String::from);
    let result = thread::scope(|s| {
        let cleaning = s.spawn(|| engine.clean_categories(&ids).unwrap());
        // The first target is gone; stop before the second one starts.
        let gone = removed_rx.recv().unwrap();
        assert_eq!(gone, first);
        engine.cancel_clean();
        drop(resume_tx);
        cleaning.join().unwrap()
    });

    assert_eq!(result.status, CleanStatus::Cancelled);
    assert_eq!(result.deleted_paths, [first.clone()]);
    assert_eq!(result.freed_bytes, first_size);
    assert!(result.errors.is_empty());
    assert!(!first.exists());
    assert!(second.exists());
    assert!(third.exists());

    let events: Vec<ProgressEvent> = sub.receiver.try_iter().collect();
    assert_eq!(
        events.last(),
        Some(&ProgressEvent::CleanCancelled {
            freed_bytes: first_size
        })
    );
    assert!(!events
        .iter()
        .any(|e| matches!(e, ProgressEvent::CleanCompleted { .. })));
}
