/// End-to-end duplicate detection and duplicate-group deletion.
use cleansleuth_core::analysis::{DuplicateDetector, DuplicateOptions};
use cleansleuth_core::catalog::{CategoryCatalog, PlatformKind};
use cleansleuth_core::model::DuplicatesResult;
use cleansleuth_core::scanner::progress::NoProgress;
use cleansleuth_core::scanner::{build_pool, CancelToken};
use cleansleuth_core::{Engine, EngineConfig};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

// ── Helpers ──────────────────────────────────────────────────────────────────

/// A visible working directory inside the temp dir; temp dir names start
/// with a dot and hidden entries are skipped by the search.
fn work_dir(tmp: &TempDir) -> PathBuf {
    let root = tmp.path().join("work");
    fs::create_dir_all(&root).unwrap();
    root
}

fn write_file(path: &Path, content: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn set_age(path: &Path, days_ago: u64) {
    let when = SystemTime::now() - Duration::from_secs(days_ago * 86_400);
    fs::File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(when)
        .unwrap();
}

fn search(root: &Path, options: &DuplicateOptions) -> DuplicatesResult {
    DuplicateDetector::new(build_pool(2).unwrap())
        .find_duplicates(root, options, &CancelToken::new(), &NoProgress)
        .unwrap()
        .completed()
        .expect("search should complete")
}

// ── Detection ────────────────────────────────────────────────────────────────

#[test]
fn identical_files_form_one_group() {
    let tmp = TempDir::new().unwrap();
    let root = work_dir(&tmp);
    write_file(&root.join("a.bin"), &[7u8; 100]);
    write_file(&root.join("nested/b.bin"), &[7u8; 100]);
    write_file(&root.join("unique.bin"), &[9u8; 55]);

    let result = search(&root, &DuplicateOptions::default());

    assert_eq!(result.total_groups, 1);
    assert_eq!(result.total_wasted, 100);
    let group = &result.groups[0];
    assert_eq!(group.size, 100);
    assert_eq!(group.files.len(), 2);
    assert!(group.files.iter().all(|f| f.hash == group.hash));
    // The lone 55-byte file never reaches the hashing phase.
    assert_eq!(result.files_hashed, 2);
}

#[test]
fn cancelled_search_reads_no_directory() {
    let tmp = TempDir::new().unwrap();
    let root = work_dir(&tmp);
    write_file(&root.join("a.bin"), &[7u8; 100]);
    write_file(&root.join("nested/b.bin"), &[7u8; 100]);

    let cancel = CancelToken::new();
    cancel.cancel();
    let outcome = DuplicateDetector::new(build_pool(2).unwrap())
        .find_duplicates(&root, &DuplicateOptions::default(), &cancel, &NoProgress)
        .unwrap();

    assert!(outcome.is_cancelled());
    let partial = outcome.into_inner();
    assert!(partial.groups.is_empty());
    assert_eq!(partial.files_hashed, 0);
}

#[test]
fn same_size_different_content_is_not_a_group() {
    let tmp = TempDir::new().unwrap();
    let root = work_dir(&tmp);
    write_file(&root.join("a"), &[1u8; 64]);
    write_file(&root.join("b"), &[2u8; 64]);

    let result = search(&root, &DuplicateOptions::default());
    assert!(result.groups.is_empty());
    assert_eq!(result.total_wasted, 0);
    assert_eq!(result.files_hashed, 2);
}

#[test]
fn excluded_and_hidden_directories_are_skipped() {
    let tmp = TempDir::new().unwrap();
    let root = work_dir(&tmp);
    write_file(&root.join("keep.txt"), b"payload");
    write_file(&root.join("node_modules/pkg/keep.txt"), b"payload");
    write_file(&root.join(".hidden/keep.txt"), b"payload");

    assert!(search(&root, &DuplicateOptions::default()).groups.is_empty());

    let options = DuplicateOptions {
        exclude: Vec::new(),
        ..Default::default()
    };
    let result = search(&root, &options);
    assert_eq!(result.groups.len(), 1);
    assert_eq!(result.groups[0].files.len(), 2);
}

#[test]
fn groups_are_ordered_by_waste_and_capped() {
    let tmp = TempDir::new().unwrap();
    let root = work_dir(&tmp);
    for name in ["s1", "s2"] {
        write_file(&root.join(name), &[3u8; 10]);
    }
    for name in ["l1", "l2", "l3"] {
        write_file(&root.join(name), &[4u8; 1_000]);
    }

    let options = DuplicateOptions {
        max_groups: Some(1),
        ..Default::default()
    };
    let result = search(&root, &options);
    assert_eq!(result.total_groups, 2);
    assert_eq!(result.total_wasted, 2_000 + 10);
    assert_eq!(result.groups.len(), 1);
    assert_eq!(result.groups[0].wasted_size, 2_000);
}

// ── Deletion ─────────────────────────────────────────────────────────────────

#[test]
fn deleting_a_group_keeps_the_oldest_copy() {
    let tmp = TempDir::new().unwrap();
    let root = work_dir(&tmp);
    let old = root.join("old.dat");
    let mid = root.join("mid.dat");
    let new = root.join("new.dat");
    for path in [&new, &mid, &old] {
        write_file(path, &[5u8; 4_096]);
    }
    set_age(&old, 30);
    set_age(&mid, 10);
    set_age(&new, 1);

    let config = EngineConfig {
        workers: 2,
        data_dir: Some(tmp.path().join("data")),
        ..Default::default()
    };
    let catalog = CategoryCatalog::new(PlatformKind::Linux, Vec::new()).unwrap();
    let engine = Engine::with_catalog(config, catalog).unwrap();

    let found = engine
        .find_duplicates(Some(&root))
        .unwrap()
        .completed()
        .unwrap();
    let group = &found.groups[0];
    assert_eq!(group.files[0].path, old);

    let result = engine.delete_duplicate_group(group, 0, true).unwrap();
    assert_eq!(result.deleted_paths.len(), 2);
    assert!(result.errors.is_empty());
    assert!(result.freed_bytes > 0);
    assert!(old.exists());
    assert!(!mid.exists());
    assert!(!new.exists());
}
