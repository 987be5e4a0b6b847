/// Human-readable rendering of engine results. `--json` bypasses all of this.
use chrono::{DateTime, Utc};
use cleansleuth_core::analysis::{DependencyDirsResult, LargeFilesResult};
use cleansleuth_core::model::size::{format_count, format_rate, format_size};
use cleansleuth_core::model::{
    Category, CleanResult, DevScanResult, DiskUsageTrend, DuplicatesResult, FileNode,
    FullScanResult, RecommendationsResult, TrendsResult,
};
use serde::Serialize;

/// Groups listed before the rest are summarised.
const MAX_GROUPS_SHOWN: usize = 20;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_dev_scan(result: &DevScanResult, saved_at: Option<DateTime<Utc>>) {
    if let Some(saved_at) = saved_at {
        println!("Cached {} scan from {}", result.mode.label(), saved_at.format("%Y-%m-%d %H:%M"));
    }
    for category in &result.categories {
        print_category(category, 0);
    }
    println!(
        "\nTotal: {} in {} items ({} ms)",
        format_size(result.total_size),
        format_count(result.total_items),
        result.duration_ms
    );
}

fn print_category(category: &Category, depth: usize) {
    if category.size == 0 && depth > 0 {
        return;
    }
    let indent = "  ".repeat(depth);
    println!(
        "{indent}{:<28} {:>10}  {:>9} items  [{}]",
        category.name,
        format_size(category.size),
        format_count(category.item_count),
        category.id
    );
    for child in &category.children {
        print_category(child, depth + 1);
    }
}

pub fn print_tree(result: &FullScanResult) {
    println!(
        "{}  {}  ({} items, {} ms)",
        result.root.path.display(),
        format_size(result.total_size),
        format_count(result.total_items),
        result.duration_ms
    );
    if let Some(children) = &result.root.children {
        print_children(children, result.total_size);
    }
}

pub fn print_children(children: &[FileNode], parent_size: u64) {
    for node in children {
        let marker = if node.is_dir { "/" } else { "" };
        println!(
            "  {:>10}  {:>5.1}%  {}{marker}",
            format_size(node.size),
            node.percent_of(parent_size),
            node.name
        );
    }
}

pub fn print_large_files(result: &LargeFilesResult) {
    for file in &result.files {
        println!("{:>10}  {}", format_size(file.size), file.path.display());
    }
    println!(
        "\n{} files of at least {} ({} listed, {} total)",
        result.total_count,
        format_size(result.threshold),
        result.files.len(),
        format_size(result.total_size)
    );
}

pub fn print_duplicates(result: &DuplicatesResult) {
    for (i, group) in result.groups.iter().take(MAX_GROUPS_SHOWN).enumerate() {
        println!(
            "#{} {} x {} ({} wasted)",
            i + 1,
            group.files.len(),
            format_size(group.size),
            format_size(group.wasted_size)
        );
        for (j, file) in group.files.iter().enumerate() {
            let keep = if j == 0 { "*" } else { " " };
            println!("   {keep} {}", file.path.display());
        }
    }
    if result.groups.len() > MAX_GROUPS_SHOWN {
        println!("   ... and {} more groups", result.groups.len() - MAX_GROUPS_SHOWN);
    }
    println!(
        "\n{} groups, {} wasted ({} files scanned, {} hashed)",
        result.total_groups,
        format_size(result.total_wasted),
        format_count(result.files_scanned),
        format_count(result.files_hashed)
    );
}

pub fn print_dependency_dirs(result: &DependencyDirsResult) {
    for dir in &result.dirs {
        let age = dir
            .last_modified
            .map(|t| format!("{}d", (Utc::now() - t).num_days()))
            .unwrap_or_else(|| "-".into());
        println!(
            "{:>10}  {:<13} {:>5}  {}",
            format_size(dir.size),
            dir.kind.label(),
            age,
            dir.path.display()
        );
    }
    println!("\n{} directories, {}", result.dirs.len(), format_size(result.total_size));
}

pub fn print_trends(result: &TrendsResult) {
    if result.snapshot_count < 2 {
        println!(
            "{} snapshot(s) recorded; run `cleansleuth dev` again later to see trends",
            result.snapshot_count
        );
        return;
    }
    if let (Some(first), Some(last)) = (result.first_snapshot, result.last_snapshot) {
        println!(
            "{} snapshots, {} to {}",
            result.snapshot_count,
            first.format("%Y-%m-%d"),
            last.format("%Y-%m-%d")
        );
    }
    print_trend_rows(std::iter::once(&result.total).chain(&result.trends));
}

pub fn print_alerts(alerts: &[DiskUsageTrend]) {
    if alerts.is_empty() {
        println!("Nothing is growing that fast");
        return;
    }
    print_trend_rows(alerts);
}

fn print_trend_rows<'a>(rows: impl IntoIterator<Item = &'a DiskUsageTrend>) {
    for trend in rows {
        println!(
            "{:<24} {:>10}  {:>16}",
            trend.category_id,
            format_size(trend.latest_size()),
            format_rate(trend.growth_rate)
        );
    }
}

pub fn print_recommendations(result: &RecommendationsResult) {
    if result.is_empty() {
        println!("No recommendations. Run `cleansleuth dev` first for cache suggestions.");
        return;
    }
    for rec in result.recommendations() {
        println!("[{:>3}] {} ({})", rec.priority, rec.title, format_size(rec.size));
        println!("      {}", rec.description);
        if let Some(id) = &rec.category_id {
            println!("      cleansleuth clean {id}");
        }
    }
    println!(
        "\n{} recommendations, {} high priority, up to {} reclaimable",
        result.recommendations().len(),
        result.high_priority_count(),
        format_size(result.total_savings())
    );
}

pub fn print_clean(result: &CleanResult) {
    for path in &result.deleted_paths {
        println!("  removed  {}", path.display());
    }
    for path in &result.skipped_paths {
        println!("  skipped  {}", path.display());
    }
    for err in &result.errors {
        println!("  failed   {}: {}", err.path.display(), err.message);
    }
    let status = if result.is_cancelled() { "Cancelled" } else { "Done" };
    println!(
        "\n{status}: freed {} ({} removed, {} errors)",
        format_size(result.freed_bytes),
        result.deleted_paths.len(),
        result.errors.len()
    );
}
