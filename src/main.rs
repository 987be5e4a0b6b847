//! CleanSleuth: find and reclaim disk space from the command line.
//!
//! Thin binary entry point. All logic lives in the `cleansleuth-core`
//! crate; this file maps subcommands onto [`Engine`] calls and renders
//! their results.

mod cli;
mod output;
mod progress;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use cleansleuth_core::model::size::format_size;
use cleansleuth_core::model::CleanResult;
use cleansleuth_core::scanner::ScanOutcome;
use cleansleuth_core::{Engine, EngineConfig};
use cli::{Cli, Commands};
use progress::ProgressPrinter;
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

/// Minimum size for the large-file search behind `recommend --deep`.
const DEEP_LARGE_FILE_MB: u64 = 500;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    tracing::info!("CleanSleuth starting");

    let Some(command) = cli.command.as_ref() else {
        Cli::command().print_long_help()?;
        return Ok(());
    };

    let config = load_config(&cli, command)?;
    let engine = Arc::new(Engine::new(config).context("failed to start engine")?);
    install_interrupt_handler(&engine)?;

    let printer = (!cli.quiet && !cli.json).then(|| ProgressPrinter::start(&engine));
    let result = run(&cli, command, &engine);
    if let Some(printer) = printer {
        printer.stop(&engine);
    }
    result
}

fn load_config(cli: &Cli, command: &Commands) -> anyhow::Result<EngineConfig> {
    let mut config = match cli.config.clone().or_else(EngineConfig::default_path) {
        Some(path) => EngineConfig::load(&path)
            .with_context(|| format!("invalid config file {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = Some(dir.clone());
    }
    if let Some(workers) = cli.workers {
        config.workers = workers;
    }
    match command {
        Commands::Dupes {
            min_size,
            max_groups,
            ..
        } => {
            if let Some(min_size) = min_size {
                config.duplicates.min_size = *min_size;
            }
            if max_groups.is_some() {
                config.duplicates.max_groups = *max_groups;
            }
        }
        Commands::Deps {
            depth: Some(depth), ..
        } => config.dependency_depth = *depth,
        Commands::Clean { permanent: true, .. } => config.permanent_delete = true,
        _ => {}
    }
    Ok(config)
}

fn run(cli: &Cli, command: &Commands, engine: &Engine) -> anyhow::Result<()> {
    let json = cli.json;
    match command {
        Commands::Dev => {
            let outcome = engine.scan_dev();
            show(json, outcome, |r| output::print_dev_scan(r, None))
        }
        Commands::Quick => {
            let outcome = engine.quick_scan_dev();
            show(json, outcome, |r| output::print_dev_scan(r, None))
        }
        Commands::Cached => {
            let cached = engine
                .cached_dev_scan()
                .or_else(|| engine.cached_quick_scan());
            match cached {
                Some(cached) if json => output::print_json(&cached),
                Some(cached) => {
                    output::print_dev_scan(&cached.result, Some(cached.saved_at));
                    Ok(())
                }
                None => {
                    println!("No cached scan. Run `cleansleuth dev` or `cleansleuth quick`.");
                    Ok(())
                }
            }
        }
        Commands::Scan { path } => {
            let outcome = engine.scan_normal(path.as_deref())?;
            show(json, outcome, output::print_tree)
        }
        Commands::Large { min_mb, path } => {
            let outcome = engine.find_large_files(*min_mb, path.as_deref())?;
            show(json, outcome, output::print_large_files)
        }
        Commands::Dupes { path, .. } => {
            let outcome = engine.find_duplicates(path.as_deref())?;
            show(json, outcome, output::print_duplicates)
        }
        Commands::Deps { path, .. } => {
            let outcome = engine.find_dependency_dirs(path.as_deref())?;
            show(json, outcome, output::print_dependency_dirs)
        }
        Commands::Trends => {
            let trends = engine.disk_trends();
            if json {
                return output::print_json(&trends);
            }
            output::print_trends(&trends);
            Ok(())
        }
        Commands::Alerts { mb_per_day } => {
            let alerts = engine.growth_alerts(*mb_per_day);
            if json {
                return output::print_json(&alerts);
            }
            output::print_alerts(&alerts);
            Ok(())
        }
        Commands::ClearTrends => {
            engine.clear_trends_history()?;
            println!("Trend history cleared");
            Ok(())
        }
        Commands::Recommend { deep } => {
            if let Some(root) = deep {
                deep_search(engine, root)?;
            }
            let result = engine.recommendations();
            if json {
                return output::print_json(&result);
            }
            output::print_recommendations(&result);
            Ok(())
        }
        Commands::Clean {
            ids,
            permanent,
            yes,
        } => {
            let names = ids
                .iter()
                .map(|id| match engine.catalog().find(id) {
                    Some(def) => Ok(def.name.clone()),
                    None => Err(anyhow::anyhow!("unknown category `{id}`")),
                })
                .collect::<anyhow::Result<Vec<_>>>()?;
            let prompt = format!(
                "{} {}?",
                verb(*permanent || engine.config().permanent_delete),
                names.join(", ")
            );
            if !confirmed(*yes, &prompt)? {
                return Ok(());
            }
            let result = engine.clean_categories(ids)?;
            finish_clean(json, &result)
        }
        Commands::Delete {
            path,
            permanent,
            yes,
        } => {
            let prompt = format!("{} {}?", verb(*permanent), path.display());
            if !confirmed(*yes, &prompt)? {
                return Ok(());
            }
            let result = engine.delete_path(path, *permanent);
            finish_clean(json, &result)
        }
        Commands::DeleteDupes {
            path,
            keep,
            permanent,
            yes,
        } => delete_duplicates(engine, path.as_deref(), *keep, *permanent, *yes, json),
        Commands::Categories => {
            let catalog = engine.catalog();
            if json {
                return output::print_json(&catalog.all_ids());
            }
            println!("Platform: {}", catalog.platform().label());
            for def in catalog.entries() {
                for (depth, entry) in def.iter().enumerate().map(|(i, e)| (usize::from(i > 0), e)) {
                    println!("{}{:<24} {}", "  ".repeat(depth), entry.id, entry.name);
                }
            }
            Ok(())
        }
    }
}

/// Ctrl-C cancels whatever scan or clean is running so the command can
/// print its partial result. With nothing running it exits right away.
fn install_interrupt_handler(engine: &Arc<Engine>) -> anyhow::Result<()> {
    let engine = Arc::clone(engine);
    ctrlc::set_handler(move || {
        let signalled = engine.cancel_scan() + engine.cancel_clean();
        if signalled == 0 {
            std::process::exit(130);
        }
        tracing::info!("Interrupt: cancelling {signalled} running operations");
    })
    .context("failed to install Ctrl-C handler")
}

/// Print a completed or cancelled result; a cancelled one is marked partial.
fn show<T: Serialize>(
    json: bool,
    outcome: ScanOutcome<T>,
    render: impl FnOnce(&T),
) -> anyhow::Result<()> {
    let cancelled = outcome.is_cancelled();
    let value = outcome.into_inner();
    if json {
        output::print_json(&value)?;
    } else {
        render(&value);
    }
    if cancelled {
        eprintln!("Scan cancelled; results are partial");
    }
    Ok(())
}

/// Run the searches recommendations can draw on beyond the dev scan.
fn deep_search(engine: &Engine, root: &Path) -> anyhow::Result<()> {
    engine.find_duplicates(Some(root))?;
    engine.find_large_files(DEEP_LARGE_FILE_MB, Some(root))?;
    engine.find_dependency_dirs(Some(root))?;
    Ok(())
}

fn delete_duplicates(
    engine: &Engine,
    root: Option<&Path>,
    keep: usize,
    permanent: bool,
    yes: bool,
    json: bool,
) -> anyhow::Result<()> {
    let outcome = engine.find_duplicates(root)?;
    if outcome.is_cancelled() {
        eprintln!("Search cancelled; nothing deleted");
        return Ok(());
    }
    let found = outcome.into_inner();
    if found.groups.is_empty() {
        println!("No duplicates found");
        return Ok(());
    }
    if !json {
        output::print_duplicates(&found);
    }
    let prompt = format!(
        "{} all but copy #{keep} in {} groups ({})?",
        verb(permanent),
        found.groups.len(),
        format_size(found.total_wasted)
    );
    if !confirmed(yes, &prompt)? {
        return Ok(());
    }

    let mut total = CleanResult::new();
    for group in &found.groups {
        match engine.delete_duplicate_group(group, keep, permanent) {
            Ok(result) => {
                let cancelled = result.is_cancelled();
                total.freed_bytes += result.freed_bytes;
                total.deleted_paths.extend(result.deleted_paths);
                total.skipped_paths.extend(result.skipped_paths);
                total.errors.extend(result.errors);
                if cancelled {
                    total.status = result.status;
                    break;
                }
            }
            Err(err) => eprintln!("Skipping group {}: {err}", group.hash),
        }
    }
    finish_clean(json, &total)
}

fn finish_clean(json: bool, result: &CleanResult) -> anyhow::Result<()> {
    if json {
        output::print_json(result)?;
    } else {
        output::print_clean(result);
    }
    if result.has_errors() {
        anyhow::bail!("{} paths could not be removed", result.errors.len());
    }
    Ok(())
}

fn verb(permanent: bool) -> &'static str {
    if permanent {
        "Permanently delete"
    } else {
        "Move to trash"
    }
}

fn confirmed(yes: bool, prompt: &str) -> io::Result<bool> {
    if yes {
        return Ok(true);
    }
    prompt_confirm(prompt)
}

fn prompt_confirm(prompt: &str) -> io::Result<bool> {
    let mut input = String::new();
    loop {
        input.clear();
        print!("{prompt} (y/N): ");
        io::stdout().flush()?;
        if io::stdin().read_line(&mut input)? == 0 {
            return Ok(false);
        }
        match input.trim().to_uppercase().as_str() {
            "Y" | "YES" => return Ok(true),
            "N" | "NO" | "" => return Ok(false),
            _ => continue,
        }
    }
}
