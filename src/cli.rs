use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "cleansleuth", version)]
#[command(about = "Find and reclaim disk space: developer caches, duplicates, large files", long_about = None)]
pub struct Cli {
    /// Config file (JSON). Defaults to the platform config directory.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory for caches and trend history.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Worker threads (0 = automatic).
    #[arg(long, global = true)]
    pub workers: Option<usize>,

    /// Print results as JSON instead of tables.
    #[arg(long, global = true)]
    pub json: bool,

    /// More logging on stderr (-v info, -vv debug).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Hide the live progress line.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan every developer cache category
    Dev,
    /// Scan the quick subset of developer caches
    Quick,
    /// Show the last cached dev scan without rescanning
    Cached,
    /// Size the immediate children of a directory
    Scan {
        /// Directory to scan (defaults to the home directory)
        path: Option<PathBuf>,
    },
    /// List files of at least a given size
    Large {
        /// Minimum size in MB
        #[arg(long, default_value_t = 100)]
        min_mb: u64,
        path: Option<PathBuf>,
    },
    /// Find duplicate files by content
    Dupes {
        path: Option<PathBuf>,
        /// Ignore files smaller than this many bytes
        #[arg(long)]
        min_size: Option<u64>,
        /// Show at most this many groups
        #[arg(long)]
        max_groups: Option<usize>,
    },
    /// Find node_modules, Cargo target and other regenerable directories
    Deps {
        path: Option<PathBuf>,
        /// How deep below the root to look
        #[arg(long)]
        depth: Option<usize>,
    },
    /// Show growth trends from past dev scans
    Trends,
    /// Categories growing faster than a threshold
    Alerts {
        /// Threshold in MB per day
        #[arg(long, default_value_t = 100.0)]
        mb_per_day: f64,
    },
    /// Forget all recorded trend snapshots
    ClearTrends,
    /// Suggest what to clean
    Recommend {
        /// Also search for duplicates, large files and dependency dirs under this root
        #[arg(long)]
        deep: Option<PathBuf>,
    },
    /// Clean developer cache categories by id
    Clean {
        #[arg(required = true)]
        ids: Vec<String>,
        /// Delete instead of moving to the trash
        #[arg(long)]
        permanent: bool,
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Delete a single file or directory
    Delete {
        path: PathBuf,
        #[arg(long)]
        permanent: bool,
        #[arg(short, long)]
        yes: bool,
    },
    /// Find duplicates and delete all but one copy in each group
    DeleteDupes {
        path: Option<PathBuf>,
        /// Which copy to keep (0 = oldest)
        #[arg(long, default_value_t = 0)]
        keep: usize,
        #[arg(long)]
        permanent: bool,
        #[arg(short, long)]
        yes: bool,
    },
    /// List the category ids known on this platform
    Categories,
}
