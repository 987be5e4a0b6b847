/// CleanSleuth Core: scanning, deduplication, cleanup, and scan history.
///
/// This crate contains all business logic with zero UI dependencies.
/// Frontends (the bundled CLI, or any other presentation layer) drive it
/// through [`engine::Engine`] and listen on its event channel.
///
/// # Modules
///
/// - [`model`]: Result types shared by every component.
/// - [`catalog`]: Platform-resolved table of developer cache categories.
/// - [`scanner`]: Directory walker, dev-cache scanner, and lazy tree scanner.
/// - [`analysis`]: Duplicates, large files, dependency directories, recommendations.
/// - [`cleaner`]: Trash or permanent deletion with per-item error capture.
/// - [`cache`]: Versioned on-disk cache of the most recent scan per mode.
/// - [`trends`]: Snapshot history and growth-rate derivation.
/// - [`engine`]: Request/response facade plus the progress event bus.
pub mod analysis;
pub mod cache;
pub mod catalog;
pub mod cleaner;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod scanner;
pub mod trends;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{EngineError, Result};
