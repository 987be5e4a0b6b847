/// Analysis modules: duplicate files, large files, dependency directories,
/// and the recommendations built on top of them.
pub mod dependencies;
pub mod duplicates;
pub mod large_files;
pub mod recommendations;

pub use dependencies::{find_dependency_dirs, DependencyDir, DependencyDirsResult, DependencyKind};
pub use duplicates::{DuplicateDetector, DuplicateOptions};
pub use large_files::{find_large_files, LargeFile, LargeFilesResult};
pub use recommendations::{recommend, RecommendationInputs};
