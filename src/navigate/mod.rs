//! Navigate module
//!
//! Directory changes with on-demand creation and rename orchestration.

mod operations;

// Re-export public helpers
pub use operations::{parent_directory, path_components};
