//! Fatal error kinds surfaced by the bundler
//!
//! These are wrapped into `anyhow::Error` at the orchestration boundary; callers that
//! need to tell them apart can `downcast_ref::<BundleError>()`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BundleError {
    /// A source file the run depends on directly (entry or explicit input) is absent
    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// A local import was recorded during resolution but the file is not on disk
    #[error("missing dependency {} (imported from {})", path.display(), importer.display())]
    MissingDependency { path: PathBuf, importer: PathBuf },

    /// A resource catalog document could not be read or has an unexpected shape
    #[error("resource catalog {}: {message}", path.display())]
    ResourceCatalog { path: PathBuf, message: String },
}
