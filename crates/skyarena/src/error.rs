//! Unified error type for Skyarena.

use std::path::PathBuf;

use skyarena_arena::{ArenaError, ConfigError};
use skyarena_snapshot::SnapshotError;

/// Top-level error that wraps the errors of every sub-crate.
///
/// Each `#[from]` variant gets a `From` impl, so `?` converts sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum SkyArenaError {
    /// A world snapshot could not be taken or restored.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// An arena rejected an operation or could not be built.
    #[error(transparent)]
    Arena(#[from] ArenaError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An arena definition file is malformed.
    #[error("invalid arena file {}: {source}", .path.display())]
    InvalidArenaFile {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },

    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
