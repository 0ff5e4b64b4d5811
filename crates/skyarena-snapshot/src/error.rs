//! Error types for the snapshot layer.

use std::path::{Path, PathBuf};

use crate::SnapshotKind;

/// Errors produced while requesting or running a snapshot job.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// Another capture/restore is still in flight for this world.
    /// Jobs on the same world never overlap.
    #[error("a {0} job is already in flight")]
    Busy(SnapshotKind),

    /// There is no archive to restore from.
    #[error("no snapshot archive at {}", .0.display())]
    NoSnapshot(PathBuf),

    /// A filesystem operation failed.
    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The archive could not be read or written.
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// The worker went away without reporting a result (it panicked).
    #[error("snapshot worker ended without reporting a result")]
    WorkerLost,
}

impl SnapshotError {
    pub(crate) fn io(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
