//! The snapshot service: at most one capture/restore in flight per world.
//!
//! # Completion handoff
//!
//! Jobs run on the runtime's blocking pool. Each job reports through a
//! `oneshot` channel whose receiver stays inside the service. The owner
//! observes completion in one of two ways:
//!
//! - [`SnapshotService::try_complete`]: non-blocking poll, e.g. at the top
//!   of every arena tick.
//! - [`SnapshotService::completed`]: a cancel-safe future for a
//!   `tokio::select!` branch. Pends forever while idle.
//!
//! Either way the service is busy from dispatch until the outcome has been
//! handed out, and every job produces exactly one [`SnapshotOutcome`], even
//! if the worker panics. If the service is dropped first, the worker's
//! result is discarded.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::runtime::Handle;
use tokio::sync::oneshot::{self, error::TryRecvError};
use tracing::{debug, info, warn};

use crate::{Archiver, SnapshotError};

/// Direction of a snapshot job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotKind {
    /// World directory → archive.
    Capture,
    /// Archive → world directory.
    Restore,
}

impl fmt::Display for SnapshotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Capture => write!(f, "capture"),
            Self::Restore => write!(f, "restore"),
        }
    }
}

/// A dispatched job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotJob {
    /// Sequence number, unique per service.
    pub id: u64,
    pub kind: SnapshotKind,
    pub archive: PathBuf,
    pub world_dir: PathBuf,
}

/// The result of a finished job, handed out exactly once.
#[derive(Debug)]
pub struct SnapshotOutcome {
    pub job: SnapshotJob,
    /// Time from dispatch until the outcome was observed.
    pub elapsed: Duration,
    pub result: Result<(), SnapshotError>,
}

impl SnapshotOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

struct InFlight {
    job: SnapshotJob,
    started: Instant,
    done: oneshot::Receiver<Result<(), SnapshotError>>,
}

/// Runs capture/restore jobs for one world, one at a time.
pub struct SnapshotService {
    archiver: Arc<dyn Archiver>,
    runtime: Handle,
    in_flight: Option<InFlight>,
    next_id: u64,
}

impl SnapshotService {
    /// Create a service that runs jobs on `runtime`'s blocking pool.
    pub fn new(archiver: Arc<dyn Archiver>, runtime: Handle) -> Self {
        Self {
            archiver,
            runtime,
            in_flight: None,
            next_id: 1,
        }
    }

    /// `true` from dispatch until the job's outcome has been observed.
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// The job currently in flight, if any.
    pub fn in_flight(&self) -> Option<&SnapshotJob> {
        self.in_flight.as_ref().map(|f| &f.job)
    }

    /// Archive `world_dir` into `archive`.
    ///
    /// If `archive` already exists the world is restored from it instead:
    /// an existing snapshot is the pristine copy and is never overwritten.
    /// The returned job's `kind` tells which path was taken.
    ///
    /// # Errors
    /// [`SnapshotError::Busy`] if a job is in flight.
    pub fn capture(
        &mut self,
        world_dir: &Path,
        archive: &Path,
    ) -> Result<SnapshotJob, SnapshotError> {
        self.ensure_idle()?;

        if archive.is_file() {
            debug!(archive = %archive.display(), "snapshot already exists, restoring it");
            return self.restore(archive, world_dir);
        }

        let job = self.next_job(SnapshotKind::Capture, archive, world_dir);
        let archiver = Arc::clone(&self.archiver);
        let (archive, world_dir) = (job.archive.clone(), job.world_dir.clone());

        Ok(self.dispatch(job, move || {
            if let Some(parent) = archive.parent() {
                fs::create_dir_all(parent).map_err(SnapshotError::io(parent))?;
            }
            archiver.pack(&world_dir, &archive)
        }))
    }

    /// Replace `world_dir` with the contents of `archive`.
    ///
    /// The live directory is deleted and recreated by the worker before
    /// extraction.
    ///
    /// # Errors
    /// - [`SnapshotError::Busy`] if a job is in flight.
    /// - [`SnapshotError::NoSnapshot`] if `archive` does not exist. The world
    ///   is left untouched.
    pub fn restore(
        &mut self,
        archive: &Path,
        world_dir: &Path,
    ) -> Result<SnapshotJob, SnapshotError> {
        self.ensure_idle()?;

        if !archive.is_file() {
            return Err(SnapshotError::NoSnapshot(archive.to_path_buf()));
        }

        let job = self.next_job(SnapshotKind::Restore, archive, world_dir);
        let archiver = Arc::clone(&self.archiver);
        let (archive, world_dir) = (job.archive.clone(), job.world_dir.clone());

        Ok(self.dispatch(job, move || {
            if world_dir.exists() {
                fs::remove_dir_all(&world_dir).map_err(SnapshotError::io(&world_dir))?;
            }
            fs::create_dir_all(&world_dir).map_err(SnapshotError::io(&world_dir))?;
            archiver.unpack(&archive, &world_dir)
        }))
    }

    /// Delete a stored archive so the next capture starts fresh.
    ///
    /// Returns `false` if there was nothing to delete.
    ///
    /// # Errors
    /// [`SnapshotError::Busy`] if a job (which may be reading the archive)
    /// is in flight.
    pub fn delete_archive(&self, archive: &Path) -> Result<bool, SnapshotError> {
        self.ensure_idle()?;
        match fs::remove_file(archive) {
            Ok(()) => {
                info!(archive = %archive.display(), "snapshot archive deleted");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(SnapshotError::Io {
                path: archive.to_path_buf(),
                source: e,
            }),
        }
    }

    /// Non-blocking: the outcome of the in-flight job if it has finished.
    pub fn try_complete(&mut self) -> Option<SnapshotOutcome> {
        let flight = self.in_flight.as_mut()?;
        let result = match flight.done.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Closed) => Err(SnapshotError::WorkerLost),
        };
        self.finish(result)
    }

    /// Resolves with the outcome of the in-flight job. Pends forever while
    /// idle. Cancel-safe: dropping the future keeps the job in flight.
    pub async fn completed(&mut self) -> SnapshotOutcome {
        let result = match self.in_flight.as_mut() {
            Some(flight) => (&mut flight.done)
                .await
                .unwrap_or_else(|_| Err(SnapshotError::WorkerLost)),
            None => std::future::pending().await,
        };
        match self.finish(result) {
            Some(outcome) => outcome,
            None => std::future::pending().await,
        }
    }

    /// Wait for the in-flight job, if any. `None` when already idle.
    pub async fn wait_idle(&mut self) -> Option<SnapshotOutcome> {
        if self.is_busy() {
            Some(self.completed().await)
        } else {
            None
        }
    }

    fn ensure_idle(&self) -> Result<(), SnapshotError> {
        match &self.in_flight {
            Some(flight) => Err(SnapshotError::Busy(flight.job.kind)),
            None => Ok(()),
        }
    }

    fn next_job(&mut self, kind: SnapshotKind, archive: &Path, world_dir: &Path) -> SnapshotJob {
        let id = self.next_id;
        self.next_id += 1;
        SnapshotJob {
            id,
            kind,
            archive: archive.to_path_buf(),
            world_dir: world_dir.to_path_buf(),
        }
    }

    fn dispatch<F>(&mut self, job: SnapshotJob, work: F) -> SnapshotJob
    where
        F: FnOnce() -> Result<(), SnapshotError> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let (id, kind) = (job.id, job.kind);

        self.runtime.spawn_blocking(move || {
            let result = work();
            if tx.send(result).is_err() {
                debug!(job = id, %kind, "snapshot finished after its owner went away");
            }
        });

        info!(
            job = job.id,
            kind = %job.kind,
            archive = %job.archive.display(),
            world = %job.world_dir.display(),
            "snapshot job dispatched"
        );

        self.in_flight = Some(InFlight {
            job: job.clone(),
            started: Instant::now(),
            done: rx,
        });
        job
    }

    fn finish(&mut self, result: Result<(), SnapshotError>) -> Option<SnapshotOutcome> {
        let flight = self.in_flight.take()?;
        let elapsed = flight.started.elapsed();

        match &result {
            Ok(()) => info!(
                job = flight.job.id,
                kind = %flight.job.kind,
                elapsed_ms = elapsed.as_millis() as u64,
                "snapshot job finished"
            ),
            Err(e) => warn!(
                job = flight.job.id,
                kind = %flight.job.kind,
                error = %e,
                "snapshot job failed"
            ),
        }

        Some(SnapshotOutcome {
            job: flight.job,
            elapsed,
            result,
        })
    }
}
