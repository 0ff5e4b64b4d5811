//! Asynchronous world snapshot and restore for Skyarena.
//!
//! An arena keeps a pristine copy of its world as an archive and restores
//! it after every round. Packing or unpacking a world takes long enough
//! that it must not run on the arena's tick loop, and two jobs on the same
//! directory must never overlap.
//!
//! # Key types
//!
//! - [`SnapshotService`]: dispatches jobs, tracks the single in-flight job
//!   (the arena's "busy" state), hands back outcomes
//! - [`Archiver`]: how a directory becomes a file; [`ZipArchiver`] by default
//! - [`SnapshotError`]: what can go wrong
//!
//! # Layout
//!
//! ```text
//! {data_folder}/arenas/worlds/{world}.zip  ⇄  {server_data}/worlds/{world}
//! ```

mod archiver;
mod error;
mod service;

pub use archiver::{Archiver, ZipArchiver};
pub use error::SnapshotError;
pub use service::{SnapshotJob, SnapshotKind, SnapshotOutcome, SnapshotService};
