//! # Skyarena
//!
//! Arena lifecycle orchestrator for elimination minigames.
//!
//! Each configured arena runs as its own Tokio task: it waits for players,
//! counts down, runs the round, celebrates the survivor and restores its
//! world from a snapshot before the next round. The host game plugs in
//! through three traits: [`GameRules`](skyarena_arena::GameRules),
//! [`ArenaHost`](skyarena_arena::ArenaHost) and
//! [`ArenaDisplay`](skyarena_arena::ArenaDisplay).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use skyarena::prelude::*;
//!
//! // Implement GameRules, ArenaHost and ArenaDisplay, then:
//! // let server = ArenaServer::builder()
//! //     .data_folder("plugins/SkyArena")
//! //     .build(host, display, |_config| Box::new(MyRules))
//! //     .await?;
//! // server.run_until(shutdown_signal).await;
//! ```

mod error;
mod server;

pub use error::SkyArenaError;
pub use server::{ArenaServer, ArenaServerBuilder, RulesFactory};

pub use skyarena_arena as arena;
pub use skyarena_snapshot as snapshot;
pub use skyarena_tick as tick;

use tracing_subscriber::EnvFilter;

/// Install a `tracing` subscriber that honours `RUST_LOG`, falling back to
/// `default_filter` (for example `"info,skyarena_arena=debug"`).
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Everything needed to host arenas.
pub mod prelude {
    pub use crate::{ArenaServer, ArenaServerBuilder, SkyArenaError, init_tracing};
    pub use skyarena_arena::{
        ArenaConfig, ArenaDisplay, ArenaEnv, ArenaError, ArenaHandle, ArenaHost, ArenaInfo,
        ArenaManager, ArenaMode, GameRules, HostError, MessageKey, Phase, PlayerId, Rejection,
        RecurringTask, SpawnPoint, TeamColor,
    };
    pub use skyarena_snapshot::{Archiver, ZipArchiver};
    pub use skyarena_tick::{ClockConfig, MissedTickPolicy};
}
