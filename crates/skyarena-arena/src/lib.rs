//! Arena lifecycle management for Skyarena.
//!
//! An arena is one configured instance of the elimination minigame: a
//! world, a pool of spawn cages, a roster of players and a phase cycle
//! (`Waiting → SlopeWaiting → Running → Celebrating → Waiting`). Each
//! arena runs as an isolated Tokio task with its own tick clock.
//!
//! # Key types
//!
//! - [`Arena`]: the state machine; phase, roster, cages, teams, world snapshot
//! - [`TickScheduler`]: the per-tick phase rules
//! - [`ArenaManager`]: loads arenas, routes players, one arena per player
//! - [`ArenaHandle`]: send commands to a running arena actor
//! - [`GameRules`], [`ArenaHost`], [`ArenaDisplay`]: what the host plugs in
//! - [`ArenaConfig`], [`ArenaEnv`]: definition and filesystem layout

mod actor;
mod arena;
mod cage;
mod config;
mod debugger;
mod error;
mod host;
mod logic;
mod manager;
mod roster;
mod scheduler;
mod state;
mod tasks;
mod team;
mod types;

pub use actor::{ArenaHandle, spawn_arena};
pub use arena::{Arena, ArenaEvent, ArenaInfo, ArenaServices, Countdown, WorldHandle};
pub use cage::{CageAssigner, CageError};
pub use config::{ArenaConfig, ArenaEnv, ArenaMode, ConfigError, MAX_TEAM_COLORS};
pub use debugger::GameDebugger;
pub use error::{ArenaError, Rejection};
pub use host::{ArenaDisplay, ArenaHost, HostError, MessageKey};
pub use logic::{GameRules, RecurringTask};
pub use manager::ArenaManager;
pub use roster::{PlayerRecord, RosterManager};
pub use scheduler::TickScheduler;
pub use state::{Phase, ReadableStatus};
pub use tasks::TaskSet;
pub use team::TeamAssigner;
pub use types::{PlayerId, SpawnPoint, TeamColor};
