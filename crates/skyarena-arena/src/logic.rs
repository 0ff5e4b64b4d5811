//! The `GameRules` trait: the pluggable ruleset an arena drives.
//!
//! The arena owns the lifecycle (who is in, which phase, when the world is
//! reset). The rules own what happens inside a round. The arena calls these
//! hooks at every phase boundary and trusts the boolean answers of the
//! join/leave hooks.

use std::fmt;
use std::time::Duration;

use crate::types::{PlayerId, SpawnPoint};

/// A job the rules want run periodically while the arena is loaded,
/// e.g. a hunger drain or a haste effect.
///
/// Tasks are (re)armed after every arena reset, first firing after the
/// configured grace period, and cancelled on shutdown.
pub struct RecurringTask {
    pub name: String,
    pub period: Duration,
    pub job: Box<dyn FnMut() + Send + 'static>,
}

impl RecurringTask {
    pub fn new(
        name: impl Into<String>,
        period: Duration,
        job: impl FnMut() + Send + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            period,
            job: Box::new(job),
        }
    }
}

impl fmt::Debug for RecurringTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecurringTask")
            .field("name", &self.name)
            .field("period", &self.period)
            .finish_non_exhaustive()
    }
}

/// The ruleset of one arena.
///
/// Each arena owns its own instance; methods are only ever called from the
/// arena's task.
pub trait GameRules: Send + 'static {
    /// A round begins. Called once per round, on the transition to Running.
    fn start_arena(&mut self);

    /// A round ends, whatever the reason.
    fn stop_arena(&mut self);

    /// The arena is being unloaded for good.
    fn shutdown(&mut self);

    /// A player wants in and has been given `spawn`. Return `false` to veto;
    /// the rules are expected to tell the player why.
    fn join_to_arena(&mut self, player: PlayerId, spawn: SpawnPoint) -> bool;

    /// A player wants out. `forced` leaves (death, disconnect, stop) should
    /// not be vetoed.
    fn leave_arena(&mut self, player: PlayerId, forced: bool) -> bool;

    /// Everyone is being removed at once (stop sequence).
    fn remove_all_players(&mut self);

    /// Recurring work to arm after each reset. Default: none.
    fn runtime_tasks(&mut self) -> Vec<RecurringTask> {
        Vec::new()
    }
}
