//! Per-tick arena logic.
//!
//! Each tick, in order:
//!
//! 1. observe a finished world snapshot, if any
//! 2. pin the world's time of day when configured
//! 3. push the arena status to the display
//! 4. advance the phase (see below)
//! 5. refresh every player's scoreboard
//!
//! | phase        | behaviour                                                    |
//! |--------------|--------------------------------------------------------------|
//! | Waiting      | enough players → SlopeWaiting; else popup and re-arm timers  |
//! | SlopeWaiting | too few → Waiting; busy → hold; count down, then start       |
//! | Running      | ≤ 1 player → check_alive; duration limit → stop              |
//! | Celebrating  | count down, then stop                                        |

use std::time::Duration;

use skyarena_tick::{ClockConfig, ClockStats, TickClock, TickInfo};
use tracing::{debug, trace};

use crate::arena::{Arena, Countdown, ceil_secs};
use crate::host::MessageKey;
use crate::state::Phase;

/// Drives one arena: owns its clock and applies the phase rules each tick.
pub struct TickScheduler {
    clock: TickClock,
    ticks_run: u64,
}

impl TickScheduler {
    pub fn new(config: ClockConfig) -> Self {
        Self {
            clock: TickClock::new(config),
            ticks_run: 0,
        }
    }

    /// Wait for the next tick. Cancel-safe; pends while paused.
    pub async fn next_tick(&mut self) -> TickInfo {
        self.clock.wait_for_tick().await
    }

    /// Mark the end of the tick's work, for budget accounting.
    pub fn finish_tick(&mut self) {
        self.clock.record_tick_end();
    }

    /// Stop ticking (setup mode) until [`TickScheduler::resume`].
    pub fn pause(&mut self) {
        self.clock.pause();
    }

    pub fn resume(&mut self) {
        self.clock.resume();
    }

    pub fn is_paused(&self) -> bool {
        self.clock.is_paused()
    }

    /// Ticks actually applied to the arena.
    pub fn ticks_run(&self) -> u64 {
        self.ticks_run
    }

    pub fn stats(&self) -> &ClockStats {
        self.clock.stats()
    }

    /// Apply one tick of `dt` to `arena`. Never fails: collaborator errors
    /// are logged by the arena.
    pub fn run_tick(&mut self, arena: &mut Arena, dt: Duration) {
        if arena.is_shut_down() {
            trace!(arena = %arena.name(), "tick ignored, arena shut down");
            return;
        }
        self.ticks_run += 1;

        arena.poll_snapshot();
        arena.lock_world_time();
        arena.push_status();

        match arena.phase() {
            Phase::Waiting => tick_waiting(arena),
            Phase::SlopeWaiting => tick_countdown(arena, dt),
            Phase::Running => tick_running(arena, dt),
            Phase::Celebrating => tick_celebrating(arena, dt),
        }

        arena.refresh_scoreboards();
    }
}

fn tick_waiting(arena: &mut Arena) {
    let min = arena.config().min_players;
    if arena.player_count() > min.saturating_sub(1) {
        arena.set_phase(Phase::SlopeWaiting);
        return;
    }

    // A countdown that already moved was interrupted by someone leaving.
    let interrupted = arena.countdown.start_remaining < arena.config().start_countdown();
    arena.popup_all(if interrupted {
        MessageKey::LowPlayers
    } else {
        MessageKey::WaitPlayers
    });
    arena.countdown = Countdown::armed(arena.config());
}

fn tick_countdown(arena: &mut Arena, dt: Duration) {
    if arena.player_count() < arena.config().min_players {
        arena.log("[Arena]: not enough players, countdown halted");
        arena.set_phase(Phase::Waiting);
        return;
    }
    if arena.is_busy() {
        debug!(arena = %arena.name(), "countdown held, world busy");
        return;
    }

    let remaining = arena.countdown.start_remaining.saturating_sub(dt);
    arena.countdown.start_remaining = remaining;
    if !remaining.is_zero() {
        arena.popup_all(MessageKey::Countdown(ceil_secs(remaining)));
        return;
    }
    if let Err(rejection) = arena.start_game() {
        arena.log(format!("[Arena]: countdown expired but round not started: {rejection}"));
    }
}

fn tick_running(arena: &mut Arena, dt: Duration) {
    arena.countdown.running_elapsed += dt;
    if arena.player_count() <= 1 {
        arena.check_alive();
        return;
    }
    if let Some(limit) = arena.config().duration_limit() {
        if arena.countdown.running_elapsed >= limit {
            arena.log("[Arena]: time limit reached");
            arena.stop_game();
        }
    }
}

fn tick_celebrating(arena: &mut Arena, dt: Duration) {
    let remaining = arena.countdown.celebrate_remaining.saturating_sub(dt);
    arena.countdown.celebrate_remaining = remaining;
    if remaining.is_zero() {
        arena.log("[Arena]: celebration over");
        arena.stop_game();
    }
}
