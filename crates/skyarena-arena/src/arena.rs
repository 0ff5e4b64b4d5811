//! The arena aggregate: phase, roster, cages, teams and the world snapshot.
//!
//! An [`Arena`] is a plain synchronous state machine. It is owned and
//! driven by exactly one task (see [`crate::spawn_arena`]); the tick logic
//! lives in [`crate::TickScheduler`]. All world-dependent operations are
//! gated on the snapshot service being idle ("busy").

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use skyarena_snapshot::{Archiver, SnapshotError, SnapshotKind, SnapshotOutcome, SnapshotService};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::cage::CageAssigner;
use crate::config::{ArenaConfig, ArenaEnv};
use crate::debugger::GameDebugger;
use crate::error::{ArenaError, Rejection};
use crate::host::{ArenaDisplay, ArenaHost, HostError, MessageKey};
use crate::logic::GameRules;
use crate::roster::{PlayerRecord, RosterManager};
use crate::state::{Phase, ReadableStatus};
use crate::tasks::TaskSet;
use crate::team::TeamAssigner;
use crate::types::{PlayerId, SpawnPoint};

/// Everything an arena needs from the outside world.
pub struct ArenaServices {
    pub rules: Box<dyn GameRules>,
    pub host: Arc<dyn ArenaHost>,
    pub display: Arc<dyn ArenaDisplay>,
    pub archiver: Arc<dyn Archiver>,
    /// Runtime for snapshot workers and recurring tasks.
    pub runtime: Handle,
}

/// Notable changes, published to whoever registered a sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArenaEvent {
    PlayerJoined { arena: String, player: PlayerId },
    PlayerLeft { arena: String, player: PlayerId },
    PhaseChanged { arena: String, from: Phase, to: Phase },
    SnapshotFinished { arena: String, kind: SnapshotKind, ok: bool },
    ShutDown { arena: String },
}

/// A point-in-time view of an arena, for displays and arena lists.
#[derive(Debug, Clone, PartialEq)]
pub struct ArenaInfo {
    pub name: String,
    pub world: String,
    pub phase: Phase,
    pub status: ReadableStatus,
    pub busy: bool,
    pub enabled: bool,
    pub in_setup: bool,
    pub players: Vec<PlayerId>,
    pub min_players: usize,
    pub max_players: usize,
    /// Whole seconds until the round starts, while counting down.
    pub start_in: Option<u64>,
    /// Time played this round, while in game.
    pub elapsed: Option<Duration>,
}

/// The live world an arena plays on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldHandle {
    pub name: String,
    pub path: PathBuf,
}

/// Countdown reference values, re-armed whenever the arena is waiting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    pub start_remaining: Duration,
    pub celebrate_remaining: Duration,
    pub running_elapsed: Duration,
}

impl Countdown {
    pub fn armed(config: &ArenaConfig) -> Self {
        Self {
            start_remaining: config.start_countdown(),
            celebrate_remaining: config.celebration_time(),
            running_elapsed: Duration::ZERO,
        }
    }
}

/// Whole seconds, rounded up.
pub(crate) fn ceil_secs(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}

pub struct Arena {
    config: ArenaConfig,
    env: ArenaEnv,
    phase: Phase,
    enabled: bool,
    in_setup: bool,
    shut_down: bool,
    started_at: Option<Instant>,
    pub(crate) countdown: Countdown,
    roster: RosterManager,
    cages: CageAssigner,
    teams: TeamAssigner,
    snapshot: SnapshotService,
    tasks: TaskSet,
    rules: Box<dyn GameRules>,
    host: Arc<dyn ArenaHost>,
    display: Arc<dyn ArenaDisplay>,
    debugger: GameDebugger,
    events: Option<mpsc::UnboundedSender<ArenaEvent>>,
}

impl Arena {
    /// Build an arena logging to `{data_folder}/logs`.
    ///
    /// # Errors
    /// Invalid configuration, invalid UTC offset, or an unopenable log file.
    pub fn new(config: ArenaConfig, env: ArenaEnv, services: ArenaServices) -> Result<Self, ArenaError> {
        config.validate()?;
        let debugger = GameDebugger::open(&env.logs_dir(), &config.arena_name, env.utc_offset_minutes)?;
        Self::with_debugger(config, env, services, debugger)
    }

    /// Build an arena with an explicit log sink.
    pub fn with_debugger(
        config: ArenaConfig,
        env: ArenaEnv,
        services: ArenaServices,
        debugger: GameDebugger,
    ) -> Result<Self, ArenaError> {
        config.validate()?;

        let ArenaServices {
            rules,
            host,
            display,
            archiver,
            runtime,
        } = services;

        let mut arena = Self {
            phase: Phase::Waiting,
            enabled: config.enabled,
            in_setup: false,
            shut_down: false,
            started_at: None,
            countdown: Countdown::armed(&config),
            roster: RosterManager::new(config.max_players),
            cages: CageAssigner::new(config.spawn_pedestals.clone()),
            teams: build_teams(&config),
            snapshot: SnapshotService::new(archiver, runtime.clone()),
            tasks: TaskSet::new(runtime),
            rules,
            host,
            display,
            debugger,
            events: None,
            env,
            config,
        };

        arena.check_pedestals();
        arena.debugger.log(format!(
            "[Arena]: loaded, world {}, {}-{} players, mode {:?}",
            arena.config.arena_world,
            arena.config.min_players,
            arena.config.max_players,
            arena.config.arena_mode
        ));
        info!(arena = %arena.name(), world = %arena.config.arena_world, "arena loaded");
        Ok(arena)
    }

    /// Publish [`ArenaEvent`]s to `sender`.
    pub fn set_event_sender(&mut self, sender: mpsc::UnboundedSender<ArenaEvent>) {
        self.events = Some(sender);
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.config.arena_name
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    pub fn env(&self) -> &ArenaEnv {
        &self.env
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// `true` while a world snapshot or restore is in flight.
    pub fn is_busy(&self) -> bool {
        self.snapshot.is_busy()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_in_setup(&self) -> bool {
        self.in_setup
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    pub fn player_count(&self) -> usize {
        self.roster.len()
    }

    pub fn players(&self) -> Vec<PlayerId> {
        self.roster.ids()
    }

    pub fn contains(&self, player: PlayerId) -> bool {
        self.roster.contains(player)
    }

    pub fn record(&self, player: PlayerId) -> Option<&PlayerRecord> {
        self.roster.get(player)
    }

    pub fn kills(&self, player: PlayerId) -> Option<u32> {
        self.roster.kills(player)
    }

    pub fn teams(&self) -> &TeamAssigner {
        &self.teams
    }

    pub fn cages(&self) -> &CageAssigner {
        &self.cages
    }

    pub fn debugger(&self) -> &GameDebugger {
        &self.debugger
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    pub fn recurring_tasks(&self) -> usize {
        self.tasks.len()
    }

    pub fn readable_status(&self) -> ReadableStatus {
        ReadableStatus::evaluate(
            self.is_busy(),
            self.in_setup,
            self.enabled,
            self.phase,
            self.roster.len(),
            self.config.min_players,
        )
    }

    pub fn info(&self) -> ArenaInfo {
        ArenaInfo {
            name: self.config.arena_name.clone(),
            world: self.config.arena_world.clone(),
            phase: self.phase,
            status: self.readable_status(),
            busy: self.is_busy(),
            enabled: self.enabled,
            in_setup: self.in_setup,
            players: self.roster.ids(),
            min_players: self.config.min_players,
            max_players: self.config.max_players,
            start_in: (self.phase == Phase::SlopeWaiting)
                .then(|| ceil_secs(self.countdown.start_remaining)),
            elapsed: self.phase.is_in_game().then_some(self.countdown.running_elapsed),
        }
    }

    // ---------------------------------------------------------------------
    // Phase transitions
    // ---------------------------------------------------------------------

    pub fn set_phase(&mut self, phase: Phase) {
        let from = self.phase;
        self.phase = phase;
        self.debugger.log(format!("[GameStatusChange]: {from} -> {phase}"));
        if from != phase {
            info!(arena = %self.name(), %from, to = %phase, "phase changed");
            self.emit(ArenaEvent::PhaseChanged {
                arena: self.config.arena_name.clone(),
                from,
                to: phase,
            });
        }
    }

    /// Begin a round.
    ///
    /// # Errors
    /// `AlreadyRunning` from Running/Celebrating (the rules are not called
    /// again), `Busy` while the world is being snapshotted.
    pub fn start_game(&mut self) -> Result<(), Rejection> {
        self.ensure_live()?;
        if self.phase.is_in_game() {
            self.debugger.log("[Arena]: start ignored, round already in progress");
            return Err(Rejection::AlreadyRunning);
        }
        if self.is_busy() {
            self.debugger.log("[Arena]: start deferred, world is busy");
            return Err(Rejection::Busy);
        }

        self.debugger.log("[Arena]: starting round");
        self.rules.start_arena();
        self.started_at = Some(Instant::now());
        self.countdown.running_elapsed = Duration::ZERO;
        self.set_phase(Phase::Running);
        self.broadcast(MessageKey::ArenaStart);
        Ok(())
    }

    /// End the round, whatever the phase. Safe to call repeatedly.
    pub fn stop_game(&mut self) {
        self.debugger.log("[Arena]: stopping round");
        self.rules.stop_arena();
        self.unset_all_players();
        self.reset_arena();
        self.restore_world();
        self.set_phase(Phase::Waiting);
    }

    /// Return to a pristine, empty arena: cages freed, world snapshotted,
    /// players cleared, recurring tasks re-armed after the grace period.
    pub fn reset_arena(&mut self) {
        self.debugger.log("[Arena]: resetting to original state");
        self.cages.reset_all();
        self.save_world();
        self.clear_players();
        self.started_at = None;
        self.countdown = Countdown::armed(&self.config);

        self.tasks.clear();
        let grace = self.config.task_grace();
        for task in self.rules.runtime_tasks() {
            self.tasks.schedule(task, grace);
        }
    }

    /// Stop for good. The arena accepts nothing afterwards and must not be
    /// ticked again. An in-flight snapshot is left to finish.
    pub fn force_shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.debugger.log("[Arena]: shutting down");
        self.stop_game();
        self.rules.shutdown();
        self.unset_all_players();
        self.tasks.clear();
        self.shut_down = true;
        info!(arena = %self.name(), "arena shut down");
        self.emit(ArenaEvent::ShutDown {
            arena: self.config.arena_name.clone(),
        });
    }

    // ---------------------------------------------------------------------
    // Players
    // ---------------------------------------------------------------------

    /// Put `player` in a cage.
    ///
    /// Checked in order: setup or busy, full, already running, disabled.
    /// Each refusal is shown to the player.
    pub fn join(&mut self, player: PlayerId) -> Result<SpawnPoint, Rejection> {
        self.ensure_live()?;
        if self.roster.contains(player) {
            return Err(Rejection::AlreadyJoined(player));
        }

        let gate = if self.in_setup {
            Some(Rejection::InSetup)
        } else if self.is_busy() {
            Some(Rejection::Busy)
        } else if self.roster.is_full() {
            Some(Rejection::Full)
        } else if self.phase.is_in_game() {
            Some(Rejection::AlreadyRunning)
        } else if !self.enabled {
            Some(Rejection::Disabled)
        } else {
            None
        };
        if let Some(rejection) = gate {
            return Err(self.reject(player, rejection));
        }

        let world = self.config.arena_world.clone();
        let result = self.host.load_world(&world);
        self.log_host_failure("load world", result);

        // The roster may have room while the cage pool does not.
        let spawn = match self.cages.next_cage(player) {
            Ok(spawn) => spawn,
            Err(e) => {
                self.debugger.log(format!("[Arena]: {player} cannot join: {e}"));
                return Err(self.reject(player, Rejection::Full));
            }
        };

        if !self.rules.join_to_arena(player, spawn) {
            self.cages.remove_cage(player);
            self.debugger.log(format!("[Arena]: rules denied {player}"));
            return Err(Rejection::Denied);
        }

        let team = if self.config.team_mode() {
            self.teams.least_populated_team()
        } else {
            None
        };
        if let Err(rejection) = self.roster.add(PlayerRecord::new(player, team, spawn)) {
            self.cages.remove_cage(player);
            if let Some(team) = team {
                self.teams.release(team);
            }
            return Err(self.reject(player, rejection));
        }

        let result = self.host.teleport(player, &world, spawn.centered());
        self.log_host_failure("teleport to cage", result);

        self.debugger.log(match team {
            Some(team) => format!("{player} joined the arena on team {team}"),
            None => format!("{player} joined the arena"),
        });
        info!(arena = %self.name(), %player, players = self.roster.len(), "player joined");
        self.emit(ArenaEvent::PlayerJoined {
            arena: self.config.arena_name.clone(),
            player,
        });
        Ok(spawn)
    }

    /// Take `player` out of the arena.
    ///
    /// A voluntary leave is refused while the world is busy; a forced one
    /// (death, disconnect) never is, but the rules may still veto.
    pub fn leave(&mut self, player: PlayerId, forced: bool) -> Result<PlayerRecord, Rejection> {
        self.debugger.log(format!(
            "{player} is leaving the arena{}",
            if forced { " by force" } else { "" }
        ));
        if !self.roster.contains(player) {
            return Err(Rejection::NotInArena(player));
        }
        if !forced && self.is_busy() {
            return Err(self.reject(player, Rejection::Busy));
        }
        if !self.rules.leave_arena(player, forced) {
            self.debugger.log(format!("[Arena]: rules kept {player} in the arena"));
            return Err(Rejection::Denied);
        }

        let record = self.remove_player(player).ok_or(Rejection::NotInArena(player))?;
        self.check_alive();
        Ok(record)
    }

    /// `victim` died, killed by `killer` if any. The victim is removed; the
    /// kill only counts once that removal went through.
    pub fn player_died(&mut self, victim: PlayerId, killer: Option<PlayerId>) -> Result<(), Rejection> {
        if !self.roster.contains(victim) {
            return Err(Rejection::NotInArena(victim));
        }
        self.leave(victim, true)?;

        match killer.filter(|&k| k != victim) {
            Some(killer) => match self.roster.record_kill(killer) {
                Some(kills) => {
                    self.debugger.log(format!("{victim} was killed by {killer} ({kills} kills)"))
                }
                None => self.debugger.log(format!("{victim} was killed by {killer}, who already left")),
            },
            None => self.debugger.log(format!("{victim} died")),
        }
        Ok(())
    }

    /// React to the roster shrinking: one survivor in a running round wins,
    /// nobody left in game stops the round.
    pub fn check_alive(&mut self) {
        let remaining = self.roster.len();
        if remaining == 1 && self.phase == Phase::Running {
            self.set_phase(Phase::Celebrating);
            self.countdown.celebrate_remaining = self.config.celebration_time();
            for player in self.roster.ids() {
                self.debugger.log(format!("{player} is the last one standing"));
                let result = self.host.reset_transient_state(player);
                self.log_host_failure("reset player state", result);
                let result = self.host.set_spectator(player);
                self.log_host_failure("set spectator", result);
                let result = self.host.give_game_items(player, true);
                self.log_host_failure("give post-game items", result);
            }
        } else if remaining == 0 && self.phase.is_in_game() {
            self.debugger.log("[Arena]: everyone left, stopping");
            self.stop_game();
        }
    }

    // ---------------------------------------------------------------------
    // World and snapshots
    // ---------------------------------------------------------------------

    /// The live world, loaded. Unavailable while busy.
    pub fn world(&mut self) -> Result<WorldHandle, Rejection> {
        if self.is_busy() {
            return Err(Rejection::Busy);
        }
        let name = self.config.arena_world.clone();
        if let Err(e) = self.host.load_world(&name) {
            self.log_host_failure("load world", Err(e));
            return Err(Rejection::WorldUnavailable);
        }
        Ok(WorldHandle {
            path: self.env.world_path(&name),
            name,
        })
    }

    /// Snapshot the world, or restore it if a snapshot already exists.
    pub fn save_world(&mut self) {
        if let Some(job) = self.snapshot.in_flight() {
            self.debugger.log(format!("[Arena]: world save skipped, {} in flight", job.kind));
            return;
        }
        let world = self.config.arena_world.clone();
        let result = self.host.unload_world(&world);
        self.log_host_failure("unload world", result);

        let (dir, archive) = (self.env.world_path(&world), self.env.archive_path(&world));
        match self.snapshot.capture(&dir, &archive) {
            Ok(job) => self.debugger.log(format!("[Arena]: world {} started", job.kind)),
            Err(e) => self.snapshot_not_started(e),
        }
    }

    /// Replace the world with its snapshot. Skipped while busy.
    pub fn restore_world(&mut self) {
        if self.is_busy() {
            return;
        }
        let world = self.config.arena_world.clone();
        let result = self.host.unload_world(&world);
        self.log_host_failure("unload world", result);

        let (dir, archive) = (self.env.world_path(&world), self.env.archive_path(&world));
        match self.snapshot.restore(&archive, &dir) {
            Ok(_) => self.debugger.log("[Arena]: world restore started"),
            Err(e) => self.snapshot_not_started(e),
        }
    }

    /// Observe a finished snapshot job without waiting. Returns `true` if
    /// one was handled.
    pub fn poll_snapshot(&mut self) -> bool {
        match self.snapshot.try_complete() {
            Some(outcome) => {
                self.on_snapshot_complete(outcome);
                true
            }
            None => false,
        }
    }

    /// Resolves when the in-flight snapshot finishes; pends while idle.
    /// Cancel-safe. Pass the outcome to [`Arena::on_snapshot_complete`].
    pub async fn snapshot_completed(&mut self) -> SnapshotOutcome {
        self.snapshot.completed().await
    }

    /// Wait for any in-flight snapshot and handle its outcome.
    pub async fn settle_snapshot(&mut self) {
        if let Some(outcome) = self.snapshot.wait_idle().await {
            self.on_snapshot_complete(outcome);
        }
    }

    pub fn on_snapshot_complete(&mut self, outcome: SnapshotOutcome) {
        let kind = outcome.job.kind;
        let ok = outcome.is_ok();
        match &outcome.result {
            Ok(()) => {
                self.debugger.log(format!(
                    "[Arena]: world {kind} finished in {} ms",
                    outcome.elapsed.as_millis()
                ));
                if !self.shut_down {
                    let result = self.host.load_world(&self.config.arena_world);
                    self.log_host_failure("load world", result);
                }
            }
            Err(e) => {
                let fallback = match kind {
                    SnapshotKind::Capture => "no snapshot available",
                    SnapshotKind::Restore => "world directory may be empty",
                };
                self.debugger.log(format!("[Arena]: world {kind} failed ({e}), {fallback}"));
                error!(arena = %self.name(), %kind, error = %e, "world {kind} failed, {fallback}");
            }
        }
        self.emit(ArenaEvent::SnapshotFinished {
            arena: self.config.arena_name.clone(),
            kind,
            ok,
        });
    }

    // ---------------------------------------------------------------------
    // Administration
    // ---------------------------------------------------------------------

    /// Enter setup mode to edit the world. The stored snapshot is deleted
    /// so the edited world becomes the new pristine copy.
    pub fn begin_edit(&mut self) -> Result<(), Rejection> {
        self.ensure_live()?;
        self.ensure_idle_and_empty()?;

        self.in_setup = true;
        let archive = self.env.archive_path(&self.config.arena_world);
        match self.snapshot.delete_archive(&archive) {
            Ok(deleted) => self.debugger.log(format!(
                "[Arena]: setup started{}",
                if deleted { ", old snapshot deleted" } else { "" }
            )),
            Err(e) => {
                warn!(arena = %self.name(), error = %e, "could not delete old snapshot");
                self.debugger.log(format!("[Arena]: setup started, old snapshot kept ({e})"));
            }
        }
        Ok(())
    }

    /// Leave setup mode and snapshot the edited world.
    pub fn finish_edit(&mut self) -> Result<(), Rejection> {
        self.ensure_live()?;
        if !self.in_setup {
            return Err(Rejection::NotInSetup);
        }
        self.in_setup = false;
        self.debugger.log("[Arena]: setup finished");
        self.save_world();
        Ok(())
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        self.debugger.log(format!(
            "[Arena]: {}",
            if enabled { "enabled" } else { "disabled" }
        ));
    }

    /// Replace the configuration. Only an idle, empty, waiting arena can be
    /// reconfigured, and it stays on its world.
    pub fn reload(&mut self, config: ArenaConfig) -> Result<(), ArenaError> {
        config.validate()?;
        self.ensure_live()?;
        self.ensure_idle_and_empty()?;
        if config.arena_world != self.config.arena_world {
            return Err(ArenaError::WorldChanged {
                arena: self.config.arena_name.clone(),
                world: config.arena_world,
            });
        }

        self.roster.set_capacity(config.max_players);
        self.cages = CageAssigner::new(config.spawn_pedestals.clone());
        self.teams = build_teams(&config);
        self.countdown = Countdown::armed(&config);
        self.enabled = config.enabled;
        self.config = config;
        self.check_pedestals();
        self.debugger.log("[Arena]: configuration reloaded");
        info!(arena = %self.name(), "arena reloaded");
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Tick helpers
    // ---------------------------------------------------------------------

    pub(crate) fn lock_world_time(&mut self) {
        let Some(time) = self.config.time_of_day else {
            return;
        };
        if self.is_busy() {
            debug!(arena = %self.name(), "world busy, time lock skipped");
            return;
        }
        let result = self.host.lock_world_time(&self.config.arena_world, time);
        self.log_host_failure("lock world time", result);
    }

    pub(crate) fn push_status(&self) {
        self.display.status_update(&self.info());
    }

    pub(crate) fn refresh_scoreboards(&self) {
        if self.roster.is_empty() {
            return;
        }
        let info = self.info();
        for &player in &info.players {
            self.display.refresh_scoreboard(player, &info);
        }
    }

    pub(crate) fn popup_all(&self, key: MessageKey) {
        for player in self.roster.ids() {
            self.display.popup(player, key);
        }
    }

    pub(crate) fn log(&mut self, line: impl AsRef<str>) {
        self.debugger.log(line);
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    fn ensure_live(&self) -> Result<(), Rejection> {
        if self.shut_down {
            Err(Rejection::ShutDown)
        } else {
            Ok(())
        }
    }

    fn ensure_idle_and_empty(&self) -> Result<(), Rejection> {
        if self.is_busy() {
            Err(Rejection::Busy)
        } else if self.phase != Phase::Waiting {
            Err(Rejection::AlreadyRunning)
        } else if !self.roster.is_empty() {
            Err(Rejection::Occupied)
        } else {
            Ok(())
        }
    }

    fn reject(&mut self, player: PlayerId, rejection: Rejection) -> Rejection {
        if let Some(key) = rejection.message_key() {
            self.display.message(player, key);
        }
        self.debugger.log(format!("[Arena]: {player} rejected: {rejection}"));
        warn!(arena = %self.name(), %player, reason = %rejection, "request rejected");
        rejection
    }

    fn remove_player(&mut self, player: PlayerId) -> Option<PlayerRecord> {
        let record = self.roster.remove(player)?;
        self.cages.remove_cage(player);
        if let Some(team) = record.team {
            self.teams.release(team);
        }
        let result = self.host.teleport_lobby(player);
        self.log_host_failure("send to lobby", result);

        info!(arena = %self.name(), %player, players = self.roster.len(), "player left");
        self.emit(ArenaEvent::PlayerLeft {
            arena: self.config.arena_name.clone(),
            player,
        });
        Some(record)
    }

    /// Everyone out through the rules, then clear the bookkeeping.
    fn unset_all_players(&mut self) {
        self.rules.remove_all_players();
        self.clear_players();
    }

    fn clear_players(&mut self) {
        self.cages.reset_all();
        self.teams.reset();
        for record in self.roster.clear() {
            self.emit(ArenaEvent::PlayerLeft {
                arena: self.config.arena_name.clone(),
                player: record.player,
            });
        }
    }

    fn snapshot_not_started(&mut self, e: SnapshotError) {
        match e {
            SnapshotError::Busy(kind) => {
                self.debugger.log(format!("[Arena]: world {kind} already in flight"));
            }
            SnapshotError::NoSnapshot(path) => {
                self.debugger.log(format!(
                    "[Arena]: no snapshot at {}, world unchanged",
                    path.display()
                ));
            }
            other => {
                self.debugger.log(format!("[Arena]: snapshot not started: {other}"));
                error!(arena = %self.name(), error = %other, "snapshot not started");
            }
        }
    }

    fn log_host_failure(&mut self, what: &str, result: Result<(), HostError>) {
        if let Err(e) = result {
            self.debugger.log(format!("[Host]: {what} failed: {e}"));
            error!(arena = %self.name(), error = %e, "host failed to {what}");
        }
    }

    fn check_pedestals(&mut self) {
        let (cages, max) = (self.cages.capacity(), self.config.max_players);
        if cages < max {
            self.debugger.log(format!(
                "[Arena]: only {cages} spawn pedestals for {max} players"
            ));
            warn!(arena = %self.name(), cages, max, "fewer spawn pedestals than max players");
        }
    }

    fn broadcast(&self, key: MessageKey) {
        for player in self.roster.ids() {
            self.display.message(player, key);
        }
    }

    fn emit(&self, event: ArenaEvent) {
        if let Some(tx) = &self.events {
            // The receiver going away just means nobody listens any more.
            let _ = tx.send(event);
        }
    }
}

fn build_teams(config: &ArenaConfig) -> TeamAssigner {
    if config.team_mode() {
        TeamAssigner::configure(config.max_teams, &mut rand::rng())
    } else {
        TeamAssigner::solo()
    }
}
