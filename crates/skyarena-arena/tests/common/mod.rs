//! Recording collaborators and fixtures shared by the arena test suites.

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use skyarena_arena::{
    Arena, ArenaConfig, ArenaDisplay, ArenaEnv, ArenaHost, ArenaInfo, ArenaServices,
    GameDebugger, GameRules, HostError, MessageKey, PlayerId, RecurringTask, SpawnPoint,
};
use skyarena_snapshot::{Archiver, SnapshotError, ZipArchiver};
use tokio::runtime::Handle;

pub const ARENA: &str = "Lagoon";
pub const WORLD: &str = "lagoon";

// =========================================================================
// Game rules
// =========================================================================

#[derive(Debug, Default)]
pub struct RulesLog {
    pub started: usize,
    pub stopped: usize,
    pub shutdowns: usize,
    pub remove_all: usize,
    pub joins: Vec<PlayerId>,
    pub leaves: Vec<(PlayerId, bool)>,
    pub deny_join: bool,
    pub deny_leave: bool,
    pub task_hits: Arc<AtomicUsize>,
    /// Arm one recurring task per reset.
    pub with_task: bool,
}

pub struct RecordingRules(pub Arc<Mutex<RulesLog>>);

impl GameRules for RecordingRules {
    fn start_arena(&mut self) {
        self.0.lock().unwrap().started += 1;
    }

    fn stop_arena(&mut self) {
        self.0.lock().unwrap().stopped += 1;
    }

    fn shutdown(&mut self) {
        self.0.lock().unwrap().shutdowns += 1;
    }

    fn join_to_arena(&mut self, player: PlayerId, _spawn: SpawnPoint) -> bool {
        let mut log = self.0.lock().unwrap();
        log.joins.push(player);
        !log.deny_join
    }

    fn leave_arena(&mut self, player: PlayerId, forced: bool) -> bool {
        let mut log = self.0.lock().unwrap();
        log.leaves.push((player, forced));
        !log.deny_leave
    }

    fn remove_all_players(&mut self) {
        self.0.lock().unwrap().remove_all += 1;
    }

    fn runtime_tasks(&mut self) -> Vec<RecurringTask> {
        let log = self.0.lock().unwrap();
        if !log.with_task {
            return Vec::new();
        }
        let hits = Arc::clone(&log.task_hits);
        vec![RecurringTask::new(
            "hunger-drain",
            Duration::from_millis(10),
            move || {
                hits.fetch_add(1, Ordering::SeqCst);
            },
        )]
    }
}

// =========================================================================
// Host
// =========================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    Load(String),
    Unload(String),
    LockTime(String, u32),
    Teleport(PlayerId, SpawnPoint),
    Lobby(PlayerId),
    ResetState(PlayerId),
    Spectator(PlayerId),
    Items(PlayerId, bool),
}

#[derive(Default)]
pub struct RecordingHost {
    pub calls: Mutex<Vec<HostCall>>,
    pub fail_all: AtomicBool,
}

impl RecordingHost {
    fn record(&self, call: HostCall) -> Result<(), HostError> {
        self.calls.lock().unwrap().push(call);
        if self.fail_all.load(Ordering::SeqCst) {
            Err(HostError::Other("host exploded".into()))
        } else {
            Ok(())
        }
    }

    pub fn count(&self, pred: impl Fn(&HostCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    pub fn has(&self, call: &HostCall) -> bool {
        self.calls.lock().unwrap().contains(call)
    }
}

impl ArenaHost for RecordingHost {
    fn load_world(&self, world: &str) -> Result<(), HostError> {
        self.record(HostCall::Load(world.into()))
    }

    fn unload_world(&self, world: &str) -> Result<(), HostError> {
        self.record(HostCall::Unload(world.into()))
    }

    fn lock_world_time(&self, world: &str, time: u32) -> Result<(), HostError> {
        self.record(HostCall::LockTime(world.into(), time))
    }

    fn teleport(&self, player: PlayerId, _world: &str, to: SpawnPoint) -> Result<(), HostError> {
        self.record(HostCall::Teleport(player, to))
    }

    fn teleport_lobby(&self, player: PlayerId) -> Result<(), HostError> {
        self.record(HostCall::Lobby(player))
    }

    fn reset_transient_state(&self, player: PlayerId) -> Result<(), HostError> {
        self.record(HostCall::ResetState(player))
    }

    fn set_spectator(&self, player: PlayerId) -> Result<(), HostError> {
        self.record(HostCall::Spectator(player))
    }

    fn give_game_items(&self, player: PlayerId, post_game: bool) -> Result<(), HostError> {
        self.record(HostCall::Items(player, post_game))
    }
}

// =========================================================================
// Display
// =========================================================================

#[derive(Default)]
pub struct RecordingDisplay {
    pub messages: Mutex<Vec<(PlayerId, MessageKey)>>,
    pub popups: Mutex<Vec<(PlayerId, MessageKey)>>,
    pub statuses: Mutex<Vec<ArenaInfo>>,
    pub scoreboards: Mutex<Vec<PlayerId>>,
}

impl RecordingDisplay {
    pub fn messages_for(&self, player: PlayerId) -> Vec<MessageKey> {
        let messages = self.messages.lock().unwrap();
        messages.iter().filter(|(p, _)| *p == player).map(|(_, k)| *k).collect()
    }

    pub fn last_popup(&self, player: PlayerId) -> Option<MessageKey> {
        let popups = self.popups.lock().unwrap();
        popups.iter().rev().find(|(p, _)| *p == player).map(|(_, k)| *k)
    }
}

impl ArenaDisplay for RecordingDisplay {
    fn message(&self, player: PlayerId, key: MessageKey) {
        self.messages.lock().unwrap().push((player, key));
    }

    fn popup(&self, player: PlayerId, key: MessageKey) {
        self.popups.lock().unwrap().push((player, key));
    }

    fn status_update(&self, info: &ArenaInfo) {
        self.statuses.lock().unwrap().push(info.clone());
    }

    fn refresh_scoreboard(&self, player: PlayerId, _info: &ArenaInfo) {
        self.scoreboards.lock().unwrap().push(player);
    }
}

// =========================================================================
// Archivers
// =========================================================================

/// A latch the test opens to let a gated archiver proceed.
#[derive(Default)]
pub struct Gate {
    open: Mutex<bool>,
    cv: Condvar,
}

impl Gate {
    pub fn open(&self) {
        *self.open.lock().unwrap() = true;
        self.cv.notify_all();
    }

    fn wait(&self) {
        let mut open = self.open.lock().unwrap();
        while !*open {
            open = self.cv.wait(open).unwrap();
        }
    }
}

/// Zip archiver that blocks until its gate opens.
pub struct GatedArchiver(pub Arc<Gate>);

impl Archiver for GatedArchiver {
    fn pack(&self, source_dir: &Path, archive: &Path) -> Result<(), SnapshotError> {
        self.0.wait();
        ZipArchiver::default().pack(source_dir, archive)
    }

    fn unpack(&self, archive: &Path, dest_dir: &Path) -> Result<(), SnapshotError> {
        self.0.wait();
        ZipArchiver::default().unpack(archive, dest_dir)
    }
}

/// Always fails, as if the disk were full.
pub struct FailingArchiver;

impl Archiver for FailingArchiver {
    fn pack(&self, _: &Path, archive: &Path) -> Result<(), SnapshotError> {
        Err(SnapshotError::Io {
            path: archive.to_path_buf(),
            source: std::io::Error::other("disk full"),
        })
    }

    fn unpack(&self, archive: &Path, _: &Path) -> Result<(), SnapshotError> {
        Err(SnapshotError::Io {
            path: archive.to_path_buf(),
            source: std::io::Error::other("disk full"),
        })
    }
}

// =========================================================================
// Fixture
// =========================================================================

pub fn pedestal(i: usize) -> SpawnPoint {
    SpawnPoint::new(i as f64 * 10.0, 70.0, 0.0)
}

/// `min`..`max` players, one pedestal per slot, short timers.
pub fn config(min: usize, max: usize) -> ArenaConfig {
    ArenaConfig {
        arena_name: ARENA.into(),
        arena_world: WORLD.into(),
        min_players: min,
        max_players: max,
        start_countdown: 3,
        celebration_time: 2,
        task_grace_ms: 0,
        spawn_pedestals: (0..max).map(pedestal).collect(),
        ..ArenaConfig::default()
    }
}

pub struct Fixture {
    pub tmp: tempfile::TempDir,
    pub env: ArenaEnv,
    pub rules: Arc<Mutex<RulesLog>>,
    pub host: Arc<RecordingHost>,
    pub display: Arc<RecordingDisplay>,
}

impl Fixture {
    /// A data folder and a server folder holding the world `lagoon`.
    pub fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let env = ArenaEnv::new(tmp.path().join("plugin"), tmp.path().join("server"));
        let world = env.world_path(WORLD);
        fs::create_dir_all(world.join("region")).unwrap();
        fs::write(world.join("level.dat"), b"pristine").unwrap();
        fs::write(world.join("region").join("r.0.0.mca"), b"blocks").unwrap();

        Self {
            tmp,
            env,
            rules: Arc::new(Mutex::new(RulesLog::default())),
            host: Arc::new(RecordingHost::default()),
            display: Arc::new(RecordingDisplay::default()),
        }
    }

    pub fn services_with(&self, archiver: Arc<dyn Archiver>) -> ArenaServices {
        ArenaServices {
            rules: Box::new(RecordingRules(Arc::clone(&self.rules))),
            host: self.host.clone(),
            display: self.display.clone(),
            archiver,
            runtime: Handle::current(),
        }
    }

    pub fn services(&self) -> ArenaServices {
        self.services_with(Arc::new(ZipArchiver::default()))
    }

    pub fn arena(&self, config: ArenaConfig) -> Arena {
        self.arena_with(config, Arc::new(ZipArchiver::default()))
    }

    pub fn arena_with(&self, config: ArenaConfig, archiver: Arc<dyn Archiver>) -> Arena {
        let debugger = GameDebugger::in_memory(&config.arena_name);
        Arena::with_debugger(config, self.env.clone(), self.services_with(archiver), debugger)
            .unwrap()
    }

    pub fn rules(&self) -> std::sync::MutexGuard<'_, RulesLog> {
        self.rules.lock().unwrap()
    }

    pub fn world_file(&self) -> std::path::PathBuf {
        self.env.world_path(WORLD).join("level.dat")
    }
}

pub fn p(id: u64) -> PlayerId {
    PlayerId(id)
}

/// Slow archiver that records how many jobs ever ran at the same time.
pub struct CountingArchiver {
    active: AtomicUsize,
    max: AtomicUsize,
    delay: Duration,
}

impl CountingArchiver {
    pub fn new(delay: Duration) -> Self {
        Self {
            active: AtomicUsize::new(0),
            max: AtomicUsize::new(0),
            delay,
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }

    fn run<T>(&self, job: impl FnOnce() -> T) -> T {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        let out = job();
        self.active.fetch_sub(1, Ordering::SeqCst);
        out
    }
}

impl Archiver for CountingArchiver {
    fn pack(&self, source_dir: &Path, archive: &Path) -> Result<(), SnapshotError> {
        self.run(|| ZipArchiver::default().pack(source_dir, archive))
    }

    fn unpack(&self, archive: &Path, dest_dir: &Path) -> Result<(), SnapshotError> {
        self.run(|| ZipArchiver::default().unpack(archive, dest_dir))
    }
}
