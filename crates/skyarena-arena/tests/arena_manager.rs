//! Arena actors and the manager, running on a real (fast) clock.

mod common;

use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use common::*;
use skyarena_arena::{
    Arena, ArenaConfig, ArenaDisplay, ArenaError, ArenaHandle, ArenaInfo, ArenaManager,
    GameDebugger, MessageKey, Phase, PlayerId, Rejection, spawn_arena,
};
use skyarena_tick::ClockConfig;

// =========================================================================
// Helpers
// =========================================================================

fn fast_clock() -> ClockConfig {
    ClockConfig::every(Duration::from_millis(50))
}

/// `config` with one-second countdown and celebration.
fn quick(min: usize, max: usize) -> ArenaConfig {
    ArenaConfig {
        start_countdown: 1,
        celebration_time: 1,
        ..config(min, max)
    }
}

/// A second arena on its own world.
fn reef_arena(fx: &Fixture) -> Arena {
    let world = fx.env.world_path("reef");
    fs::create_dir_all(&world).unwrap();
    fs::write(world.join("level.dat"), b"reef").unwrap();
    fx.arena(ArenaConfig {
        arena_name: "Reef".into(),
        arena_world: "reef".into(),
        ..quick(2, 4)
    })
}

async fn wait_for(
    handle: &ArenaHandle,
    what: &str,
    pred: impl Fn(&ArenaInfo) -> bool,
) -> ArenaInfo {
    for _ in 0..1000 {
        let info = handle.info().await.unwrap();
        if pred(&info) {
            return info;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}

async fn loaded(mgr: &mut ArenaManager, arena: Arena) -> ArenaHandle {
    let handle = mgr.load(arena).unwrap();
    wait_for(&handle, "initial snapshot", |i| !i.busy).await;
    handle
}

// =========================================================================
// Loading
// =========================================================================

#[tokio::test]
async fn test_load_snapshots_world() {
    let fx = Fixture::new();
    let mut mgr = ArenaManager::new(fast_clock());

    let handle = mgr.load(fx.arena(quick(2, 4))).unwrap();
    assert_eq!(handle.name(), ARENA);
    wait_for(&handle, "initial snapshot", |i| !i.busy).await;

    assert!(fx.env.archive_path(WORLD).is_file());
    assert_eq!(mgr.arena_names(), vec![ARENA.to_string()]);
}

#[tokio::test]
async fn test_duplicate_load_rejected() {
    let fx = Fixture::new();
    let mut mgr = ArenaManager::new(fast_clock());
    loaded(&mut mgr, fx.arena(quick(2, 4))).await;

    let err = mgr.load(fx.arena(quick(2, 4))).err().unwrap();
    assert!(matches!(err, ArenaError::AlreadyLoaded(name) if name == ARENA));
    assert_eq!(mgr.arena_count(), 1);
}

#[tokio::test]
async fn test_second_arena_on_same_world_rejected() {
    let fx = Fixture::new();
    let mut mgr = ArenaManager::new(fast_clock());
    loaded(&mut mgr, fx.arena(quick(2, 4))).await;

    let twin = fx.arena(ArenaConfig {
        arena_name: "Lagoon Twin".into(),
        ..quick(2, 4)
    });
    let err = mgr.load(twin).err().unwrap();

    assert!(matches!(
        err,
        ArenaError::WorldInUse { ref world, ref arena } if world == WORLD && arena == ARENA
    ));
    assert_eq!(mgr.arena_count(), 1);
}

// =========================================================================
// Routing players
// =========================================================================

#[tokio::test]
async fn test_join_and_leave_update_index() {
    let fx = Fixture::new();
    let mut mgr = ArenaManager::new(fast_clock());
    loaded(&mut mgr, fx.arena(quick(2, 4))).await;

    let spawn = mgr.join(p(1), ARENA).await.unwrap();
    assert_eq!(spawn, pedestal(0));
    assert_eq!(mgr.player_arena(p(1)), Some(ARENA));

    let again = mgr.join(p(1), ARENA).await;
    assert!(matches!(
        again,
        Err(ArenaError::Rejected(Rejection::AlreadyJoined(_)))
    ));

    let record = mgr.leave(p(1), false).await.unwrap();
    assert_eq!(record.player, p(1));
    assert_eq!(mgr.player_arena(p(1)), None);

    let err = mgr.leave(p(1), false).await.unwrap_err();
    assert!(matches!(err, ArenaError::Rejected(Rejection::NotInArena(_))));
}

#[tokio::test]
async fn test_one_arena_per_player() {
    let fx = Fixture::new();
    let mut mgr = ArenaManager::new(fast_clock());
    loaded(&mut mgr, fx.arena(quick(2, 4))).await;
    loaded(&mut mgr, reef_arena(&fx)).await;

    mgr.join(p(1), ARENA).await.unwrap();
    let err = mgr.join(p(1), "Reef").await.unwrap_err();
    assert!(matches!(
        err,
        ArenaError::PlayerElsewhere { ref arena, .. } if arena == ARENA
    ));

    let err = mgr.join(p(2), "Atlantis").await.unwrap_err();
    assert!(matches!(err, ArenaError::NotFound(_)));
}

#[tokio::test]
async fn test_rejection_reaches_caller() {
    let fx = Fixture::new();
    let mut mgr = ArenaManager::new(fast_clock());
    let handle = loaded(&mut mgr, fx.arena(quick(2, 4))).await;

    handle.set_enabled(false).await.unwrap();
    let err = mgr.join(p(1), ARENA).await.unwrap_err();

    assert!(matches!(err, ArenaError::Rejected(Rejection::Disabled)));
    assert_eq!(mgr.player_arena(p(1)), None);
    assert_eq!(fx.display.messages_for(p(1)), vec![MessageKey::ArenaDisabled]);
}

// =========================================================================
// A full round
// =========================================================================

#[tokio::test]
async fn test_round_plays_out_on_the_clock() {
    let fx = Fixture::new();
    let mut mgr = ArenaManager::new(fast_clock());
    let handle = loaded(&mut mgr, fx.arena(quick(2, 4))).await;

    mgr.join(p(1), ARENA).await.unwrap();
    mgr.join(p(2), ARENA).await.unwrap();
    wait_for(&handle, "round start", |i| i.phase == Phase::Running).await;
    assert_eq!(fx.rules().started, 1);

    mgr.player_died(p(2), Some(p(1))).await.unwrap();
    assert_eq!(mgr.player_arena(p(2)), None);
    let info = handle.info().await.unwrap();
    assert_eq!(info.phase, Phase::Celebrating);
    assert_eq!(info.players, vec![p(1)]);

    wait_for(&handle, "round end", |i| i.phase == Phase::Waiting).await;
    assert_eq!(fx.rules().stopped, 1);

    // The winner was removed by the arena itself.
    mgr.sync_events();
    assert_eq!(mgr.player_arena(p(1)), None);

    wait_for(&handle, "world restore", |i| !i.busy).await;
    assert!(mgr.join(p(1), ARENA).await.is_ok());
}

// =========================================================================
// Administration
// =========================================================================

#[tokio::test]
async fn test_edit_mode_pauses_ticks() {
    let fx = Fixture::new();
    let mut mgr = ArenaManager::new(fast_clock());
    let handle = loaded(&mut mgr, fx.arena(quick(2, 4))).await;

    handle.begin_edit().await.unwrap();
    assert!(handle.info().await.unwrap().in_setup);
    let err = mgr.join(p(1), ARENA).await.unwrap_err();
    assert!(matches!(err, ArenaError::Rejected(Rejection::InSetup)));

    let before = fx.display.statuses.lock().unwrap().len();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(fx.display.statuses.lock().unwrap().len(), before);

    handle.finish_edit().await.unwrap();
    wait_for(&handle, "new snapshot", |i| !i.busy && !i.in_setup).await;
    assert!(fx.env.archive_path(WORLD).is_file());
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(fx.display.statuses.lock().unwrap().len() > before);
}

#[tokio::test]
async fn test_reload_through_handle() {
    let fx = Fixture::new();
    let mut mgr = ArenaManager::new(fast_clock());
    let handle = loaded(&mut mgr, fx.arena(quick(2, 4))).await;

    handle.reload(quick(1, 2)).await.unwrap();
    let info = handle.info().await.unwrap();
    assert_eq!(info.max_players, 2);
    assert_eq!(info.min_players, 1);
}

#[tokio::test]
async fn test_joinable_lists_open_arenas() {
    let fx = Fixture::new();
    let mut mgr = ArenaManager::new(fast_clock());
    loaded(&mut mgr, fx.arena(quick(2, 4))).await;
    let reef = loaded(&mut mgr, reef_arena(&fx)).await;

    let names: Vec<_> = mgr.list().await.into_iter().map(|i| i.name).collect();
    assert_eq!(names, vec![ARENA.to_string(), "Reef".to_string()]);

    reef.set_enabled(false).await.unwrap();
    let open: Vec<_> = mgr.joinable().await.into_iter().map(|i| i.name).collect();
    assert_eq!(open, vec![ARENA.to_string()]);
}

#[tokio::test]
async fn test_unload_shuts_arena_down() {
    let fx = Fixture::new();
    let mut mgr = ArenaManager::new(fast_clock());
    let handle = loaded(&mut mgr, fx.arena(quick(2, 4))).await;
    mgr.join(p(1), ARENA).await.unwrap();

    mgr.unload(ARENA).await.unwrap();

    assert_eq!(fx.rules().shutdowns, 1);
    assert_eq!(mgr.arena_count(), 0);
    assert_eq!(mgr.player_arena(p(1)), None);
    assert!(!handle.is_alive());
    assert!(matches!(handle.info().await, Err(ArenaError::Unavailable(_))));
    assert!(matches!(mgr.unload(ARENA).await, Err(ArenaError::NotFound(_))));
}

#[tokio::test]
async fn test_unload_waits_for_world_snapshot() {
    let fx = Fixture::new();
    let mut mgr = ArenaManager::new(fast_clock());
    let gate = Arc::new(Gate::default());
    mgr.load(fx.arena_with(quick(2, 4), Arc::new(GatedArchiver(Arc::clone(&gate)))))
        .unwrap();

    let released = Arc::new(AtomicBool::new(false));
    let opener = {
        let (gate, released) = (Arc::clone(&gate), Arc::clone(&released));
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            released.store(true, Ordering::SeqCst);
            gate.open();
        })
    };

    mgr.unload(ARENA).await.unwrap();

    assert!(released.load(Ordering::SeqCst));
    assert!(fx.env.archive_path(WORLD).is_file());
    opener.await.unwrap();
}

#[tokio::test]
async fn test_reloaded_world_never_runs_two_snapshot_jobs() {
    let fx = Fixture::new();
    let mut mgr = ArenaManager::new(fast_clock());
    let archiver = Arc::new(CountingArchiver::new(Duration::from_millis(300)));

    mgr.load(fx.arena_with(quick(2, 4), archiver.clone())).unwrap();
    mgr.unload(ARENA).await.unwrap();
    let handle = mgr.load(fx.arena_with(quick(2, 4), archiver.clone())).unwrap();
    wait_for(&handle, "second snapshot", |i| !i.busy).await;

    assert_eq!(archiver.max_concurrent(), 1);
    assert_eq!(fs::read(fx.world_file()).unwrap(), b"pristine");
}

#[tokio::test]
async fn test_shutdown_all() {
    let fx = Fixture::new();
    let mut mgr = ArenaManager::new(fast_clock());
    loaded(&mut mgr, fx.arena(quick(2, 4))).await;
    loaded(&mut mgr, reef_arena(&fx)).await;

    mgr.shutdown_all().await;

    assert_eq!(mgr.arena_count(), 0);
    assert_eq!(fx.rules().shutdowns, 2);
}

// =========================================================================
// Actor robustness
// =========================================================================

#[tokio::test]
async fn test_dropping_last_handle_shuts_arena_down() {
    let fx = Fixture::new();
    let (handle, task) = spawn_arena(fx.arena(quick(2, 4)), fast_clock(), 8);

    drop(handle);
    task.await.unwrap();

    assert_eq!(fx.rules().shutdowns, 1);
}

/// Panics on the first `n` status updates, then records like normal.
struct PanickingDisplay {
    inner: Arc<RecordingDisplay>,
    panics_left: AtomicUsize,
}

impl ArenaDisplay for PanickingDisplay {
    fn message(&self, player: PlayerId, key: MessageKey) {
        self.inner.message(player, key);
    }

    fn popup(&self, player: PlayerId, key: MessageKey) {
        self.inner.popup(player, key);
    }

    fn status_update(&self, info: &ArenaInfo) {
        let left = self.panics_left.load(Ordering::SeqCst);
        if left > 0 {
            self.panics_left.store(left - 1, Ordering::SeqCst);
            panic!("sign renderer crashed");
        }
        self.inner.status_update(info);
    }

    fn refresh_scoreboard(&self, player: PlayerId, info: &ArenaInfo) {
        self.inner.refresh_scoreboard(player, info);
    }
}

#[tokio::test]
async fn test_panicking_tick_does_not_stop_arena() {
    let fx = Fixture::new();
    let mut services = fx.services();
    services.display = Arc::new(PanickingDisplay {
        inner: Arc::clone(&fx.display),
        panics_left: AtomicUsize::new(2),
    });
    let arena = Arena::with_debugger(
        quick(2, 4),
        fx.env.clone(),
        services,
        GameDebugger::in_memory(ARENA),
    )
    .unwrap();

    let (handle, _task) = spawn_arena(arena, fast_clock(), 8);
    for _ in 0..100 {
        if !fx.display.statuses.lock().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert!(!fx.display.statuses.lock().unwrap().is_empty());
    assert!(handle.is_alive());
    assert!(handle.info().await.is_ok());
}
