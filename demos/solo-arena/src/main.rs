use std::error::Error;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde_json::json;
use skyarena::prelude::*;

const ARENA: &str = "Crater";
const WORLD: &str = "crater";

// ---------------------------------------------------------------------------
// Collaborators that only log
// ---------------------------------------------------------------------------

struct LoggingHost;

impl ArenaHost for LoggingHost {
    fn load_world(&self, world: &str) -> Result<(), HostError> {
        tracing::info!(world, "load world");
        Ok(())
    }

    fn unload_world(&self, world: &str) -> Result<(), HostError> {
        tracing::info!(world, "unload world");
        Ok(())
    }

    fn lock_world_time(&self, world: &str, time: u32) -> Result<(), HostError> {
        tracing::trace!(world, time, "lock time");
        Ok(())
    }

    fn teleport(&self, player: PlayerId, world: &str, to: SpawnPoint) -> Result<(), HostError> {
        tracing::info!(%player, world, x = to.x, y = to.y, z = to.z, "teleport");
        Ok(())
    }

    fn teleport_lobby(&self, player: PlayerId) -> Result<(), HostError> {
        tracing::info!(%player, "back to lobby");
        Ok(())
    }

    fn reset_transient_state(&self, player: PlayerId) -> Result<(), HostError> {
        tracing::debug!(%player, "reset player state");
        Ok(())
    }

    fn set_spectator(&self, player: PlayerId) -> Result<(), HostError> {
        tracing::info!(%player, "spectator mode");
        Ok(())
    }

    fn give_game_items(&self, player: PlayerId, post_game: bool) -> Result<(), HostError> {
        tracing::debug!(%player, post_game, "items handed out");
        Ok(())
    }
}

struct LoggingDisplay;

impl ArenaDisplay for LoggingDisplay {
    fn message(&self, player: PlayerId, key: MessageKey) {
        tracing::info!(%player, message = %key, "chat");
    }

    fn popup(&self, player: PlayerId, key: MessageKey) {
        tracing::debug!(%player, popup = %key, "popup");
    }

    fn status_update(&self, info: &ArenaInfo) {
        tracing::trace!(arena = %info.name, status = info.status.text(), "sign");
    }

    fn refresh_scoreboard(&self, _player: PlayerId, _info: &ArenaInfo) {}
}

// ---------------------------------------------------------------------------
// Rules: last one standing, with a slowly closing border
// ---------------------------------------------------------------------------

#[derive(Default)]
struct SoloRules {
    border: Arc<AtomicU64>,
}

impl GameRules for SoloRules {
    fn start_arena(&mut self) {
        self.border.store(100, Ordering::SeqCst);
        tracing::info!("round started, border at 100");
    }

    fn stop_arena(&mut self) {
        tracing::info!("round over");
    }

    fn shutdown(&mut self) {
        tracing::info!("rules unloaded");
    }

    fn join_to_arena(&mut self, _player: PlayerId, _spawn: SpawnPoint) -> bool {
        true
    }

    fn leave_arena(&mut self, _player: PlayerId, _forced: bool) -> bool {
        true
    }

    fn remove_all_players(&mut self) {}

    fn runtime_tasks(&mut self) -> Vec<RecurringTask> {
        let border = Arc::clone(&self.border);
        vec![RecurringTask::new("border", Duration::from_millis(500), move || {
            let _ = border.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |b| b.checked_sub(5));
        })]
    }
}

// ---------------------------------------------------------------------------
// Bootstrap
// ---------------------------------------------------------------------------

/// Lay out a world and an arena definition under `root` if missing.
fn prepare(root: &Path, start_countdown: u64) -> std::io::Result<()> {
    let world = root.join("server").join("worlds").join(WORLD);
    fs::create_dir_all(world.join("region"))?;
    fs::write(world.join("level.dat"), b"crater")?;

    let arenas = root.join("data").join("arenas");
    fs::create_dir_all(&arenas)?;
    let config = json!({
        "arena-name": ARENA,
        "arena-world": WORLD,
        "min-players": 2,
        "max-players": 4,
        "time-of-day": 6000,
        "start-countdown": start_countdown,
        "celebration-time": 2,
        "task-grace": 200,
        "spawn-pedestals": [[0, 80, 0], [20, 80, 0], [0, 80, 20], [20, 80, 20]],
    });
    fs::write(arenas.join(format!("{WORLD}.json")), config.to_string())
}

async fn wait_until(
    server: &ArenaServer,
    what: &str,
    pred: impl Fn(&ArenaInfo) -> bool,
) -> Result<ArenaInfo, Box<dyn Error>> {
    let poll = async {
        loop {
            let info = server.manager().info(ARENA).await?;
            if pred(&info) {
                return Ok::<_, SkyArenaError>(info);
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    };
    match tokio::time::timeout(Duration::from_secs(30), poll).await {
        Ok(info) => Ok(info?),
        Err(_) => Err(format!("timed out waiting for {what}").into()),
    }
}

/// Four bots join, three die, the fourth celebrates. Returns the winner.
async fn play_round(server: &mut ArenaServer) -> Result<PlayerId, Box<dyn Error>> {
    wait_until(server, "world snapshot", |i| !i.busy).await?;

    let bots: Vec<PlayerId> = (1..=4).map(PlayerId).collect();
    for &bot in &bots {
        let spawn = server.manager_mut().join(bot, ARENA).await?;
        tracing::info!(%bot, ?spawn, "bot joined");
    }

    wait_until(server, "round start", |i| i.phase == Phase::Running).await?;

    let winner = bots[bots.len() - 1];
    for &loser in &bots[..bots.len() - 1] {
        tokio::time::sleep(Duration::from_millis(300)).await;
        server.manager_mut().player_died(loser, Some(winner)).await?;
        tracing::info!(%loser, %winner, "eliminated");
    }

    wait_until(server, "celebration end", |i| i.phase == Phase::Waiting).await?;
    server.manager_mut().sync_events();
    Ok(winner)
}

async fn run_demo(root: &Path, clock: ClockConfig, start_countdown: u64) -> Result<PlayerId, Box<dyn Error>> {
    prepare(root, start_countdown)?;

    let mut server = ArenaServer::builder()
        .data_folder(root.join("data"))
        .server_data_path(root.join("server"))
        .clock(clock)
        .build(Arc::new(LoggingHost), Arc::new(LoggingDisplay), |_| {
            Box::new(SoloRules::default())
        })
        .await?;

    let winner = play_round(&mut server).await?;
    server.shutdown().await;
    Ok(winner)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_tracing("info,skyarena_arena=debug");

    let root = std::env::temp_dir().join("skyarena-solo-demo");
    let clock = ClockConfig::every(Duration::from_millis(250));
    let winner = run_demo(&root, clock, 3).await?;

    tracing::info!(%winner, logs = %root.join("data").join("logs").display(), "demo finished");
    Ok(())
}
