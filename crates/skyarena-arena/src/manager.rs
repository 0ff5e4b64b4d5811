//! Arena manager: loads arenas, tracks and routes players to them.

use std::collections::HashMap;

use skyarena_tick::ClockConfig;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::actor::spawn_arena;
use crate::arena::{Arena, ArenaEvent, ArenaInfo};
use crate::error::{ArenaError, Rejection};
use crate::roster::PlayerRecord;
use crate::types::{PlayerId, SpawnPoint};
use crate::ArenaHandle;

/// Default command channel size for arena actors.
const DEFAULT_CHANNEL_SIZE: usize = 64;

struct LoadedArena {
    handle: ArenaHandle,
    world: String,
    task: JoinHandle<()>,
}

/// Every loaded arena, plus which player is in which arena.
///
/// A player is in at most one arena at a time. The index is kept in step
/// with the arenas through the [`ArenaEvent`]s they publish, so players
/// removed by the arena itself (deaths, round end) drop out of it too.
pub struct ArenaManager {
    arenas: HashMap<String, LoadedArena>,
    player_arenas: HashMap<PlayerId, String>,
    events_tx: mpsc::UnboundedSender<ArenaEvent>,
    events_rx: mpsc::UnboundedReceiver<ArenaEvent>,
    clock: ClockConfig,
}

impl ArenaManager {
    /// A manager whose arenas tick according to `clock`.
    pub fn new(clock: ClockConfig) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            arenas: HashMap::new(),
            player_arenas: HashMap::new(),
            events_tx,
            events_rx,
            clock: clock.validated(),
        }
    }

    /// Take ownership of `arena`: reset it to its pristine state and start
    /// its actor.
    ///
    /// Each world belongs to at most one loaded arena.
    pub fn load(&mut self, mut arena: Arena) -> Result<ArenaHandle, ArenaError> {
        let name = arena.name().to_string();
        if self.arenas.contains_key(&name) {
            return Err(ArenaError::AlreadyLoaded(name));
        }
        let world = arena.config().arena_world.clone();
        if let Some((owner, _)) = self.arenas.iter().find(|(_, l)| l.world == world) {
            return Err(ArenaError::WorldInUse {
                world,
                arena: owner.clone(),
            });
        }

        arena.set_event_sender(self.events_tx.clone());
        arena.reset_arena();

        let (handle, task) = spawn_arena(arena, self.clock.clone(), DEFAULT_CHANNEL_SIZE);
        self.arenas.insert(
            name.clone(),
            LoadedArena {
                handle: handle.clone(),
                world,
                task,
            },
        );
        info!(arena = %name, "arena registered");
        Ok(handle)
    }

    /// Put `player` into `arena`.
    pub async fn join(&mut self, player: PlayerId, arena: &str) -> Result<SpawnPoint, ArenaError> {
        self.sync_events();
        if let Some(current) = self.player_arenas.get(&player) {
            if current == arena {
                return Err(Rejection::AlreadyJoined(player).into());
            }
            return Err(ArenaError::PlayerElsewhere {
                player,
                arena: current.clone(),
            });
        }

        let handle = self.handle(arena)?;
        let spawn = handle.join(player).await?;
        self.player_arenas.insert(player, arena.to_string());
        Ok(spawn)
    }

    /// Take `player` out of whatever arena they are in.
    pub async fn leave(&mut self, player: PlayerId, forced: bool) -> Result<PlayerRecord, ArenaError> {
        self.sync_events();
        let name = self.arena_of(player)?;
        let handle = self.handle(&name)?;

        let result = handle.leave(player, forced).await;
        match &result {
            Ok(_) | Err(ArenaError::Rejected(Rejection::NotInArena(_))) => {
                self.player_arenas.remove(&player);
            }
            Err(_) => {}
        }
        result
    }

    /// Route a death to the victim's arena.
    pub async fn player_died(
        &mut self,
        victim: PlayerId,
        killer: Option<PlayerId>,
    ) -> Result<(), ArenaError> {
        self.sync_events();
        let name = self.arena_of(victim)?;
        self.handle(&name)?.player_died(victim, killer).await?;
        self.player_arenas.remove(&victim);
        Ok(())
    }

    pub async fn info(&self, arena: &str) -> Result<ArenaInfo, ArenaError> {
        self.handle(arena)?.info().await
    }

    /// Info for every arena that answers, sorted by name.
    pub async fn list(&self) -> Vec<ArenaInfo> {
        let mut infos = Vec::with_capacity(self.arenas.len());
        for loaded in self.arenas.values() {
            match loaded.handle.info().await {
                Ok(info) => infos.push(info),
                Err(e) => warn!(arena = %loaded.handle.name(), error = %e, "arena did not answer"),
            }
        }
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    /// Arenas a player could join right now.
    pub async fn joinable(&self) -> Vec<ArenaInfo> {
        self.list()
            .await
            .into_iter()
            .filter(|info| {
                info.phase.is_joinable()
                    && info.enabled
                    && !info.busy
                    && !info.in_setup
                    && info.players.len() < info.max_players
            })
            .collect()
    }

    /// Shut an arena down and forget it.
    ///
    /// Returns once the arena's last world snapshot has finished, so its
    /// world can be loaded again straight away.
    pub async fn unload(&mut self, arena: &str) -> Result<(), ArenaError> {
        let loaded = self
            .arenas
            .remove(arena)
            .ok_or_else(|| ArenaError::NotFound(arena.to_string()))?;

        if let Err(e) = loaded.handle.shutdown().await {
            warn!(arena, error = %e, "arena was already gone");
        }
        if let Err(e) = loaded.task.await {
            warn!(arena, error = %e, "arena task ended abnormally");
        }

        self.player_arenas.retain(|_, name| name != arena);
        self.sync_events();
        info!(arena, "arena unloaded");
        Ok(())
    }

    /// Unload every arena.
    pub async fn shutdown_all(&mut self) {
        let mut names: Vec<_> = self.arenas.keys().cloned().collect();
        names.sort();
        for name in names {
            if let Err(e) = self.unload(&name).await {
                warn!(arena = %name, error = %e, "unload failed");
            }
        }
    }

    /// Apply events published by the arenas to the player index.
    pub fn sync_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                ArenaEvent::PlayerJoined { arena, player } => {
                    self.player_arenas.insert(player, arena);
                }
                ArenaEvent::PlayerLeft { arena, player } => {
                    if self.player_arenas.get(&player) == Some(&arena) {
                        self.player_arenas.remove(&player);
                    }
                }
                ArenaEvent::ShutDown { arena } => {
                    self.player_arenas.retain(|_, name| *name != arena);
                }
                ArenaEvent::PhaseChanged { .. } | ArenaEvent::SnapshotFinished { .. } => {}
            }
        }
    }

    /// The arena `player` is in, as of the last event sync.
    pub fn player_arena(&self, player: PlayerId) -> Option<&str> {
        self.player_arenas.get(&player).map(String::as_str)
    }

    pub fn handle(&self, arena: &str) -> Result<ArenaHandle, ArenaError> {
        self.arenas
            .get(arena)
            .map(|loaded| loaded.handle.clone())
            .ok_or_else(|| ArenaError::NotFound(arena.to_string()))
    }

    pub fn arena_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.arenas.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn arena_count(&self) -> usize {
        self.arenas.len()
    }

    fn arena_of(&self, player: PlayerId) -> Result<String, ArenaError> {
        self.player_arenas
            .get(&player)
            .cloned()
            .ok_or(ArenaError::Rejected(Rejection::NotInArena(player)))
    }
}

impl Default for ArenaManager {
    fn default() -> Self {
        Self::new(ClockConfig::default())
    }
}
