//! Contracts the arena needs from the host game server.
//!
//! The arena never touches entities, worlds or chat directly. It asks an
//! [`ArenaHost`] to act on the game world and an [`ArenaDisplay`] to show
//! things to players. Both are shared (`Arc`) and called only from the
//! arena's own task.

use std::fmt;

use crate::arena::ArenaInfo;
use crate::types::{PlayerId, SpawnPoint};

/// A failed host operation. Always logged, never propagated out of a tick.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("world {0} is not available")]
    WorldUnavailable(String),

    #[error("player {0} is offline")]
    PlayerOffline(PlayerId),

    #[error("{0}")]
    Other(String),
}

/// Operations on the game world the arena lives in.
pub trait ArenaHost: Send + Sync + 'static {
    /// Load the world (no-op if loaded) so it can be played on.
    fn load_world(&self, world: &str) -> Result<(), HostError>;

    /// Unload the world so its files can be replaced.
    fn unload_world(&self, world: &str) -> Result<(), HostError>;

    /// Pin the world's time of day and stop its daylight cycle.
    fn lock_world_time(&self, world: &str, time: u32) -> Result<(), HostError>;

    fn teleport(&self, player: PlayerId, world: &str, to: SpawnPoint) -> Result<(), HostError>;

    /// Send the player back to the server lobby.
    fn teleport_lobby(&self, player: PlayerId) -> Result<(), HostError>;

    /// Clear experience, effects, inventory and reset the game mode.
    fn reset_transient_state(&self, player: PlayerId) -> Result<(), HostError>;

    fn set_spectator(&self, player: PlayerId) -> Result<(), HostError>;

    /// Hand out the items a player gets after the round (e.g. leave item).
    fn give_game_items(&self, player: PlayerId, post_game: bool) -> Result<(), HostError>;
}

/// Translation keys for player-facing text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    ArenaInSetup,
    ArenaFull,
    ArenaRunning,
    ArenaDisabled,
    ArenaStart,
    WaitPlayers,
    LowPlayers,
    /// Seconds left before the round starts.
    Countdown(u64),
}

impl MessageKey {
    pub fn key(self) -> &'static str {
        match self {
            Self::ArenaInSetup => "arena-insetup",
            Self::ArenaFull => "arena-full",
            Self::ArenaRunning => "arena-running",
            Self::ArenaDisabled => "arena-disabled",
            Self::ArenaStart => "arena-start",
            Self::WaitPlayers => "arena-wait-players",
            Self::LowPlayers => "arena-low-players",
            Self::Countdown(_) => "arena-countdown",
        }
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Countdown(secs) => write!(f, "{}({secs})", self.key()),
            other => f.write_str(other.key()),
        }
    }
}

/// Player-facing output. Fire-and-forget.
pub trait ArenaDisplay: Send + Sync + 'static {
    /// A chat message to one player.
    fn message(&self, player: PlayerId, key: MessageKey);

    /// A transient popup above one player's hotbar.
    fn popup(&self, player: PlayerId, key: MessageKey);

    /// Per-tick arena status, e.g. for join signs.
    fn status_update(&self, info: &ArenaInfo);

    /// Redraw one player's scoreboard.
    fn refresh_scoreboard(&self, player: PlayerId, info: &ArenaInfo);
}
