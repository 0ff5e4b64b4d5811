//! Error types for the arena layer.

use std::path::PathBuf;

use crate::host::MessageKey;
use crate::types::PlayerId;
use crate::ConfigError;

/// Why an arena refused an operation.
///
/// A rejection is a precondition failure, not a fault: nothing was mutated,
/// and the acting player is told via [`Rejection::message_key`] where one
/// applies.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    /// A world snapshot or restore is in flight.
    #[error("arena is busy with its world")]
    Busy,

    /// The arena is being edited.
    #[error("arena is in setup mode")]
    InSetup,

    /// No roster slot or no free cage.
    #[error("arena is full")]
    Full,

    /// A round is already in progress.
    #[error("arena is already running")]
    AlreadyRunning,

    #[error("arena is disabled")]
    Disabled,

    #[error("player {0} already in arena")]
    AlreadyJoined(PlayerId),

    #[error("player {0} not in arena")]
    NotInArena(PlayerId),

    /// The game rules vetoed the join or leave.
    #[error("game rules denied the request")]
    Denied,

    /// Players are in the arena, so it cannot be edited or reconfigured.
    #[error("arena has players in it")]
    Occupied,

    /// `finish_edit` without a matching `begin_edit`.
    #[error("arena is not in setup mode")]
    NotInSetup,

    /// The host could not load the arena world.
    #[error("arena world is unavailable")]
    WorldUnavailable,

    /// The arena was shut down and accepts nothing further.
    #[error("arena has been shut down")]
    ShutDown,
}

impl Rejection {
    /// The message shown to a player whose join was refused, if any.
    pub fn message_key(&self) -> Option<MessageKey> {
        match self {
            Self::Busy | Self::InSetup => Some(MessageKey::ArenaInSetup),
            Self::Full => Some(MessageKey::ArenaFull),
            Self::AlreadyRunning => Some(MessageKey::ArenaRunning),
            Self::Disabled => Some(MessageKey::ArenaDisabled),
            _ => None,
        }
    }
}

/// Errors from building, loading or talking to an arena.
#[derive(Debug, thiserror::Error)]
pub enum ArenaError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Rejected(#[from] Rejection),

    /// The configured UTC offset is not a valid timezone.
    #[error("invalid utc offset of {0} minutes")]
    InvalidTimezone(i32),

    /// The debugger log could not be opened.
    #[error("cannot open arena log {}: {source}", .path.display())]
    Debugger {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("arena {0} not found")]
    NotFound(String),

    #[error("arena {0} is already loaded")]
    AlreadyLoaded(String),

    /// Another loaded arena plays on the same world.
    #[error("world {world} is already used by arena {arena}")]
    WorldInUse { world: String, arena: String },

    /// A reload tried to move a loaded arena to another world.
    #[error("arena {arena} cannot move to world {world} while loaded")]
    WorldChanged { arena: String, world: String },

    /// The player is playing in a different arena.
    #[error("player {player} is already in arena {arena}")]
    PlayerElsewhere { player: PlayerId, arena: String },

    /// The arena's command channel is full or closed.
    #[error("arena {0} is unavailable")]
    Unavailable(String),
}
