//! Arena configuration and the filesystem environment an arena runs in.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::SpawnPoint;

/// Number of team colours available; a team arena uses at most this many.
pub const MAX_TEAM_COLORS: usize = 16;

/// Whether players fight alone or in coloured teams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArenaMode {
    #[default]
    Solo,
    Team,
}

/// Problems with an arena definition.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("malformed arena config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("arena config is missing `{0}`")]
    MissingField(&'static str),

    #[error("min-players ({min}) must be at least 1 and at most max-players ({max})")]
    InvalidPlayerRange { min: usize, max: usize },

    #[error("max-teams must be between 2 and {max}, got {0}", max = MAX_TEAM_COLORS + 1)]
    InvalidTeamCount(usize),
}

/// Definition of one arena, as stored in `{data_folder}/arenas/{name}.json`.
///
/// Durations are whole seconds except `task-grace`, which is milliseconds.
///
/// ```json
/// {
///   "arena-name": "Lagoon",
///   "arena-world": "lagoon",
///   "min-players": 2,
///   "max-players": 4,
///   "spawn-pedestals": [[0, 70, 0], [10, 70, 0], [0, 70, 10], [10, 70, 10]]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ArenaConfig {
    pub arena_name: String,
    pub arena_world: String,
    pub enabled: bool,
    pub min_players: usize,
    pub max_players: usize,
    pub arena_mode: ArenaMode,
    /// Team count as configured; the arena plays with one fewer colour.
    pub max_teams: usize,
    /// World time pinned every tick, if set.
    pub time_of_day: Option<u32>,
    /// Round length limit in seconds. `None` plays until one player is left.
    pub arena_duration: Option<u64>,
    pub start_countdown: u64,
    pub celebration_time: u64,
    /// Delay in milliseconds before game-logic recurring tasks first fire
    /// after a reset.
    #[serde(rename = "task-grace")]
    pub task_grace_ms: u64,
    pub spawn_pedestals: Vec<SpawnPoint>,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            arena_name: String::new(),
            arena_world: String::new(),
            enabled: true,
            min_players: 2,
            max_players: 8,
            arena_mode: ArenaMode::Solo,
            max_teams: 4,
            time_of_day: None,
            arena_duration: None,
            start_countdown: 60,
            celebration_time: 10,
            task_grace_ms: 1000,
            spawn_pedestals: Vec::new(),
        }
    }
}

impl ArenaConfig {
    /// Parse and validate a JSON arena definition.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.arena_name.trim().is_empty() {
            return Err(ConfigError::MissingField("arena-name"));
        }
        if self.arena_world.trim().is_empty() {
            return Err(ConfigError::MissingField("arena-world"));
        }
        if self.min_players == 0 || self.min_players > self.max_players {
            return Err(ConfigError::InvalidPlayerRange {
                min: self.min_players,
                max: self.max_players,
            });
        }
        if self.team_mode() && !(2..=MAX_TEAM_COLORS + 1).contains(&self.max_teams) {
            return Err(ConfigError::InvalidTeamCount(self.max_teams));
        }
        Ok(())
    }

    pub fn team_mode(&self) -> bool {
        self.arena_mode == ArenaMode::Team
    }

    pub fn start_countdown(&self) -> Duration {
        Duration::from_secs(self.start_countdown)
    }

    pub fn celebration_time(&self) -> Duration {
        Duration::from_secs(self.celebration_time)
    }

    pub fn duration_limit(&self) -> Option<Duration> {
        self.arena_duration.map(Duration::from_secs)
    }

    pub fn task_grace(&self) -> Duration {
        Duration::from_millis(self.task_grace_ms)
    }
}

/// Where an arena finds its files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArenaEnv {
    /// The plugin data folder: arena configs, archives, debugger logs.
    pub data_folder: PathBuf,
    /// The server data path; live worlds live under `worlds/`.
    pub server_data_path: PathBuf,
    /// Offset from UTC, in minutes, for debugger timestamps.
    pub utc_offset_minutes: i32,
}

impl ArenaEnv {
    pub fn new(data_folder: impl Into<PathBuf>, server_data_path: impl Into<PathBuf>) -> Self {
        Self {
            data_folder: data_folder.into(),
            server_data_path: server_data_path.into(),
            utc_offset_minutes: 0,
        }
    }

    pub fn with_utc_offset(mut self, minutes: i32) -> Self {
        self.utc_offset_minutes = minutes;
        self
    }

    /// `{data_folder}/arenas`, where arena definitions are stored.
    pub fn arenas_dir(&self) -> PathBuf {
        self.data_folder.join("arenas")
    }

    /// `{data_folder}/arenas/worlds/{world}.zip`
    pub fn archive_path(&self, world: &str) -> PathBuf {
        self.arenas_dir().join("worlds").join(format!("{world}.zip"))
    }

    /// `{server_data_path}/worlds/{world}`
    pub fn world_path(&self, world: &str) -> PathBuf {
        self.server_data_path.join("worlds").join(world)
    }

    /// `{data_folder}/logs`
    pub fn logs_dir(&self) -> PathBuf {
        self.data_folder.join("logs")
    }

    pub fn data_folder(&self) -> &Path {
        &self.data_folder
    }
}
