//! Identity and geometry types shared by every arena component.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// A unique identifier for a player, assigned by the host server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Team colours
// ---------------------------------------------------------------------------

/// One of the 16 wool colours a team can play under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamColor(u8);

const COLOR_NAMES: [&str; 16] = [
    "white",
    "orange",
    "magenta",
    "light_blue",
    "yellow",
    "lime",
    "pink",
    "gray",
    "light_gray",
    "cyan",
    "purple",
    "blue",
    "brown",
    "green",
    "red",
    "black",
];

impl TeamColor {
    /// The full palette, in colour-id order.
    pub const PALETTE: [TeamColor; 16] = {
        let mut palette = [TeamColor(0); 16];
        let mut i = 0;
        while i < 16 {
            palette[i] = TeamColor(i as u8);
            i += 1;
        }
        palette
    };

    /// Colour with the given id, or `None` outside `0..16`.
    pub fn new(id: u8) -> Option<Self> {
        (usize::from(id) < COLOR_NAMES.len()).then_some(Self(id))
    }

    pub fn id(self) -> u8 {
        self.0
    }

    pub fn name(self) -> &'static str {
        COLOR_NAMES[usize::from(self.0)]
    }
}

impl fmt::Display for TeamColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Spawn points
// ---------------------------------------------------------------------------

/// A block position players are caged at before the round starts.
///
/// Serialized as `[x, y, z]` in arena config files.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct SpawnPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl SpawnPoint {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// The middle of the block, where a player should actually stand.
    pub fn centered(self) -> Self {
        Self {
            x: self.x + 0.5,
            y: self.y,
            z: self.z + 0.5,
        }
    }
}

impl From<[f64; 3]> for SpawnPoint {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self { x, y, z }
    }
}

impl From<SpawnPoint> for [f64; 3] {
    fn from(p: SpawnPoint) -> Self {
        [p.x, p.y, p.z]
    }
}

impl fmt::Display for SpawnPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}
