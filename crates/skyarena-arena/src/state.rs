//! Arena phases and the status text shown on join signs.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where an arena is in its round lifecycle.
///
/// Phases are ordered: `Waiting < SlopeWaiting < Running < Celebrating`.
/// The cycle always returns to `Waiting` through the stop sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    /// Waiting for enough players.
    Waiting,
    /// Enough players; the start countdown is running.
    SlopeWaiting,
    /// The round is being played.
    Running,
    /// One survivor left; post-game celebration.
    Celebrating,
}

impl Phase {
    /// Players may still join.
    pub fn is_joinable(self) -> bool {
        self <= Phase::SlopeWaiting
    }

    /// A round has started and not yet been stopped.
    pub fn is_in_game(self) -> bool {
        self >= Phase::Running
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => write!(f, "waiting"),
            Self::SlopeWaiting => write!(f, "slope-waiting"),
            Self::Running => write!(f, "running"),
            Self::Celebrating => write!(f, "celebrating"),
        }
    }
}

/// Human-facing status line for signs and arena lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadableStatus {
    FinishingUp,
    InSetup,
    Disabled,
    ClickToJoin,
    Starting,
    Running,
    Ended,
    Unknown,
}

impl ReadableStatus {
    /// Derive the status. The first matching rule wins:
    /// busy, setup, disabled, joinable phase, roster at minimum, running,
    /// celebrating.
    ///
    /// A running arena with at least `min_players` left reads "Starting".
    /// Signs have always shown it that way.
    pub fn evaluate(
        busy: bool,
        in_setup: bool,
        enabled: bool,
        phase: Phase,
        roster: usize,
        min_players: usize,
    ) -> Self {
        if busy {
            Self::FinishingUp
        } else if in_setup {
            Self::InSetup
        } else if !enabled {
            Self::Disabled
        } else if phase.is_joinable() {
            Self::ClickToJoin
        } else if roster >= min_players {
            Self::Starting
        } else if phase == Phase::Running {
            Self::Running
        } else if phase == Phase::Celebrating {
            Self::Ended
        } else {
            Self::Unknown
        }
    }

    pub fn text(self) -> &'static str {
        match self {
            Self::FinishingUp => "Finishing things up",
            Self::InSetup => "In setup",
            Self::Disabled => "Disabled",
            Self::ClickToJoin => "Click to join!",
            Self::Starting => "Starting",
            Self::Running => "Running",
            Self::Ended => "Ended",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ReadableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}
