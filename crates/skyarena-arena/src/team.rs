//! Team colour partitioning for team-mode arenas.

use std::collections::BTreeMap;

use rand::Rng;

use crate::types::TeamColor;

/// Occupancy per team colour.
///
/// Empty in solo mode. In team mode it holds `max_teams - 1` colours drawn
/// at random from the palette.
#[derive(Debug, Clone, Default)]
pub struct TeamAssigner {
    occupancy: BTreeMap<TeamColor, usize>,
}

impl TeamAssigner {
    /// No teams (solo mode).
    pub fn solo() -> Self {
        Self::default()
    }

    /// Pick `max_teams - 1` distinct colours, each starting empty.
    pub fn configure<R: Rng + ?Sized>(max_teams: usize, rng: &mut R) -> Self {
        let mut palette = TeamColor::PALETTE.to_vec();
        let count = max_teams.saturating_sub(1).min(palette.len());

        let mut occupancy = BTreeMap::new();
        for _ in 0..count {
            let pick = rng.random_range(0..palette.len());
            occupancy.insert(palette.swap_remove(pick), 0);
        }
        Self { occupancy }
    }

    pub fn len(&self) -> usize {
        self.occupancy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occupancy.is_empty()
    }

    pub fn occupancy(&self, color: TeamColor) -> Option<usize> {
        self.occupancy.get(&color).copied()
    }

    pub fn colors(&self) -> impl Iterator<Item = TeamColor> + '_ {
        self.occupancy.keys().copied()
    }

    /// The emptiest team (lowest colour id on ties), counting the new member.
    pub fn least_populated_team(&mut self) -> Option<TeamColor> {
        let (&color, count) = self
            .occupancy
            .iter_mut()
            .min_by_key(|(color, count)| (**count, **color))?;
        *count += 1;
        Some(color)
    }

    /// A member of `color` left.
    pub fn release(&mut self, color: TeamColor) {
        if let Some(count) = self.occupancy.get_mut(&color) {
            *count = count.saturating_sub(1);
        }
    }

    /// Empty every team, keeping the colours.
    pub fn reset(&mut self) {
        self.occupancy.values_mut().for_each(|count| *count = 0);
    }
}
