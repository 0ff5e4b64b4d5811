//! Spawn cage allocation.

use std::collections::HashMap;

use crate::types::{PlayerId, SpawnPoint};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CageError {
    /// Every cage is taken. Callers report this as "arena full".
    #[error("all {0} cages are taken")]
    Exhausted(usize),
}

/// Hands out one spawn cage per player from a fixed pool.
#[derive(Debug, Clone)]
pub struct CageAssigner {
    slots: Vec<SpawnPoint>,
    assigned: HashMap<PlayerId, usize>,
}

impl CageAssigner {
    pub fn new(slots: Vec<SpawnPoint>) -> Self {
        Self {
            slots,
            assigned: HashMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn available(&self) -> usize {
        self.slots.len() - self.assigned.len()
    }

    /// The cage for `player`: the one already held, else the lowest free one.
    pub fn next_cage(&mut self, player: PlayerId) -> Result<SpawnPoint, CageError> {
        if let Some(&slot) = self.assigned.get(&player) {
            return Ok(self.slots[slot]);
        }

        let slot = (0..self.slots.len())
            .find(|i| !self.assigned.values().any(|taken| taken == i))
            .ok_or(CageError::Exhausted(self.slots.len()))?;

        self.assigned.insert(player, slot);
        Ok(self.slots[slot])
    }

    /// Release the player's cage. `None` if they held none.
    pub fn remove_cage(&mut self, player: PlayerId) -> Option<SpawnPoint> {
        self.assigned.remove(&player).map(|slot| self.slots[slot])
    }

    pub fn cage_of(&self, player: PlayerId) -> Option<SpawnPoint> {
        self.assigned.get(&player).map(|&slot| self.slots[slot])
    }

    pub fn reset_all(&mut self) {
        self.assigned.clear();
    }
}
