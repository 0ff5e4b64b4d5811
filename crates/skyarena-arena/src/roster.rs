//! Who is playing, on which team, with how many kills.

use std::collections::HashMap;

use crate::error::Rejection;
use crate::types::{PlayerId, SpawnPoint, TeamColor};

/// One player's per-round state.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerRecord {
    pub player: PlayerId,
    /// `None` in solo mode.
    pub team: Option<TeamColor>,
    pub kills: u32,
    pub cage: SpawnPoint,
}

impl PlayerRecord {
    pub fn new(player: PlayerId, team: Option<TeamColor>, cage: SpawnPoint) -> Self {
        Self {
            player,
            team,
            kills: 0,
            cage,
        }
    }
}

/// The active players of one arena, bounded by `capacity`.
#[derive(Debug, Clone)]
pub struct RosterManager {
    capacity: usize,
    players: HashMap<PlayerId, PlayerRecord>,
}

impl RosterManager {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            players: HashMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Change the bound. Existing players are kept even if above it.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.capacity
    }

    pub fn contains(&self, player: PlayerId) -> bool {
        self.players.contains_key(&player)
    }

    pub fn get(&self, player: PlayerId) -> Option<&PlayerRecord> {
        self.players.get(&player)
    }

    /// Add a player with zero kills.
    pub fn add(&mut self, mut record: PlayerRecord) -> Result<(), Rejection> {
        if self.contains(record.player) {
            return Err(Rejection::AlreadyJoined(record.player));
        }
        if self.is_full() {
            return Err(Rejection::Full);
        }
        record.kills = 0;
        self.players.insert(record.player, record);
        Ok(())
    }

    pub fn remove(&mut self, player: PlayerId) -> Option<PlayerRecord> {
        self.players.remove(&player)
    }

    /// Remove everyone, returning their records in player-id order.
    pub fn clear(&mut self) -> Vec<PlayerRecord> {
        let mut records: Vec<_> = self.players.drain().map(|(_, r)| r).collect();
        records.sort_by_key(|r| r.player);
        records
    }

    /// Player ids in ascending order.
    pub fn ids(&self) -> Vec<PlayerId> {
        let mut ids: Vec<_> = self.players.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn records(&self) -> impl Iterator<Item = &PlayerRecord> {
        self.players.values()
    }

    /// Credit a kill. Returns the new total, `None` if not in the roster.
    pub fn record_kill(&mut self, player: PlayerId) -> Option<u32> {
        let record = self.players.get_mut(&player)?;
        record.kills += 1;
        Some(record.kills)
    }

    pub fn kills(&self, player: PlayerId) -> Option<u32> {
        self.players.get(&player).map(|r| r.kills)
    }
}
