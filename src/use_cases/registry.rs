// Entity registry: the id -> player table behind the rule engine.

use crate::domain::{Player, PlayerSnapshot};
use std::collections::HashMap;

/// In-memory mapping of connection id to player state.
///
/// All access happens from the single room task, so no interior locking is
/// needed; if this ever moves behind concurrent writers it must gain a lock,
/// because attack and pickup are read-then-write sequences over two records.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    players: HashMap<u64, Player>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or fully replaces the record for an id. Records are only ever
    /// written whole; partial updates go through `get_mut`.
    pub fn upsert(&mut self, id: u64, player: Player) {
        self.players.insert(id, player);
    }

    pub fn get(&self, id: u64) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    pub fn contains(&self, id: u64) -> bool {
        self.players.contains_key(&id)
    }

    /// Removes and returns the record, if present.
    pub fn remove(&mut self, id: u64) -> Option<Player> {
        self.players.remove(&id)
    }

    pub fn for_each(&self, mut f: impl FnMut(&Player)) {
        for player in self.players.values() {
            f(player);
        }
    }

    pub fn for_each_mut(&mut self, mut f: impl FnMut(&mut Player)) {
        for player in self.players.values_mut() {
            f(player);
        }
    }

    pub fn count(&self) -> usize {
        self.players.len()
    }

    /// Snapshot of every record, for roster payloads.
    pub fn snapshot_all(&self) -> Vec<PlayerSnapshot> {
        self.players.values().map(PlayerSnapshot::from).collect()
    }
}
