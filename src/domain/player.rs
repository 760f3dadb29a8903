// Authoritative per-connection player records and their wire-facing snapshots.

use crate::domain::weapon::WeaponLoadout;

/// Movement direction for a single move event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Server-side state for one connected player. One record per connection id.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: u64,
    pub name: String,
    // Opaque avatar reference; the server never inspects it.
    pub avatar: String,
    pub x: f32,
    pub y: f32,

    // Combat state.
    pub health: i32,
    pub max_health: i32,
    pub weapon: WeaponLoadout,
    pub is_dead: bool,
    // Epoch millis of the last committed attack; 0 means never attacked.
    pub last_attack_ms: u64,

    pub bitcoins: u64,
}

/// Full copy of a player record for broadcast payloads.
#[derive(Debug, Clone)]
pub struct PlayerSnapshot {
    pub id: u64,
    pub name: String,
    pub avatar: String,
    pub x: f32,
    pub y: f32,
    pub health: i32,
    pub max_health: i32,
    pub weapon: WeaponLoadout,
    pub is_dead: bool,
    pub bitcoins: u64,
}

impl From<&Player> for PlayerSnapshot {
    fn from(p: &Player) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            avatar: p.avatar.clone(),
            x: p.x,
            y: p.y,
            health: p.health,
            max_health: p.max_health,
            weapon: p.weapon.clone(),
            is_dead: p.is_dead,
            bitcoins: p.bitcoins,
        }
    }
}
