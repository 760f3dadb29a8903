// Weapon kinds, equipped loadouts, and world pickups.

/// Static description of a spawnable weapon kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeaponKind {
    pub name: &'static str,
    // Visual tag rendered by the client next to the pickup.
    pub emoji: &'static str,
    pub damage: i32,
    pub range: f32,
}

/// The kinds the spawner draws from.
pub const WEAPON_KINDS: [WeaponKind; 8] = [
    WeaponKind { name: "Sword", emoji: "\u{2694}\u{fe0f}", damage: 25, range: 80.0 },
    WeaponKind { name: "Bow", emoji: "\u{1f3f9}", damage: 20, range: 150.0 },
    WeaponKind { name: "Axe", emoji: "\u{1fa93}", damage: 35, range: 60.0 },
    WeaponKind { name: "Spear", emoji: "\u{1f531}", damage: 30, range: 100.0 },
    WeaponKind { name: "Hammer", emoji: "\u{1f528}", damage: 40, range: 50.0 },
    WeaponKind { name: "Dagger", emoji: "\u{1f5e1}\u{fe0f}", damage: 15, range: 40.0 },
    WeaponKind { name: "Staff", emoji: "\u{1f9af}", damage: 20, range: 90.0 },
    WeaponKind { name: "Crossbow", emoji: "\u{1f3f9}", damage: 30, range: 120.0 },
];

/// What a player currently fights with.
#[derive(Debug, Clone, PartialEq)]
pub struct WeaponLoadout {
    pub name: String,
    pub damage: i32,
    pub range: f32,
}

impl WeaponLoadout {
    /// Bare-handed default every player starts (and respawns) with.
    pub fn fists() -> Self {
        Self {
            name: "Fists".to_string(),
            damage: 10,
            range: 50.0,
        }
    }
}

impl From<&WeaponKind> for WeaponLoadout {
    fn from(kind: &WeaponKind) -> Self {
        Self {
            name: kind.name.to_string(),
            damage: kind.damage,
            range: kind.range,
        }
    }
}

/// An unclaimed weapon lying in the world.
#[derive(Debug, Clone)]
pub struct WeaponPickup {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    pub kind: &'static WeaponKind,
}
