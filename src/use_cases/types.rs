// Use-case level inputs/outputs for the room dispatch loop.

use crate::domain::{Direction, PlayerSnapshot, WeaponLoadout, WeaponPickup};
use std::time::Duration;

/// Everything that can mutate room state, from sockets and timers alike.
/// All variants funnel through one channel so mutations stay serialized.
#[derive(Debug, Clone)]
pub enum RoomEvent {
    Join {
        conn_id: u64,
        name: String,
        avatar: String,
    },
    Move {
        conn_id: u64,
        direction: Direction,
    },
    Attack {
        conn_id: u64,
        target_id: u64,
    },
    PickupWeapon {
        conn_id: u64,
        weapon_id: u64,
    },
    Chat {
        conn_id: u64,
        message: String,
    },
    Emote {
        conn_id: u64,
        emote: String,
        x: f32,
        y: f32,
    },
    Leave {
        conn_id: u64,
    },
    // Timer-driven events below; never sent by clients.
    Respawn {
        conn_id: u64,
    },
    SpawnPickup,
    GrantEarnings,
}

/// Which connections an update is delivered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipients {
    All,
    AllExcept(u64),
    Only(u64),
}

impl Recipients {
    /// Whether a connection with this id should receive the update.
    pub fn includes(&self, conn_id: u64) -> bool {
        match *self {
            Recipients::All => true,
            Recipients::AllExcept(excluded) => conn_id != excluded,
            Recipients::Only(target) => conn_id == target,
        }
    }
}

/// A committed state change, shaped for broadcast.
#[derive(Debug, Clone)]
pub enum RoomUpdate {
    /// The joining player's own record.
    PlayerData(PlayerSnapshot),
    /// Full roster, sent to a newly joined player.
    Roster(Vec<PlayerSnapshot>),
    /// Current pickup pool, sent to a newly joined player.
    PickupList(Vec<WeaponPickup>),
    PlayerJoined(PlayerSnapshot),
    PlayerMoved {
        id: u64,
        x: f32,
        y: f32,
    },
    Attack {
        attacker_id: u64,
        target_id: u64,
        damage: i32,
        target_health: i32,
    },
    PlayerDied {
        id: u64,
        killer_id: u64,
        stolen_bitcoins: u64,
    },
    WeaponSpawned(WeaponPickup),
    WeaponPickedUp {
        player_id: u64,
        weapon_id: u64,
        pickup: WeaponPickup,
    },
    /// Targeted loadout confirmation for the claimant.
    WeaponUpdate(WeaponLoadout),
    PlayerRespawned {
        id: u64,
        x: f32,
        y: f32,
        bitcoins: u64,
    },
    /// Targeted balance refresh for one player.
    BitcoinUpdate {
        bitcoins: u64,
    },
    ChatMessage {
        id: u64,
        name: String,
        message: String,
    },
    Emote {
        id: u64,
        emote: String,
        x: f32,
        y: f32,
    },
    PlayerLeft {
        id: u64,
    },
}

/// One update paired with its fan-out policy.
#[derive(Debug, Clone)]
pub struct Outbound {
    pub recipients: Recipients,
    pub update: RoomUpdate,
}

impl Outbound {
    pub fn all(update: RoomUpdate) -> Self {
        Self {
            recipients: Recipients::All,
            update,
        }
    }

    pub fn all_except(conn_id: u64, update: RoomUpdate) -> Self {
        Self {
            recipients: Recipients::AllExcept(conn_id),
            update,
        }
    }

    pub fn only(conn_id: u64, update: RoomUpdate) -> Self {
        Self {
            recipients: Recipients::Only(conn_id),
            update,
        }
    }
}

/// An event the room must re-enqueue to itself after a delay.
#[derive(Debug, Clone)]
pub struct Deferred {
    pub delay: Duration,
    pub event: RoomEvent,
}

/// Result of dispatching one inbound event: updates to fan out, in commit
/// order, plus any timer events to schedule.
#[derive(Debug, Clone, Default)]
pub struct DispatchOutcome {
    pub outbound: Vec<Outbound>,
    pub deferred: Vec<Deferred>,
}

#[cfg(test)]
mod tests {
    use super::Recipients;

    #[test]
    fn recipients_all_includes_everyone() {
        assert!(Recipients::All.includes(1));
        assert!(Recipients::All.includes(2));
    }

    #[test]
    fn recipients_all_except_skips_only_the_excluded() {
        let r = Recipients::AllExcept(7);
        assert!(!r.includes(7));
        assert!(r.includes(8));
    }

    #[test]
    fn recipients_only_matches_single_target() {
        let r = Recipients::Only(3);
        assert!(r.includes(3));
        assert!(!r.includes(4));
    }
}
