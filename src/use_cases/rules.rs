// World rule engine: validated transitions over registry + pickup pool.
//
// Every function here either commits a full state change and returns an
// outcome, or leaves the world untouched and returns `None`/`Err`. Nothing
// panics; a misbehaving client must never take down the shared room.

use crate::domain::{
    Direction, Player, PlayerSnapshot, WEAPON_KINDS, WeaponLoadout, WeaponPickup, WorldTuning,
};
use crate::use_cases::registry::EntityRegistry;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// All mutable room state, owned by the single room task.
#[derive(Debug)]
pub struct World {
    pub registry: EntityRegistry,
    pub pickups: Vec<WeaponPickup>,
    pub tuning: WorldTuning,
    next_pickup_id: u64,
    rng: StdRng,
}

impl World {
    pub fn new(tuning: WorldTuning) -> Self {
        Self::with_rng(tuning, StdRng::from_entropy())
    }

    /// Deterministic world for tests.
    pub fn seeded(tuning: WorldTuning, seed: u64) -> Self {
        Self::with_rng(tuning, StdRng::seed_from_u64(seed))
    }

    fn with_rng(tuning: WorldTuning, rng: StdRng) -> Self {
        Self {
            registry: EntityRegistry::new(),
            pickups: Vec::new(),
            tuning,
            next_pickup_id: 1,
            rng,
        }
    }

    /// Uniform random position inside the margin-inset spawn area.
    fn spawn_position(&mut self) -> (f32, f32) {
        let t = self.tuning;
        let x = t.spawn_margin + self.rng.gen_range(0.0..t.spawn_span_x);
        let y = t.spawn_margin + self.rng.gen_range(0.0..t.spawn_span_y);
        (x, y)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum JoinError {
    // The connection id already owns a player record.
    DuplicateSession,
}

#[derive(Debug)]
pub struct JoinOutcome {
    pub player: PlayerSnapshot,
    /// Roster after the insert, so it includes the new player.
    pub roster: Vec<PlayerSnapshot>,
    pub pickups: Vec<WeaponPickup>,
}

#[derive(Debug, Clone, Copy)]
pub struct MoveDelta {
    pub id: u64,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct DeathOutcome {
    pub stolen_bitcoins: u64,
    pub attacker_bitcoins: u64,
    pub target_bitcoins: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct AttackOutcome {
    pub attacker_id: u64,
    pub target_id: u64,
    pub damage: i32,
    pub target_health: i32,
    pub death: Option<DeathOutcome>,
}

#[derive(Debug, Clone)]
pub struct PickupOutcome {
    pub player_id: u64,
    pub pickup: WeaponPickup,
}

#[derive(Debug, Clone, Copy)]
pub struct RespawnOutcome {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    pub bitcoins: u64,
}

#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub id: u64,
    pub name: String,
    pub message: String,
}

/// Creates a player for a connection id at a random spawn position.
pub fn join(
    world: &mut World,
    conn_id: u64,
    name: String,
    avatar: String,
) -> Result<JoinOutcome, JoinError> {
    if world.registry.contains(conn_id) {
        return Err(JoinError::DuplicateSession);
    }

    let (x, y) = world.spawn_position();
    let player = Player {
        id: conn_id,
        name,
        avatar,
        x,
        y,
        health: 100,
        max_health: 100,
        weapon: WeaponLoadout::fists(),
        is_dead: false,
        last_attack_ms: 0,
        bitcoins: 0,
    };
    let snapshot = PlayerSnapshot::from(&player);
    world.registry.upsert(conn_id, player);

    Ok(JoinOutcome {
        player: snapshot,
        roster: world.registry.snapshot_all(),
        pickups: world.pickups.clone(),
    })
}

/// Applies one move step, clamped to world bounds. Absent or dead players
/// are swallowed silently; invalid moves are policy no-ops, not errors.
pub fn apply_move(world: &mut World, conn_id: u64, direction: Direction) -> Option<MoveDelta> {
    let t = world.tuning;
    let player = world.registry.get_mut(conn_id)?;
    if player.is_dead {
        return None;
    }

    match direction {
        Direction::Up => player.y = (player.y - t.move_speed).max(0.0),
        Direction::Down => player.y = (player.y + t.move_speed).min(t.height),
        Direction::Left => player.x = (player.x - t.move_speed).max(0.0),
        Direction::Right => player.x = (player.x + t.move_speed).min(t.width),
    }

    Some(MoveDelta {
        id: conn_id,
        x: player.x,
        y: player.y,
    })
}

fn distance(ax: f32, ay: f32, bx: f32, by: f32) -> f32 {
    let dx = ax - bx;
    let dy = ay - by;
    (dx * dx + dy * dy).sqrt()
}

/// Resolves one attack. No-ops on self-attacks, missing or dead parties,
/// unexpired cooldowns, and out-of-range targets (range boundary inclusive).
pub fn attack(
    world: &mut World,
    attacker_id: u64,
    target_id: u64,
    now_ms: u64,
) -> Option<AttackOutcome> {
    if attacker_id == target_id {
        return None;
    }

    let attacker = world.registry.get(attacker_id)?;
    if attacker.is_dead {
        return None;
    }
    if now_ms.saturating_sub(attacker.last_attack_ms) < world.tuning.attack_cooldown_ms {
        return None;
    }
    let (ax, ay) = (attacker.x, attacker.y);
    let damage = attacker.weapon.damage;
    let range = attacker.weapon.range;

    let target = world.registry.get(target_id)?;
    if target.is_dead {
        return None;
    }
    if distance(ax, ay, target.x, target.y) > range {
        return None;
    }

    // All checks passed; commit. Target first, then attacker bookkeeping.
    let target = world.registry.get_mut(target_id)?;
    target.health = (target.health - damage).max(0);
    let target_health = target.health;

    let mut stolen = 0;
    let died = target_health == 0;
    if died {
        target.is_dead = true;
        stolen = target.bitcoins;
        target.bitcoins = 0;
    }

    let attacker = world.registry.get_mut(attacker_id)?;
    attacker.last_attack_ms = now_ms;
    let death = if died {
        attacker.bitcoins += stolen;
        Some(DeathOutcome {
            stolen_bitcoins: stolen,
            attacker_bitcoins: attacker.bitcoins,
            target_bitcoins: 0,
        })
    } else {
        None
    };

    Some(AttackOutcome {
        attacker_id,
        target_id,
        damage,
        target_health,
        death,
    })
}

/// Claims a pickup. The pool entry is removed in the same transition that
/// rewrites the loadout, so a second claim for the same id is a plain
/// not-found no-op; commit order (mpsc arrival order) breaks ties.
pub fn pickup_weapon(world: &mut World, conn_id: u64, weapon_id: u64) -> Option<PickupOutcome> {
    let player = world.registry.get(conn_id)?;
    if player.is_dead {
        return None;
    }
    let (px, py) = (player.x, player.y);

    let index = world.pickups.iter().position(|w| w.id == weapon_id)?;
    let pickup = &world.pickups[index];
    if distance(px, py, pickup.x, pickup.y) > world.tuning.pickup_radius {
        return None;
    }

    let pickup = world.pickups.remove(index);
    let player = world.registry.get_mut(conn_id)?;
    player.weapon = WeaponLoadout::from(pickup.kind);

    Some(PickupOutcome {
        player_id: conn_id,
        pickup,
    })
}

/// Timer-driven revival. Requires the player to still exist *and* be dead,
/// which makes a respawn racing a disconnect a safe no-op.
pub fn respawn(world: &mut World, conn_id: u64) -> Option<RespawnOutcome> {
    if !world.registry.get(conn_id).is_some_and(|p| p.is_dead) {
        return None;
    }

    let (x, y) = world.spawn_position();
    let bonus = world.tuning.respawn_bonus;
    let player = world.registry.get_mut(conn_id)?;
    player.is_dead = false;
    player.health = player.max_health;
    player.x = x;
    player.y = y;
    player.weapon = WeaponLoadout::fists();
    player.bitcoins += bonus;

    Some(RespawnOutcome {
        id: conn_id,
        x,
        y,
        bitcoins: player.bitcoins,
    })
}

/// Chat relays the text verbatim; the sender just has to exist.
pub fn chat(world: &World, conn_id: u64, message: String) -> Option<ChatOutcome> {
    let player = world.registry.get(conn_id)?;
    Some(ChatOutcome {
        id: conn_id,
        name: player.name.clone(),
        message,
    })
}

/// Emotes pass through as long as the sender exists; dead players may emote.
pub fn emote_allowed(world: &World, conn_id: u64) -> bool {
    world.registry.contains(conn_id)
}

/// Removes the player. Returns `None` when the connection never joined.
pub fn leave(world: &mut World, conn_id: u64) -> Option<u64> {
    world.registry.remove(conn_id).map(|p| p.id)
}

/// Spawner tick: one random-kind pickup at a random position, unless the
/// pool is full.
pub fn spawn_pickup(world: &mut World) -> Option<WeaponPickup> {
    if world.pickups.len() >= world.tuning.max_pickups {
        return None;
    }

    let kind = &WEAPON_KINDS[world.rng.gen_range(0..WEAPON_KINDS.len())];
    let (x, y) = world.spawn_position();
    let pickup = WeaponPickup {
        id: world.next_pickup_id,
        x,
        y,
        kind,
    };
    world.next_pickup_id += 1;
    world.pickups.push(pickup.clone());
    Some(pickup)
}

/// Earnings tick: every living player accrues the passive amount. Returns
/// (id, new balance) pairs for targeted balance refreshes.
pub fn grant_earnings(world: &mut World) -> Vec<(u64, u64)> {
    let amount = world.tuning.earn_amount;
    let mut granted = Vec::new();
    world.registry.for_each_mut(|p| {
        if !p.is_dead {
            p.bitcoins += amount;
            granted.push((p.id, p.bitcoins));
        }
    });
    granted
}
