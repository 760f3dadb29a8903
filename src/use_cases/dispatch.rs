// Single dispatch entry point: one inbound event in, an ordered list of
// outbound updates (with fan-out policy) and deferred timer events out.
// Transport-free so the whole protocol is testable without sockets.

use crate::use_cases::rules::{self, JoinError, World};
use crate::use_cases::types::{Deferred, DispatchOutcome, Outbound, RoomEvent, RoomUpdate};

use std::time::Duration;
use tracing::{info, warn};

/// Applies one event against the world and maps the committed outcome to
/// broadcast updates. Rejected events produce an empty outcome; nothing here
/// returns an error into the dispatch loop.
///
/// Fan-out asymmetry is deliberate protocol behavior: move/attack/chat/emote
/// go to everyone including the sender, join notices and leave notices go to
/// everyone else, and roster/loadout/balance refreshes are sender-only.
pub fn dispatch(world: &mut World, event: RoomEvent, now_ms: u64) -> DispatchOutcome {
    let mut out = DispatchOutcome::default();

    match event {
        RoomEvent::Join {
            conn_id,
            name,
            avatar,
        } => match rules::join(world, conn_id, name, avatar) {
            Ok(joined) => {
                info!(conn_id, name = %joined.player.name, "player joined");
                out.outbound.push(Outbound::only(
                    conn_id,
                    RoomUpdate::PlayerData(joined.player.clone()),
                ));
                out.outbound
                    .push(Outbound::only(conn_id, RoomUpdate::Roster(joined.roster)));
                out.outbound.push(Outbound::only(
                    conn_id,
                    RoomUpdate::PickupList(joined.pickups),
                ));
                out.outbound.push(Outbound::all_except(
                    conn_id,
                    RoomUpdate::PlayerJoined(joined.player),
                ));
            }
            Err(JoinError::DuplicateSession) => {
                warn!(conn_id, "duplicate join ignored");
            }
        },

        RoomEvent::Move { conn_id, direction } => {
            if let Some(delta) = rules::apply_move(world, conn_id, direction) {
                out.outbound.push(Outbound::all(RoomUpdate::PlayerMoved {
                    id: delta.id,
                    x: delta.x,
                    y: delta.y,
                }));
            }
        }

        RoomEvent::Attack { conn_id, target_id } => {
            if let Some(hit) = rules::attack(world, conn_id, target_id, now_ms) {
                if let Some(death) = hit.death {
                    info!(
                        attacker_id = conn_id,
                        target_id,
                        stolen_bitcoins = death.stolen_bitcoins,
                        "player killed"
                    );
                    out.outbound.push(Outbound::all(RoomUpdate::PlayerDied {
                        id: target_id,
                        killer_id: conn_id,
                        stolen_bitcoins: death.stolen_bitcoins,
                    }));
                    out.outbound.push(Outbound::only(
                        conn_id,
                        RoomUpdate::BitcoinUpdate {
                            bitcoins: death.attacker_bitcoins,
                        },
                    ));
                    out.outbound.push(Outbound::only(
                        target_id,
                        RoomUpdate::BitcoinUpdate {
                            bitcoins: death.target_bitcoins,
                        },
                    ));
                    // One respawn per death, scheduled here and only here.
                    out.deferred.push(Deferred {
                        delay: Duration::from_millis(world.tuning.respawn_delay_ms),
                        event: RoomEvent::Respawn {
                            conn_id: target_id,
                        },
                    });
                }
                out.outbound.push(Outbound::all(RoomUpdate::Attack {
                    attacker_id: hit.attacker_id,
                    target_id: hit.target_id,
                    damage: hit.damage,
                    target_health: hit.target_health,
                }));
            }
        }

        RoomEvent::PickupWeapon { conn_id, weapon_id } => {
            if let Some(claim) = rules::pickup_weapon(world, conn_id, weapon_id) {
                let loadout = crate::domain::WeaponLoadout::from(claim.pickup.kind);
                out.outbound
                    .push(Outbound::all(RoomUpdate::WeaponPickedUp {
                        player_id: claim.player_id,
                        weapon_id,
                        pickup: claim.pickup,
                    }));
                out.outbound
                    .push(Outbound::only(conn_id, RoomUpdate::WeaponUpdate(loadout)));
            }
        }

        RoomEvent::Chat { conn_id, message } => {
            if let Some(msg) = rules::chat(world, conn_id, message) {
                out.outbound.push(Outbound::all(RoomUpdate::ChatMessage {
                    id: msg.id,
                    name: msg.name,
                    message: msg.message,
                }));
            }
        }

        RoomEvent::Emote {
            conn_id,
            emote,
            x,
            y,
        } => {
            if rules::emote_allowed(world, conn_id) {
                out.outbound.push(Outbound::all(RoomUpdate::Emote {
                    id: conn_id,
                    emote,
                    x,
                    y,
                }));
            }
        }

        RoomEvent::Leave { conn_id } => {
            if let Some(id) = rules::leave(world, conn_id) {
                info!(conn_id, "player left");
                out.outbound
                    .push(Outbound::all_except(id, RoomUpdate::PlayerLeft { id }));
            }
        }

        RoomEvent::Respawn { conn_id } => {
            if let Some(revived) = rules::respawn(world, conn_id) {
                out.outbound
                    .push(Outbound::all(RoomUpdate::PlayerRespawned {
                        id: revived.id,
                        x: revived.x,
                        y: revived.y,
                        bitcoins: revived.bitcoins,
                    }));
                out.outbound.push(Outbound::only(
                    conn_id,
                    RoomUpdate::BitcoinUpdate {
                        bitcoins: revived.bitcoins,
                    },
                ));
            }
        }

        RoomEvent::SpawnPickup => {
            if let Some(pickup) = rules::spawn_pickup(world) {
                out.outbound
                    .push(Outbound::all(RoomUpdate::WeaponSpawned(pickup)));
            }
        }

        RoomEvent::GrantEarnings => {
            for (id, bitcoins) in rules::grant_earnings(world) {
                out.outbound
                    .push(Outbound::only(id, RoomUpdate::BitcoinUpdate { bitcoins }));
            }
        }
    }

    out
}
