// The authoritative room loop. One task owns all mutable state; every
// inbound event (socket or timer) is processed to completion before the
// next, so registry and pool mutations are serialized without locks.

use crate::domain::WorldTuning;
use crate::use_cases::dispatch::dispatch;
use crate::use_cases::rules::World;
use crate::use_cases::types::{Outbound, RoomEvent};

use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{broadcast, mpsc};
use tracing::info;

fn now_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Runs the room until the process exits. `input_tx` is the same channel the
/// adapters write to; the task keeps a clone so deferred events (respawns)
/// re-enter the serialized dispatch path instead of mutating state from a
/// timer context.
pub async fn room_task(
    mut input_rx: mpsc::Receiver<RoomEvent>,
    input_tx: mpsc::Sender<RoomEvent>,
    updates_tx: broadcast::Sender<Outbound>,
    tuning: WorldTuning,
) {
    let mut world = World::new(tuning);

    let mut pickup_timer = tokio::time::interval(Duration::from_secs(tuning.pickup_spawn_secs));
    let mut earn_timer = tokio::time::interval(Duration::from_secs(tuning.earn_interval_secs));
    // The first interval tick completes immediately; consume both so the
    // timers fire one full period after boot.
    pickup_timer.tick().await;
    earn_timer.tick().await;

    info!("room task started");

    loop {
        let event = tokio::select! {
            ev = input_rx.recv() => match ev {
                Some(ev) => ev,
                None => break,
            },
            _ = pickup_timer.tick() => RoomEvent::SpawnPickup,
            _ = earn_timer.tick() => RoomEvent::GrantEarnings,
        };

        let outcome = dispatch(&mut world, event, now_epoch_ms());

        for outbound in outcome.outbound {
            // A send error only means no connections are subscribed right now.
            let _ = updates_tx.send(outbound);
        }

        for deferred in outcome.deferred {
            let tx = input_tx.clone();
            tokio::spawn(async move {
                tokio::time::sleep(deferred.delay).await;
                // The channel can close during shutdown; dropping is fine.
                let _ = tx.send(deferred.event).await;
            });
        }
    }

    info!("room task exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::use_cases::types::{Recipients, RoomUpdate};

    async fn recv_update(rx: &mut broadcast::Receiver<Outbound>) -> Outbound {
        tokio::time::timeout(Duration::from_secs(60), rx.recv())
            .await
            .expect("update in time")
            .expect("channel open")
    }

    #[tokio::test(start_paused = true)]
    async fn respawn_arrives_only_after_the_scheduled_delay() {
        // A tiny spawn area keeps both players inside Fists range, and a
        // zero cooldown lets the attacker land lethal damage immediately.
        let tuning = WorldTuning {
            attack_cooldown_ms: 0,
            spawn_margin: 0.0,
            spawn_span_x: 1.0,
            spawn_span_y: 1.0,
            ..WorldTuning::default()
        };

        let (input_tx, input_rx) = mpsc::channel(64);
        let (updates_tx, mut updates_rx) = broadcast::channel(256);
        tokio::spawn(room_task(input_rx, input_tx.clone(), updates_tx, tuning));

        for (conn_id, name) in [(1, "Ada"), (2, "Eve")] {
            input_tx
                .send(RoomEvent::Join {
                    conn_id,
                    name: name.to_string(),
                    avatar: "fox.png".to_string(),
                })
                .await
                .expect("send join");
        }

        // Fists deal 10 against 100 health; ten hits kill.
        for _ in 0..10 {
            input_tx
                .send(RoomEvent::Attack {
                    conn_id: 1,
                    target_id: 2,
                })
                .await
                .expect("send attack");
        }

        let mut died_at = None;
        loop {
            let outbound = recv_update(&mut updates_rx).await;
            match outbound.update {
                RoomUpdate::PlayerDied { id: 2, .. } => {
                    died_at = Some(tokio::time::Instant::now());
                }
                RoomUpdate::PlayerRespawned { id: 2, .. } => {
                    let died_at = died_at.expect("death precedes respawn");
                    let waited = died_at.elapsed();
                    assert!(
                        waited >= Duration::from_millis(tuning.respawn_delay_ms),
                        "respawned after {waited:?}, before the delay expired"
                    );
                    assert!(waited < Duration::from_secs(10), "respawned late: {waited:?}");
                    break;
                }
                _ => {}
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn timers_feed_the_dispatch_path() {
        let (input_tx, input_rx) = mpsc::channel(64);
        let (updates_tx, mut updates_rx) = broadcast::channel(64);
        tokio::spawn(room_task(
            input_rx,
            input_tx.clone(),
            updates_tx,
            WorldTuning::default(),
        ));

        input_tx
            .send(RoomEvent::Join {
                conn_id: 1,
                name: "Ada".to_string(),
                avatar: "fox.png".to_string(),
            })
            .await
            .expect("send join");

        // Drain the four join updates first.
        for _ in 0..4 {
            recv_update(&mut updates_rx).await;
        }

        // With the clock paused, awaiting the channel auto-advances time to
        // the 10 s marks where the spawner and earnings timers fire.
        let mut saw_spawn = false;
        let mut saw_earnings = false;
        while !(saw_spawn && saw_earnings) {
            let outbound = recv_update(&mut updates_rx).await;
            match outbound.update {
                RoomUpdate::WeaponSpawned(_) => {
                    assert_eq!(outbound.recipients, Recipients::All);
                    saw_spawn = true;
                }
                RoomUpdate::BitcoinUpdate { bitcoins } => {
                    assert_eq!(outbound.recipients, Recipients::Only(1));
                    assert!(bitcoins >= 10);
                    saw_earnings = true;
                }
                other => panic!("unexpected update {other:?}"),
            }
        }
    }
}
