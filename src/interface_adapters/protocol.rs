// Wire protocol DTOs and conversions for public room messages. Message
// names and payload shapes are kept compatible with the browser client,
// so everything is camelCase and ids travel as strings.

use crate::domain::{Direction, PlayerSnapshot, WeaponPickup};
use crate::use_cases::RoomUpdate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Messages the client sends to the server over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ClientMessage {
    // Join handshake; must be the first message on a connection.
    NewPlayer(NewPlayerPayload),
    // One step in a direction.
    Move(DirectionDto),
    // Target connection id.
    Attack(String),
    // Pickup id to claim.
    PickupWeapon(String),
    // Chat text, relayed verbatim.
    ChatMessage(String),
    // Positioned emote burst.
    Emote(EmotePayload),
}

/// Payload for the join handshake.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPlayerPayload {
    pub name: String,
    #[serde(default)]
    pub avatar: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectionDto {
    Up,
    Down,
    Left,
    Right,
}

impl From<DirectionDto> for Direction {
    fn from(d: DirectionDto) -> Self {
        match d {
            DirectionDto::Up => Direction::Up,
            DirectionDto::Down => Direction::Down,
            DirectionDto::Left => Direction::Left,
            DirectionDto::Right => Direction::Right,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmotePayload {
    pub emote: String,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
}

/// Flattened player state for wire transmission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDto {
    pub id: String,
    pub name: String,
    pub avatar: String,
    pub x: f32,
    pub y: f32,
    pub health: i32,
    pub max_health: i32,
    pub weapon: String,
    pub weapon_damage: i32,
    pub weapon_range: f32,
    pub is_dead: bool,
    pub bitcoins: u64,
}

impl From<&PlayerSnapshot> for PlayerDto {
    fn from(p: &PlayerSnapshot) -> Self {
        Self {
            id: p.id.to_string(),
            name: p.name.clone(),
            avatar: p.avatar.clone(),
            x: p.x,
            y: p.y,
            health: p.health,
            max_health: p.max_health,
            weapon: p.weapon.name.clone(),
            weapon_damage: p.weapon.damage,
            weapon_range: p.weapon.range,
            is_dead: p.is_dead,
            bitcoins: p.bitcoins,
        }
    }
}

/// Pickup state for wire transmission.
#[derive(Debug, Clone, Serialize)]
pub struct WeaponDto {
    pub id: String,
    pub x: f32,
    pub y: f32,
    #[serde(rename = "type")]
    pub kind: String,
    pub emoji: String,
    pub damage: i32,
    pub range: f32,
}

impl From<&WeaponPickup> for WeaponDto {
    fn from(w: &WeaponPickup) -> Self {
        Self {
            id: w.id.to_string(),
            x: w.x,
            y: w.y,
            kind: w.kind.name.to_string(),
            emoji: w.kind.emoji.to_string(),
            damage: w.kind.damage,
            range: w.kind.range,
        }
    }
}

/// Messages the server sends to connected clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ServerMessage {
    // Sent only to the joining client: its own record.
    PlayerData(PlayerDto),
    // Sent only to the joining client: the roster keyed by id.
    CurrentPlayers(HashMap<String, PlayerDto>),
    // Sent only to the joining client: the unclaimed pickup pool.
    CurrentWeapons(Vec<WeaponDto>),
    #[serde(rename_all = "camelCase")]
    PlayerJoined { id: String, player: PlayerDto },
    #[serde(rename_all = "camelCase")]
    PlayerMoved { id: String, x: f32, y: f32 },
    #[serde(rename_all = "camelCase")]
    Attack {
        attacker_id: String,
        target_id: String,
        damage: i32,
        target_health: i32,
    },
    #[serde(rename_all = "camelCase")]
    PlayerDied {
        id: String,
        killer_id: String,
        stolen_bitcoins: u64,
    },
    WeaponSpawned(WeaponDto),
    #[serde(rename_all = "camelCase")]
    WeaponPickedUp {
        player_id: String,
        weapon_id: String,
        weapon: WeaponDto,
    },
    #[serde(rename_all = "camelCase")]
    WeaponUpdate {
        weapon: String,
        damage: i32,
        range: f32,
    },
    #[serde(rename_all = "camelCase")]
    PlayerRespawned {
        id: String,
        x: f32,
        y: f32,
        bitcoins: u64,
    },
    BitcoinUpdate { bitcoins: u64 },
    ChatMessage {
        id: String,
        name: String,
        message: String,
    },
    Emote {
        id: String,
        emote: String,
        x: f32,
        y: f32,
    },
    PlayerLeft(String),
}

impl From<RoomUpdate> for ServerMessage {
    fn from(update: RoomUpdate) -> Self {
        match update {
            RoomUpdate::PlayerData(p) => ServerMessage::PlayerData(PlayerDto::from(&p)),
            RoomUpdate::Roster(players) => ServerMessage::CurrentPlayers(
                players
                    .iter()
                    .map(|p| (p.id.to_string(), PlayerDto::from(p)))
                    .collect(),
            ),
            RoomUpdate::PickupList(pickups) => {
                ServerMessage::CurrentWeapons(pickups.iter().map(WeaponDto::from).collect())
            }
            RoomUpdate::PlayerJoined(p) => ServerMessage::PlayerJoined {
                id: p.id.to_string(),
                player: PlayerDto::from(&p),
            },
            RoomUpdate::PlayerMoved { id, x, y } => ServerMessage::PlayerMoved {
                id: id.to_string(),
                x,
                y,
            },
            RoomUpdate::Attack {
                attacker_id,
                target_id,
                damage,
                target_health,
            } => ServerMessage::Attack {
                attacker_id: attacker_id.to_string(),
                target_id: target_id.to_string(),
                damage,
                target_health,
            },
            RoomUpdate::PlayerDied {
                id,
                killer_id,
                stolen_bitcoins,
            } => ServerMessage::PlayerDied {
                id: id.to_string(),
                killer_id: killer_id.to_string(),
                stolen_bitcoins,
            },
            RoomUpdate::WeaponSpawned(w) => ServerMessage::WeaponSpawned(WeaponDto::from(&w)),
            RoomUpdate::WeaponPickedUp {
                player_id,
                weapon_id,
                pickup,
            } => ServerMessage::WeaponPickedUp {
                player_id: player_id.to_string(),
                weapon_id: weapon_id.to_string(),
                weapon: WeaponDto::from(&pickup),
            },
            RoomUpdate::WeaponUpdate(loadout) => ServerMessage::WeaponUpdate {
                weapon: loadout.name,
                damage: loadout.damage,
                range: loadout.range,
            },
            RoomUpdate::PlayerRespawned { id, x, y, bitcoins } => ServerMessage::PlayerRespawned {
                id: id.to_string(),
                x,
                y,
                bitcoins,
            },
            RoomUpdate::BitcoinUpdate { bitcoins } => ServerMessage::BitcoinUpdate { bitcoins },
            RoomUpdate::ChatMessage { id, name, message } => ServerMessage::ChatMessage {
                id: id.to_string(),
                name,
                message,
            },
            RoomUpdate::Emote { id, emote, x, y } => ServerMessage::Emote {
                id: id.to_string(),
                emote,
                x,
                y,
            },
            RoomUpdate::PlayerLeft { id } => ServerMessage::PlayerLeft(id.to_string()),
        }
    }
}
