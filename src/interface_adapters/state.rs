use crate::interface_adapters::net::Envelope;
use crate::use_cases::types::{Outbound, RoomEvent};
use tokio::sync::{broadcast, mpsc};

#[derive(Clone)]
pub struct AppState {
    // Events flowing from connections into the room task.
    pub input_tx: mpsc::Sender<RoomEvent>,
    // Committed updates produced by the room task (domain structs).
    pub updates_tx: broadcast::Sender<Outbound>,
    // Serialized updates with their fan-out policy, shared across connections.
    pub envelope_tx: broadcast::Sender<Envelope>,
}
