// Network adapter: client WebSocket handling and the shared serializer.

pub mod client;

pub use client::{Envelope, update_serializer, ws_handler};
