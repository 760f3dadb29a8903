// Frameworks layer: runtime bootstrap and server configuration.

pub mod config;
pub mod server;
