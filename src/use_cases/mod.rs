// Use cases layer: the authoritative room core.

pub mod dispatch;
pub mod registry;
pub mod room;
pub mod rules;
pub mod types;

pub use dispatch::dispatch;
pub use registry::EntityRegistry;
pub use rules::World;
pub use types::{Deferred, DispatchOutcome, Outbound, Recipients, RoomEvent, RoomUpdate};
