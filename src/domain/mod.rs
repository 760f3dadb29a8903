// Domain layer: core room state types and gameplay tuning.

pub mod player;
pub mod tuning;
pub mod weapon;

pub use player::{Direction, Player, PlayerSnapshot};
pub use tuning::WorldTuning;
pub use weapon::{WEAPON_KINDS, WeaponKind, WeaponLoadout, WeaponPickup};
