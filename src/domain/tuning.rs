/// Gameplay tuning for the shared room.
///
/// Keep this separate from runtime/server configuration (channel capacities,
/// ports, etc.).

#[derive(Debug, Clone, Copy)]
pub struct WorldTuning {
    /// World rectangle width in pixels; positions clamp to [0, width].
    pub width: f32,

    /// World rectangle height in pixels; positions clamp to [0, height].
    pub height: f32,

    /// Distance covered by one move event, in pixels.
    pub move_speed: f32,

    /// Minimum gap between two committed attacks from one player.
    pub attack_cooldown_ms: u64,

    /// Maximum distance at which a pickup can be claimed.
    pub pickup_radius: f32,

    /// Delay between a lethal hit and the scheduled respawn.
    pub respawn_delay_ms: u64,

    /// Bitcoins granted when a player respawns.
    pub respawn_bonus: u64,

    /// Pool cap; the spawner skips its tick while this many pickups exist.
    pub max_pickups: usize,

    /// Interval between weapon spawner ticks, in seconds.
    pub pickup_spawn_secs: u64,

    /// Interval between passive earnings ticks, in seconds.
    pub earn_interval_secs: u64,

    /// Bitcoins granted to each living player per earnings tick.
    pub earn_amount: u64,

    /// Spawn positions are uniform over a margin-inset area of the world.
    pub spawn_margin: f32,
    pub spawn_span_x: f32,
    pub spawn_span_y: f32,
}

impl Default for WorldTuning {
    fn default() -> Self {
        Self {
            width: 1024.0,
            height: 600.0,
            move_speed: 5.0,
            attack_cooldown_ms: 1000,
            pickup_radius: 50.0,
            respawn_delay_ms: 3000,
            respawn_bonus: 10,
            max_pickups: 10,
            pickup_spawn_secs: 10,
            earn_interval_secs: 10,
            earn_amount: 10,
            spawn_margin: 50.0,
            spawn_span_x: 900.0,
            spawn_span_y: 500.0,
        }
    }
}
