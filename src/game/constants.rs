/// Tick constants - every cell advances on the same fixed period
pub mod tick {
    /// Simulation tick rate in Hz
    pub const RATE: u32 = 30;
    /// Delta time per tick in seconds
    pub const DT: f32 = 1.0 / 30.0;
    /// Tick duration in milliseconds
    pub const DURATION_MS: u64 = 1000 / RATE as u64;
}

/// World/cell geometry defaults (pixel space, y grows downward toward the beach)
pub mod world {
    /// Default world width in pixels
    pub const WIDTH: f32 = 2400.0;
    /// Default world height in pixels
    pub const HEIGHT: f32 = 1600.0;
}

/// Player defaults
pub mod player {
    /// Starting mass for human players
    pub const MASS: f32 = 60.0;
    /// Movement speed in pixels per second per axis
    pub const SPEED: f32 = 160.0;
    /// Collision diameter in pixels
    pub const DIAMETER: f32 = 36.0;
}

/// Bot defaults
pub mod bot {
    /// Bots per cell
    pub const COUNT: usize = 6;
    /// Bot movement speed in pixels per second per axis
    pub const SPEED: f32 = 110.0;
    /// Bot mass
    pub const MASS: f32 = 40.0;
    /// Bot collision diameter in pixels
    pub const DIAMETER: f32 = 32.0;
    /// Per-tick probability of abandoning the repeated direction
    pub const CHANGE_DIR_PROB: f32 = 0.02;
    /// Radius within which a bot locks onto the nearest human player
    pub const TARGET_RADIUS: f32 = 320.0;
    /// Ticks a bot keeps forcing upward movement after entering the soft band
    pub const TERRAIN_COOLDOWN_TICKS: u32 = 25;
}

/// Coin spawn defaults
pub mod coin {
    /// Seconds between spawn attempts
    pub const SPAWN_INTERVAL: f32 = 1.5;
    /// Maximum live coins per cell
    pub const CAP: usize = 64;
}

/// Wave generation and boost constants
pub mod wave {
    /// Seconds between wave spawns (longer than the coin interval)
    pub const SPAWN_INTERVAL: f32 = 6.0;
    /// Base downward speed in pixels per second
    pub const BASE_SPEED: f32 = 140.0;
    /// Minimum speed factor at multiplier 0
    pub const SPEED_MIN_FACTOR: f32 = 0.6;
    /// Randomized, multiplier-weighted speed spread
    pub const SPEED_SPREAD: f32 = 0.8;
    /// Base crest size (full segment length) in pixels
    pub const BASE_SIZE: f32 = 220.0;
    /// Randomized, multiplier-weighted size spread in pixels
    pub const SIZE_SPREAD: f32 = 180.0;
    /// Base lifespan in seconds
    pub const BASE_LIFESPAN: f32 = 8.0;
    /// Randomized, multiplier-weighted lifespan spread in seconds
    pub const LIFESPAN_SPREAD: f32 = 6.0;
    /// Margin trimmed off each crest end when building the boost segment
    pub const EDGE_MARGIN: f32 = 18.0;
    /// Distance from the boost segment within which a player boosts
    pub const BOOST_BAND: f32 = 24.0;
    /// Seconds a boost lasts once granted
    pub const BOOST_DURATION: f32 = 1.2;
}

/// Attack constants
pub mod attack {
    /// Minimum seconds between attacks
    pub const TIMEOUT: f32 = 0.6;
}

/// Terrain band constants. The beach occupies the bottom of the world;
/// bots steer away from it through three nested y-bands derived from the
/// configured beach size. The multipliers are inherited behavior - keep
/// the three-band structure as is.
pub mod terrain {
    /// Default beach band height in pixels
    pub const BEACH_SIZE: f32 = 120.0;
    /// Hard band: within BEACH_SIZE * this of the bottom, snap upward
    pub const HARD_BAND_FACTOR: f32 = 1.25;
    /// Soft band: within BEACH_SIZE * this of the bottom, arm the cooldown
    pub const SOFT_BAND_FACTOR: f32 = 2.0;
    /// Corrective snap distance as a multiple of the beach size
    pub const SNAP_FACTOR: f32 = 3.0;
}
