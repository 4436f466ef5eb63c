//! Legwork - gameplay core of a side-scrolling platformer about walking on two legs
//!
//! Core modules:
//! - `sim`: Deterministic simulation (bodies, broad phase, collision responses, entities)
//! - `settings`: Data-driven tuning knobs and collision policy
//! - `persistence`: Checkpoint key/value store
//! - `error`: Error types shared by loading, stepping and persistence

pub mod error;
pub mod persistence;
pub mod settings;
pub mod sim;

pub use error::{LevelError, SimError, StoreError};
pub use settings::{Settings, UnclassifiedPolicy};

/// Game configuration constants
///
/// Times are in seconds, distances in pixels, y grows downward.
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;

    /// Downward acceleration applied to legs, enemies and pellets
    pub const GRAVITY: f32 = 100.0;

    /// Margin added around the world for the broad phase and out-of-world culling
    pub const WORLD_MARGIN: f32 = 16.0;
    /// Side length of a level tile
    pub const TILE_SIZE: u32 = 8;
    /// Where consumed triggers and areas are parked
    pub const OFF_WORLD: f32 = -100.0;

    /// Visible window used for on-screen collision culling
    pub const VIEWPORT_WIDTH: f32 = 320.0;
    pub const VIEWPORT_HEIGHT: f32 = 240.0;

    /// Broad phase shape
    pub const QUADTREE_MAX_DEPTH: u32 = 6;
    pub const QUADTREE_MAX_PER_NODE: usize = 10;

    /// Pool sizes
    pub const PARTICLE_CAPACITY: usize = 2048;
    pub const BULLET_CAPACITY: usize = 256;
    pub const PROP_CAPACITY: usize = 256;
    /// Particle lifetime
    pub const PARTICLE_TTL: f32 = 10.0;

    /// Player leg size
    pub const LIMB_WIDTH: f32 = 10.0;
    pub const LIMB_HEIGHT: f32 = 14.0;
    /// Velocity a grounded leg starts a step with
    pub const PLAYER_VX: f32 = 30.0;
    pub const PLAYER_VY: f32 = -52.5;
    /// Velocity given to both legs by a two-foot jump
    pub const PLAYER_JUMP_VX: f32 = 25.0;
    pub const PLAYER_JUMP_VY: f32 = -80.0;
    /// How long holding a leg keeps shaping its arc
    pub const PLAYER_HOLD_TIME: f32 = 0.6;
    /// Both feet landing within this window triggers a jump
    pub const PLAYER_JUMP_WINDOW: f32 = 0.125;
    /// Maximum horizontal distance between grounded legs
    pub const PLAYER_MAX_LEG_DIST: f32 = 22.0;

    /// Patrol tank walk speed (negative = walking left)
    pub const TANK_VX: f32 = -40.0;
    pub const TANK_REST_TIME: f32 = 5.0;
    pub const TANK_SHOT_INTERVAL: f32 = 0.3;
    pub const TANK_VOLLEY: u32 = 5;
    pub const TANK_SHOT_VY: f32 = -30.0;

    pub const TURRET_REST_TIME: f32 = 10.0;
    pub const TURRET_SHOT_INTERVAL: f32 = 0.15;
    pub const TURRET_VOLLEY: u32 = 10;
    pub const TURRET_BULLET_VY: f32 = -80.0;
    pub const TURRET_PELLET_VX: f32 = 25.0;
    pub const TURRET_PELLET_VY: f32 = -60.0;

    /// Death animation: 12 frames at 6 fps
    pub const DEATH_FRAMES: u32 = 12;
    pub const DEATH_FPS: f32 = 6.0;
    /// Speed of the explosion ring spawned when an enemy finishes dying
    pub const EXPLOSION_SPEED: f32 = 50.0;

    /// Typewriter reveal speed
    pub const TEXT_CHAR_DELAY: f32 = 0.06;
    pub const CHECKPOINT_TEXT_TTL: f32 = 2.0;
    pub const EXIT_TEXT_TTL: f32 = 999.999;
}
