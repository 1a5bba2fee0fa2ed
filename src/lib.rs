//! Marble Race - a short obstacle-course game core
//!
//! Core modules:
//! - `sim`: Session state machine, seeded level generator, player controller, frame scheduler
//! - `physics`: Narrow boundary to the physics engine (plus the Rapier adapter)
//! - `settings`: Course size, seed and controller tuning
//! - `best_times`: Fastest-finish leaderboard

pub mod best_times;
pub mod physics;
pub mod settings;
pub mod sim;

pub use best_times::BestTimes;
pub use settings::{ConfigError, Settings};

use glam::Vec3;

/// Game configuration constants
pub mod consts {
    use glam::Vec3;

    /// Longest frame delta the scheduler will feed the simulation (seconds)
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// Course dimensions
    pub const SEGMENT_WIDTH: f32 = 4.0;
    /// Start and end platforms surrounding the obstacle segments
    pub const PLATFORM_SEGMENTS: u32 = 2;
    /// Default course length (obstacle segments)
    pub const DEFAULT_SEGMENT_COUNT: u32 = 15;
    /// Upper bound accepted from configuration
    pub const MAX_SEGMENT_COUNT: u32 = 512;

    /// Finish line sits this far past the last obstacle segment's anchor
    pub const FINISH_LINE_OFFSET: f32 = 2.0;
    /// Falling below this height aborts the run
    pub const FALL_THRESHOLD: f32 = -4.0;

    /// Player ball
    pub const PLAYER_RADIUS: f32 = 0.3;
    pub const PLAYER_SPAWN: Vec3 = Vec3::new(0.0, 1.0, 0.0);

    /// Movement (multiplied by frame delta)
    pub const IMPULSE_STRENGTH: f32 = 0.6;
    pub const TORQUE_STRENGTH: f32 = 0.2;

    /// Jump gating
    pub const JUMP_RAY_OFFSET: f32 = 0.31;
    pub const JUMP_RAY_LENGTH: f32 = 10.0;
    pub const GROUNDED_TOI: f32 = 0.15;
    pub const JUMP_IMPULSE: f32 = 0.5;

    /// Camera follow
    pub const CAMERA_OFFSET: Vec3 = Vec3::new(0.0, 0.65, 2.25);
    pub const CAMERA_TARGET_OFFSET: Vec3 = Vec3::new(0.0, 0.25, 0.0);
    pub const CAMERA_SMOOTHING: f32 = 5.0;
    pub const CAMERA_START: Vec3 = Vec3::new(10.0, 10.0, 10.0);

    /// Obstacles
    pub const OBSTACLE_SPEED: f32 = 1.0;
    pub const OBSTACLE_MIN_SPEED: f32 = 0.2;
    pub const FLAG_SPIN_SPEED: f32 = 0.5;
}

/// World-space anchor of a course slot (0 = start platform, `count + 1` = end platform).
///
/// The course runs along negative z.
#[inline]
pub fn slot_anchor(slot: u32) -> Vec3 {
    Vec3::new(0.0, 0.0, -(slot as f32) * consts::SEGMENT_WIDTH)
}

/// Distance travelled along the course (positive toward the finish)
#[inline]
pub fn forward_distance(pos: Vec3) -> f32 {
    -pos.z
}
