//! Deterministic game core
//!
//! Everything here is engine-agnostic and reproducible from a seed:
//! - Seeded RNG only (PCG streams derived from the session seed)
//! - Obstacle parameters fixed at generation time
//! - Physics reached only through `crate::physics` traits

pub mod controller;
pub mod level;
pub mod obstacle;
pub mod session;
pub mod tick;

#[cfg(test)]
pub(crate) mod testing;

pub use controller::{
    Boundary, ControllerError, ControllerTuning, FollowCamera, PlayerController, boundary_at,
    movement_impulses,
};
pub use level::{
    CourseBounds, Cuboid, LevelError, LevelLayout, course_length, finish_distance, generate,
};
pub use obstacle::{
    Color, ObstacleInstance, ObstacleParams, ObstaclePose, ObstacleVariant, flag_rotation,
};
pub use session::{GameSession, GameStatus, ListenerId, StatusInbox};
pub use tick::{FrameReport, FrameTime, Game, GameError, TickInput};
