//! Physics engine boundary
//!
//! The game core never integrates bodies itself. It issues commands through
//! these traits and reads poses back:
//! - `PlayerBody`: impulses and hard resets on the dynamic player ball
//! - `KinematicBody`: externally driven obstacle poses
//! - `PhysicsWorld`: body lookup, ray queries, course loading and stepping

pub mod rapier;

pub use rapier::RapierWorld;

use glam::{Quat, Vec3};

use crate::sim::LevelLayout;

/// Commands accepted by the dynamic player body
pub trait PlayerBody {
    fn apply_impulse(&mut self, impulse: Vec3);
    fn apply_torque_impulse(&mut self, torque: Vec3);
    fn translation(&self) -> Vec3;
    fn set_translation(&mut self, translation: Vec3);
    fn set_linear_velocity(&mut self, velocity: Vec3);
    fn set_angular_velocity(&mut self, velocity: Vec3);
}

/// Commands accepted by a kinematic (pose-driven) body
pub trait KinematicBody {
    fn set_next_kinematic_rotation(&mut self, rotation: Quat);
    fn set_next_kinematic_translation(&mut self, translation: Vec3);
}

/// Ray query result
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Distance along the (unit) ray direction to the first surface
    pub time_of_impact: f32,
}

/// Bodies created for one course, in layout order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CourseBodies<H> {
    /// Moving part of each obstacle segment
    pub obstacles: Vec<H>,
    /// Spinning flag on the end platform
    pub flag: Option<H>,
}

pub trait PhysicsWorld {
    type Handle: Copy + std::fmt::Debug;

    /// Create the player ball at `spawn`
    fn spawn_player(&mut self, spawn: Vec3) -> Self::Handle;

    fn player_body(&self, handle: Self::Handle) -> Option<&dyn PlayerBody>;

    fn player_body_mut(&mut self, handle: Self::Handle) -> Option<&mut dyn PlayerBody>;

    fn kinematic_body_mut(&mut self, handle: Self::Handle) -> Option<&mut dyn KinematicBody>;

    /// First hit along `direction` within `max_distance`, ignoring `exclude`
    fn cast_ray(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        exclude: Option<Self::Handle>,
    ) -> Option<RayHit>;

    /// Replace any previously loaded course with `layout`
    fn load_course(&mut self, layout: &LevelLayout) -> CourseBodies<Self::Handle>;

    /// Integrate one step of `dt` seconds
    fn step(&mut self, dt: f32);
}
