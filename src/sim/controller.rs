//! Player controller
//!
//! Per frame, before the physics step: turn held directions into impulses and
//! rolling torque, and gate jumps on a short downward ray. After the step:
//! trail the camera behind the ball and report course-boundary crossings.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::tick::TickInput;
use crate::consts::*;
use crate::forward_distance;
use crate::physics::{PhysicsWorld, PlayerBody};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    /// The controller ran before its rigid body was created, or after it vanished
    #[error("player rigid body is missing (handle: {0})")]
    MissingBody(String),
}

/// Movement, jump and camera tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerTuning {
    /// Impulse per second of held input
    pub impulse_strength: f32,
    /// Rolling torque per second of held input
    pub torque_strength: f32,
    pub jump_impulse: f32,
    /// Ray starts this far below the ball centre (just outside the ball)
    pub jump_ray_offset: f32,
    pub jump_ray_length: f32,
    /// Grounded when the ray hits closer than this
    pub grounded_toi: f32,
    pub camera_offset: Vec3,
    pub camera_target_offset: Vec3,
    /// Fraction of the remaining gap closed per second
    pub camera_smoothing: f32,
    pub spawn: Vec3,
    pub fall_threshold: f32,
}

impl Default for ControllerTuning {
    fn default() -> Self {
        Self {
            impulse_strength: IMPULSE_STRENGTH,
            torque_strength: TORQUE_STRENGTH,
            jump_impulse: JUMP_IMPULSE,
            jump_ray_offset: JUMP_RAY_OFFSET,
            jump_ray_length: JUMP_RAY_LENGTH,
            grounded_toi: GROUNDED_TOI,
            camera_offset: CAMERA_OFFSET,
            camera_target_offset: CAMERA_TARGET_OFFSET,
            camera_smoothing: CAMERA_SMOOTHING,
            spawn: PLAYER_SPAWN,
            fall_threshold: FALL_THRESHOLD,
        }
    }
}

/// Smoothed camera pose
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FollowCamera {
    pub position: Vec3,
    pub target: Vec3,
}

impl Default for FollowCamera {
    fn default() -> Self {
        Self {
            position: CAMERA_START,
            target: Vec3::ZERO,
        }
    }
}

impl FollowCamera {
    /// Move toward the desired pose for a ball at `player`.
    ///
    /// The step factor is clamped to 1 so a long frame lands on the desired
    /// pose instead of overshooting it.
    pub fn follow(&mut self, player: Vec3, tuning: &ControllerTuning, dt: f32) {
        let desired_position = player + tuning.camera_offset;
        let desired_target = player + tuning.camera_target_offset;
        let t = (tuning.camera_smoothing * dt).clamp(0.0, 1.0);
        self.position += (desired_position - self.position) * t;
        self.target += (desired_target - self.target) * t;
    }
}

/// Terminal condition detected after the physics step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// Crossed the finish line
    Finished,
    /// Dropped off the course
    Fell,
}

pub struct PlayerController<H> {
    body: Option<H>,
    tuning: ControllerTuning,
    camera: FollowCamera,
}

impl<H: Copy + std::fmt::Debug> PlayerController<H> {
    pub fn new(tuning: ControllerTuning) -> Self {
        Self {
            body: None,
            tuning,
            camera: FollowCamera::default(),
        }
    }

    /// Bind the controller to the player's rigid body
    pub fn attach(&mut self, body: H) {
        self.body = Some(body);
    }

    pub fn body(&self) -> Option<H> {
        self.body
    }

    pub fn tuning(&self) -> &ControllerTuning {
        &self.tuning
    }

    pub fn camera(&self) -> FollowCamera {
        self.camera
    }

    fn handle(&self) -> Result<H, ControllerError> {
        self.body.ok_or_else(|| {
            log::error!("Player controller used before a body was attached");
            ControllerError::MissingBody("unattached".to_string())
        })
    }

    fn read_body<'w, W>(&self, world: &'w W) -> Result<&'w dyn PlayerBody, ControllerError>
    where
        W: PhysicsWorld<Handle = H>,
    {
        let handle = self.handle()?;
        world.player_body(handle).ok_or_else(|| {
            log::error!("Player body {:?} not found in physics world", handle);
            ControllerError::MissingBody(format!("{handle:?}"))
        })
    }

    fn write_body<'w, W>(&self, world: &'w mut W) -> Result<&'w mut dyn PlayerBody, ControllerError>
    where
        W: PhysicsWorld<Handle = H>,
    {
        let handle = self.handle()?;
        world.player_body_mut(handle).ok_or_else(|| {
            log::error!("Player body {:?} not found in physics world", handle);
            ControllerError::MissingBody(format!("{handle:?}"))
        })
    }

    /// Player position as last reported by the physics world
    pub fn position<W>(&self, world: &W) -> Result<Vec3, ControllerError>
    where
        W: PhysicsWorld<Handle = H>,
    {
        Ok(self.read_body(world)?.translation())
    }

    /// Submit movement impulses and, if grounded, the jump impulse.
    ///
    /// Returns whether a jump was applied.
    pub fn apply_controls<W>(
        &mut self,
        world: &mut W,
        input: &TickInput,
        dt: f32,
    ) -> Result<bool, ControllerError>
    where
        W: PhysicsWorld<Handle = H>,
    {
        let (impulse, torque) = movement_impulses(input, &self.tuning, dt);
        let jump = input.jump && self.grounded(world)?;

        let body = self.write_body(world)?;
        if impulse != Vec3::ZERO {
            body.apply_impulse(impulse);
        }
        if torque != Vec3::ZERO {
            body.apply_torque_impulse(torque);
        }
        if jump {
            body.apply_impulse(Vec3::new(0.0, self.tuning.jump_impulse, 0.0));
            log::debug!("Jump");
        } else if input.jump {
            log::debug!("Jump dropped: not grounded");
        }
        Ok(jump)
    }

    /// Whether the ball rests on (or nearly on) a surface
    pub fn grounded<W>(&self, world: &W) -> Result<bool, ControllerError>
    where
        W: PhysicsWorld<Handle = H>,
    {
        let position = self.position(world)?;
        let origin = position - Vec3::new(0.0, self.tuning.jump_ray_offset, 0.0);
        let hit = world.cast_ray(origin, Vec3::NEG_Y, self.tuning.jump_ray_length, self.body);
        Ok(hit.is_some_and(|hit| hit.time_of_impact < self.tuning.grounded_toi))
    }

    /// Trail the camera toward the ball's post-step position
    pub fn follow_camera<W>(&mut self, world: &W, dt: f32) -> Result<FollowCamera, ControllerError>
    where
        W: PhysicsWorld<Handle = H>,
    {
        let position = self.position(world)?;
        self.camera.follow(position, &self.tuning, dt);
        Ok(self.camera)
    }

    /// Finish line or fall check against `finish_distance`
    pub fn check_boundaries<W>(
        &self,
        world: &W,
        finish_distance: f32,
    ) -> Result<Option<Boundary>, ControllerError>
    where
        W: PhysicsWorld<Handle = H>,
    {
        let position = self.position(world)?;
        Ok(boundary_at(position, finish_distance, self.tuning.fall_threshold))
    }

    /// Put the ball back on the start platform at rest and rewind the camera.
    /// Safe to call repeatedly.
    pub fn reset<W>(&mut self, world: &mut W) -> Result<(), ControllerError>
    where
        W: PhysicsWorld<Handle = H>,
    {
        let spawn = self.tuning.spawn;
        let body = self.write_body(world)?;
        body.set_linear_velocity(Vec3::ZERO);
        body.set_angular_velocity(Vec3::ZERO);
        body.set_translation(spawn);
        self.camera = FollowCamera::default();
        log::debug!("Player reset to {spawn}");
        Ok(())
    }
}

/// Impulse and torque for the held directions.
///
/// Opposing keys cancel, orthogonal keys add up (diagonals are faster).
/// Torque rolls the ball around the axis perpendicular to travel.
pub fn movement_impulses(input: &TickInput, tuning: &ControllerTuning, dt: f32) -> (Vec3, Vec3) {
    let strength = tuning.impulse_strength * dt;
    let torque_strength = tuning.torque_strength * dt;

    let mut impulse = Vec3::ZERO;
    let mut torque = Vec3::ZERO;

    if input.forward {
        impulse.z -= strength;
        torque.x -= torque_strength;
    }
    if input.backward {
        impulse.z += strength;
        torque.x += torque_strength;
    }
    if input.right {
        impulse.x += strength;
        torque.z -= torque_strength;
    }
    if input.left {
        impulse.x -= strength;
        torque.z += torque_strength;
    }

    (impulse, torque)
}

/// Classify a position. The finish line wins if both apply.
pub fn boundary_at(position: Vec3, finish_distance: f32, fall_threshold: f32) -> Option<Boundary> {
    if forward_distance(position) > finish_distance {
        Some(Boundary::Finished)
    } else if position.y < fall_threshold {
        Some(Boundary::Fell)
    } else {
        None
    }
}
