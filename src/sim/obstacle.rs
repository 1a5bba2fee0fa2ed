//! Obstacle variants and their motion
//!
//! Every obstacle owns an immutable parameter record drawn once when the
//! level is generated. Per-frame code only evaluates poses from it.

use std::f32::consts::TAU;

use glam::{Quat, Vec3};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::consts::{FLAG_SPIN_SPEED, OBSTACLE_MIN_SPEED, OBSTACLE_SPEED};

/// Obstacle behaviours available to the level generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObstacleVariant {
    /// Bar spinning about the vertical axis
    Spinner,
    /// Wall swinging side to side across the lane
    HorizontalBob,
    /// Bar rising and falling ("limbo")
    VerticalBob,
}

impl ObstacleVariant {
    /// Every variant, in a fixed order
    pub const ALL: [ObstacleVariant; 3] = [
        ObstacleVariant::Spinner,
        ObstacleVariant::HorizontalBob,
        ObstacleVariant::VerticalBob,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ObstacleVariant::Spinner => "spinner",
            ObstacleVariant::HorizontalBob => "horizontal-bob",
            ObstacleVariant::VerticalBob => "vertical-bob",
        }
    }

    /// Half extents of the moving part's box collider
    pub fn half_extents(&self) -> Vec3 {
        match self {
            ObstacleVariant::Spinner | ObstacleVariant::VerticalBob => Vec3::new(1.75, 0.15, 0.15),
            ObstacleVariant::HorizontalBob => Vec3::new(0.75, 0.75, 0.15),
        }
    }

    /// Draw the per-instance parameters for this variant
    pub fn roll_params(&self, rng: &mut impl Rng) -> ObstacleParams {
        let color = Color::from_hue(rng.random::<f32>());
        match self {
            ObstacleVariant::Spinner => {
                let direction = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
                let speed = (rng.random::<f32>() * OBSTACLE_SPEED + OBSTACLE_MIN_SPEED) * direction;
                ObstacleParams::Spinner { speed, color }
            }
            ObstacleVariant::HorizontalBob => ObstacleParams::HorizontalBob {
                phase: rng.random::<f32>() * TAU,
                color,
            },
            ObstacleVariant::VerticalBob => ObstacleParams::VerticalBob {
                phase: rng.random::<f32>() * TAU,
                color,
            },
        }
    }
}

impl std::fmt::Display for ObstacleVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Linear RGB color, one per obstacle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    /// Fully saturated, mid-lightness color at `hue` (0-1)
    pub fn from_hue(hue: f32) -> Self {
        let h = hue.rem_euclid(1.0) * 6.0;
        let x = 1.0 - (h % 2.0 - 1.0).abs();
        let (r, g, b) = match h as u32 {
            0 => (1.0, x, 0.0),
            1 => (x, 1.0, 0.0),
            2 => (0.0, 1.0, x),
            3 => (0.0, x, 1.0),
            4 => (x, 0.0, 1.0),
            _ => (1.0, 0.0, x),
        };
        Self { r, g, b }
    }
}

/// Per-instance randomized constants, tagged by the variant they drive
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ObstacleParams {
    /// Signed angular speed (rad/s), sign is the spin direction
    Spinner { speed: f32, color: Color },
    /// Phase offset into the sine cycle
    HorizontalBob { phase: f32, color: Color },
    VerticalBob { phase: f32, color: Color },
}

impl ObstacleParams {
    pub fn variant(&self) -> ObstacleVariant {
        match self {
            ObstacleParams::Spinner { .. } => ObstacleVariant::Spinner,
            ObstacleParams::HorizontalBob { .. } => ObstacleVariant::HorizontalBob,
            ObstacleParams::VerticalBob { .. } => ObstacleVariant::VerticalBob,
        }
    }

    pub fn color(&self) -> Color {
        match *self {
            ObstacleParams::Spinner { color, .. }
            | ObstacleParams::HorizontalBob { color, .. }
            | ObstacleParams::VerticalBob { color, .. } => color,
        }
    }
}

/// Target pose for an obstacle's kinematic body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObstaclePose {
    pub translation: Vec3,
    pub rotation: Quat,
}

/// One obstacle on the course
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObstacleInstance {
    pub params: ObstacleParams,
    /// Segment anchor (floor centre)
    pub anchor: Vec3,
}

impl ObstacleInstance {
    pub fn new(params: ObstacleParams, anchor: Vec3) -> Self {
        Self { params, anchor }
    }

    pub fn variant(&self) -> ObstacleVariant {
        self.params.variant()
    }

    /// Where the moving part sits before the first frame
    pub fn rest_pose(&self) -> ObstaclePose {
        self.pose(0.0)
    }

    /// Pose of the moving part at `elapsed` seconds
    pub fn pose(&self, elapsed: f32) -> ObstaclePose {
        match self.params {
            ObstacleParams::Spinner { speed, .. } => ObstaclePose {
                translation: self.anchor + Vec3::new(0.0, 0.3, 0.0),
                rotation: Quat::from_rotation_y(elapsed * speed),
            },
            ObstacleParams::VerticalBob { phase, .. } => ObstaclePose {
                translation: self.anchor + Vec3::new(0.0, (elapsed + phase).sin() + 1.15, 0.0),
                rotation: Quat::IDENTITY,
            },
            ObstacleParams::HorizontalBob { phase, .. } => ObstaclePose {
                translation: self.anchor + Vec3::new((elapsed + phase).sin() * 1.25, 0.75, 0.0),
                rotation: Quat::IDENTITY,
            },
        }
    }
}

/// Rotation of the finish flag on the end platform
pub fn flag_rotation(elapsed: f32) -> Quat {
    Quat::from_rotation_y(elapsed * FLAG_SPIN_SPEED)
}
