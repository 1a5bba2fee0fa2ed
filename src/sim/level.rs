//! Seeded level generation
//!
//! A layout is a pure function of `(segment_count, seed, pool)`. Variant
//! choices and per-instance parameters come from two separate PCG streams of
//! the same seed, so the variant sequence never depends on how many values a
//! variant's parameters consume.

use glam::Vec3;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::obstacle::{ObstacleInstance, ObstacleVariant};
use crate::consts::{FINISH_LINE_OFFSET, PLATFORM_SEGMENTS, SEGMENT_WIDTH};
use crate::slot_anchor;

/// PCG stream selecting variants
const VARIANT_STREAM: u64 = 1;
/// PCG stream for per-instance parameters
const PARAMS_STREAM: u64 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LevelError {
    #[error("cannot place {0} obstacle segments from an empty variant pool")]
    EmptyPool(u32),
}

/// Axis-aligned box, described by centre and half extents
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cuboid {
    pub center: Vec3,
    pub half_extents: Vec3,
}

impl Cuboid {
    pub fn new(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            center,
            half_extents,
        }
    }
}

/// Static geometry enclosing the course
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseBounds {
    pub left_wall: Cuboid,
    pub right_wall: Cuboid,
    pub back_wall: Cuboid,
    pub floor: Cuboid,
}

impl CourseBounds {
    /// Bounds for a course of `slots` segments, start and end platforms included
    pub fn for_slots(slots: u32) -> Self {
        let length = slots as f32;
        let mid_z = -(length * SEGMENT_WIDTH / 2.0) + SEGMENT_WIDTH / 2.0;
        let side_half = Vec3::new(0.15, 0.75, length * SEGMENT_WIDTH / 2.0);
        Self {
            left_wall: Cuboid::new(Vec3::new(-2.15, 0.75, mid_z), side_half),
            right_wall: Cuboid::new(Vec3::new(2.15, 0.75, mid_z), side_half),
            back_wall: Cuboid::new(
                Vec3::new(0.0, 0.75, -length * SEGMENT_WIDTH + SEGMENT_WIDTH / 2.0),
                Vec3::new(2.0, 0.75, 0.15),
            ),
            floor: Cuboid::new(
                Vec3::new(0.0, -0.1, mid_z),
                Vec3::new(SEGMENT_WIDTH / 2.0, 0.1, length * SEGMENT_WIDTH / 2.0),
            ),
        }
    }

    pub fn walls(&self) -> [Cuboid; 3] {
        [self.left_wall, self.right_wall, self.back_wall]
    }
}

/// Generated course
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelLayout {
    pub segment_count: u32,
    pub seed: u64,
    /// One obstacle per segment, start of the course first
    pub obstacles: Vec<ObstacleInstance>,
    /// Total course length including start and end platforms
    pub course_length: f32,
    pub bounds: CourseBounds,
}

impl LevelLayout {
    /// Variant sequence, start of the course first
    pub fn segments(&self) -> Vec<ObstacleVariant> {
        self.obstacles.iter().map(|o| o.variant()).collect()
    }

    pub fn start_anchor(&self) -> Vec3 {
        slot_anchor(0)
    }

    pub fn end_anchor(&self) -> Vec3 {
        slot_anchor(self.segment_count + 1)
    }

    /// Forward distance at which a run counts as finished
    pub fn finish_distance(&self) -> f32 {
        finish_distance(self.segment_count)
    }
}

/// Forward distance of the finish line for a course of `segment_count` obstacles
pub fn finish_distance(segment_count: u32) -> f32 {
    segment_count as f32 * SEGMENT_WIDTH + FINISH_LINE_OFFSET
}

/// Length of a course of `segment_count` obstacles, platforms included
pub fn course_length(segment_count: u32) -> f32 {
    (segment_count + PLATFORM_SEGMENTS) as f32 * SEGMENT_WIDTH
}

/// Build the course for `(segment_count, seed)`, picking uniformly from `pool`
pub fn generate(
    segment_count: u32,
    seed: u64,
    pool: &[ObstacleVariant],
) -> Result<LevelLayout, LevelError> {
    if pool.is_empty() && segment_count > 0 {
        return Err(LevelError::EmptyPool(segment_count));
    }

    let mut variant_rng = Pcg32::new(seed, VARIANT_STREAM);
    let mut params_rng = Pcg32::new(seed, PARAMS_STREAM);

    let obstacles: Vec<ObstacleInstance> = (0..segment_count)
        .map(|i| {
            let variant = pool[variant_rng.random_range(0..pool.len())];
            let params = variant.roll_params(&mut params_rng);
            ObstacleInstance::new(params, slot_anchor(i + 1))
        })
        .collect();

    log::info!(
        "Generated level: {} segments, seed {:#x}, length {}",
        segment_count,
        seed,
        course_length(segment_count)
    );
    log::debug!(
        "Segments: {:?}",
        obstacles.iter().map(|o| o.variant().as_str()).collect::<Vec<_>>()
    );

    Ok(LevelLayout {
        segment_count,
        seed,
        obstacles,
        course_length: course_length(segment_count),
        bounds: CourseBounds::for_slots(segment_count + PLATFORM_SEGMENTS),
    })
}
