//! In-memory physics double for controller and scheduler tests

use std::cell::RefCell;

use glam::{Quat, Vec3};

use super::level::LevelLayout;
use crate::physics::{CourseBodies, KinematicBody, PhysicsWorld, PlayerBody, RayHit};

/// Records every command it receives
#[derive(Debug, Clone, Default)]
pub struct MockBody {
    pub translation: Vec3,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    pub impulses: Vec<Vec3>,
    pub torques: Vec<Vec3>,
    pub kinematic_translation: Option<Vec3>,
    pub kinematic_rotation: Option<Quat>,
}

impl PlayerBody for MockBody {
    fn apply_impulse(&mut self, impulse: Vec3) {
        self.impulses.push(impulse);
    }

    fn apply_torque_impulse(&mut self, torque: Vec3) {
        self.torques.push(torque);
    }

    fn translation(&self) -> Vec3 {
        self.translation
    }

    fn set_translation(&mut self, translation: Vec3) {
        self.translation = translation;
    }

    fn set_linear_velocity(&mut self, velocity: Vec3) {
        self.linear_velocity = velocity;
    }

    fn set_angular_velocity(&mut self, velocity: Vec3) {
        self.angular_velocity = velocity;
    }
}

impl KinematicBody for MockBody {
    fn set_next_kinematic_rotation(&mut self, rotation: Quat) {
        self.kinematic_rotation = Some(rotation);
    }

    fn set_next_kinematic_translation(&mut self, translation: Vec3) {
        self.kinematic_translation = Some(translation);
    }
}

/// Bodies are indices into `bodies`. `step` moves the player by its linear
/// velocity so tests can script motion.
#[derive(Debug, Default)]
pub struct MockWorld {
    pub bodies: Vec<MockBody>,
    pub player: Option<usize>,
    /// Time of impact reported by every ray, `None` for no hit
    pub ground_toi: Option<f32>,
    pub rays: RefCell<Vec<(Vec3, Vec3, f32)>>,
    pub steps: Vec<f32>,
    pub course_loads: Vec<u64>,
    pub course: CourseBodies<usize>,
}

impl MockWorld {
    pub fn with_ground(toi: f32) -> Self {
        Self {
            ground_toi: Some(toi),
            ..Default::default()
        }
    }

    pub fn player(&self) -> &MockBody {
        &self.bodies[self.player.expect("player spawned")]
    }

    pub fn player_mut(&mut self) -> &mut MockBody {
        let index = self.player.expect("player spawned");
        &mut self.bodies[index]
    }
}

impl PhysicsWorld for MockWorld {
    type Handle = usize;

    fn spawn_player(&mut self, spawn: Vec3) -> usize {
        self.bodies.push(MockBody {
            translation: spawn,
            ..Default::default()
        });
        let handle = self.bodies.len() - 1;
        self.player = Some(handle);
        handle
    }

    fn player_body(&self, handle: usize) -> Option<&dyn PlayerBody> {
        self.bodies.get(handle).map(|b| b as &dyn PlayerBody)
    }

    fn player_body_mut(&mut self, handle: usize) -> Option<&mut dyn PlayerBody> {
        self.bodies.get_mut(handle).map(|b| b as &mut dyn PlayerBody)
    }

    fn kinematic_body_mut(&mut self, handle: usize) -> Option<&mut dyn KinematicBody> {
        self.bodies.get_mut(handle).map(|b| b as &mut dyn KinematicBody)
    }

    fn cast_ray(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        _exclude: Option<usize>,
    ) -> Option<RayHit> {
        self.rays.borrow_mut().push((origin, direction, max_distance));
        self.ground_toi
            .filter(|toi| *toi <= max_distance)
            .map(|time_of_impact| RayHit { time_of_impact })
    }

    fn load_course(&mut self, layout: &LevelLayout) -> CourseBodies<usize> {
        let mut course = CourseBodies::default();
        for obstacle in &layout.obstacles {
            let pose = obstacle.rest_pose();
            self.bodies.push(MockBody {
                translation: pose.translation,
                ..Default::default()
            });
            course.obstacles.push(self.bodies.len() - 1);
        }
        self.bodies.push(MockBody {
            translation: layout.end_anchor(),
            ..Default::default()
        });
        course.flag = Some(self.bodies.len() - 1);
        self.course_loads.push(layout.seed);
        self.course = course.clone();
        course
    }

    fn step(&mut self, dt: f32) {
        self.steps.push(dt);
        if let Some(body) = self.player.and_then(|index| self.bodies.get_mut(index)) {
            body.translation += body.linear_velocity * dt;
        }
    }
}
