//! Rapier 3D backend for the physics boundary
//!
//! Owns the full Rapier pipeline. The game core only sees it through
//! `PhysicsWorld`; rigid bodies are exposed as `PlayerBody`/`KinematicBody`.

use glam::{Quat, Vec3};
use rapier3d::na::{Quaternion, UnitQuaternion};
use rapier3d::prelude::*;

use super::{CourseBodies, KinematicBody, PhysicsWorld, PlayerBody, RayHit};
use crate::consts::PLAYER_RADIUS;
use crate::sim::{Cuboid, LevelLayout};

const RESTITUTION: f32 = 0.2;
const GRAVITY: f32 = -9.81;

#[inline]
fn to_vector(v: Vec3) -> Vector<Real> {
    vector![v.x, v.y, v.z]
}

#[inline]
fn to_vec3(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

#[inline]
fn to_rotation(q: Quat) -> Rotation<Real> {
    UnitQuaternion::from_quaternion(Quaternion::new(q.w, q.x, q.y, q.z))
}

impl PlayerBody for RigidBody {
    fn apply_impulse(&mut self, impulse: Vec3) {
        RigidBody::apply_impulse(self, to_vector(impulse), true);
    }

    fn apply_torque_impulse(&mut self, torque: Vec3) {
        RigidBody::apply_torque_impulse(self, to_vector(torque), true);
    }

    fn translation(&self) -> Vec3 {
        to_vec3(RigidBody::translation(self))
    }

    fn set_translation(&mut self, translation: Vec3) {
        RigidBody::set_translation(self, to_vector(translation), true);
    }

    fn set_linear_velocity(&mut self, velocity: Vec3) {
        self.set_linvel(to_vector(velocity), true);
    }

    fn set_angular_velocity(&mut self, velocity: Vec3) {
        self.set_angvel(to_vector(velocity), true);
    }
}

impl KinematicBody for RigidBody {
    fn set_next_kinematic_rotation(&mut self, rotation: Quat) {
        RigidBody::set_next_kinematic_rotation(self, to_rotation(rotation));
    }

    fn set_next_kinematic_translation(&mut self, translation: Vec3) {
        RigidBody::set_next_kinematic_translation(self, to_vector(translation));
    }
}

/// A Rapier simulation holding one player ball and one course at a time
pub struct RapierWorld {
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    /// Bodies owned by the loaded course (static bounds, obstacles, flag)
    course: Vec<RigidBodyHandle>,
}

impl Default for RapierWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl RapierWorld {
    pub fn new() -> Self {
        Self {
            gravity: vector![0.0, GRAVITY, 0.0],
            integration_parameters: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            course: Vec::new(),
        }
    }

    /// Number of rigid bodies currently simulated
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    fn clear_course(&mut self) {
        for handle in self.course.drain(..) {
            self.bodies.remove(
                handle,
                &mut self.islands,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            );
        }
    }

    fn attach_cuboid(&mut self, parent: RigidBodyHandle, cuboid: &Cuboid, friction: f32) {
        let h = cuboid.half_extents;
        let collider = ColliderBuilder::cuboid(h.x, h.y, h.z)
            .translation(to_vector(cuboid.center))
            .restitution(RESTITUTION)
            .friction(friction)
            .build();
        self.colliders
            .insert_with_parent(collider, parent, &mut self.bodies);
    }
}

impl PhysicsWorld for RapierWorld {
    type Handle = RigidBodyHandle;

    fn spawn_player(&mut self, spawn: Vec3) -> RigidBodyHandle {
        let body = RigidBodyBuilder::dynamic()
            .translation(to_vector(spawn))
            .linear_damping(0.5)
            .angular_damping(0.5)
            .can_sleep(false)
            .build();
        let handle = self.bodies.insert(body);
        let collider = ColliderBuilder::ball(PLAYER_RADIUS)
            .restitution(RESTITUTION)
            .friction(1.0)
            .build();
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);
        handle
    }

    fn player_body(&self, handle: RigidBodyHandle) -> Option<&dyn PlayerBody> {
        self.bodies.get(handle).map(|b| b as &dyn PlayerBody)
    }

    fn player_body_mut(&mut self, handle: RigidBodyHandle) -> Option<&mut dyn PlayerBody> {
        self.bodies.get_mut(handle).map(|b| b as &mut dyn PlayerBody)
    }

    fn kinematic_body_mut(&mut self, handle: RigidBodyHandle) -> Option<&mut dyn KinematicBody> {
        self.bodies
            .get_mut(handle)
            .filter(|b| b.is_kinematic())
            .map(|b| b as &mut dyn KinematicBody)
    }

    fn cast_ray(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        exclude: Option<RigidBodyHandle>,
    ) -> Option<RayHit> {
        let ray = Ray::new(point![origin.x, origin.y, origin.z], to_vector(direction));
        let mut filter = QueryFilter::default();
        if let Some(handle) = exclude {
            filter = filter.exclude_rigid_body(handle);
        }
        self.query_pipeline
            .cast_ray(&self.bodies, &self.colliders, &ray, max_distance, true, filter)
            .map(|(_, toi)| RayHit {
                time_of_impact: toi,
            })
    }

    fn load_course(&mut self, layout: &LevelLayout) -> CourseBodies<RigidBodyHandle> {
        self.clear_course();

        // Walls are frictionless so the ball slides along them; the floor grips.
        let bounds = self.bodies.insert(RigidBodyBuilder::fixed().build());
        self.course.push(bounds);
        for wall in layout.bounds.walls() {
            self.attach_cuboid(bounds, &wall, 0.0);
        }
        self.attach_cuboid(bounds, &layout.bounds.floor, 1.0);

        let mut course = CourseBodies::default();
        for obstacle in &layout.obstacles {
            let pose = obstacle.rest_pose();
            let handle = self.bodies.insert(
                RigidBodyBuilder::kinematic_position_based()
                    .translation(to_vector(pose.translation))
                    .build(),
            );
            let half = obstacle.variant().half_extents();
            self.attach_cuboid(handle, &Cuboid::new(Vec3::ZERO, half), 0.0);
            self.course.push(handle);
            course.obstacles.push(handle);
        }

        let flag = self.bodies.insert(
            RigidBodyBuilder::kinematic_position_based()
                .translation(to_vector(layout.end_anchor()))
                .build(),
        );
        let pole = Cuboid::new(Vec3::new(0.0, 0.6, 0.0), Vec3::new(0.05, 0.6, 0.05));
        self.attach_cuboid(flag, &pole, 0.0);
        self.course.push(flag);
        course.flag = Some(flag);

        log::debug!(
            "Loaded course into Rapier: {} bodies ({} obstacles)",
            self.course.len(),
            course.obstacles.len()
        );
        course
    }

    fn step(&mut self, dt: f32) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }
        self.integration_parameters.dt = dt;
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{FALL_THRESHOLD, GROUNDED_TOI, JUMP_RAY_OFFSET, PLAYER_SPAWN};
    use crate::sim::{
        ControllerTuning, FrameTime, Game, GameSession, GameStatus, ObstacleVariant,
        PlayerController, TickInput, generate,
    };

    const DT: f32 = 1.0 / 60.0;

    fn world_with_course(segments: u32) -> (RapierWorld, RigidBodyHandle) {
        let mut world = RapierWorld::new();
        let layout = generate(segments, 7, &ObstacleVariant::ALL).unwrap();
        world.load_course(&layout);
        let player = world.spawn_player(PLAYER_SPAWN);
        (world, player)
    }

    #[test]
    fn test_ball_settles_on_start_platform() {
        let (mut world, player) = world_with_course(3);
        for _ in 0..180 {
            world.step(DT);
        }
        let pos = world.player_body(player).unwrap().translation();
        assert!(pos.y > 0.2 && pos.y < 0.4, "ball resting height was {}", pos.y);

        let origin = pos - Vec3::new(0.0, JUMP_RAY_OFFSET, 0.0);
        let hit = world
            .cast_ray(origin, Vec3::NEG_Y, 10.0, Some(player))
            .expect("floor below the ball");
        assert!(hit.time_of_impact < GROUNDED_TOI);
    }

    #[test]
    fn test_ball_off_course_falls() {
        let mut world = RapierWorld::new();
        let player = world.spawn_player(Vec3::new(20.0, 1.0, 0.0));
        for _ in 0..120 {
            world.step(DT);
        }
        assert!(world.player_body(player).unwrap().translation().y < -4.0);
    }

    #[test]
    fn test_reset_stops_a_moving_ball() {
        let (mut world, player) = world_with_course(2);
        {
            let body = world.player_body_mut(player).unwrap();
            body.set_linear_velocity(Vec3::new(3.0, 0.0, -4.0));
            body.set_angular_velocity(Vec3::new(0.0, 6.0, 2.0));
        }
        for _ in 0..10 {
            world.step(DT);
        }
        assert!(world.player_body(player).unwrap().translation().distance(PLAYER_SPAWN) > 0.1);

        let mut controller = PlayerController::new(ControllerTuning::default());
        controller.attach(player);
        controller.reset(&mut world).unwrap();
        world.step(DT);

        // Gravity still pulls it down, but nothing carries it sideways.
        let pos = world.player_body(player).unwrap().translation();
        assert!((pos.x - PLAYER_SPAWN.x).abs() < 1e-3, "x drifted to {}", pos.x);
        assert!((pos.z - PLAYER_SPAWN.z).abs() < 1e-3, "z drifted to {}", pos.z);
        let body = &world.bodies[player];
        assert!(body.linvel().x.abs() < 1e-3 && body.linvel().z.abs() < 1e-3);
        assert!(to_vec3(body.angvel()).length() < 1e-3);
    }

    #[test]
    fn test_non_finite_step_is_skipped() {
        let (mut world, player) = world_with_course(2);
        world.step(f32::NAN);
        world.step(f32::INFINITY);
        assert_eq!(world.player_body(player).unwrap().translation(), PLAYER_SPAWN);
    }

    fn game_on_rapier(seed: u64) -> Game<RapierWorld> {
        Game::new(
            RapierWorld::new(),
            GameSession::new(3, seed),
            ObstacleVariant::ALL.to_vec(),
            ControllerTuning::default(),
        )
        .unwrap()
    }

    fn frame(i: u32) -> FrameTime {
        FrameTime {
            elapsed: i as f64 * DT as f64,
            delta: DT,
        }
    }

    #[test]
    fn test_game_jumps_and_recovers_from_fall() {
        let mut game = game_on_rapier(21);
        let player = game.controller().body().unwrap();

        for i in 0..120 {
            let report = game.tick(&TickInput::default(), frame(i)).unwrap();
            assert_eq!(report.status, GameStatus::Ready);
        }
        let mut i = 120;
        let settled = game.controller().position(game.world()).unwrap();
        assert!(game.controller().grounded(game.world()).unwrap());

        // The ray must skip the ball's own collider to find the floor.
        let jump = TickInput {
            jump: true,
            ..Default::default()
        };
        let report = game.tick(&jump, frame(i)).unwrap();
        i += 1;
        assert_eq!(report.status, GameStatus::Playing);
        assert!(report.jumped);
        let mut peak = settled.y;
        for _ in 0..10 {
            let report = game.tick(&TickInput::default(), frame(i)).unwrap();
            i += 1;
            peak = peak.max(report.player.y);
        }
        assert!(peak > settled.y + 0.1, "peak {} vs rest {}", peak, settled.y);

        let first_seed = game.session().seed();
        let bodies = game.world().body_count();
        game.world_mut()
            .player_body_mut(player)
            .unwrap()
            .set_translation(Vec3::new(0.0, FALL_THRESHOLD - 1.0, -2.0));
        let report = game.tick(&TickInput::default(), frame(i)).unwrap();
        i += 1;
        assert_eq!(report.status, GameStatus::Ready);
        assert!(report.reset);
        assert_eq!(report.player, PLAYER_SPAWN);
        assert_ne!(game.session().seed(), first_seed);
        assert_eq!(game.layout().seed, game.session().seed());
        assert_eq!(game.world().body_count(), bodies);

        let body = &game.world().bodies[player];
        assert_eq!(to_vec3(body.linvel()), Vec3::ZERO);
        assert_eq!(to_vec3(body.angvel()), Vec3::ZERO);

        game.tick(&TickInput::default(), frame(i)).unwrap();
        let pos = game.controller().position(game.world()).unwrap();
        assert!(pos.distance(PLAYER_SPAWN) < 0.05, "ball at {pos} after reset");
        assert_eq!(game.session().status(), GameStatus::Ready);
    }

    #[test]
    fn test_reload_replaces_course() {
        let (mut world, _) = world_with_course(4);
        let count = world.body_count();
        let layout = generate(4, 8, &ObstacleVariant::ALL).unwrap();
        let course = world.load_course(&layout);
        assert_eq!(world.body_count(), count);
        assert_eq!(course.obstacles.len(), 4);
        assert!(course.flag.is_some());
    }

    #[test]
    fn test_only_course_obstacles_are_kinematic() {
        let (mut world, player) = world_with_course(2);
        assert!(world.kinematic_body_mut(player).is_none());
        let layout = generate(2, 9, &ObstacleVariant::ALL).unwrap();
        let course = world.load_course(&layout);
        for handle in course.obstacles {
            assert!(world.kinematic_body_mut(handle).is_some());
        }
    }
}
