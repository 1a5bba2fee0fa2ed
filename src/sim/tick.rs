//! Per-frame scheduling
//!
//! One `Game::tick` runs a whole frame in a fixed order:
//! 1. read the frame's input
//! 2. restart/start the session from input
//! 3. movement and jump impulses, obstacle poses
//! 4. physics step
//! 5. camera follow and boundary checks on the stepped pose
//!
//! Status changes are drained from the session inbox after steps 2 and 5. A
//! transition into `Ready` regenerates the course and resets the player
//! there, so the next physics step never sees stale momentum.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::controller::{Boundary, ControllerError, ControllerTuning, FollowCamera, PlayerController};
use super::level::{LevelError, LevelLayout, generate};
use super::obstacle::{ObstacleVariant, flag_rotation};
use super::session::{GameSession, GameStatus, StatusInbox};
use crate::consts::MAX_FRAME_DT;
use crate::physics::{CourseBodies, PhysicsWorld};

/// Logical actions for one frame. Directions are held state, `jump` and
/// `restart` are press edges already debounced by the input layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickInput {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    pub restart: bool,
}

impl TickInput {
    /// Any movement or jump action active (restart does not count)
    pub fn any_action(&self) -> bool {
        self.forward || self.backward || self.left || self.right || self.jump
    }

    /// Some movement or jump action is active now that was not in `previous`
    pub fn newly_active(&self, previous: &TickInput) -> bool {
        (self.forward && !previous.forward)
            || (self.backward && !previous.backward)
            || (self.left && !previous.left)
            || (self.right && !previous.right)
            || (self.jump && !previous.jump)
    }
}

/// Frame clock from the render loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTime {
    /// Seconds since the application started
    pub elapsed: f64,
    /// Seconds since the previous frame
    pub delta: f32,
}

/// What happened during one frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub status: GameStatus,
    /// Session clock for display
    pub clock: f64,
    pub player: Vec3,
    pub camera: FollowCamera,
    pub jumped: bool,
    /// Set on the frame the finish line was crossed
    pub finish_time: Option<f64>,
    /// Course regenerated and player reset this frame
    pub reset: bool,
}

#[derive(Debug, Error)]
pub enum GameError {
    #[error(transparent)]
    Controller(#[from] ControllerError),
    #[error(transparent)]
    Level(#[from] LevelError),
}

/// Session, course, controller and physics world, advanced one frame at a time
pub struct Game<W: PhysicsWorld> {
    session: GameSession,
    inbox: StatusInbox,
    pool: Vec<ObstacleVariant>,
    layout: LevelLayout,
    course: CourseBodies<W::Handle>,
    controller: PlayerController<W::Handle>,
    world: W,
    /// Input of the last ticked frame, for press edges
    previous_input: TickInput,
}

impl<W: PhysicsWorld> Game<W> {
    /// Generate the first course, load it and spawn the player
    pub fn new(
        mut world: W,
        mut session: GameSession,
        pool: Vec<ObstacleVariant>,
        tuning: ControllerTuning,
    ) -> Result<Self, GameError> {
        let (inbox, _) = StatusInbox::attach(&mut session);
        let layout = generate(session.segment_count(), session.seed(), &pool)?;
        let course = world.load_course(&layout);

        let spawn = tuning.spawn;
        let mut controller = PlayerController::new(tuning);
        controller.attach(world.spawn_player(spawn));

        log::info!(
            "Game ready: {} segments, pool {:?}",
            session.segment_count(),
            pool.iter().map(|v| v.as_str()).collect::<Vec<_>>()
        );

        Ok(Self {
            session,
            inbox,
            pool,
            layout,
            course,
            controller,
            world,
            previous_input: TickInput::default(),
        })
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    /// Direct access for the surrounding application (HUD buttons and the
    /// like). Transitions made here are picked up at the next tick.
    pub fn session_mut(&mut self) -> &mut GameSession {
        &mut self.session
    }

    pub fn layout(&self) -> &LevelLayout {
        &self.layout
    }

    pub fn course(&self) -> &CourseBodies<W::Handle> {
        &self.course
    }

    pub fn controller(&self) -> &PlayerController<W::Handle> {
        &self.controller
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    /// Run one frame
    pub fn tick(&mut self, input: &TickInput, time: FrameTime) -> Result<FrameReport, GameError> {
        let dt = if time.delta.is_finite() {
            time.delta.clamp(0.0, MAX_FRAME_DT)
        } else {
            log::warn!("Non-finite frame delta {}, skipping physics step", time.delta);
            0.0
        };
        let now = time.elapsed;

        // Session control from input. Only a fresh press starts a run, so a
        // key still held through a restart leaves the player waiting in Ready.
        let pressed = input.newly_active(&self.previous_input);
        self.previous_input = *input;
        let restarted = input.restart && self.session.restart();
        if !restarted && pressed && self.session.status() == GameStatus::Ready {
            self.session.start(now);
        }
        let mut reset = self.apply_status_changes()?;

        // Impulses and kinematic targets for this step
        let mut jumped = false;
        if self.session.status() == GameStatus::Playing {
            jumped = self.controller.apply_controls(&mut self.world, input, dt)?;
        }
        self.drive_obstacles(now as f32);

        self.world.step(dt);

        // Post-step queries
        let camera = self.controller.follow_camera(&self.world, dt)?;
        let mut finish_time = None;
        if self.session.status() == GameStatus::Playing {
            match self
                .controller
                .check_boundaries(&self.world, self.layout.finish_distance())?
            {
                Some(Boundary::Finished) => {
                    if self.session.finish(now) {
                        let time = self.session.elapsed(now);
                        log::info!("Finished in {:.3}s", time);
                        finish_time = Some(time);
                    }
                }
                Some(Boundary::Fell) => {
                    log::info!("Player fell off the course");
                    self.session.restart();
                }
                None => {}
            }
        }
        reset |= self.apply_status_changes()?;

        Ok(FrameReport {
            status: self.session.status(),
            clock: self.session.elapsed(now),
            player: self.controller.position(&self.world)?,
            camera,
            jumped,
            finish_time,
            reset,
        })
    }

    /// Handle queued status changes. Returns true if the course was rebuilt.
    fn apply_status_changes(&mut self) -> Result<bool, GameError> {
        let changes = self.inbox.drain();
        if !changes.contains(&GameStatus::Ready) {
            return Ok(false);
        }
        // Any number of queued `Ready`s collapse into one rebuild for the
        // current seed.
        self.layout = generate(self.session.segment_count(), self.session.seed(), &self.pool)?;
        self.course = self.world.load_course(&self.layout);
        self.controller.reset(&mut self.world)?;
        Ok(true)
    }

    /// Push every obstacle's pose for `elapsed` to its kinematic body
    fn drive_obstacles(&mut self, elapsed: f32) {
        for (obstacle, handle) in self.layout.obstacles.iter().zip(&self.course.obstacles) {
            let pose = obstacle.pose(elapsed);
            match self.world.kinematic_body_mut(*handle) {
                Some(body) => {
                    body.set_next_kinematic_translation(pose.translation);
                    body.set_next_kinematic_rotation(pose.rotation);
                }
                None => log::warn!("Obstacle body {:?} missing", handle),
            }
        }
        if let Some(flag) = self.course.flag {
            if let Some(body) = self.world.kinematic_body_mut(flag) {
                body.set_next_kinematic_rotation(flag_rotation(elapsed));
            }
        }
    }
}
