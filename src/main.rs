//! Marble Race headless runner
//!
//! Drives the game core against the Rapier backend with a scripted pilot and
//! logs session events. Usage: `marble-race [settings.json] [frames]`.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use marble_race::Settings;
use marble_race::best_times::{BestTimes, format_time};
use marble_race::physics::RapierWorld;
use marble_race::sim::{FrameTime, Game, GameSession, GameStatus, TickInput};

/// Render-loop frame length the runner simulates
const FRAME_DT: f32 = 1.0 / 60.0;
/// One minute of play
const DEFAULT_FRAMES: u32 = 60 * 60;
/// Frames between jump presses
const JUMP_INTERVAL: u32 = 45;
/// Frames to linger on the finish platform before restarting
const ENDING_PAUSE: u32 = 120;

/// Scripted input: roll forward, hop now and then, restart after finishing
#[derive(Debug, Default)]
struct Pilot {
    ending_frames: u32,
    last: TickInput,
}

impl Pilot {
    fn input(&mut self, status: GameStatus, frame: u32) -> TickInput {
        let input = match status {
            GameStatus::Ending => {
                self.ending_frames += 1;
                TickInput {
                    restart: self.ending_frames >= ENDING_PAUSE,
                    ..Default::default()
                }
            }
            // Let go for a frame so the next press starts a fresh run
            GameStatus::Ready if self.last.any_action() => TickInput::default(),
            GameStatus::Ready | GameStatus::Playing => {
                self.ending_frames = 0;
                TickInput {
                    forward: true,
                    jump: frame % JUMP_INTERVAL == 0,
                    ..Default::default()
                }
            }
        };
        self.last = input;
        input
    }
}

fn run(settings_path: &Path, frames: u32) -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::load(settings_path)?;
    let seed = settings.seed.unwrap_or_else(rand::random);
    log::info!("Marble Race starting (seed {:#x}, {} frames)", seed, frames);
    log::debug!("Effective settings:\n{}", settings.to_json()?);

    let session = GameSession::new(settings.segment_count, seed);
    let mut game = Game::new(
        RapierWorld::new(),
        session,
        settings.obstacles.clone(),
        settings.tuning.clone(),
    )?;

    let times_path = settings_path.with_file_name("marble-race-times.json");
    let mut best = BestTimes::load(&times_path);
    if !best.is_empty() {
        log::info!("Time to beat: {}", best.best().map(format_time).unwrap_or_default());
    }
    let mut pilot = Pilot::default();
    let mut runs = 0u32;

    for frame in 0..frames {
        let time = FrameTime {
            elapsed: frame as f64 * FRAME_DT as f64,
            delta: FRAME_DT,
        };
        let input = pilot.input(game.session().status(), frame);
        let report = game.tick(&input, time)?;

        if let Some(finish) = report.finish_time {
            runs += 1;
            log::info!("Run {} finished in {}", runs, format_time(finish));
            let session = game.session();
            if best
                .add_time(finish, session.segment_count(), session.seed())
                .is_some()
            {
                best.save(&times_path)?;
            }
        }
        if report.reset {
            log::info!("Course rebuilt (seed {:#x})", game.layout().seed);
        }
        if frame % 60 == 0 {
            log::debug!(
                "t={:.1}s status={} clock={:.2} player={} camera={}",
                time.elapsed,
                report.status.as_str(),
                report.clock,
                report.player,
                report.camera.position
            );
        }
    }

    match best.best() {
        Some(fastest) => log::info!("Best time: {}", format_time(fastest)),
        None => log::info!("No finished runs recorded"),
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let settings_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("marble-race.json"));
    let frames = match args.next().map(|arg| arg.parse::<u32>()) {
        None => DEFAULT_FRAMES,
        Some(Ok(frames)) => frames,
        Some(Err(e)) => {
            log::error!("Invalid frame count: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&settings_path, frames) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
