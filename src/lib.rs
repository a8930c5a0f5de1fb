//! Snail Race - Simulation core
//!
//! Provides the game server that runs a seeded race and reports finishers.
//! The binary drives it headless at a fixed frame rate.

pub mod game_server;

pub use game_server::race::{RaceConfig, RaceEvent, RaceSetup, RaceSnapshot, TARGET_FRAME_MS};
pub use game_server::results::{Finisher, RaceReport};
pub use game_server::simulation::{GameServer, GameState, ServerStats};
pub use game_server::{Race, RaceError};

/// Frames allowed per second of race length before a run counts as stalled
const FRAME_BUDGET_PER_SECOND: f64 = 60.0 * 60.0;

/// Run a whole race at `fps` fixed frames per second and return its report.
///
/// `on_complete` is invoked exactly once, when the race finishes.
pub fn run_headless(
    config: RaceConfig,
    fps: f64,
    on_complete: impl FnOnce(&RaceReport) + Send + 'static,
) -> Result<RaceReport, RaceError> {
    if !(fps.is_finite() && fps > 0.0) {
        return Err(RaceError::config(format!("fps must be positive, got {fps}")));
    }

    let max_frames = ((config.length_seconds.max(1.0) * FRAME_BUDGET_PER_SECOND) as u64).max(100_000);
    let mut race = Race::new(config)?;
    race.on_complete(on_complete);

    let mut server = GameServer::with_tick_rate(fps);
    server.install(race);
    log::info!("Snail race server initialized");

    let report = server.run_to_completion(1000.0 / fps, max_frames)?;
    let stats = server.get_stats();
    log::info!(
        "Simulated {} frames, avg tick {:.4}ms",
        stats.frames,
        stats.avg_tick_time_ms
    );
    Ok(report)
}
