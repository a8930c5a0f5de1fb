//! Simulation - Main game server and loop
//!
//! Owns the race lifecycle for a host page: init, start, tick, results.
//! Ticks come either from the wall clock or from a caller-supplied frame
//! delta for deterministic replays.

use std::time::Instant;
use serde::{Deserialize, Serialize};
use crate::game_server::error::RaceError;
use crate::game_server::race::{Race, RaceConfig, RaceEvent, RaceSnapshot};
use crate::game_server::results::{Finisher, RaceReport};

/// Host-facing game state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameState {
    Idle,
    Ready,
    Racing,
    Results,
}

/// Server statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerStats {
    pub tick_rate: f64,
    pub avg_tick_time_ms: f64,
    pub frames: u64,
    pub runner_count: u32,
    pub game_state: GameState,
}

/// Main game server
pub struct GameServer {
    /// Current game state
    state: GameState,
    /// Active race (if any)
    race: Option<Race>,
    /// Ticks per second the host drives us at
    tick_rate: f64,
    /// Last wall-clock tick
    last_tick: Instant,
    /// Recent tick processing times for averaging
    tick_times: Vec<f64>,
    /// Frames stepped in the current race
    frames: u64,
    /// Whether ticks advance the race
    running: bool,
}

impl GameServer {
    /// Create a new game server
    pub fn new() -> Self {
        Self::with_tick_rate(60.0)
    }

    /// Create a server for a host that ticks `tick_rate` times per second
    pub fn with_tick_rate(tick_rate: f64) -> Self {
        Self {
            state: GameState::Idle,
            race: None,
            tick_rate,
            last_tick: Instant::now(),
            tick_times: Vec::with_capacity(60),
            frames: 0,
            running: false,
        }
    }

    /// Initialize a new race with given config
    pub fn init_race(&mut self, config: RaceConfig) -> Result<(), RaceError> {
        let race = Race::new(config)?;
        self.install(race);
        Ok(())
    }

    /// Take an already built race, e.g. one with custom assets or a callback
    pub fn install(&mut self, race: Race) {
        self.race = Some(race);
        self.state = GameState::Ready;
        self.running = false;
        self.frames = 0;
        self.tick_times.clear();
    }

    /// Start the race countdown
    pub fn start_race(&mut self) -> Result<(), RaceError> {
        if self.state != GameState::Ready {
            return Err(RaceError::invalid_state("Ready", self.state));
        }
        let race = self
            .race
            .as_mut()
            .ok_or_else(|| RaceError::invalid_state("Ready", GameState::Idle))?;
        race.start_countdown()?;
        self.state = GameState::Racing;
        self.running = true;
        self.last_tick = Instant::now();
        Ok(())
    }

    /// Tick with the wall-clock time since the previous tick
    pub fn tick(&mut self) -> Option<RaceSnapshot> {
        if self.running {
            let now = Instant::now();
            let elapsed_ms = now.duration_since(self.last_tick).as_secs_f64() * 1000.0;
            self.last_tick = now;
            self.step(elapsed_ms);
        }
        self.get_snapshot()
    }

    /// Advance the race by exactly `elapsed_ms`
    pub fn step(&mut self, elapsed_ms: f64) -> Vec<RaceEvent> {
        if !self.running {
            return Vec::new();
        }
        let Some(race) = self.race.as_mut() else {
            return Vec::new();
        };

        let tick_start = Instant::now();
        let events = race.update(elapsed_ms);
        self.frames += 1;

        if race.is_complete() {
            self.state = GameState::Results;
            self.running = false;
        }

        let tick_time = tick_start.elapsed().as_secs_f64() * 1000.0;
        self.tick_times.push(tick_time);
        if self.tick_times.len() > 60 {
            self.tick_times.remove(0);
        }

        events
    }

    /// Step fixed frames until the race completes.
    ///
    /// Starts the countdown if the race is still waiting.
    pub fn run_to_completion(&mut self, frame_ms: f64, max_frames: u64) -> Result<RaceReport, RaceError> {
        if self.state == GameState::Ready {
            self.start_race()?;
        }
        if self.state == GameState::Idle {
            return Err(RaceError::invalid_state("Ready", self.state));
        }
        if frame_ms > 0.0 {
            self.tick_rate = 1000.0 / frame_ms;
        }

        let mut frames = 0;
        while self.state == GameState::Racing {
            if !self.running {
                return Err(RaceError::invalid_state("Racing", "Paused"));
            }
            if frames >= max_frames {
                return Err(RaceError::Stalled(max_frames));
            }
            self.step(frame_ms);
            frames += 1;
        }

        self.get_report()
            .cloned()
            .ok_or_else(|| RaceError::invalid_state("Results", self.state))
    }

    /// Get current race snapshot
    pub fn get_snapshot(&self) -> Option<RaceSnapshot> {
        self.race.as_ref().map(|r| r.get_snapshot())
    }

    /// Finishers so far, in detection order
    pub fn get_results(&self) -> Option<Vec<Finisher>> {
        self.race.as_ref().map(|r| r.results().finishers().to_vec())
    }

    /// Final report once the race is over
    pub fn get_report(&self) -> Option<&RaceReport> {
        self.race.as_ref().and_then(|r| r.report())
    }

    pub fn race(&self) -> Option<&Race> {
        self.race.as_ref()
    }

    /// Get server statistics
    pub fn get_stats(&self) -> ServerStats {
        let avg_tick_time = if self.tick_times.is_empty() {
            0.0
        } else {
            self.tick_times.iter().sum::<f64>() / self.tick_times.len() as f64
        };

        ServerStats {
            tick_rate: self.tick_rate,
            avg_tick_time_ms: avg_tick_time,
            frames: self.frames,
            runner_count: self.race.as_ref().map(|r| r.runners().len() as u32).unwrap_or(0),
            game_state: self.state,
        }
    }

    /// Get current game state
    pub fn get_state(&self) -> GameState {
        self.state
    }

    /// Reset to idle state
    pub fn reset(&mut self) {
        self.state = GameState::Idle;
        self.race = None;
        self.running = false;
        self.frames = 0;
        self.tick_times.clear();
    }

    /// Pause the simulation
    pub fn pause(&mut self) {
        self.running = false;
    }

    /// Resume the simulation
    pub fn resume(&mut self) {
        if self.state == GameState::Racing {
            self.running = true;
            self.last_tick = Instant::now();
        }
    }

    /// Check if server is running
    pub fn is_running(&self) -> bool {
        self.running
    }
}

impl Default for GameServer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_server::race::{RaceStatus, TARGET_FRAME_MS};
    use crate::game_server::runner::RunnerConfig;

    fn config(seed: &str) -> RaceConfig {
        RaceConfig {
            runners: vec![
                RunnerConfig::new("Foo", "#ff0000", 1),
                RunnerConfig::new("Bar", "#0000ff", 2),
            ],
            length_seconds: 5.0,
            seed: Some(seed.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_lifecycle() {
        let mut server = GameServer::new();
        assert_eq!(server.get_state(), GameState::Idle);
        assert!(server.start_race().is_err());

        server.init_race(config("abc")).unwrap();
        assert_eq!(server.get_state(), GameState::Ready);
        assert_eq!(server.get_stats().runner_count, 2);

        server.start_race().unwrap();
        assert_eq!(server.get_state(), GameState::Racing);
        assert!(server.is_running());

        let report = server.run_to_completion(TARGET_FRAME_MS, 100_000).unwrap();
        assert_eq!(server.get_state(), GameState::Results);
        assert_eq!(report.finishers.len(), 2);
        assert_eq!(report.seed, "abc");
        assert!(server.get_stats().frames > 0);

        server.reset();
        assert_eq!(server.get_state(), GameState::Idle);
        assert!(server.get_snapshot().is_none());
    }

    #[test]
    fn test_init_rejects_bad_config() {
        let mut server = GameServer::new();
        let mut bad = config("abc");
        bad.runners.clear();
        assert!(matches!(server.init_race(bad), Err(RaceError::NoRunners)));
        assert_eq!(server.get_state(), GameState::Idle);
    }

    #[test]
    fn test_pause_stops_stepping() {
        let mut server = GameServer::new();
        server.init_race(config("pause")).unwrap();
        server.start_race().unwrap();
        server.step(TARGET_FRAME_MS);

        server.pause();
        assert!(server.step(5000.0).is_empty());
        assert_eq!(server.get_snapshot().unwrap().countdown, Some(5));
        assert!(server.run_to_completion(TARGET_FRAME_MS, 10).is_err());

        server.resume();
        assert!(server.is_running());
    }

    #[test]
    fn test_wall_clock_tick_only_advances_when_running() {
        let mut server = GameServer::new();
        assert!(server.tick().is_none());

        server.init_race(config("clock")).unwrap();
        let idle = server.tick().unwrap();
        assert_eq!(idle.status, RaceStatus::Pending);
        assert_eq!(server.get_stats().frames, 0);

        server.start_race().unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let snapshot = server.tick().unwrap();
        assert_eq!(server.get_stats().frames, 1);
        assert_eq!(snapshot.countdown, Some(5));

        server.pause();
        server.tick();
        assert_eq!(server.get_stats().frames, 1);
    }

    #[test]
    fn test_stats_report_stepping_rate() {
        let mut server = GameServer::new();
        assert_eq!(server.get_stats().tick_rate, 60.0);

        server.init_race(config("rate")).unwrap();
        server.run_to_completion(1000.0 / 30.0, 100_000).unwrap();
        let stats = server.get_stats();
        assert!((stats.tick_rate - 30.0).abs() < 1e-9);
        assert_eq!(stats.game_state, GameState::Results);

        assert_eq!(GameServer::with_tick_rate(120.0).get_stats().tick_rate, 120.0);
    }

    #[test]
    fn test_stalled_when_budget_too_small() {
        let mut server = GameServer::new();
        server.init_race(config("slow")).unwrap();
        assert!(matches!(
            server.run_to_completion(TARGET_FRAME_MS, 10),
            Err(RaceError::Stalled(10))
        ));
    }
}
