//! Race - Race configuration and state management
//!
//! Drives countdown, per-tick runner advancement, finish detection, camera
//! follow and the wind-down to a single completion report.

use serde::{Deserialize, Serialize};
use crate::game_server::camera::{Camera, LayerId, Vec2};
use crate::game_server::error::RaceError;
use crate::game_server::results::{Finisher, RaceReport, ResultCollector};
use crate::game_server::rng::{random_seed, SeededRandom};
use crate::game_server::runner::{Runner, RunnerConfig, RunnerSnapshot, RunnerState, SpeedLimits};
use crate::game_server::scene::{self, AssetCatalog, StaticAssets, FINISH_LINE_VIEWPORT_FRACTION};

/// World units covered per second of configured race length
pub const WORLD_UNITS_PER_SECOND: f64 = 600.0;
/// Frame duration that corresponds to a delta multiplier of 1.0
pub const TARGET_FRAME_MS: f64 = 1000.0 / 60.0;
/// Longest race the scene builder will lay out
pub const MAX_LENGTH_SECONDS: f64 = 3600.0;

/// Screen size the camera follows the leader in
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
        }
    }
}

/// Race configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    /// Runners in setup order; the last one starts at the front of the grid
    pub runners: Vec<RunnerConfig>,
    /// Race length in seconds, scaled to world units
    pub length_seconds: f64,
    /// Seed string; a random one is generated when absent
    pub seed: Option<String>,
    pub viewport: Viewport,
    /// First countdown number shown
    pub countdown_from: u32,
    /// Display time of each countdown number
    pub countdown_step_ms: f64,
    /// Period of the speed-change timer
    pub speed_change_interval_ms: f64,
    pub speed_limits: SpeedLimits,
    /// Duration of the ease between speeds
    pub speed_ease_ms: f64,
    /// Rendered runner width; a third of it must pass the line
    pub runner_visual_width: f64,
    /// Delay after the last finisher before results are shown
    pub finishing_dwell_ms: f64,
    /// Delay after results are shown before the completion callback
    pub results_dwell_ms: f64,
    pub name: Option<String>,
    pub sponsor: Option<String>,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            runners: Vec::new(),
            length_seconds: 30.0,
            seed: None,
            viewport: Viewport::default(),
            countdown_from: 5,
            countdown_step_ms: 1000.0,
            speed_change_interval_ms: 1000.0,
            speed_limits: SpeedLimits::default(),
            speed_ease_ms: 750.0,
            runner_visual_width: 300.0,
            finishing_dwell_ms: 2000.0,
            results_dwell_ms: 3000.0,
            name: None,
            sponsor: None,
        }
    }
}

impl RaceConfig {
    /// Reject configurations the simulation cannot run
    pub fn validate(&self) -> Result<(), RaceError> {
        if self.runners.is_empty() {
            return Err(RaceError::NoRunners);
        }
        if !(self.length_seconds.is_finite()
            && self.length_seconds > 0.0
            && self.length_seconds <= MAX_LENGTH_SECONDS)
        {
            return Err(RaceError::InvalidRaceLength(self.length_seconds));
        }
        if matches!(&self.seed, Some(seed) if seed.is_empty()) {
            return Err(RaceError::InvalidSeed);
        }
        let Viewport { width, height } = self.viewport;
        if !(width.is_finite() && width > 0.0 && height.is_finite() && height > 0.0) {
            return Err(RaceError::InvalidViewport { width, height });
        }
        let SpeedLimits { min_speed, max_speed } = self.speed_limits;
        if !(min_speed.is_finite() && max_speed.is_finite() && min_speed > 0.0 && min_speed < max_speed) {
            return Err(RaceError::InvalidSpeedLimits {
                min: min_speed,
                max: max_speed,
            });
        }

        let durations = [
            ("countdown_step_ms", self.countdown_step_ms),
            ("speed_ease_ms", self.speed_ease_ms),
            ("finishing_dwell_ms", self.finishing_dwell_ms),
            ("results_dwell_ms", self.results_dwell_ms),
            ("runner_visual_width", self.runner_visual_width),
        ];
        for (field, value) in durations {
            if !(value.is_finite() && value >= 0.0) {
                return Err(RaceError::config(format!("{field} must be finite and non-negative, got {value}")));
            }
        }
        let interval = self.speed_change_interval_ms;
        if !(interval.is_finite() && interval > 0.0) {
            return Err(RaceError::config(format!(
                "speed_change_interval_ms must be positive, got {interval}"
            )));
        }
        Ok(())
    }

    /// Race length in world units
    pub fn world_length(&self) -> f64 {
        self.length_seconds * WORLD_UNITS_PER_SECOND
    }

    pub fn finish_line_x(&self) -> f64 {
        self.world_length() + self.viewport.width * FINISH_LINE_VIEWPORT_FRACTION
    }
}

/// Setup document as produced by the configuration screen
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RaceSetup {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub sponsor: Option<String>,
    /// Seconds
    pub length: f64,
    #[serde(default)]
    pub seed: Option<String>,
    pub snails: Vec<RunnerConfig>,
}

impl RaceSetup {
    pub fn from_json(json: &str) -> Result<Self, RaceError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn into_config(self) -> RaceConfig {
        RaceConfig {
            runners: self.snails,
            length_seconds: self.length,
            seed: self.seed,
            name: self.name,
            sponsor: self.sponsor,
            ..Default::default()
        }
    }
}

/// Race status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaceStatus {
    Pending,
    /// Number currently displayed
    Countdown(u32),
    Running,
    Finishing,
    Complete,
}

/// Something a tick did that the host may want to show
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RaceEvent {
    CountdownStep(u32),
    Started,
    Finished(Finisher),
    AllFinished,
    ResultsShown,
    Completed(RaceReport),
}

/// Invoked once with the final report
pub type CompletionCallback = Box<dyn FnOnce(&RaceReport) + Send>;

/// Complete race state
pub struct Race {
    config: RaceConfig,
    seed: String,
    status: RaceStatus,
    runners: Vec<RunnerState>,
    runner_layers: Vec<LayerId>,
    camera: Camera,
    rng: SeededRandom,
    /// Race time, only advancing while running or finishing
    elapsed_ms: f64,
    /// Time since the last speed change
    speed_timer_ms: f64,
    /// Time spent in the current countdown step or dwell
    phase_timer_ms: f64,
    finish_line_x: f64,
    results: ResultCollector,
    show_results: bool,
    report: Option<RaceReport>,
    on_complete: Option<CompletionCallback>,
    events: Vec<RaceEvent>,
}

impl Race {
    /// Create a race with the default scene assets
    pub fn new(config: RaceConfig) -> Result<Self, RaceError> {
        Self::with_assets(config, &StaticAssets::default_scene())
    }

    /// Create a race, spawn its runners and build the scene.
    pub fn with_assets(config: RaceConfig, assets: &dyn AssetCatalog) -> Result<Self, RaceError> {
        config.validate()?;

        let seed = match &config.seed {
            Some(seed) => seed.clone(),
            None => {
                let seed = random_seed();
                log::info!("No seed supplied, using generated seed '{}'", seed);
                seed
            }
        };
        let mut rng = SeededRandom::new(&seed);

        let mut runners: Vec<RunnerState> = config
            .runners
            .iter()
            .enumerate()
            .map(|(i, runner)| Runner::spawn(i as u32, runner.clone(), &config.speed_limits, &mut rng))
            .collect();
        // Grid order, front first. Ticks iterate in this order, so it also
        // breaks same-tick finishes and leader ties.
        runners.reverse();

        let world_length = config.world_length();
        let finish_line_x = config.finish_line_x();
        let mut camera = Camera::new(world_length, config.viewport.height);

        let backdrop = scene::default_backdrop(world_length, config.viewport.width, finish_line_x);
        scene::build_backdrop(&mut camera, &backdrop, assets, &mut rng, config.viewport.width)?;
        let runner_layers = scene::place_runners(&mut camera, &mut runners, assets)?;

        log::info!(
            "Race initialized: {} runners, finish line at {:.0}, seed '{}'",
            runners.len(),
            finish_line_x,
            seed
        );

        Ok(Self {
            results: ResultCollector::new(runners.len()),
            config,
            seed,
            status: RaceStatus::Pending,
            runners,
            runner_layers,
            camera,
            rng,
            elapsed_ms: 0.0,
            speed_timer_ms: 0.0,
            phase_timer_ms: 0.0,
            finish_line_x,
            show_results: false,
            report: None,
            on_complete: None,
            events: Vec::new(),
        })
    }

    /// Register the completion callback. It fires at most once.
    pub fn on_complete(&mut self, callback: impl FnOnce(&RaceReport) + Send + 'static) {
        self.on_complete = Some(Box::new(callback));
    }

    /// Update the rendered runner width reported by the renderer
    pub fn set_runner_visual_width(&mut self, width: f64) {
        self.config.runner_visual_width = width;
    }

    /// Scene is ready: begin the countdown
    pub fn start_countdown(&mut self) -> Result<(), RaceError> {
        if self.status != RaceStatus::Pending {
            return Err(RaceError::invalid_state("Pending", self.status));
        }
        self.phase_timer_ms = 0.0;
        if self.config.countdown_from == 0 {
            self.begin_running();
        } else {
            self.status = RaceStatus::Countdown(self.config.countdown_from);
            self.events.push(RaceEvent::CountdownStep(self.config.countdown_from));
            log::info!("Countdown: {}", self.config.countdown_from);
        }
        Ok(())
    }

    /// Advance the race by one frame of `elapsed_ms`.
    ///
    /// Returns everything that happened since the previous call.
    pub fn update(&mut self, elapsed_ms: f64) -> Vec<RaceEvent> {
        debug_assert!(
            elapsed_ms.is_finite() && elapsed_ms >= 0.0,
            "negative or non-finite frame delta {elapsed_ms}"
        );
        if !(elapsed_ms.is_finite() && elapsed_ms >= 0.0) {
            return std::mem::take(&mut self.events);
        }
        let delta_time = elapsed_ms / TARGET_FRAME_MS;

        match self.status {
            RaceStatus::Pending => {}

            RaceStatus::Countdown(n) => {
                self.phase_timer_ms += elapsed_ms;
                if self.phase_timer_ms >= self.config.countdown_step_ms {
                    self.phase_timer_ms = 0.0;
                    if n <= 1 {
                        self.begin_running();
                    } else {
                        self.status = RaceStatus::Countdown(n - 1);
                        self.events.push(RaceEvent::CountdownStep(n - 1));
                        log::info!("Countdown: {}", n - 1);
                    }
                }
            }

            RaceStatus::Running => self.run_tick(elapsed_ms, delta_time),

            RaceStatus::Finishing => {
                if !self.show_results {
                    self.elapsed_ms += elapsed_ms;
                }
                self.phase_timer_ms += elapsed_ms;
                if !self.show_results && self.phase_timer_ms >= self.config.finishing_dwell_ms {
                    self.show_results = true;
                    self.phase_timer_ms = 0.0;
                    self.events.push(RaceEvent::ResultsShown);
                    log::info!("FIN");
                } else if self.show_results && self.phase_timer_ms >= self.config.results_dwell_ms {
                    self.complete();
                }
            }

            RaceStatus::Complete => return std::mem::take(&mut self.events),
        }

        if !self.show_results {
            self.follow_leader();
        }

        std::mem::take(&mut self.events)
    }

    fn begin_running(&mut self) {
        self.status = RaceStatus::Running;
        self.events.push(RaceEvent::Started);
        log::info!("Race started");
    }

    fn run_tick(&mut self, elapsed_ms: f64, delta_time: f64) {
        self.elapsed_ms += elapsed_ms;
        self.speed_timer_ms += elapsed_ms;
        let now = self.elapsed_ms;

        if self.speed_timer_ms > self.config.speed_change_interval_ms {
            self.speed_timer_ms -= self.config.speed_change_interval_ms;
            for runner in &mut self.runners {
                Runner::change_speed(
                    runner,
                    &self.config.speed_limits,
                    &mut self.rng,
                    now,
                    self.config.speed_ease_ms,
                );
            }
        }

        let reach = self.config.runner_visual_width / 3.0;
        for (runner, layer) in self.runners.iter_mut().zip(&self.runner_layers) {
            Runner::advance(runner, delta_time, now);
            if let Err(err) = self.camera.set_anchor(*layer, runner.position) {
                log::warn!("runner {} has no layer: {}", runner.id, err);
            }

            if !runner.flags.finished && runner.position.x + reach > self.finish_line_x {
                if !Runner::mark_finished(runner, now) {
                    continue;
                }
                if let Some(position) = self.results.record(&runner.config, now) {
                    log::info!(
                        "{} (#{}) finished in position {} at {:.3}s",
                        runner.config.name,
                        runner.config.number,
                        position,
                        now / 1000.0
                    );
                    if let Some(finisher) = self.results.finishers().last() {
                        self.events.push(RaceEvent::Finished(finisher.clone()));
                    }
                }
            }
        }

        if self.results.is_complete() {
            self.status = RaceStatus::Finishing;
            self.phase_timer_ms = 0.0;
            self.events.push(RaceEvent::AllFinished);
            log::info!("All {} runners finished", self.results.len());
        }
    }

    fn complete(&mut self) {
        self.status = RaceStatus::Complete;
        let report = RaceReport {
            name: self.config.name.clone(),
            sponsor: self.config.sponsor.clone(),
            seed: self.seed.clone(),
            finishers: self.results.finishers().to_vec(),
        };
        if let Some(callback) = self.on_complete.take() {
            callback(&report);
        }
        log::info!("Race complete");
        self.events.push(RaceEvent::Completed(report.clone()));
        self.report = Some(report);
    }

    /// Centre the camera on the furthest runner; ties go to the runner nearer the grid front.
    fn follow_leader(&mut self) {
        let Some(leader_x) = self.get_leader().map(|r| r.position.x) else {
            return;
        };
        self.camera.move_to(leader_x - self.config.viewport.width / 2.0, 0.0);
    }

    /// Runner furthest along the track
    pub fn get_leader(&self) -> Option<&RunnerState> {
        self.runners.iter().fold(None, |best: Option<&RunnerState>, runner| match best {
            Some(b) if b.position.x >= runner.position.x => Some(b),
            _ => Some(runner),
        })
    }

    /// Live standings: furthest along first, ties in grid order
    pub fn positions(&self) -> Vec<&RunnerState> {
        let mut standings: Vec<&RunnerState> = self.runners.iter().collect();
        standings.sort_by(|a, b| b.position.x.total_cmp(&a.position.x));
        standings
    }

    /// Runners in grid order, front first
    pub fn runners(&self) -> &[RunnerState] {
        &self.runners
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn results(&self) -> &ResultCollector {
        &self.results
    }

    /// Final report, once complete
    pub fn report(&self) -> Option<&RaceReport> {
        self.report.as_ref()
    }

    pub fn config(&self) -> &RaceConfig {
        &self.config
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }

    pub fn status(&self) -> RaceStatus {
        self.status
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed_ms
    }

    pub fn finish_line_x(&self) -> f64 {
        self.finish_line_x
    }

    pub fn results_shown(&self) -> bool {
        self.show_results
    }

    pub fn is_complete(&self) -> bool {
        self.status == RaceStatus::Complete
    }

    /// Get compact snapshot for the renderer
    pub fn get_snapshot(&self) -> RaceSnapshot {
        let runners = self
            .runners
            .iter()
            .zip(&self.runner_layers)
            .map(|(runner, layer)| {
                let screen = self
                    .camera
                    .layer(*layer)
                    .map(|l| l.rendered_position())
                    .unwrap_or(runner.position);
                RunnerSnapshot::new(runner, screen)
            })
            .collect();

        RaceSnapshot {
            status: self.status,
            elapsed_time_ms: self.elapsed_ms,
            countdown: match self.status {
                RaceStatus::Countdown(n) => Some(n),
                _ => None,
            },
            camera: self.camera.position(),
            finish_line_x: self.finish_line_x,
            show_results: self.show_results,
            runners,
            positions: self.positions().iter().map(|r| r.id).collect(),
            finisher_count: self.results.len() as u32,
        }
    }
}

/// Compact race snapshot for the renderer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceSnapshot {
    pub status: RaceStatus,
    pub elapsed_time_ms: f64,
    pub countdown: Option<u32>,
    pub camera: Vec2,
    pub finish_line_x: f64,
    pub show_results: bool,
    pub runners: Vec<RunnerSnapshot>,
    /// Runner ids by current standing
    pub positions: Vec<u32>,
    pub finisher_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_server::runner::SpeedEase;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn config(names: &[&str], seed: &str, length_seconds: f64) -> RaceConfig {
        RaceConfig {
            runners: names
                .iter()
                .enumerate()
                .map(|(i, name)| RunnerConfig::new(*name, "#00ff00", i as u32 + 1))
                .collect(),
            length_seconds,
            seed: Some(seed.to_string()),
            ..Default::default()
        }
    }

    fn run(race: &mut Race) -> Vec<RaceEvent> {
        let mut events = Vec::new();
        for _ in 0..200_000 {
            events.extend(race.update(TARGET_FRAME_MS));
            if race.is_complete() {
                break;
            }
        }
        events
    }

    #[test]
    fn test_validation() {
        assert!(matches!(Race::new(config(&[], "abc", 10.0)), Err(RaceError::NoRunners)));
        assert!(matches!(
            Race::new(config(&["A"], "abc", 0.0)),
            Err(RaceError::InvalidRaceLength(_))
        ));
        assert!(matches!(Race::new(config(&["A"], "", 10.0)), Err(RaceError::InvalidSeed)));

        let mut bad = config(&["A"], "abc", 10.0);
        bad.speed_limits = SpeedLimits { min_speed: 20.0, max_speed: 6.0 };
        assert!(matches!(Race::new(bad), Err(RaceError::InvalidSpeedLimits { .. })));

        let mut bad = config(&["A"], "abc", 10.0);
        bad.viewport.width = 0.0;
        assert!(matches!(Race::new(bad), Err(RaceError::InvalidViewport { .. })));
    }

    #[test]
    fn test_race_length_is_capped() {
        assert!(matches!(
            Race::new(config(&["A"], "abc", 1e9)),
            Err(RaceError::InvalidRaceLength(_))
        ));
        assert!(matches!(
            Race::new(config(&["A"], "abc", f64::INFINITY)),
            Err(RaceError::InvalidRaceLength(_))
        ));
        assert!(config(&["A"], "abc", MAX_LENGTH_SECONDS).validate().is_ok());
    }

    #[test]
    fn test_timing_fields_validated() {
        let cases: [fn(&mut RaceConfig); 7] = [
            |c| c.countdown_step_ms = -1.0,
            |c| c.speed_ease_ms = f64::NAN,
            |c| c.finishing_dwell_ms = -2000.0,
            |c| c.results_dwell_ms = f64::INFINITY,
            |c| c.runner_visual_width = -300.0,
            |c| c.speed_change_interval_ms = 0.0,
            |c| c.speed_change_interval_ms = f64::NAN,
        ];
        for tweak in cases {
            let mut bad = config(&["A"], "abc", 10.0);
            tweak(&mut bad);
            assert!(matches!(Race::new(bad), Err(RaceError::Config(_))));
        }

        let mut instant = config(&["A"], "abc", 10.0);
        instant.speed_ease_ms = 0.0;
        instant.finishing_dwell_ms = 0.0;
        assert!(instant.validate().is_ok());
    }

    #[test]
    fn test_missing_runner_list_is_rejected() {
        let config: RaceConfig = serde_json::from_str(r#"{"length_seconds": 10, "seed": "abc"}"#).unwrap();
        assert!(config.runners.is_empty());
        assert!(matches!(Race::new(config), Err(RaceError::NoRunners)));
    }

    #[test]
    fn test_finish_line_position() {
        let race = Race::new(config(&["A"], "abc", 10.0)).unwrap();
        assert_eq!(race.finish_line_x(), 6000.0 + 1280.0 * 0.75);
    }

    #[test]
    fn test_countdown_sequence() {
        let mut race = Race::new(config(&["A"], "abc", 10.0)).unwrap();
        assert_eq!(race.status(), RaceStatus::Pending);
        assert!(race.update(TARGET_FRAME_MS).is_empty());

        race.start_countdown().unwrap();
        assert!(race.start_countdown().is_err());
        assert_eq!(race.status(), RaceStatus::Countdown(5));

        let mut steps = Vec::new();
        let mut started = false;
        for _ in 0..400 {
            for event in race.update(TARGET_FRAME_MS) {
                match event {
                    RaceEvent::CountdownStep(n) => steps.push(n),
                    RaceEvent::Started => started = true,
                    _ => {}
                }
            }
            if started {
                break;
            }
        }
        assert_eq!(steps, vec![5, 4, 3, 2, 1]);
        assert!(started);
        assert_eq!(race.status(), RaceStatus::Running);
        assert_eq!(race.elapsed_ms(), 0.0);
    }

    #[test]
    fn test_runners_do_not_move_before_start() {
        let mut race = Race::new(config(&["A", "B"], "abc", 10.0)).unwrap();
        let before: Vec<Vec2> = race.runners().iter().map(|r| r.position).collect();
        race.start_countdown().unwrap();
        race.update(500.0);
        let after: Vec<Vec2> = race.runners().iter().map(|r| r.position).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_single_runner_completes_once() {
        let mut race = Race::new(config(&["Foo"], "abc", 10.0)).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        race.on_complete(move |report| {
            assert_eq!(report.finishers.len(), 1);
            seen.fetch_add(1, Ordering::SeqCst);
        });
        race.start_countdown().unwrap();

        let events = run(&mut race);
        assert!(race.is_complete());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let report = race.report().unwrap();
        assert_eq!(report.finishers.len(), 1);
        assert!(report.finishers[0].time_ms > 0.0);
        assert_eq!(events.iter().filter(|e| matches!(e, RaceEvent::Completed(_))).count(), 1);

        // No further mutation after completion
        let elapsed = race.elapsed_ms();
        assert!(race.update(TARGET_FRAME_MS).is_empty());
        assert_eq!(race.elapsed_ms(), elapsed);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_finish_requires_a_third_of_the_width_past_the_line() {
        let mut race = Race::new(config(&["Foo"], "abc", 10.0)).unwrap();
        race.start_countdown().unwrap();
        let mut finished_at = None;
        for _ in 0..200_000 {
            let x_before = race.runners()[0].position.x;
            for event in race.update(TARGET_FRAME_MS) {
                if let RaceEvent::Finished(_) = event {
                    finished_at = Some((x_before, race.runners()[0].position.x));
                }
            }
            if finished_at.is_some() {
                break;
            }
        }
        let (before, after) = finished_at.unwrap();
        let line = race.finish_line_x() - 100.0;
        assert!(before <= line);
        assert!(after > line);
    }

    #[test]
    fn test_all_finish_then_dwell_then_results() {
        let mut race = Race::new(config(&["A", "B", "C"], "dwell", 5.0)).unwrap();
        race.start_countdown().unwrap();
        let events = run(&mut race);

        let kinds: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                RaceEvent::AllFinished => Some("all"),
                RaceEvent::ResultsShown => Some("fin"),
                RaceEvent::Completed(_) => Some("done"),
                _ => None,
            })
            .collect();
        assert_eq!(kinds, vec!["all", "fin", "done"]);

        let finishers = &race.report().unwrap().finishers;
        assert_eq!(finishers.len(), 3);
        let positions: Vec<u32> = finishers.iter().map(|f| f.position).collect();
        assert_eq!(positions, vec![1, 2, 3]);
        assert!(finishers.windows(2).all(|w| w[0].time_ms <= w[1].time_ms));
        for runner in race.runners() {
            assert!(runner.is_finished());
            assert!(runner.finish_time_ms.is_some());
        }
    }

    #[test]
    fn test_camera_follows_leader_and_stops_at_results() {
        let mut race = Race::new(config(&["A", "B"], "cam", 10.0)).unwrap();
        race.start_countdown().unwrap();

        let mut checked = false;
        for _ in 0..200_000 {
            race.update(TARGET_FRAME_MS);
            if race.results_shown() {
                break;
            }
            let leader_x = race.get_leader().unwrap().position.x;
            let target = leader_x - 640.0;
            if target > 0.0 && target <= race.camera().full_width {
                assert_eq!(race.camera().position().x, target);
                checked = true;
            }
        }
        assert!(checked);

        let frozen = race.camera().position();
        race.update(TARGET_FRAME_MS);
        assert_eq!(race.camera().position(), frozen);
    }

    #[test]
    fn test_same_seed_same_result() {
        let outcome = |seed: &str| {
            let mut race = Race::new(config(&["A", "B", "C", "D"], seed, 8.0)).unwrap();
            race.start_countdown().unwrap();
            run(&mut race);
            race.report()
                .unwrap()
                .finishers
                .iter()
                .map(|f| (f.runner.number, f.time_ms.to_bits()))
                .collect::<Vec<_>>()
        };
        assert_eq!(outcome("replay"), outcome("replay"));
    }

    #[test]
    fn test_runners_stored_front_of_grid_first() {
        let race = Race::new(config(&["A", "B", "C"], "grid", 10.0)).unwrap();
        let names: Vec<&str> = race.runners().iter().map(|r| r.config.name.as_str()).collect();
        assert_eq!(names, vec!["C", "B", "A"]);
        let ids: Vec<u32> = race.runners().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 1, 0]);
        assert_eq!(race.runners()[0].position, Vec2::new(130.0, 400.0));
    }

    #[test]
    fn test_leader_ties_go_to_grid_front() {
        let mut race = Race::new(config(&["A", "B"], "tie", 10.0)).unwrap();
        for runner in race.runners.iter_mut() {
            runner.place(500.0, 400.0);
        }
        assert_eq!(race.get_leader().unwrap().config.name, "B");
    }

    /// Running race with every runner parked just short of the finish at a steady speed
    fn poised_at_line(names: &[&str], speed: f64) -> Race {
        let mut cfg = config(names, "line", 10.0);
        cfg.countdown_from = 0;
        let mut race = Race::new(cfg).unwrap();
        race.start_countdown().unwrap();
        assert_eq!(race.status(), RaceStatus::Running);

        let x = race.finish_line_x() - race.config().runner_visual_width / 3.0 - 1.0;
        for runner in race.runners.iter_mut() {
            runner.place(x, 400.0);
            runner.ease = SpeedEase::steady(speed);
        }
        race
    }

    #[test]
    fn test_same_tick_finishes_follow_grid_order() {
        let mut race = poised_at_line(&["First", "Last"], 10.0);
        let events = race.update(TARGET_FRAME_MS);

        let finished: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                RaceEvent::Finished(f) => Some(f.runner.name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(finished, vec!["Last", "First"]);

        let order: Vec<(&str, u32)> = race
            .results()
            .finishers()
            .iter()
            .map(|f| (f.runner.name.as_str(), f.position))
            .collect();
        assert_eq!(order, vec![("Last", 1), ("First", 2)]);
        assert_eq!(race.results().finishers()[0].time_ms, race.results().finishers()[1].time_ms);
        assert_eq!(race.status(), RaceStatus::Finishing);
    }

    #[test]
    fn test_positions_track_live_standings() {
        let mut race = Race::new(config(&["A", "B", "C"], "standings", 10.0)).unwrap();
        let xs = [(0, 900.0), (1, 1500.0), (2, 900.0)];
        for runner in race.runners.iter_mut() {
            let x = xs.iter().find(|(id, _)| *id == runner.id).map(|(_, x)| *x).unwrap();
            runner.place(x, 400.0);
        }

        let ids: Vec<u32> = race.positions().iter().map(|r| r.id).collect();
        // B leads; A and C tie and keep grid order (C is at the front)
        assert_eq!(ids, vec![1, 2, 0]);
        assert_eq!(race.get_snapshot().positions, vec![1, 2, 0]);
    }

    #[test]
    fn test_visual_width_moves_the_finish_trigger() {
        // Zero width: the runner's anchor itself must cross the line
        let mut race = poised_at_line(&["Foo"], 0.5);
        race.set_runner_visual_width(0.0);
        race.update(TARGET_FRAME_MS);
        assert!(!race.runners()[0].is_finished());

        let line = race.finish_line_x();
        race.runners[0].place(line - 0.25, 400.0);
        race.update(TARGET_FRAME_MS);
        assert!(race.runners()[0].is_finished());

        // Wider sprite: a third of 600 past the line triggers earlier
        let mut race = poised_at_line(&["Foo"], 0.5);
        race.set_runner_visual_width(600.0);
        let line = race.finish_line_x();
        race.runners[0].place(line - 200.25, 400.0);
        race.update(TARGET_FRAME_MS);
        assert!(race.runners()[0].is_finished());
    }

    #[test]
    fn test_setup_document() {
        let json = r##"{
            "name": "Spring Derby",
            "length": 12,
            "seed": "abc",
            "snails": [
                { "name": "Foo", "color": "#ff0000", "number": 1 },
                { "name": "Bar", "color": "#0000ff", "number": 2 }
            ]
        }"##;
        let config = RaceSetup::from_json(json).unwrap().into_config();
        assert_eq!(config.runners.len(), 2);
        assert_eq!(config.world_length(), 7200.0);
        assert_eq!(config.name.as_deref(), Some("Spring Derby"));
        assert!(config.sponsor.is_none());

        assert!(matches!(RaceSetup::from_json("{"), Err(RaceError::Config(_))));
    }
}
