//! Runner - Individual runner state and behavior
//!
//! Each runner has a world position, an eased speed and a stamina ceiling.
//! The race advances all runners each tick and redraws their speeds on a
//! fixed cadence.

use serde::{Deserialize, Serialize};
use crate::game_server::camera::Vec2;
use crate::game_server::rng::SeededRandom;

/// Runner identity supplied by the setup screen. Never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConfig {
    pub name: String,
    pub color: String,
    pub number: u32,
}

impl RunnerConfig {
    pub fn new(name: impl Into<String>, color: impl Into<String>, number: u32) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
            number,
        }
    }
}

/// Bounds for runner speed, in world units per frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedLimits {
    pub min_speed: f64,
    pub max_speed: f64,
}

impl Default for SpeedLimits {
    fn default() -> Self {
        Self {
            min_speed: 6.0,
            max_speed: 20.0,
        }
    }
}

impl SpeedLimits {
    pub fn midpoint(&self) -> f64 {
        (self.min_speed + self.max_speed) / 2.0
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min_speed, self.max_speed)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min_speed && value <= self.max_speed
    }

    /// Whole-number speed drawn from `[ceil(min_speed), ceiling)`, kept inside the limits.
    pub fn draw(&self, rng: &mut SeededRandom, ceiling: f64) -> f64 {
        self.clamp(rng.next_int(self.min_speed.ceil(), ceiling) as f64)
    }
}

/// Sine ease-in from one speed to another, evaluated on demand.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedEase {
    pub from: f64,
    pub to: f64,
    pub started_at_ms: f64,
    pub duration_ms: f64,
}

impl SpeedEase {
    /// A settled ease that always reports `speed`
    pub fn steady(speed: f64) -> Self {
        Self {
            from: speed,
            to: speed,
            started_at_ms: 0.0,
            duration_ms: 0.0,
        }
    }

    /// Eased speed at race time `now_ms`
    pub fn value_at(&self, now_ms: f64) -> f64 {
        if self.duration_ms <= 0.0 {
            return self.to;
        }
        let t = (now_ms - self.started_at_ms) / self.duration_ms;
        if t >= 1.0 {
            return self.to;
        }
        let (lo, hi) = if self.from <= self.to {
            (self.from, self.to)
        } else {
            (self.to, self.from)
        };
        // clamp keeps rounding from stepping outside the endpoints
        (self.from + (self.to - self.from) * ease_in_sine(t.max(0.0))).clamp(lo, hi)
    }

    pub fn is_settled(&self, now_ms: f64) -> bool {
        now_ms - self.started_at_ms >= self.duration_ms
    }
}

fn ease_in_sine(t: f64) -> f64 {
    1.0 - (t * std::f64::consts::FRAC_PI_2).cos()
}

/// Runner state flags
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RunnerFlags {
    pub finished: bool,
}

/// Complete state for a single runner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerState {
    /// Position in the configured runner list
    pub id: u32,
    /// Identity from setup
    pub config: RunnerConfig,
    /// World position (anchor, before camera transform)
    pub position: Vec2,
    /// Speed as of the last advance or speed change
    pub current_speed: f64,
    /// Stamina ceiling for the next speed draw
    pub current_max_speed: f64,
    /// Active speed ease
    pub ease: SpeedEase,
    /// Status flags
    pub flags: RunnerFlags,
    /// Race time at which the finish was detected
    pub finish_time_ms: Option<f64>,
}

impl RunnerState {
    /// Create a runner already moving at `speed`.
    pub fn new(id: u32, config: RunnerConfig, speed: f64, current_max_speed: f64) -> Self {
        Self {
            id,
            config,
            position: Vec2::default(),
            current_speed: speed,
            current_max_speed,
            ease: SpeedEase::steady(speed),
            flags: RunnerFlags::default(),
            finish_time_ms: None,
        }
    }

    /// Move the runner to its grid slot
    pub fn place(&mut self, x: f64, y: f64) {
        self.position = Vec2::new(x, y);
    }

    pub fn is_finished(&self) -> bool {
        self.flags.finished
    }
}

/// Runner simulation logic
pub struct Runner;

impl Runner {
    /// Ceiling drop per unit of speed above the midpoint
    const STAMINA_DRAIN: f64 = 3.0;
    /// Ceiling recovery per slow draw
    const STAMINA_RECOVERY: f64 = 1.0;

    /// Spawn a runner with a random starting speed.
    ///
    /// Runners starting above the midpoint begin with a lowered ceiling.
    pub fn spawn(
        id: u32,
        config: RunnerConfig,
        limits: &SpeedLimits,
        rng: &mut SeededRandom,
    ) -> RunnerState {
        let speed = limits.draw(rng, limits.max_speed);
        let mid = limits.midpoint();
        let overshoot = if speed >= mid { speed - mid } else { 0.0 };
        let current_max_speed = limits.clamp(limits.max_speed - overshoot);

        RunnerState::new(id, config, speed, current_max_speed)
    }

    /// Move a runner forward by one frame.
    ///
    /// `delta_time` is the frame-relative multiplier (1.0 at the target frame
    /// rate); `now_ms` is race time after this tick. Finished runners stay put.
    pub fn advance(state: &mut RunnerState, delta_time: f64, now_ms: f64) {
        if state.flags.finished {
            return;
        }
        debug_assert!(
            delta_time.is_finite() && delta_time >= 0.0,
            "negative or non-finite delta {delta_time}"
        );
        if !(delta_time.is_finite() && delta_time >= 0.0) {
            return;
        }

        state.current_speed = state.ease.value_at(now_ms);
        state.position.x += state.current_speed * delta_time;
    }

    /// Draw a new target speed and start easing toward it.
    ///
    /// A target at or above the midpoint drains the ceiling by three times how
    /// far the *current* speed sits above the midpoint; a slow target recovers
    /// the ceiling by one.
    pub fn change_speed(
        state: &mut RunnerState,
        limits: &SpeedLimits,
        rng: &mut SeededRandom,
        now_ms: f64,
        ease_ms: f64,
    ) {
        let current = state.ease.value_at(now_ms);
        let new_speed = limits.draw(rng, state.current_max_speed);
        let mid = limits.midpoint();

        if new_speed >= mid {
            state.current_max_speed -= Self::STAMINA_DRAIN * (current - mid);
        } else {
            state.current_max_speed += Self::STAMINA_RECOVERY;
        }
        state.current_max_speed = limits.clamp(state.current_max_speed);

        log::debug!(
            "runner {} speed {:.2} -> {} (ceiling {:.2})",
            state.config.number,
            current,
            new_speed,
            state.current_max_speed
        );

        state.current_speed = current;
        state.ease = SpeedEase {
            from: current,
            to: new_speed,
            started_at_ms: now_ms,
            duration_ms: ease_ms,
        };
    }

    /// Flag the runner as finished. Returns false if it already was.
    pub fn mark_finished(state: &mut RunnerState, time_ms: f64) -> bool {
        debug_assert!(!state.flags.finished, "runner {} finished twice", state.id);
        if state.flags.finished {
            return false;
        }
        state.flags.finished = true;
        state.finish_time_ms = Some(time_ms);
        true
    }
}

/// Compact runner state for the renderer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerSnapshot {
    pub id: u32,
    pub number: u32,
    pub world: Vec2,
    pub screen: Vec2,
    pub speed: f64,
    pub finished: bool,
}

impl RunnerSnapshot {
    pub fn new(state: &RunnerState, screen: Vec2) -> Self {
        Self {
            id: state.id,
            number: state.config.number,
            world: state.position,
            screen,
            speed: state.current_speed,
            finished: state.flags.finished,
        }
    }
}
