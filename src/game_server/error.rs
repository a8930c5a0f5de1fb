//! Error - Race setup and lifecycle errors
//!
//! Only configuration and lifecycle misuse are errors. Camera moves outside
//! the world are clamped silently and never surface here.

use thiserror::Error;

/// Errors raised before or around a race, never during a tick.
#[derive(Debug, Error)]
pub enum RaceError {
    /// The runner list is empty
    #[error("a race needs at least one runner")]
    NoRunners,

    /// Race length must be a positive, finite number of seconds
    #[error("race length must be positive, got {0}")]
    InvalidRaceLength(f64),

    /// Supplied seed string was empty
    #[error("seed must not be empty")]
    InvalidSeed,

    /// Viewport dimensions must be positive
    #[error("invalid viewport {width}x{height}")]
    InvalidViewport { width: f64, height: f64 },

    /// Speed limits must satisfy 0 < min < max
    #[error("invalid speed limits: min {min}, max {max}")]
    InvalidSpeedLimits { min: f64, max: f64 },

    /// Layer depth factor must be finite and non-negative
    #[error("invalid depth factor {0}")]
    InvalidDepth(f64),

    /// Layer id does not belong to this camera
    #[error("unknown layer {0}")]
    UnknownLayer(usize),

    /// Texture was used before the asset collaborator loaded it
    #[error("texture '{0}' has not been loaded")]
    AssetNotLoaded(String),

    /// Setup document could not be read
    #[error("config error: {0}")]
    Config(String),

    /// Frame budget ran out before the race completed
    #[error("race did not complete within {0} frames")]
    Stalled(u64),

    /// Lifecycle call made in the wrong state
    #[error("expected state {expected}, found {actual}")]
    InvalidState {
        expected: &'static str,
        actual: String,
    },
}

impl RaceError {
    /// Creates a config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a lifecycle error.
    pub fn invalid_state(expected: &'static str, actual: impl std::fmt::Debug) -> Self {
        Self::InvalidState {
            expected,
            actual: format!("{:?}", actual),
        }
    }
}

impl From<serde_json::Error> for RaceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}
