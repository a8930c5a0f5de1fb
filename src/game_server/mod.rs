//! Game Server Module
//!
//! Seeded snail race simulation: runners, parallax camera, race state machine.
//! Rendering, asset loading and result screens live with the host.

pub mod camera;
pub mod error;
pub mod race;
pub mod results;
pub mod rng;
pub mod runner;
pub mod scene;
pub mod simulation;

pub use camera::{Camera, Layer, LayerElement, LayerId, Vec2};
pub use error::RaceError;
pub use race::{Race, RaceConfig, RaceEvent, RaceSetup, RaceSnapshot, RaceStatus, Viewport};
pub use results::{Finisher, RaceReport, ResultCollector};
pub use rng::SeededRandom;
pub use runner::{Runner, RunnerConfig, RunnerState, SpeedLimits};
pub use simulation::{GameServer, GameState};
