//! Scene - World setup for the race
//!
//! Builds the parallax backdrop, the start and finish lines, and the runner
//! layers. Textures come from an asset collaborator; any randomised
//! placement draws from the race's own generator.

use std::collections::HashMap;
use serde::{Deserialize, Serialize};
use crate::game_server::camera::{Camera, Layer, LayerElement, LayerId, Vec2};
use crate::game_server::error::RaceError;
use crate::game_server::rng::SeededRandom;
use crate::game_server::runner::RunnerState;

/// World x of the start line marker
pub const START_LINE_X: f64 = 200.0;
/// Ground height the lines are drawn at
pub const LINE_Y: f64 = 510.0;
/// Finish line sits this fraction of a viewport past the race length
pub const FINISH_LINE_VIEWPORT_FRACTION: f64 = 0.75;

const GRID_FRONT_X: f64 = 130.0;
const GRID_STEP_X: f64 = 10.0;
const GRID_TOP_Y: f64 = 400.0;
const GRID_DEPTH_Y: f64 = 300.0;

/// What the renderer can tell us about textures
pub trait AssetCatalog {
    fn is_loaded(&self, texture: &str) -> bool;
    fn texture_size(&self, texture: &str) -> Option<Vec2>;
}

/// Fixed table of texture sizes; a texture counts as loaded once it has a size.
#[derive(Debug, Clone, Default)]
pub struct StaticAssets {
    sizes: HashMap<String, Vec2>,
}

impl StaticAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_texture(mut self, name: impl Into<String>, width: f64, height: f64) -> Self {
        self.sizes.insert(name.into(), Vec2::new(width, height));
        self
    }

    /// Sizes for every texture the default scene uses
    pub fn default_scene() -> Self {
        Self::new()
            .with_texture("cloudLayer", 1920.0, 300.0)
            .with_texture("backgroundMountains", 1920.0, 400.0)
            .with_texture("hills", 1920.0, 300.0)
            .with_texture("groundLayer", 1920.0, 250.0)
            .with_texture("cloud1", 300.0, 150.0)
            .with_texture("cloud2", 280.0, 140.0)
            .with_texture("cloud3", 260.0, 130.0)
            .with_texture("cloud4", 240.0, 120.0)
            .with_texture("signage", 1024.0, 160.0)
            .with_texture("ground", 1024.0, 300.0)
            .with_texture("line", 20.0, 300.0)
            .with_texture("snailShell", 200.0, 180.0)
            .with_texture("snailBody", 300.0, 220.0)
    }
}

impl AssetCatalog for StaticAssets {
    fn is_loaded(&self, texture: &str) -> bool {
        self.sizes.contains_key(texture)
    }

    fn texture_size(&self, texture: &str) -> Option<Vec2> {
        self.sizes.get(texture).copied()
    }
}

/// Where an element goes along one axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// Repeat the texture across the scrolled width (x only)
    Tiled,
    Fixed(f64),
    /// Uniform in [min, max)
    Range { min: f64, max: f64 },
}

impl Placement {
    fn resolve(&self, rng: &mut SeededRandom) -> f64 {
        match *self {
            Placement::Tiled => 0.0,
            Placement::Fixed(v) => v,
            Placement::Range { min, max } => rng.next_float_between(min, max),
        }
    }
}

/// One backdrop layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackdropSpec {
    pub texture: String,
    pub depth: f64,
    pub x: Placement,
    pub y: Placement,
    pub tint: Option<u32>,
}

impl BackdropSpec {
    fn new(texture: &str, depth: f64, x: Placement, y: Placement) -> Self {
        Self {
            texture: texture.to_string(),
            depth,
            x,
            y,
            tint: None,
        }
    }

    fn tinted(mut self, tint: u32) -> Self {
        self.tint = Some(tint);
        self
    }
}

/// The standard sky, mountains, hills, clouds and ground, plus both lines.
pub fn default_backdrop(world_width: f64, viewport_width: f64, finish_line_x: f64) -> Vec<BackdropSpec> {
    let cloud_span = |depth: f64| Placement::Range {
        min: 0.0,
        max: (world_width + viewport_width) * depth,
    };
    let cloud_y = Placement::Range { min: -25.0, max: 200.0 };

    vec![
        BackdropSpec::new("cloudLayer", 0.05, Placement::Tiled, Placement::Fixed(10.0)),
        BackdropSpec::new("backgroundMountains", 0.1, Placement::Tiled, Placement::Fixed(20.0)).tinted(0xddebe2),
        BackdropSpec::new("hills", 0.2, Placement::Tiled, Placement::Fixed(175.0)).tinted(0xafd6be),
        BackdropSpec::new("groundLayer", 0.5, Placement::Tiled, Placement::Fixed(275.0)).tinted(0x7dba68),
        BackdropSpec::new("cloud1", 0.11, cloud_span(0.11), cloud_y),
        BackdropSpec::new("cloud2", 0.22, cloud_span(0.22), cloud_y),
        BackdropSpec::new("cloud3", 0.33, cloud_span(0.33), cloud_y),
        BackdropSpec::new("cloud4", 0.44, cloud_span(0.44), cloud_y),
        BackdropSpec::new("signage", 1.0, Placement::Tiled, Placement::Fixed(350.0)),
        BackdropSpec::new("ground", 1.0, Placement::Tiled, Placement::Fixed(LINE_Y)),
        BackdropSpec::new("line", 1.0, Placement::Fixed(START_LINE_X), Placement::Fixed(LINE_Y)),
        BackdropSpec::new("line", 1.0, Placement::Fixed(finish_line_x), Placement::Fixed(LINE_Y)),
    ]
}

/// Number of copies a tiled texture needs to cover the viewport plus its
/// parallax-scaled share of the world.
pub fn tile_count(texture_width: f64, viewport_width: f64, world_width: f64, depth: f64) -> usize {
    if texture_width <= 0.0 {
        return 1;
    }
    (viewport_width / texture_width + (world_width / texture_width) * depth)
        .ceil()
        .max(1.0) as usize
}

/// Add every backdrop layer to the camera, in list order.
pub fn build_backdrop(
    camera: &mut Camera,
    specs: &[BackdropSpec],
    assets: &dyn AssetCatalog,
    rng: &mut SeededRandom,
    viewport_width: f64,
) -> Result<Vec<LayerId>, RaceError> {
    let mut ids = Vec::with_capacity(specs.len());

    for spec in specs {
        if !assets.is_loaded(&spec.texture) {
            return Err(RaceError::AssetNotLoaded(spec.texture.clone()));
        }
        let size = assets
            .texture_size(&spec.texture)
            .ok_or_else(|| RaceError::AssetNotLoaded(spec.texture.clone()))?;

        let count = match spec.x {
            Placement::Tiled => tile_count(size.x, viewport_width, camera.full_width, spec.depth),
            _ => 1,
        };

        let mut elements = Vec::with_capacity(count);
        for i in 0..count {
            let x = match spec.x {
                Placement::Tiled => size.x * i as f64,
                other => other.resolve(rng),
            };
            let y = spec.y.resolve(rng);
            elements.push(LayerElement {
                texture: spec.texture.clone(),
                offset: Vec2::new(x, y),
                tint: spec.tint,
            });
        }

        ids.push(camera.add_layer(Layer::new(spec.depth, Vec2::default()).with_elements(elements))?);
    }

    Ok(ids)
}

/// Grid slot for stagger index `k` of `n` (0 = front of the grid)
pub fn grid_slot(k: usize, n: usize) -> Vec2 {
    let n = n.max(1) as f64;
    Vec2::new(
        GRID_FRONT_X - k as f64 * GRID_STEP_X,
        GRID_TOP_Y + k as f64 * (GRID_DEPTH_Y / n),
    )
}

/// Put runners on the grid and give each a foreground layer.
///
/// `runners` is in grid order: index 0 takes the front slot.
pub fn place_runners(
    camera: &mut Camera,
    runners: &mut [RunnerState],
    assets: &dyn AssetCatalog,
) -> Result<Vec<LayerId>, RaceError> {
    for texture in ["snailShell", "snailBody"] {
        if !assets.is_loaded(texture) {
            return Err(RaceError::AssetNotLoaded(texture.to_string()));
        }
    }

    let n = runners.len();
    let mut ids = Vec::with_capacity(n);
    for (i, runner) in runners.iter_mut().enumerate() {
        let slot = grid_slot(i, n);
        runner.place(slot.x, slot.y);

        let shell = LayerElement {
            texture: "snailShell".to_string(),
            offset: Vec2::new(0.0, 30.0),
            tint: parse_color(&runner.config.color),
        };
        let body = LayerElement::new("snailBody", Vec2::default());
        ids.push(camera.add_layer(Layer::new(1.0, runner.position).with_elements(vec![shell, body]))?);
    }

    Ok(ids)
}

/// `#rrggbb` to a tint value
pub fn parse_color(color: &str) -> Option<u32> {
    let hex = color.strip_prefix('#').unwrap_or(color);
    if hex.len() != 6 {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}
