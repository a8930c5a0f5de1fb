//! Camera - Parallax depth transform over a bounded world
//!
//! Every layer keeps a world anchor. Its rendered position is
//! `anchor - camera * depth`, so depth 0 never scrolls and depth 1 scrolls
//! one-to-one with the camera. Layers render back to front by depth.

use serde::{Deserialize, Serialize};
use crate::game_server::error::RaceError;

/// Plain 2D point in world or screen units
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl std::ops::Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

/// Handle to a layer registered with a camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerId(pub usize);

/// A visual element drawn relative to its layer's anchor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerElement {
    /// Asset the renderer should draw
    pub texture: String,
    pub offset: Vec2,
    pub tint: Option<u32>,
}

impl LayerElement {
    pub fn new(texture: impl Into<String>, offset: Vec2) -> Self {
        Self {
            texture: texture.into(),
            offset,
            tint: None,
        }
    }
}

/// Depth-indexed group of elements
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    /// Parallax factor, 0 = fixed backdrop, 1 = foreground
    pub depth: f64,
    /// World position before the camera transform
    pub anchor: Vec2,
    pub elements: Vec<LayerElement>,
    /// Screen position after the last camera update
    rendered: Vec2,
}

impl Layer {
    pub fn new(depth: f64, anchor: Vec2) -> Self {
        Self {
            depth,
            anchor,
            elements: Vec::new(),
            rendered: anchor,
        }
    }

    pub fn with_elements(mut self, elements: Vec<LayerElement>) -> Self {
        self.elements = elements;
        self
    }

    pub fn rendered_position(&self) -> Vec2 {
        self.rendered
    }

    /// Screen positions of every element in this layer
    pub fn element_positions(&self) -> impl Iterator<Item = (&LayerElement, Vec2)> + '_ {
        self.elements.iter().map(move |e| (e, self.rendered + e.offset))
    }

    fn apply(&mut self, camera: Vec2) {
        self.rendered = depth_transform(self.anchor, camera, self.depth);
    }
}

/// `anchor - camera * depth`
pub fn depth_transform(anchor: Vec2, camera: Vec2, depth: f64) -> Vec2 {
    Vec2::new(anchor.x - camera.x * depth, anchor.y - camera.y * depth)
}

/// Camera over a world of `full_width` x `full_height`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Camera {
    pub full_width: f64,
    pub full_height: f64,
    position: Vec2,
    layers: Vec<Layer>,
    /// Layer indices sorted by ascending depth, stable on ties
    render_order: Vec<usize>,
}

impl Camera {
    /// Create a camera at the origin
    pub fn new(full_width: f64, full_height: f64) -> Self {
        Self {
            full_width,
            full_height,
            position: Vec2::default(),
            layers: Vec::new(),
            render_order: Vec::new(),
        }
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Register a layer and position it for the current camera.
    pub fn add_layer(&mut self, mut layer: Layer) -> Result<LayerId, RaceError> {
        if !layer.depth.is_finite() || layer.depth < 0.0 {
            return Err(RaceError::InvalidDepth(layer.depth));
        }

        layer.apply(self.position);
        let index = self.layers.len();
        let slot = self
            .render_order
            .partition_point(|&i| self.layers[i].depth <= layer.depth);
        self.layers.push(layer);
        self.render_order.insert(slot, index);

        Ok(LayerId(index))
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.get(id.0)
    }

    /// Move a layer's anchor by a world offset and re-render it
    pub fn shift_anchor(&mut self, id: LayerId, dx: f64, dy: f64) -> Result<(), RaceError> {
        let camera = self.position;
        let layer = self
            .layers
            .get_mut(id.0)
            .ok_or(RaceError::UnknownLayer(id.0))?;
        layer.anchor = Vec2::new(layer.anchor.x + dx, layer.anchor.y + dy);
        layer.apply(camera);
        Ok(())
    }

    /// Replace a layer's anchor and re-render it
    pub fn set_anchor(&mut self, id: LayerId, anchor: Vec2) -> Result<(), RaceError> {
        let camera = self.position;
        let layer = self
            .layers
            .get_mut(id.0)
            .ok_or(RaceError::UnknownLayer(id.0))?;
        layer.anchor = anchor;
        layer.apply(camera);
        Ok(())
    }

    /// Layers back to front
    pub fn layers_in_render_order(&self) -> impl Iterator<Item = (LayerId, &Layer)> + '_ {
        self.render_order.iter().map(move |&i| (LayerId(i), &self.layers[i]))
    }

    /// Move to an absolute position. Each axis is accepted only inside
    /// `(0, full]`; a rejected axis keeps its previous value.
    pub fn move_to(&mut self, x: f64, y: f64) {
        if self.accepts_x(x) {
            self.position.x = x;
        }
        if self.accepts_y(y) {
            self.position.y = y;
        }
        self.update_layers();
    }

    /// Move by a delta, with the same per-axis bounds as [`Camera::move_to`].
    pub fn move_by(&mut self, dx: f64, dy: f64) {
        let target = Vec2::new(self.position.x + dx, self.position.y + dy);
        self.move_to(target.x, target.y);
    }

    fn accepts_x(&self, x: f64) -> bool {
        x > 0.0 && x <= self.full_width
    }

    fn accepts_y(&self, y: f64) -> bool {
        y > 0.0 && y <= self.full_height
    }

    fn update_layers(&mut self) {
        let camera = self.position;
        for layer in &mut self.layers {
            layer.apply(camera);
        }
    }
}
