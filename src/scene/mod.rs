mod model;

pub use model::{Model, ObjOpenError, Shape};

use crate::{
    geometry::{WorldPoint, WorldVector},
    util::Color,
};

/// Vertex record that can feed both pipelines.
pub trait ShadingVertex: Clone + Send + Sync + 'static {
    fn position(&self) -> WorldPoint;
    /// Vertex normal, zero vector if the vertex has none.
    fn normal(&self) -> WorldVector;
    fn ambient(&self) -> Color;
    fn diffuse(&self) -> Color;
    fn emissive(&self) -> Color;
}

#[derive(Clone, Debug, PartialEq)]
pub struct Vertex {
    pub position: WorldPoint,
    pub normal: WorldVector,
    pub ambient: Color,
    pub diffuse: Color,
    pub emissive: Color,
}

impl Default for Vertex {
    fn default() -> Self {
        Vertex {
            position: WorldPoint::origin(),
            normal: WorldVector::zeros(),
            ambient: Color::default(),
            diffuse: Color::default(),
            emissive: Color::default(),
        }
    }
}

impl ShadingVertex for Vertex {
    fn position(&self) -> WorldPoint {
        self.position
    }

    fn normal(&self) -> WorldVector {
        self.normal
    }

    fn ambient(&self) -> Color {
        self.ambient
    }

    fn diffuse(&self) -> Color {
        self.diffuse
    }

    fn emissive(&self) -> Color {
        self.emissive
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Light {
    pub position: WorldPoint,
    pub color: Color,
}
