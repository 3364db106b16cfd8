use crate::{
    geometry::{BarycentricCoordinates, FloatType, TriangleHit},
    util::Color,
};

/// Result of one intersection test or one traced ray.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Payload {
    /// Distance along the ray.
    /// Negative (`NO_HIT_T`) for intersection tests that missed, has to be compared against the
    /// trace's distance bounds to decide whether the hit is valid.
    pub t: FloatType,
    pub bary: BarycentricCoordinates,
    pub color: Color,
}

impl Payload {
    pub const NO_HIT_T: FloatType = TriangleHit::NO_HIT_T;

    /// Payload of a ray that hit nothing, with the given color.
    pub fn miss(color: Color) -> Self {
        Payload {
            t: Self::NO_HIT_T,
            bary: BarycentricCoordinates::default(),
            color,
        }
    }

    pub fn is_hit(&self) -> bool {
        self.t >= 0.0
    }

    pub fn with_color(self, color: Color) -> Self {
        Payload { color, ..self }
    }
}

impl Default for Payload {
    fn default() -> Self {
        Payload::miss(Color::default())
    }
}

impl From<TriangleHit> for Payload {
    fn from(hit: TriangleHit) -> Self {
        Payload {
            t: hit.t,
            bary: hit.uv,
            color: Color::default(),
        }
    }
}
