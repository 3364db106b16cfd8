use super::{BarycentricCoordinates, FloatType, Ray, WorldPoint, WorldVector};

/// Determinants with smaller magnitude are treated as a ray parallel to the triangle's plane.
pub const PARALLEL_EPSILON: FloatType = 1e-8;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TriangleHit {
    /// Distance along the ray, `TriangleHit::NO_HIT_T` if the ray misses.
    pub t: FloatType,
    pub uv: BarycentricCoordinates,
}

impl TriangleHit {
    pub const NO_HIT_T: FloatType = -1.0;

    pub const NO_HIT: TriangleHit = TriangleHit {
        t: Self::NO_HIT_T,
        uv: BarycentricCoordinates { u: 0.0, v: 0.0 },
    };
}

/// Calculates ray intersection with a (two sided) triangle given by its first vertex and two
/// edge vectors coming from it.
/// Intersections behind the ray origin are reported with negative distance.
/// Adapted from https://en.wikipedia.org/wiki/M%C3%B6ller%E2%80%93Trumbore_intersection_algorithm#Rust_implementation
pub fn intersect_triangle(
    a: &WorldPoint,
    ba: &WorldVector,
    ca: &WorldVector,
    ray: &Ray,
) -> TriangleHit {
    let pvec = ray.direction.cross(ca);
    let det = ba.dot(&pvec);
    if det.abs() < PARALLEL_EPSILON {
        return TriangleHit::NO_HIT;
    }

    let inv_det = 1.0 / det;
    let tvec = ray.origin - a;
    let u = tvec.dot(&pvec) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return TriangleHit::NO_HIT;
    }

    let qvec = tvec.cross(ba);
    let v = ray.direction.dot(&qvec) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return TriangleHit::NO_HIT;
    }

    TriangleHit {
        t: ca.dot(&qvec) * inv_det,
        uv: BarycentricCoordinates { u, v },
    }
}
