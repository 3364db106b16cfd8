use serde::Deserialize;

use super::Payload;
use crate::{
    geometry::{
        BarycentricCoordinates, EPSILON, Ray, Triangle, WorldPoint, WorldVector,
        intersect_triangle,
    },
    scene::ShadingVertex,
    util::Color,
};

/// Where the triangle's material colors come from.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorShading {
    /// Whole triangle uses the colors of its first vertex.
    #[default]
    FirstVertex,
    /// Vertex colors are blended using the barycentric coordinates of the hit.
    Interpolated,
}

/// Triangle geometry and shading attributes, prepared for repeated ray tests.
#[derive(Clone, Debug)]
pub struct ShadedTriangle {
    pub positions: Triangle<WorldPoint>,
    /// Edge b - a
    pub ba: WorldVector,
    /// Edge c - a
    pub ca: WorldVector,
    pub normals: Triangle<WorldVector>,
    pub ambient: Triangle<Color>,
    pub diffuse: Triangle<Color>,
    pub emissive: Triangle<Color>,

    color_shading: ColorShading,
    /// Some vertex has no normal, the face normal is used instead of interpolation.
    flat_normal: bool,
}

impl ShadedTriangle {
    pub fn new<V: ShadingVertex>(a: &V, b: &V, c: &V, color_shading: ColorShading) -> Self {
        let vertices = Triangle::new(a, b, c);
        let positions = vertices.map(|v| v.position());
        let [ba, ca] = positions.edges();
        let normals = vertices.map(|v| v.normal());
        let flat_normal = normals.iter().any(|n| n.norm_squared() == 0.0);

        ShadedTriangle {
            positions,
            ba,
            ca,
            normals,
            ambient: vertices.map(|v| v.ambient()),
            diffuse: vertices.map(|v| v.diffuse()),
            emissive: vertices.map(|v| v.emissive()),
            color_shading,
            flat_normal,
        }
    }

    pub fn a(&self) -> &WorldPoint {
        &self.positions[0]
    }

    /// Intersection test of this triangle against a ray.
    /// Returns payload with `Payload::NO_HIT_T` distance if the ray misses the triangle.
    pub fn intersect(&self, ray: &Ray) -> Payload {
        Payload::from(intersect_triangle(self.a(), &self.ba, &self.ca, ray))
    }

    /// Unit normal of the triangle's plane, following the vertex winding.
    pub fn geometric_normal(&self) -> WorldVector {
        self.ba.cross(&self.ca).normalize()
    }

    /// Unit shading normal at the given point of the triangle.
    pub fn normal_at(&self, bary: &BarycentricCoordinates) -> WorldVector {
        if self.flat_normal {
            return self.geometric_normal();
        }
        let normal = bary.interpolate_triangle(&self.normals);
        if normal.norm_squared() < EPSILON {
            self.geometric_normal()
        } else {
            normal.normalize()
        }
    }

    pub fn ambient_at(&self, bary: &BarycentricCoordinates) -> Color {
        self.color_at(&self.ambient, bary)
    }

    pub fn diffuse_at(&self, bary: &BarycentricCoordinates) -> Color {
        self.color_at(&self.diffuse, bary)
    }

    pub fn emissive_at(&self, bary: &BarycentricCoordinates) -> Color {
        self.color_at(&self.emissive, bary)
    }

    fn color_at(&self, colors: &Triangle<Color>, bary: &BarycentricCoordinates) -> Color {
        match self.color_shading {
            ColorShading::FirstVertex => colors[0],
            ColorShading::Interpolated => bary.interpolate_triangle(colors),
        }
    }

    pub fn centroid(&self) -> WorldPoint {
        self.positions.centroid()
    }
}

#[cfg(test)]
pub mod test {
    use super::*;
    use crate::scene::Vertex;
    use assert2::assert;
    use test_case::test_case;

    pub fn vertex(x: f32, y: f32, z: f32) -> Vertex {
        Vertex {
            position: WorldPoint::new(x, y, z),
            ..Vertex::default()
        }
    }

    /// Triangle with given vertex positions and no normals or colors.
    pub fn make_triangle(a: [f32; 3], b: [f32; 3], c: [f32; 3]) -> ShadedTriangle {
        ShadedTriangle::new(
            &vertex(a[0], a[1], a[2]),
            &vertex(b[0], b[1], b[2]),
            &vertex(c[0], c[1], c[2]),
            ColorShading::FirstVertex,
        )
    }

    fn colored_triangle(color_shading: ColorShading) -> ShadedTriangle {
        let colored = |x: f32, y: f32, color: Color| Vertex {
            normal: WorldVector::new(0.0, 0.0, 1.0),
            ambient: color,
            diffuse: color * 2.0,
            emissive: color * 0.5,
            ..vertex(x, y, 0.0)
        };
        ShadedTriangle::new(
            &colored(0.0, 0.0, Color::new(1.0, 0.0, 0.0)),
            &colored(1.0, 0.0, Color::new(0.0, 1.0, 0.0)),
            &colored(0.0, 1.0, Color::new(0.0, 0.0, 1.0)),
            color_shading,
        )
    }

    #[test]
    fn edges_are_precomputed() {
        let t = make_triangle([1.0, 1.0, 1.0], [2.0, 1.0, 1.0], [1.0, 3.0, 1.0]);
        assert!(t.ba == WorldVector::new(1.0, 0.0, 0.0));
        assert!(t.ca == WorldVector::new(0.0, 2.0, 0.0));
    }

    #[test]
    fn unit_triangle_example() {
        let t = make_triangle([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        let ray = Ray::new(
            WorldPoint::new(0.25, 0.25, -1.0),
            WorldVector::new(0.0, 0.0, 1.0),
        );
        let payload = t.intersect(&ray);

        assert!((payload.t - 1.0).abs() < 1e-6);
        let [w, u, v] = payload.bary.weights();
        assert!((w - 0.5).abs() < 1e-6);
        assert!((u - 0.25).abs() < 1e-6);
        assert!((v - 0.25).abs() < 1e-6);
    }

    #[test]
    fn unit_triangle_parallel_example() {
        let t = make_triangle([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        let ray = Ray::new(
            WorldPoint::new(0.0, 0.0, -1.0),
            WorldVector::new(1.0, 0.0, 0.0),
        );
        let payload = t.intersect(&ray);
        assert!(payload.t == Payload::NO_HIT_T);
        assert!(!payload.is_hit());
    }

    #[test]
    fn degenerate_triangle_is_accepted_and_never_hit() {
        let t = make_triangle([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]);
        let ray = Ray::new(
            WorldPoint::new(0.5, 0.0, -1.0),
            WorldVector::new(0.0, 0.0, 1.0),
        );
        assert!(!t.intersect(&ray).is_hit());
    }

    #[test]
    fn missing_normals_fall_back_to_face_normal() {
        let t = make_triangle([0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]);
        let normal = t.normal_at(&BarycentricCoordinates::new(0.2, 0.2));
        assert!(normal == WorldVector::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn normals_are_interpolated() {
        let mut a = vertex(0.0, 0.0, 0.0);
        let mut b = vertex(1.0, 0.0, 0.0);
        let mut c = vertex(0.0, 1.0, 0.0);
        a.normal = WorldVector::new(1.0, 0.0, 0.0);
        b.normal = WorldVector::new(0.0, 1.0, 0.0);
        c.normal = WorldVector::new(0.0, 1.0, 0.0);
        let t = ShadedTriangle::new(&a, &b, &c, ColorShading::FirstVertex);

        let normal = t.normal_at(&BarycentricCoordinates::new(0.25, 0.25));
        let expected = WorldVector::new(1.0, 1.0, 0.0).normalize();
        assert!((normal - expected).norm() < 1e-6);
    }

    #[test_case(ColorShading::FirstVertex, Color::new(1.0, 0.0, 0.0) ; "first_vertex")]
    #[test_case(ColorShading::Interpolated, Color::new(0.5, 0.25, 0.25) ; "interpolated")]
    fn color_shading(color_shading: ColorShading, expected: Color) {
        let t = colored_triangle(color_shading);
        let bary = BarycentricCoordinates::new(0.25, 0.25);

        assert!(t.ambient_at(&bary) == expected);
        assert!(t.diffuse_at(&bary) == expected * 2.0);
        assert!(t.emissive_at(&bary) == expected * 0.5);
    }
}
