use std::ops::{Add, Index, IndexMut, Mul};

use nalgebra::{
    ClosedAddAssign, ClosedDivAssign, ClosedMulAssign, ClosedSubAssign, Point3, Scalar, Vector3,
};
use num_traits::Zero;

use super::FloatType;

#[derive(Clone, Debug, PartialEq)]
pub struct Triangle<Point>([Point; 3]);

impl<Point> Triangle<Point> {
    pub fn new(a: Point, b: Point, c: Point) -> Triangle<Point> {
        Triangle([a, b, c])
    }

    pub fn iter<'a>(&'a self) -> impl Iterator<Item = &'a Point> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        3
    }
}

impl<Point: Default> Default for Triangle<Point> {
    fn default() -> Self {
        Triangle([Default::default(), Default::default(), Default::default()])
    }
}

impl<Point> Index<usize> for Triangle<Point> {
    type Output = Point;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl<Point> IndexMut<usize> for Triangle<Point> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0[index]
    }
}

impl<Point> Triangle<Point> {
    pub fn map<Point2, F: FnMut(&Point) -> Point2>(&self, mut f: F) -> Triangle<Point2> {
        Triangle([f(&self[0]), f(&self[1]), f(&self[2])])
    }
}

impl<T: Scalar + ClosedAddAssign + ClosedDivAssign + Zero + From<u16>> Triangle<Point3<T>> {
    pub fn centroid(&self) -> Point3<T> {
        Point3::from(
            self.0.iter().map(|p| &p.coords).sum::<Vector3<T>>() / T::from(self.0.len() as u16),
        )
    }
}

impl<T: Scalar + ClosedSubAssign> Triangle<Point3<T>> {
    /// Returns edge vectors, coming from self[0]
    pub fn edges(&self) -> [Vector3<T>; 2] {
        [&self.0[1] - &self.0[0], &self.0[2] - &self.0[0]]
    }
}

impl<T: Scalar + Zero + ClosedAddAssign + ClosedSubAssign + ClosedMulAssign> Triangle<Point3<T>> {
    /// Returns a normal vector of the triangle, not normalized.
    pub fn normal(&self) -> Vector3<T> {
        let [e1, e2] = self.edges();
        e1.cross(&e2)
    }
}

/// Barycentric coordinates of a point inside a triangle.
/// Weight of the first vertex is implicit (`1 - u - v`).
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct BarycentricCoordinates {
    pub u: FloatType,
    pub v: FloatType,
}

impl BarycentricCoordinates {
    pub fn new(u: FloatType, v: FloatType) -> Self {
        BarycentricCoordinates { u, v }
    }

    /// Weight of the first vertex.
    pub fn w(&self) -> FloatType {
        1.0 - self.u - self.v
    }

    /// All three weights, in vertex order.
    pub fn weights(&self) -> [FloatType; 3] {
        [self.w(), self.u, self.v]
    }

    pub fn interpolate<T2>(&self, a: &T2, b: &T2, c: &T2) -> T2
    where
        T2: Copy + Add<Output = T2> + Mul<FloatType, Output = T2>,
    {
        *a * self.w() + *b * self.u + *c * self.v
    }

    pub fn interpolate_triangle<T2>(&self, triangle: &Triangle<T2>) -> T2
    where
        T2: Copy + Add<Output = T2> + Mul<FloatType, Output = T2>,
    {
        self.interpolate(&triangle[0], &triangle[1], &triangle[2])
    }
}
