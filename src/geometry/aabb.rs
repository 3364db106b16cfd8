use std::ops::Sub;

use nalgebra::{ClosedAddAssign, ClosedDivAssign, Point3, Scalar};
use num_traits::One;

use super::{FloatType, WorldPoint};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AABB<Point> {
    pub min: Point,
    pub max: Point,
}

impl<Point> AABB<Point> {
    pub fn new(min: Point, max: Point) -> AABB<Point> {
        AABB { min, max }
    }

    pub fn map<Point2, F: FnMut(&Point) -> Point2>(&self, mut f: F) -> AABB<Point2> {
        AABB {
            min: f(&self.min),
            max: f(&self.max),
        }
    }
}

impl<Point: Sub + Copy> AABB<Point> {
    pub fn size(&self) -> Point::Output {
        self.max - self.min
    }
}

impl<T: Scalar + ClosedAddAssign + ClosedDivAssign + One> AABB<Point3<T>> {
    pub fn center(&self) -> Point3<T> {
        let two = T::one() + T::one();
        let avg_coords = (&self.min.coords + &self.max.coords) / two;
        Point3::from(avg_coords)
    }
}

impl AABB<WorldPoint> {
    /// Box that contains nothing, growing it by any point makes it contain just that point.
    pub fn empty() -> Self {
        AABB {
            min: WorldPoint::new(FloatType::INFINITY, FloatType::INFINITY, FloatType::INFINITY),
            max: WorldPoint::new(
                FloatType::NEG_INFINITY,
                FloatType::NEG_INFINITY,
                FloatType::NEG_INFINITY,
            ),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Extend the box so that it contains the given point.
    pub fn grow(&mut self, point: &WorldPoint) {
        self.min = self.min.inf(point);
        self.max = self.max.sup(point);
    }

    /// Smallest box containing all the points, None if the iterator was empty.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a WorldPoint>) -> Option<Self> {
        let mut ret = Self::empty();
        for point in points {
            ret.grow(point);
        }

        if ret.is_empty() { None } else { Some(ret) }
    }

    pub fn contains(&self, point: &WorldPoint) -> bool {
        (0..3).all(|i| self.min[i] <= point[i] && point[i] <= self.max[i])
    }

    /// Index of the axis along which the box is the largest.
    pub fn longest_axis(&self) -> usize {
        self.size().imax()
    }
}

impl<Point> From<[Point; 2]> for AABB<Point> {
    fn from(value: [Point; 2]) -> Self {
        let [min, max] = value;
        AABB { min, max }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geometry::WorldVector;
    use assert2::{assert, let_assert};

    #[test]
    fn empty_box_is_empty() {
        assert!(AABB::empty().is_empty());
        assert!(AABB::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn from_points_encloses_everything() {
        let points = [
            WorldPoint::new(1.0, -2.0, 3.0),
            WorldPoint::new(-1.0, 5.0, 0.0),
            WorldPoint::new(0.0, 0.0, 7.0),
        ];
        let_assert!(Some(b) = AABB::from_points(&points));
        assert!(b.min == WorldPoint::new(-1.0, -2.0, 0.0));
        assert!(b.max == WorldPoint::new(1.0, 5.0, 7.0));
        assert!(points.iter().all(|p| b.contains(p)));
    }

    #[test]
    fn single_point_box_is_not_empty() {
        let p = WorldPoint::new(1.0, 2.0, 3.0);
        let_assert!(Some(b) = AABB::from_points([&p]));
        assert!(!b.is_empty());
        assert!(b.size() == WorldVector::zeros());
        assert!(b.center() == p);
    }

    #[test]
    fn longest_axis() {
        let b = AABB::new(WorldPoint::new(0.0, 0.0, 0.0), WorldPoint::new(1.0, 3.0, 2.0));
        assert!(b.longest_axis() == 1);
    }
}
