use std::num::NonZeroUsize;

use ordered_float::OrderedFloat;

use super::ShadedTriangle;
use crate::geometry::{FloatType, Ray, RayIntersectionExt as _, WorldBox};

/// Relative padding of the box used in ray tests, so that float error in the slab test
/// never culls a triangle that the triangle test would hit.
/// Rounding of both tests grows with the magnitude of the box and ray origin coordinates,
/// so the padding is scaled by both.
const BOX_MARGIN: FloatType = 1e-5;

/// Group of triangles with a box enclosing all of them.
#[derive(Clone, Debug)]
pub struct BoundingVolume {
    triangles: Vec<ShadedTriangle>,
    bounds: WorldBox,
    margin: FloatType,
}

impl BoundingVolume {
    pub fn new() -> Self {
        BoundingVolume {
            triangles: Vec::new(),
            bounds: WorldBox::empty(),
            margin: 0.0,
        }
    }

    /// Insert a triangle and grow the box to contain it.
    pub fn add_triangle(&mut self, triangle: ShadedTriangle) {
        for p in triangle.positions.iter() {
            self.bounds.grow(p);
        }
        let extent = self.bounds.min.coords.amax().max(self.bounds.max.coords.amax());
        self.margin = BOX_MARGIN * (1.0 + extent);
        self.triangles.push(triangle);
    }

    pub fn triangles(&self) -> &[ShadedTriangle] {
        &self.triangles
    }

    pub fn bounds(&self) -> &WorldBox {
        &self.bounds
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Whether the ray can possibly hit any of the contained triangles.
    pub fn test(&self, ray: &Ray) -> bool {
        self.test_range(ray, 0.0, FloatType::INFINITY)
    }

    /// Whether the ray can possibly hit any of the contained triangles at distance
    /// within the given range.
    pub fn test_range(&self, ray: &Ray, min_t: FloatType, max_t: FloatType) -> bool {
        if self.is_empty() {
            return false;
        }
        let margin = self.margin + BOX_MARGIN * ray.origin.coords.amax();
        let padded = WorldBox::new(
            self.bounds.min.map(|x| x - margin),
            self.bounds.max.map(|x| x + margin),
        );
        padded.test(ray, min_t, max_t)
    }
}

impl Default for BoundingVolume {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<ShadedTriangle> for BoundingVolume {
    fn from_iter<I: IntoIterator<Item = ShadedTriangle>>(iter: I) -> Self {
        let mut volume = BoundingVolume::new();
        for triangle in iter {
            volume.add_triangle(triangle);
        }
        volume
    }
}

/// Split triangles of one shape into spatially coherent volumes of limited size.
/// Triangles are ordered by their centroid along the longest axis of the centroid bounds.
pub fn partition(
    mut triangles: Vec<ShadedTriangle>,
    max_triangles_per_volume: NonZeroUsize,
) -> Vec<BoundingVolume> {
    let centroids: Vec<_> = triangles.iter().map(|t| t.centroid()).collect();
    let Some(centroid_bounds) = WorldBox::from_points(&centroids) else {
        return Vec::new();
    };
    let axis = centroid_bounds.longest_axis();

    triangles.sort_by_cached_key(|t| OrderedFloat(t.centroid()[axis]));

    let mut volumes = Vec::new();
    let mut iter = triangles.into_iter().peekable();
    while iter.peek().is_some() {
        volumes.push(
            iter.by_ref()
                .take(max_triangles_per_volume.get())
                .collect(),
        );
    }
    volumes
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        geometry::{WorldPoint, WorldVector},
        raytracer::triangle::test::make_triangle,
    };
    use assert2::assert;

    fn row_of_triangles(count: usize) -> Vec<ShadedTriangle> {
        (0..count)
            .map(|i| {
                let x = (count - i) as f32 * 2.0;
                make_triangle([x, 0.0, 0.0], [x + 1.0, 0.0, 0.0], [x, 1.0, 0.0])
            })
            .collect()
    }

    #[test]
    fn add_triangle_grows_box() {
        let mut volume = BoundingVolume::new();
        assert!(volume.is_empty());

        volume.add_triangle(make_triangle([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]));
        volume.add_triangle(make_triangle([0.0, 0.0, 5.0], [-1.0, 0.0, 5.0], [0.0, 3.0, 5.0]));

        assert!(volume.len() == 2);
        assert!(volume.bounds().min == WorldPoint::new(-1.0, 0.0, 0.0));
        assert!(volume.bounds().max == WorldPoint::new(1.0, 3.0, 5.0));
    }

    #[test]
    fn box_test() {
        let volume: BoundingVolume =
            [make_triangle([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0])]
                .into_iter()
                .collect();

        let towards = Ray::new(
            WorldPoint::new(0.9, 0.9, -1.0),
            WorldVector::new(0.0, 0.0, 1.0),
        );
        let away = Ray::new(
            WorldPoint::new(0.9, 0.9, -1.0),
            WorldVector::new(0.0, 0.0, -1.0),
        );
        let beside = Ray::new(
            WorldPoint::new(2.0, 0.5, -1.0),
            WorldVector::new(0.0, 0.0, 1.0),
        );

        assert!(volume.test(&towards));
        assert!(!volume.test(&away));
        assert!(!volume.test(&beside));
        assert!(!volume.test_range(&towards, 0.0, 0.5));
    }

    #[test]
    fn empty_volume_is_never_hit() {
        let ray = Ray::new(WorldPoint::origin(), WorldVector::new(0.0, 0.0, 1.0));
        assert!(!BoundingVolume::new().test(&ray));
    }

    #[test]
    fn partition_respects_volume_size() {
        let volumes = partition(row_of_triangles(10), NonZeroUsize::new(4).unwrap());

        assert!(volumes.iter().map(|v| v.len()).collect::<Vec<_>>() == vec![4, 4, 2]);
    }

    #[test]
    fn partition_groups_neighbors() {
        let volumes = partition(row_of_triangles(6), NonZeroUsize::new(3).unwrap());

        assert!(volumes.len() == 2);
        assert!(volumes[0].bounds().max.x < volumes[1].bounds().min.x);
    }

    #[test]
    fn partition_of_nothing() {
        assert!(partition(Vec::new(), NonZeroUsize::new(3).unwrap()).is_empty());
    }
}
