use std::fmt::Display;

use super::BoundingVolume;
use crate::geometry::{FloatType, WorldBox};

/// Fill statistics of a set of bounding volumes.
#[derive(Clone, Debug, PartialEq)]
pub struct VolumeStats {
    pub volume_count: usize,
    pub triangle_count: usize,
    pub min_triangles: usize,
    pub max_triangles: usize,
    /// Total surface area of the volume boxes relative to the box around everything.
    /// Disjoint volumes keep this low, values far above the volume count mean heavy overlap.
    pub relative_area: FloatType,
}

fn surface_area(bounds: &WorldBox) -> FloatType {
    if bounds.is_empty() {
        return 0.0;
    }
    let size = bounds.size();
    2.0 * (size.x * size.y + size.y * size.z + size.z * size.x)
}

impl VolumeStats {
    pub fn collect(volumes: &[BoundingVolume]) -> Self {
        let mut total_bounds = WorldBox::empty();
        let mut stats = VolumeStats {
            volume_count: volumes.len(),
            triangle_count: 0,
            min_triangles: if volumes.is_empty() { 0 } else { usize::MAX },
            max_triangles: 0,
            relative_area: 0.0,
        };

        let mut area_sum = 0.0;
        for volume in volumes {
            stats.triangle_count += volume.len();
            stats.min_triangles = stats.min_triangles.min(volume.len());
            stats.max_triangles = stats.max_triangles.max(volume.len());

            area_sum += surface_area(volume.bounds());
            if !volume.is_empty() {
                total_bounds.grow(&volume.bounds().min);
                total_bounds.grow(&volume.bounds().max);
            }
        }

        let total_area = surface_area(&total_bounds);
        if total_area > 0.0 {
            stats.relative_area = area_sum / total_area;
        }
        stats
    }

    pub fn average_triangles(&self) -> FloatType {
        if self.volume_count == 0 {
            0.0
        } else {
            self.triangle_count as FloatType / self.volume_count as FloatType
        }
    }
}

impl Display for VolumeStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} volumes; {} - {} triangles, avg {:.1}; relative area {:.2}",
            self.volume_count,
            self.min_triangles,
            self.max_triangles,
            self.average_triangles(),
            self.relative_area
        )
    }
}
