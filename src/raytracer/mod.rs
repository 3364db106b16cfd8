mod bounding_volume;
mod generation;
mod payload;
mod stats;
mod triangle;

use std::{num::NonZeroUsize, sync::Arc};

use itertools::Itertools as _;
use log::{debug, info};
use thiserror::Error;

pub use bounding_volume::{BoundingVolume, partition};
pub use generation::CameraFrame;
pub use payload::Payload;
pub use stats::VolumeStats;
pub use triangle::{ColorShading, ShadedTriangle};

use crate::{
    error::RenderError,
    geometry::{FloatType, Ray},
    resource::{PixelFormat, Resource, ResourceError, SharedResource},
    scene::ShadingVertex,
};

pub const DEFAULT_MAX_T: FloatType = 1000.0;
pub const DEFAULT_MIN_T: FloatType = 0.001;
pub const DEFAULT_MAX_TRIANGLES_PER_VOLUME: NonZeroUsize = NonZeroUsize::new(64).unwrap();

/// Called for rays that hit nothing or ran out of depth budget.
pub type MissShader = Box<dyn Fn(&Ray) -> Payload + Send + Sync>;

/// Called with the nearest hit and the remaining depth budget.
/// Gets the raytracer itself so that it can trace secondary rays.
pub type ClosestHitShader<V, RT> =
    Box<dyn Fn(&Raytracer<V, RT>, &Ray, &Payload, &ShadedTriangle, usize) -> Payload + Send + Sync>;

/// Called with the first hit found by `Raytracer::trace_any_hit`.
pub type AnyHitShader = Box<dyn Fn(&Ray, &Payload, &ShadedTriangle) -> Payload + Send + Sync>;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Got {vertex_buffers} vertex buffers, but {index_buffers} index buffers")]
    ShapeCountMismatch {
        vertex_buffers: usize,
        index_buffers: usize,
    },

    #[error("Index buffer of shape {shape} has {len} indices, not a multiple of 3")]
    IncompleteTriangle { shape: usize, len: usize },

    #[error("Invalid index in shape {shape}: {source}")]
    InvalidIndex {
        shape: usize,
        #[source]
        source: ResourceError,
    },
}

#[derive(Copy, Clone, Debug)]
pub struct RaytracerSettings {
    pub max_triangles_per_volume: NonZeroUsize,
    pub color_shading: ColorShading,
    /// Skip triangles of bounding volumes whose box the ray misses.
    /// Turning this off gives the same image, only slower.
    pub cull_bounding_volumes: bool,
    /// Number of ray generation threads, one per CPU core if not set.
    pub worker_count: Option<NonZeroUsize>,
}

impl Default for RaytracerSettings {
    fn default() -> Self {
        RaytracerSettings {
            max_triangles_per_volume: DEFAULT_MAX_TRIANGLES_PER_VOLUME,
            color_shading: ColorShading::default(),
            cull_bounding_volumes: true,
            worker_count: None,
        }
    }
}

/// Ray tracing pipeline.
/// Shading is entirely up to the shader callbacks, the raytracer only finds hits.
pub struct Raytracer<V: ShadingVertex, RT: PixelFormat> {
    settings: RaytracerSettings,

    render_target: Option<SharedResource<RT>>,
    width: usize,
    height: usize,

    vertex_buffers: Vec<Arc<Resource<V>>>,
    index_buffers: Vec<Arc<Resource<u32>>>,
    acceleration_structures: Vec<BoundingVolume>,

    miss_shader: Option<MissShader>,
    closest_hit_shader: Option<ClosestHitShader<V, RT>>,
    any_hit_shader: Option<AnyHitShader>,
}

impl<V: ShadingVertex, RT: PixelFormat> Raytracer<V, RT> {
    pub fn new(settings: RaytracerSettings) -> Self {
        Raytracer {
            settings,
            render_target: None,
            width: 1920,
            height: 1080,
            vertex_buffers: Vec::new(),
            index_buffers: Vec::new(),
            acceleration_structures: Vec::new(),
            miss_shader: None,
            closest_hit_shader: None,
            any_hit_shader: None,
        }
    }

    pub fn settings(&self) -> &RaytracerSettings {
        &self.settings
    }

    /// Size of the ray generation grid.
    pub fn set_viewport(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
    }

    pub fn viewport(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn set_render_target(&mut self, render_target: SharedResource<RT>) {
        self.render_target = Some(render_target);
    }

    pub fn render_target(&self) -> Option<&SharedResource<RT>> {
        self.render_target.as_ref()
    }

    pub fn clear_render_target(&self, value: &RT) -> Result<(), RenderError> {
        let target = self
            .render_target
            .as_ref()
            .ok_or(RenderError::MissingRenderTarget)?;
        target.lock().expect("Poisoned lock!").fill(value);
        Ok(())
    }

    /// One vertex buffer per shape.
    /// Previously built acceleration structures are dropped.
    pub fn set_vertex_buffers(&mut self, vertex_buffers: Vec<Arc<Resource<V>>>) {
        self.vertex_buffers = vertex_buffers;
        self.acceleration_structures.clear();
    }

    /// One index buffer per shape, matching the vertex buffers.
    /// Previously built acceleration structures are dropped.
    pub fn set_index_buffers(&mut self, index_buffers: Vec<Arc<Resource<u32>>>) {
        self.index_buffers = index_buffers;
        self.acceleration_structures.clear();
    }

    pub fn set_miss_shader(&mut self, shader: impl Fn(&Ray) -> Payload + Send + Sync + 'static) {
        self.miss_shader = Some(Box::new(shader));
    }

    pub fn set_closest_hit_shader(
        &mut self,
        shader: impl Fn(&Self, &Ray, &Payload, &ShadedTriangle, usize) -> Payload
        + Send
        + Sync
        + 'static,
    ) {
        self.closest_hit_shader = Some(Box::new(shader));
    }

    pub fn set_any_hit_shader(
        &mut self,
        shader: impl Fn(&Ray, &Payload, &ShadedTriangle) -> Payload + Send + Sync + 'static,
    ) {
        self.any_hit_shader = Some(Box::new(shader));
    }

    /// Builds triangles from the vertex and index buffers and groups them into bounding volumes.
    /// Has to be called after the buffers are set and before tracing any rays.
    pub fn build_acceleration_structure(&mut self) -> Result<(), BuildError> {
        if self.vertex_buffers.len() != self.index_buffers.len() {
            return Err(BuildError::ShapeCountMismatch {
                vertex_buffers: self.vertex_buffers.len(),
                index_buffers: self.index_buffers.len(),
            });
        }

        let mut volumes = Vec::new();
        for (shape, (vertices, indices)) in self
            .vertex_buffers
            .iter()
            .zip(self.index_buffers.iter())
            .enumerate()
        {
            if indices.len() % 3 != 0 {
                return Err(BuildError::IncompleteTriangle {
                    shape,
                    len: indices.len(),
                });
            }

            let triangles = indices
                .iter()
                .tuples()
                .map(|(a, b, c)| -> Result<_, ResourceError> {
                    Ok(ShadedTriangle::new(
                        vertices.get(*a as usize)?,
                        vertices.get(*b as usize)?,
                        vertices.get(*c as usize)?,
                        self.settings.color_shading,
                    ))
                })
                .collect::<Result<Vec<_>, _>>()
                .map_err(|source| BuildError::InvalidIndex { shape, source })?;

            volumes.extend(partition(
                triangles,
                self.settings.max_triangles_per_volume,
            ));
        }

        let stats = VolumeStats::collect(&volumes);
        debug!("Bounding volumes: {stats}");
        info!(
            "Built {} bounding volumes with {} triangles from {} shapes",
            stats.volume_count,
            stats.triangle_count,
            self.vertex_buffers.len()
        );

        self.acceleration_structures = volumes;
        Ok(())
    }

    pub fn acceleration_structures(&self) -> &[BoundingVolume] {
        &self.acceleration_structures
    }

    pub fn triangles(&self) -> impl Iterator<Item = &ShadedTriangle> {
        self.acceleration_structures
            .iter()
            .flat_map(|volume| volume.triangles())
    }

    /// Finds the nearest hit with distance in (min_t, max_t) and shades it.
    /// Depth budget of zero is treated as a miss.
    /// The closest hit shader gets the depth budget reduced by one.
    ///
    /// # Panics
    /// If no miss shader is set.
    pub fn trace_ray(&self, ray: &Ray, depth: usize, max_t: FloatType, min_t: FloatType) -> Payload {
        let miss_shader = self
            .miss_shader
            .as_ref()
            .expect("Miss shader must be set before tracing rays");

        if depth == 0 {
            return miss_shader(ray);
        }
        let depth = depth - 1;

        let mut closest_t = max_t;
        let mut closest = None;
        for volume in &self.acceleration_structures {
            // Range shrinks as closer hits are found
            if self.settings.cull_bounding_volumes && !volume.test_range(ray, min_t, closest_t) {
                continue;
            }
            for triangle in volume.triangles() {
                let payload = triangle.intersect(ray);
                if payload.is_hit() && payload.t > min_t && payload.t < closest_t {
                    closest_t = payload.t;
                    closest = Some((payload, triangle));
                }
            }
        }

        match (closest, &self.closest_hit_shader) {
            (Some((payload, triangle)), Some(shader)) => shader(self, ray, &payload, triangle, depth),
            _ => miss_shader(ray),
        }
    }

    /// `trace_ray` with the default distance range.
    pub fn trace(&self, ray: &Ray, depth: usize) -> Payload {
        self.trace_ray(ray, depth, DEFAULT_MAX_T, DEFAULT_MIN_T)
    }

    /// Shades the first hit found with distance in (min_t, max_t), not necessarily the nearest one.
    /// Intended for occlusion queries.
    ///
    /// # Panics
    /// If the any hit shader or the miss shader is not set.
    pub fn trace_any_hit(&self, ray: &Ray, max_t: FloatType, min_t: FloatType) -> Payload {
        let any_hit_shader = self
            .any_hit_shader
            .as_ref()
            .expect("Any hit shader must be set before tracing occlusion rays");

        for volume in self.candidate_volumes(ray, min_t, max_t) {
            for triangle in volume.triangles() {
                let payload = triangle.intersect(ray);
                if payload.is_hit() && payload.t > min_t && payload.t < max_t {
                    return any_hit_shader(ray, &payload, triangle);
                }
            }
        }

        let miss_shader = self
            .miss_shader
            .as_ref()
            .expect("Miss shader must be set before tracing rays");
        miss_shader(ray)
    }

    /// Volumes that might contain a hit in the given range.
    fn candidate_volumes<'a>(
        &'a self,
        ray: &'a Ray,
        min_t: FloatType,
        max_t: FloatType,
    ) -> impl Iterator<Item = &'a BoundingVolume> {
        let cull = self.settings.cull_bounding_volumes;
        self.acceleration_structures
            .iter()
            .filter(move |volume| !cull || volume.test_range(ray, min_t, max_t))
    }
}
