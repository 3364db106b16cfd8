use std::thread;

use core_affinity::CoreId;
use log::debug;

use super::Raytracer;
use crate::{
    error::RenderError,
    geometry::{FloatType, Ray, WorldPoint, WorldVector},
    resource::PixelFormat,
    scene::ShadingVertex,
};

/// Camera basis used to build primary rays.
/// `right` and `up` are scaled so that they reach the edges of the image at unit distance.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CameraFrame {
    pub position: WorldPoint,
    pub direction: WorldVector,
    pub right: WorldVector,
    pub up: WorldVector,
}

impl CameraFrame {
    /// Ray through pixel (x, y) of a width x height image.
    pub fn primary_ray(&self, x: usize, y: usize, width: usize, height: usize) -> Ray {
        let width = width as FloatType;
        let height = height as FloatType;

        let mut u = 2.0 * x as FloatType / width - 1.0;
        let v = 2.0 * y as FloatType / height - 1.0;
        u *= width / height;

        Ray::new(
            self.position,
            self.direction + self.right * u - self.up * v,
        )
    }
}

impl<V: ShadingVertex, RT: PixelFormat> Raytracer<V, RT> {
    /// Traces one primary ray per viewport pixel and writes the resulting colors to the render target.
    pub fn ray_generation(&self, frame: &CameraFrame, depth: usize) -> Result<(), RenderError> {
        self.ray_generation_with_progress(frame, depth, |_row| {})
    }

    /// Like `ray_generation`, calls `progress` with the index of every finished row.
    /// `progress` is called from the worker threads.
    pub fn ray_generation_with_progress(
        &self,
        frame: &CameraFrame,
        depth: usize,
        progress: impl Fn(usize) + Sync,
    ) -> Result<(), RenderError> {
        let target = self
            .render_target
            .as_ref()
            .ok_or(RenderError::MissingRenderTarget)?;
        if self.miss_shader.is_none() {
            return Err(RenderError::MissingShader("miss"));
        }

        let mut target = target.lock().expect("Poisoned lock!");
        let (width, height) = (self.width, self.height);
        if width > target.width() || height > target.height() {
            return Err(RenderError::ViewportExceedsTarget {
                viewport_width: width,
                viewport_height: height,
                target_width: target.width(),
                target_height: target.height(),
            });
        }

        let workers = self.worker_cores(height);
        debug!("Generating {width}x{height} rays on {} workers", workers.len());

        // Every worker gets exclusive ownership of its rows
        let mut assignments: Vec<Vec<(usize, &mut [RT])>> =
            workers.iter().map(|_| Vec::new()).collect();
        for (y, row) in target.rows_mut().take(height).enumerate() {
            assignments[y % workers.len()].push((y, &mut row[..width]));
        }

        let progress = &progress;
        thread::scope(|scope| -> Result<(), RenderError> {
            let handles = workers
                .into_iter()
                .zip(assignments)
                .enumerate()
                .map(|(worker_id, (core, rows))| {
                    thread::Builder::new()
                        .name(format!("worker{worker_id}"))
                        .spawn_scoped(scope, move || {
                            if let Some(core) = core {
                                core_affinity::set_for_current(core);
                            }

                            for (y, row) in rows {
                                for (x, pixel) in row.iter_mut().enumerate() {
                                    let ray = frame.primary_ray(x, y, width, height);
                                    *pixel = RT::from_color(self.trace(&ray, depth).color);
                                }
                                progress(y);
                            }
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;

            for handle in handles {
                if let Err(panic) = handle.join() {
                    std::panic::resume_unwind(panic);
                }
            }
            Ok(())
        })
    }

    /// Cores to pin the workers to, `None` entries are not pinned.
    fn worker_cores(&self, height: usize) -> Vec<Option<CoreId>> {
        let mut cores: Vec<Option<CoreId>> = match self.settings.worker_count {
            Some(count) => vec![None; count.get()],
            None => match core_affinity::get_core_ids() {
                Some(ids) if !ids.is_empty() => ids.into_iter().map(Some).collect(),
                _ => vec![None; num_cpus::get().max(1)],
            },
        };
        cores.truncate(height.max(1));
        cores
    }
}
