use std::{sync::Arc, time::Instant};

use anyhow::{Context as _, bail};
use log::info;

use super::{ProgressCallback, Renderer};
use crate::{
    camera::Camera,
    geometry::{FloatType, Ray, WorldPoint},
    raytracer::{DEFAULT_MIN_T, Payload, Raytracer, ShadedTriangle},
    resource::{Resource, SharedResource},
    scene::{Light, Model, Vertex},
    settings::Settings,
    util::{UnsignedColor, color_to_unsigned, modulate},
};

struct State {
    raytracer: Raytracer<Vertex, UnsignedColor>,
    render_target: SharedResource<UnsignedColor>,
    camera: Camera,
}

/// Whitted style renderer: direct diffuse lighting with hard shadows and optional mirror reflections.
pub struct RaytracingRenderer {
    settings: Settings,
    state: Option<State>,
    progress_callback: Option<ProgressCallback>,
}

impl RaytracingRenderer {
    pub fn new(settings: Settings) -> Self {
        RaytracingRenderer {
            settings,
            state: None,
            progress_callback: None,
        }
    }
}

/// Shading of the nearest hit: emissive + ambient + unshadowed diffuse light from every light,
/// blended with the mirror reflection.
fn shade_hit(
    raytracer: &Raytracer<Vertex, UnsignedColor>,
    lights: &[Light],
    reflectivity: FloatType,
    ray: &Ray,
    payload: &Payload,
    triangle: &ShadedTriangle,
    depth: usize,
) -> Payload {
    let position = ray.point_at(payload.t);
    let mut normal = triangle.normal_at(&payload.bary);
    if normal.dot(&ray.direction) > 0.0 {
        normal = -normal;
    }

    let diffuse = triangle.diffuse_at(&payload.bary);
    let mut color = triangle.emissive_at(&payload.bary) + triangle.ambient_at(&payload.bary);

    for light in lights {
        let to_light = light.position - position;
        let distance = to_light.norm();
        let shadow_ray = Ray::new(position, to_light);
        if raytracer.trace_any_hit(&shadow_ray, distance, DEFAULT_MIN_T).is_hit() {
            continue;
        }

        let intensity = normal.dot(&shadow_ray.direction).max(0.0);
        color = color + modulate(diffuse, light.color) * intensity;
    }

    if reflectivity > 0.0 && depth > 0 {
        let reflected_direction = ray.direction - normal * (2.0 * normal.dot(&ray.direction));
        let reflected = raytracer.trace(&Ray::new(position, reflected_direction), depth);
        color = color * (1.0 - reflectivity) + reflected.color * reflectivity;
    }

    payload.with_color(color)
}

impl Renderer for RaytracingRenderer {
    fn init(&mut self) -> anyhow::Result<()> {
        let settings = &self.settings;

        let render_target = Resource::new(settings.width, settings.height).into_shared();
        let mut raytracer: Raytracer<Vertex, UnsignedColor> =
            Raytracer::new(settings.raytracer_settings());
        raytracer.set_viewport(settings.width, settings.height);
        raytracer.set_render_target(Arc::clone(&render_target));

        let model = Model::with_obj(&settings.model_path, settings.material_path.as_deref())
            .with_context(|| format!("Loading model {:?}", settings.model_path))?;
        raytracer.set_vertex_buffers(model.vertex_buffers());
        raytracer.set_index_buffers(model.index_buffers());

        let start = Instant::now();
        raytracer.build_acceleration_structure()?;
        info!("Building acceleration structure took {:?}", start.elapsed());

        let background = settings.background_color();
        raytracer.set_miss_shader(move |_ray| Payload::miss(background));
        raytracer.set_any_hit_shader(|_ray, payload, _triangle| *payload);

        let lights = settings.scene_lights();
        let reflectivity = settings.reflectivity;
        raytracer.set_closest_hit_shader(move |raytracer, ray, payload, triangle, depth| {
            shade_hit(raytracer, &lights, reflectivity, ray, payload, triangle, depth)
        });

        let camera = Camera::builder()
            .position(WorldPoint::from(settings.camera_position))
            .theta(settings.camera_theta)
            .phi(settings.camera_phi)
            .angle_of_view(settings.camera_angle_of_view)
            .z_near(settings.camera_z_near)
            .z_far(settings.camera_z_far)
            .width(settings.width)
            .height(settings.height)
            .build()?;

        self.state = Some(State {
            raytracer,
            render_target,
            camera,
        });
        Ok(())
    }

    fn render(&mut self) -> anyhow::Result<()> {
        let Some(state) = self.state.as_ref() else {
            bail!("Renderer was not initialized");
        };

        let start = Instant::now();
        state
            .raytracer
            .clear_render_target(&color_to_unsigned(self.settings.background_color()))?;
        info!("Clearing took {:?}", start.elapsed());

        let start = Instant::now();
        let progress = |row: usize| {
            if let Some(callback) = &self.progress_callback {
                callback(row);
            }
        };
        state.raytracer.ray_generation_with_progress(
            &state.camera.frame(),
            self.settings.raytracing_depth,
            progress,
        )?;
        info!("Ray tracing took {:?}", start.elapsed());

        let image = state.render_target.lock().expect("Poisoned lock!");
        image
            .save(&self.settings.result_path)
            .with_context(|| format!("Saving result to {:?}", self.settings.result_path))?;
        info!("Saved {:?}", self.settings.result_path);
        Ok(())
    }

    fn render_target(&self) -> Option<SharedResource<UnsignedColor>> {
        self.state
            .as_ref()
            .map(|state| Arc::clone(&state.render_target))
    }

    fn set_progress_callback(&mut self, callback: ProgressCallback) {
        self.progress_callback = Some(callback);
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::{
        raytracer::ColorShading, renderer::test::quad_settings, settings::LightSettings, util::Color,
    };
    use assert2::{assert, let_assert};

    fn render(settings: Settings) -> Resource<UnsignedColor> {
        let mut renderer = RaytracingRenderer::new(settings);
        renderer.init().unwrap();
        renderer.render().unwrap();
        let_assert!(Some(target) = renderer.render_target());
        target.lock().unwrap().clone()
    }

    #[test]
    fn renders_lit_quad() {
        let dir = tempfile::tempdir().unwrap();
        let settings = quad_settings(dir.path());
        let result_path = settings.result_path.clone();
        let image = render(settings);

        // Ambient 0.2 + diffuse 0.6 from a light straight in front
        let center = image[(9, 6)];
        assert!(center.r > 180);
        assert!(center.r == center.g && center.g == center.b);
        assert!(image[(0, 0)] == UnsignedColor::new(0, 0, 0));
        assert!(result_path.exists());
    }

    #[test]
    fn light_behind_quad_leaves_ambient() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            lights: vec![LightSettings {
                position: [0.0, 0.0, -3.0],
                color: [1.0, 1.0, 1.0],
            }],
            ..quad_settings(dir.path())
        };
        let image = render(settings);

        assert!(image[(9, 6)] == color_to_unsigned(Color::new(0.2, 0.2, 0.2)));
    }

    #[test]
    fn shadowed_light_leaves_ambient() {
        let dir = tempfile::tempdir().unwrap();
        // Second quad behind the camera's back, between the light and the visible quad
        let model_path = dir.path().join("two_quads.obj");
        std::fs::write(
            &model_path,
            "\
o front
v -1 -1 0
v 1 -1 0
v 1 1 0
v -1 1 0
f 1 2 3
f 1 3 4
o blocker
v -5 -5 4
v 5 -5 4
v 5 5 4
v -5 5 4
f 5 6 7
f 5 7 8
",
        )
        .unwrap();
        let settings = Settings {
            model_path,
            material_path: None,
            camera_position: [0.0, 0.0, 3.0],
            lights: vec![LightSettings {
                position: [0.0, 0.0, 6.0],
                color: [1.0, 1.0, 1.0],
            }],
            ..quad_settings(dir.path())
        };
        let image = render(settings);

        // Default material ambient
        assert!(image[(9, 6)] == color_to_unsigned(Color::new(0.2, 0.2, 0.2)));
    }

    #[test]
    fn reflection_of_background() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            background: [0.0, 0.0, 1.0],
            reflectivity: 1.0,
            lights: Vec::new(),
            color_shading: ColorShading::Interpolated,
            ..quad_settings(dir.path())
        };
        let image = render(settings);

        // Fully reflective quad shows the background
        assert!(image[(9, 6)] == UnsignedColor::new(0, 0, 255));
    }

    #[test]
    fn progress_callback_sees_every_row() {
        let dir = tempfile::tempdir().unwrap();
        let settings = quad_settings(dir.path());
        let height = settings.height;

        let rows = Arc::new(AtomicUsize::new(0));
        let rows_writer = Arc::clone(&rows);
        let mut renderer = RaytracingRenderer::new(settings);
        renderer.set_progress_callback(Box::new(move |_row| {
            rows_writer.fetch_add(1, Ordering::Relaxed);
        }));
        renderer.init().unwrap();
        renderer.render().unwrap();

        assert!(rows.load(Ordering::Relaxed) == height);
    }

    #[test]
    fn render_before_init_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut renderer = RaytracingRenderer::new(quad_settings(dir.path()));
        assert!(renderer.render().is_err());
    }
}
