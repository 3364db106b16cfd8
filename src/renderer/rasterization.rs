use std::{sync::Arc, time::Instant};

use anyhow::{Context as _, bail};
use log::info;

use super::Renderer;
use crate::{
    camera::Camera,
    geometry::{FloatType, WorldPoint},
    rasterizer::{Rasterizer, apply_fisheye, is_fisheye_enabled},
    resource::{Resource, SharedResource},
    scene::{Model, Vertex},
    settings::Settings,
    util::UnsignedColor,
};

/// Color the image is cleared to before drawing.
pub const CLEAR_COLOR: UnsignedColor = UnsignedColor {
    r: 111,
    g: 5,
    b: 243,
};

struct State {
    rasterizer: Rasterizer<Vertex, UnsignedColor>,
    render_target: SharedResource<UnsignedColor>,
    model: Model,
    camera: Camera,
}

/// Draws the model with flat ambient colors.
pub struct RasterizationRenderer {
    settings: Settings,
    state: Option<State>,
}

impl RasterizationRenderer {
    pub fn new(settings: Settings) -> Self {
        RasterizationRenderer {
            settings,
            state: None,
        }
    }
}

impl Renderer for RasterizationRenderer {
    fn init(&mut self) -> anyhow::Result<()> {
        let settings = &self.settings;

        let render_target = Resource::new(settings.width, settings.height).into_shared();
        let depth_buffer = Resource::new(settings.width, settings.height).into_shared();
        let mut rasterizer = Rasterizer::new();
        rasterizer.set_viewport(settings.width, settings.height);
        rasterizer.set_render_target(Arc::clone(&render_target), Some(depth_buffer));

        let model = Model::with_obj(&settings.model_path, settings.material_path.as_deref())
            .with_context(|| format!("Loading model {:?}", settings.model_path))?;

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
            rasterizer,
            render_target,
            model,
            camera,
        });
        Ok(())
    }

    fn render(&mut self) -> anyhow::Result<()> {
        let Some(state) = self.state.as_mut() else {
            bail!("Renderer was not initialized");
        };

        let matrix =
            state.camera.projection_matrix() * state.camera.view_matrix() * state.model.world_matrix();
        state
            .rasterizer
            .set_vertex_shader(move |position, vertex| (matrix * position, vertex.clone()));
        state
            .rasterizer
            .set_pixel_shader(|vertex, _z| vertex.ambient);

        let start = Instant::now();
        state
            .rasterizer
            .clear_render_target(&CLEAR_COLOR, FloatType::MAX)?;
        info!("Clearing took {:?}", start.elapsed());

        let start = Instant::now();
        for shape in state.model.shapes() {
            state
                .rasterizer
                .set_vertex_buffer(Arc::clone(&shape.vertex_buffer));
            state
                .rasterizer
                .set_index_buffer(Arc::clone(&shape.index_buffer));
            state.rasterizer.draw(shape.index_buffer.len(), 0)?;
        }
        info!("Rendering took {:?}", start.elapsed());

        let mut image = state.render_target.lock().expect("Poisoned lock!");
        if is_fisheye_enabled(self.settings.fish_eye) {
            let start = Instant::now();
            apply_fisheye(&mut *image, self.settings.fish_eye, &CLEAR_COLOR);
            info!("Fisheye took {:?}", start.elapsed());
        }

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
}
