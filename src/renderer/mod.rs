//! Orchestration of one render: load the scene, set up a pipeline, render and save the image.

mod rasterization;
mod raytracing;

pub use rasterization::RasterizationRenderer;
pub use raytracing::RaytracingRenderer;

use crate::{
    resource::SharedResource,
    settings::{RendererKind, Settings},
    util::UnsignedColor,
};

/// Called with the index of every finished image row.
pub type ProgressCallback = Box<dyn Fn(usize) + Send + Sync>;

pub trait Renderer {
    /// Loads the model and prepares the pipeline.
    fn init(&mut self) -> anyhow::Result<()>;

    /// Renders the image and saves it to the configured path.
    /// `init` must have succeeded before.
    fn render(&mut self) -> anyhow::Result<()>;

    /// Image written by the last `render` call.
    fn render_target(&self) -> Option<SharedResource<UnsignedColor>>;

    /// Renderers that work row by row report their progress through this callback.
    fn set_progress_callback(&mut self, _callback: ProgressCallback) {}
}

pub fn create_renderer(settings: Settings) -> Box<dyn Renderer> {
    match settings.renderer {
        RendererKind::Rasterization => Box::new(RasterizationRenderer::new(settings)),
        RendererKind::Raytracing => Box::new(RaytracingRenderer::new(settings)),
    }
}

#[cfg(test)]
pub mod test {
    use std::path::Path;

    use crate::settings::{LightSettings, Settings};

    /// Square of 2x2 units at z = 0, facing +z, with a light-gray material.
    const QUAD_OBJ: &str = "\
o quad
v -1 -1 0
v 1 -1 0
v 1 1 0
v -1 1 0
vn 0 0 1
usemtl gray
f 1//1 2//1 3//1
f 1//1 3//1 4//1
";

    const GRAY_MTL: &str = "\
newmtl gray
Ns 10.0
Ka 0.2 0.2 0.2
Kd 0.6 0.6 0.6
Ks 0.0 0.0 0.0
Ke 0.0 0.0 0.0
Ni 1.0
d 1.0
illum 2
";

    /// Small render of the quad seen from the front, it covers the middle of the image.
    pub fn quad_settings(dir: &Path) -> Settings {
        let model_path = dir.join("quad.obj");
        let material_path = dir.join("quad.mtl");
        std::fs::write(&model_path, QUAD_OBJ).unwrap();
        std::fs::write(&material_path, GRAY_MTL).unwrap();

        Settings {
            width: 16,
            height: 12,
            model_path,
            material_path: Some(material_path),
            result_path: dir.join("result.png"),
            camera_position: [0.0, 0.0, 5.0],
            camera_angle_of_view: 40.0,
            background: [0.0, 0.0, 0.0],
            lights: vec![LightSettings {
                position: [0.0, 0.0, 3.0],
                color: [1.0, 1.0, 1.0],
            }],
            ..Settings::default()
        }
    }
}
