pub mod camera;
pub mod error;
pub mod geometry;
pub mod rasterizer;
pub mod raytracer;
pub mod renderer;
pub mod resource;
pub mod scene;
pub mod settings;
pub mod util;

pub use camera::Camera;
pub use error::RenderError;
pub use rasterizer::Rasterizer;
pub use raytracer::{Payload, Raytracer, RaytracerSettings};
pub use renderer::{Renderer, create_renderer};
pub use resource::{Resource, SharedResource};
pub use scene::{Light, Model, Vertex};
pub use settings::{RendererKind, Settings};
