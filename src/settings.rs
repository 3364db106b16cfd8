//! Render configuration, loaded from TOML.

use std::{
    fs,
    num::NonZeroUsize,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use thiserror::Error;

use crate::{
    geometry::{FloatType, WorldPoint},
    raytracer::{ColorShading, DEFAULT_MAX_TRIANGLES_PER_VOLUME, RaytracerSettings},
    scene::Light,
    util::{Color, color_from_array},
};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value of `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RendererKind {
    Rasterization,
    #[default]
    Raytracing,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LightSettings {
    pub position: [FloatType; 3],
    pub color: [FloatType; 3],
}

impl From<&LightSettings> for Light {
    fn from(light: &LightSettings) -> Self {
        Light {
            position: WorldPoint::from(light.position),
            color: color_from_array(light.color),
        }
    }
}

/// Everything a renderer needs to produce one image.
/// Missing fields take their default values, unknown fields are rejected.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub renderer: RendererKind,

    pub width: usize,
    pub height: usize,

    pub model_path: PathBuf,
    /// MTL file with the model's material colors
    pub material_path: Option<PathBuf>,
    pub result_path: PathBuf,

    pub camera_position: [FloatType; 3],
    /// Degrees
    pub camera_theta: FloatType,
    /// Degrees
    pub camera_phi: FloatType,
    /// Vertical, degrees
    pub camera_angle_of_view: FloatType,
    pub camera_z_near: FloatType,
    pub camera_z_far: FloatType,

    /// Fisheye distortion factor, zero disables the effect
    pub fish_eye: FloatType,

    pub raytracing_depth: usize,
    pub background: [FloatType; 3],
    /// Weight of the mirror reflection, 0 - 1
    pub reflectivity: FloatType,
    pub lights: Vec<LightSettings>,

    pub max_triangles_per_volume: NonZeroUsize,
    pub cull_bounding_volumes: bool,
    pub color_shading: ColorShading,
    /// Ray generation threads, one per core if not set
    pub worker_count: Option<NonZeroUsize>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            renderer: RendererKind::default(),
            width: 1920,
            height: 1080,
            model_path: PathBuf::from("models/cornell_box.obj"),
            material_path: None,
            result_path: PathBuf::from("result.png"),
            camera_position: [0.0, 1.0, 4.0],
            camera_theta: 0.0,
            camera_phi: 0.0,
            camera_angle_of_view: 60.0,
            camera_z_near: 0.001,
            camera_z_far: 100.0,
            fish_eye: 0.0,
            raytracing_depth: 3,
            background: [0.0, 0.0, 0.0],
            reflectivity: 0.0,
            lights: vec![LightSettings {
                position: [0.0, 1.58, -0.03],
                color: [0.78, 0.78, 0.78],
            }],
            max_triangles_per_volume: DEFAULT_MAX_TRIANGLES_PER_VOLUME,
            cull_bounding_volumes: true,
            color_shading: ColorShading::default(),
            worker_count: None,
        }
    }
}

impl Settings {
    pub fn load(path: impl AsRef<Path>) -> Result<Settings, SettingsError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_owned(),
            source,
        })?;
        content.parse()
    }

    /// Checks values that deserialization alone can't catch.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.width == 0 || self.height == 0 {
            return Err(SettingsError::Invalid {
                field: "width/height",
                reason: format!("image size {}x{} is empty", self.width, self.height),
            });
        }
        if !(0.0..=1.0).contains(&self.reflectivity) {
            return Err(SettingsError::Invalid {
                field: "reflectivity",
                reason: format!("{} is outside of 0 - 1", self.reflectivity),
            });
        }
        Ok(())
    }

    pub fn raytracer_settings(&self) -> RaytracerSettings {
        RaytracerSettings {
            max_triangles_per_volume: self.max_triangles_per_volume,
            color_shading: self.color_shading,
            cull_bounding_volumes: self.cull_bounding_volumes,
            worker_count: self.worker_count,
        }
    }

    pub fn background_color(&self) -> Color {
        color_from_array(self.background)
    }

    pub fn scene_lights(&self) -> Vec<Light> {
        self.lights.iter().map(Light::from).collect()
    }
}

impl std::str::FromStr for Settings {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let settings: Settings = toml::from_str(s)?;
        settings.validate()?;
        Ok(settings)
    }
}
