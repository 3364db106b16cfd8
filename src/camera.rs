use bon::bon;
use nalgebra::{Matrix4, Unit};
use thiserror::Error;

use crate::{
    geometry::{EPSILON, FloatType, WorldPoint, WorldVector},
    raytracer::CameraFrame,
};

#[derive(Debug, Error, PartialEq)]
pub enum CameraError {
    #[error("Camera looks straight up or down (phi = {phi} degrees), its orientation is undefined")]
    DegenerateOrientation { phi: FloatType },

    #[error("Angle of view must be between 0 and 180 degrees, got {0}")]
    InvalidAngleOfView(FloatType),

    #[error("Clipping planes must satisfy 0 < z_near < z_far, got {z_near} and {z_far}")]
    InvalidClippingPlanes { z_near: FloatType, z_far: FloatType },

    #[error("Image size must be positive, got {width}x{height}")]
    InvalidImageSize { width: usize, height: usize },
}

/// Camera oriented by two angles, in a right handed world with Y going up.
/// Theta turns the camera around the Y axis, phi tilts it up or down.
/// Theta = phi = 0 looks along negative Z.
#[derive(Copy, Clone, Debug)]
pub struct Camera {
    position: WorldPoint,

    direction: Unit<WorldVector>,
    right: Unit<WorldVector>,
    up: Unit<WorldVector>,

    /// Vertical angle of view in radians
    angle_of_view: FloatType,
    z_near: FloatType,
    z_far: FloatType,

    width: usize,
    height: usize,
}

#[bon]
impl Camera {
    /// All angles are in degrees.
    #[builder]
    pub fn new(
        position: WorldPoint,
        #[builder(default)] theta: FloatType,
        #[builder(default)] phi: FloatType,
        #[builder(default = 60.0)] angle_of_view: FloatType,
        #[builder(default = 0.001)] z_near: FloatType,
        #[builder(default = 100.0)] z_far: FloatType,
        width: usize,
        height: usize,
    ) -> Result<Self, CameraError> {
        if width == 0 || height == 0 {
            return Err(CameraError::InvalidImageSize { width, height });
        }
        if !(angle_of_view > 0.0 && angle_of_view < 180.0) {
            return Err(CameraError::InvalidAngleOfView(angle_of_view));
        }
        if !(z_near > 0.0 && z_near < z_far) {
            return Err(CameraError::InvalidClippingPlanes { z_near, z_far });
        }

        let (theta_rad, phi_rad) = (theta.to_radians(), phi.to_radians());
        let direction = Unit::new_normalize(WorldVector::new(
            theta_rad.sin() * phi_rad.cos(),
            phi_rad.sin(),
            -theta_rad.cos() * phi_rad.cos(),
        ));
        let right = Unit::try_new(direction.cross(&WorldVector::y()), EPSILON)
            .ok_or(CameraError::DegenerateOrientation { phi })?;
        let up = Unit::new_normalize(right.cross(direction.as_ref()));

        Ok(Camera {
            position,
            direction,
            right,
            up,
            angle_of_view: angle_of_view.to_radians(),
            z_near,
            z_far,
            width,
            height,
        })
    }
}

impl Camera {
    pub fn position(&self) -> &WorldPoint {
        &self.position
    }

    pub fn direction(&self) -> &WorldVector {
        self.direction.as_ref()
    }

    pub fn right(&self) -> &WorldVector {
        self.right.as_ref()
    }

    pub fn up(&self) -> &WorldVector {
        self.up.as_ref()
    }

    pub fn aspect_ratio(&self) -> FloatType {
        self.width as FloatType / self.height as FloatType
    }

    pub fn view_matrix(&self) -> Matrix4<FloatType> {
        Matrix4::look_at_rh(
            &self.position,
            &(self.position + self.direction.as_ref()),
            self.up.as_ref(),
        )
    }

    pub fn projection_matrix(&self) -> Matrix4<FloatType> {
        Matrix4::new_perspective(
            self.aspect_ratio(),
            self.angle_of_view,
            self.z_near,
            self.z_far,
        )
    }

    /// Basis for primary rays, matching the field of view of the projection matrix.
    pub fn frame(&self) -> CameraFrame {
        let half_height = (self.angle_of_view / 2.0).tan();
        CameraFrame {
            position: self.position,
            direction: self.direction.into_inner(),
            right: self.right.as_ref() * half_height,
            up: self.up.as_ref() * half_height,
        }
    }
}
