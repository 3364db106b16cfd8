use crate::{geometry::FloatType, resource::Resource};

/// Distortion factors this close to zero turn the effect off.
pub const FISHEYE_DISABLED_EPSILON: FloatType = 1e-6;

pub fn is_fisheye_enabled(distortion_factor: FloatType) -> bool {
    distortion_factor.abs() > FISHEYE_DISABLED_EPSILON
}

/// Radial warp around the image center.
/// Pixel at offset `d` from the center takes the color of the source pixel at `d * |d| / distortion_factor`,
/// pixels whose source falls outside of the image are set to `background`.
pub fn apply_fisheye<T: Clone>(image: &mut Resource<T>, distortion_factor: FloatType, background: &T) {
    let source = image.clone();
    image.fill(background);

    let center_x = image.width() as FloatType / 2.0;
    let center_y = image.height() as FloatType / 2.0;

    for y in 0..image.height() {
        for x in 0..image.width() {
            let dx = x as FloatType - center_x;
            let dy = y as FloatType - center_y;
            let distortion = dx.hypot(dy) / distortion_factor;

            let source_x = (center_x + dx * distortion).floor();
            let source_y = (center_y + dy * distortion).floor();
            if !(source_x >= 0.0 && source_y >= 0.0) {
                continue;
            }

            if let Ok(value) = source.get_xy(source_x as usize, source_y as usize) {
                image[(x, y)] = value.clone();
            }
        }
    }
}
