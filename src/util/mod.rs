/// Linear floating point color, components nominally in 0-1.
pub type Color = rgb::RGB<f32>;

/// 8 bit per channel color.
pub type UnsignedColor = rgb::RGB8;

pub fn color_from_array(components: [f32; 3]) -> Color {
    Color::new(components[0], components[1], components[2])
}

/// Componentwise product of two colors.
pub fn modulate(a: Color, b: Color) -> Color {
    Color::new(a.r * b.r, a.g * b.g, a.b * b.b)
}

/// Maps a 0-1 f32 color to 8 bit color.
pub fn color_to_unsigned(color: Color) -> UnsignedColor {
    UnsignedColor::new(
        (color.r * 255.0).round().clamp(0.0, 255.0) as u8,
        (color.g * 255.0).round().clamp(0.0, 255.0) as u8,
        (color.b * 255.0).round().clamp(0.0, 255.0) as u8,
    )
}

pub fn unsigned_to_color(color: UnsignedColor) -> Color {
    Color::new(
        color.r as f32 / 255.0,
        color.g as f32 / 255.0,
        color.b as f32 / 255.0,
    )
}
