mod fisheye;

use std::sync::Arc;

use nalgebra::{Point2, Vector4};

pub use fisheye::{FISHEYE_DISABLED_EPSILON, apply_fisheye, is_fisheye_enabled};

use crate::{
    error::RenderError,
    geometry::{EPSILON, FloatType},
    resource::{PixelFormat, Resource, SharedResource},
    scene::ShadingVertex,
    util::Color,
};

/// Maps a homogeneous model space position to clip space.
pub type VertexShader<V> = Box<dyn Fn(Vector4<FloatType>, &V) -> (Vector4<FloatType>, V) + Send + Sync>;

/// Color of a pixel covered by a triangle, given the triangle's first vertex and the pixel depth.
pub type PixelShader<V> = Box<dyn Fn(&V, FloatType) -> Color + Send + Sync>;

type ScreenPoint = Point2<FloatType>;

/// Vertex after the vertex shader, perspective divide and viewport transform.
struct ScreenVertex<V> {
    position: ScreenPoint,
    depth: FloatType,
    data: V,
}

/// Rasterization pipeline.
pub struct Rasterizer<V: ShadingVertex, RT: PixelFormat> {
    render_target: Option<SharedResource<RT>>,
    depth_buffer: Option<SharedResource<FloatType>>,
    width: usize,
    height: usize,

    vertex_buffer: Option<Arc<Resource<V>>>,
    index_buffer: Option<Arc<Resource<u32>>>,

    vertex_shader: Option<VertexShader<V>>,
    pixel_shader: Option<PixelShader<V>>,
}

impl<V: ShadingVertex, RT: PixelFormat> Default for Rasterizer<V, RT> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: ShadingVertex, RT: PixelFormat> Rasterizer<V, RT> {
    pub fn new() -> Self {
        Rasterizer {
            render_target: None,
            depth_buffer: None,
            width: 1920,
            height: 1080,
            vertex_buffer: None,
            index_buffer: None,
            vertex_shader: None,
            pixel_shader: None,
        }
    }

    /// Sets the color target and optionally a depth buffer.
    /// Without a depth buffer triangles are painted in draw order.
    pub fn set_render_target(
        &mut self,
        render_target: SharedResource<RT>,
        depth_buffer: Option<SharedResource<FloatType>>,
    ) {
        self.render_target = Some(render_target);
        self.depth_buffer = depth_buffer;
    }

    pub fn set_viewport(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
    }

    /// Fills the render target with `color` and the depth buffer (if any) with `depth`.
    pub fn clear_render_target(&self, color: &RT, depth: FloatType) -> Result<(), RenderError> {
        let target = self
            .render_target
            .as_ref()
            .ok_or(RenderError::MissingRenderTarget)?;
        target.lock().expect("Poisoned lock!").fill(color);

        if let Some(depth_buffer) = &self.depth_buffer {
            depth_buffer.lock().expect("Poisoned lock!").fill(&depth);
        }
        Ok(())
    }

    pub fn set_vertex_buffer(&mut self, vertex_buffer: Arc<Resource<V>>) {
        self.vertex_buffer = Some(vertex_buffer);
    }

    pub fn set_index_buffer(&mut self, index_buffer: Arc<Resource<u32>>) {
        self.index_buffer = Some(index_buffer);
    }

    pub fn set_vertex_shader(
        &mut self,
        shader: impl Fn(Vector4<FloatType>, &V) -> (Vector4<FloatType>, V) + Send + Sync + 'static,
    ) {
        self.vertex_shader = Some(Box::new(shader));
    }

    pub fn set_pixel_shader(&mut self, shader: impl Fn(&V, FloatType) -> Color + Send + Sync + 'static) {
        self.pixel_shader = Some(Box::new(shader));
    }

    /// Draws `num_vertexes` indices of the index buffer starting at `vertex_offset`,
    /// every three of them forming one triangle. Trailing indices that don't form
    /// a whole triangle are ignored.
    pub fn draw(&self, num_vertexes: usize, vertex_offset: usize) -> Result<(), RenderError> {
        let target = self
            .render_target
            .as_ref()
            .ok_or(RenderError::MissingRenderTarget)?;
        let vertex_buffer = self
            .vertex_buffer
            .as_ref()
            .ok_or(RenderError::MissingBuffer("vertex"))?;
        let index_buffer = self
            .index_buffer
            .as_ref()
            .ok_or(RenderError::MissingBuffer("index"))?;
        let vertex_shader = self
            .vertex_shader
            .as_ref()
            .ok_or(RenderError::MissingShader("vertex"))?;
        let pixel_shader = self
            .pixel_shader
            .as_ref()
            .ok_or(RenderError::MissingShader("pixel"))?;

        let mut target = target.lock().expect("Poisoned lock!");
        self.check_fits(target.width(), target.height())?;
        let mut depth_buffer = self
            .depth_buffer
            .as_ref()
            .map(|buffer| buffer.lock().expect("Poisoned lock!"));
        if let Some(depth_buffer) = &depth_buffer {
            self.check_fits(depth_buffer.width(), depth_buffer.height())?;
        }

        for first in (vertex_offset..vertex_offset + num_vertexes - num_vertexes % 3).step_by(3) {
            let mut screen_vertices = Vec::with_capacity(3);
            for i in first..first + 3 {
                let vertex = vertex_buffer.get(*index_buffer.get(i)? as usize)?;
                let position = vertex.position();
                let (clip, data) = vertex_shader(position.to_homogeneous(), vertex);
                screen_vertices.push(self.to_screen(clip, data));
            }

            // Triangles touching the camera plane or behind it are dropped, not clipped
            let Some([a, b, c]) = screen_vertices
                .into_iter()
                .collect::<Option<Vec<_>>>()
                .and_then(|v| <[_; 3]>::try_from(v).ok())
            else {
                continue;
            };

            self.fill_triangle(&a, &b, &c, |x, y, depth| {
                if let Some(depth_buffer) = depth_buffer.as_mut() {
                    let stored = &mut depth_buffer[(x, y)];
                    if depth >= *stored {
                        return;
                    }
                    *stored = depth;
                }
                target[(x, y)] = RT::from_color(pixel_shader(&a.data, depth));
            });
        }

        Ok(())
    }

    fn check_fits(&self, width: usize, height: usize) -> Result<(), RenderError> {
        if self.width > width || self.height > height {
            Err(RenderError::ViewportExceedsTarget {
                viewport_width: self.width,
                viewport_height: self.height,
                target_width: width,
                target_height: height,
            })
        } else {
            Ok(())
        }
    }

    /// Perspective divide and viewport transform.
    fn to_screen(&self, clip: Vector4<FloatType>, data: V) -> Option<ScreenVertex<V>> {
        if clip.w <= EPSILON {
            return None;
        }
        let ndc = clip.xyz() / clip.w;
        Some(ScreenVertex {
            position: ScreenPoint::new(
                (ndc.x + 1.0) * self.width as FloatType / 2.0,
                (1.0 - ndc.y) * self.height as FloatType / 2.0,
            ),
            depth: ndc.z,
            data,
        })
    }

    /// Calls `write` with coordinates and interpolated depth of every pixel whose center
    /// lies inside the triangle. Both windings are filled.
    fn fill_triangle(
        &self,
        a: &ScreenVertex<V>,
        b: &ScreenVertex<V>,
        c: &ScreenVertex<V>,
        mut write: impl FnMut(usize, usize, FloatType),
    ) {
        let area = edge_function(&a.position, &b.position, &c.position);
        if area == 0.0 {
            return;
        }

        let min = a.position.inf(&b.position).inf(&c.position);
        let max = a.position.sup(&b.position).sup(&c.position);
        let Some((x_range, y_range)) = clamp_range(min.x, max.x, self.width)
            .zip(clamp_range(min.y, max.y, self.height))
        else {
            return;
        };

        for y in y_range {
            for x in x_range.clone() {
                let p = ScreenPoint::new(x as FloatType + 0.5, y as FloatType + 0.5);
                let w0 = edge_function(&b.position, &c.position, &p) / area;
                let w1 = edge_function(&c.position, &a.position, &p) / area;
                let w2 = edge_function(&a.position, &b.position, &p) / area;

                // Dividing by the signed area makes the test independent of winding
                if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                    write(x, y, w0 * a.depth + w1 * b.depth + w2 * c.depth);
                }
            }
        }
    }
}

/// Twice the signed area of triangle (a, b, p).
fn edge_function(a: &ScreenPoint, b: &ScreenPoint, p: &ScreenPoint) -> FloatType {
    (p.x - a.x) * (b.y - a.y) - (p.y - a.y) * (b.x - a.x)
}

/// Pixel indices whose centers may lie in [min, max], clamped to [0, size).
fn clamp_range(
    min: FloatType,
    max: FloatType,
    size: usize,
) -> Option<std::ops::Range<usize>> {
    let start = (min - 0.5).ceil().max(0.0);
    let end = ((max - 0.5).floor() + 1.0).min(size as FloatType);
    if !(start < end) {
        return None;
    }
    Some(start as usize..end as usize)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        geometry::{WorldPoint, WorldVector},
        resource::ResourceError,
        scene::Vertex,
        util::UnsignedColor,
    };
    use assert2::{assert, let_assert};
    use test_case::test_case;

    const BACKGROUND: UnsignedColor = UnsignedColor {
        r: 111,
        g: 5,
        b: 243,
    };
    const RED: UnsignedColor = UnsignedColor { r: 255, g: 0, b: 0 };
    const GREEN: UnsignedColor = UnsignedColor { r: 0, g: 255, b: 0 };

    struct Setup {
        rasterizer: Rasterizer<Vertex, UnsignedColor>,
        target: SharedResource<UnsignedColor>,
        depth: SharedResource<FloatType>,
    }

    /// 8x8 viewport, vertex positions are used directly as normalized device coordinates.
    fn setup() -> Setup {
        let target = Resource::new(8, 8).into_shared();
        let depth = Resource::new(8, 8).into_shared();
        let mut rasterizer: Rasterizer<Vertex, UnsignedColor> = Rasterizer::new();
        rasterizer.set_viewport(8, 8);
        rasterizer.set_render_target(Arc::clone(&target), Some(Arc::clone(&depth)));
        rasterizer.set_vertex_shader(|position, vertex| (position, vertex.clone()));
        rasterizer.set_pixel_shader(|vertex, _z| vertex.ambient);
        rasterizer
            .clear_render_target(&BACKGROUND, FloatType::MAX)
            .unwrap();
        Setup {
            rasterizer,
            target,
            depth,
        }
    }

    fn colored_vertex(x: f32, y: f32, z: f32, color: UnsignedColor) -> Vertex {
        Vertex {
            position: WorldPoint::new(x, y, z),
            normal: WorldVector::zeros(),
            ambient: crate::util::unsigned_to_color(color),
            ..Vertex::default()
        }
    }

    /// Triangle covering the upper left half of the screen.
    fn half_screen(z: f32, color: UnsignedColor, clockwise: bool) -> Vec<Vertex> {
        let mut vertices = vec![
            colored_vertex(-1.0, -1.0, z, color),
            colored_vertex(1.0, 1.0, z, color),
            colored_vertex(-1.0, 1.0, z, color),
        ];
        if clockwise {
            vertices.swap(1, 2);
        }
        vertices
    }

    fn draw(setup: &mut Setup, vertices: Vec<Vertex>) {
        let count = vertices.len();
        setup
            .rasterizer
            .set_vertex_buffer(Arc::new(Resource::from_vec(vertices)));
        setup
            .rasterizer
            .set_index_buffer(Arc::new(Resource::from_vec((0..count as u32).collect())));
        setup.rasterizer.draw(count, 0).unwrap();
    }

    #[test]
    fn clear_sets_color_and_depth() {
        let setup = setup();
        assert!(setup.target.lock().unwrap().iter().all(|c| *c == BACKGROUND));
        assert!(setup.depth.lock().unwrap().iter().all(|d| *d == FloatType::MAX));
    }

    #[test_case(false ; "counter_clockwise")]
    #[test_case(true ; "clockwise")]
    fn fills_upper_left_triangle(clockwise: bool) {
        let mut setup = setup();
        draw(&mut setup, half_screen(0.5, RED, clockwise));

        let target = setup.target.lock().unwrap();
        // Upper left corner is inside, lower right outside
        assert!(target[(0, 0)] == RED);
        assert!(target[(1, 5)] == RED);
        assert!(target[(7, 7)] == BACKGROUND);
        assert!(target[(6, 2)] == BACKGROUND);

        let depth = setup.depth.lock().unwrap();
        assert!((depth[(0, 0)] - 0.5).abs() < 1e-6);
        assert!(depth[(7, 7)] == FloatType::MAX);
    }

    #[test_case(0.2, 0.7, RED ; "first_closer")]
    #[test_case(0.7, 0.2, GREEN ; "second_closer")]
    #[test_case(0.5, 0.5, RED ; "tie_keeps_first")]
    fn depth_test(first_z: f32, second_z: f32, expected: UnsignedColor) {
        let mut setup = setup();
        draw(&mut setup, half_screen(first_z, RED, false));
        draw(&mut setup, half_screen(second_z, GREEN, false));

        assert!(setup.target.lock().unwrap()[(0, 0)] == expected);
    }

    #[test]
    fn without_depth_buffer_last_wins() {
        let mut setup = setup();
        setup
            .rasterizer
            .set_render_target(Arc::clone(&setup.target), None);
        draw(&mut setup, half_screen(0.2, RED, false));
        draw(&mut setup, half_screen(0.7, GREEN, false));

        assert!(setup.target.lock().unwrap()[(0, 0)] == GREEN);
    }

    #[test]
    fn vertex_offset_selects_triangles() {
        let mut setup = setup();
        let mut vertices = half_screen(0.5, RED, false);
        vertices.extend(half_screen(0.1, GREEN, false));
        setup
            .rasterizer
            .set_vertex_buffer(Arc::new(Resource::from_vec(vertices)));
        setup
            .rasterizer
            .set_index_buffer(Arc::new(Resource::from_vec((0..6).collect())));

        setup.rasterizer.draw(3, 0).unwrap();
        assert!(setup.target.lock().unwrap()[(0, 0)] == RED);

        setup.rasterizer.draw(3, 3).unwrap();
        assert!(setup.target.lock().unwrap()[(0, 0)] == GREEN);
    }

    #[test]
    fn triangle_behind_camera_is_skipped() {
        let mut setup = setup();
        setup
            .rasterizer
            .set_vertex_shader(|position, vertex| (position.xyz().push(-1.0), vertex.clone()));
        draw(&mut setup, half_screen(0.5, RED, false));

        assert!(setup.target.lock().unwrap().iter().all(|c| *c == BACKGROUND));
    }

    #[test]
    fn triangle_partially_outside_is_clamped() {
        let mut setup = setup();
        draw(
            &mut setup,
            vec![
                colored_vertex(-3.0, -3.0, 0.5, RED),
                colored_vertex(3.0, -3.0, 0.5, RED),
                colored_vertex(0.0, 3.0, 0.5, RED),
            ],
        );

        assert!(setup.target.lock().unwrap()[(4, 7)] == RED);
    }

    #[test]
    fn invalid_index_is_error() {
        let mut setup = setup();
        setup
            .rasterizer
            .set_vertex_buffer(Arc::new(Resource::from_vec(half_screen(0.5, RED, false))));
        setup
            .rasterizer
            .set_index_buffer(Arc::new(Resource::from_vec(vec![0, 1, 5])));

        let_assert!(Err(RenderError::Resource(e)) = setup.rasterizer.draw(3, 0));
        assert!(e == ResourceError::OutOfBounds { index: 5, len: 3 });
    }

    #[test]
    fn missing_pieces_are_errors() {
        let rasterizer = Rasterizer::<Vertex, UnsignedColor>::new();
        let_assert!(Err(RenderError::MissingRenderTarget) = rasterizer.draw(3, 0));

        let mut setup = setup();
        let_assert!(Err(RenderError::MissingBuffer("vertex")) = setup.rasterizer.draw(3, 0));

        setup.rasterizer.vertex_shader = None;
        setup
            .rasterizer
            .set_vertex_buffer(Arc::new(Resource::from_vec(half_screen(0.5, RED, false))));
        setup
            .rasterizer
            .set_index_buffer(Arc::new(Resource::from_vec(vec![0, 1, 2])));
        let_assert!(Err(RenderError::MissingShader("vertex")) = setup.rasterizer.draw(3, 0));
    }

    #[test]
    fn viewport_larger_than_target() {
        let mut setup = setup();
        setup.rasterizer.set_viewport(9, 8);
        setup
            .rasterizer
            .set_vertex_buffer(Arc::new(Resource::from_vec(half_screen(0.5, RED, false))));
        setup
            .rasterizer
            .set_index_buffer(Arc::new(Resource::from_vec(vec![0, 1, 2])));
        let_assert!(
            Err(RenderError::ViewportExceedsTarget { .. }) = setup.rasterizer.draw(3, 0)
        );
    }
}
