//! Triangle rasterization algorithms.
//!
//! This module provides multiple rasterizer implementations that can be
//! swapped at runtime for testing and benchmarking purposes.
//!
//! Available algorithms:
//! - [`ScanlineRasterizer`]: Long edge against short edges, one row at a time
//! - [`EdgeFunctionRasterizer`]: Bounding box iteration with edge function tests
//!
//! Both sample pixels at integer coordinates, interpolate attributes
//! perspective-correctly and depth test with a strict greater-than.

mod edgefunction;
mod scanline;

pub use edgefunction::EdgeFunctionRasterizer;
pub use scanline::ScanlineRasterizer;

use super::framebuffer::FrameBuffer;
use crate::colors::pack_vec3;
use crate::math::{Vec2, Vec3};
use crate::shading::{Fragment, PixelShader};

/// A triangle corner after projection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScreenVertex {
    /// Pixel x and y; z holds the view-space depth.
    pub position: Vec3,
    /// Reciprocal of clip-space w, the weight for perspective correction.
    pub one_over_w: f32,
    /// World-space normal.
    pub normal: Vec3,
    pub uv: Vec2,
}

impl ScreenVertex {
    /// A vertex with unit w and no normal or texture coordinate.
    pub fn at(x: f32, y: f32, depth: f32) -> Self {
        Self {
            position: Vec3::new(x, y, depth),
            one_over_w: 1.0,
            normal: Vec3::ZERO,
            uv: Vec2::ZERO,
        }
    }
}

/// A triangle ready for rasterization in screen space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScreenTriangle {
    pub vertices: [ScreenVertex; 3],
    /// Unit world-space normal of the whole face.
    pub face_normal: Vec3,
}

impl ScreenTriangle {
    pub fn new(vertices: [ScreenVertex; 3], face_normal: Vec3) -> Self {
        Self {
            vertices,
            face_normal,
        }
    }

    /// Twice the signed screen-space area.
    #[inline]
    pub fn signed_area(&self) -> f32 {
        let [a, b, c] = self.vertices.map(|v| v.position);
        edge_function(a, b, c)
    }

    /// Smallest and largest screen y.
    #[inline]
    pub fn y_range(&self) -> (f32, f32) {
        let [a, b, c] = self.vertices.map(|v| v.position.y);
        (a.min(b).min(c), a.max(b).max(c))
    }

    /// Whether any of the rows `y_start..y_end` can contain a sample.
    #[inline]
    pub fn overlaps_rows(&self, y_start: u32, y_end: u32) -> bool {
        let (min_y, max_y) = self.y_range();
        max_y >= y_start as f32 && min_y.ceil() < y_end as f32
    }

    fn is_finite(&self) -> bool {
        self.vertices
            .iter()
            .all(|v| v.position.is_finite() && v.one_over_w.is_finite())
    }

    /// Interpolated depth from perspective weights `q[i] = λᵢ / wᵢ`.
    #[inline]
    fn depth(&self, q: [f32; 3]) -> Option<f32> {
        let sum = q[0] + q[1] + q[2];
        if sum == 0.0 || !sum.is_finite() {
            return None;
        }
        let [a, b, c] = &self.vertices;
        Some((a.position.z * q[0] + b.position.z * q[1] + c.position.z * q[2]) / sum)
    }

    /// Interpolated fragment from perspective weights `q[i] = λᵢ / wᵢ`.
    ///
    /// Every attribute is `Σ qᵢ·Aᵢ / Σ qᵢ`, which is linear in object space
    /// rather than in screen space.
    #[inline]
    fn fragment(&self, x: i32, y: i32, q: [f32; 3]) -> Option<Fragment> {
        let sum = q[0] + q[1] + q[2];
        if sum == 0.0 || !sum.is_finite() {
            return None;
        }
        let inv = 1.0 / sum;
        let [a, b, c] = &self.vertices;
        Some(Fragment {
            x: x as f32,
            y: y as f32,
            depth: (a.position.z * q[0] + b.position.z * q[1] + c.position.z * q[2]) / sum,
            normal: (a.normal * q[0] + b.normal * q[1] + c.normal * q[2]) * inv,
            face_normal: self.face_normal,
            uv: (a.uv * q[0] + b.uv * q[1] + c.uv * q[2]) * inv,
        })
    }

    /// Colors and writes one pixel if it survives the depth test.
    #[inline]
    fn shade_pixel<S: PixelShader>(
        &self,
        buffer: &mut FrameBuffer,
        x: i32,
        y: i32,
        q: [f32; 3],
        paint: &Paint<'_, S>,
    ) -> bool {
        match paint {
            Paint::Constant(color) => match self.depth(q) {
                Some(depth) => buffer.set_pixel_with_depth(x, y, depth, *color),
                None => false,
            },
            Paint::Shaded(shader) => {
                let Some(fragment) = self.fragment(x, y, q) else {
                    return false;
                };
                if !buffer.passes_depth(x, y, fragment.depth) {
                    return false;
                }
                let color = pack_vec3(shader.shade(&fragment));
                buffer.set_pixel_with_depth(x, y, fragment.depth, color)
            }
        }
    }
}

/// Where the pixels of one triangle get their color, decided before the
/// pixel walk.
enum Paint<'s, S> {
    /// Packed once for the whole triangle.
    Constant(u32),
    Shaded(&'s S),
}

impl<'s, S: PixelShader> Paint<'s, S> {
    fn for_triangle(triangle: &ScreenTriangle, shader: &'s S) -> Self {
        match shader.triangle_color(triangle.face_normal) {
            Some(color) => Paint::Constant(pack_vec3(color)),
            None => Paint::Shaded(shader),
        }
    }
}

/// Signed area of the parallelogram spanned by (B - A) and (P - A).
///
/// Positive when P is to the left of AB with y pointing down.
#[inline]
pub(crate) fn edge_function(a: Vec3, b: Vec3, p: Vec3) -> f32 {
    (p.x - a.x) * (b.y - a.y) - (p.y - a.y) * (b.x - a.x)
}

/// Trait for triangle rasterization algorithms.
///
/// Implementors define how triangles are filled into a pixel buffer.
/// This allows swapping between different rasterization strategies
/// (scanline, edge functions, etc.) for testing and benchmarking.
pub trait Rasterizer {
    /// Fill a triangle into the frame buffer, returning the number of pixels
    /// that passed the depth test.
    ///
    /// Only rows inside the buffer's band are touched.
    fn fill_triangle<S: PixelShader>(
        &self,
        triangle: &ScreenTriangle,
        buffer: &mut FrameBuffer,
        shader: &S,
    ) -> u32;
}

/// Available rasterization algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RasterizerType {
    /// Walks each row between the long edge and the short edges, stepping
    /// the perspective weights incrementally along the span.
    #[default]
    Scanline,
    /// Edge function rasterizer that tests each pixel in the bounding box.
    /// Simpler algorithm, forms the basis for GPU rasterization.
    EdgeFunction,
}

impl std::fmt::Display for RasterizerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RasterizerType::Scanline => write!(f, "Scanline"),
            RasterizerType::EdgeFunction => write!(f, "EdgeFunction"),
        }
    }
}

/// Holds both rasterizer implementations and forwards to the active one.
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterizerDispatcher {
    scanline: ScanlineRasterizer,
    edge_function: EdgeFunctionRasterizer,
    active: RasterizerType,
}

impl RasterizerDispatcher {
    pub fn new(rasterizer_type: RasterizerType) -> Self {
        Self {
            scanline: ScanlineRasterizer::new(),
            edge_function: EdgeFunctionRasterizer::new(),
            active: rasterizer_type,
        }
    }

    pub fn set_type(&mut self, rasterizer_type: RasterizerType) {
        self.active = rasterizer_type;
    }

    pub fn active_type(&self) -> RasterizerType {
        self.active
    }

    /// Depth-only fill, always through the bounding-box rasterizer.
    pub fn fill_depth(&self, triangle: &ScreenTriangle, buffer: &mut FrameBuffer) -> u32 {
        self.edge_function.fill_depth(triangle, buffer)
    }
}

impl Rasterizer for RasterizerDispatcher {
    #[inline]
    fn fill_triangle<S: PixelShader>(
        &self,
        triangle: &ScreenTriangle,
        buffer: &mut FrameBuffer,
        shader: &S,
    ) -> u32 {
        match self.active {
            RasterizerType::Scanline => self.scanline.fill_triangle(triangle, buffer, shader),
            RasterizerType::EdgeFunction => {
                self.edge_function.fill_triangle(triangle, buffer, shader)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::render::framebuffer::BufferPair;

    /// Paints every covered pixel white.
    pub struct White;

    impl PixelShader for White {
        fn shade(&self, _fragment: &Fragment) -> Vec3 {
            Vec3::ONE
        }
    }

    /// Colors each pixel by its interpolated uv, to check interpolation.
    pub struct UvColor;

    impl PixelShader for UvColor {
        fn shade(&self, fragment: &Fragment) -> Vec3 {
            Vec3::new(fragment.uv.x, fragment.uv.y, 0.0)
        }
    }

    /// Resolves every triangle to one color; per-pixel shading is a bug.
    pub struct PerTriangle;

    impl PixelShader for PerTriangle {
        fn shade(&self, _fragment: &Fragment) -> Vec3 {
            panic!("shade called for a triangle with a constant color")
        }

        fn triangle_color(&self, _face_normal: Vec3) -> Option<Vec3> {
            Some(Vec3::ONE)
        }
    }

    pub fn flat_triangle(points: [(f32, f32); 3], depth: f32) -> ScreenTriangle {
        ScreenTriangle::new(
            points.map(|(x, y)| ScreenVertex::at(x, y, depth)),
            Vec3::FORWARD,
        )
    }

    pub fn written(pair: &BufferPair) -> usize {
        pair.depth().iter().filter(|d| d.is_finite()).count()
    }

    /// Same triangle drawn into a fresh pair, compared pixel by pixel.
    pub fn assert_idempotent<R: Rasterizer>(rasterizer: &R, triangle: &ScreenTriangle) {
        let mut once = BufferPair::new(0, 64, 64);
        rasterizer.fill_triangle(triangle, &mut once.as_framebuffer(), &White);

        let mut twice = BufferPair::new(1, 64, 64);
        rasterizer.fill_triangle(triangle, &mut twice.as_framebuffer(), &White);
        let second = rasterizer.fill_triangle(triangle, &mut twice.as_framebuffer(), &White);

        assert_eq!(second, 0);
        assert_eq!(once.color(), twice.color());
        assert_eq!(once.depth(), twice.depth());
    }
}
