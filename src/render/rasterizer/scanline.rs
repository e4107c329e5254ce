//! Scanline-based triangle rasterization.
//!
//! # Algorithm Overview
//!
//! The scanline algorithm processes triangles one horizontal line at a time:
//!
//! 1. **Sort vertices** by Y coordinate (top to bottom in screen space)
//! 2. **Walk the edges**: the long edge v0→v2 bounds one side of every row,
//!    the short edges v0→v1 and v1→v2 bound the other side above and below v1
//! 3. **Fill the span** between the two bounds, left to right, inclusive
//!
//! ```text
//!        v0
//!        /\
//!       /  \  long edge v0→v2
//!      /    \
//!    v1 ---- \ <- short edge switches at v1.y
//!        \    \
//!         \    \
//!          \    \
//!           \____\
//!                 v2
//! ```
//!
//! No split into flat-top and flat-bottom halves is needed; the short edge is
//! chosen per row.
//!
//! # Incremental Interpolation
//!
//! Barycentric weights are affine in screen space, so along a row each one
//! changes by a constant amount per pixel. The rasterizer tracks the
//! perspective weights `qᵢ = λᵢ / wᵢ` instead, which are also affine: they
//! are evaluated once at the start of each span and stepped by a constant
//! delta per pixel. Any attribute is then `Σ qᵢ·Aᵢ / Σ qᵢ`.
//!
//! # Comparison with Edge Function Rasterization
//!
//! | Aspect | Scanline | Edge Function |
//! |--------|----------|---------------|
//! | Approach | Process rows sequentially | Test each pixel independently |
//! | Thin triangles | Only touches covered pixels | Tests the empty bounding box |
//! | Per pixel cost | Three additions | Three edge functions |
//!
//! # References
//!
//! - Foley, van Dam et al., "Computer Graphics: Principles and Practice"
//! - Abrash, Michael, "Graphics Programming Black Book"

use super::{edge_function, Paint, Rasterizer, ScreenTriangle, ScreenVertex};
use crate::math::Vec3;
use crate::render::framebuffer::FrameBuffer;
use crate::shading::PixelShader;

/// Scanline-based triangle rasterizer.
///
/// Handles vertex sorting internally, so input triangles can have vertices
/// in any order and either winding.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanlineRasterizer;

impl ScanlineRasterizer {
    pub fn new() -> Self {
        Self
    }

    /// Sorts three vertices by Y coordinate (ascending: top to bottom in screen space).
    ///
    /// Three compare-and-swaps; equal keys keep their order.
    fn sort_vertices(v0: &mut ScreenVertex, v1: &mut ScreenVertex, v2: &mut ScreenVertex) {
        if v1.position.y < v0.position.y {
            std::mem::swap(v0, v1);
        }
        if v2.position.y < v1.position.y {
            std::mem::swap(v1, v2);
        }
        if v1.position.y < v0.position.y {
            std::mem::swap(v0, v1);
        }
    }

    /// X where edge a→b crosses row `y`. A horizontal edge yields its start.
    #[inline]
    fn edge_x(a: Vec3, b: Vec3, y: f32) -> f32 {
        let height = b.y - a.y;
        if height.abs() < f32::EPSILON {
            a.x
        } else {
            a.x + (b.x - a.x) * (y - a.y) / height
        }
    }
}

impl Rasterizer for ScanlineRasterizer {
    fn fill_triangle<S: PixelShader>(
        &self,
        triangle: &ScreenTriangle,
        buffer: &mut FrameBuffer,
        shader: &S,
    ) -> u32 {
        if !triangle.is_finite() {
            return 0;
        }

        let [mut v0, mut v1, mut v2] = triangle.vertices;
        Self::sort_vertices(&mut v0, &mut v1, &mut v2);
        let sorted = ScreenTriangle::new([v0, v1, v2], triangle.face_normal);
        let (p0, p1, p2) = (v0.position, v1.position, v2.position);

        // Zero area also covers all three vertices on one scanline
        let area = edge_function(p0, p1, p2);
        if area.abs() < f32::EPSILON {
            return 0;
        }

        let y_first = p0.y.ceil().max(buffer.y_start() as f32);
        let y_last = p2.y.floor().min(buffer.y_end() as f32 - 1.0);
        if y_first > y_last {
            return 0;
        }

        // Per-pixel change of each qᵢ along a row: dλᵢ/dx · (1/wᵢ)
        let inv_area = 1.0 / area;
        let dq_dx = [
            (p2.y - p1.y) * inv_area * v0.one_over_w,
            (p0.y - p2.y) * inv_area * v1.one_over_w,
            (p1.y - p0.y) * inv_area * v2.one_over_w,
        ];

        let paint = Paint::for_triangle(triangle, shader);
        let x_limit = buffer.width() as f32 - 1.0;
        let mut written = 0;

        for y in y_first as i32..=y_last as i32 {
            let row = y as f32;
            let x_long = Self::edge_x(p0, p2, row);
            let x_short = if row < p1.y {
                Self::edge_x(p0, p1, row)
            } else {
                Self::edge_x(p1, p2, row)
            };
            let (x_left, x_right) = if x_long < x_short {
                (x_long, x_short)
            } else {
                (x_short, x_long)
            };

            let x_start = x_left.ceil().max(0.0);
            let x_end = x_right.floor().min(x_limit);
            if x_start > x_end {
                continue;
            }

            let start = Vec3::new(x_start, row, 0.0);
            let mut q = [
                edge_function(p1, p2, start) * inv_area * v0.one_over_w,
                edge_function(p2, p0, start) * inv_area * v1.one_over_w,
                edge_function(p0, p1, start) * inv_area * v2.one_over_w,
            ];

            for x in x_start as i32..=x_end as i32 {
                if sorted.shade_pixel(buffer, x, y, q, &paint) {
                    written += 1;
                }
                q[0] += dq_dx[0];
                q[1] += dq_dx[1];
                q[2] += dq_dx[2];
            }
        }

        written
    }
}
