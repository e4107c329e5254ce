//! Edge function-based triangle rasterization.
//!
//! This module implements triangle rasterization using the edge function algorithm,
//! which is the foundation of modern GPU rasterization. The algorithm tests each
//! pixel against three edge equations to determine triangle coverage.
//!
//! # Algorithm Overview
//!
//! 1. Compute a bounding box around the triangle, clamped to the buffer
//! 2. For each pixel in the bounding box, evaluate three edge functions
//! 3. A pixel is inside the triangle if all edge functions have the same sign
//!    (zero counts as inside, so shared edges are drawn by both triangles)
//!
//! # Edge Function
//!
//! For an edge from point A to point B, the edge function at point P is:
//!
//! ```text
//! E(P) = (P.x - A.x) * (B.y - A.y) - (P.y - A.y) * (B.x - A.x)
//! ```
//!
//! # Barycentric Coordinates
//!
//! The edge function values are proportional to barycentric coordinates:
//!
//! ```text
//! lambda_i = E_i(P) / (E_0 + E_1 + E_2)
//! ```
//!
//! Where E_i is the edge function for the edge opposite to vertex i.
//!
//! # References
//!
//! - Juan Pineda, "A Parallel Algorithm for Polygon Rasterization" (1988)
//! - Scratchapixel: <https://www.scratchapixel.com/lessons/3d-basic-rendering/rasterization-practical-implementation>

use super::{edge_function, Paint, Rasterizer, ScreenTriangle};
use crate::math::Vec3;
use crate::render::framebuffer::FrameBuffer;
use crate::shading::PixelShader;

/// Triangle rasterizer using the edge function algorithm.
///
/// Besides shaded fills it provides [`fill_depth`](Self::fill_depth), a
/// depth-only pass that never touches color.
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeFunctionRasterizer;

/// Pixels a triangle may cover, already clamped to a band.
struct Bounds {
    min_x: i32,
    max_x: i32,
    min_y: i32,
    max_y: i32,
}

impl EdgeFunctionRasterizer {
    pub fn new() -> Self {
        EdgeFunctionRasterizer
    }

    fn bounds(triangle: &ScreenTriangle, buffer: &FrameBuffer) -> Option<Bounds> {
        let [v0, v1, v2] = triangle.vertices.map(|v| v.position);
        let min_x = v0.x.min(v1.x).min(v2.x).ceil().max(0.0);
        let max_x = v0.x.max(v1.x).max(v2.x).floor().min(buffer.width() as f32 - 1.0);
        let min_y = v0.y.min(v1.y).min(v2.y).ceil().max(buffer.y_start() as f32);
        let max_y = v0.y.max(v1.y).max(v2.y).floor().min(buffer.y_end() as f32 - 1.0);

        (min_x <= max_x && min_y <= max_y).then(|| Bounds {
            min_x: min_x as i32,
            max_x: max_x as i32,
            min_y: min_y as i32,
            max_y: max_y as i32,
        })
    }

    /// Calls `visit` with the perspective weights `qᵢ = λᵢ / wᵢ` of every
    /// pixel inside the triangle.
    fn for_each_inside<F>(triangle: &ScreenTriangle, buffer: &mut FrameBuffer, mut visit: F)
    where
        F: FnMut(&mut FrameBuffer, i32, i32, [f32; 3]),
    {
        if !triangle.is_finite() {
            return;
        }
        let [v0, v1, v2] = triangle.vertices.map(|v| v.position);
        let area = edge_function(v0, v1, v2);
        if area.abs() < f32::EPSILON {
            return; // Degenerate triangle
        }
        let Some(bounds) = Self::bounds(triangle, buffer) else {
            return;
        };
        let inv_area = 1.0 / area;
        let inv_w = triangle.vertices.map(|v| v.one_over_w);

        for y in bounds.min_y..=bounds.max_y {
            for x in bounds.min_x..=bounds.max_x {
                let p = Vec3::new(x as f32, y as f32, 0.0);

                let w0 = edge_function(v1, v2, p);
                let w1 = edge_function(v2, v0, p);
                let w2 = edge_function(v0, v1, p);

                // Inside test (handles both CW and CCW winding)
                let inside = if area > 0.0 {
                    w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0
                } else {
                    w0 <= 0.0 && w1 <= 0.0 && w2 <= 0.0
                };

                if inside {
                    let q = [
                        w0 * inv_area * inv_w[0],
                        w1 * inv_area * inv_w[1],
                        w2 * inv_area * inv_w[2],
                    ];
                    visit(buffer, x, y, q);
                }
            }
        }
    }

    /// Writes interpolated depth for every covered pixel that passes the
    /// depth test. Returns the number of pixels written.
    pub fn fill_depth(&self, triangle: &ScreenTriangle, buffer: &mut FrameBuffer) -> u32 {
        let mut written = 0;
        Self::for_each_inside(triangle, buffer, |buffer, x, y, q| {
            if let Some(depth) = triangle.depth(q) {
                if buffer.set_depth(x, y, depth) {
                    written += 1;
                }
            }
        });
        written
    }
}

impl Rasterizer for EdgeFunctionRasterizer {
    fn fill_triangle<S: PixelShader>(
        &self,
        triangle: &ScreenTriangle,
        buffer: &mut FrameBuffer,
        shader: &S,
    ) -> u32 {
        let paint = Paint::for_triangle(triangle, shader);
        let mut written = 0;
        Self::for_each_inside(triangle, buffer, |buffer, x, y, q| {
            if triangle.shade_pixel(buffer, x, y, q, &paint) {
                written += 1;
            }
        });
        written
    }
}
