//! Color and depth storage.
//!
//! [`BufferPair`] owns one frame's color and depth buffers; they are cleared,
//! filled, presented and recycled as a unit. [`FrameBuffer`] is a borrowed
//! view over a horizontal band of a pair, so several threads can each fill
//! their own rows of the same frame.
//!
//! # Depth Buffer
//!
//! The depth buffer stores view-space z for each pixel. The camera looks down
//! -Z, so every visible depth is negative and a larger value is nearer. A
//! cleared buffer holds negative infinity.

use rayon::prelude::*;

/// An owned color buffer and its matching depth buffer.
#[derive(Debug, Clone)]
pub struct BufferPair {
    id: usize,
    width: u32,
    height: u32,
    color: Vec<u32>,
    depth: Vec<f32>,
}

impl BufferPair {
    pub fn new(id: usize, width: u32, height: u32) -> Self {
        let len = (width * height) as usize;
        Self {
            id,
            width,
            height,
            color: vec![0; len],
            depth: vec![f32::NEG_INFINITY; len],
        }
    }

    /// Position of this pair in its pool, stable for its lifetime.
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Fills color with `background` and depth with negative infinity.
    pub fn clear(&mut self, background: u32) {
        self.color.fill(background);
        self.depth.fill(f32::NEG_INFINITY);
    }

    pub fn color(&self) -> &[u32] {
        &self.color
    }

    pub fn depth(&self) -> &[f32] {
        &self.depth
    }

    /// Color buffer as ARGB8888 bytes in native endianness, the layout SDL
    /// streaming textures expect.
    pub fn color_bytes(&self) -> Vec<u8> {
        self.color.iter().flat_map(|c| c.to_ne_bytes()).collect()
    }

    #[inline]
    pub fn pixel(&self, x: i32, y: i32) -> Option<u32> {
        self.index(x, y).map(|i| self.color[i])
    }

    #[inline]
    pub fn depth_at(&self, x: i32, y: i32) -> Option<f32> {
        self.index(x, y).map(|i| self.depth[i])
    }

    /// A view over the whole pair.
    pub fn as_framebuffer(&mut self) -> FrameBuffer<'_> {
        FrameBuffer::band(
            &mut self.color,
            &mut self.depth,
            self.width,
            self.height,
            0,
        )
    }

    /// Splits the pair into disjoint bands of `rows` scanlines (the last may
    /// be shorter) that can be filled in parallel.
    pub fn par_bands(&mut self, rows: usize) -> impl IndexedParallelIterator<Item = FrameBuffer<'_>> {
        let width = self.width;
        let height = self.height;
        let rows = rows.max(1);
        let band_len = (rows * width as usize).max(1);
        self.color
            .par_chunks_mut(band_len)
            .zip(self.depth.par_chunks_mut(band_len))
            .enumerate()
            .map(move |(i, (color, depth))| {
                FrameBuffer::band(color, depth, width, height, (i * rows) as u32)
            })
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x >= 0 && x < self.width as i32 && y >= 0 && y < self.height as i32 {
            Some((y as u32 * self.width + x as u32) as usize)
        } else {
            None
        }
    }
}

/// A view into the rows `y_start..y_end` of a color/depth pair.
///
/// Coordinates passed to its methods are frame coordinates; pixels outside
/// the band are silently ignored, so a rasterizer can walk a triangle
/// without knowing how the frame was split.
pub struct FrameBuffer<'a> {
    color_buffer: &'a mut [u32],
    depth_buffer: &'a mut [f32],
    width: u32,
    height: u32,
    y_start: u32,
    y_end: u32,
}

impl<'a> FrameBuffer<'a> {
    /// A view whose first row is frame row `y_start`. The band height is
    /// derived from the slice length.
    pub fn band(
        color_buffer: &'a mut [u32],
        depth_buffer: &'a mut [f32],
        width: u32,
        height: u32,
        y_start: u32,
    ) -> Self {
        debug_assert_eq!(
            color_buffer.len(),
            depth_buffer.len(),
            "Color and depth bands differ in size"
        );
        let rows = if width == 0 {
            0
        } else {
            color_buffer.len() as u32 / width
        };
        Self {
            color_buffer,
            depth_buffer,
            width,
            height,
            y_start,
            y_end: (y_start + rows).min(height),
        }
    }

    /// Frame width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height, not band height.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// First frame row in this band.
    pub fn y_start(&self) -> u32 {
        self.y_start
    }

    /// One past the last frame row in this band.
    pub fn y_end(&self) -> u32 {
        self.y_end
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x >= 0 && x < self.width as i32 && y >= self.y_start as i32 && y < self.y_end as i32 {
            Some(((y as u32 - self.y_start) * self.width + x as u32) as usize)
        } else {
            None
        }
    }

    /// Whether a fragment at `depth` would be visible at (x, y).
    #[inline]
    pub fn passes_depth(&self, x: i32, y: i32, depth: f32) -> bool {
        self.index(x, y)
            .is_some_and(|idx| depth > self.depth_buffer[idx])
    }

    /// Set a pixel at (x, y) with depth testing.
    ///
    /// The pixel is only written if `depth` is strictly greater than the
    /// stored depth, and color and depth are updated together. Returns whether
    /// anything was written.
    #[inline]
    pub fn set_pixel_with_depth(&mut self, x: i32, y: i32, depth: f32, color: u32) -> bool {
        match self.index(x, y) {
            Some(idx) if depth > self.depth_buffer[idx] => {
                self.depth_buffer[idx] = depth;
                self.color_buffer[idx] = color;
                true
            }
            _ => false,
        }
    }

    /// Depth-tested write that leaves color alone.
    #[inline]
    pub fn set_depth(&mut self, x: i32, y: i32, depth: f32) -> bool {
        match self.index(x, y) {
            Some(idx) if depth > self.depth_buffer[idx] => {
                self.depth_buffer[idx] = depth;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_resets_color_and_depth_together() {
        let mut pair = BufferPair::new(0, 4, 3);
        pair.as_framebuffer().set_pixel_with_depth(1, 1, -2.0, 0xFFFF_0000);
        pair.clear(0xFF00_00FF);
        assert!(pair.color().iter().all(|&c| c == 0xFF00_00FF));
        assert!(pair.depth().iter().all(|&d| d == f32::NEG_INFINITY));
    }

    #[test]
    fn depth_test_is_strict() {
        let mut pair = BufferPair::new(0, 2, 2);
        let mut fb = pair.as_framebuffer();
        assert!(fb.set_pixel_with_depth(0, 0, -5.0, 1));
        assert!(!fb.set_pixel_with_depth(0, 0, -5.0, 2));
        assert!(!fb.set_pixel_with_depth(0, 0, -6.0, 3));
        assert!(fb.set_pixel_with_depth(0, 0, -4.0, 4));
        assert_eq!(pair.pixel(0, 0), Some(4));
        assert_eq!(pair.depth_at(0, 0), Some(-4.0));
    }

    #[test]
    fn out_of_bounds_writes_are_ignored() {
        let mut pair = BufferPair::new(0, 2, 2);
        let mut fb = pair.as_framebuffer();
        assert!(!fb.set_pixel_with_depth(-1, 0, 0.0, 1));
        assert!(!fb.set_depth(0, 2, 0.0));
        assert!(!fb.passes_depth(2, 0, 0.0));
        assert!(pair.color().iter().all(|&c| c == 0));
    }

    #[test]
    fn bands_cover_frame_without_overlap() {
        let mut pair = BufferPair::new(0, 3, 7);
        let ranges: Vec<(u32, u32)> = pair
            .par_bands(3)
            .map(|fb| (fb.y_start(), fb.y_end()))
            .collect();
        assert_eq!(ranges, vec![(0, 3), (3, 6), (6, 7)]);
    }

    #[test]
    fn band_writes_use_frame_coordinates() {
        let mut pair = BufferPair::new(0, 2, 4);
        pair.par_bands(2).for_each(|mut fb| {
            for y in 0..4 {
                fb.set_pixel_with_depth(1, y, 0.0, 10 + y as u32);
            }
        });
        for y in 0..4 {
            assert_eq!(pair.pixel(1, y), Some(10 + y as u32));
            assert_eq!(pair.pixel(0, y), Some(0));
        }
    }

    #[test]
    fn color_bytes_are_native_argb() {
        let mut pair = BufferPair::new(0, 1, 1);
        pair.clear(0x1122_3344);
        assert_eq!(pair.color_bytes(), 0x1122_3344u32.to_ne_bytes().to_vec());
    }
}
