use std::path::Path;

use crate::colors;
use crate::error::{RenderError, Result};
use crate::math::{Vec2, Vec3};

/// A grid of packed ARGB texels with top-left origin.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    data: Vec<u32>,
    width: u32,
    height: u32,
}

impl Texture {
    pub fn from_pixels(width: u32, height: u32, data: Vec<u32>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidTexture(format!(
                "zero-sized texture {width}x{height}"
            )));
        }
        if data.len() != width as usize * height as usize {
            return Err(RenderError::InvalidTexture(format!(
                "{} texels for a {width}x{height} texture",
                data.len()
            )));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Single-texel texture, handy for constant material maps.
    pub fn solid(color: u32) -> Self {
        Self {
            data: vec![color],
            width: 1,
            height: 1,
        }
    }

    /// Load a texture from an image file (PNG, JPG, etc.)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let img = image::open(path)
            .map_err(|source| RenderError::TextureLoad {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgba8();
        let (width, height) = img.dimensions();

        // RGBA bytes to ARGB u32
        let data: Vec<u32> = img
            .pixels()
            .map(|p| {
                let [r, g, b, a] = p.0;
                ((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | (b as u32)
            })
            .collect();

        log::debug!("loaded texture {} ({width}x{height})", path.display());
        Self::from_pixels(width, height, data)
    }

    /// Texel at integer coordinates, clamped into the grid.
    #[inline]
    pub fn texel(&self, x: i32, y: i32) -> u32 {
        let x = x.clamp(0, self.width as i32 - 1) as u32;
        let y = y.clamp(0, self.height as i32 - 1) as u32;
        self.data[(y * self.width + x) as usize]
    }

    /// Nearest-neighbour lookup.
    ///
    /// V grows upward in mesh files while rows grow downward, so V is
    /// flipped. Coordinates outside `[0, 1]` clamp to the border texel.
    #[inline]
    pub fn sample(&self, uv: Vec2) -> u32 {
        let x = (uv.x * self.width as f32).floor();
        let y = ((1.0 - uv.y) * self.height as f32).floor();
        // NaN casts to 0 and infinities saturate, so the clamp in texel() holds
        self.texel(x as i32, y as i32)
    }

    /// Sampled texel as normalized `(rgb, alpha)`.
    #[inline]
    pub fn sample_rgba(&self, uv: Vec2) -> (Vec3, f32) {
        let (r, g, b, a) = colors::unpack_color(self.sample(uv));
        (Vec3::new(r, g, b), a)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker() -> Texture {
        // row 0: red green, row 1: blue white
        Texture::from_pixels(
            2,
            2,
            vec![0xFFFF_0000, 0xFF00_FF00, 0xFF00_00FF, 0xFFFF_FFFF],
        )
        .unwrap()
    }

    #[test]
    fn v_is_flipped() {
        let tex = checker();
        assert_eq!(tex.sample(Vec2::new(0.25, 0.75)), 0xFFFF_0000);
        assert_eq!(tex.sample(Vec2::new(0.25, 0.25)), 0xFF00_00FF);
        assert_eq!(tex.sample(Vec2::new(0.75, 0.25)), 0xFFFF_FFFF);
    }

    #[test]
    fn out_of_range_uv_clamps_to_border() {
        let tex = checker();
        assert_eq!(tex.sample(Vec2::new(-3.0, 5.0)), 0xFFFF_0000);
        assert_eq!(tex.sample(Vec2::new(1.0, 0.0)), 0xFFFF_FFFF);
        assert_eq!(tex.sample(Vec2::new(f32::NAN, 2.0)), 0xFFFF_0000);
    }

    #[test]
    fn mismatched_dimensions_are_rejected() {
        assert!(Texture::from_pixels(2, 2, vec![0; 3]).is_err());
        assert!(Texture::from_pixels(0, 2, vec![]).is_err());
    }

    #[test]
    fn sample_rgba_splits_alpha() {
        let tex = Texture::solid(0x8000_FF00);
        let (rgb, a) = tex.sample_rgba(Vec2::new(0.5, 0.5));
        assert_eq!(rgb, Vec3::new(0.0, 1.0, 0.0));
        assert!((a - 128.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = Texture::from_file("does/not/exist.png").unwrap_err();
        assert!(matches!(err, RenderError::TextureLoad { .. }));
    }
}
