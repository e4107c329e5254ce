//! Packed ARGB8888 color helpers.

use crate::math::Vec3;

pub const BLACK: u32 = 0xFF00_0000;
pub const WHITE: u32 = 0xFFFF_FFFF;

/// Packs normalized channels into `0xAARRGGBB`, clamping each to `[0, 1]`.
#[inline]
pub fn pack_color(r: f32, g: f32, b: f32, a: f32) -> u32 {
    (quantize(a) << 24) | (quantize(r) << 16) | (quantize(g) << 8) | quantize(b)
}

/// Opaque color from a linear RGB vector.
#[inline]
pub fn pack_vec3(color: Vec3) -> u32 {
    pack_color(color.x, color.y, color.z, 1.0)
}

/// Splits `0xAARRGGBB` into normalized `(r, g, b, a)`.
#[inline]
pub fn unpack_color(color: u32) -> (f32, f32, f32, f32) {
    let channel = |shift: u32| ((color >> shift) & 0xFF) as f32 / 255.0;
    (channel(16), channel(8), channel(0), channel(24))
}

/// RGB part of a packed color as a vector; alpha is dropped.
#[inline]
pub fn unpack_vec3(color: u32) -> Vec3 {
    let (r, g, b, _) = unpack_color(color);
    Vec3::new(r, g, b)
}

/// Maps `[0, 1]` to `[0, 255]`; NaN becomes 0.
#[inline]
fn quantize(channel: f32) -> u32 {
    if channel.is_nan() {
        return 0;
    }
    (channel.clamp(0.0, 1.0) * 255.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_clamps_out_of_range_channels() {
        assert_eq!(pack_color(2.0, -1.0, 0.5, 1.0), 0xFFFF_0080);
        assert_eq!(pack_vec3(Vec3::splat(f32::NAN)), BLACK);
    }

    #[test]
    fn unpack_inverts_pack() {
        let (r, g, b, a) = unpack_color(0x80FF_0000);
        assert_eq!((r, g, b), (1.0, 0.0, 0.0));
        assert!((a - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(pack_vec3(unpack_vec3(WHITE)), WHITE);
    }
}
