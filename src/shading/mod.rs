//! Pixel shaders.
//!
//! The rasterizer walks the covered pixels and interpolates attributes; a
//! [`PixelShader`] turns each resulting [`Fragment`] into a linear RGB color.
//! This mirrors the split between fixed-function rasterization and
//! programmable fragment shaders on a GPU.
//!
//! Available shaders:
//! - [`FlatShader`]: one Lambert term per triangle, resolved before the pixel walk
//! - [`PhongShader`]: ambient + diffuse + specular per pixel
//! - [`PbrShader`]: Cook-Torrance with GGX, Smith-Schlick and Schlick Fresnel

mod flat;
mod pbr;
mod phong;

pub use flat::FlatShader;
pub use pbr::PbrShader;
pub use phong::PhongShader;

use crate::math::{Vec2, Vec3};
use crate::scene::{FrameTransforms, SceneParams, ShadingModel};

/// Everything the rasterizer knows about one covered pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fragment {
    /// Pixel column.
    pub x: f32,
    /// Pixel row.
    pub y: f32,
    /// View-space z; negative, larger is nearer.
    pub depth: f32,
    /// Interpolated world normal, not normalized.
    pub normal: Vec3,
    /// World normal of the whole triangle.
    pub face_normal: Vec3,
    pub uv: Vec2,
}

/// Per-pixel shading contract.
///
/// Shaders are shared by every band worker of a frame, hence `Sync`. The
/// returned color is linear and unclamped; quantisation to 8 bits happens
/// when the pixel is written.
pub trait PixelShader: Sync {
    fn shade(&self, fragment: &Fragment) -> Vec3;

    /// A color for every pixel of a triangle, given its unit world face
    /// normal. When this returns `Some`, rasterizers paint it directly and
    /// never build fragments or call [`shade`](Self::shade) for the triangle.
    fn triangle_color(&self, _face_normal: Vec3) -> Option<Vec3> {
        None
    }
}

impl<S: PixelShader + ?Sized> PixelShader for &S {
    #[inline]
    fn shade(&self, fragment: &Fragment) -> Vec3 {
        (**self).shade(fragment)
    }

    #[inline]
    fn triangle_color(&self, face_normal: Vec3) -> Option<Vec3> {
        (**self).triangle_color(face_normal)
    }
}

/// The shader selected by a scene, dispatched without boxing.
pub enum SceneShader<'a> {
    Flat(FlatShader),
    Phong(PhongShader<'a>),
    Pbr(PbrShader<'a>),
}

impl<'a> SceneShader<'a> {
    pub fn new(scene: &'a SceneParams, frame: &'a FrameTransforms) -> Self {
        match scene.shading {
            ShadingModel::Flat => SceneShader::Flat(FlatShader::new(scene.flat, scene.light)),
            ShadingModel::Phong => SceneShader::Phong(PhongShader::new(scene, frame)),
            ShadingModel::Pbr => SceneShader::Pbr(PbrShader::new(scene, frame)),
        }
    }
}

impl PixelShader for SceneShader<'_> {
    #[inline]
    fn shade(&self, fragment: &Fragment) -> Vec3 {
        match self {
            SceneShader::Flat(s) => s.shade(fragment),
            SceneShader::Phong(s) => s.shade(fragment),
            SceneShader::Pbr(s) => s.shade(fragment),
        }
    }

    #[inline]
    fn triangle_color(&self, face_normal: Vec3) -> Option<Vec3> {
        match self {
            SceneShader::Flat(s) => s.triangle_color(face_normal),
            SceneShader::Phong(_) | SceneShader::Pbr(_) => None,
        }
    }
}

/// Normal for lighting: the normal-map texel remapped from `[0, 1]` to
/// `[-1, 1]` when a map is bound, the interpolated normal otherwise.
#[inline]
pub(crate) fn surface_normal(
    normal_map: Option<&crate::texture::Texture>,
    fragment: &Fragment,
) -> Vec3 {
    match normal_map {
        Some(map) => {
            let (rgb, _) = map.sample_rgba(fragment.uv);
            (rgb * 2.0 - Vec3::ONE).normalize()
        }
        None => fragment.normal.normalize(),
    }
}
