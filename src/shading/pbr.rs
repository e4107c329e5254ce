use std::f32::consts::PI;

use crate::light::PointLight;
use crate::math::{Vec2, Vec3};
use crate::scene::{FrameTransforms, PbrMaterial, SceneParams, TextureMaps};

use super::{surface_normal, Fragment, PixelShader};

const GAMMA: f32 = 2.2;
/// Base reflectance of dielectrics.
const DIELECTRIC_F0: f32 = 0.04;
const AMBIENT: f32 = 0.03;

/// Cook-Torrance microfacet shading for a single point light.
///
/// Albedo from a diffuse map is treated as sRGB and linearised. Output is
/// Reinhard tone mapped and gamma corrected, so it is already in `[0, 1]`.
pub struct PbrShader<'a> {
    material: PbrMaterial,
    maps: &'a TextureMaps,
    light: PointLight,
    frame: &'a FrameTransforms,
}

impl<'a> PbrShader<'a> {
    pub fn new(scene: &'a SceneParams, frame: &'a FrameTransforms) -> Self {
        Self {
            material: scene.pbr,
            maps: &scene.maps,
            light: scene.light,
            frame,
        }
    }

    pub fn shade_point(&self, world: Vec3, normal: Vec3, uv: Vec2) -> Vec3 {
        let albedo = match &self.maps.diffuse {
            Some(map) => map.sample_rgba(uv).0.powf(GAMMA),
            None => self.material.albedo,
        };
        let (metallic, roughness, ao) = match &self.maps.mrao {
            Some(map) => {
                let (mrao, _) = map.sample_rgba(uv);
                (mrao.x, mrao.y, mrao.z)
            }
            None => (
                self.material.metallic,
                self.material.roughness,
                self.material.ao,
            ),
        };

        let n = normal;
        let v = (self.frame.eye - world).normalize();
        let l = (self.light.position - world).normalize();
        let h = (v + l).normalize();

        let f0 = Vec3::splat(DIELECTRIC_F0).lerp(albedo, metallic);
        let radiance = self.light.radiance_at(world);

        let n_dot_v = n.dot(v).max(0.0);
        let n_dot_l = n.dot(l).max(0.0);

        let d = distribution_ggx(n.dot(h).max(0.0), roughness);
        let g = geometry_smith(n_dot_v, n_dot_l, roughness);
        let f = fresnel_schlick(h.dot(v).max(0.0), f0);

        let specular = f * (d * g) / (4.0 * n_dot_v * n_dot_l + 0.0001);
        let kd = (Vec3::ONE - f) * (1.0 - metallic);
        let outgoing = (kd * albedo / PI + specular) * radiance * n_dot_l;

        let color = Vec3::splat(AMBIENT) * albedo * ao + outgoing;
        let mapped = color / (color + Vec3::ONE);
        mapped.powf(1.0 / GAMMA)
    }
}

impl PixelShader for PbrShader<'_> {
    fn shade(&self, fragment: &Fragment) -> Vec3 {
        let world = self
            .frame
            .screen_to_world(fragment.x, fragment.y, fragment.depth);
        let normal = surface_normal(self.maps.normal.as_deref(), fragment);
        self.shade_point(world, normal, fragment.uv)
    }
}

/// Trowbridge-Reitz GGX normal distribution.
fn distribution_ggx(n_dot_h: f32, roughness: f32) -> f32 {
    let a = roughness * roughness;
    let a2 = a * a;
    let denom = n_dot_h * n_dot_h * (a2 - 1.0) + 1.0;
    a2 / (PI * denom * denom)
}

fn geometry_schlick_ggx(n_dot_x: f32, k: f32) -> f32 {
    n_dot_x / (n_dot_x * (1.0 - k) + k)
}

/// Smith shadowing-masking with the direct-lighting remap of roughness.
fn geometry_smith(n_dot_v: f32, n_dot_l: f32, roughness: f32) -> f32 {
    let r = roughness + 1.0;
    let k = r * r / 8.0;
    geometry_schlick_ggx(n_dot_v, k) * geometry_schlick_ggx(n_dot_l, k)
}

fn fresnel_schlick(cos_theta: f32, f0: Vec3) -> Vec3 {
    f0 + (Vec3::ONE - f0) * (1.0 - cos_theta).clamp(0.0, 1.0).powi(5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shading::test_support;
    use crate::texture::Texture;
    use approx::assert_relative_eq;
    use std::sync::Arc;

    fn rough_dielectric(light: Vec3) -> SceneParams {
        SceneParams {
            light: PointLight::new(light, 25.0),
            pbr: PbrMaterial {
                albedo: Vec3::new(0.9, 0.9, 0.9),
                metallic: 0.0,
                roughness: 1.0,
                ao: 1.0,
            },
            ..SceneParams::default()
        }
    }

    fn luminance(c: Vec3) -> f32 {
        c.x + c.y + c.z
    }

    #[test]
    fn output_falls_as_light_tilts_away() {
        let frame = test_support::frame();
        let mut previous = f32::INFINITY;
        for step in 0..=9 {
            let angle = (step as f32 * 10.0).to_radians();
            let light = Vec3::new(angle.cos(), angle.sin(), 0.0) * 5.0;
            let scene = rough_dielectric(light);
            let shader = PbrShader::new(&scene, &frame);
            let c = luminance(shader.shade_point(Vec3::ZERO, Vec3::RIGHT, Vec2::ZERO));
            assert!(c < previous, "{c} not below {previous} at step {step}");
            previous = c;
        }
    }

    #[test]
    fn grazing_light_leaves_tone_mapped_ambient() {
        let frame = test_support::frame();
        let scene = rough_dielectric(Vec3::new(0.0, 5.0, 0.0));
        let shader = PbrShader::new(&scene, &frame);
        let c = shader.shade_point(Vec3::ZERO, Vec3::RIGHT, Vec2::ZERO);
        let ambient: f32 = 0.03 * 0.9;
        let expected = (ambient / (ambient + 1.0)).powf(1.0 / 2.2);
        assert_relative_eq!(c, Vec3::splat(expected), epsilon = 1e-5);
    }

    #[test]
    fn output_stays_in_unit_range() {
        let frame = test_support::frame();
        let scene = SceneParams {
            light: PointLight::new(Vec3::new(1.0, 0.0, 0.0), 1.0e6),
            ..SceneParams::default()
        };
        let shader = PbrShader::new(&scene, &frame);
        let c = shader.shade_point(Vec3::ZERO, Vec3::RIGHT, Vec2::ZERO);
        for channel in [c.x, c.y, c.z] {
            assert!((0.0..=1.0).contains(&channel));
        }
    }

    #[test]
    fn mrao_map_overrides_scalars() {
        let frame = test_support::frame();
        let mut scene = rough_dielectric(Vec3::new(0.0, 5.0, 0.0));
        // ao channel zero kills the ambient term, grazing light kills the rest
        scene.maps.mrao = Some(Arc::new(Texture::solid(0xFF00_FF00)));
        let shader = PbrShader::new(&scene, &frame);
        let c = shader.shade_point(Vec3::ZERO, Vec3::RIGHT, Vec2::ZERO);
        assert_relative_eq!(c, Vec3::ZERO, epsilon = 1e-6);
    }

    #[test]
    fn ggx_is_flat_at_full_roughness() {
        assert_relative_eq!(distribution_ggx(0.2, 1.0), 1.0 / PI);
        assert_relative_eq!(distribution_ggx(0.9, 1.0), 1.0 / PI);
    }

    #[test]
    fn fresnel_reaches_one_at_grazing_view() {
        let f = fresnel_schlick(0.0, Vec3::splat(0.04));
        assert_relative_eq!(f, Vec3::ONE);
    }
}
