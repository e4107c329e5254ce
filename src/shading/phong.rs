use crate::light::PointLight;
use crate::math::{Vec2, Vec3};
use crate::scene::{FrameTransforms, PhongMaterial, SceneParams, TextureMaps};

use super::{surface_normal, Fragment, PixelShader};

/// Per-pixel Phong reflection.
///
/// A diffuse map replaces `k_a` with its alpha as grey and `k_d` with its
/// color; an emission map replaces `k_s`.
pub struct PhongShader<'a> {
    material: PhongMaterial,
    maps: &'a TextureMaps,
    light: PointLight,
    frame: &'a FrameTransforms,
}

impl<'a> PhongShader<'a> {
    pub fn new(scene: &'a SceneParams, frame: &'a FrameTransforms) -> Self {
        Self {
            material: scene.phong,
            maps: &scene.maps,
            light: scene.light,
            frame,
        }
    }

    /// Phong terms at a world position with a unit normal.
    pub fn shade_point(&self, world: Vec3, normal: Vec3, uv: Vec2) -> Vec3 {
        let m = &self.material;
        let (ka, kd) = match &self.maps.diffuse {
            Some(map) => {
                let (rgb, alpha) = map.sample_rgba(uv);
                (Vec3::splat(alpha), rgb)
            }
            None => (m.ambient, m.diffuse),
        };
        let ks = match &self.maps.emission {
            Some(map) => map.sample_rgba(uv).0,
            None => m.specular,
        };

        let incident = self.light.incident(world);
        let to_eye = (self.frame.eye - world).normalize();

        let ambient = ka * m.ambient_intensity;
        let diffuse = kd * (-normal.dot(incident)).max(0.0) * m.diffuse_intensity;
        let highlight = incident.reflect(normal).dot(to_eye).max(0.0).powf(m.shininess);
        let specular = ks * highlight * m.specular_intensity;

        ambient + diffuse + specular
    }
}

impl PixelShader for PhongShader<'_> {
    fn shade(&self, fragment: &Fragment) -> Vec3 {
        let world = self
            .frame
            .screen_to_world(fragment.x, fragment.y, fragment.depth);
        let normal = surface_normal(self.maps.normal.as_deref(), fragment);
        self.shade_point(world, normal, fragment.uv)
    }
}
