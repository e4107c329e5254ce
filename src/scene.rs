//! Per-frame scene description.
//!
//! [`SceneParams`] is the immutable snapshot a render request works from;
//! [`FrameTransforms`] is everything derived from it once per frame (MVP,
//! the inverses needed to reconstruct world positions, the normal matrix).

use std::sync::Arc;

use crate::camera::OrbitCamera;
use crate::error::{RenderError, Result};
use crate::light::PointLight;
use crate::math::{Mat4, Vec3, Vec4};
use crate::projection::{Projection, Viewport};
use crate::texture::Texture;
use crate::transform::Transform;

/// Which pixel shader fills the triangles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShadingModel {
    /// One Lambert sample per triangle.
    Flat,
    #[default]
    Phong,
    /// Cook-Torrance microfacet BRDF.
    Pbr,
}

impl std::fmt::Display for ShadingModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShadingModel::Flat => write!(f, "Flat"),
            ShadingModel::Phong => write!(f, "Phong"),
            ShadingModel::Pbr => write!(f, "PBR"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatMaterial {
    pub color: Vec3,
    pub ambient: f32,
}

impl Default for FlatMaterial {
    fn default() -> Self {
        Self {
            color: Vec3::ONE,
            ambient: 0.1,
        }
    }
}

/// Phong reflection coefficients and light intensities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhongMaterial {
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub shininess: f32,
    pub ambient_intensity: Vec3,
    pub diffuse_intensity: Vec3,
    pub specular_intensity: Vec3,
}

impl Default for PhongMaterial {
    fn default() -> Self {
        Self {
            ambient: Vec3::ONE,
            diffuse: Vec3::new(0.8, 0.8, 0.8),
            specular: Vec3::splat(0.5),
            shininess: 32.0,
            ambient_intensity: Vec3::splat(0.1),
            diffuse_intensity: Vec3::ONE,
            specular_intensity: Vec3::ONE,
        }
    }
}

/// Scalar metallic-roughness parameters, used where no MRAO map is bound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PbrMaterial {
    pub albedo: Vec3,
    pub metallic: f32,
    pub roughness: f32,
    pub ao: f32,
}

impl Default for PbrMaterial {
    fn default() -> Self {
        Self {
            albedo: Vec3::new(0.8, 0.3, 0.2),
            metallic: 0.0,
            roughness: 0.5,
            ao: 1.0,
        }
    }
}

/// Optional texture maps. Textures are shared, so snapshots stay cheap.
#[derive(Debug, Clone, Default)]
pub struct TextureMaps {
    pub diffuse: Option<Arc<Texture>>,
    pub normal: Option<Arc<Texture>>,
    pub emission: Option<Arc<Texture>>,
    /// Metallic, roughness and ambient occlusion in the r, g and b channels.
    pub mrao: Option<Arc<Texture>>,
}

/// Immutable snapshot of everything a frame depends on besides the mesh.
#[derive(Debug, Clone)]
pub struct SceneParams {
    pub transform: Transform,
    pub camera: OrbitCamera,
    pub light: PointLight,
    pub shading: ShadingModel,
    pub flat: FlatMaterial,
    pub phong: PhongMaterial,
    pub pbr: PbrMaterial,
    pub maps: TextureMaps,
    pub background: u32,
}

impl Default for SceneParams {
    fn default() -> Self {
        Self {
            transform: Transform::default(),
            camera: OrbitCamera::default(),
            light: PointLight::new(Vec3::new(0.0, 0.0, -50.0), 2500.0),
            shading: ShadingModel::default(),
            flat: FlatMaterial::default(),
            phong: PhongMaterial::default(),
            pbr: PbrMaterial::default(),
            maps: TextureMaps::default(),
            background: 0xFF1E_1E1E,
        }
    }
}

/// A vertex after the full transform chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedVertex {
    /// Pixel coordinates; `z` is the NDC depth.
    pub screen: Vec3,
    /// Clip-space w, the distance in front of the eye.
    pub w: f32,
}

impl ProjectedVertex {
    /// View-space z (negative in front of the eye).
    pub fn view_z(&self) -> f32 {
        -self.w
    }
}

/// Matrices for one frame, computed once and shared by every triangle.
#[derive(Debug, Clone, Copy)]
pub struct FrameTransforms {
    pub model: Mat4,
    pub view: Mat4,
    pub mvp: Mat4,
    pub viewport: Mat4,
    pub normal_matrix: Mat4,
    pub inverse_viewport: Mat4,
    pub inverse_projection: Mat4,
    pub inverse_view: Mat4,
    pub eye: Vec3,
    projection: Projection,
}

impl FrameTransforms {
    /// Fails with [`RenderError::SingularMatrix`] when any inverse is missing.
    pub fn new(
        transform: &Transform,
        camera: &OrbitCamera,
        projection: &Projection,
        viewport: &Viewport,
    ) -> Result<Self> {
        let model = transform.to_matrix();
        let view = camera.view_matrix();
        let projection_matrix = projection.matrix();
        let viewport_matrix = viewport.matrix();

        let inverse = |m: Mat4, which: &'static str| {
            m.inverse().ok_or(RenderError::SingularMatrix { which })
        };

        Ok(Self {
            model,
            view,
            mvp: projection_matrix * view * model,
            viewport: viewport_matrix,
            normal_matrix: transform.normal_matrix()?,
            inverse_viewport: inverse(viewport_matrix, "viewport")?,
            inverse_projection: inverse(projection_matrix, "projection")?,
            inverse_view: inverse(view, "view")?,
            eye: camera.eye(),
            projection: *projection,
        })
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Object space to pixel coordinates. Returns `None` for points on or
    /// behind the eye plane, which have no meaningful projection.
    pub fn project(&self, object: Vec4) -> Option<ProjectedVertex> {
        let clip = self.mvp * object;
        if !(clip.w > f32::EPSILON) || !clip.w.is_finite() {
            return None;
        }
        let ndc = clip.perspective_divide();
        let screen = (self.viewport * ndc).to_vec3();
        screen.is_finite().then_some(ProjectedVertex { screen, w: clip.w })
    }

    /// Object space to world space.
    pub fn to_world(&self, object: Vec4) -> Vec3 {
        let world = self.model * object;
        if world.w != 0.0 && world.w != 1.0 {
            world.to_vec3() / world.w
        } else {
            world.to_vec3()
        }
    }

    /// World position of a pixel at the given view-space depth: inverse
    /// viewport, inverse projection with the perspective divide undone, then
    /// inverse view.
    pub fn screen_to_world(&self, x: f32, y: f32, view_z: f32) -> Vec3 {
        let ndc_z = self.projection.ndc_depth(view_z);
        let ndc = self.inverse_viewport * Vec4::point(x, y, ndc_z);
        let view = (self.inverse_projection * ndc).perspective_divide();
        (self.inverse_view * view).to_vec3()
    }

    /// Object normal to unit world normal through the normal matrix (w = 0).
    pub fn world_normal(&self, object_normal: Vec3) -> Vec3 {
        self.normal_matrix
            .transform_vector(object_normal)
            .normalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn frame(transform: Transform, camera: OrbitCamera) -> FrameTransforms {
        let projection = Projection::from_degrees(45.0, 1160.0 / 680.0, 0.1, 100.0);
        FrameTransforms::new(&transform, &camera, &projection, &Viewport::new(1160, 680)).unwrap()
    }

    #[test]
    fn origin_projects_to_screen_center() {
        let f = frame(Transform::default(), OrbitCamera::new(10.0));
        let p = f.project(Vec4::point(0.0, 0.0, 0.0)).unwrap();
        assert_relative_eq!(p.screen.x, 580.0, epsilon = 1e-3);
        assert_relative_eq!(p.screen.y, 340.0, epsilon = 1e-3);
        assert_relative_eq!(p.w, 10.0, epsilon = 1e-4);
        assert_relative_eq!(p.view_z(), -10.0, epsilon = 1e-4);
    }

    #[test]
    fn screen_to_world_inverts_projection() {
        let mut transform = Transform::default();
        transform
            .set_rotation(Vec3::new(0.3, -0.7, 0.2))
            .set_position(Vec3::new(0.5, -0.25, 1.0));
        let mut camera = OrbitCamera::new(6.0);
        camera.rotate_phi(0.8);
        camera.rotate_theta(0.3);
        let f = frame(transform, camera);

        for object in [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.5, 0.5, -0.5),
            Vec3::new(-1.0, 0.2, 0.7),
        ] {
            let p = f.project(Vec4::from_vec3(object, 1.0)).unwrap();
            let world = f.screen_to_world(p.screen.x, p.screen.y, p.view_z());
            assert_relative_eq!(world, f.to_world(Vec4::from_vec3(object, 1.0)), epsilon = 1e-3);
        }
    }

    #[test]
    fn points_behind_eye_do_not_project() {
        let f = frame(Transform::default(), OrbitCamera::new(10.0));
        // eye at +X 10, looking toward -X: x = 20 is behind it
        assert!(f.project(Vec4::point(20.0, 0.0, 0.0)).is_none());
        assert!(f.project(Vec4::point(10.0, 0.0, 0.0)).is_none());
    }

    #[test]
    fn singular_model_aborts_frame() {
        let mut transform = Transform::default();
        transform.set_scale(Vec3::new(0.0, 1.0, 1.0));
        let projection = Projection::from_degrees(45.0, 1.0, 0.1, 100.0);
        let err = FrameTransforms::new(
            &transform,
            &OrbitCamera::new(5.0),
            &projection,
            &Viewport::new(64, 64),
        )
        .unwrap_err();
        assert!(matches!(err, RenderError::SingularMatrix { which: "model" }));
    }

    #[test]
    fn millimetre_model_still_renders() {
        let mut transform = Transform::default();
        transform.set_scale(Vec3::splat(0.004));
        let f = frame(transform, OrbitCamera::new(0.05));
        let p = f.project(Vec4::point(1.0, 0.0, 0.0)).unwrap();
        assert_relative_eq!(p.w, 0.046, epsilon = 1e-4);
        assert_relative_eq!(f.world_normal(Vec3::RIGHT), Vec3::RIGHT, epsilon = 1e-5);
    }

    #[test]
    fn world_normal_is_unit_length() {
        let mut transform = Transform::default();
        transform.set_scale(Vec3::new(3.0, 1.0, 0.5));
        let f = frame(transform, OrbitCamera::new(4.0));
        let n = f.world_normal(Vec3::new(1.0, 1.0, 1.0));
        assert_relative_eq!(n.magnitude(), 1.0, epsilon = 1e-6);
    }
}
