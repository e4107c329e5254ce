//! Model transform: translation, Euler rotation and scale of the mesh.

use crate::error::{RenderError, Result};
use crate::math::{Mat4, Vec3};

/// Position, rotation (Euler angles) and scale of the rendered model.
///
/// Mutating methods return `&mut Self` for chaining:
///
/// ```ignore
/// transform.translate(Vec3::new(0.0, 1.0, 0.0)).rotate(Vec3::new(0.1, 0.0, 0.0));
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    position: Vec3,
    rotation: Vec3, // radians about x, y, z
    scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec3) -> &mut Self {
        self.position = position;
        self
    }

    pub fn translate(&mut self, delta: Vec3) -> &mut Self {
        self.position += delta;
        self
    }

    /// Euler angles in radians.
    pub fn rotation(&self) -> Vec3 {
        self.rotation
    }

    pub fn set_rotation(&mut self, rotation: Vec3) -> &mut Self {
        self.rotation = rotation;
        self
    }

    pub fn rotate(&mut self, delta: Vec3) -> &mut Self {
        self.rotation += delta;
        self
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: Vec3) -> &mut Self {
        self.scale = scale;
        self
    }

    /// Adds `delta` to every scale component.
    pub fn grow(&mut self, delta: f32) -> &mut Self {
        self.scale += Vec3::splat(delta);
        self
    }

    /// Model matrix `T * Rx * Ry * Rz * S`: scale first, translation last.
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::translation(self.position.x, self.position.y, self.position.z)
            * Mat4::rotation_x(self.rotation.x)
            * Mat4::rotation_y(self.rotation.y)
            * Mat4::rotation_z(self.rotation.z)
            * Mat4::scaling(self.scale.x, self.scale.y, self.scale.z)
    }

    /// Inverse-transpose of the model matrix, for transforming normals with w = 0.
    ///
    /// Fails when a scale component is zero.
    pub fn normal_matrix(&self) -> Result<Mat4> {
        let inverse = self
            .to_matrix()
            .inverse()
            .ok_or(RenderError::SingularMatrix { which: "model" })?;
        Ok(inverse.transpose())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_default() {
        let t = Transform::default();
        assert_eq!(t.position(), Vec3::ZERO);
        assert_eq!(t.rotation(), Vec3::ZERO);
        assert_eq!(t.scale(), Vec3::ONE);
        assert_eq!(t.to_matrix(), Mat4::identity());
    }

    #[test]
    fn test_fluent_api() {
        let mut t = Transform::new();
        t.translate(Vec3::new(1.0, 2.0, 3.0))
            .rotate(Vec3::new(0.0, 0.5, 0.0))
            .grow(1.0);

        assert_eq!(t.position(), Vec3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(t.rotation().y, 0.5);
        assert_eq!(t.scale(), Vec3::splat(2.0));
    }

    #[test]
    fn scale_applies_before_translation() {
        let mut t = Transform::new();
        t.set_position(Vec3::new(10.0, 0.0, 0.0))
            .set_scale(Vec3::splat(2.0));
        assert_relative_eq!(
            t.to_matrix().transform_point(Vec3::new(1.0, 0.0, 0.0)),
            Vec3::new(12.0, 0.0, 0.0)
        );
    }

    #[test]
    fn rotation_order_is_x_then_y_then_z_applied_right_to_left() {
        let mut t = Transform::new();
        t.set_rotation(Vec3::new(FRAC_PI_2, 0.0, FRAC_PI_2));
        // Rz takes +X to +Y, then Rx takes +Y to +Z
        assert_relative_eq!(
            t.to_matrix().transform_vector(Vec3::RIGHT),
            Vec3::FORWARD,
            epsilon = 1e-6
        );
    }

    #[test]
    fn normal_matrix_keeps_normals_perpendicular_under_skewed_scale() {
        let mut t = Transform::new();
        t.set_scale(Vec3::new(4.0, 1.0, 1.0))
            .set_rotation(Vec3::new(0.0, 0.0, 0.3));
        let model = t.to_matrix();
        let normal_matrix = t.normal_matrix().unwrap();

        // Plane x + y = 0 in object space
        let tangent = Vec3::new(1.0, -1.0, 0.0);
        let normal = Vec3::new(1.0, 1.0, 0.0);
        let world_tangent = model.transform_vector(tangent);
        let world_normal = normal_matrix.transform_vector(normal);
        assert_relative_eq!(world_tangent.dot(world_normal), 0.0, epsilon = 1e-5);
    }

    #[test]
    fn millimetre_scale_still_has_normal_matrix() {
        let mut t = Transform::new();
        t.set_scale(Vec3::splat(0.004))
            .set_rotation(Vec3::new(0.2, 0.4, 0.0));
        let normal_matrix = t.normal_matrix().unwrap();
        // uniform scale leaves directions alone once normalized
        let n = normal_matrix.transform_vector(Vec3::UP).normalize();
        let expected = t.to_matrix().transform_vector(Vec3::UP).normalize();
        assert_relative_eq!(n, expected, epsilon = 1e-5);
    }

    #[test]
    fn zero_scale_has_no_normal_matrix() {
        let mut t = Transform::new();
        t.set_scale(Vec3::new(1.0, 0.0, 1.0));
        assert!(matches!(
            t.normal_matrix(),
            Err(RenderError::SingularMatrix { which: "model" })
        ));
    }
}
