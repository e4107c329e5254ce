//! Lighting types for the renderer.

use crate::math::Vec3;

/// A point light. Phong treats it as a source of incident rays, PBR also
/// attenuates its color by the squared distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    /// Radiant color; PBR divides it by distance squared.
    pub color: Vec3,
}

impl PointLight {
    pub fn new(position: Vec3, intensity: f32) -> Self {
        Self {
            position,
            color: Vec3::splat(intensity),
        }
    }

    /// Incident direction from the light toward `point`, normalized.
    pub fn incident(&self, point: Vec3) -> Vec3 {
        (point - self.position).normalize()
    }

    /// Color arriving at `point` after inverse-square falloff.
    pub fn radiance_at(&self, point: Vec3) -> Vec3 {
        let distance_sq = (self.position - point).magnitude_squared();
        if distance_sq > 0.0 {
            self.color / distance_sq
        } else {
            self.color
        }
    }

    /// The directional light flat shading uses: the rays of this light as
    /// seen from the origin.
    pub fn as_directional(&self) -> DirectionalLight {
        DirectionalLight::new(-self.position)
    }
}

/// A directional light that illuminates the scene uniformly from a direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    /// The normalized direction the light is pointing (not where it comes from).
    pub direction: Vec3,
}

impl DirectionalLight {
    /// The direction is normalized automatically.
    pub fn new(direction: Vec3) -> Self {
        DirectionalLight {
            direction: direction.normalize(),
        }
    }

    /// Lambert term in `[0, 1]` for a surface with the given normal.
    pub fn intensity(&self, normal: Vec3) -> f32 {
        (-self.direction).dot(normal.normalize()).max(0.0)
    }
}
