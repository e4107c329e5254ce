//! Orbit camera
//!
//! # Coordinate System
//!
//! Uses a **right-handed** coordinate system:
//! - X: positive right
//! - Y: positive up
//! - Z: positive toward the viewer (the camera looks down -Z in view space)
//!
//! # Orientation
//!
//! The eye sits on a sphere around a fixed target at the origin and is
//! described by two angles and a radius:
//!
//! - **Theta**: elevation above the XZ plane, clamped to `[-π/2, π/2]`
//! - **Phi**: azimuth in the XZ plane measured from +X, wrapped to `[0, 2π)`

use std::f32::consts::{FRAC_PI_2, TAU};

use crate::math::{Mat4, Vec3};

/// Closest the eye may get to the target.
const MIN_RADIUS: f32 = 0.01;

/// Camera orbiting the origin, always looking at it with +Y up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitCamera {
    radius: f32,
    theta: f32,
    phi: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new(10.0)
    }
}

impl OrbitCamera {
    /// Creates a camera at `radius` on the +X axis.
    pub fn new(radius: f32) -> Self {
        Self {
            radius: radius.max(MIN_RADIUS),
            theta: 0.0,
            phi: 0.0,
        }
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn theta(&self) -> f32 {
        self.theta
    }

    pub fn phi(&self) -> f32 {
        self.phi
    }

    /// Sets the radius, clamped to the minimum.
    pub fn set_radius(&mut self, radius: f32) {
        self.radius = radius.max(MIN_RADIUS);
    }

    /// Adds to the elevation angle; the stored value is clamped to the poles.
    pub fn rotate_theta(&mut self, delta: f32) {
        self.theta = (self.theta + delta).clamp(-FRAC_PI_2, FRAC_PI_2);
    }

    /// Adds to the azimuth angle, wrapping into `[0, 2π)`.
    pub fn rotate_phi(&mut self, delta: f32) {
        self.phi = (self.phi + delta).rem_euclid(TAU);
    }

    /// Eye position `r * (cos θ cos φ, sin θ, cos θ sin φ)`.
    pub fn eye(&self) -> Vec3 {
        let (sin_t, cos_t) = self.theta.sin_cos();
        let (sin_p, cos_p) = self.phi.sin_cos();
        Vec3::new(cos_t * cos_p, sin_t, cos_t * sin_p) * self.radius
    }

    pub fn target(&self) -> Vec3 {
        Vec3::ZERO
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), self.target(), Vec3::UP)
    }
}

// =============================================================================
// Camera Controller
// =============================================================================

/// Maps pointer drags and scroll steps onto an [`OrbitCamera`].
#[derive(Debug, Clone)]
pub struct OrbitCameraController {
    /// Radians per pixel of pointer drag.
    pub sensitivity: f32,
    /// Scroll delta is divided by this to get the radius change.
    pub scroll_divisor: f32,
}

impl Default for OrbitCameraController {
    fn default() -> Self {
        Self {
            sensitivity: 0.01,
            scroll_divisor: 20.0,
        }
    }
}

impl OrbitCameraController {
    pub fn new(sensitivity: f32, scroll_divisor: f32) -> Self {
        Self {
            sensitivity,
            scroll_divisor,
        }
    }

    /// Applies a pointer drag of `(dx, dy)` pixels.
    ///
    /// Dragging right advances the azimuth, swinging the eye from +X toward
    /// +Z; dragging down raises it.
    pub fn drag(&self, camera: &mut OrbitCamera, dx: f32, dy: f32) {
        camera.rotate_phi(self.sensitivity * dx);
        camera.rotate_theta(self.sensitivity * dy);
    }

    /// Applies a scroll of `dy`; positive values zoom in.
    pub fn scroll(&self, camera: &mut OrbitCamera, dy: f32) {
        camera.set_radius(camera.radius() - dy / self.scroll_divisor);
    }
}

// =============================================================================
// Tests
// =============================================================================
