//! Renderer configuration loaded from TOML.
//!
//! Every field has a default, so a config file only needs the keys it
//! overrides:
//!
//! ```toml
//! width = 800
//! height = 600
//! worker_threads = 4
//! ```

use std::fs;
use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::math::Vec3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub width: u32,
    pub height: u32,
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    pub z_near: f32,
    pub z_far: f32,
    /// Number of color/depth pairs cycling through the frame pipeline.
    pub buffer_count: usize,
    pub worker_threads: usize,
    /// Radians of orbit per pixel of pointer drag.
    pub camera_sensitivity: f32,
    /// Scroll delta is divided by this before changing the orbit radius.
    pub scroll_divisor: f32,
    pub initial_radius: f32,
    pub light_position: [f32; 3],
    pub light_intensity: f32,
    /// Background color as `0xAARRGGBB`.
    pub background: u32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            width: 1160,
            height: 680,
            fov_degrees: 45.0,
            z_near: 0.1,
            z_far: 100.0,
            buffer_count: 3,
            worker_threads: 2,
            camera_sensitivity: 0.01,
            scroll_divisor: 20.0,
            initial_radius: 10.0,
            light_position: [0.0, 0.0, -50.0],
            light_intensity: 2500.0,
            background: 0xFF1E_1E1E,
        }
    }
}

impl RendererConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&text)?;
        Ok(config.sanitized())
    }

    /// Loads `path`, falling back to defaults when it is missing or invalid.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            info!("no config at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => {
                info!("loaded config from {}", path.display());
                config
            }
            Err(e) => {
                warn!("ignoring config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let text = toml::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }

    pub fn light_position(&self) -> Vec3 {
        let [x, y, z] = self.light_position;
        Vec3::new(x, y, z)
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Replaces values the renderer cannot work with by their defaults.
    fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if self.width == 0 || self.height == 0 {
            warn!("zero-sized framebuffer in config, using default resolution");
            self.width = defaults.width;
            self.height = defaults.height;
        }
        if self.buffer_count == 0 {
            self.buffer_count = defaults.buffer_count;
        }
        if self.worker_threads == 0 {
            self.worker_threads = defaults.worker_threads;
        }
        if !(self.z_near > 0.0 && self.z_far > self.z_near) {
            warn!(
                "invalid clip planes near={} far={}, using defaults",
                self.z_near, self.z_far
            );
            self.z_near = defaults.z_near;
            self.z_far = defaults.z_far;
        }
        if self.scroll_divisor == 0.0 {
            self.scroll_divisor = defaults.scroll_divisor;
        }
        self
    }
}
