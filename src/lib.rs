//! A CPU-based software rasterizer.
//!
//! This crate renders triangle meshes entirely on the CPU: model, view and
//! projection transforms, backface culling, perspective-correct scanline or
//! edge-function rasterization with a depth buffer, and flat, Phong or
//! physically based shading. Frames are rendered on worker threads into a
//! small pool of buffer pairs and handed to a presentation sink. SDL2 is
//! used only by the optional viewer behind the `window` feature.
//!
//! # Quick Start
//!
//! ```no_run
//! use softrast::prelude::*;
//!
//! # fn main() -> softrast::Result<()> {
//! let mut engine = Engine::new(RendererConfig::default(), Mesh::cube())?;
//! engine.set_shading(ShadingModel::Pbr);
//! engine.request_frame()?;
//! engine.wait_idle();
//! engine.present(|pair| {
//!     let _argb: Vec<u8> = pair.color_bytes();
//! });
//! # Ok(())
//! # }
//! ```

// Public API - exposed to library consumers
pub mod cache;
pub mod camera;
pub mod colors;
pub mod config;
pub mod engine;
pub mod error;
pub mod light;
pub mod math;
pub mod mesh;
pub mod projection;
pub mod render;
pub mod scene;
pub mod shading;
pub mod texture;
pub mod transform;
#[cfg(feature = "window")]
pub mod window;

// Re-export commonly needed types at crate root for convenience
pub use config::RendererConfig;
pub use engine::{Engine, MapSlot};
pub use error::{RenderError, Result};
pub use mesh::{Mesh, PreparedMesh};
pub use projection::{Projection, Viewport};
pub use render::{BufferPair, FramePipeline, FrameRenderer, FrameStats, RasterizerType};
pub use scene::{SceneParams, ShadingModel};
pub use texture::Texture;
pub use transform::Transform;

/// Prelude module for convenient imports.
///
/// # Example
/// ```ignore
/// use softrast::prelude::*;
/// ```
pub mod prelude {
    // Camera
    pub use crate::camera::{OrbitCamera, OrbitCameraController};

    // Engine
    pub use crate::config::RendererConfig;
    pub use crate::engine::{Engine, MapSlot};
    pub use crate::error::{RenderError, Result};

    // Scene
    pub use crate::light::PointLight;
    pub use crate::mesh::Mesh;
    pub use crate::scene::{FlatMaterial, PbrMaterial, PhongMaterial, SceneParams, ShadingModel};
    pub use crate::texture::Texture;
    pub use crate::transform::Transform;

    // Math
    pub use crate::math::{Mat4, Vec2, Vec3, Vec4};

    // Rendering
    pub use crate::render::{BufferPair, RasterizerType};
}
