//! Vector and matrix primitives.
//!
//! All math is single precision. Matrices are row-major with column vectors
//! on the right (`Mat4 * Vec4`), so transforms chain right-to-left.

pub mod mat4;
pub mod vec2;
pub mod vec3;
pub mod vec4;

pub use mat4::Mat4;
pub use vec2::Vec2;
pub use vec3::Vec3;
pub use vec4::Vec4;
