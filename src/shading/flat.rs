use crate::light::{DirectionalLight, PointLight};
use crate::math::Vec3;
use crate::scene::FlatMaterial;

use super::{Fragment, PixelShader};

/// Lambert shading from the face normal, constant over a triangle.
///
/// The color is resolved once per triangle through
/// [`PixelShader::triangle_color`]; `shade` gives the same answer for
/// callers holding a single fragment.
///
/// The point light is treated as a directional light shining from its
/// position toward the origin.
#[derive(Debug, Clone, Copy)]
pub struct FlatShader {
    material: FlatMaterial,
    light: DirectionalLight,
}

impl FlatShader {
    pub fn new(material: FlatMaterial, light: PointLight) -> Self {
        Self {
            material,
            light: light.as_directional(),
        }
    }

    pub fn face_color(&self, face_normal: Vec3) -> Vec3 {
        self.material.color * (self.material.ambient + self.light.intensity(face_normal))
    }
}

impl PixelShader for FlatShader {
    #[inline]
    fn shade(&self, fragment: &Fragment) -> Vec3 {
        self.face_color(fragment.face_normal)
    }

    fn triangle_color(&self, face_normal: Vec3) -> Option<Vec3> {
        Some(self.face_color(face_normal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colors::pack_vec3;
    use crate::math::Vec2;
    use crate::render::framebuffer::BufferPair;
    use crate::render::rasterizer::{
        EdgeFunctionRasterizer, Rasterizer, ScanlineRasterizer, ScreenTriangle, ScreenVertex,
    };
    use approx::assert_relative_eq;
    use std::collections::HashSet;

    fn fragment(face_normal: Vec3, normal: Vec3) -> Fragment {
        Fragment {
            x: 0.0,
            y: 0.0,
            depth: -5.0,
            normal,
            face_normal,
            uv: Vec2::ZERO,
        }
    }

    fn shader() -> FlatShader {
        let material = FlatMaterial {
            color: Vec3::new(1.0, 0.5, 0.0),
            ambient: 0.1,
        };
        FlatShader::new(material, PointLight::new(Vec3::new(0.0, 0.0, -50.0), 1.0))
    }

    #[test]
    fn face_toward_light_is_fully_lit() {
        let color = shader().shade(&fragment(-Vec3::FORWARD, -Vec3::FORWARD));
        assert_relative_eq!(color, Vec3::new(1.1, 0.55, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn face_away_from_light_gets_ambient_only() {
        let color = shader().shade(&fragment(Vec3::FORWARD, Vec3::FORWARD));
        assert_relative_eq!(color, Vec3::new(0.1, 0.05, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn vertex_normal_is_ignored() {
        let s = shader();
        let a = s.shade(&fragment(Vec3::UP, Vec3::UP));
        let b = s.shade(&fragment(Vec3::UP, -Vec3::FORWARD));
        assert_eq!(a, b);
    }

    #[test]
    fn triangle_color_matches_per_fragment_shade() {
        let s = shader();
        let n = Vec3::new(0.3, -0.2, -0.9).normalize();
        assert_eq!(s.triangle_color(n), Some(s.shade(&fragment(n, Vec3::UP))));
    }

    #[test]
    fn rasterized_face_is_one_color_despite_vertex_normals() {
        let s = shader();
        let face = -Vec3::FORWARD;
        let corner = |x: f32, y: f32, normal: Vec3| ScreenVertex {
            normal,
            ..ScreenVertex::at(x, y, -5.0)
        };
        let triangle = ScreenTriangle::new(
            [
                corner(2.0, 2.0, Vec3::UP),
                corner(30.0, 4.0, Vec3::RIGHT),
                corner(10.0, 28.0, Vec3::FORWARD),
            ],
            face,
        );
        let expected = pack_vec3(s.face_color(face));

        let mut scan = BufferPair::new(0, 32, 32);
        ScanlineRasterizer::new().fill_triangle(&triangle, &mut scan.as_framebuffer(), &s);
        let mut edge = BufferPair::new(1, 32, 32);
        EdgeFunctionRasterizer::new().fill_triangle(&triangle, &mut edge.as_framebuffer(), &s);

        for pair in [&scan, &edge] {
            let painted: HashSet<u32> = pair
                .color()
                .iter()
                .zip(pair.depth())
                .filter(|(_, d)| d.is_finite())
                .map(|(&c, _)| c)
                .collect();
            assert_eq!(painted, HashSet::from([expected]));
        }
    }
}
