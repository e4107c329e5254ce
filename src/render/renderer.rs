//! Whole-frame rendering.
//!
//! [`FrameRenderer`] turns a prepared mesh into pixels in two parallel
//! phases. Triangle setup transforms, culls and projects every face with
//! `par_iter`. Rasterization then splits the destination pair into
//! horizontal bands and fills each band on its own thread, so no pixel is
//! ever written by two threads.

use std::time::{Duration, Instant};

use log::debug;
use rayon::prelude::*;

use super::framebuffer::BufferPair;
use super::rasterizer::{
    Rasterizer, RasterizerDispatcher, RasterizerType, ScreenTriangle, ScreenVertex,
};
use crate::cache::WorldNormalCache;
use crate::error::Result;
use crate::math::{Vec2, Vec3};
use crate::mesh::Face;
use crate::scene::{FrameTransforms, SceneParams};
use crate::shading::SceneShader;

/// Bands per rayon thread; more bands than threads balances uneven rows.
const BANDS_PER_THREAD: usize = 4;

/// Counters for one rendered frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Faces in the mesh.
    pub candidates: usize,
    /// Faces pointing away from the eye.
    pub culled: usize,
    /// Faces that could not be projected: a corner at or behind the eye, or
    /// the whole face nearer than the near plane.
    pub skipped: usize,
    /// Faces handed to the rasterizer.
    pub rasterized: usize,
    /// Pixels that passed the depth test.
    pub pixels_written: u64,
    pub elapsed: Duration,
}

/// What triangle setup decided for one face.
enum Setup {
    Culled,
    Skipped,
    Ready(ScreenTriangle),
}

/// Renders frames with one rasterization strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameRenderer {
    rasterizer: RasterizerDispatcher,
}

impl FrameRenderer {
    pub fn new(rasterizer_type: RasterizerType) -> Self {
        Self {
            rasterizer: RasterizerDispatcher::new(rasterizer_type),
        }
    }

    pub fn rasterizer(&self) -> RasterizerType {
        self.rasterizer.active_type()
    }

    /// Clears `pair` to the scene background and draws every visible face
    /// with the scene's shading model.
    pub fn render(
        &self,
        scene: &SceneParams,
        normals: &WorldNormalCache,
        frame: &FrameTransforms,
        pair: &mut BufferPair,
    ) -> Result<FrameStats> {
        let started = Instant::now();
        let (triangles, mut stats) = self.setup(normals, frame)?;

        pair.clear(scene.background);
        let shader = SceneShader::new(scene, frame);
        let rasterizer = &self.rasterizer;
        stats.pixels_written = pair
            .par_bands(band_rows(pair.height()))
            .map(|mut band| {
                let (start, end) = (band.y_start(), band.y_end());
                triangles
                    .iter()
                    .filter(|t| t.overlaps_rows(start, end))
                    .map(|t| u64::from(rasterizer.fill_triangle(t, &mut band, &shader)))
                    .sum::<u64>()
            })
            .sum();
        stats.elapsed = started.elapsed();

        debug!(
            "frame on pair {}: {} faces, {} culled, {} skipped, {} rasterized, {} pixels in {:?}",
            pair.id(),
            stats.candidates,
            stats.culled,
            stats.skipped,
            stats.rasterized,
            stats.pixels_written,
            stats.elapsed
        );
        Ok(stats)
    }

    /// Depth-only pass: clears `pair` and fills just its depth buffer.
    pub fn render_depth(
        &self,
        normals: &WorldNormalCache,
        frame: &FrameTransforms,
        pair: &mut BufferPair,
        background: u32,
    ) -> Result<FrameStats> {
        let started = Instant::now();
        let (triangles, mut stats) = self.setup(normals, frame)?;

        pair.clear(background);
        let rasterizer = &self.rasterizer;
        stats.pixels_written = pair
            .par_bands(band_rows(pair.height()))
            .map(|mut band| {
                let (start, end) = (band.y_start(), band.y_end());
                triangles
                    .iter()
                    .filter(|t| t.overlaps_rows(start, end))
                    .map(|t| u64::from(rasterizer.fill_depth(t, &mut band)))
                    .sum::<u64>()
            })
            .sum();
        stats.elapsed = started.elapsed();
        debug!(
            "depth pass on pair {}: {} of {} faces rasterized",
            pair.id(),
            stats.rasterized,
            stats.candidates
        );
        Ok(stats)
    }

    /// Transforms, culls and projects every face in parallel.
    ///
    /// Returns the surviving triangles in face order together with the setup
    /// counters.
    pub fn setup(
        &self,
        normals: &WorldNormalCache,
        frame: &FrameTransforms,
    ) -> Result<(Vec<ScreenTriangle>, FrameStats)> {
        let faces = normals.prepared().mesh().faces();
        let outcomes = faces
            .par_iter()
            .map(|face| setup_face(face, normals, frame))
            .collect::<Result<Vec<_>>>()?;

        let mut stats = FrameStats {
            candidates: faces.len(),
            ..FrameStats::default()
        };
        let mut triangles = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            match outcome {
                Setup::Culled => stats.culled += 1,
                Setup::Skipped => stats.skipped += 1,
                Setup::Ready(triangle) => triangles.push(triangle),
            }
        }
        stats.rasterized = triangles.len();
        Ok((triangles, stats))
    }
}

fn setup_face(
    face: &Face,
    normals: &WorldNormalCache,
    frame: &FrameTransforms,
) -> Result<Setup> {
    let mesh = normals.prepared().mesh();
    let corners = face.elements.map(|e| mesh.vertices()[e.vertex].to_vec4());
    let world = corners.map(|c| frame.to_world(c));

    // Backface cull against the eye
    let face_normal = (world[1] - world[0]).cross(world[2] - world[0]);
    if face_normal.dot(frame.eye - world[0]) <= 0.0 {
        return Ok(Setup::Culled);
    }

    let [Some(p0), Some(p1), Some(p2)] = corners.map(|c| frame.project(c)) else {
        return Ok(Setup::Skipped);
    };
    let near = frame.projection().z_near();
    if p0.w < near && p1.w < near && p2.w < near {
        return Ok(Setup::Skipped);
    }

    let mut vertices = [p0, p1, p2].map(|p| ScreenVertex {
        position: Vec3::new(p.screen.x, p.screen.y, p.view_z()),
        one_over_w: 1.0 / p.w,
        normal: Vec3::ZERO,
        uv: Vec2::ZERO,
    });
    for (vertex, element) in vertices.iter_mut().zip(&face.elements) {
        vertex.normal = normals.world_normal(element)?;
        vertex.uv = mesh.uv(element);
    }

    Ok(Setup::Ready(ScreenTriangle::new(
        vertices,
        face_normal.normalize(),
    )))
}

/// Rows per band for a frame of `height` rows.
fn band_rows(height: u32) -> usize {
    let bands = rayon::current_num_threads() * BANDS_PER_THREAD;
    (height as usize).div_ceil(bands).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::OrbitCamera;
    use crate::mesh::{Mesh, PreparedMesh};
    use crate::projection::{Projection, Viewport};
    use crate::scene::ShadingModel;
    use crate::transform::Transform;
    use std::sync::Arc;

    fn cube_normals(transform: &Transform) -> WorldNormalCache {
        let prepared = PreparedMesh::new(Arc::new(Mesh::cube()), false).unwrap();
        WorldNormalCache::new(Arc::new(prepared), transform.normal_matrix().unwrap())
    }

    fn frame(transform: &Transform, camera: &OrbitCamera, size: u32) -> FrameTransforms {
        let projection = Projection::from_degrees(60.0, 1.0, 0.1, 100.0);
        FrameTransforms::new(transform, camera, &projection, &Viewport::new(size, size)).unwrap()
    }

    #[test]
    fn setup_culls_back_faces() {
        let transform = Transform::default();
        let normals = cube_normals(&transform);
        let (triangles, stats) = FrameRenderer::default()
            .setup(&normals, &frame(&transform, &OrbitCamera::new(5.0), 100))
            .unwrap();
        assert_eq!(stats.candidates, 12);
        assert_eq!(stats.culled, 10);
        assert_eq!(triangles.len(), 2);
        // the eye sits on +X, so only the +X side survives
        for t in &triangles {
            assert!(t.face_normal.x > 0.99);
        }
    }

    #[test]
    fn faces_reaching_behind_eye_are_skipped() {
        // a long bar whose top face runs past the eye
        let mut transform = Transform::default();
        transform.set_scale(Vec3::new(20.0, 1.0, 1.0));
        let normals = cube_normals(&transform);
        let mut camera = OrbitCamera::new(3.0);
        camera.rotate_theta(0.5);
        let (_, stats) = FrameRenderer::default()
            .setup(&normals, &frame(&transform, &camera, 100))
            .unwrap();
        assert_eq!(stats.candidates, stats.culled + stats.skipped + stats.rasterized);
        assert!(stats.skipped > 0);
    }

    #[test]
    fn every_shading_model_draws_same_coverage() {
        let transform = Transform::default();
        let normals = cube_normals(&transform);
        let mut camera = OrbitCamera::new(4.0);
        camera.rotate_phi(0.6);
        camera.rotate_theta(0.4);
        let frame = frame(&transform, &camera, 96);
        let renderer = FrameRenderer::default();

        let mut coverage = Vec::new();
        for shading in [ShadingModel::Flat, ShadingModel::Phong, ShadingModel::Pbr] {
            let scene = SceneParams {
                shading,
                ..SceneParams::default()
            };
            let mut pair = BufferPair::new(0, 96, 96);
            let stats = renderer.render(&scene, &normals, &frame, &mut pair).unwrap();
            assert!(stats.rasterized <= 6);
            coverage.push(pair.depth().to_vec());
        }
        assert_eq!(coverage[0], coverage[1]);
        assert_eq!(coverage[1], coverage[2]);
    }

    #[test]
    fn depth_pass_matches_shaded_depth() {
        let transform = Transform::default();
        let normals = cube_normals(&transform);
        let mut camera = OrbitCamera::new(3.0);
        camera.rotate_phi(0.9);
        let frame = frame(&transform, &camera, 64);
        let renderer = FrameRenderer::new(RasterizerType::EdgeFunction);

        let mut shaded = BufferPair::new(0, 64, 64);
        renderer
            .render(&SceneParams::default(), &normals, &frame, &mut shaded)
            .unwrap();
        let mut depth_only = BufferPair::new(1, 64, 64);
        let stats = renderer
            .render_depth(&normals, &frame, &mut depth_only, 0xFF00_0000)
            .unwrap();

        assert!(stats.pixels_written > 0);
        assert_eq!(shaded.depth(), depth_only.depth());
        assert!(depth_only.color().iter().all(|&c| c == 0xFF00_0000));
    }

    #[test]
    fn rasterizer_choice_barely_changes_coverage() {
        let transform = Transform::default();
        let normals = cube_normals(&transform);
        let mut camera = OrbitCamera::new(3.0);
        camera.rotate_phi(0.5);
        camera.rotate_theta(-0.3);
        let frame = frame(&transform, &camera, 80);

        let count = |kind| {
            let mut pair = BufferPair::new(0, 80, 80);
            FrameRenderer::new(kind)
                .render(&SceneParams::default(), &normals, &frame, &mut pair)
                .unwrap();
            pair.depth().iter().filter(|d| d.is_finite()).count() as i64
        };
        let scan = count(RasterizerType::Scanline);
        let edge = count(RasterizerType::EdgeFunction);
        assert!(scan > 0);
        // the two differ only on pixels lying exactly on shared edges
        assert!((scan - edge).abs() <= 80, "{scan} vs {edge}");
    }
}
