use std::collections::HashSet;
use std::sync::Arc;

use approx::assert_relative_eq;
use softrast::cache::WorldNormalCache;
use softrast::camera::OrbitCamera;
use softrast::light::PointLight;
use softrast::math::Vec3;
use softrast::mesh::{Face, FaceElement, Mesh, PreparedMesh, Vertex};
use softrast::projection::{Projection, Viewport};
use softrast::scene::{FrameTransforms, SceneParams, ShadingModel};
use softrast::texture::Texture;
use softrast::{
    BufferPair, Engine, FrameRenderer, MapSlot, RasterizerType, RendererConfig, Transform,
};

const BACKGROUND: u32 = 0xFF1E_1E1E;

/// Eye distance that puts the edges of the cube's +X face half a pixel
/// outside pixels 50 and 150 of a 200×200 frame with a 90° field of view.
const HEAD_ON_RADIUS: f32 = 0.5 + 0.5 / 0.505;

fn normals_for(mesh: Mesh, transform: &Transform) -> WorldNormalCache {
    let prepared = PreparedMesh::new(Arc::new(mesh), false).unwrap();
    WorldNormalCache::new(Arc::new(prepared), transform.normal_matrix().unwrap())
}

fn frame(
    transform: &Transform,
    camera: &OrbitCamera,
    fov_degrees: f32,
    size: u32,
) -> FrameTransforms {
    let projection = Projection::from_degrees(fov_degrees, 1.0, 0.1, 100.0);
    FrameTransforms::new(transform, camera, &projection, &Viewport::new(size, size)).unwrap()
}

fn drawn(pair: &BufferPair) -> usize {
    pair.depth().iter().filter(|d| d.is_finite()).count()
}

#[test]
fn cube_never_shows_more_than_six_triangles() {
    let transform = Transform::default();
    let normals = normals_for(Mesh::cube(), &transform);
    let renderer = FrameRenderer::default();

    for (theta, phi) in [(0.0, 0.0), (0.4, 0.7), (-0.6, 2.1), (1.2, -0.3), (0.9, 3.9)] {
        let mut camera = OrbitCamera::new(4.0);
        camera.rotate_theta(theta);
        camera.rotate_phi(phi);
        let (triangles, stats) = renderer
            .setup(&normals, &frame(&transform, &camera, 60.0, 100))
            .unwrap();
        assert_eq!(stats.candidates, 12);
        assert_eq!(stats.skipped, 0);
        assert!(triangles.len() <= 6, "{} at ({theta}, {phi})", triangles.len());
        assert_eq!(stats.culled + triangles.len(), 12);
    }
}

#[test]
fn head_on_cube_face_covers_known_square() {
    let transform = Transform::default();
    let normals = normals_for(Mesh::cube(), &transform);
    let camera = OrbitCamera::new(HEAD_ON_RADIUS);
    let frame = frame(&transform, &camera, 90.0, 200);

    let mut pair = BufferPair::new(0, 200, 200);
    let stats = FrameRenderer::new(RasterizerType::EdgeFunction)
        .render(&SceneParams::default(), &normals, &frame, &mut pair)
        .unwrap();

    assert_eq!(stats.rasterized, 2);
    assert_eq!(stats.culled, 10);
    for y in 0..200 {
        for x in 0..200 {
            let inside = (50..=150).contains(&x) && (50..=150).contains(&y);
            let depth = pair.depth_at(x, y).unwrap();
            if inside {
                assert_relative_eq!(depth, 0.5 - HEAD_ON_RADIUS, epsilon = 1e-4);
            } else {
                assert_eq!(depth, f32::NEG_INFINITY, "pixel ({x}, {y})");
                assert_eq!(pair.pixel(x, y), Some(BACKGROUND));
            }
        }
    }
    assert_eq!(drawn(&pair), 101 * 101);
}

#[test]
fn scanline_head_on_square_matches_edge_function_closely() {
    let transform = Transform::default();
    let normals = normals_for(Mesh::cube(), &transform);
    let frame = frame(&transform, &OrbitCamera::new(HEAD_ON_RADIUS), 90.0, 200);

    let mut pair = BufferPair::new(0, 200, 200);
    FrameRenderer::new(RasterizerType::Scanline)
        .render(&SceneParams::default(), &normals, &frame, &mut pair)
        .unwrap();

    // only the shared diagonal may differ
    let count = drawn(&pair);
    assert!(count <= 101 * 101);
    assert!(count >= 101 * 101 - 101, "{count}");
    assert!(pair.depth_at(49, 100).unwrap().is_infinite());
    assert!(pair.depth_at(151, 100).unwrap().is_infinite());
}

#[test]
fn flat_shading_paints_a_face_uniformly() {
    let transform = Transform::default();
    let normals = normals_for(Mesh::cube(), &transform);
    let frame = frame(&transform, &OrbitCamera::new(HEAD_ON_RADIUS), 90.0, 200);
    let scene = SceneParams {
        shading: ShadingModel::Flat,
        light: PointLight::new(Vec3::new(50.0, 0.0, 0.0), 2500.0),
        ..SceneParams::default()
    };

    let mut pair = BufferPair::new(0, 200, 200);
    FrameRenderer::default()
        .render(&scene, &normals, &frame, &mut pair)
        .unwrap();

    let colors: HashSet<u32> = (50..=150)
        .flat_map(|y| (50..=150).map(move |x| (x, y)))
        .filter_map(|(x, y)| pair.pixel(x, y))
        .collect();
    assert_eq!(colors.len(), 1);
    assert!(!colors.contains(&BACKGROUND));
}

#[test]
fn back_facing_triangle_is_never_drawn() {
    let vertices = vec![
        Vertex::new(0.0, -0.5, -0.5),
        Vertex::new(0.0, -0.5, 0.5),
        Vertex::new(0.0, 0.5, 0.0),
    ];
    let (a, b, c) = (FaceElement::new(0), FaceElement::new(1), FaceElement::new(2));
    // normal -X, away from an eye on +X
    let away = Mesh::new(vertices.clone(), vec![], vec![], vec![Face::new(a, b, c)]).unwrap();
    let toward = Mesh::new(vertices, vec![], vec![], vec![Face::new(a, c, b)]).unwrap();

    let transform = Transform::default();
    let frame = frame(&transform, &OrbitCamera::new(3.0), 60.0, 64);
    for shading in [ShadingModel::Flat, ShadingModel::Phong, ShadingModel::Pbr] {
        let scene = SceneParams {
            shading,
            ..SceneParams::default()
        };
        for kind in [RasterizerType::Scanline, RasterizerType::EdgeFunction] {
            let renderer = FrameRenderer::new(kind);

            let mut pair = BufferPair::new(0, 64, 64);
            let stats = renderer
                .render(&scene, &normals_for(away.clone(), &transform), &frame, &mut pair)
                .unwrap();
            assert_eq!(stats.culled, 1);
            assert_eq!(stats.pixels_written, 0);
            assert_eq!(drawn(&pair), 0);

            let stats = renderer
                .render(&scene, &normals_for(toward.clone(), &transform), &frame, &mut pair)
                .unwrap();
            assert_eq!(stats.rasterized, 1);
            assert!(drawn(&pair) > 0);
        }
    }
}

#[test]
fn geometry_behind_the_camera_is_skipped() {
    // every face either points away or lies behind the eye
    let mut transform = Transform::default();
    transform.set_position(Vec3::new(10.0, 0.0, 0.0));
    let normals = normals_for(Mesh::cube(), &transform);
    let frame = frame(&transform, &OrbitCamera::new(5.0), 60.0, 64);

    let mut pair = BufferPair::new(0, 64, 64);
    let stats = FrameRenderer::default()
        .render(&SceneParams::default(), &normals, &frame, &mut pair)
        .unwrap();
    assert_eq!(stats.rasterized, 0);
    assert!(stats.skipped > 0);
    assert_eq!(drawn(&pair), 0);
}

#[test]
fn screen_to_world_inverts_projection() {
    let mut transform = Transform::default();
    transform
        .set_position(Vec3::new(0.3, -0.2, 0.5))
        .set_rotation(Vec3::new(0.4, 1.1, -0.2))
        .set_scale(Vec3::new(1.5, 0.8, 2.0));
    let mut camera = OrbitCamera::new(7.0);
    camera.rotate_theta(0.3);
    camera.rotate_phi(-1.2);
    let frame = frame(&transform, &camera, 45.0, 320);

    for vertex in Mesh::cube().vertices() {
        let object = vertex.to_vec4();
        let world = frame.to_world(object);
        let projected = frame.project(object).unwrap();
        let back = frame.screen_to_world(projected.screen.x, projected.screen.y, projected.view_z());
        assert_relative_eq!(back, world, epsilon = 1e-3);
    }
}

#[test]
fn engine_renders_through_the_pipeline() {
    let config = RendererConfig {
        width: 200,
        height: 200,
        fov_degrees: 90.0,
        initial_radius: HEAD_ON_RADIUS,
        worker_threads: 2,
        ..RendererConfig::default()
    };
    let mut engine = Engine::new(config, Mesh::cube()).unwrap();
    engine.set_rasterizer(RasterizerType::EdgeFunction);
    engine.set_light(PointLight::new(Vec3::new(5.0, 0.0, 0.0), 2500.0));
    engine.set_map(MapSlot::Diffuse, Some(Arc::new(Texture::solid(0xFFFF_0000))));
    engine.request_frame().unwrap();
    engine.wait_idle();

    let mut centre = None;
    let mut count = 0;
    assert!(engine.present(|pair| {
        centre = pair.pixel(100, 100);
        count = drawn(pair);
    }));
    assert_eq!(count, 101 * 101);

    let argb = centre.unwrap();
    let (r, g, b) = ((argb >> 16) & 0xFF, (argb >> 8) & 0xFF, argb & 0xFF);
    assert!(r > g && r > b, "{argb:08x}");

    // nothing new finished, so nothing to present
    assert!(!engine.present(|_| {}));
    assert_eq!(engine.with_displayed(|pair| pair.pixel(100, 100)), Some(centre));
}

#[test]
fn engine_frames_follow_scene_changes() {
    let config = RendererConfig {
        width: 80,
        height: 80,
        initial_radius: 3.0,
        ..RendererConfig::default()
    };
    let mut engine = Engine::new(config, Mesh::cube()).unwrap();

    let mut coverage = Vec::new();
    for step in 0..4 {
        engine.drag(40.0, 25.0);
        engine.request_frame().unwrap();
        engine.wait_idle();
        assert!(engine.present(|pair| coverage.push(pair.depth().to_vec())), "step {step}");
    }
    assert!(coverage.windows(2).all(|w| w[0] != w[1]));
}
