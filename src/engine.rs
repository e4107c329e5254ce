//! Core rendering engine.
//!
//! The [`Engine`] struct is the main entry point for the renderer. It owns
//! the mutable scene state, and every call that changes what would be drawn
//! marks the scene dirty. [`Engine::request_frame`] freezes the current
//! state into a [`SceneParams`] snapshot and hands it to the frame pipeline,
//! so render workers never observe a half-applied change.

use std::path::Path;
use std::sync::Arc;

use log::{debug, info};

use crate::cache::WorldNormalCache;
use crate::camera::{OrbitCamera, OrbitCameraController};
use crate::config::RendererConfig;
use crate::error::Result;
use crate::light::PointLight;
use crate::math::Vec3;
use crate::mesh::{Mesh, PreparedMesh};
use crate::projection::{Projection, Viewport};
use crate::render::{BufferPair, FramePipeline, FrameRenderer, FrameStats};
use crate::scene::{
    FlatMaterial, FrameTransforms, PbrMaterial, PhongMaterial, SceneParams, ShadingModel,
};
use crate::texture::Texture;
use crate::transform::Transform;

pub use crate::render::RasterizerType;

/// Which optional texture map a texture is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapSlot {
    Diffuse,
    Normal,
    Emission,
    /// Metallic, roughness and ambient occlusion.
    Mrao,
}

pub struct Engine {
    config: RendererConfig,
    projection: Projection,
    viewport: Viewport,
    scene: SceneParams,
    controller: OrbitCameraController,
    prepared: Arc<PreparedMesh>,
    normals: Option<Arc<WorldNormalCache>>,
    rasterizer: RasterizerType,
    pipeline: FramePipeline,
    dirty: bool,
}

impl Engine {
    /// Starts the frame pipeline and prepares `mesh` for drawing.
    pub fn new(config: RendererConfig, mesh: Mesh) -> Result<Self> {
        let projection = Projection::from_degrees(
            config.fov_degrees,
            config.aspect_ratio(),
            config.z_near,
            config.z_far,
        );
        let viewport = Viewport::new(config.width, config.height);
        let scene = SceneParams {
            camera: OrbitCamera::new(config.initial_radius),
            light: PointLight::new(config.light_position(), config.light_intensity),
            background: config.background,
            ..SceneParams::default()
        };
        let controller =
            OrbitCameraController::new(config.camera_sensitivity, config.scroll_divisor);
        let prepared = Arc::new(PreparedMesh::new(Arc::new(mesh), false)?);
        let pipeline = FramePipeline::new(
            config.width,
            config.height,
            config.buffer_count,
            config.worker_threads,
        )?;

        Ok(Self {
            config,
            projection,
            viewport,
            scene,
            controller,
            prepared,
            normals: None,
            rasterizer: RasterizerType::default(),
            pipeline,
            dirty: true,
        })
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn scene(&self) -> &SceneParams {
        &self.scene
    }

    pub fn mesh(&self) -> &Arc<Mesh> {
        self.prepared.mesh()
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Applies an arbitrary change to the scene and marks it dirty.
    pub fn update_scene(&mut self, f: impl FnOnce(&mut SceneParams)) {
        f(&mut self.scene);
        self.dirty = true;
    }

    // -------------------------------------------------------------------------
    // Mesh
    // -------------------------------------------------------------------------

    pub fn set_mesh(&mut self, mesh: Mesh) -> Result<()> {
        let force = self.prepared.forced_normals();
        self.prepared = Arc::new(PreparedMesh::new(Arc::new(mesh), force)?);
        self.normals = None;
        self.dirty = true;
        Ok(())
    }

    pub fn load_obj<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let mesh = Mesh::from_obj(path)?;
        self.set_mesh(mesh)
    }

    pub fn force_normals(&self) -> bool {
        self.prepared.forced_normals()
    }

    /// Switches between supplied normals and normals averaged from the
    /// adjacent faces. Rebuilds the prepared normals when the flag changes.
    pub fn set_force_normals(&mut self, force: bool) -> Result<()> {
        if force == self.prepared.forced_normals() {
            return Ok(());
        }
        let mesh = Arc::clone(self.prepared.mesh());
        self.prepared = Arc::new(PreparedMesh::new(mesh, force)?);
        self.normals = None;
        self.dirty = true;
        info!("normal recalculation {}", if force { "on" } else { "off" });
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Model transform
    // -------------------------------------------------------------------------

    pub fn transform(&self) -> &Transform {
        &self.scene.transform
    }

    pub fn set_transform(&mut self, transform: Transform) {
        self.scene.transform = transform;
        self.dirty = true;
    }

    pub fn translate(&mut self, delta: Vec3) {
        self.scene.transform.translate(delta);
        self.dirty = true;
    }

    /// Adds `delta` radians to the rotation about each axis.
    pub fn rotate(&mut self, delta: Vec3) {
        self.scene.transform.rotate(delta);
        self.dirty = true;
    }

    /// Adds `delta` to every scale component.
    pub fn grow(&mut self, delta: f32) {
        self.scene.transform.grow(delta);
        self.dirty = true;
    }

    // -------------------------------------------------------------------------
    // Camera
    // -------------------------------------------------------------------------

    pub fn camera(&self) -> &OrbitCamera {
        &self.scene.camera
    }

    /// Orbits the camera by a pointer drag of `(dx, dy)` pixels.
    pub fn drag(&mut self, dx: f32, dy: f32) {
        self.controller.drag(&mut self.scene.camera, dx, dy);
        self.dirty = true;
    }

    pub fn scroll(&mut self, dy: f32) {
        self.controller.scroll(&mut self.scene.camera, dy);
        self.dirty = true;
    }

    // -------------------------------------------------------------------------
    // Shading
    // -------------------------------------------------------------------------

    pub fn shading(&self) -> ShadingModel {
        self.scene.shading
    }

    pub fn set_shading(&mut self, shading: ShadingModel) {
        self.scene.shading = shading;
        self.dirty = true;
    }

    pub fn set_flat_material(&mut self, material: FlatMaterial) {
        self.scene.flat = material;
        self.dirty = true;
    }

    pub fn set_phong_material(&mut self, material: PhongMaterial) {
        self.scene.phong = material;
        self.dirty = true;
    }

    pub fn set_pbr_material(&mut self, material: PbrMaterial) {
        self.scene.pbr = material;
        self.dirty = true;
    }

    /// Binds or clears (`None`) one texture map.
    pub fn set_map(&mut self, slot: MapSlot, texture: Option<Arc<Texture>>) {
        let maps = &mut self.scene.maps;
        match slot {
            MapSlot::Diffuse => maps.diffuse = texture,
            MapSlot::Normal => maps.normal = texture,
            MapSlot::Emission => maps.emission = texture,
            MapSlot::Mrao => maps.mrao = texture,
        }
        self.dirty = true;
    }

    pub fn set_light(&mut self, light: PointLight) {
        self.scene.light = light;
        self.dirty = true;
    }

    pub fn set_background(&mut self, background: u32) {
        self.scene.background = background;
        self.dirty = true;
    }

    pub fn rasterizer(&self) -> RasterizerType {
        self.rasterizer
    }

    pub fn set_rasterizer(&mut self, rasterizer: RasterizerType) {
        self.rasterizer = rasterizer;
        self.dirty = true;
    }

    // -------------------------------------------------------------------------
    // Frames
    // -------------------------------------------------------------------------

    /// Matrices for the current state.
    pub fn frame_transforms(&self) -> Result<FrameTransforms> {
        FrameTransforms::new(
            &self.scene.transform,
            &self.scene.camera,
            &self.projection,
            &self.viewport,
        )
    }

    /// The world normal cache for the current mesh and model transform,
    /// reused while both stay the same.
    fn world_normals(&mut self, frame: &FrameTransforms) -> Arc<WorldNormalCache> {
        match &self.normals {
            Some(cache) if cache.matches(&self.prepared, &frame.normal_matrix) => Arc::clone(cache),
            _ => {
                debug!("rebuilding world normal cache");
                let cache = Arc::new(WorldNormalCache::new(
                    Arc::clone(&self.prepared),
                    frame.normal_matrix,
                ));
                self.normals = Some(Arc::clone(&cache));
                cache
            }
        }
    }

    /// Snapshots the scene and queues it for rendering.
    ///
    /// A singular transform fails here and nothing is queued. Render errors
    /// inside the worker are logged and the frame is dropped.
    pub fn request_frame(&mut self) -> Result<()> {
        let frame = self.frame_transforms()?;
        let normals = self.world_normals(&frame);
        let scene = self.scene.clone();
        let renderer = FrameRenderer::new(self.rasterizer);

        self.pipeline.submit(move |pair| {
            renderer.render(&scene, &normals, &frame, pair).map(|_| ())
        })?;
        self.dirty = false;
        Ok(())
    }

    /// Queues a frame only if something changed since the last request.
    pub fn request_frame_if_dirty(&mut self) -> Result<bool> {
        if !self.dirty {
            return Ok(false);
        }
        self.request_frame()?;
        Ok(true)
    }

    /// Renders the current state into `pair` on the calling thread, outside
    /// the pipeline.
    pub fn render_into(&mut self, pair: &mut BufferPair) -> Result<FrameStats> {
        let frame = self.frame_transforms()?;
        let normals = self.world_normals(&frame);
        FrameRenderer::new(self.rasterizer).render(&self.scene, &normals, &frame, pair)
    }

    /// Hands the newest finished frame to `sink`. See [`FramePipeline::present`].
    pub fn present<F>(&self, sink: F) -> bool
    where
        F: FnOnce(&BufferPair),
    {
        self.pipeline.present(sink)
    }

    pub fn with_displayed<R>(&self, f: impl FnOnce(&BufferPair) -> R) -> Option<R> {
        self.pipeline.with_displayed(f)
    }

    /// Blocks until every queued frame has been rendered or dropped.
    pub fn wait_idle(&self) {
        self.pipeline.wait_idle();
    }

    pub fn shutdown(&self) {
        self.pipeline.shutdown();
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.pipeline.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderError;

    fn small_config() -> RendererConfig {
        RendererConfig {
            width: 64,
            height: 48,
            worker_threads: 2,
            initial_radius: 4.0,
            ..RendererConfig::default()
        }
    }

    fn engine() -> Engine {
        Engine::new(small_config(), Mesh::cube()).unwrap()
    }

    #[test]
    fn requested_frame_is_presented() {
        let mut engine = engine();
        assert!(engine.is_dirty());
        engine.request_frame().unwrap();
        assert!(!engine.is_dirty());
        engine.wait_idle();

        let mut size = (0, 0);
        let mut drawn = 0;
        assert!(engine.present(|pair| {
            size = (pair.width(), pair.height());
            drawn = pair.depth().iter().filter(|d| d.is_finite()).count();
        }));
        assert_eq!(size, (64, 48));
        assert!(drawn > 0);
    }

    #[test]
    fn setters_mark_scene_dirty() {
        let mut engine = engine();
        engine.request_frame().unwrap();

        let changes: Vec<Box<dyn Fn(&mut Engine)>> = vec![
            Box::new(|e| e.translate(Vec3::new(0.1, 0.0, 0.0))),
            Box::new(|e| e.rotate(Vec3::new(0.0, 0.1, 0.0))),
            Box::new(|e| e.grow(0.1)),
            Box::new(|e| e.drag(3.0, -2.0)),
            Box::new(|e| e.scroll(1.0)),
            Box::new(|e| e.set_shading(ShadingModel::Pbr)),
            Box::new(|e| e.set_background(0xFF00_0000)),
            Box::new(|e| e.set_map(MapSlot::Diffuse, Some(Arc::new(Texture::solid(0xFFFF_FFFF))))),
            Box::new(|e| e.set_rasterizer(RasterizerType::EdgeFunction)),
        ];
        for change in changes {
            assert!(!engine.request_frame_if_dirty().unwrap());
            change(&mut engine);
            assert!(engine.is_dirty());
            assert!(engine.request_frame_if_dirty().unwrap());
            // unpresented frames would exhaust the pool
            engine.wait_idle();
            assert!(engine.present(|_| {}));
        }
    }

    #[test]
    fn snapshot_is_isolated_from_later_changes() {
        let mut engine = engine();
        engine.set_background(0xFF11_1111);
        engine.request_frame().unwrap();
        engine.set_background(0xFF22_2222);
        engine.wait_idle();

        let mut corner = None;
        assert!(engine.present(|pair| corner = pair.pixel(0, 0)));
        assert_eq!(corner, Some(0xFF11_1111));
    }

    #[test]
    fn singular_transform_is_rejected_before_queueing() {
        let mut engine = engine();
        let mut transform = Transform::default();
        transform.set_scale(Vec3::new(1.0, 0.0, 1.0));
        engine.set_transform(transform);

        let err = engine.request_frame().unwrap_err();
        assert!(matches!(err, RenderError::SingularMatrix { which: "model" }));
        assert!(engine.is_dirty());
        engine.wait_idle();
        assert!(!engine.present(|_| {}));
    }

    #[test]
    fn forcing_normals_rebuilds_prepared_mesh() {
        let mut engine = engine();
        assert!(!engine.force_normals());
        engine.request_frame().unwrap();
        engine.set_force_normals(true).unwrap();
        assert!(engine.force_normals());
        assert!(engine.is_dirty());
        engine.request_frame().unwrap();
        engine.wait_idle();
    }

    #[test]
    fn requests_fail_after_shutdown() {
        let mut engine = engine();
        engine.shutdown();
        assert!(matches!(
            engine.request_frame(),
            Err(RenderError::PipelineClosed)
        ));
    }
}
