use std::env;
use std::f32::consts::PI;

use log::{error, info, warn};
use softrast::prelude::*;
use softrast::window::{FrameLimiter, Key, Window, WindowEvent};

const CONFIG_PATH: &str = "softrast.toml";
const ROTATION_STEP: f32 = PI / 32.0;
const TRANSLATION_STEP: f32 = 1.0;
const SCALE_STEP: f32 = 1.0;
const MIN_SCALE: f32 = 0.05;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let config = RendererConfig::load_or_default(CONFIG_PATH);
    let mesh = match env::args().nth(1) {
        Some(path) => {
            info!("loading {path}");
            Mesh::from_obj(&path)?
        }
        None => Mesh::cube(),
    };

    let mut window = Window::new("softrast", config.width, config.height)?;
    let mut engine = Engine::new(config, mesh)?;
    let mut limiter = FrameLimiter::new(&window);

    'running: loop {
        for event in window.poll_events() {
            match event {
                WindowEvent::Quit => break 'running,
                WindowEvent::KeyDown(key) => handle_key(&mut engine, &window, key)?,
                WindowEvent::Drag(dx, dy) => engine.drag(dx, dy),
                WindowEvent::Scroll(dy) => engine.scroll(dy),
            }
        }

        match engine.request_frame_if_dirty() {
            Ok(_) => {}
            Err(RenderError::SingularMatrix { which }) => {
                warn!("{which} matrix is singular, frame skipped");
            }
            Err(e) => return Err(e.into()),
        }

        let mut presented = Ok(());
        engine.present(|pair| presented = window.present(&pair.color_bytes()));
        if let Err(e) = presented {
            error!("present failed: {e}");
        }

        limiter.wait_and_get_delta(&window);
    }

    engine.shutdown();
    Ok(())
}

/// Arrows act on the axes whose keys are held: left/right rotate, up/down
/// translate.
fn handle_key(engine: &mut Engine, window: &Window, key: Key) -> softrast::Result<()> {
    let input = window.input();
    let held = Vec3::new(
        if input.is_held(Key::X) { 1.0 } else { 0.0 },
        if input.is_held(Key::Y) { 1.0 } else { 0.0 },
        if input.is_held(Key::Z) { 1.0 } else { 0.0 },
    );

    match key {
        Key::Right => engine.rotate(held * ROTATION_STEP),
        Key::Left => engine.rotate(held * -ROTATION_STEP),
        Key::Up => engine.translate(held * TRANSLATION_STEP),
        Key::Down => engine.translate(held * -TRANSLATION_STEP),
        Key::P => engine.grow(SCALE_STEP),
        Key::M => {
            let scale = engine.transform().scale().x;
            engine.grow((scale - SCALE_STEP).max(MIN_SCALE) - scale);
        }
        Key::Num1 => engine.set_shading(ShadingModel::Flat),
        Key::Num2 => engine.set_shading(ShadingModel::Phong),
        Key::Num3 => engine.set_shading(ShadingModel::Pbr),
        Key::N => engine.set_force_normals(!engine.force_normals())?,
        Key::R => {
            let next = match engine.rasterizer() {
                RasterizerType::Scanline => RasterizerType::EdgeFunction,
                RasterizerType::EdgeFunction => RasterizerType::Scanline,
            };
            info!("rasterizer: {next}");
            engine.set_rasterizer(next);
        }
        Key::X | Key::Y | Key::Z => {}
    }
    Ok(())
}
