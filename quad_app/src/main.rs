//! Quad demo application
//!
//! Draws a quad with one colour per corner and spins it slowly about Z.

use render_vulkan::foundation::logging;
use render_vulkan::prelude::*;

const SHADER_NAME: &str = "default";
const OBJECT_NAME: &str = "gameObject";

/// Degrees added about Z on every update
const SPIN_PER_UPDATE: f32 = -0.01;

struct QuadApp;

impl Application for QuadApp {
    fn initialize(&mut self, engine: &mut Engine) -> Result<(), AppError> {
        engine.load_shader("Shader/Default", SHADER_NAME)?;

        let mut object = GameObject::new(OBJECT_NAME);
        object.add_component(engine.create_mesh_renderer(SHADER_NAME, Mesh::quad("mesh"))?);
        engine.scene.register(object);

        log::info!("Quad scene ready");
        Ok(())
    }

    fn update(&mut self, engine: &mut Engine, _delta_time: f32) -> Result<(), AppError> {
        let object = engine
            .scene
            .get_mut(OBJECT_NAME)
            .ok_or_else(|| AppError::Custom(format!("Game object '{OBJECT_NAME}' is missing")))?;
        object.transform_mut().rotate(Vec3::new(0.0, 0.0, SPIN_PER_UPDATE));
        Ok(())
    }

    fn on_resize(&mut self, _engine: &mut Engine, width: u32, height: u32) -> Result<(), AppError> {
        log::debug!("Quad app sees {width}x{height}");
        Ok(())
    }

    fn cleanup(&mut self, _engine: &mut Engine) {
        log::info!("Cleaning up quad app...");
    }
}

fn main() {
    logging::init();
    log::info!("Starting RenderVulkan quad demo");

    let config = EngineConfig::default().with_asset_root(concat!(env!("CARGO_MANIFEST_DIR"), "/Assets"));

    if let Err(e) = Engine::run(config, &mut QuadApp) {
        logging::fatal(&e);
    }

    log::info!("Quad demo finished successfully");
}
