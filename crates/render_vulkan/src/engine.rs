//! Core engine implementation

use crate::{
    application::Application,
    config::{ConfigError, EngineConfig},
    ecs::GameObjectManager,
    foundation::time::Timer,
    render::{
        mesh::{Mesh, MeshRenderer},
        shader::{Shader, ShaderManager, ShaderPaths},
        vulkan::{VulkanError, Window, WindowError, WindowEvent},
        DrawContext, Renderer,
    },
};
use thiserror::Error;

/// Main engine struct
///
/// Owns the window, the renderer, the shader registry and the scene, and runs
/// the main loop. Field order is drop order: scene resources go before the
/// shaders they use, those before the renderer and its device, the window last.
/// Dropping the engine first waits for the GPU to finish every submitted frame.
pub struct Engine {
    /// Game objects updated and rendered every frame
    pub scene: GameObjectManager,

    /// Shaders by name
    pub shaders: ShaderManager,

    renderer: Renderer,
    window: Window,
    timer: Timer,
    config: EngineConfig,
    running: bool,
}

impl Engine {
    /// Create the window and renderer described by `config`
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        log::info!(
            "Initializing engine: '{}' {}x{}, assets at {}",
            config.window.title,
            config.window.width,
            config.window.height,
            config.asset_root.display()
        );

        let mut window = Window::new(&config.window.title, config.window.width, config.window.height)?;
        let renderer = Renderer::new(&mut window, &config.renderer)?;

        Ok(Self {
            scene: GameObjectManager::new(),
            shaders: ShaderManager::new(),
            renderer,
            window,
            timer: Timer::new(),
            config,
            running: true,
        })
    }

    /// Run the engine main loop with the given application
    pub fn run<T: Application>(config: EngineConfig, app: &mut T) -> Result<(), EngineError> {
        let mut engine = Self::new(config)?;

        app.initialize(&mut engine)
            .map_err(|e| EngineError::ApplicationError(format!("App initialization: {e}")))?;

        log::info!("Starting main loop...");

        run_then_cleanup(
            &mut engine,
            app,
            |engine, app| engine.main_loop(app),
            |engine, app| {
                app.cleanup(engine);
                engine.cleanup();
            },
        )?;

        log::info!(
            "Engine shutdown complete after {} frames ({:.1} fps average)",
            engine.timer.frame_count(),
            engine.timer.average_fps()
        );
        Ok(())
    }

    fn main_loop<T: Application>(&mut self, app: &mut T) -> Result<(), EngineError> {
        while self.running {
            self.timer.update();
            let delta_time = self.timer.delta_time();

            app.update(self, delta_time)
                .map_err(|e| EngineError::ApplicationError(format!("App update: {e}")))?;
            self.scene.update(delta_time);

            self.handle_events(app)?;
            if !self.running {
                break;
            }

            self.render_frame()?;
        }
        Ok(())
    }

    /// Load `<asset_root>/<default_domain>/<local_path>{Vertex,Fragment}.spv` and register it as `name`
    pub fn load_shader(&mut self, local_path: &str, name: &str) -> Result<(), EngineError> {
        let paths = ShaderPaths::resolve(&self.config.asset_root, &self.config.default_domain, local_path);
        let shader = Shader::load(self.renderer.context(), self.renderer.render_pass(), &paths)?;
        self.shaders.register(name, shader);
        Ok(())
    }

    /// Upload `mesh` and pair it with the shader registered as `shader_name`
    pub fn create_mesh_renderer(&self, shader_name: &str, mesh: Mesh) -> Result<MeshRenderer, EngineError> {
        let shader = self
            .shaders
            .get(shader_name)
            .ok_or_else(|| EngineError::ShaderNotRegistered(shader_name.to_string()))?;

        Ok(MeshRenderer::new(
            self.renderer.context(),
            shader,
            mesh,
            self.renderer.frames_in_flight(),
        )?)
    }

    fn handle_events<T: Application>(&mut self, app: &mut T) -> Result<(), EngineError> {
        let mut resized = None;
        for event in self.window.poll_events() {
            match event {
                WindowEvent::Resized { width, height } => resized = Some((width, height)),
                WindowEvent::CloseRequested => self.quit(),
            }
        }

        if let Some((width, height)) = resized {
            log::debug!("Framebuffer resized to {width}x{height}");
            self.renderer.resize(width, height)?;
            app.on_resize(self, width, height)
                .map_err(|e| EngineError::ApplicationError(format!("App resize: {e}")))?;
        }

        if self.window.should_close() {
            self.quit();
        }
        Ok(())
    }

    fn render_frame(&mut self) -> Result<(), EngineError> {
        // The renderer is borrowed mutably for the frame, so components get their own device handle
        let device = self.renderer.context().device().clone();
        let frame_slot = self.renderer.current_frame();
        let extent = self.renderer.extent();

        let scene = &mut self.scene;
        let mut draw_error = None;
        let result = self.renderer.render_with(&mut |command_buffer, image_index| {
            let ctx = DrawContext {
                device: &device,
                command_buffer,
                image_index,
                frame_slot,
                extent,
            };
            if let Err(e) = scene.render(&ctx) {
                draw_error.get_or_insert(e);
            }
        });

        match result {
            Ok(_) => {}
            Err(e) if e.is_recoverable() => {
                let (width, height) = self.window.framebuffer_size();
                log::debug!("{e}; rebuilding swapchain at {width}x{height}");
                self.renderer.resize(width, height)?;
            }
            Err(e) => return Err(e.into()),
        }

        match draw_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    fn cleanup(&mut self) {
        log::info!("Cleaning up engine...");
        if let Err(e) = self.renderer.wait_idle() {
            log::error!("Failed to wait for device idle: {e}");
        }
        self.scene.cleanup();
        self.shaders.cleanup();
    }

    /// Request engine shutdown
    pub fn quit(&mut self) {
        if self.running {
            log::info!("Engine shutdown requested");
        }
        self.running = false;
    }

    /// Get the renderer
    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Get the window
    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Get the engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Get the current frame delta time
    pub fn delta_time(&self) -> f32 {
        self.timer.delta_time()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        // Scene and shader resources are freed next and may still be referenced by queued frames
        if let Err(e) = self.renderer.wait_idle() {
            log::error!("Failed to wait for device idle during engine shutdown: {e}");
        }
    }
}

/// Run `body`, then `cleanup` whether or not `body` failed
fn run_then_cleanup<S, A, T, E>(
    state: &mut S,
    app: &mut A,
    body: impl FnOnce(&mut S, &mut A) -> Result<T, E>,
    cleanup: impl FnOnce(&mut S, &mut A),
) -> Result<T, E> {
    let result = body(state, app);
    cleanup(state, app);
    result
}

/// Engine-level errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Window creation or surface error
    #[error("Window error: {0}")]
    Window(#[from] WindowError),

    /// Vulkan error
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] VulkanError),

    /// Invalid or unreadable configuration
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Application callback error
    #[error("Application error: {0}")]
    ApplicationError(String),

    /// A shader name was used before it was registered
    #[error("Shader not registered: {0}")]
    ShaderNotRegistered(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_conversions() {
        let error: EngineError = VulkanError::SurfaceOutOfDate.into();
        assert!(matches!(error, EngineError::Vulkan(VulkanError::SurfaceOutOfDate)));

        let error: EngineError = ConfigError::Invalid("bad".to_string()).into();
        assert!(error.to_string().contains("bad"));
    }

    #[test]
    fn test_cleanup_runs_after_failed_loop() {
        let mut log = Vec::new();
        let mut app_cleaned = false;

        let result: Result<(), EngineError> = run_then_cleanup(
            &mut log,
            &mut app_cleaned,
            |log, _| {
                log.push("frame");
                Err(VulkanError::DeviceLost.into())
            },
            |log, app_cleaned| {
                log.push("cleanup");
                *app_cleaned = true;
            },
        );

        assert!(matches!(result, Err(EngineError::Vulkan(VulkanError::DeviceLost))));
        assert_eq!(log, vec!["frame", "cleanup"]);
        assert!(app_cleaned);
    }

    #[test]
    fn test_cleanup_runs_after_clean_exit() {
        let mut calls = 0;
        let mut cleaned = false;

        let result: Result<u32, EngineError> = run_then_cleanup(
            &mut calls,
            &mut cleaned,
            |calls, _| {
                *calls += 1;
                Ok(3)
            },
            |_, cleaned| *cleaned = true,
        );

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls, 1);
        assert!(cleaned);
    }

    #[test]
    fn test_invalid_config_fails_before_window_creation() {
        let renderer = crate::config::RendererConfig::new("x").with_max_frames_in_flight(0);
        let config = EngineConfig::default().with_renderer(renderer);
        assert!(matches!(Engine::new(config), Err(EngineError::Config(_))));
    }
}
