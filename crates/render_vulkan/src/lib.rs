//! # RenderVulkan
//!
//! A minimal real-time renderer built directly on Vulkan, with a small
//! entity-component scene layer on top.
//!
//! ## Features
//!
//! - **Device lifecycle**: instance, surface, physical device selection, logical device
//! - **Swapchain management**: creation and wholesale rebuild on resize
//! - **Frames in flight**: fence/semaphore pipelining with a testable frame scheduler
//! - **Static geometry upload**: staged host-to-device buffer transfers
//! - **Scene layer**: game objects, components and transforms
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use render_vulkan::prelude::*;
//!
//! struct MyApp;
//!
//! impl Application for MyApp {
//!     fn initialize(&mut self, engine: &mut Engine) -> Result<(), AppError> {
//!         Ok(())
//!     }
//!
//!     fn update(&mut self, engine: &mut Engine, delta_time: f32) -> Result<(), AppError> {
//!         Ok(())
//!     }
//!
//!     fn cleanup(&mut self, engine: &mut Engine) {}
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut app = MyApp;
//!     Engine::run(EngineConfig::default(), &mut app)?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod ecs;
pub mod foundation;
pub mod render;

mod application;
mod engine;

pub use application::{AppError, Application};
pub use engine::{Engine, EngineError};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        AppError, Application, Engine, EngineError,
        config::{Config, EngineConfig, RendererConfig, WindowConfig},
        ecs::{Component, GameObject, GameObjectManager, Transform},
        foundation::math::{Mat4, Vec3},
        render::{
            mesh::{Mesh, MeshRenderer},
            shader::{Shader, ShaderManager},
            vertex::Vertex,
            DrawContext, Renderer,
        },
    };
}
