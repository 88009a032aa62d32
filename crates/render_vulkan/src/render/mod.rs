//! Rendering system
//!
//! `vulkan` wraps the raw API objects; the rest of this module builds the
//! frame loop, the vertex format, shaders and meshes on top of it.

pub mod frame;
pub mod mesh;
pub mod renderer;
pub mod shader;
pub mod vertex;
pub mod vulkan;

pub use frame::{FrameOutcome, FramePhase, FrameScheduler, MAX_FRAMES_IN_FLIGHT};
pub use renderer::Renderer;

use ash::vk;

/// Per-frame state handed to components while the render pass is open
pub struct DrawContext<'a> {
    /// Logical device for recording commands
    pub device: &'a ash::Device,
    /// Command buffer inside the active render pass
    pub command_buffer: vk::CommandBuffer,
    /// Swapchain image being rendered
    pub image_index: u32,
    /// Frame-in-flight slot; selects per-slot uniform buffers
    pub frame_slot: usize,
    /// Render target extent
    pub extent: vk::Extent2D,
}

impl DrawContext<'_> {
    /// Full-extent viewport with a 0..1 depth range
    pub fn viewport(&self) -> vk::Viewport {
        full_viewport(self.extent)
    }

    /// Full-extent scissor
    pub fn scissor(&self) -> vk::Rect2D {
        full_scissor(self.extent)
    }
}

pub(crate) fn full_viewport(extent: vk::Extent2D) -> vk::Viewport {
    vk::Viewport {
        x: 0.0,
        y: 0.0,
        width: extent.width as f32,
        height: extent.height as f32,
        min_depth: 0.0,
        max_depth: 1.0,
    }
}

pub(crate) fn full_scissor(extent: vk::Extent2D) -> vk::Rect2D {
    vk::Rect2D {
        offset: vk::Offset2D { x: 0, y: 0 },
        extent,
    }
}
