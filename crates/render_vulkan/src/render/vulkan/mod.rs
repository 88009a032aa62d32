//! Vulkan rendering backend
//!
//! Thin RAII wrappers over the Vulkan objects the renderer needs. Every
//! wrapper owns its handle and destroys it on drop; anything allocated
//! against the device receives the [`VulkanContext`] by reference.

pub mod buffer;
pub mod commands;
pub mod context;
pub mod descriptor;
pub mod framebuffer;
pub mod render_pass;
pub mod shader;
pub mod swapchain;
pub mod swapchain_manager;
pub mod sync;
pub mod window;

pub use buffer::{copy_buffer, find_memory_type, Buffer, UniformBuffer};
pub use commands::{ActiveRenderPass, CommandPool, CommandRecorder};
pub use context::{
    LogicalDevice, PhysicalDeviceInfo, VulkanContext, VulkanError, VulkanInstance, VulkanResult,
};
pub use descriptor::{DescriptorManager, DescriptorSetLayout, DescriptorSetLayoutBuilder};
pub use framebuffer::Framebuffer;
pub use render_pass::RenderPass;
pub use shader::{GraphicsPipeline, ShaderModule};
pub use swapchain::{Swapchain, SurfaceSupport};
pub use swapchain_manager::{SwapchainManager, SwapchainTargets, TargetAllocator};
pub use sync::{Fence, FrameSync, Semaphore};
pub use window::{Window, WindowError, WindowEvent};
