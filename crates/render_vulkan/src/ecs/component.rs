//! Component trait

use std::any::Any;

use crate::ecs::Transform;
use crate::render::vulkan::VulkanResult;
use crate::render::DrawContext;

/// Behaviour or data attached to a game object
///
/// Every hook receives the owning object's transform. Only `as_any` and
/// `as_any_mut` must be implemented; they back typed lookups on
/// [`GameObject`](crate::ecs::GameObject).
pub trait Component: Any {
    /// Called once when the component is added
    fn initialize(&mut self, _transform: &mut Transform) {}

    /// Called once per frame before rendering
    fn update(&mut self, _transform: &mut Transform, _delta_time: f32) {}

    /// Record draw commands inside the active render pass
    fn render(&mut self, _ctx: &DrawContext, _transform: &mut Transform) -> VulkanResult<()> {
        Ok(())
    }

    /// Called when the component is removed or its object is cleaned up
    fn cleanup(&mut self) {}

    /// Upcast for downcasting to the concrete type
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete type
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
