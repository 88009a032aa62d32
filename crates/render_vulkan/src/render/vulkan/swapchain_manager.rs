//! Swapchain-dependent render targets
//!
//! [`SwapchainTargets`] holds one generation of targets (the swapchain, one
//! framebuffer and one command buffer per image) and rebuilds them through a
//! [`TargetAllocator`]. [`SwapchainManager`] pairs it with the render pass,
//! which outlives every generation.

use ash::vk;

use super::context::{VulkanContext, VulkanError, VulkanResult};
use super::framebuffer::Framebuffer;
use super::render_pass::RenderPass;
use super::swapchain::{choose_extent, choose_surface_format, SurfaceSupport, Swapchain};
use crate::render::frame::SwapchainState;

/// Creates and releases the objects one generation of targets is made of
///
/// Swapchains and framebuffers release themselves on drop; command buffers
/// go back through [`free_command_buffers`](Self::free_command_buffers).
pub trait TargetAllocator {
    /// Swapchain type
    type Swapchain;
    /// Framebuffer type
    type Framebuffer;

    /// Extent the surface accepts for a window framebuffer of `window_extent`
    fn negotiate_extent(&mut self, window_extent: vk::Extent2D) -> VulkanResult<vk::Extent2D>;

    /// Create a swapchain at `extent`
    fn create_swapchain(&mut self, extent: vk::Extent2D) -> VulkanResult<Self::Swapchain>;

    /// One view per swapchain image
    fn image_views(swapchain: &Self::Swapchain) -> &[vk::ImageView];

    /// Create a framebuffer over `view` for `render_pass`
    fn create_framebuffer(
        &mut self,
        render_pass: vk::RenderPass,
        view: vk::ImageView,
        extent: vk::Extent2D,
    ) -> VulkanResult<Self::Framebuffer>;

    /// Allocate primary command buffers
    fn allocate_command_buffers(&mut self, count: u32) -> VulkanResult<Vec<vk::CommandBuffer>>;

    /// Return command buffers to their pool
    fn free_command_buffers(&mut self, command_buffers: &[vk::CommandBuffer]);
}

/// One generation of swapchain targets for a fixed render pass
///
/// Empty, with a zero extent, while the surface has no area.
pub struct SwapchainTargets<S, F> {
    command_buffers: Vec<vk::CommandBuffer>,
    framebuffers: Vec<F>,
    swapchain: Option<S>,
    render_pass: vk::RenderPass,
    extent: vk::Extent2D,
}

impl<S, F> SwapchainTargets<S, F> {
    /// Empty targets for `render_pass`
    pub fn new(render_pass: vk::RenderPass) -> Self {
        Self {
            command_buffers: Vec::new(),
            framebuffers: Vec::new(),
            swapchain: None,
            render_pass,
            extent: vk::Extent2D::default(),
        }
    }

    /// Release the current generation and create one for `window_extent`
    ///
    /// The caller must have waited for the device to go idle.
    pub fn rebuild<A>(&mut self, allocator: &mut A, window_extent: vk::Extent2D) -> VulkanResult<SwapchainState>
    where
        A: TargetAllocator<Swapchain = S, Framebuffer = F>,
    {
        self.release(allocator);

        let extent = allocator.negotiate_extent(window_extent)?;
        if extent.width == 0 || extent.height == 0 {
            log::debug!("Surface has no area, swapchain left empty");
            return Ok(self.state());
        }

        let swapchain = allocator.create_swapchain(extent)?;

        let framebuffers = A::image_views(&swapchain)
            .iter()
            .map(|&view| allocator.create_framebuffer(self.render_pass, view, extent))
            .collect::<VulkanResult<Vec<_>>>()?;

        let image_count = u32::try_from(framebuffers.len()).map_err(|_| VulkanError::InvalidOperation {
            reason: "Swapchain image count overflows u32".to_string(),
        })?;
        let command_buffers = allocator.allocate_command_buffers(image_count)?;

        self.swapchain = Some(swapchain);
        self.framebuffers = framebuffers;
        self.command_buffers = command_buffers;
        self.extent = extent;
        Ok(self.state())
    }

    /// Free command buffers, then drop framebuffers before the swapchain whose views they use
    pub fn release<A>(&mut self, allocator: &mut A)
    where
        A: TargetAllocator<Swapchain = S, Framebuffer = F>,
    {
        allocator.free_command_buffers(&self.command_buffers);
        self.command_buffers.clear();
        self.framebuffers.clear();
        self.swapchain = None;
        self.extent = vk::Extent2D::default();
    }

    /// Extent and image count the scheduler should track
    pub fn state(&self) -> SwapchainState {
        SwapchainState {
            extent: self.extent,
            image_count: self.image_count(),
        }
    }

    /// Current swapchain
    pub fn swapchain(&self) -> Option<&S> {
        self.swapchain.as_ref()
    }

    /// Render pass every framebuffer was created for
    pub fn render_pass(&self) -> vk::RenderPass {
        self.render_pass
    }

    /// Framebuffer for a swapchain image
    pub fn framebuffer(&self, image_index: u32) -> Option<&F> {
        self.framebuffers.get(image_index as usize)
    }

    /// Command buffer for a swapchain image
    pub fn command_buffer(&self, image_index: u32) -> Option<vk::CommandBuffer> {
        self.command_buffers.get(image_index as usize).copied()
    }

    /// Extent the targets were created with
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// Number of swapchain images
    pub fn image_count(&self) -> usize {
        self.framebuffers.len()
    }
}

/// [`TargetAllocator`] over the device context
struct VulkanTargets<'a> {
    context: &'a VulkanContext,
    support: SurfaceSupport,
    format: vk::SurfaceFormatKHR,
}

impl<'a> VulkanTargets<'a> {
    fn new(context: &'a VulkanContext, format: vk::SurfaceFormatKHR) -> VulkanResult<Self> {
        Ok(Self {
            context,
            support: SurfaceSupport::for_context(context)?,
            format,
        })
    }
}

impl TargetAllocator for VulkanTargets<'_> {
    type Swapchain = Swapchain;
    type Framebuffer = Framebuffer;

    fn negotiate_extent(&mut self, window_extent: vk::Extent2D) -> VulkanResult<vk::Extent2D> {
        Ok(choose_extent(&self.support.capabilities, window_extent))
    }

    fn create_swapchain(&mut self, extent: vk::Extent2D) -> VulkanResult<Swapchain> {
        Swapchain::new(self.context, &self.support, self.format, extent)
    }

    fn image_views(swapchain: &Swapchain) -> &[vk::ImageView] {
        swapchain.image_views()
    }

    fn create_framebuffer(
        &mut self,
        render_pass: vk::RenderPass,
        view: vk::ImageView,
        extent: vk::Extent2D,
    ) -> VulkanResult<Framebuffer> {
        Framebuffer::new(self.context.device().clone(), render_pass, &[view], extent)
    }

    fn allocate_command_buffers(&mut self, count: u32) -> VulkanResult<Vec<vk::CommandBuffer>> {
        self.context.command_pool().allocate_command_buffers(count)
    }

    fn free_command_buffers(&mut self, command_buffers: &[vk::CommandBuffer]) {
        self.context.command_pool().free_command_buffers(command_buffers);
    }
}

/// Swapchain targets plus the render pass they are created for
///
/// The surface format is negotiated once; the render pass is never rebuilt.
pub struct SwapchainManager {
    targets: SwapchainTargets<Swapchain, Framebuffer>,
    render_pass: RenderPass,
    format: vk::SurfaceFormatKHR,
}

impl SwapchainManager {
    /// Negotiate the surface format, create the render pass and the first set of targets
    pub fn new(context: &VulkanContext, window_extent: vk::Extent2D) -> VulkanResult<Self> {
        let support = SurfaceSupport::for_context(context)?;
        let format = choose_surface_format(&support.formats)
            .ok_or_else(|| VulkanError::InitializationFailed("Surface reports no formats".to_string()))?;

        let render_pass = RenderPass::new_color_pass(context.device().clone(), format.format)?;

        let mut manager = Self {
            targets: SwapchainTargets::new(render_pass.handle()),
            render_pass,
            format,
        };
        manager.rebuild(context, window_extent)?;

        Ok(manager)
    }

    /// Destroy the swapchain targets and build them again for `window_extent`
    ///
    /// The caller must have waited for the device to go idle.
    pub fn rebuild(&mut self, context: &VulkanContext, window_extent: vk::Extent2D) -> VulkanResult<SwapchainState> {
        let mut allocator = VulkanTargets::new(context, self.format)?;
        self.targets.rebuild(&mut allocator, window_extent)
    }

    /// Extent and image count the scheduler should track
    pub fn state(&self) -> SwapchainState {
        self.targets.state()
    }

    /// Current swapchain, absent while the surface has no area
    pub fn swapchain(&self) -> Option<&Swapchain> {
        self.targets.swapchain()
    }

    /// Render pass compatible with every framebuffer
    pub fn render_pass(&self) -> vk::RenderPass {
        self.render_pass.handle()
    }

    /// Framebuffer for a swapchain image
    pub fn framebuffer(&self, image_index: u32) -> Option<vk::Framebuffer> {
        self.targets.framebuffer(image_index).map(Framebuffer::handle)
    }

    /// Command buffer recorded for a swapchain image
    pub fn command_buffer(&self, image_index: u32) -> Option<vk::CommandBuffer> {
        self.targets.command_buffer(image_index)
    }

    /// Extent the targets were created with
    pub fn extent(&self) -> vk::Extent2D {
        self.targets.extent()
    }

    /// Number of swapchain images
    pub fn image_count(&self) -> usize {
        self.targets.image_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Decrements its counter on drop
    struct Live(Rc<Cell<usize>>);

    impl Live {
        fn new(counter: &Rc<Cell<usize>>) -> Self {
            counter.set(counter.get() + 1);
            Self(Rc::clone(counter))
        }
    }

    impl Drop for Live {
        fn drop(&mut self) {
            self.0.set(self.0.get() - 1);
        }
    }

    struct FakeSwapchain {
        views: Vec<vk::ImageView>,
        _live: Live,
    }

    struct FakeFramebuffer {
        render_pass: vk::RenderPass,
        _live: Live,
    }

    /// Tracks how many of each object are alive
    struct CountingAllocator {
        image_count: u64,
        next_handle: u64,
        swapchains: Rc<Cell<usize>>,
        framebuffers: Rc<Cell<usize>>,
        command_buffers: Vec<vk::CommandBuffer>,
        freed: Vec<vk::CommandBuffer>,
    }

    impl CountingAllocator {
        fn new(image_count: u64) -> Self {
            Self {
                image_count,
                next_handle: 1,
                swapchains: Rc::new(Cell::new(0)),
                framebuffers: Rc::new(Cell::new(0)),
                command_buffers: Vec::new(),
                freed: Vec::new(),
            }
        }

        fn handle(&mut self) -> u64 {
            self.next_handle += 1;
            self.next_handle
        }

        fn counts(&self) -> (usize, usize, usize) {
            (self.swapchains.get(), self.framebuffers.get(), self.command_buffers.len())
        }
    }

    impl TargetAllocator for CountingAllocator {
        type Swapchain = FakeSwapchain;
        type Framebuffer = FakeFramebuffer;

        fn negotiate_extent(&mut self, window_extent: vk::Extent2D) -> VulkanResult<vk::Extent2D> {
            Ok(window_extent)
        }

        fn create_swapchain(&mut self, _extent: vk::Extent2D) -> VulkanResult<FakeSwapchain> {
            let views = (0..self.image_count)
                .map(|_| vk::ImageView::from_raw(self.handle()))
                .collect();
            Ok(FakeSwapchain {
                views,
                _live: Live::new(&self.swapchains),
            })
        }

        fn image_views(swapchain: &FakeSwapchain) -> &[vk::ImageView] {
            &swapchain.views
        }

        fn create_framebuffer(
            &mut self,
            render_pass: vk::RenderPass,
            _view: vk::ImageView,
            _extent: vk::Extent2D,
        ) -> VulkanResult<FakeFramebuffer> {
            Ok(FakeFramebuffer {
                render_pass,
                _live: Live::new(&self.framebuffers),
            })
        }

        fn allocate_command_buffers(&mut self, count: u32) -> VulkanResult<Vec<vk::CommandBuffer>> {
            let buffers: Vec<vk::CommandBuffer> = (0..count)
                .map(|_| vk::CommandBuffer::from_raw(self.handle()))
                .collect();
            self.command_buffers.extend(&buffers);
            Ok(buffers)
        }

        fn free_command_buffers(&mut self, command_buffers: &[vk::CommandBuffer]) {
            self.command_buffers.retain(|buffer| !command_buffers.contains(buffer));
            self.freed.extend(command_buffers);
        }
    }

    fn extent(width: u32, height: u32) -> vk::Extent2D {
        vk::Extent2D { width, height }
    }

    #[test]
    fn test_rebuild_at_same_size_keeps_object_counts() {
        let render_pass = vk::RenderPass::from_raw(0xAB);
        let mut allocator = CountingAllocator::new(3);
        let mut targets = SwapchainTargets::new(render_pass);

        let before = targets.rebuild(&mut allocator, extent(750, 450)).unwrap();
        let counts_before = allocator.counts();
        let first_buffers: Vec<vk::CommandBuffer> = (0..3).filter_map(|i| targets.command_buffer(i)).collect();

        let after = targets.rebuild(&mut allocator, extent(750, 450)).unwrap();

        assert_eq!(counts_before, (1, 3, 3));
        assert_eq!(allocator.counts(), counts_before);
        assert_eq!(before, after);
        assert_eq!(allocator.freed, first_buffers);
        assert_eq!(targets.render_pass(), render_pass);
        assert!((0..3).all(|i| targets.framebuffer(i).map(|fb| fb.render_pass) == Some(render_pass)));
        assert!((0..3).all(|i| !first_buffers.contains(&targets.command_buffer(i).unwrap())));
    }

    #[test]
    fn test_zero_area_releases_everything_until_next_rebuild() {
        let mut allocator = CountingAllocator::new(2);
        let mut targets = SwapchainTargets::new(vk::RenderPass::from_raw(1));
        targets.rebuild(&mut allocator, extent(750, 450)).unwrap();

        let state = targets.rebuild(&mut allocator, extent(0, 0)).unwrap();

        assert_eq!(state.extent, extent(0, 0));
        assert_eq!(state.image_count, 0);
        assert_eq!(allocator.counts(), (0, 0, 0));
        assert!(targets.swapchain().is_none());
        assert!(targets.command_buffer(0).is_none());

        let state = targets.rebuild(&mut allocator, extent(800, 600)).unwrap();

        assert_eq!(state.extent, extent(800, 600));
        assert_eq!(state.image_count, 2);
        assert_eq!(allocator.counts(), (1, 2, 2));
    }

    #[test]
    fn test_release_frees_command_buffers() {
        let mut allocator = CountingAllocator::new(3);
        let mut targets = SwapchainTargets::new(vk::RenderPass::from_raw(1));
        targets.rebuild(&mut allocator, extent(640, 480)).unwrap();

        targets.release(&mut allocator);

        assert_eq!(allocator.counts(), (0, 0, 0));
        assert_eq!(allocator.freed.len(), 3);
        assert_eq!(targets.extent(), extent(0, 0));
    }
}
