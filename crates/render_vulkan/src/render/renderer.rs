//! Vulkan renderer
//!
//! Owns the device context, the swapchain targets and the frame slots, and
//! drives them through a [`FrameScheduler`] each frame.

use ash::vk;

use crate::config::RendererConfig;
use crate::render::frame::{FrameBackend, FrameOutcome, FrameScheduler, SwapchainState};
use crate::render::vulkan::{
    CommandRecorder, FrameSync, SwapchainManager, VulkanContext, VulkanError, VulkanResult, Window,
};
use crate::render::{full_scissor, full_viewport};

type RenderCallback = Box<dyn FnMut(vk::CommandBuffer, u32)>;

/// Frames-in-flight renderer over one window surface
///
/// Field order is drop order: frame objects and swapchain targets are
/// released before the device context.
pub struct Renderer {
    scheduler: FrameScheduler,
    frames: Vec<FrameSync>,
    swapchain: SwapchainManager,
    render_callback: Option<RenderCallback>,
    clear_color: [f32; 4],
    context: VulkanContext,
}

impl Renderer {
    /// Create the device context, the swapchain and the frame slots for `window`
    pub fn new(window: &mut Window, config: &RendererConfig) -> VulkanResult<Self> {
        let context = VulkanContext::new(window, config)?;
        let swapchain = SwapchainManager::new(&context, window.framebuffer_extent())?;

        let frames = (0..config.max_frames_in_flight)
            .map(|_| FrameSync::new(context.device()))
            .collect::<VulkanResult<Vec<_>>>()?;

        let scheduler = FrameScheduler::new(frames.len(), swapchain.extent(), swapchain.image_count());

        log::info!(
            "Renderer ready: {}x{}, {} swapchain images, {} frames in flight",
            swapchain.extent().width,
            swapchain.extent().height,
            swapchain.image_count(),
            frames.len()
        );

        Ok(Self {
            scheduler,
            frames,
            swapchain,
            render_callback: None,
            clear_color: config.clear_color,
            context,
        })
    }

    /// Install the callback [`render`](Self::render) records inside the render pass
    pub fn set_render_callback(&mut self, callback: impl FnMut(vk::CommandBuffer, u32) + 'static) {
        self.render_callback = Some(Box::new(callback));
    }

    /// Render one frame with the installed callback
    pub fn render(&mut self) -> VulkanResult<FrameOutcome> {
        let Self {
            scheduler,
            frames,
            swapchain,
            render_callback,
            clear_color,
            context,
        } = self;

        let mut backend = VulkanFrames {
            context,
            targets: swapchain,
            frames,
            clear_color: *clear_color,
        };

        match render_callback {
            Some(callback) => scheduler.tick(&mut backend, &mut **callback),
            None => scheduler.tick(&mut backend, &mut |_, _| {}),
        }
    }

    /// Render one frame, recording `callback` instead of the installed one
    pub fn render_with(&mut self, callback: &mut dyn FnMut(vk::CommandBuffer, u32)) -> VulkanResult<FrameOutcome> {
        let mut backend = VulkanFrames {
            context: &self.context,
            targets: &mut self.swapchain,
            frames: &self.frames,
            clear_color: self.clear_color,
        };
        self.scheduler.tick(&mut backend, callback)
    }

    /// Rebuild the swapchain for a new framebuffer size; zero suspends rendering
    pub fn resize(&mut self, width: u32, height: u32) -> VulkanResult<()> {
        let mut backend = VulkanFrames {
            context: &self.context,
            targets: &mut self.swapchain,
            frames: &self.frames,
            clear_color: self.clear_color,
        };
        self.scheduler.resize(&mut backend, width, height)
    }

    /// Extent frames are rendered at; zero while suspended
    pub fn extent(&self) -> vk::Extent2D {
        self.scheduler.extent()
    }

    /// Slot the next frame will use
    pub fn current_frame(&self) -> usize {
        self.scheduler.current_frame()
    }

    /// Number of frame slots
    pub fn frames_in_flight(&self) -> usize {
        self.frames.len()
    }

    /// Render pass every pipeline must be compatible with
    pub fn render_pass(&self) -> vk::RenderPass {
        self.swapchain.render_pass()
    }

    /// Device context
    pub fn context(&self) -> &VulkanContext {
        &self.context
    }

    /// Block until the GPU has finished all submitted work
    pub fn wait_idle(&self) -> VulkanResult<()> {
        self.context.wait_idle()
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        if let Err(e) = self.context.wait_idle() {
            log::error!("Failed to wait for device idle during renderer shutdown: {e}");
        }
        log::debug!("Renderer destroyed");
    }
}

/// [`FrameBackend`] over the renderer's Vulkan objects
struct VulkanFrames<'a> {
    context: &'a VulkanContext,
    targets: &'a mut SwapchainManager,
    frames: &'a [FrameSync],
    clear_color: [f32; 4],
}

impl VulkanFrames<'_> {
    fn sync(&self, slot: usize) -> VulkanResult<&FrameSync> {
        self.frames.get(slot).ok_or_else(|| VulkanError::InvalidOperation {
            reason: format!("Frame slot {slot} out of range ({} slots)", self.frames.len()),
        })
    }

    fn command_buffer(&self, image_index: u32) -> VulkanResult<vk::CommandBuffer> {
        self.targets
            .command_buffer(image_index)
            .ok_or_else(|| VulkanError::InvalidOperation {
                reason: format!("No command buffer for swapchain image {image_index}"),
            })
    }

    fn no_swapchain() -> VulkanError {
        VulkanError::InvalidOperation {
            reason: "No swapchain while the surface has no area".to_string(),
        }
    }
}

impl FrameBackend for VulkanFrames<'_> {
    fn wait_for_slot(&mut self, slot: usize) -> VulkanResult<()> {
        self.sync(slot)?.in_flight.wait(u64::MAX)
    }

    fn reset_slot(&mut self, slot: usize) -> VulkanResult<()> {
        self.sync(slot)?.in_flight.reset()
    }

    fn acquire_image(&mut self, slot: usize) -> VulkanResult<u32> {
        let sync = self.sync(slot)?;
        let swapchain = self.targets.swapchain().ok_or_else(Self::no_swapchain)?;

        // A suboptimal image is still acquired and its semaphore will signal
        let (image_index, _suboptimal) = unsafe {
            swapchain.loader().acquire_next_image(
                swapchain.handle(),
                u64::MAX,
                sync.image_available.handle(),
                vk::Fence::null(),
            )?
        };
        Ok(image_index)
    }

    fn discard_acquire(&mut self, slot: usize) -> VulkanResult<()> {
        // An empty batch waits on the semaphore; draining the queue makes it reusable
        let sync = self.sync(slot)?;
        let wait_semaphores = [sync.image_available.handle()];
        let wait_stages = [vk::PipelineStageFlags::ALL_COMMANDS];
        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .build();

        let queue = self.context.graphics_queue();
        unsafe {
            self.context.device().queue_submit(queue, &[submit_info], vk::Fence::null())?;
            self.context.device().queue_wait_idle(queue)?;
        }
        Ok(())
    }

    fn record(&mut self, image_index: u32, callback: &mut dyn FnMut(vk::CommandBuffer, u32)) -> VulkanResult<()> {
        let command_buffer = self.command_buffer(image_index)?;
        let framebuffer = self
            .targets
            .framebuffer(image_index)
            .ok_or_else(|| VulkanError::InvalidOperation {
                reason: format!("No framebuffer for swapchain image {image_index}"),
            })?;
        let extent = self.targets.extent();

        let clear_values = [vk::ClearValue {
            color: vk::ClearColorValue {
                float32: self.clear_color,
            },
        }];

        let mut recorder = CommandRecorder::new(command_buffer, self.context.device());
        recorder.reset()?;
        recorder.begin(vk::CommandBufferUsageFlags::empty())?;
        {
            let mut pass = recorder.begin_render_pass(
                self.targets.render_pass(),
                framebuffer,
                full_scissor(extent),
                &clear_values,
            )?;
            pass.set_viewport(full_viewport(extent));
            pass.set_scissor(full_scissor(extent));
            callback(pass.command_buffer(), image_index);
        }
        recorder.end()?;

        Ok(())
    }

    fn submit(&mut self, slot: usize, image_index: u32) -> VulkanResult<()> {
        let sync = self.sync(slot)?;
        let command_buffers = [self.command_buffer(image_index)?];
        let wait_semaphores = [sync.image_available.handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = [sync.render_finished.handle()];

        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores)
            .build();

        unsafe {
            self.context.device().queue_submit(
                self.context.graphics_queue(),
                &[submit_info],
                sync.in_flight.handle(),
            )?;
        }
        Ok(())
    }

    fn present(&mut self, slot: usize, image_index: u32) -> VulkanResult<()> {
        let sync = self.sync(slot)?;
        let swapchain = self.targets.swapchain().ok_or_else(Self::no_swapchain)?;

        let wait_semaphores = [sync.render_finished.handle()];
        let swapchains = [swapchain.handle()];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let suboptimal = unsafe {
            swapchain
                .loader()
                .queue_present(self.context.present_queue(), &present_info)?
        };
        if suboptimal {
            return Err(VulkanError::SurfaceOutOfDate);
        }
        Ok(())
    }

    fn wait_idle(&mut self) -> VulkanResult<()> {
        self.context.wait_idle()
    }

    fn rebuild_swapchain(&mut self, width: u32, height: u32) -> VulkanResult<SwapchainState> {
        self.targets.rebuild(self.context, vk::Extent2D { width, height })
    }
}
