//! Frames-in-flight scheduling
//!
//! [`FrameScheduler`] decides what happens on each render tick and in which
//! order; a [`FrameBackend`] carries it out. The Vulkan backend lives in the
//! renderer, tests drive the scheduler with a recording mock.
//!
//! Per tick, for slot `s` and acquired image `i`:
//!
//! 1. wait for `s`'s fence
//! 2. acquire `i`, signalling `s`'s image-available semaphore
//! 3. if another slot last submitted `i` and is still pending, wait for it too
//! 4. reset and record `i`'s command buffer
//! 5. reset `s`'s fence, submit, present
//! 6. advance `s` modulo the number of slots
//!
//! A tick that fails between 2 and 5 hands the acquired image back through
//! [`FrameBackend::discard_acquire`], so `s`'s semaphore is unsignalled again
//! before its next acquire.

use ash::vk;

use crate::render::vulkan::{VulkanError, VulkanResult};

/// Default number of frames the CPU may record ahead of the GPU
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// Where a frame-in-flight slot is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePhase {
    /// Fence signalled, nothing pending
    Idle,
    /// Waiting for the next swapchain image
    Acquiring,
    /// Command buffer being recorded
    Recording,
    /// Work submitted, fence not yet waited on
    Submitted,
}

/// Result of one render tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Nothing was rendered because the surface has no area
    Skipped,
    /// A frame was submitted and presented
    Presented {
        /// Slot whose synchronization objects were used
        frame_slot: usize,
        /// Swapchain image that was rendered
        image_index: u32,
    },
}

/// Swapchain facts the scheduler tracks after a rebuild
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainState {
    /// Extent of the new swapchain; zero when the surface has no area
    pub extent: vk::Extent2D,
    /// Number of swapchain images
    pub image_count: usize,
}

/// GPU operations the scheduler sequences
pub trait FrameBackend {
    /// Block until the slot's fence is signalled
    fn wait_for_slot(&mut self, slot: usize) -> VulkanResult<()>;

    /// Return the slot's fence to the unsignalled state
    fn reset_slot(&mut self, slot: usize) -> VulkanResult<()>;

    /// Acquire the next swapchain image, signalling the slot's image-available semaphore
    fn acquire_image(&mut self, slot: usize) -> VulkanResult<u32>;

    /// Consume the slot's image-available signal for an image that will not be submitted
    fn discard_acquire(&mut self, slot: usize) -> VulkanResult<()>;

    /// Reset and record the image's command buffer, calling `callback` inside the render pass
    fn record(&mut self, image_index: u32, callback: &mut dyn FnMut(vk::CommandBuffer, u32)) -> VulkanResult<()>;

    /// Submit the image's command buffer with the slot's semaphores and fence
    fn submit(&mut self, slot: usize, image_index: u32) -> VulkanResult<()>;

    /// Present the image once the slot's render-finished semaphore signals
    fn present(&mut self, slot: usize, image_index: u32) -> VulkanResult<()>;

    /// Block until the device is idle
    fn wait_idle(&mut self) -> VulkanResult<()>;

    /// Destroy and recreate every swapchain-dependent object
    fn rebuild_swapchain(&mut self, width: u32, height: u32) -> VulkanResult<SwapchainState>;
}

/// Frame-slot bookkeeping for N frames in flight
#[derive(Debug, Clone)]
pub struct FrameScheduler {
    current_frame: usize,
    phases: Vec<FramePhase>,
    image_owner: Vec<Option<usize>>,
    extent: vk::Extent2D,
}

impl FrameScheduler {
    /// Scheduler for `frames_in_flight` slots over a swapchain of `image_count` images
    pub fn new(frames_in_flight: usize, extent: vk::Extent2D, image_count: usize) -> Self {
        let frames_in_flight = frames_in_flight.max(1);
        Self {
            current_frame: 0,
            phases: vec![FramePhase::Idle; frames_in_flight],
            image_owner: vec![None; image_count],
            extent,
        }
    }

    /// Slot the next tick will use
    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    /// Number of slots
    pub fn frames_in_flight(&self) -> usize {
        self.phases.len()
    }

    /// Phase of a slot
    pub fn phase(&self, slot: usize) -> Option<FramePhase> {
        self.phases.get(slot).copied()
    }

    /// Extent rendering targets
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// True while the surface has no area; ticks do nothing
    pub fn is_suspended(&self) -> bool {
        self.extent.width == 0 || self.extent.height == 0
    }

    /// Render one frame
    ///
    /// A stale surface during presentation is reported as
    /// [`VulkanError::SurfaceOutOfDate`] after the slot has advanced.
    pub fn tick<B: FrameBackend>(
        &mut self,
        backend: &mut B,
        callback: &mut dyn FnMut(vk::CommandBuffer, u32),
    ) -> VulkanResult<FrameOutcome> {
        if self.is_suspended() {
            return Ok(FrameOutcome::Skipped);
        }

        let slot = self.current_frame;

        backend.wait_for_slot(slot)?;
        self.phases[slot] = FramePhase::Acquiring;

        let image_index = match backend.acquire_image(slot) {
            Ok(index) => index,
            Err(e) => {
                // Fence is still signalled, so the next wait on this slot returns immediately
                self.phases[slot] = FramePhase::Idle;
                return Err(e);
            }
        };
        let image = image_index as usize;

        let Some(owner) = self.image_owner.get(image).copied() else {
            let error = VulkanError::InvalidOperation {
                reason: format!(
                    "Acquired image {image_index} but the swapchain has {} images",
                    self.image_owner.len()
                ),
            };
            return Err(self.abandon(backend, slot, error));
        };

        if let Some(owner) = owner.filter(|&owner| owner != slot) {
            if self.phases[owner] == FramePhase::Submitted {
                if let Err(e) = backend.wait_for_slot(owner) {
                    return Err(self.abandon(backend, slot, e));
                }
                self.phases[owner] = FramePhase::Idle;
            }
        }

        self.phases[slot] = FramePhase::Recording;
        if let Err(e) = backend.record(image_index, callback) {
            return Err(self.abandon(backend, slot, e));
        }

        backend.reset_slot(slot)?;
        backend.submit(slot, image_index)?;
        self.phases[slot] = FramePhase::Submitted;
        self.image_owner[image] = Some(slot);

        let presented = backend.present(slot, image_index);
        self.current_frame = (slot + 1) % self.phases.len();
        presented?;

        Ok(FrameOutcome::Presented {
            frame_slot: slot,
            image_index,
        })
    }

    /// Give up on a frame whose image was acquired, returning the error that caused it
    fn abandon<B: FrameBackend>(&mut self, backend: &mut B, slot: usize, error: VulkanError) -> VulkanError {
        self.phases[slot] = FramePhase::Idle;
        if let Err(e) = backend.discard_acquire(slot) {
            log::error!("Failed to release acquired image for frame slot {slot}: {e}");
        }
        error
    }

    /// React to a new framebuffer size
    ///
    /// A zero dimension suspends rendering without touching the GPU. Any other
    /// size waits for the device to go idle and rebuilds the swapchain, even
    /// when the size is unchanged.
    pub fn resize<B: FrameBackend>(&mut self, backend: &mut B, width: u32, height: u32) -> VulkanResult<()> {
        if width == 0 || height == 0 {
            log::debug!("Framebuffer is {width}x{height}, rendering suspended");
            self.extent = vk::Extent2D::default();
            return Ok(());
        }

        backend.wait_idle()?;
        let state = backend.rebuild_swapchain(width, height)?;

        self.extent = state.extent;
        self.image_owner = vec![None; state.image_count];
        self.phases.fill(FramePhase::Idle);

        log::debug!(
            "Swapchain rebuilt at {}x{} with {} images",
            state.extent.width,
            state.extent.height,
            state.image_count
        );
        Ok(())
    }
}
