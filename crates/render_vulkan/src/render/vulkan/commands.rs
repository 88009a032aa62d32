//! Command buffer management
//!
//! The graphics command pool, a state-checked command recorder, and the
//! one-shot submission path used for buffer transfers.

use ash::{vk, Device};

use super::context::{VulkanError, VulkanResult};

/// Command pool wrapper with RAII cleanup
pub struct CommandPool {
    device: Device,
    command_pool: vk::CommandPool,
}

impl CommandPool {
    /// Create a pool whose buffers can be reset individually
    pub fn new(device: Device, queue_family_index: u32) -> VulkanResult<Self> {
        let pool_create_info = vk::CommandPoolCreateInfo::builder()
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .queue_family_index(queue_family_index);

        let command_pool = unsafe { device.create_command_pool(&pool_create_info, None)? };

        Ok(Self { device, command_pool })
    }

    /// Allocate primary command buffers
    pub fn allocate_command_buffers(&self, count: u32) -> VulkanResult<Vec<vk::CommandBuffer>> {
        let alloc_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(self.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);

        let command_buffers = unsafe { self.device.allocate_command_buffers(&alloc_info)? };
        Ok(command_buffers)
    }

    /// Return command buffers to the pool
    pub fn free_command_buffers(&self, command_buffers: &[vk::CommandBuffer]) {
        if command_buffers.is_empty() {
            return;
        }
        unsafe {
            self.device.free_command_buffers(self.command_pool, command_buffers);
        }
    }

    /// Get the command pool handle
    pub fn handle(&self) -> vk::CommandPool {
        self.command_pool
    }

    /// Allocate a command buffer and begin it for a single submission
    pub fn begin_single_time(&self) -> VulkanResult<CommandRecorder<'_>> {
        let command_buffer = self
            .allocate_command_buffers(1)?
            .into_iter()
            .next()
            .ok_or_else(|| VulkanError::InvalidOperation {
                reason: "Command pool returned no command buffer".to_string(),
            })?;

        let mut recorder = CommandRecorder::new(command_buffer, &self.device);
        let begun = recorder.begin(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT).map(|_| ());
        release_on_error(begun, || self.free_command_buffers(&[command_buffer]))?;
        Ok(recorder)
    }

    /// End a single-use recording, submit it, wait for the queue, free the buffer
    ///
    /// The buffer is freed on every path, including a failed `end`.
    pub fn end_single_time(&self, recorder: CommandRecorder<'_>, queue: vk::Queue) -> VulkanResult<()> {
        let handle = recorder.handle();
        let command_buffer = release_on_error(recorder.end(), || self.free_command_buffers(&[handle]))?;
        let command_buffers = [command_buffer];
        let submit_info = vk::SubmitInfo::builder().command_buffers(&command_buffers);

        let result = unsafe {
            self.device
                .queue_submit(queue, &[submit_info.build()], vk::Fence::null())
                .and_then(|()| self.device.queue_wait_idle(queue))
        };

        self.free_command_buffers(&command_buffers);
        result.map_err(VulkanError::from)
    }
}

/// Pass `result` through, running `release` first when it is an error
fn release_on_error<T>(result: VulkanResult<T>, release: impl FnOnce()) -> VulkanResult<T> {
    if result.is_err() {
        release();
    }
    result
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        unsafe {
            // Pool destruction frees every buffer still allocated from it
            let _ = self.device.device_wait_idle();
            self.device.destroy_command_pool(self.command_pool, None);
        }
    }
}

/// Command buffer recorder that rejects out-of-order calls
pub struct CommandRecorder<'a> {
    command_buffer: vk::CommandBuffer,
    device: &'a Device,
    recording: bool,
}

impl<'a> CommandRecorder<'a> {
    /// Wrap an allocated command buffer
    pub fn new(command_buffer: vk::CommandBuffer, device: &'a Device) -> Self {
        Self {
            command_buffer,
            device,
            recording: false,
        }
    }

    /// Discard previously recorded commands
    pub fn reset(&mut self) -> VulkanResult<()> {
        if self.recording {
            return Err(VulkanError::InvalidOperation {
                reason: "Cannot reset a command buffer while recording".to_string(),
            });
        }

        unsafe {
            self.device
                .reset_command_buffer(self.command_buffer, vk::CommandBufferResetFlags::empty())?;
        }
        Ok(())
    }

    /// Begin command recording
    pub fn begin(&mut self, flags: vk::CommandBufferUsageFlags) -> VulkanResult<&mut Self> {
        if self.recording {
            return Err(VulkanError::InvalidOperation {
                reason: "Command buffer already recording".to_string(),
            });
        }

        let begin_info = vk::CommandBufferBeginInfo::builder().flags(flags);
        unsafe {
            self.device.begin_command_buffer(self.command_buffer, &begin_info)?;
        }

        self.recording = true;
        Ok(self)
    }

    /// Begin an inline render pass; it ends when the returned guard drops
    pub fn begin_render_pass(
        &mut self,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        render_area: vk::Rect2D,
        clear_values: &[vk::ClearValue],
    ) -> VulkanResult<ActiveRenderPass<'_, 'a>> {
        self.ensure_recording()?;

        let render_pass_begin = vk::RenderPassBeginInfo::builder()
            .render_pass(render_pass)
            .framebuffer(framebuffer)
            .render_area(render_area)
            .clear_values(clear_values);

        unsafe {
            self.device
                .cmd_begin_render_pass(self.command_buffer, &render_pass_begin, vk::SubpassContents::INLINE);
        }

        Ok(ActiveRenderPass { recorder: self })
    }

    /// Record a whole-range buffer copy
    pub fn copy_buffer(&mut self, src: vk::Buffer, dst: vk::Buffer, size: vk::DeviceSize) -> VulkanResult<()> {
        self.ensure_recording()?;

        let region = vk::BufferCopy {
            src_offset: 0,
            dst_offset: 0,
            size,
        };
        unsafe {
            self.device.cmd_copy_buffer(self.command_buffer, src, dst, &[region]);
        }
        Ok(())
    }

    /// End command recording
    pub fn end(mut self) -> VulkanResult<vk::CommandBuffer> {
        self.ensure_recording()?;

        unsafe {
            self.device.end_command_buffer(self.command_buffer)?;
        }

        self.recording = false;
        Ok(self.command_buffer)
    }

    /// Get the command buffer handle
    pub fn handle(&self) -> vk::CommandBuffer {
        self.command_buffer
    }

    fn ensure_recording(&self) -> VulkanResult<()> {
        if self.recording {
            Ok(())
        } else {
            Err(VulkanError::InvalidOperation {
                reason: "Command buffer not recording".to_string(),
            })
        }
    }
}

/// Render pass scope; ends the pass on drop
pub struct ActiveRenderPass<'r, 'a> {
    recorder: &'r mut CommandRecorder<'a>,
}

impl ActiveRenderPass<'_, '_> {
    /// Command buffer the pass is being recorded into
    pub fn command_buffer(&self) -> vk::CommandBuffer {
        self.recorder.command_buffer
    }

    /// Set viewport
    pub fn set_viewport(&mut self, viewport: vk::Viewport) {
        unsafe {
            self.recorder
                .device
                .cmd_set_viewport(self.recorder.command_buffer, 0, &[viewport]);
        }
    }

    /// Set scissor
    pub fn set_scissor(&mut self, scissor: vk::Rect2D) {
        unsafe {
            self.recorder
                .device
                .cmd_set_scissor(self.recorder.command_buffer, 0, &[scissor]);
        }
    }
}

impl Drop for ActiveRenderPass<'_, '_> {
    fn drop(&mut self) {
        unsafe {
            self.recorder.device.cmd_end_render_pass(self.recorder.command_buffer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_release_runs_only_on_error() {
        let released = Cell::new(0);

        let ok = release_on_error(Ok(7), || released.set(released.get() + 1));
        assert_eq!(ok.unwrap(), 7);
        assert_eq!(released.get(), 0);

        let failed: VulkanResult<()> = release_on_error(Err(VulkanError::DeviceLost), || {
            released.set(released.get() + 1);
        });
        assert!(matches!(failed, Err(VulkanError::DeviceLost)));
        assert_eq!(released.get(), 1);
    }
}
