//! Command buffer management
//!
//! Type-safe command buffer recording following RAII patterns. One primary
//! command buffer is allocated at startup and reset + re-recorded every
//! frame; the pool is created with the reset flag to allow exactly that.

use ash::{vk, Device};

use crate::render::vulkan::context::{VulkanError, VulkanResult};

/// Command pool wrapper with RAII cleanup
///
/// Allocates one primary command buffer eagerly: the engine records into a
/// single reusable buffer, so the common case needs no further allocation.
pub struct CommandPool {
    device: Device,
    command_pool: vk::CommandPool,
    primary_buffer: vk::CommandBuffer,
}

impl CommandPool {
    /// Create a command pool for a queue family, with resettable buffers
    pub fn new(device: Device, queue_family_index: u32) -> VulkanResult<Self> {
        let pool_create_info = vk::CommandPoolCreateInfo::builder()
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .queue_family_index(queue_family_index);

        let command_pool = unsafe {
            device
                .create_command_pool(&pool_create_info, None)
                .map_err(VulkanError::Api)?
        };

        let primary_buffer = Self::allocate(&device, command_pool)?;

        Ok(Self {
            device,
            command_pool,
            primary_buffer,
        })
    }

    fn allocate(device: &Device, pool: vk::CommandPool) -> VulkanResult<vk::CommandBuffer> {
        let alloc_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        let command_buffers = unsafe {
            device
                .allocate_command_buffers(&alloc_info)
                .map_err(VulkanError::Api)?
        };

        Ok(command_buffers[0])
    }

    /// The single reusable primary command buffer
    pub fn primary_buffer(&self) -> vk::CommandBuffer {
        self.primary_buffer
    }

    /// Allocate an additional primary command buffer
    pub fn allocate_primary(&self) -> VulkanResult<vk::CommandBuffer> {
        Self::allocate(&self.device, self.command_pool)
    }

    /// Get the command pool handle
    pub fn handle(&self) -> vk::CommandPool {
        self.command_pool
    }
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        unsafe {
            // All command buffers must have retired before the pool goes away
            let _ = self.device.device_wait_idle();
            self.device.destroy_command_pool(self.command_pool, None);
        }
    }
}

/// Type-safe command buffer recorder
///
/// Tracks recording state so begin/end misuse surfaces as an error instead of
/// a validation message.
pub struct CommandRecorder {
    command_buffer: vk::CommandBuffer,
    device: Device,
    recording: bool,
}

impl CommandRecorder {
    /// Wrap a command buffer for recording
    pub fn new(device: Device, command_buffer: vk::CommandBuffer) -> Self {
        Self {
            command_buffer,
            device,
            recording: false,
        }
    }

    /// Reset the buffer and begin recording
    pub fn begin(&mut self) -> VulkanResult<&mut Self> {
        if self.recording {
            return Err(VulkanError::InvalidOperation {
                reason: "Command buffer already recording".to_string(),
            });
        }

        unsafe {
            self.device
                .reset_command_buffer(self.command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(VulkanError::Api)?;
        }

        let begin_info = vk::CommandBufferBeginInfo::builder();

        unsafe {
            self.device
                .begin_command_buffer(self.command_buffer, &begin_info)
                .map_err(VulkanError::Api)?;
        }

        self.recording = true;
        Ok(self)
    }

    /// Begin a render pass; ending is handled by the returned guard's drop
    pub fn begin_render_pass(
        &mut self,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        render_area: vk::Rect2D,
        clear_values: &[vk::ClearValue],
    ) -> VulkanResult<ActiveRenderPass<'_>> {
        if !self.recording {
            return Err(VulkanError::InvalidOperation {
                reason: "Command buffer not recording".to_string(),
            });
        }

        let render_pass_begin = vk::RenderPassBeginInfo::builder()
            .render_pass(render_pass)
            .framebuffer(framebuffer)
            .render_area(render_area)
            .clear_values(clear_values);

        unsafe {
            self.device.cmd_begin_render_pass(
                self.command_buffer,
                &render_pass_begin,
                vk::SubpassContents::INLINE,
            );
        }

        Ok(ActiveRenderPass { recorder: self })
    }

    /// Finish recording and hand back the command buffer for submission
    pub fn end(mut self) -> VulkanResult<vk::CommandBuffer> {
        if !self.recording {
            return Err(VulkanError::InvalidOperation {
                reason: "Command buffer not recording".to_string(),
            });
        }

        unsafe {
            self.device
                .end_command_buffer(self.command_buffer)
                .map_err(VulkanError::Api)?;
        }

        self.recording = false;
        Ok(self.command_buffer)
    }
}

/// Active render pass scope; dropping it ends the pass
pub struct ActiveRenderPass<'a> {
    recorder: &'a mut CommandRecorder,
}

impl<'a> ActiveRenderPass<'a> {
    /// The device, for commands recorded by collaborators
    pub fn device(&self) -> &Device {
        &self.recorder.device
    }

    /// The command buffer being recorded
    pub fn command_buffer(&self) -> vk::CommandBuffer {
        self.recorder.command_buffer
    }

    /// Bind a graphics pipeline
    pub fn bind_pipeline(&mut self, pipeline: vk::Pipeline) {
        unsafe {
            self.recorder.device.cmd_bind_pipeline(
                self.recorder.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                pipeline,
            );
        }
    }

    /// Set the dynamic viewport
    pub fn set_viewport(&mut self, viewport: vk::Viewport) {
        unsafe {
            self.recorder
                .device
                .cmd_set_viewport(self.recorder.command_buffer, 0, &[viewport]);
        }
    }

    /// Set the dynamic scissor rectangle
    pub fn set_scissor(&mut self, scissor: vk::Rect2D) {
        unsafe {
            self.recorder
                .device
                .cmd_set_scissor(self.recorder.command_buffer, 0, &[scissor]);
        }
    }

    /// Set the dynamic stencil-test enable
    pub fn set_stencil_test_enable(&mut self, enable: bool) {
        unsafe {
            self.recorder
                .device
                .cmd_set_stencil_test_enable(self.recorder.command_buffer, enable);
        }
    }

    /// Set the dynamic stencil operations for the given faces
    pub fn set_stencil_op(
        &mut self,
        face_mask: vk::StencilFaceFlags,
        fail_op: vk::StencilOp,
        pass_op: vk::StencilOp,
        depth_fail_op: vk::StencilOp,
        compare_op: vk::CompareOp,
    ) {
        unsafe {
            self.recorder.device.cmd_set_stencil_op(
                self.recorder.command_buffer,
                face_mask,
                fail_op,
                pass_op,
                depth_fail_op,
                compare_op,
            );
        }
    }

    /// Set the dynamic primitive topology
    pub fn set_primitive_topology(&mut self, topology: vk::PrimitiveTopology) {
        unsafe {
            self.recorder
                .device
                .cmd_set_primitive_topology(self.recorder.command_buffer, topology);
        }
    }

    /// Bind a vertex buffer at binding zero
    pub fn bind_vertex_buffer(&mut self, buffer: vk::Buffer) {
        unsafe {
            self.recorder.device.cmd_bind_vertex_buffers(
                self.recorder.command_buffer,
                0,
                &[buffer],
                &[0],
            );
        }
    }

    /// Issue a non-indexed draw
    pub fn draw(&mut self, vertex_count: u32) {
        unsafe {
            self.recorder
                .device
                .cmd_draw(self.recorder.command_buffer, vertex_count, 1, 0, 0);
        }
    }
}

impl<'a> Drop for ActiveRenderPass<'a> {
    fn drop(&mut self) {
        unsafe {
            self.recorder
                .device
                .cmd_end_render_pass(self.recorder.command_buffer);
        }
    }
}
