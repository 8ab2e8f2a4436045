//! Persistently mapped vertex staging buffer
//!
//! An append-only write cursor over a host-visible, host-coherent vertex
//! buffer that stays mapped for its whole lifetime. [`VertexStagingBuffer::push`]
//! appends one vertex's interleaved attributes and advances the cursor;
//! [`VertexStagingBuffer::draw`] binds the buffer, draws the accumulated
//! count and resets the cursor.
//!
//! There is no double buffering: the single region is safe only because a
//! single frame is ever in flight — the in-flight fence guarantees the GPU
//! has finished reading before the CPU writes the next frame's vertices.
//! Multiple frames in flight would require one region per frame in flight.

use ash::{vk, Device, Instance};

use crate::render::vulkan::commands::ActiveRenderPass;
use crate::render::vulkan::context::{VulkanError, VulkanResult};
use crate::render::vulkan::framebuffer::find_memory_type;
use crate::render::vulkan::vertex::VertexFormat;

/// Host-mapped vertex buffer acting as an append-only write cursor
pub struct VertexStagingBuffer {
    device: Device,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    mapped: *mut u8,
    capacity: usize,
    format: VertexFormat,
    cursor: usize,
    vertex_count: u32,
    overflow_reported: bool,
}

impl VertexStagingBuffer {
    /// Create and persistently map a vertex buffer of `capacity_mb` MiB
    pub fn new(
        device: Device,
        instance: &Instance,
        physical_device: vk::PhysicalDevice,
        format: VertexFormat,
        capacity_mb: u32,
    ) -> VulkanResult<Self> {
        let capacity = capacity_mb as usize * 1024 * 1024;

        let buffer_info = vk::BufferCreateInfo::builder()
            .size(capacity as vk::DeviceSize)
            .usage(vk::BufferUsageFlags::VERTEX_BUFFER)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe {
            device
                .create_buffer(&buffer_info, None)
                .map_err(VulkanError::Api)?
        };

        let requirements = unsafe { device.get_buffer_memory_requirements(buffer) };
        let memory_properties =
            unsafe { instance.get_physical_device_memory_properties(physical_device) };

        let memory_type_index = find_memory_type(
            requirements.memory_type_bits,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
            &memory_properties,
        )?;

        let alloc_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(requirements.size)
            .memory_type_index(memory_type_index);

        let memory = unsafe {
            device
                .allocate_memory(&alloc_info, None)
                .map_err(VulkanError::Api)?
        };

        unsafe {
            device
                .bind_buffer_memory(buffer, memory, 0)
                .map_err(VulkanError::Api)?;
        }

        let mapped = unsafe {
            device
                .map_memory(
                    memory,
                    0,
                    capacity as vk::DeviceSize,
                    vk::MemoryMapFlags::empty(),
                )
                .map_err(VulkanError::Api)?
        }
        .cast::<u8>();

        log::debug!("Created {} MiB vertex staging buffer", capacity_mb);

        Ok(Self {
            device,
            buffer,
            memory,
            mapped,
            capacity,
            format,
            cursor: 0,
            vertex_count: 0,
            overflow_reported: false,
        })
    }

    /// Append one vertex's interleaved attributes and advance the cursor
    ///
    /// `components` must contain exactly the format's per-vertex component
    /// count. A full buffer drops the vertex and logs the overflow once per
    /// frame rather than corrupting memory the GPU may read.
    pub fn push(&mut self, components: &[f32]) {
        debug_assert_eq!(
            components.len() as u32,
            self.format.component_count(),
            "vertex component count does not match the vertex format"
        );

        let bytes: &[u8] = bytemuck::cast_slice(components);
        if self.cursor + bytes.len() > self.capacity {
            if !self.overflow_reported {
                log::error!(
                    "Vertex staging buffer full ({} bytes); dropping vertices",
                    self.capacity
                );
                self.overflow_reported = true;
            }
            return;
        }

        unsafe {
            std::ptr::copy_nonoverlapping(
                bytes.as_ptr(),
                self.mapped.add(self.cursor),
                bytes.len(),
            );
        }
        self.cursor += bytes.len();
        self.vertex_count += 1;
    }

    /// Convenience for the common position + color layout
    pub fn vertex(&mut self, x: f32, y: f32, z: f32, r: f32, g: f32, b: f32, a: f32) {
        self.push(&[x, y, z, r, g, b, a]);
    }

    /// Number of vertices accumulated since the last draw
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// Bind the buffer, draw the accumulated vertices, and reset the cursor
    pub fn draw(&mut self, pass: &mut ActiveRenderPass<'_>, topology: vk::PrimitiveTopology) {
        if self.vertex_count > 0 {
            pass.set_primitive_topology(topology);
            pass.bind_vertex_buffer(self.buffer);
            pass.draw(self.vertex_count);
        }
        self.cursor = 0;
        self.vertex_count = 0;
        self.overflow_reported = false;
    }
}

impl Drop for VertexStagingBuffer {
    fn drop(&mut self) {
        unsafe {
            self.device.unmap_memory(self.memory);
            self.device.destroy_buffer(self.buffer, None);
            self.device.free_memory(self.memory, None);
        }
    }
}
