//! Vulkan synchronization primitives for GPU/CPU coordination
//!
//! RAII wrappers for the three primitives that order a frame: two binary
//! semaphores for GPU-GPU ordering and one fence for CPU-GPU backpressure.
//!
//! The frame's ordering chain is expressed entirely through these objects:
//!
//! ```text
//! acquire ──signals──▶ image_available ──waited by──▶ submitted commands
//! commands ─signals──▶ render_finished ──waited by──▶ present
//! commands ─signals──▶ in_flight fence ──waited by──▶ CPU, next iteration
//! ```
//!
//! With a single frame in flight the two semaphores are fully reusable across
//! frames without index disambiguation: the fence guarantees frame N+1's
//! recording cannot start until frame N's commands have retired.

use ash::{vk, Device};

use crate::render::vulkan::context::{VulkanError, VulkanResult};

/// GPU-GPU synchronization primitive with automatic resource management
///
/// Signaled by one queue operation and waited on by another without CPU
/// involvement: image acquisition signals, rendering waits; rendering
/// signals, presentation waits.
pub struct Semaphore {
    device: Device,
    semaphore: vk::Semaphore,
}

impl Semaphore {
    /// Create a new binary semaphore
    pub fn new(device: Device) -> VulkanResult<Self> {
        let create_info = vk::SemaphoreCreateInfo::builder();

        let semaphore = unsafe {
            device
                .create_semaphore(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self { device, semaphore })
    }

    /// Get the semaphore handle
    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_semaphore(self.semaphore, None);
        }
    }
}

/// CPU-GPU synchronization primitive with automatic resource management
pub struct Fence {
    device: Device,
    fence: vk::Fence,
}

impl Fence {
    /// Create a new fence, optionally already signaled
    ///
    /// The in-flight fence is created signaled so the first frame's wait
    /// returns immediately.
    pub fn new(device: Device, signaled: bool) -> VulkanResult<Self> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };

        let create_info = vk::FenceCreateInfo::builder().flags(flags);

        let fence = unsafe {
            device
                .create_fence(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self { device, fence })
    }

    /// Block until the fence is signaled
    pub fn wait(&self, timeout: u64) -> VulkanResult<()> {
        unsafe {
            self.device
                .wait_for_fences(&[self.fence], true, timeout)
                .map_err(VulkanError::Api)
        }
    }

    /// Reset the fence to the unsignaled state
    pub fn reset(&self) -> VulkanResult<()> {
        unsafe {
            self.device
                .reset_fences(&[self.fence])
                .map_err(VulkanError::Api)
        }
    }

    /// Get the fence handle
    pub fn handle(&self) -> vk::Fence {
        self.fence
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_fence(self.fence, None);
        }
    }
}

/// The synchronization triple for the single in-flight frame
pub struct FrameSync {
    /// Signaled by the presentation engine when the acquired image is usable
    pub image_available: Semaphore,
    /// Signaled by the graphics queue when command execution completes
    pub render_finished: Semaphore,
    /// Signaled with command completion; the CPU's sole backpressure point
    pub in_flight: Fence,
}

impl FrameSync {
    /// Create the frame synchronization objects
    pub fn new(device: Device) -> VulkanResult<Self> {
        let image_available = Semaphore::new(device.clone())?;
        let render_finished = Semaphore::new(device.clone())?;
        let in_flight = Fence::new(device, true)?;

        Ok(Self {
            image_available,
            render_finished,
            in_flight,
        })
    }
}
