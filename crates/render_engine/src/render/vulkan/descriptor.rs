//! Descriptor set layout construction
//!
//! A layout is built from an explicit, ordered list of binding descriptors;
//! each binding's index is its position in the list. Pure data in, one layout
//! out — no accumulating builder state.

use ash::{vk, Device};

use crate::render::vulkan::context::{VulkanError, VulkanResult};

/// A single descriptor binding
#[derive(Debug, Clone, Copy)]
pub struct DescriptorBinding {
    /// Descriptor type bound at this index
    pub ty: vk::DescriptorType,
    /// Number of descriptors in the binding
    pub count: u32,
    /// Shader stages that can access the binding
    pub stage_flags: vk::ShaderStageFlags,
}

impl DescriptorBinding {
    /// A single uniform buffer binding
    pub fn uniform_buffer(stage_flags: vk::ShaderStageFlags) -> Self {
        Self {
            ty: vk::DescriptorType::UNIFORM_BUFFER,
            count: 1,
            stage_flags,
        }
    }

    /// A single combined image sampler binding
    pub fn combined_image_sampler(stage_flags: vk::ShaderStageFlags) -> Self {
        Self {
            ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            count: 1,
            stage_flags,
        }
    }
}

/// Descriptor set layout wrapper with RAII cleanup
pub struct DescriptorSetLayout {
    device: Device,
    layout: vk::DescriptorSetLayout,
}

impl DescriptorSetLayout {
    /// Create a layout from an ordered binding list
    pub fn new(device: Device, bindings: &[DescriptorBinding]) -> VulkanResult<Self> {
        let vk_bindings: Vec<vk::DescriptorSetLayoutBinding> = bindings
            .iter()
            .enumerate()
            .map(|(index, binding)| {
                vk::DescriptorSetLayoutBinding::builder()
                    .binding(index as u32)
                    .descriptor_type(binding.ty)
                    .descriptor_count(binding.count)
                    .stage_flags(binding.stage_flags)
                    .build()
            })
            .collect();

        let create_info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(&vk_bindings);

        let layout = unsafe {
            device
                .create_descriptor_set_layout(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self { device, layout })
    }

    /// Get the layout handle
    pub fn handle(&self) -> vk::DescriptorSetLayout {
        self.layout
    }
}

impl Drop for DescriptorSetLayout {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_set_layout(self.layout, None);
        }
    }
}
