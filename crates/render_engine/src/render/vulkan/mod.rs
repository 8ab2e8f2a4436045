//! Vulkan rendering backend
//!
//! Low-level Vulkan wrappers following the resource ownership rules laid out
//! in DESIGN.md: every wrapper exclusively owns the handles it creates and
//! releases them on drop, and nothing outlives the device that issued it.

/// Persistently mapped vertex staging buffer
pub mod buffer;
/// Command pool and type-safe recording
pub mod commands;
/// Instance, device selection and logical device
pub mod context;
/// Descriptor set layout construction
pub mod descriptor;
/// Framebuffers and attachment images
pub mod framebuffer;
/// Graphics pipeline and fixed-function state
pub mod pipeline;
/// Render pass construction
pub mod render_pass;
/// Shader compilation and modules
pub mod shader;
/// Swapchain lifecycle
pub mod swapchain;
/// Semaphores, fences and the frame sync triple
pub mod sync;
/// Vertex format description
pub mod vertex;

pub use buffer::VertexStagingBuffer;
pub use commands::{ActiveRenderPass, CommandPool, CommandRecorder};
pub use context::{
    LogicalDevice, PhysicalDeviceInfo, VulkanError, VulkanInstance, VulkanResult,
};
pub use descriptor::{DescriptorBinding, DescriptorSetLayout};
pub use framebuffer::{AttachmentImage, Framebuffer};
pub use pipeline::{
    ColorBlendState, CullMode, DepthStencilState, FrontFace, GraphicsPipeline,
    InputAssemblyState, MultisampleState, PipelineStates, RasterizerState, ViewportState,
};
pub use render_pass::RenderPass;
pub use shader::{ShaderCompiler, ShaderKind, ShaderModule};
pub use swapchain::{Swapchain, SwapchainSupport};
pub use sync::{Fence, FrameSync, Semaphore};
pub use vertex::{VertexAttribute, VertexElement, VertexFormat};
