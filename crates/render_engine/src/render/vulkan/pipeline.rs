//! Graphics pipeline construction and fixed-function state
//!
//! The pipeline is an immutable bundle of shader stages, fixed-function state
//! and a layout. All state objects here are pure data with no temporal
//! behavior; each declares the dynamic states it contributes and the
//! aggregate dynamic set is a pure union over the state list. Viewport and
//! scissor are dynamic precisely so the pipeline survives swapchain
//! recreation — only the render pass and attachments are rebuilt on resize.

use ash::{vk, Device};

use crate::render::vulkan::context::{VulkanError, VulkanResult};
use crate::render::vulkan::descriptor::DescriptorSetLayout;
use crate::render::vulkan::shader::ShaderModule;
use crate::render::vulkan::vertex::VertexFormat;

/// Winding order that defines a front-facing triangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontFace {
    /// Clockwise winding is front-facing
    Clockwise,
    /// Counter-clockwise winding is front-facing
    CounterClockwise,
}

impl FrontFace {
    fn to_vk(self) -> vk::FrontFace {
        match self {
            Self::Clockwise => vk::FrontFace::CLOCKWISE,
            Self::CounterClockwise => vk::FrontFace::COUNTER_CLOCKWISE,
        }
    }
}

/// Face culling configuration
///
/// A front-face winding only exists when culling is enabled, so the invalid
/// combination "cull nothing, but with a winding" is unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    /// No culling
    None,
    /// Cull front faces, defined by the given winding
    Front(FrontFace),
    /// Cull back faces, defined by the given winding
    Back(FrontFace),
    /// Cull both faces, winding defining which is which
    FrontAndBack(FrontFace),
}

impl CullMode {
    /// The Vulkan cull mode flags
    pub fn cull_flags(self) -> vk::CullModeFlags {
        match self {
            Self::None => vk::CullModeFlags::NONE,
            Self::Front(_) => vk::CullModeFlags::FRONT,
            Self::Back(_) => vk::CullModeFlags::BACK,
            Self::FrontAndBack(_) => vk::CullModeFlags::FRONT_AND_BACK,
        }
    }

    /// The Vulkan front-face winding; irrelevant (and defaulted) when not culling
    pub fn front_face(self) -> vk::FrontFace {
        match self {
            Self::None => vk::FrontFace::COUNTER_CLOCKWISE,
            Self::Front(face) | Self::Back(face) | Self::FrontAndBack(face) => face.to_vk(),
        }
    }
}

/// Rasterizer fixed-function state
#[derive(Debug, Clone, Copy)]
pub struct RasterizerState {
    /// Clamp fragments beyond the depth range instead of discarding
    pub depth_clamp_enable: bool,
    /// Discard all primitives before rasterization
    pub rasterizer_discard_enable: bool,
    /// Polygon fill mode
    pub polygon_mode: vk::PolygonMode,
    /// Rasterized line width
    pub line_width: f32,
    /// Face culling configuration
    pub cull_mode: CullMode,
    /// Apply depth bias to fragment depth values
    pub depth_bias_enable: bool,
}

impl Default for RasterizerState {
    fn default() -> Self {
        Self {
            depth_clamp_enable: false,
            rasterizer_discard_enable: false,
            polygon_mode: vk::PolygonMode::FILL,
            line_width: 1.0,
            cull_mode: CullMode::None,
            depth_bias_enable: false,
        }
    }
}

impl RasterizerState {
    fn dynamic_states(&self) -> &'static [vk::DynamicState] {
        &[]
    }

    fn create_info(&self) -> vk::PipelineRasterizationStateCreateInfo {
        vk::PipelineRasterizationStateCreateInfo::builder()
            .depth_clamp_enable(self.depth_clamp_enable)
            .rasterizer_discard_enable(self.rasterizer_discard_enable)
            .polygon_mode(self.polygon_mode)
            .line_width(self.line_width)
            .cull_mode(self.cull_mode.cull_flags())
            .front_face(self.cull_mode.front_face())
            .depth_bias_enable(self.depth_bias_enable)
            .build()
    }
}

/// Input assembly fixed-function state
#[derive(Debug, Clone, Copy)]
pub struct InputAssemblyState {
    /// Primitive topology assembled from the vertex stream
    pub topology: vk::PrimitiveTopology,
    /// Enable strip-cut primitive restart
    pub primitive_restart_enable: bool,
}

impl Default for InputAssemblyState {
    fn default() -> Self {
        Self {
            topology: vk::PrimitiveTopology::TRIANGLE_LIST,
            primitive_restart_enable: false,
        }
    }
}

impl InputAssemblyState {
    fn dynamic_states(&self) -> &'static [vk::DynamicState] {
        &[]
    }

    fn create_info(&self) -> vk::PipelineInputAssemblyStateCreateInfo {
        vk::PipelineInputAssemblyStateCreateInfo::builder()
            .topology(self.topology)
            .primitive_restart_enable(self.primitive_restart_enable)
            .build()
    }
}

/// Viewport fixed-function state
///
/// Only the counts are baked into the pipeline; the rectangles themselves are
/// dynamic so the pipeline never depends on the swapchain extent.
#[derive(Debug, Clone, Copy)]
pub struct ViewportState {
    /// Number of viewports
    pub viewport_count: u32,
    /// Number of scissor rectangles
    pub scissor_count: u32,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            viewport_count: 1,
            scissor_count: 1,
        }
    }
}

impl ViewportState {
    fn dynamic_states(&self) -> &'static [vk::DynamicState] {
        &[vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR]
    }

    fn create_info(&self) -> vk::PipelineViewportStateCreateInfo {
        vk::PipelineViewportStateCreateInfo::builder()
            .viewport_count(self.viewport_count)
            .scissor_count(self.scissor_count)
            .build()
    }
}

/// Multisampling fixed-function state
#[derive(Debug, Clone, Copy)]
pub struct MultisampleState {
    /// Samples per pixel; must match the render pass attachments
    pub rasterization_samples: vk::SampleCountFlags,
    /// Run the fragment shader per sample
    pub sample_shading_enable: bool,
    /// Minimum fraction of samples shaded when sample shading is on
    pub min_sample_shading: f32,
}

impl Default for MultisampleState {
    fn default() -> Self {
        Self {
            rasterization_samples: vk::SampleCountFlags::TYPE_1,
            sample_shading_enable: false,
            min_sample_shading: 0.2,
        }
    }
}

impl MultisampleState {
    fn dynamic_states(&self) -> &'static [vk::DynamicState] {
        &[]
    }

    fn create_info(&self) -> vk::PipelineMultisampleStateCreateInfo {
        vk::PipelineMultisampleStateCreateInfo::builder()
            .rasterization_samples(self.rasterization_samples)
            .sample_shading_enable(self.sample_shading_enable)
            .min_sample_shading(self.min_sample_shading)
            .build()
    }
}

/// Depth/stencil fixed-function state
#[derive(Debug, Clone, Copy)]
pub struct DepthStencilState {
    /// Enable depth testing
    pub depth_test_enable: bool,
    /// Write passing depth values back to the attachment
    pub depth_write_enable: bool,
    /// Depth comparison operator
    pub depth_compare_op: vk::CompareOp,
    /// Enable the depth bounds test
    pub depth_bounds_test_enable: bool,
    /// Enable stencil testing; the ops themselves are dynamic
    pub stencil_test_enable: bool,
}

impl Default for DepthStencilState {
    fn default() -> Self {
        Self {
            depth_test_enable: true,
            depth_write_enable: true,
            depth_compare_op: vk::CompareOp::LESS,
            depth_bounds_test_enable: false,
            stencil_test_enable: true,
        }
    }
}

impl DepthStencilState {
    fn dynamic_states(&self) -> &'static [vk::DynamicState] {
        &[]
    }

    fn create_info(&self) -> vk::PipelineDepthStencilStateCreateInfo {
        vk::PipelineDepthStencilStateCreateInfo::builder()
            .depth_test_enable(self.depth_test_enable)
            .depth_write_enable(self.depth_write_enable)
            .depth_compare_op(self.depth_compare_op)
            .depth_bounds_test_enable(self.depth_bounds_test_enable)
            .stencil_test_enable(self.stencil_test_enable)
            .build()
    }
}

/// Color blend fixed-function state for a single attachment
#[derive(Debug, Clone, Copy)]
pub struct ColorBlendState {
    /// Enable a bitwise logic operation instead of blending
    pub logic_op_enable: bool,
    /// The logic operation when enabled
    pub logic_op: vk::LogicOp,
    /// Enable blending on the color attachment
    pub blend_enable: bool,
}

impl Default for ColorBlendState {
    fn default() -> Self {
        Self {
            logic_op_enable: false,
            logic_op: vk::LogicOp::COPY,
            blend_enable: false,
        }
    }
}

impl ColorBlendState {
    fn dynamic_states(&self) -> &'static [vk::DynamicState] {
        &[]
    }

    fn attachment(&self) -> vk::PipelineColorBlendAttachmentState {
        vk::PipelineColorBlendAttachmentState::builder()
            .color_write_mask(vk::ColorComponentFlags::RGBA)
            .blend_enable(self.blend_enable)
            .build()
    }
}

/// The complete fixed-function state bundle for pipeline creation
#[derive(Debug, Clone)]
pub struct PipelineStates {
    /// Vertex input layout
    pub vertex_format: VertexFormat,
    /// Input assembly state
    pub input_assembly: InputAssemblyState,
    /// Viewport/scissor counts
    pub viewport: ViewportState,
    /// Rasterizer state
    pub rasterizer: RasterizerState,
    /// Multisampling state
    pub multisample: MultisampleState,
    /// Depth/stencil state
    pub depth_stencil: DepthStencilState,
    /// Color blend state
    pub color_blend: ColorBlendState,
    /// Dynamic states requested on top of what the state objects contribute
    pub additional_dynamic_states: Vec<vk::DynamicState>,
}

impl PipelineStates {
    /// The aggregate dynamic state set: the union of every state object's
    /// contribution plus the explicitly requested extras, deduplicated in
    /// first-seen order
    pub fn dynamic_states(&self) -> Vec<vk::DynamicState> {
        let mut states: Vec<vk::DynamicState> = Vec::new();
        let contributions = [
            self.input_assembly.dynamic_states(),
            self.viewport.dynamic_states(),
            self.rasterizer.dynamic_states(),
            self.multisample.dynamic_states(),
            self.depth_stencil.dynamic_states(),
            self.color_blend.dynamic_states(),
        ];
        for contribution in contributions {
            for &state in contribution {
                if !states.contains(&state) {
                    states.push(state);
                }
            }
        }
        for &state in &self.additional_dynamic_states {
            if !states.contains(&state) {
                states.push(state);
            }
        }
        states
    }
}

/// Graphics pipeline wrapper with RAII cleanup
///
/// Owns its shader modules and descriptor set layouts for the lifetime of the
/// pipeline; everything is released together.
pub struct GraphicsPipeline {
    device: Device,
    pipeline: vk::Pipeline,
    layout: vk::PipelineLayout,
    _shader_modules: Vec<ShaderModule>,
    _set_layouts: Vec<DescriptorSetLayout>,
}

impl GraphicsPipeline {
    /// Create a graphics pipeline against a compatible render pass
    pub fn new(
        device: Device,
        render_pass: vk::RenderPass,
        shader_modules: Vec<ShaderModule>,
        states: &PipelineStates,
        set_layouts: Vec<DescriptorSetLayout>,
    ) -> VulkanResult<Self> {
        let entry_point = std::ffi::CStr::from_bytes_with_nul(b"main\0").unwrap();
        let shader_stages: Vec<vk::PipelineShaderStageCreateInfo> = shader_modules
            .iter()
            .map(|module| module.stage_info(entry_point))
            .collect();

        let binding_descriptions = [states.vertex_format.binding_description()];
        let attribute_descriptions = states.vertex_format.attribute_descriptions();
        let vertex_input = vk::PipelineVertexInputStateCreateInfo::builder()
            .vertex_binding_descriptions(&binding_descriptions)
            .vertex_attribute_descriptions(&attribute_descriptions);

        let input_assembly = states.input_assembly.create_info();
        let viewport_state = states.viewport.create_info();
        let rasterizer = states.rasterizer.create_info();
        let multisampling = states.multisample.create_info();
        let depth_stencil = states.depth_stencil.create_info();

        let color_blend_attachments = [states.color_blend.attachment()];
        let color_blending = vk::PipelineColorBlendStateCreateInfo::builder()
            .logic_op_enable(states.color_blend.logic_op_enable)
            .logic_op(states.color_blend.logic_op)
            .attachments(&color_blend_attachments);

        let dynamic_states = states.dynamic_states();
        let dynamic_state =
            vk::PipelineDynamicStateCreateInfo::builder().dynamic_states(&dynamic_states);

        let layout_handles: Vec<vk::DescriptorSetLayout> =
            set_layouts.iter().map(|layout| layout.handle()).collect();
        let layout_info = vk::PipelineLayoutCreateInfo::builder().set_layouts(&layout_handles);
        let layout = unsafe {
            device
                .create_pipeline_layout(&layout_info, None)
                .map_err(VulkanError::Api)?
        };

        let pipeline_info = vk::GraphicsPipelineCreateInfo::builder()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterizer)
            .multisample_state(&multisampling)
            .depth_stencil_state(&depth_stencil)
            .color_blend_state(&color_blending)
            .dynamic_state(&dynamic_state)
            .layout(layout)
            .render_pass(render_pass)
            .subpass(0);

        let pipelines = unsafe {
            device
                .create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info.build()], None)
                .map_err(|(_, err)| VulkanError::Api(err))?
        };

        log::info!("Created graphics pipeline");

        Ok(Self {
            device,
            pipeline: pipelines[0],
            layout,
            _shader_modules: shader_modules,
            _set_layouts: set_layouts,
        })
    }

    /// Get the pipeline handle
    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }

    /// Get the pipeline layout handle
    pub fn layout(&self) -> vk::PipelineLayout {
        self.layout
    }
}

impl Drop for GraphicsPipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_pipeline(self.pipeline, None);
            self.device.destroy_pipeline_layout(self.layout, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::vulkan::vertex::VertexAttribute;

    fn states() -> PipelineStates {
        PipelineStates {
            vertex_format: VertexFormat::new(&[VertexAttribute::R32g32b32Sfloat]),
            input_assembly: InputAssemblyState::default(),
            viewport: ViewportState::default(),
            rasterizer: RasterizerState::default(),
            multisample: MultisampleState::default(),
            depth_stencil: DepthStencilState::default(),
            color_blend: ColorBlendState::default(),
            additional_dynamic_states: Vec::new(),
        }
    }

    #[test]
    fn test_cull_mode_none_has_no_winding() {
        assert_eq!(CullMode::None.cull_flags(), vk::CullModeFlags::NONE);
        // The winding is defaulted, never read by the rasterizer
        assert_eq!(CullMode::None.front_face(), vk::FrontFace::COUNTER_CLOCKWISE);
    }

    #[test]
    fn test_cull_mode_pairs_map_to_vk() {
        let back_cw = CullMode::Back(FrontFace::Clockwise);
        assert_eq!(back_cw.cull_flags(), vk::CullModeFlags::BACK);
        assert_eq!(back_cw.front_face(), vk::FrontFace::CLOCKWISE);

        let front_ccw = CullMode::Front(FrontFace::CounterClockwise);
        assert_eq!(front_ccw.cull_flags(), vk::CullModeFlags::FRONT);
        assert_eq!(front_ccw.front_face(), vk::FrontFace::COUNTER_CLOCKWISE);

        let both = CullMode::FrontAndBack(FrontFace::Clockwise);
        assert_eq!(both.cull_flags(), vk::CullModeFlags::FRONT_AND_BACK);
    }

    #[test]
    fn test_dynamic_states_union_includes_viewport_contribution() {
        let states = states();
        let dynamic = states.dynamic_states();
        assert!(dynamic.contains(&vk::DynamicState::VIEWPORT));
        assert!(dynamic.contains(&vk::DynamicState::SCISSOR));
        assert_eq!(dynamic.len(), 2);
    }

    #[test]
    fn test_dynamic_states_union_deduplicates_extras() {
        let mut states = states();
        states.additional_dynamic_states = vec![
            vk::DynamicState::VIEWPORT, // already contributed by ViewportState
            vk::DynamicState::STENCIL_OP,
            vk::DynamicState::STENCIL_TEST_ENABLE,
            vk::DynamicState::STENCIL_OP, // duplicate extra
            vk::DynamicState::PRIMITIVE_TOPOLOGY,
        ];
        let dynamic = states.dynamic_states();
        assert_eq!(
            dynamic,
            vec![
                vk::DynamicState::VIEWPORT,
                vk::DynamicState::SCISSOR,
                vk::DynamicState::STENCIL_OP,
                vk::DynamicState::STENCIL_TEST_ENABLE,
                vk::DynamicState::PRIMITIVE_TOPOLOGY,
            ]
        );
    }
}
