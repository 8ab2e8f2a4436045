//! The render engine context
//!
//! [`RenderEngine`] owns every major object — window, surface, instance,
//! devices, swapchain, pipeline, command buffer, staging buffer and the
//! synchronization triple — as explicit fields of one struct handed to each
//! subsystem constructor. Lifetimes are encoded in field order: struct fields
//! drop in declaration order, so everything that holds device handles is
//! declared before the logical device, and the surface before the instance.
//!
//! The engine implements [`FrameDriver`] against real Vulkan; the loop logic
//! itself lives in [`crate::render::frame`].

use ash::vk;

use crate::assets::ResourceLoader;
use crate::config::EngineConfig;
use crate::render::frame::{self, AcquireOutcome, FrameDriver, PresentOutcome};
use crate::render::vulkan::buffer::VertexStagingBuffer;
use crate::render::vulkan::commands::{CommandPool, CommandRecorder};
use crate::render::vulkan::context::{
    LogicalDevice, PhysicalDeviceInfo, VulkanError, VulkanInstance, VulkanResult,
};
use crate::render::vulkan::descriptor::{DescriptorBinding, DescriptorSetLayout};
use crate::render::vulkan::pipeline::{
    ColorBlendState, DepthStencilState, GraphicsPipeline, InputAssemblyState, MultisampleState,
    PipelineStates, RasterizerState, ViewportState,
};
use crate::render::vulkan::shader::{ShaderCompiler, ShaderKind, ShaderModule};
use crate::render::vulkan::swapchain::Swapchain;
use crate::render::vulkan::sync::FrameSync;
use crate::render::vulkan::vertex::{VertexAttribute, VertexFormat};
use crate::render::window::{Surface, Window};

/// Complete renderer state with explicit ownership
///
/// Field order is load-bearing: drops run in declaration order, and every
/// Vulkan object must be released before the device that issued it, the
/// surface before the instance, and the window last.
pub struct RenderEngine {
    clear_color: [f32; 4],
    clear_depth: f32,
    clear_stencil: u32,

    frame_sync: FrameSync,
    vertex_buffer: VertexStagingBuffer,
    command_pool: CommandPool,
    pipeline: GraphicsPipeline,
    swapchain: Swapchain,
    device: LogicalDevice,
    physical_device: PhysicalDeviceInfo,
    surface: Surface,
    instance: VulkanInstance,
    window: Window,
}

impl RenderEngine {
    /// Bring up the full rendering stack from configuration
    ///
    /// Any failure here is fatal: a missing capability or exhausted resource
    /// will not change between attempts, so errors propagate to the caller
    /// and the process aborts with a descriptive message.
    pub fn new(config: &EngineConfig) -> VulkanResult<Self> {
        let mut window = Window::new(
            &config.window.title,
            config.window.width,
            config.window.height,
            config.window.resizable,
        )
        .map_err(|e| VulkanError::InitializationFailed(format!("Window creation: {}", e)))?;

        let instance = VulkanInstance::new(&window, &config.window.title, config.validation)?;
        let surface = Surface::new(&instance.entry, &instance.instance, &mut window)
            .map_err(|e| VulkanError::InitializationFailed(format!("Surface creation: {}", e)))?;

        let physical_device = PhysicalDeviceInfo::select(&instance.instance, &surface)?;
        let device = LogicalDevice::new(&instance.instance, &physical_device)?;

        let command_pool = CommandPool::new(device.raw(), device.graphics_family)?;

        let swapchain = Swapchain::new(
            &instance.instance,
            &physical_device,
            &device,
            &surface,
            window.framebuffer_size(),
            None,
        )?;

        let loader = ResourceLoader::with_default_roots();
        let compiler = ShaderCompiler::new()?;
        let vertex_shader = ShaderModule::cached(
            device.raw(),
            &loader,
            &compiler,
            &config.shaders.vertex_shader,
            ShaderKind::Vertex,
        )?;
        let fragment_shader = ShaderModule::cached(
            device.raw(),
            &loader,
            &compiler,
            &config.shaders.fragment_shader,
            ShaderKind::Fragment,
        )?;

        let vertex_format = VertexFormat::new(&[
            VertexAttribute::R32g32b32Sfloat,    // vec3 position
            VertexAttribute::R32g32b32a32Sfloat, // vec4 color
        ]);

        let set_layout = DescriptorSetLayout::new(
            device.raw(),
            &[
                DescriptorBinding::uniform_buffer(vk::ShaderStageFlags::VERTEX),
                DescriptorBinding::combined_image_sampler(vk::ShaderStageFlags::FRAGMENT),
            ],
        )?;

        let states = PipelineStates {
            vertex_format: vertex_format.clone(),
            input_assembly: InputAssemblyState::default(),
            viewport: ViewportState::default(),
            rasterizer: RasterizerState::default(),
            multisample: MultisampleState {
                rasterization_samples: physical_device.msaa_samples,
                ..MultisampleState::default()
            },
            depth_stencil: DepthStencilState::default(),
            color_blend: ColorBlendState::default(),
            additional_dynamic_states: vec![
                vk::DynamicState::STENCIL_OP,
                vk::DynamicState::STENCIL_TEST_ENABLE,
                vk::DynamicState::STENCIL_WRITE_MASK,
                vk::DynamicState::STENCIL_COMPARE_MASK,
                vk::DynamicState::PRIMITIVE_TOPOLOGY,
            ],
        };

        let pipeline = GraphicsPipeline::new(
            device.raw(),
            swapchain.render_pass().handle(),
            vec![vertex_shader, fragment_shader],
            &states,
            vec![set_layout],
        )?;

        let vertex_buffer = VertexStagingBuffer::new(
            device.raw(),
            &instance.instance,
            physical_device.device,
            vertex_format,
            config.vertex_buffer_mb,
        )?;

        let frame_sync = FrameSync::new(device.raw())?;

        log::info!("Render engine initialized");

        Ok(Self {
            clear_color: config.clear_color,
            clear_depth: config.clear_depth,
            clear_stencil: config.clear_stencil,
            frame_sync,
            vertex_buffer,
            command_pool,
            pipeline,
            swapchain,
            device,
            physical_device,
            surface,
            instance,
            window,
        })
    }

    /// Run the render loop until the window is closed
    ///
    /// `record` is called once per rendered frame to append the frame's
    /// vertices; the engine handles everything else. On exit the device is
    /// drained before any resource is released.
    pub fn run<F>(&mut self, mut record: F) -> VulkanResult<()>
    where
        F: FnMut(&mut VertexStagingBuffer),
    {
        while !self.window.should_close() {
            self.window.poll_events();
            let mut driver = EngineFrame {
                engine: self,
                record: &mut record,
            };
            frame::advance(&mut driver)?;
        }

        self.device.wait_idle()
    }

    /// The window, for input handling
    pub fn window_mut(&mut self) -> &mut Window {
        &mut self.window
    }

    /// Current swapchain extent in pixels
    pub fn swapchain_extent(&self) -> (u32, u32) {
        let extent = self.swapchain.extent();
        (extent.width, extent.height)
    }

    fn rebuild_swapchain(&mut self) -> VulkanResult<()> {
        // Blocks while minimized: never rebuild against a zero-area target
        let framebuffer_size = self.window.wait_for_valid_framebuffer();

        // Serialize with the GPU before tearing down anything the last
        // submission may still reference.
        self.device.wait_idle()?;

        let rebuilt = Swapchain::new(
            &self.instance.instance,
            &self.physical_device,
            &self.device,
            &self.surface,
            framebuffer_size,
            Some(&self.swapchain),
        )?;
        self.swapchain = rebuilt;

        log::debug!(
            "Swapchain rebuilt at {}x{}",
            self.swapchain.extent().width,
            self.swapchain.extent().height
        );
        Ok(())
    }

    fn record_and_submit_frame(
        &mut self,
        image_index: u32,
        record: &mut dyn FnMut(&mut VertexStagingBuffer),
    ) -> VulkanResult<()> {
        let extent = self.swapchain.extent();
        let render_area = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        };
        let clear_values = [
            vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: self.clear_color,
                },
            },
            vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue {
                    depth: self.clear_depth,
                    stencil: self.clear_stencil,
                },
            },
        ];

        let mut recorder =
            CommandRecorder::new(self.device.raw(), self.command_pool.primary_buffer());
        recorder.begin()?;
        {
            let mut pass = recorder.begin_render_pass(
                self.swapchain.render_pass().handle(),
                self.swapchain.framebuffer(image_index).handle(),
                render_area,
                &clear_values,
            )?;

            pass.bind_pipeline(self.pipeline.handle());

            // Extent changes across recreations; never baked into the pipeline
            pass.set_viewport(vk::Viewport {
                x: 0.0,
                y: 0.0,
                width: extent.width as f32,
                height: extent.height as f32,
                min_depth: 0.0,
                max_depth: 1.0,
            });
            pass.set_scissor(render_area);

            pass.set_stencil_test_enable(false);
            pass.set_stencil_op(
                vk::StencilFaceFlags::FRONT,
                vk::StencilOp::KEEP,
                vk::StencilOp::KEEP,
                vk::StencilOp::KEEP,
                vk::CompareOp::NEVER,
            );

            record(&mut self.vertex_buffer);
            self.vertex_buffer
                .draw(&mut pass, vk::PrimitiveTopology::TRIANGLE_LIST);
        }
        let command_buffer = recorder.end()?;

        // Wait for the image at color-attachment output so vertex work can
        // start before the presentation engine releases the image.
        let wait_semaphores = [self.frame_sync.image_available.handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [command_buffer];
        let signal_semaphores = [self.frame_sync.render_finished.handle()];
        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            self.device
                .device
                .queue_submit(
                    self.device.graphics_queue,
                    &[submit_info.build()],
                    self.frame_sync.in_flight.handle(),
                )
                .map_err(VulkanError::Api)
        }
    }
}

/// One loop iteration's view of the engine, binding the frame's vertex
/// recording callback to the [`FrameDriver`] boundary
struct EngineFrame<'a, F: FnMut(&mut VertexStagingBuffer)> {
    engine: &'a mut RenderEngine,
    record: &'a mut F,
}

impl<'a, F: FnMut(&mut VertexStagingBuffer)> FrameDriver for EngineFrame<'a, F> {
    fn wait_in_flight(&mut self) -> VulkanResult<()> {
        self.engine.frame_sync.in_flight.wait(u64::MAX)
    }

    fn acquire_image(&mut self) -> VulkanResult<AcquireOutcome> {
        let result = unsafe {
            self.engine.swapchain.loader().acquire_next_image(
                self.engine.swapchain.handle(),
                u64::MAX,
                self.engine.frame_sync.image_available.handle(),
                vk::Fence::null(),
            )
        };

        match result {
            Ok((image_index, false)) => Ok(AcquireOutcome::Ready(image_index)),
            Ok((_, true)) | Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                log::debug!("Surface out of date at acquire; rebuilding swapchain");
                Ok(AcquireOutcome::NeedsRebuild)
            }
            Err(e) => Err(VulkanError::Api(e)),
        }
    }

    fn reset_in_flight(&mut self) -> VulkanResult<()> {
        self.engine.frame_sync.in_flight.reset()
    }

    fn record_and_submit(&mut self, image_index: u32) -> VulkanResult<()> {
        self.engine
            .record_and_submit_frame(image_index, &mut *self.record)
    }

    fn present(&mut self, image_index: u32) -> VulkanResult<PresentOutcome> {
        let wait_semaphores = [self.engine.frame_sync.render_finished.handle()];
        let swapchains = [self.engine.swapchain.handle()];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let result = unsafe {
            self.engine
                .swapchain
                .loader()
                .queue_present(self.engine.device.present_queue, &present_info)
        };

        match result {
            Ok(false) => Ok(PresentOutcome::Presented),
            Ok(true) | Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                log::debug!("Surface out of date at present; rebuilding swapchain");
                Ok(PresentOutcome::NeedsRebuild)
            }
            Err(e) => Err(VulkanError::Api(e)),
        }
    }

    fn rebuild_swapchain(&mut self) -> VulkanResult<()> {
        self.engine.rebuild_swapchain()
    }
}

impl Drop for RenderEngine {
    fn drop(&mut self) {
        // Nothing below may be destroyed while a submission is executing
        let _ = self.device.wait_idle();
        // Fields then drop in declaration order: sync objects and buffers
        // first, then pipeline, swapchain, device, surface, instance, window.
    }
}
