//! Shader compilation and module management
//!
//! GLSL sources are compiled to SPIR-V at startup through `shaderc`; a
//! precompiled `<name>.spv` next to the source short-circuits compilation.
//! Compilation failure is fatal — there is no fallback shader, and the
//! diagnostics (message plus error count) go straight into the error.

use ash::{vk, Device};

use crate::assets::ResourceLoader;
use crate::render::vulkan::context::{VulkanError, VulkanResult};

/// Shader stage kind, bridging shaderc and Vulkan stage flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderKind {
    /// Vertex stage
    Vertex,
    /// Fragment stage
    Fragment,
}

impl ShaderKind {
    /// The shaderc compilation kind
    pub fn shaderc_kind(self) -> shaderc::ShaderKind {
        match self {
            Self::Vertex => shaderc::ShaderKind::Vertex,
            Self::Fragment => shaderc::ShaderKind::Fragment,
        }
    }

    /// The Vulkan pipeline stage flag
    pub fn stage_flags(self) -> vk::ShaderStageFlags {
        match self {
            Self::Vertex => vk::ShaderStageFlags::VERTEX,
            Self::Fragment => vk::ShaderStageFlags::FRAGMENT,
        }
    }
}

/// GLSL to SPIR-V compiler
pub struct ShaderCompiler {
    compiler: shaderc::Compiler,
}

impl ShaderCompiler {
    /// Initialize the compiler backend
    pub fn new() -> VulkanResult<Self> {
        let compiler = shaderc::Compiler::new().ok_or_else(|| {
            VulkanError::InitializationFailed("Failed to initialize shaderc".to_string())
        })?;
        Ok(Self { compiler })
    }

    /// Compile GLSL source text into SPIR-V words
    ///
    /// `file_name` is only used in diagnostics.
    pub fn compile(
        &self,
        source: &str,
        kind: ShaderKind,
        file_name: &str,
    ) -> VulkanResult<Vec<u32>> {
        let start = std::time::Instant::now();
        let artifact = self
            .compiler
            .compile_into_spirv(source, kind.shaderc_kind(), file_name, "main", None)
            .map_err(|e| match e {
                shaderc::Error::CompilationError(errors, message) => {
                    VulkanError::ShaderCompilation {
                        name: file_name.to_string(),
                        errors,
                        message,
                    }
                }
                other => VulkanError::ShaderCompilation {
                    name: file_name.to_string(),
                    errors: 1,
                    message: other.to_string(),
                },
            })?;

        if artifact.get_num_warnings() > 0 {
            log::warn!(
                "Compiled {} with {} warning(s):\n{}",
                file_name,
                artifact.get_num_warnings(),
                artifact.get_warning_messages()
            );
        }
        log::info!(
            "Compiled shader {} in {:?}",
            file_name,
            start.elapsed()
        );

        Ok(artifact.as_binary().to_vec())
    }
}

/// Shader module wrapper with RAII cleanup
pub struct ShaderModule {
    device: Device,
    module: vk::ShaderModule,
    stage: vk::ShaderStageFlags,
}

impl ShaderModule {
    /// Create a shader module from SPIR-V words
    pub fn from_words(
        device: Device,
        words: &[u32],
        kind: ShaderKind,
    ) -> VulkanResult<Self> {
        let create_info = vk::ShaderModuleCreateInfo::builder().code(words);

        let module = unsafe {
            device
                .create_shader_module(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self {
            device,
            module,
            stage: kind.stage_flags(),
        })
    }

    /// Create a shader module from raw SPIR-V bytes
    pub fn from_bytes(device: Device, bytes: &[u8], kind: ShaderKind) -> VulkanResult<Self> {
        // SPIR-V is a stream of u32 words; reject misaligned blobs
        let (prefix, words, suffix) = unsafe { bytes.align_to::<u32>() };
        if !prefix.is_empty() || !suffix.is_empty() {
            return Err(VulkanError::InitializationFailed(
                "SPIR-V bytecode is not properly aligned".to_string(),
            ));
        }

        Self::from_words(device, words, kind)
    }

    /// Load a shader by logical name, compiling the GLSL source on a cache miss
    ///
    /// Resolution order: `<name>.spv` (precompiled binary), then `<name>`
    /// (GLSL source, compiled through `compiler`).
    pub fn cached(
        device: Device,
        loader: &ResourceLoader,
        compiler: &ShaderCompiler,
        name: &str,
        kind: ShaderKind,
    ) -> VulkanResult<Self> {
        let spv_name = format!("{}.spv", name);
        if let Ok(binary) = loader.load(&spv_name) {
            log::debug!("Loaded precompiled shader {}", spv_name);
            return Self::from_bytes(device, &binary, kind);
        }

        let source = loader.load_text(name).map_err(|e| {
            VulkanError::InitializationFailed(format!("Failed to load shader source: {}", e))
        })?;
        let words = compiler.compile(&source, kind, name)?;
        Self::from_words(device, &words, kind)
    }

    /// Get the shader module handle
    pub fn handle(&self) -> vk::ShaderModule {
        self.module
    }

    /// The pipeline stage this module was compiled for
    pub fn stage(&self) -> vk::ShaderStageFlags {
        self.stage
    }

    /// Build the pipeline stage create info for this module
    pub fn stage_info(&self, entry_point: &std::ffi::CStr) -> vk::PipelineShaderStageCreateInfo {
        vk::PipelineShaderStageCreateInfo::builder()
            .stage(self.stage)
            .module(self.module)
            .name(entry_point)
            .build()
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.module, None);
        }
    }
}
