//! Vulkan context management
//!
//! Low-level Vulkan bring-up: instance creation with optional validation
//! layers, physical device scoring and selection, and logical device/queue
//! construction. Everything here fails fatally — a machine that cannot
//! produce a working device will not produce one on retry, so errors
//! propagate straight to `main`.

use ash::extensions::ext::DebugUtils;
use ash::extensions::khr::Swapchain as SwapchainLoader;
use ash::vk;
use ash::{Device, Entry, Instance};
use std::ffi::{CStr, CString};
use thiserror::Error;

use crate::render::window::{Surface, Window};

/// Vulkan-specific error types
#[derive(Error, Debug)]
pub enum VulkanError {
    /// General Vulkan API error with result code
    #[error("Vulkan API error: {0:?}")]
    Api(vk::Result),

    /// Invalid operation attempted
    #[error("Invalid operation: {reason}")]
    InvalidOperation {
        /// Description of why the operation is invalid
        reason: String,
    },

    /// Vulkan context initialization failed
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    /// No suitable memory type found for an allocation
    #[error("No suitable memory type found")]
    NoSuitableMemoryType,

    /// GLSL to SPIR-V compilation failed
    #[error("Shader compilation failed ({name}): {errors} error(s): {message}")]
    ShaderCompilation {
        /// Logical name of the shader that failed
        name: String,
        /// Number of compile errors reported
        errors: u32,
        /// Compiler diagnostic text
        message: String,
    },
}

/// Result type for Vulkan operations
pub type VulkanResult<T> = Result<T, VulkanError>;

const VALIDATION_LAYER: &str = "VK_LAYER_KHRONOS_validation";

/// Vulkan instance wrapper with RAII cleanup
pub struct VulkanInstance {
    /// Vulkan entry point
    pub entry: Entry,
    /// Vulkan instance handle
    pub instance: Instance,
    debug_utils: Option<DebugUtils>,
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
}

impl VulkanInstance {
    /// Create a new Vulkan instance, requesting validation layers when asked
    ///
    /// If validation is requested but the Khronos validation layer is not
    /// installed, the request is downgraded with a warning rather than
    /// failing: validation is a development aid, not a requirement.
    pub fn new(window: &Window, app_name: &str, validation: bool) -> VulkanResult<Self> {
        let entry = unsafe { Entry::load() }.map_err(|e| {
            VulkanError::InitializationFailed(format!("Failed to load Vulkan: {:?}", e))
        })?;

        let app_name_cstr = CString::new(app_name).unwrap();
        let engine_name_cstr = CString::new("render_engine").unwrap();
        let app_info = vk::ApplicationInfo::builder()
            .application_name(&app_name_cstr)
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(&engine_name_cstr)
            .engine_version(vk::make_api_version(0, 1, 0, 0))
            .api_version(vk::API_VERSION_1_3);

        let validation = validation && Self::validation_layer_available(&entry)?;
        log::debug!("Validation layers enabled: {}", validation);

        let required_extensions = window.required_instance_extensions().map_err(|e| {
            VulkanError::InitializationFailed(format!("Failed to get required extensions: {}", e))
        })?;

        let cstr_extensions: Vec<CString> = required_extensions
            .iter()
            .map(|ext| CString::new(ext.as_str()).unwrap())
            .collect();

        let mut extensions: Vec<*const i8> =
            cstr_extensions.iter().map(|ext| ext.as_ptr()).collect();
        if validation {
            extensions.push(DebugUtils::name().as_ptr());
        }

        let layer_name = CString::new(VALIDATION_LAYER).unwrap();
        let layer_names_ptrs: Vec<*const i8> = if validation {
            vec![layer_name.as_ptr()]
        } else {
            vec![]
        };

        let create_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_extension_names(&extensions)
            .enabled_layer_names(&layer_names_ptrs);

        let instance = unsafe {
            entry
                .create_instance(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        let (debug_utils, debug_messenger) = if validation {
            let debug_utils = DebugUtils::new(&entry, &instance);
            let debug_messenger = Self::setup_debug_messenger(&debug_utils)?;
            (Some(debug_utils), Some(debug_messenger))
        } else {
            (None, None)
        };

        Ok(Self {
            entry,
            instance,
            debug_utils,
            debug_messenger,
        })
    }

    fn validation_layer_available(entry: &Entry) -> VulkanResult<bool> {
        let layers = entry
            .enumerate_instance_layer_properties()
            .map_err(VulkanError::Api)?;

        let available = layers.iter().any(|layer| {
            let name = unsafe { CStr::from_ptr(layer.layer_name.as_ptr()) };
            name.to_string_lossy() == VALIDATION_LAYER
        });

        if !available {
            log::warn!(
                "Requested validation but {} is not installed; continuing without validation",
                VALIDATION_LAYER
            );
        }
        Ok(available)
    }

    fn setup_debug_messenger(debug_utils: &DebugUtils) -> VulkanResult<vk::DebugUtilsMessengerEXT> {
        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::builder()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(debug_callback));

        unsafe {
            debug_utils
                .create_debug_utils_messenger(&create_info, None)
                .map_err(VulkanError::Api)
        }
    }

    /// Get a reference to the raw instance
    pub fn raw(&self) -> &Instance {
        &self.instance
    }
}

impl Drop for VulkanInstance {
    fn drop(&mut self) {
        unsafe {
            if let (Some(debug_utils), Some(debug_messenger)) =
                (&self.debug_utils, &self.debug_messenger)
            {
                debug_utils.destroy_debug_utils_messenger(*debug_messenger, None);
            }

            self.instance.destroy_instance(None);
        }
    }
}

/// Debug callback for validation layers
unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    let callback_data = *callback_data;
    let message = CStr::from_ptr(callback_data.p_message).to_string_lossy();

    if message_severity >= vk::DebugUtilsMessageSeverityFlagsEXT::ERROR {
        log::error!("[Vulkan] {:?} - {}", message_type, message);
    } else if message_severity >= vk::DebugUtilsMessageSeverityFlagsEXT::WARNING {
        log::warn!("[Vulkan] {:?} - {}", message_type, message);
    } else {
        log::debug!("[Vulkan] {:?} - {}", message_type, message);
    }

    vk::FALSE
}

/// Physical device selection and capabilities
pub struct PhysicalDeviceInfo {
    /// Vulkan physical device handle
    pub device: vk::PhysicalDevice,
    /// Device properties and limits
    pub properties: vk::PhysicalDeviceProperties,
    /// Supported device features
    pub features: vk::PhysicalDeviceFeatures,
    /// Index of the graphics queue family
    pub graphics_family: u32,
    /// Index of the presentation queue family
    pub present_family: u32,
    /// Highest sample count usable for both color and depth attachments
    pub msaa_samples: vk::SampleCountFlags,
}

impl PhysicalDeviceInfo {
    /// Select the best-scoring physical device that can render to the surface
    ///
    /// Devices are scored (discrete GPU bonus plus maximum 2D image
    /// dimension); unsuitable devices score zero. Suitability requires
    /// graphics and present queue families, the swapchain extension, at
    /// least one surface format and one present mode, and anisotropic
    /// filtering support.
    pub fn select(instance: &Instance, surface: &Surface) -> VulkanResult<Self> {
        let devices = unsafe {
            instance
                .enumerate_physical_devices()
                .map_err(VulkanError::Api)?
        };

        if devices.is_empty() {
            return Err(VulkanError::InitializationFailed(
                "No GPUs with Vulkan support found".to_string(),
            ));
        }

        let mut best: Option<(u32, Self)> = None;
        for device in devices {
            match Self::evaluate_device(instance, device, surface) {
                Ok(Some((score, info))) => {
                    if best.as_ref().map_or(true, |(s, _)| score > *s) {
                        best = Some((score, info));
                    }
                }
                Ok(None) => {}
                Err(e) => log::debug!("Skipping device: {}", e),
            }
        }

        let (score, info) = best.ok_or_else(|| {
            VulkanError::InitializationFailed("No suitable GPU found".to_string())
        })?;

        log::info!(
            "Selected GPU: {} (score {})",
            unsafe { CStr::from_ptr(info.properties.device_name.as_ptr()).to_string_lossy() },
            score
        );
        Ok(info)
    }

    fn evaluate_device(
        instance: &Instance,
        device: vk::PhysicalDevice,
        surface: &Surface,
    ) -> VulkanResult<Option<(u32, Self)>> {
        let properties = unsafe { instance.get_physical_device_properties(device) };
        let features = unsafe { instance.get_physical_device_features(device) };
        let queue_families =
            unsafe { instance.get_physical_device_queue_family_properties(device) };

        // Find graphics and present queue families
        let mut graphics_family = None;
        let mut present_family = None;

        for (index, family) in queue_families.iter().enumerate() {
            let index = index as u32;

            if family.queue_flags.contains(vk::QueueFlags::GRAPHICS) && graphics_family.is_none() {
                graphics_family = Some(index);
            }

            let present_support = unsafe {
                surface
                    .loader()
                    .get_physical_device_surface_support(device, index, surface.handle())
                    .map_err(VulkanError::Api)?
            };

            if present_support && present_family.is_none() {
                present_family = Some(index);
            }

            if graphics_family.is_some() && present_family.is_some() {
                break;
            }
        }

        let (Some(graphics_family), Some(present_family)) = (graphics_family, present_family)
        else {
            return Ok(None);
        };

        if !Self::supports_required_extensions(instance, device)? {
            return Ok(None);
        }

        // The swapchain must have something to work with
        let support =
            crate::render::vulkan::swapchain::SwapchainSupport::query(device, surface)?;
        if support.formats.is_empty() || support.present_modes.is_empty() {
            return Ok(None);
        }

        if features.sampler_anisotropy == vk::FALSE {
            return Ok(None);
        }

        let mut score = 0;
        if properties.device_type == vk::PhysicalDeviceType::DISCRETE_GPU {
            score += 1000;
        }
        score += properties.limits.max_image_dimension2_d;

        let msaa_samples = max_sample_count(&properties.limits);

        Ok(Some((
            score,
            Self {
                device,
                properties,
                features,
                graphics_family,
                present_family,
                msaa_samples,
            },
        )))
    }

    fn supports_required_extensions(
        instance: &Instance,
        device: vk::PhysicalDevice,
    ) -> VulkanResult<bool> {
        let extensions = unsafe {
            instance
                .enumerate_device_extension_properties(device)
                .map_err(VulkanError::Api)?
        };

        let required = [SwapchainLoader::name()];
        Ok(required.iter().all(|required| {
            extensions.iter().any(|available| {
                let name = unsafe { CStr::from_ptr(available.extension_name.as_ptr()) };
                name == *required
            })
        }))
    }
}

/// Highest sample count supported for color, depth and stencil framebuffers
///
/// The render pass uses one sample count for all its attachments, so the
/// usable count is the intersection of the three limits.
pub fn max_sample_count(limits: &vk::PhysicalDeviceLimits) -> vk::SampleCountFlags {
    let counts = limits.framebuffer_color_sample_counts
        & limits.framebuffer_depth_sample_counts
        & limits.framebuffer_stencil_sample_counts;

    for candidate in [
        vk::SampleCountFlags::TYPE_64,
        vk::SampleCountFlags::TYPE_32,
        vk::SampleCountFlags::TYPE_16,
        vk::SampleCountFlags::TYPE_8,
        vk::SampleCountFlags::TYPE_4,
        vk::SampleCountFlags::TYPE_2,
    ] {
        if counts.contains(candidate) {
            return candidate;
        }
    }

    vk::SampleCountFlags::TYPE_1
}

/// Logical device wrapper with RAII cleanup
pub struct LogicalDevice {
    /// Vulkan logical device handle
    pub device: Device,
    /// Graphics operations queue
    pub graphics_queue: vk::Queue,
    /// Surface presentation queue
    pub present_queue: vk::Queue,
    /// Index of the graphics queue family
    pub graphics_family: u32,
    /// Index of the presentation queue family
    pub present_family: u32,
}

impl LogicalDevice {
    /// Create a new logical device with graphics and present queues
    pub fn new(instance: &Instance, physical_device: &PhysicalDeviceInfo) -> VulkanResult<Self> {
        let unique_families: std::collections::HashSet<u32> = [
            physical_device.graphics_family,
            physical_device.present_family,
        ]
        .iter()
        .cloned()
        .collect();

        let queue_infos: Vec<vk::DeviceQueueCreateInfo> = unique_families
            .iter()
            .map(|&family| {
                vk::DeviceQueueCreateInfo::builder()
                    .queue_family_index(family)
                    .queue_priorities(&[1.0])
                    .build()
            })
            .collect();

        let required_extensions = [SwapchainLoader::name().as_ptr()];

        let device_features = vk::PhysicalDeviceFeatures::builder()
            .sampler_anisotropy(true)
            .build();

        let create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_infos)
            .enabled_extension_names(&required_extensions)
            .enabled_features(&device_features);

        let device = unsafe {
            instance
                .create_device(physical_device.device, &create_info, None)
                .map_err(VulkanError::Api)?
        };

        let graphics_queue =
            unsafe { device.get_device_queue(physical_device.graphics_family, 0) };
        let present_queue = unsafe { device.get_device_queue(physical_device.present_family, 0) };

        log::info!(
            "Created logical device (graphics family {}, present family {})",
            physical_device.graphics_family,
            physical_device.present_family
        );

        Ok(Self {
            device,
            graphics_queue,
            present_queue,
            graphics_family: physical_device.graphics_family,
            present_family: physical_device.present_family,
        })
    }

    /// Get a clone of the raw device handle for RAII wrappers
    pub fn raw(&self) -> Device {
        self.device.clone()
    }

    /// Block until all submitted work on every queue has completed
    ///
    /// Used before any teardown and during swapchain recreation: destroying a
    /// resource a still-executing command references is the canonical Vulkan
    /// use-after-free.
    pub fn wait_idle(&self) -> VulkanResult<()> {
        unsafe { self.device.device_wait_idle().map_err(VulkanError::Api) }
    }
}

impl Drop for LogicalDevice {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
            self.device.destroy_device(None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits_with(counts: vk::SampleCountFlags) -> vk::PhysicalDeviceLimits {
        vk::PhysicalDeviceLimits {
            framebuffer_color_sample_counts: counts,
            framebuffer_depth_sample_counts: counts,
            framebuffer_stencil_sample_counts: counts,
            ..Default::default()
        }
    }

    #[test]
    fn test_max_sample_count_picks_highest_common_bit() {
        let limits = limits_with(
            vk::SampleCountFlags::TYPE_1
                | vk::SampleCountFlags::TYPE_2
                | vk::SampleCountFlags::TYPE_4
                | vk::SampleCountFlags::TYPE_8,
        );
        assert_eq!(max_sample_count(&limits), vk::SampleCountFlags::TYPE_8);
    }

    #[test]
    fn test_max_sample_count_intersects_color_and_depth() {
        let limits = vk::PhysicalDeviceLimits {
            framebuffer_color_sample_counts: vk::SampleCountFlags::TYPE_1
                | vk::SampleCountFlags::TYPE_4
                | vk::SampleCountFlags::TYPE_8,
            framebuffer_depth_sample_counts: vk::SampleCountFlags::TYPE_1
                | vk::SampleCountFlags::TYPE_4,
            framebuffer_stencil_sample_counts: vk::SampleCountFlags::TYPE_1
                | vk::SampleCountFlags::TYPE_4,
            ..Default::default()
        };
        assert_eq!(max_sample_count(&limits), vk::SampleCountFlags::TYPE_4);
    }

    #[test]
    fn test_max_sample_count_falls_back_to_single_sample() {
        let limits = limits_with(vk::SampleCountFlags::TYPE_1);
        assert_eq!(max_sample_count(&limits), vk::SampleCountFlags::TYPE_1);
    }
}
