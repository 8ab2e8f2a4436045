//! Vulkan swapchain management for presentation
//!
//! This module handles the swapchain lifecycle: creation with format, present
//! mode and extent selection, wholesale recreation during window resize, and
//! proper cleanup ordering. The swapchain owns everything rebuilt on resize —
//! the presentable image views, the render pass, the shared multisampled
//! color and depth attachments, and the per-image framebuffers — and nothing
//! that survives it (the surface belongs to the presentation layer, the
//! pipeline survives because viewport and scissor are dynamic).
//!
//! # Selection policy
//!
//! - **Surface format**: prefer `B8G8R8A8_SRGB` with the sRGB nonlinear color
//!   space for gamma-correct output, else the first advertised format.
//! - **Present mode**: prefer `MAILBOX` (low-latency triple buffering), else
//!   `FIFO`, the only mode the specification guarantees.
//! - **Extent**: the capability-reported current extent unless it is the
//!   `u32::MAX` "undefined" sentinel, in which case the window's framebuffer
//!   pixel size clamped into the supported range.
//! - **Image count**: `min + 1` for headroom, clamped to `max` when the
//!   maximum is bounded (zero means unbounded).
//!
//! The selection functions are pure so the policy is testable without a
//! device.
//!
//! # Recreation
//!
//! Capabilities are re-queried on every build — they change when the window
//! moves between outputs. The old swapchain handle is passed as
//! `old_swapchain` so the presentation engine can migrate resources, then the
//! old chain is dropped; RAII releases framebuffers before the render pass
//! and image views before the swapchain. Swapchain images themselves belong
//! to the presentation engine and are never destroyed by the application.

use ash::extensions::khr::Swapchain as SwapchainLoader;
use ash::{vk, Device, Instance};

use crate::render::vulkan::context::{LogicalDevice, PhysicalDeviceInfo, VulkanError, VulkanResult};
use crate::render::vulkan::framebuffer::{AttachmentImage, Framebuffer};
use crate::render::vulkan::render_pass::RenderPass;
use crate::render::window::Surface;

/// Queried surface capability snapshot
///
/// Recomputed each time the swapchain is (re)built; never cached across
/// resizes because capabilities can change with the output device.
pub struct SwapchainSupport {
    /// Surface capabilities (image counts, extents, transforms)
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    /// Advertised surface formats
    pub formats: Vec<vk::SurfaceFormatKHR>,
    /// Advertised present modes
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SwapchainSupport {
    /// Query fresh support details for a device/surface pair
    pub fn query(device: vk::PhysicalDevice, surface: &Surface) -> VulkanResult<Self> {
        let capabilities = unsafe {
            surface
                .loader()
                .get_physical_device_surface_capabilities(device, surface.handle())
                .map_err(VulkanError::Api)?
        };
        let formats = unsafe {
            surface
                .loader()
                .get_physical_device_surface_formats(device, surface.handle())
                .map_err(VulkanError::Api)?
        };
        let present_modes = unsafe {
            surface
                .loader()
                .get_physical_device_surface_present_modes(device, surface.handle())
                .map_err(VulkanError::Api)?
        };

        Ok(Self {
            capabilities,
            formats,
            present_modes,
        })
    }
}

/// Choose the surface format, preferring sRGB BGRA
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
    formats
        .iter()
        .find(|sf| {
            sf.format == vk::Format::B8G8R8A8_SRGB
                && sf.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .copied()
        .unwrap_or(formats[0])
}

/// Choose the present mode, preferring low-latency MAILBOX over FIFO
pub fn choose_present_mode(modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    modes
        .iter()
        .copied()
        .find(|&mode| mode == vk::PresentModeKHR::MAILBOX)
        .unwrap_or(vk::PresentModeKHR::FIFO)
}

/// Choose the swap extent from the capabilities and framebuffer size
///
/// `u32::MAX` in the current extent is the sentinel for "the surface size is
/// determined by the swapchain"; only then does the window size matter.
pub fn choose_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    framebuffer_size: (u32, u32),
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: framebuffer_size.0.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: framebuffer_size.1.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    }
}

/// Choose the swapchain image count: one above the minimum, bounded above
///
/// A `max_image_count` of zero means the implementation imposes no upper
/// bound.
pub fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let desired = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        desired.min(capabilities.max_image_count)
    } else {
        desired
    }
}

/// Depth formats in preference order
const DEPTH_FORMAT_CANDIDATES: [vk::Format; 3] = [
    vk::Format::D32_SFLOAT,
    vk::Format::D32_SFLOAT_S8_UINT,
    vk::Format::D24_UNORM_S8_UINT,
];

/// Find the first candidate format supporting depth-stencil attachment use
pub fn find_depth_format(
    instance: &Instance,
    physical_device: vk::PhysicalDevice,
) -> VulkanResult<vk::Format> {
    for format in DEPTH_FORMAT_CANDIDATES {
        let props =
            unsafe { instance.get_physical_device_format_properties(physical_device, format) };
        if props
            .optimal_tiling_features
            .contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
        {
            return Ok(format);
        }
    }

    Err(VulkanError::InitializationFailed(
        "No supported depth format found".to_string(),
    ))
}

/// Vulkan swapchain with its dependent render targets
///
/// Owns the presentable image views, the render pass, one shared multisampled
/// color attachment, one shared depth attachment, and one framebuffer per
/// presentable image. The multisampled attachments are shared across all
/// framebuffers rather than per-image: they are transient render targets that
/// only one frame writes at a time (single frame in flight).
pub struct Swapchain {
    device: Device,
    loader: SwapchainLoader,
    swapchain: vk::SwapchainKHR,
    image_views: Vec<vk::ImageView>,
    format: vk::SurfaceFormatKHR,
    extent: vk::Extent2D,
    samples: vk::SampleCountFlags,
    framebuffers: Vec<Framebuffer>,
    render_pass: RenderPass,
    color_attachment: AttachmentImage,
    depth_attachment: AttachmentImage,
}

impl Swapchain {
    /// Create a swapchain and its render-target set
    ///
    /// `previous` enables resource reuse during recreation; pass `None` at
    /// startup. The surface is only borrowed: destroying the swapchain never
    /// touches it.
    pub fn new(
        instance: &Instance,
        physical_device: &PhysicalDeviceInfo,
        device: &LogicalDevice,
        surface: &Surface,
        framebuffer_size: (u32, u32),
        previous: Option<&Swapchain>,
    ) -> VulkanResult<Self> {
        let support = SwapchainSupport::query(physical_device.device, surface)?;
        let format = choose_surface_format(&support.formats);
        let present_mode = choose_present_mode(&support.present_modes);
        let extent = choose_extent(&support.capabilities, framebuffer_size);
        let image_count = choose_image_count(&support.capabilities);
        let samples = physical_device.msaa_samples;

        let loader = SwapchainLoader::new(instance, &device.device);

        let queue_family_indices = [device.graphics_family, device.present_family];
        let mut create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(surface.handle())
            .min_image_count(image_count)
            .image_format(format.format)
            .image_color_space(format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .pre_transform(support.capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(
                previous.map_or_else(vk::SwapchainKHR::null, |prev| prev.swapchain),
            );

        // Images written by the graphics queue and presented by the present
        // queue need concurrent sharing when those are different families.
        if device.graphics_family != device.present_family {
            log::debug!("Swapchain images shared concurrently across queue families");
            create_info = create_info
                .image_sharing_mode(vk::SharingMode::CONCURRENT)
                .queue_family_indices(&queue_family_indices);
        } else {
            create_info = create_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE);
        }

        let swapchain = unsafe {
            loader
                .create_swapchain(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        let images = unsafe {
            loader
                .get_swapchain_images(swapchain)
                .map_err(VulkanError::Api)?
        };
        log::info!(
            "Created swapchain: {} images, {:?}, {:?}, {}x{}",
            images.len(),
            format.format,
            present_mode,
            extent.width,
            extent.height
        );

        let raw_device = device.raw();
        let image_views = Self::create_image_views(&raw_device, &images, format.format)?;

        // The render pass must exist before any framebuffer referencing it
        let depth_format = find_depth_format(instance, physical_device.device)?;
        let render_pass = RenderPass::new(raw_device.clone(), format.format, depth_format, samples)?;

        let color_attachment = AttachmentImage::new(
            raw_device.clone(),
            instance,
            physical_device.device,
            extent,
            format.format,
            samples,
            vk::ImageUsageFlags::TRANSIENT_ATTACHMENT | vk::ImageUsageFlags::COLOR_ATTACHMENT,
            vk::ImageAspectFlags::COLOR,
        )?;

        let depth_attachment = AttachmentImage::new(
            raw_device.clone(),
            instance,
            physical_device.device,
            extent,
            depth_format,
            samples,
            vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
            vk::ImageAspectFlags::DEPTH,
        )?;

        let framebuffers = image_views
            .iter()
            .map(|&view| {
                Framebuffer::new(
                    raw_device.clone(),
                    render_pass.handle(),
                    &[
                        color_attachment.view(),
                        depth_attachment.view(),
                        view,
                    ],
                    extent,
                )
            })
            .collect::<VulkanResult<Vec<_>>>()?;

        Ok(Self {
            device: raw_device,
            loader,
            swapchain,
            image_views,
            format,
            extent,
            samples,
            framebuffers,
            render_pass,
            color_attachment,
            depth_attachment,
        })
    }

    fn create_image_views(
        device: &Device,
        images: &[vk::Image],
        format: vk::Format,
    ) -> VulkanResult<Vec<vk::ImageView>> {
        images
            .iter()
            .map(|&image| {
                let create_info = vk::ImageViewCreateInfo::builder()
                    .image(image)
                    .view_type(vk::ImageViewType::TYPE_2D)
                    .format(format)
                    .subresource_range(vk::ImageSubresourceRange {
                        aspect_mask: vk::ImageAspectFlags::COLOR,
                        base_mip_level: 0,
                        level_count: 1,
                        base_array_layer: 0,
                        layer_count: 1,
                    });

                unsafe {
                    device
                        .create_image_view(&create_info, None)
                        .map_err(VulkanError::Api)
                }
            })
            .collect()
    }

    /// Get the swapchain handle
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    /// Get the swapchain extension loader
    pub fn loader(&self) -> &SwapchainLoader {
        &self.loader
    }

    /// Current swapchain extent
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// Selected surface format
    pub fn format(&self) -> vk::SurfaceFormatKHR {
        self.format
    }

    /// Sample count of the multisampled attachments
    pub fn samples(&self) -> vk::SampleCountFlags {
        self.samples
    }

    /// Number of presentable images
    pub fn image_count(&self) -> u32 {
        self.image_views.len() as u32
    }

    /// The render pass all framebuffers were built against
    pub fn render_pass(&self) -> &RenderPass {
        &self.render_pass
    }

    /// Framebuffer for a presentable image index
    pub fn framebuffer(&self, image_index: u32) -> &Framebuffer {
        &self.framebuffers[image_index as usize]
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        // Framebuffers reference both the render pass and the image views,
        // so they go first; the render pass and attachments are fields with
        // their own Drop and are released after this body.
        self.framebuffers.clear();
        unsafe {
            for view in self.image_views.drain(..) {
                self.device.destroy_image_view(view, None);
            }
            self.loader.destroy_swapchain(self.swapchain, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR {
            format,
            color_space,
        }
    }

    fn capabilities(min: u32, max: u32) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: min,
            max_image_count: max,
            ..Default::default()
        }
    }

    #[test]
    fn test_surface_format_prefers_srgb_bgra() {
        let formats = [
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];
        let chosen = choose_surface_format(&formats);
        assert_eq!(chosen.format, vk::Format::B8G8R8A8_SRGB);
        assert_eq!(chosen.color_space, vk::ColorSpaceKHR::SRGB_NONLINEAR);
    }

    #[test]
    fn test_surface_format_falls_back_to_first_advertised() {
        let formats = [format(
            vk::Format::R8G8B8A8_UNORM,
            vk::ColorSpaceKHR::SRGB_NONLINEAR,
        )];
        let chosen = choose_surface_format(&formats);
        assert_eq!(chosen.format, vk::Format::R8G8B8A8_UNORM);
    }

    #[test]
    fn test_surface_format_requires_matching_color_space() {
        // The right format in the wrong color space is not the preferred pair
        let formats = [
            format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT),
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];
        let chosen = choose_surface_format(&formats);
        assert_eq!(chosen.format, vk::Format::B8G8R8A8_SRGB);
        assert_eq!(
            chosen.color_space,
            vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT
        );
    }

    #[test]
    fn test_present_mode_prefers_mailbox() {
        let modes = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX];
        assert_eq!(choose_present_mode(&modes), vk::PresentModeKHR::MAILBOX);
    }

    #[test]
    fn test_present_mode_falls_back_to_fifo() {
        let modes = [vk::PresentModeKHR::FIFO];
        assert_eq!(choose_present_mode(&modes), vk::PresentModeKHR::FIFO);

        let modes = [vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::FIFO];
        assert_eq!(choose_present_mode(&modes), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn test_extent_uses_current_when_defined() {
        let caps = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D {
                width: 1024,
                height: 768,
            },
            ..Default::default()
        };
        let extent = choose_extent(&caps, (555, 333));
        assert_eq!((extent.width, extent.height), (1024, 768));
    }

    #[test]
    fn test_extent_clamps_framebuffer_size_when_undefined() {
        let caps = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D {
                width: u32::MAX,
                height: u32::MAX,
            },
            min_image_extent: vk::Extent2D {
                width: 200,
                height: 200,
            },
            max_image_extent: vk::Extent2D {
                width: 2000,
                height: 2000,
            },
            ..Default::default()
        };
        let extent = choose_extent(&caps, (100, 4000));
        assert_eq!((extent.width, extent.height), (200, 2000));

        let extent = choose_extent(&caps, (800, 600));
        assert_eq!((extent.width, extent.height), (800, 600));
    }

    #[test]
    fn test_image_count_is_min_plus_one_clamped() {
        assert_eq!(choose_image_count(&capabilities(2, 8)), 3);
        assert_eq!(choose_image_count(&capabilities(2, 3)), 3);
        assert_eq!(choose_image_count(&capabilities(3, 3)), 3);
        // Zero max means unbounded
        assert_eq!(choose_image_count(&capabilities(2, 0)), 3);
    }

    #[test]
    fn test_image_count_respects_bounds_for_all_capability_pairs() {
        for min in 1..8u32 {
            for max in 0..10u32 {
                if max != 0 && max < min {
                    continue; // not a valid capability pair
                }
                let count = choose_image_count(&capabilities(min, max));
                assert!(count >= min, "count {} below min {}", count, min);
                if max > 0 {
                    assert!(count <= max, "count {} above max {}", count, max);
                } else {
                    assert_eq!(count, min + 1);
                }
            }
        }
    }
}
