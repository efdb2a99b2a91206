// SPDX-License-Identifier: CEPL-1.0
//! Realizing a [`SwapchainConfig`] into a driver-owned image chain.

use std::sync::Arc;

use ash::khr::swapchain;
use ash::vk;
use tracing::{debug, info, warn};

use crate::device::DeviceContext;
use crate::error::{Error, Result, VkResultExt};
use crate::policy::{format_name, present_mode_name, SwapchainConfig};
use crate::surface::Surface;

pub const DEFAULT_IMAGE_USAGE: vk::ImageUsageFlags = vk::ImageUsageFlags::from_raw(
    vk::ImageUsageFlags::COLOR_ATTACHMENT.as_raw() | vk::ImageUsageFlags::TRANSFER_DST.as_raw(),
);

pub struct SwapchainBuilder<'a> {
    device: &'a Arc<DeviceContext>,
    surface: &'a Arc<Surface>,
    config: SwapchainConfig,
    sharing_mode: vk::SharingMode,
    image_usage: vk::ImageUsageFlags,
}

impl<'a> SwapchainBuilder<'a> {
    pub fn new(
        device: &'a Arc<DeviceContext>,
        surface: &'a Arc<Surface>,
        config: SwapchainConfig,
    ) -> Self {
        Self {
            device,
            surface,
            config,
            sharing_mode: vk::SharingMode::EXCLUSIVE,
            image_usage: DEFAULT_IMAGE_USAGE,
        }
    }

    pub fn sharing_mode(mut self, mode: vk::SharingMode) -> Self {
        self.sharing_mode = mode;
        self
    }

    pub fn image_usage(mut self, usage: vk::ImageUsageFlags) -> Self {
        self.image_usage = usage;
        self
    }

    /// Create the chain. Any non-success status from `vkCreateSwapchainKHR`
    /// is returned untouched in [`Error::ChainCreationRejected`].
    pub fn build(self) -> Result<Swapchain> {
        let extent = self.config.extent;
        require_area(extent)?;

        let runtime = self.device.runtime();
        let loader = swapchain::Device::new(runtime.instance(), self.device.device());
        let info = create_info(
            self.surface.handle(),
            &self.config,
            self.sharing_mode,
            self.image_usage,
        );

        let handle = unsafe { loader.create_swapchain(&info, None) }
            .map_err(|code| Error::ChainCreationRejected {
                code: code.as_raw(),
            })?;

        let images = match unsafe { loader.get_swapchain_images(handle) }
            .stage("vkGetSwapchainImagesKHR")
        {
            Ok(images) => images,
            Err(e) => {
                unsafe { loader.destroy_swapchain(handle, None) };
                return Err(e);
            }
        };

        if (images.len() as u32) < self.config.image_count {
            warn!(
                requested = self.config.image_count,
                realized = images.len(),
                "driver returned fewer images than requested"
            );
        }
        info!(
            "swapchain ready ({}x{}, {} images, {}, {})",
            extent.width,
            extent.height,
            images.len(),
            format_name(self.config.format),
            present_mode_name(self.config.present_mode)
        );

        Ok(Swapchain {
            device: Arc::clone(self.device),
            _surface: Arc::clone(self.surface),
            loader,
            handle,
            images,
            config: self.config,
        })
    }
}

/// A minimized window reports a 0x0 extent; no chain can be created for it.
pub fn require_area(extent: vk::Extent2D) -> Result<()> {
    if extent.width == 0 || extent.height == 0 {
        return Err(Error::ZeroExtent {
            width: extent.width,
            height: extent.height,
        });
    }
    Ok(())
}

/// Create-info for a first-time chain: one array layer, opaque composition,
/// clipped, no previous swapchain.
pub fn create_info(
    surface: vk::SurfaceKHR,
    config: &SwapchainConfig,
    sharing_mode: vk::SharingMode,
    image_usage: vk::ImageUsageFlags,
) -> vk::SwapchainCreateInfoKHR<'static> {
    vk::SwapchainCreateInfoKHR::default()
        .surface(surface)
        .min_image_count(config.image_count)
        .image_format(config.format)
        .image_color_space(config.color_space)
        .image_extent(config.extent)
        .image_array_layers(1)
        .image_usage(image_usage)
        .image_sharing_mode(sharing_mode)
        .pre_transform(config.transform)
        .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
        .present_mode(config.present_mode)
        .clipped(true)
}

/// A realized chain. Keeps its device and surface alive and is destroyed
/// before either of them.
pub struct Swapchain {
    device: Arc<DeviceContext>,
    _surface: Arc<Surface>,
    loader: swapchain::Device,
    handle: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    config: SwapchainConfig,
}

impl Swapchain {
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.handle
    }

    /// Images owned by the chain; may outnumber `config().image_count`.
    pub fn images(&self) -> &[vk::Image] {
        &self.images
    }

    pub fn config(&self) -> &SwapchainConfig {
        &self.config
    }

    pub fn loader(&self) -> &swapchain::Device {
        &self.loader
    }

    pub fn device(&self) -> &Arc<DeviceContext> {
        &self.device
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            self.device.device().device_wait_idle().ok();
            self.loader.destroy_swapchain(self.handle, None);
        }
        debug!("swapchain destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SwapchainConfig {
        SwapchainConfig {
            image_count: 3,
            format: vk::Format::B8G8R8A8_UNORM,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            extent: vk::Extent2D {
                width: 800,
                height: 600,
            },
            transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
            present_mode: vk::PresentModeKHR::MAILBOX,
        }
    }

    #[test]
    fn zero_extent_is_refused() {
        for (width, height) in [(0, 0), (0, 600), (800, 0)] {
            let err = require_area(vk::Extent2D { width, height }).unwrap_err();
            assert!(
                matches!(err, Error::ZeroExtent { width: w, height: h } if w == width && h == height),
                "{err}"
            );
        }
        require_area(vk::Extent2D { width: 1, height: 1 }).unwrap();
    }

    #[test]
    fn minimized_surface_passes_policy_but_not_builder() {
        let caps = vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            current_extent: vk::Extent2D { width: 0, height: 0 },
            supported_transforms: vk::SurfaceTransformFlagsKHR::IDENTITY,
            current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
            ..Default::default()
        };
        let support = crate::probe::SurfaceSupport {
            capabilities: caps,
            formats: vec![vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_UNORM,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            }],
            present_modes: vec![vk::PresentModeKHR::FIFO],
        };
        let cfg = crate::policy::decide(&support, vk::Extent2D { width: 800, height: 600 });
        cfg.check_against(&support).unwrap();
        assert!(matches!(
            require_area(cfg.extent),
            Err(Error::ZeroExtent { width: 0, height: 0 })
        ));
    }

    #[test]
    fn default_usage_is_color_and_transfer_dst() {
        assert!(DEFAULT_IMAGE_USAGE.contains(vk::ImageUsageFlags::COLOR_ATTACHMENT));
        assert!(DEFAULT_IMAGE_USAGE.contains(vk::ImageUsageFlags::TRANSFER_DST));
        assert!(!DEFAULT_IMAGE_USAGE.contains(vk::ImageUsageFlags::SAMPLED));
    }

    #[test]
    fn create_info_carries_config() {
        let cfg = config();
        let ci = create_info(
            vk::SurfaceKHR::null(),
            &cfg,
            vk::SharingMode::EXCLUSIVE,
            DEFAULT_IMAGE_USAGE,
        );
        assert_eq!(ci.min_image_count, 3);
        assert_eq!(ci.image_format, cfg.format);
        assert_eq!(ci.image_color_space, cfg.color_space);
        assert_eq!(ci.image_extent, cfg.extent);
        assert_eq!(ci.pre_transform, cfg.transform);
        assert_eq!(ci.present_mode, cfg.present_mode);
        assert_eq!(ci.image_sharing_mode, vk::SharingMode::EXCLUSIVE);
        assert_eq!(ci.image_array_layers, 1);
        assert_eq!(ci.composite_alpha, vk::CompositeAlphaFlagsKHR::OPAQUE);
        assert_eq!(ci.clipped, vk::TRUE);
        assert_eq!(ci.queue_family_index_count, 0);
        assert_eq!(ci.old_swapchain, vk::SwapchainKHR::null());
    }
}
