// SPDX-License-Identifier: CEPL-1.0
//! Turns a probed [`SurfaceSupport`] into a concrete [`SwapchainConfig`].
//!
//! Everything here is pure: the same snapshot always yields the same config,
//! and no input reachable through the probe makes it fail.

use ash::vk;

use crate::error::{Error, Result};
use crate::probe::SurfaceSupport;

/// Substituted when the surface reports a lone `UNDEFINED` format.
pub const DEFAULT_FORMAT: vk::Format = vk::Format::R8G8B8_UNORM;

/// `current_extent` value meaning the swapchain decides the size.
pub const EXTENT_FROM_SWAPCHAIN: u32 = u32::MAX;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwapchainConfig {
    pub image_count: u32,
    pub format: vk::Format,
    pub color_space: vk::ColorSpaceKHR,
    pub extent: vk::Extent2D,
    pub transform: vk::SurfaceTransformFlagsKHR,
    pub present_mode: vk::PresentModeKHR,
}

/// Derive the chain configuration. `fallback_extent` (normally the window
/// size) is only used when the surface leaves the extent to the swapchain.
pub fn decide(support: &SurfaceSupport, fallback_extent: vk::Extent2D) -> SwapchainConfig {
    let caps = &support.capabilities;
    let surf_format = choose_surface_format(&support.formats);
    SwapchainConfig {
        image_count: choose_image_count(caps),
        format: surf_format.format,
        color_space: surf_format.color_space,
        extent: choose_extent(caps, fallback_extent),
        transform: choose_transform(caps),
        present_mode: choose_present_mode(&support.present_modes),
    }
}

/// Mailbox, then immediate, then FIFO. A mode found later in `modes` never
/// displaces a more preferred one.
pub fn choose_present_mode(modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    [vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::IMMEDIATE]
        .into_iter()
        .find(|m| modes.contains(m))
        .unwrap_or(vk::PresentModeKHR::FIFO)
}

/// One image beyond the minimum, clamped to the maximum when there is one.
pub fn choose_image_count(caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let want = caps.min_image_count.saturating_add(1);
    if caps.max_image_count > 0 {
        want.min(caps.max_image_count)
    } else {
        want
    }
}

pub fn choose_transform(caps: &vk::SurfaceCapabilitiesKHR) -> vk::SurfaceTransformFlagsKHR {
    if caps
        .supported_transforms
        .contains(vk::SurfaceTransformFlagsKHR::IDENTITY)
    {
        vk::SurfaceTransformFlagsKHR::IDENTITY
    } else {
        caps.current_transform
    }
}

pub fn choose_extent(caps: &vk::SurfaceCapabilitiesKHR, fallback: vk::Extent2D) -> vk::Extent2D {
    if caps.current_extent.width != EXTENT_FROM_SWAPCHAIN {
        caps.current_extent
    } else {
        let (min, max) = (caps.min_image_extent, caps.max_image_extent);
        vk::Extent2D {
            width: fallback.width.clamp(min.width, max.width.max(min.width)),
            height: fallback.height.clamp(min.height, max.height.max(min.height)),
        }
    }
}

/// First reported entry, except that a single `UNDEFINED` entry ("anything
/// goes") becomes [`DEFAULT_FORMAT`] in the reported color space.
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
    match formats {
        [only] if only.format == vk::Format::UNDEFINED => vk::SurfaceFormatKHR {
            format: DEFAULT_FORMAT,
            color_space: only.color_space,
        },
        [first, ..] => *first,
        [] => vk::SurfaceFormatKHR {
            format: DEFAULT_FORMAT,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        },
    }
}

fn is_any_format(formats: &[vk::SurfaceFormatKHR]) -> bool {
    matches!(formats, [only] if only.format == vk::Format::UNDEFINED)
}

impl SwapchainConfig {
    /// Check that every field lies within what `support` reported.
    pub fn check_against(&self, support: &SurfaceSupport) -> Result<()> {
        let caps = &support.capabilities;
        let out = |why: String| -> Result<()> { Err(Error::ConfigOutOfBounds(why)) };

        if self.image_count < caps.min_image_count {
            return out(format!(
                "image count {} below minimum {}",
                self.image_count, caps.min_image_count
            ));
        }
        if caps.max_image_count > 0 && self.image_count > caps.max_image_count {
            return out(format!(
                "image count {} above maximum {}",
                self.image_count, caps.max_image_count
            ));
        }
        if !caps.supported_transforms.contains(self.transform)
            && self.transform != caps.current_transform
        {
            return out(format!("transform {:?} not supported", self.transform));
        }
        if self.present_mode != vk::PresentModeKHR::FIFO
            && !support.present_modes.contains(&self.present_mode)
        {
            return out(format!(
                "present mode {} not reported",
                present_mode_name(self.present_mode)
            ));
        }
        let format_ok = is_any_format(&support.formats)
            || support
                .formats
                .iter()
                .any(|f| f.format == self.format && f.color_space == self.color_space);
        if !format_ok {
            return out(format!(
                "format {}/{} not reported",
                format_name(self.format),
                color_space_name(self.color_space)
            ));
        }
        let extent_ok = if caps.current_extent.width != EXTENT_FROM_SWAPCHAIN {
            self.extent == caps.current_extent
        } else {
            (caps.min_image_extent.width..=caps.max_image_extent.width).contains(&self.extent.width)
                && (caps.min_image_extent.height..=caps.max_image_extent.height)
                    .contains(&self.extent.height)
        };
        if !extent_ok {
            return out(format!(
                "extent {}x{} outside surface limits",
                self.extent.width, self.extent.height
            ));
        }
        Ok(())
    }
}

/// Short names used in log lines; anything unlisted reads as `OTHER`.
pub fn format_name(f: vk::Format) -> &'static str {
    match f {
        vk::Format::UNDEFINED => "UNDEFINED",
        vk::Format::B8G8R8A8_UNORM => "B8G8R8A8_UNORM",
        vk::Format::B8G8R8A8_SRGB => "B8G8R8A8_SRGB",
        vk::Format::R8G8B8A8_SRGB => "R8G8B8A8_SRGB",
        vk::Format::R8G8B8A8_UNORM => "R8G8B8A8_UNORM",
        vk::Format::R8G8B8_UNORM => "R8G8B8_UNORM",
        vk::Format::A2B10G10R10_UNORM_PACK32 => "A2B10G10R10_UNORM",
        vk::Format::R16G16B16A16_SFLOAT => "R16G16B16A16_SFLOAT",
        _ => "OTHER",
    }
}

pub fn color_space_name(cs: vk::ColorSpaceKHR) -> &'static str {
    match cs {
        vk::ColorSpaceKHR::SRGB_NONLINEAR => "SRGB_NONLINEAR",
        vk::ColorSpaceKHR::DISPLAY_P3_NONLINEAR_EXT => "DISPLAY_P3_NONLINEAR",
        vk::ColorSpaceKHR::HDR10_ST2084_EXT => "HDR10_ST2084",
        vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT => "EXTENDED_SRGB_LINEAR",
        _ => "OTHER",
    }
}

pub fn present_mode_name(m: vk::PresentModeKHR) -> &'static str {
    match m {
        vk::PresentModeKHR::FIFO => "FIFO",
        vk::PresentModeKHR::MAILBOX => "MAILBOX",
        vk::PresentModeKHR::IMMEDIATE => "IMMEDIATE",
        vk::PresentModeKHR::FIFO_RELAXED => "FIFO_RELAXED",
        _ => "OTHER",
    }
}
