// SPDX-License-Identifier: CEPL-1.0
//! Read-only queries against one (physical device, surface) pair.

use ash::vk;
use tracing::{debug, warn};

use crate::error::{Error, Result, SurfaceQuery};
use crate::surface::Surface;

/// Everything the policy needs, taken from a single probe pass.
#[derive(Clone, Debug, Default)]
pub struct SurfaceSupport {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

pub struct SurfaceProbe<'a> {
    surface: &'a Surface,
    physical: vk::PhysicalDevice,
}

impl<'a> SurfaceProbe<'a> {
    pub fn new(surface: &'a Surface, physical: vk::PhysicalDevice) -> Self {
        Self { surface, physical }
    }

    pub fn capabilities(&self) -> Result<vk::SurfaceCapabilitiesKHR> {
        unsafe {
            self.surface
                .loader()
                .get_physical_device_surface_capabilities(self.physical, self.surface.handle())
        }
        .map_err(|code| failed(SurfaceQuery::Capabilities, code))
    }

    /// Non-empty by platform contract; FIFO is always supported.
    pub fn present_modes(&self) -> Result<Vec<vk::PresentModeKHR>> {
        let modes = unsafe {
            self.surface
                .loader()
                .get_physical_device_surface_present_modes(self.physical, self.surface.handle())
        }
        .map_err(|code| failed(SurfaceQuery::PresentModes, code))?;
        if modes.is_empty() {
            warn!("surface reported no present modes; FIFO assumed");
        }
        Ok(modes)
    }

    pub fn formats(&self) -> Result<Vec<vk::SurfaceFormatKHR>> {
        let formats = unsafe {
            self.surface
                .loader()
                .get_physical_device_surface_formats(self.physical, self.surface.handle())
        }
        .map_err(|code| failed(SurfaceQuery::Formats, code))?;
        require_formats(formats)
    }

    /// Whether `queue_family` can present to this surface. Must hold before
    /// any present is attempted on a queue from that family.
    pub fn queue_supports_present(&self, queue_family: u32) -> Result<bool> {
        unsafe {
            self.surface.loader().get_physical_device_surface_support(
                self.physical,
                queue_family,
                self.surface.handle(),
            )
        }
        .map_err(|code| failed(SurfaceQuery::QueueSupport, code))
    }

    pub fn snapshot(&self) -> Result<SurfaceSupport> {
        let capabilities = self.capabilities()?;
        let present_modes = self.present_modes()?;
        let formats = self.formats()?;
        debug!(
            min_images = capabilities.min_image_count,
            max_images = capabilities.max_image_count,
            formats = formats.len(),
            present_modes = present_modes.len(),
            "surface probed"
        );
        Ok(SurfaceSupport {
            capabilities,
            formats,
            present_modes,
        })
    }
}

/// At least one format must be reported; an empty list is not "anything goes".
pub fn require_formats(formats: Vec<vk::SurfaceFormatKHR>) -> Result<Vec<vk::SurfaceFormatKHR>> {
    if formats.is_empty() {
        return Err(Error::NoSurfaceFormats);
    }
    Ok(formats)
}

fn failed(query: SurfaceQuery, code: vk::Result) -> Error {
    Error::SurfaceQueryFailed { query, code }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_format_report_is_an_error() {
        assert!(matches!(require_formats(Vec::new()), Err(Error::NoSurfaceFormats)));
    }

    #[test]
    fn reported_formats_pass_through_in_order() {
        let reported = vec![
            vk::SurfaceFormatKHR {
                format: vk::Format::UNDEFINED,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
            vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_UNORM,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
        ];
        let out = require_formats(reported).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].format, vk::Format::UNDEFINED);
        assert_eq!(out[1].format, vk::Format::B8G8R8A8_UNORM);
    }

    #[test]
    fn query_failure_names_the_call() {
        let err = failed(SurfaceQuery::Formats, vk::Result::ERROR_SURFACE_LOST_KHR);
        let msg = err.to_string();
        assert!(msg.contains("vkGetPhysicalDeviceSurfaceFormatsKHR"), "{msg}");
        assert!(matches!(
            err,
            Error::SurfaceQueryFailed {
                query: SurfaceQuery::Formats,
                code: vk::Result::ERROR_SURFACE_LOST_KHR
            }
        ));
    }
}
