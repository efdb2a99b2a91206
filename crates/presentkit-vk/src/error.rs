// SPDX-License-Identifier: CEPL-1.0
//! Error taxonomy for device bring-up and chain negotiation.

use std::fmt;

use ash::prelude::VkResult;
use ash::vk;
use thiserror::Error;

/// Which kind of host resource was missing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    InstanceExtension,
    InstanceLayer,
    PhysicalDevice,
    DeviceExtension,
    PresentSupport,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResourceKind::InstanceExtension => "instance extension",
            ResourceKind::InstanceLayer => "instance layer",
            ResourceKind::PhysicalDevice => "physical device",
            ResourceKind::DeviceExtension => "device extension",
            ResourceKind::PresentSupport => "present support",
        })
    }
}

/// Surface queries issued by the probe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceQuery {
    Capabilities,
    PresentModes,
    Formats,
    QueueSupport,
}

impl fmt::Display for SurfaceQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SurfaceQuery::Capabilities => "vkGetPhysicalDeviceSurfaceCapabilitiesKHR",
            SurfaceQuery::PresentModes => "vkGetPhysicalDeviceSurfacePresentModesKHR",
            SurfaceQuery::Formats => "vkGetPhysicalDeviceSurfaceFormatsKHR",
            SurfaceQuery::QueueSupport => "vkGetPhysicalDeviceSurfaceSupportKHR",
        })
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to load Vulkan: {0}")]
    Loading(#[from] ash::LoadingError),

    #[error("{kind} unavailable: {name}")]
    ResourceUnavailable { kind: ResourceKind, name: String },

    #[error("no queue family supports {required:?}")]
    NoMatchingQueueFamily { required: vk::QueueFlags },

    #[error("{query} failed: {code}")]
    SurfaceQueryFailed { query: SurfaceQuery, code: vk::Result },

    #[error("surface reported no formats")]
    NoSurfaceFormats,

    /// The raw `VkResult` is kept as-is; drivers and layers return codes
    /// that no registry version documents.
    #[error("swapchain creation rejected with status {code} ({})", status_name(.code))]
    ChainCreationRejected { code: i32 },

    #[error("{stage} failed: {result}")]
    Vulkan {
        stage: &'static str,
        result: vk::Result,
    },

    #[error("surface extent is {width}x{height}; cannot build a chain with no area")]
    ZeroExtent { width: u32, height: u32 },

    #[error("swapchain config out of bounds: {0}")]
    ConfigOutOfBounds(String),

    #[error("name contains an interior NUL byte: {0:?}")]
    InvalidName(String),

    #[error("window handle unavailable: {0}")]
    WindowHandle(#[from] raw_window_handle::HandleError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Decoded name of a raw status, or a marker when ash does not know it.
pub fn status_name(code: &i32) -> String {
    let name = format!("{:?}", vk::Result::from_raw(*code));
    if name.parse::<i32>().is_ok() {
        "undocumented status".to_owned()
    } else {
        name
    }
}

/// Attach the name of the failing call to a raw `VkResult`.
pub(crate) trait VkResultExt<T> {
    fn stage(self, stage: &'static str) -> Result<T>;
}

impl<T> VkResultExt<T> for VkResult<T> {
    fn stage(self, stage: &'static str) -> Result<T> {
        self.map_err(|result| Error::Vulkan { stage, result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_handle_error_converts() {
        let err: Error = raw_window_handle::HandleError::Unavailable.into();
        assert!(matches!(err, Error::WindowHandle(_)));
        let source = std::error::Error::source(&err);
        assert!(source.is_some());
    }

    #[test]
    fn rejected_chain_keeps_raw_code() {
        let err = Error::ChainCreationRejected { code: -1_000_013_000 };
        let msg = err.to_string();
        assert!(msg.contains("-1000013000"), "{msg}");
        assert!(msg.contains("undocumented"), "{msg}");
        assert!(matches!(err, Error::ChainCreationRejected { code: -1_000_013_000 }));
    }

    #[test]
    fn known_status_is_named() {
        let code = vk::Result::ERROR_SURFACE_LOST_KHR.as_raw();
        assert_eq!(status_name(&code), "ERROR_SURFACE_LOST_KHR");
    }

    #[test]
    fn stage_names_the_call() {
        let r: VkResult<()> = Err(vk::Result::ERROR_INITIALIZATION_FAILED);
        let err = r.stage("vkCreateInstance").unwrap_err();
        assert!(err.to_string().starts_with("vkCreateInstance failed"));
    }

    #[test]
    fn resource_display_names_kind_and_item() {
        let err = Error::ResourceUnavailable {
            kind: ResourceKind::DeviceExtension,
            name: "VK_KHR_swapchain".into(),
        };
        assert_eq!(
            err.to_string(),
            "device extension unavailable: VK_KHR_swapchain"
        );
    }
}
