// SPDX-License-Identifier: CEPL-1.0
use anyhow::Result;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderSize {
    pub width: u32,
    pub height: u32,
}

/// How a backend picks among the physical devices the host enumerates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeviceStrategy {
    /// Take whatever the host lists first. Enumeration order is host-defined.
    #[default]
    FirstEnumerated,
    /// First discrete GPU, else the first device.
    PreferDiscrete,
}

/// Names the configuration collaborator asks for. Treated as opaque strings;
/// any that the host cannot satisfy aborts initialization.
#[derive(Clone, Debug, Default)]
pub struct ChainRequest {
    pub app_name: String,
    pub instance_extensions: Vec<String>,
    pub instance_layers: Vec<String>,
    pub device_extensions: Vec<String>,
    pub strategy: DeviceStrategy,
}

/// What a presentation loop needs to know about the chain that was built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainSummary {
    pub device_name: String,
    pub queue_family: u32,
    pub extent: RenderSize,
    pub requested_images: u32,
    pub realized_images: u32,
    pub format: String,
    pub color_space: String,
    pub present_mode: String,
}

pub trait Presenter {
    fn new(
        window: &dyn HasWindowHandle,
        display: &dyn HasDisplayHandle,
        size: RenderSize,
        request: &ChainRequest,
    ) -> Result<Self>
    where
        Self: Sized;

    fn summary(&self) -> ChainSummary;
}
