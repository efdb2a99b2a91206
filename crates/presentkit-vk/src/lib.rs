// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]
//! Vulkan device bring-up and swapchain negotiation.
//!
//! Stages run strictly in order: instance, physical device, logical device,
//! surface probe, policy, chain. Teardown runs the other way round.

pub mod device;
pub mod error;
pub mod policy;
pub mod probe;
pub mod runtime;
pub mod surface;
pub mod swapchain;

use std::sync::Arc;

use ash::vk;
use presentkit_render::{ChainRequest, ChainSummary, Presenter, RenderSize};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawDisplayHandle, RawWindowHandle};
use tracing::info;

pub use device::{DeviceCandidate, DeviceContext, DeviceSelector, FirstEnumerated, PreferDiscrete};
pub use error::{Error, ResourceKind, Result, SurfaceQuery};
pub use policy::{decide, SwapchainConfig};
pub use probe::{SurfaceProbe, SurfaceSupport};
pub use runtime::GraphicsRuntime;
pub use surface::Surface;
pub use swapchain::{Swapchain, SwapchainBuilder};

use crate::policy::{color_space_name, format_name, present_mode_name};

/// Everything from instance to chain for one window.
///
/// The window behind the handles passed to [`Presenter::new`] must outlive
/// this value. Field order is drop order: chain, surface, device, instance.
pub struct VkPresenter {
    swapchain: Swapchain,
    surface: Arc<Surface>,
    device: Arc<DeviceContext>,
    runtime: Arc<GraphicsRuntime>,
}

impl VkPresenter {
    pub fn swapchain(&self) -> &Swapchain {
        &self.swapchain
    }

    pub fn config(&self) -> &SwapchainConfig {
        self.swapchain.config()
    }

    pub fn queue(&self) -> vk::Queue {
        self.device.queue()
    }

    pub fn device(&self) -> &Arc<DeviceContext> {
        &self.device
    }

    pub fn surface(&self) -> &Arc<Surface> {
        &self.surface
    }

    pub fn runtime(&self) -> &Arc<GraphicsRuntime> {
        &self.runtime
    }
}

/// Run the whole handshake against raw window handles.
///
/// # Safety
///
/// `display` and `window` must remain valid for the lifetime of the returned
/// presenter.
pub unsafe fn negotiate(
    display: RawDisplayHandle,
    window: RawWindowHandle,
    size: RenderSize,
    request: &ChainRequest,
) -> Result<VkPresenter> {
    let mut instance_exts = Surface::required_extensions(display)?;
    for ext in runtime::c_names(&request.instance_extensions)? {
        if !instance_exts.contains(&ext) {
            instance_exts.push(ext);
        }
    }
    let layers = runtime::c_names(&request.instance_layers)?;
    let app_name = if request.app_name.is_empty() {
        "presentkit"
    } else {
        request.app_name.as_str()
    };
    let runtime = GraphicsRuntime::new(app_name, &instance_exts, &layers)?;

    let mut device_exts = runtime::c_names(&request.device_extensions)?;
    if !device_exts.iter().any(|e| e.as_c_str() == ash::khr::swapchain::NAME) {
        device_exts.push(ash::khr::swapchain::NAME.to_owned());
    }
    let selector = device::selector_for(request.strategy);
    let device = DeviceContext::new(Arc::clone(&runtime), selector.as_ref(), &device_exts)?;

    let surface = unsafe { Surface::new(Arc::clone(&runtime), display, window)? };

    let probe = SurfaceProbe::new(&surface, device.physical().handle);
    if !probe.queue_supports_present(device.queue_family())? {
        return Err(Error::ResourceUnavailable {
            kind: ResourceKind::PresentSupport,
            name: format!("queue family {}", device.queue_family()),
        });
    }
    let support = probe.snapshot()?;

    let fallback = vk::Extent2D {
        width: size.width,
        height: size.height,
    };
    let config = decide(&support, fallback);
    config.check_against(&support)?;
    info!(
        image_count = config.image_count,
        format = format_name(config.format),
        color_space = color_space_name(config.color_space),
        present_mode = present_mode_name(config.present_mode),
        "swapchain config decided"
    );

    let swapchain = SwapchainBuilder::new(&device, &surface, config).build()?;

    Ok(VkPresenter {
        swapchain,
        surface,
        device,
        runtime,
    })
}

impl Presenter for VkPresenter {
    fn new(
        window: &dyn HasWindowHandle,
        display: &dyn HasDisplayHandle,
        size: RenderSize,
        request: &ChainRequest,
    ) -> anyhow::Result<Self> {
        let dh = display.display_handle().map_err(Error::from)?.as_raw();
        let wh = window.window_handle().map_err(Error::from)?.as_raw();
        let presenter = unsafe { negotiate(dh, wh, size, request)? };
        Ok(presenter)
    }

    fn summary(&self) -> ChainSummary {
        let cfg = self.config();
        ChainSummary {
            device_name: self.device.physical().name.clone(),
            queue_family: self.device.queue_family(),
            extent: RenderSize {
                width: cfg.extent.width,
                height: cfg.extent.height,
            },
            requested_images: cfg.image_count,
            realized_images: self.swapchain.images().len() as u32,
            format: format_name(cfg.format).to_owned(),
            color_space: color_space_name(cfg.color_space).to_owned(),
            present_mode: present_mode_name(cfg.present_mode).to_owned(),
        }
    }
}
