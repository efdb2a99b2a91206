// SPDX-License-Identifier: CEPL-1.0
//! Binding between the runtime and a native window.

use std::ffi::{CStr, CString};
use std::sync::Arc;

use ash::khr::surface;
use ash::vk;
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};
use tracing::debug;

use crate::error::{Result, VkResultExt};
use crate::runtime::GraphicsRuntime;

pub struct Surface {
    runtime: Arc<GraphicsRuntime>,
    loader: surface::Instance,
    handle: vk::SurfaceKHR,
}

impl Surface {
    /// Instance extensions the platform needs to create a surface on `display`.
    pub fn required_extensions(display: RawDisplayHandle) -> Result<Vec<CString>> {
        let ptrs = ash_window::enumerate_required_extensions(display)
            .stage("enumerate_required_extensions")?;
        Ok(ptrs
            .iter()
            .map(|&p| unsafe { CStr::from_ptr(p) }.to_owned())
            .collect())
    }

    /// # Safety
    ///
    /// `display` and `window` must stay valid until the returned surface and
    /// every chain built on it have been dropped. The runtime must have been
    /// created with [`Surface::required_extensions`] enabled.
    pub unsafe fn new(
        runtime: Arc<GraphicsRuntime>,
        display: RawDisplayHandle,
        window: RawWindowHandle,
    ) -> Result<Arc<Self>> {
        let handle = unsafe {
            ash_window::create_surface(runtime.entry(), runtime.instance(), display, window, None)
        }
        .stage("ash_window::create_surface")?;
        let loader = surface::Instance::new(runtime.entry(), runtime.instance());
        debug!("surface created");
        Ok(Arc::new(Self {
            runtime,
            loader,
            handle,
        }))
    }

    pub fn handle(&self) -> vk::SurfaceKHR {
        self.handle
    }

    pub fn loader(&self) -> &surface::Instance {
        &self.loader
    }

    pub fn runtime(&self) -> &Arc<GraphicsRuntime> {
        &self.runtime
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        unsafe { self.loader.destroy_surface(self.handle, None) };
        debug!("surface destroyed");
    }
}
