// SPDX-License-Identifier: CEPL-1.0
//! Physical device selection, queue family discovery and logical device creation.

use std::ffi::CString;
use std::sync::Arc;

use ash::vk;
use presentkit_render::DeviceStrategy;
use tracing::{debug, info};

use crate::error::{Error, ResourceKind, Result, VkResultExt};
use crate::runtime::{ensure_available, GraphicsRuntime};

/// One physical device as the host enumerated it.
#[derive(Clone, Debug)]
pub struct DeviceCandidate {
    pub handle: vk::PhysicalDevice,
    pub name: String,
    pub device_type: vk::PhysicalDeviceType,
    pub api_version: u32,
}

impl DeviceCandidate {
    fn from_properties(handle: vk::PhysicalDevice, props: &vk::PhysicalDeviceProperties) -> Self {
        let name = props
            .device_name_as_c_str()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "Unknown Device".to_owned());
        Self {
            handle,
            name,
            device_type: props.device_type,
            api_version: props.api_version,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self.device_type {
            vk::PhysicalDeviceType::DISCRETE_GPU => "discrete",
            vk::PhysicalDeviceType::INTEGRATED_GPU => "integrated",
            vk::PhysicalDeviceType::VIRTUAL_GPU => "virtual",
            vk::PhysicalDeviceType::CPU => "cpu",
            _ => "other",
        }
    }
}

/// Picks one device out of the enumerated list. Enumeration order is not
/// stable across hosts, so the choice is left to the caller.
pub trait DeviceSelector {
    fn select<'a>(&self, candidates: &'a [DeviceCandidate]) -> Option<&'a DeviceCandidate>;
}

pub struct FirstEnumerated;

impl DeviceSelector for FirstEnumerated {
    fn select<'a>(&self, candidates: &'a [DeviceCandidate]) -> Option<&'a DeviceCandidate> {
        candidates.first()
    }
}

pub struct PreferDiscrete;

impl DeviceSelector for PreferDiscrete {
    fn select<'a>(&self, candidates: &'a [DeviceCandidate]) -> Option<&'a DeviceCandidate> {
        candidates
            .iter()
            .find(|c| c.device_type == vk::PhysicalDeviceType::DISCRETE_GPU)
            .or_else(|| candidates.first())
    }
}

pub fn selector_for(strategy: DeviceStrategy) -> Box<dyn DeviceSelector> {
    match strategy {
        DeviceStrategy::FirstEnumerated => Box::new(FirstEnumerated),
        DeviceStrategy::PreferDiscrete => Box::new(PreferDiscrete),
    }
}

pub fn enumerate_candidates(runtime: &GraphicsRuntime) -> Result<Vec<DeviceCandidate>> {
    let instance = runtime.instance();
    let handles =
        unsafe { instance.enumerate_physical_devices() }.stage("vkEnumeratePhysicalDevices")?;
    Ok(handles
        .into_iter()
        .map(|h| {
            let props = unsafe { instance.get_physical_device_properties(h) };
            DeviceCandidate::from_properties(h, &props)
        })
        .collect())
}

pub fn select_physical_device(
    runtime: &GraphicsRuntime,
    selector: &dyn DeviceSelector,
) -> Result<DeviceCandidate> {
    let candidates = enumerate_candidates(runtime)?;
    for c in &candidates {
        debug!(name = %c.name, kind = c.type_name(), "physical device");
    }
    pick(&candidates, selector)
}

fn pick(candidates: &[DeviceCandidate], selector: &dyn DeviceSelector) -> Result<DeviceCandidate> {
    selector
        .select(candidates)
        .cloned()
        .ok_or_else(|| Error::ResourceUnavailable {
            kind: ResourceKind::PhysicalDevice,
            name: format!("none of {} enumerated devices", candidates.len()),
        })
}

/// First family, in reported order, whose flags contain all of `required`.
pub fn find_queue_family(
    families: &[vk::QueueFamilyProperties],
    required: vk::QueueFlags,
) -> Result<u32> {
    families
        .iter()
        .position(|f| f.queue_flags.contains(required))
        .map(|i| i as u32)
        .ok_or(Error::NoMatchingQueueFamily { required })
}

pub struct DeviceContext {
    runtime: Arc<GraphicsRuntime>,
    physical: DeviceCandidate,
    queue_family: u32,
    device: ash::Device,
    queue: vk::Queue,
}

impl DeviceContext {
    /// Select a device, find a graphics family on it, create the logical device.
    pub fn new(
        runtime: Arc<GraphicsRuntime>,
        selector: &dyn DeviceSelector,
        extensions: &[CString],
    ) -> Result<Arc<Self>> {
        let physical = select_physical_device(&runtime, selector)?;
        let families = unsafe {
            runtime
                .instance()
                .get_physical_device_queue_family_properties(physical.handle)
        };
        let queue_family = find_queue_family(&families, vk::QueueFlags::GRAPHICS)?;
        create_logical_device(runtime, physical, queue_family, extensions)
    }

    pub fn runtime(&self) -> &Arc<GraphicsRuntime> {
        &self.runtime
    }

    pub fn physical(&self) -> &DeviceCandidate {
        &self.physical
    }

    pub fn queue_family(&self) -> u32 {
        self.queue_family
    }

    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    pub fn queue(&self) -> vk::Queue {
        self.queue
    }
}

impl Drop for DeviceContext {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();
            self.device.destroy_device(None);
        }
        debug!("logical device destroyed");
    }
}

/// Priority of the single graphics queue.
pub const QUEUE_PRIORITY: f32 = 0.0;

/// One queue at [`QUEUE_PRIORITY`] from `queue_family`. Requested extensions are
/// checked against the device's list before the driver is asked.
pub fn create_logical_device(
    runtime: Arc<GraphicsRuntime>,
    physical: DeviceCandidate,
    queue_family: u32,
    extensions: &[CString],
) -> Result<Arc<DeviceContext>> {
    let instance = runtime.instance();

    let ext_props = unsafe { instance.enumerate_device_extension_properties(physical.handle) }
        .stage("vkEnumerateDeviceExtensionProperties")?;
    ensure_available(
        ResourceKind::DeviceExtension,
        ext_props.iter().filter_map(|p| p.extension_name_as_c_str().ok()),
        extensions,
    )?;

    let priorities = [QUEUE_PRIORITY];
    let qinfo = vk::DeviceQueueCreateInfo::default()
        .queue_family_index(queue_family)
        .queue_priorities(&priorities);

    let ext_ptrs: Vec<_> = extensions.iter().map(|e| e.as_ptr()).collect();
    let dinfo = vk::DeviceCreateInfo::default()
        .queue_create_infos(std::slice::from_ref(&qinfo))
        .enabled_extension_names(&ext_ptrs);

    let device = unsafe { instance.create_device(physical.handle, &dinfo, None) }
        .stage("vkCreateDevice")?;
    let queue = unsafe { device.get_device_queue(queue_family, 0) };

    info!(
        device = %physical.name,
        kind = physical.type_name(),
        queue_family,
        "logical device created"
    );

    Ok(Arc::new(DeviceContext {
        runtime,
        physical,
        queue_family,
        device,
        queue,
    }))
}
