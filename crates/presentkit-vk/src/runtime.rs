// SPDX-License-Identifier: CEPL-1.0
//! Process-wide Vulkan state: loader entry, instance, optional debug messenger.
//!
//! A [`GraphicsRuntime`] is created once and handed to dependents as an
//! `Arc`. Everything built from it holds a clone, so the instance is only
//! destroyed after the last surface and device are gone.

use std::ffi::{c_void, CStr, CString};
use std::sync::Arc;

use ash::ext::debug_utils;
use ash::{vk, Entry};
use tracing::{debug, error, info, trace, warn};

use crate::error::{Error, ResourceKind, Result, VkResultExt};

pub struct GraphicsRuntime {
    entry: Entry,
    instance: ash::Instance,
    debug: Option<(debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
}

impl GraphicsRuntime {
    /// Load Vulkan and create the instance.
    ///
    /// Every requested extension and layer is checked against what the host
    /// reports before `vkCreateInstance` is called; the first missing name is
    /// returned as [`Error::ResourceUnavailable`]. When `VK_EXT_debug_utils`
    /// is among the extensions, driver messages are routed into `tracing`.
    pub fn new(app_name: &str, extensions: &[CString], layers: &[CString]) -> Result<Arc<Self>> {
        let entry = unsafe { Entry::load()? };

        let ext_props = unsafe { entry.enumerate_instance_extension_properties(None) }
            .stage("vkEnumerateInstanceExtensionProperties")?;
        ensure_available(
            ResourceKind::InstanceExtension,
            ext_props.iter().filter_map(|p| p.extension_name_as_c_str().ok()),
            extensions,
        )?;

        let layer_props = unsafe { entry.enumerate_instance_layer_properties() }
            .stage("vkEnumerateInstanceLayerProperties")?;
        ensure_available(
            ResourceKind::InstanceLayer,
            layer_props.iter().filter_map(|p| p.layer_name_as_c_str().ok()),
            layers,
        )?;

        let app = to_c_name(app_name)?;
        let app_info = vk::ApplicationInfo::default()
            .application_name(&app)
            .engine_name(c"presentkit")
            .api_version(vk::API_VERSION_1_0);

        let ext_ptrs: Vec<_> = extensions.iter().map(|e| e.as_ptr()).collect();
        let layer_ptrs: Vec<_> = layers.iter().map(|l| l.as_ptr()).collect();
        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&ext_ptrs)
            .enabled_layer_names(&layer_ptrs);

        let instance = unsafe { entry.create_instance(&create_info, None) }.stage("vkCreateInstance")?;

        let messenger = if extensions.iter().any(|e| e.as_c_str() == debug_utils::NAME) {
            match create_debug_messenger(&entry, &instance) {
                Ok(pair) => Some(pair),
                Err(e) => {
                    unsafe { instance.destroy_instance(None) };
                    return Err(e);
                }
            }
        } else {
            None
        };

        info!(
            extensions = extensions.len(),
            layers = layers.len(),
            debug_messenger = messenger.is_some(),
            "Vulkan instance created"
        );

        Ok(Arc::new(Self {
            entry,
            instance,
            debug: messenger,
        }))
    }

    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    pub fn instance(&self) -> &ash::Instance {
        &self.instance
    }
}

impl Drop for GraphicsRuntime {
    fn drop(&mut self) {
        unsafe {
            if let Some((loader, messenger)) = self.debug.take() {
                loader.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
        debug!("Vulkan instance destroyed");
    }
}

/// Fail with the first `requested` name that is not in `available`.
pub(crate) fn ensure_available<'a>(
    kind: ResourceKind,
    available: impl IntoIterator<Item = &'a CStr>,
    requested: &[CString],
) -> Result<()> {
    let available: Vec<&CStr> = available.into_iter().collect();
    match requested.iter().find(|r| !available.contains(&r.as_c_str())) {
        Some(missing) => Err(Error::ResourceUnavailable {
            kind,
            name: missing.to_string_lossy().into_owned(),
        }),
        None => Ok(()),
    }
}

pub(crate) fn to_c_name(name: &str) -> Result<CString> {
    CString::new(name).map_err(|_| Error::InvalidName(name.to_owned()))
}

/// Convert configured names, dropping duplicates but keeping first-seen order.
pub fn c_names<S: AsRef<str>>(names: &[S]) -> Result<Vec<CString>> {
    let mut out: Vec<CString> = Vec::with_capacity(names.len());
    for name in names {
        let c = to_c_name(name.as_ref())?;
        if !out.contains(&c) {
            out.push(c);
        }
    }
    Ok(out)
}

fn create_debug_messenger(
    entry: &Entry,
    instance: &ash::Instance,
) -> Result<(debug_utils::Instance, vk::DebugUtilsMessengerEXT)> {
    let loader = debug_utils::Instance::new(entry, instance);
    let ci = vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(debug_callback));
    let messenger = unsafe { loader.create_debug_utils_messenger(&ci, None) }
        .stage("vkCreateDebugUtilsMessengerEXT")?;
    Ok((loader, messenger))
}

unsafe extern "system" fn debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    _types: vk::DebugUtilsMessageTypeFlagsEXT,
    data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user: *mut c_void,
) -> vk::Bool32 {
    if data.is_null() {
        return vk::FALSE;
    }
    let p_message = unsafe { (*data).p_message };
    if p_message.is_null() {
        return vk::FALSE;
    }
    let msg = unsafe { CStr::from_ptr(p_message) }.to_string_lossy();

    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        error!(target: "vulkan", "{msg}");
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        warn!(target: "vulkan", "{msg}");
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        debug!(target: "vulkan", "{msg}");
    } else {
        trace!(target: "vulkan", "{msg}");
    }
    vk::FALSE
}
