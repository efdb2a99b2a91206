// SPDX-License-Identifier: CEPL-1.0
//! Bring-up checks that need a Vulkan driver but no window.
//!
//! Hosts without a loader or without any physical device skip these.

use std::ffi::CString;
use std::sync::Arc;

use presentkit_vk::device::{enumerate_candidates, selector_for};
use presentkit_vk::runtime::c_names;
use presentkit_vk::{DeviceContext, Error, FirstEnumerated, GraphicsRuntime, ResourceKind};

fn runtime_or_skip() -> Option<Arc<GraphicsRuntime>> {
    match GraphicsRuntime::new("presentkit-tests", &[], &[]) {
        Ok(rt) => match enumerate_candidates(&rt) {
            Ok(list) if !list.is_empty() => Some(rt),
            _ => {
                println!("Skipping test: no physical devices");
                None
            }
        },
        Err(e) => {
            println!("Skipping test: {e}");
            None
        }
    }
}

#[test]
fn missing_instance_layer_is_reported() {
    let layers = c_names(&["VK_LAYER_presentkit_does_not_exist"]).unwrap();
    match GraphicsRuntime::new("presentkit-tests", &[], &layers) {
        Err(e @ (Error::Loading(_) | Error::Vulkan { .. })) => println!("Skipping test: {e}"),
        Err(Error::ResourceUnavailable { kind, name }) => {
            assert_eq!(kind, ResourceKind::InstanceLayer);
            assert_eq!(name, "VK_LAYER_presentkit_does_not_exist");
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("instance created with a layer that does not exist"),
    }
}

#[test]
fn unsupported_device_extension_is_resource_unavailable() {
    let Some(runtime) = runtime_or_skip() else {
        return;
    };
    let exts = vec![CString::new("VK_PRESENTKIT_not_a_real_extension").unwrap()];
    match DeviceContext::new(runtime, &FirstEnumerated, &exts) {
        // Some devices expose no graphics family at all.
        Err(Error::NoMatchingQueueFamily { .. }) => println!("Skipping test: no graphics queue"),
        Err(Error::ResourceUnavailable { kind, name }) => {
            assert_eq!(kind, ResourceKind::DeviceExtension);
            assert_eq!(name, "VK_PRESENTKIT_not_a_real_extension");
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("device created with an extension that does not exist"),
    }
}

#[test]
fn device_without_extensions_has_a_queue() {
    let Some(runtime) = runtime_or_skip() else {
        return;
    };
    let selector = selector_for(Default::default());
    match DeviceContext::new(runtime, selector.as_ref(), &[]) {
        Ok(ctx) => {
            assert!(!ctx.physical().name.is_empty());
            let families = unsafe {
                ctx.runtime()
                    .instance()
                    .get_physical_device_queue_family_properties(ctx.physical().handle)
            };
            let family = &families[ctx.queue_family() as usize];
            assert!(family.queue_flags.contains(ash::vk::QueueFlags::GRAPHICS));
        }
        Err(Error::NoMatchingQueueFamily { .. }) => println!("Skipping test: no graphics queue"),
        Err(other) => panic!("unexpected error: {other}"),
    }
}
