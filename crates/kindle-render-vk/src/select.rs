// SPDX-License-Identifier: CEPL-1.0
use std::ffi::CStr;

use ash::vk;
use tracing::{debug, info, warn};

use crate::error::NoSuitableDevice;
use crate::probe::{
    missing_extensions, query_queue_families, query_swapchain_support, DeviceProbe,
    QueueFamilies,
};

#[derive(Clone, Debug)]
pub struct SelectedDevice {
    pub physical: vk::PhysicalDevice,
    pub name: String,
    pub families: QueueFamilies,
}

/// Queue families complete, every required extension present, and (only then)
/// at least one surface format and one present mode.
pub fn is_suitable<P: DeviceProbe + ?Sized>(
    probe: &P,
    device: vk::PhysicalDevice,
    required: &[&CStr],
) -> bool {
    evaluate(probe, device, required).is_some()
}

fn evaluate<P: DeviceProbe + ?Sized>(
    probe: &P,
    device: vk::PhysicalDevice,
    required: &[&CStr],
) -> Option<QueueFamilies> {
    let missing = missing_extensions(probe, device, required);
    if !missing.is_empty() {
        debug!("{device:?}: missing extensions {missing:?}");
        return None;
    }
    // Swapchain queries are only meaningful once the swapchain extension is known present.
    let support = query_swapchain_support(probe, device);
    if !support.is_adequate() {
        debug!(
            "{device:?}: {} surface formats, {} present modes",
            support.formats.len(),
            support.present_modes.len()
        );
        return None;
    }
    let families = query_queue_families(probe, device).complete();
    if families.is_none() {
        debug!("{device:?}: no graphics or no present queue family");
    }
    families
}

/// First suitable device in enumeration order.
pub fn pick_physical_device<P: DeviceProbe + ?Sized>(
    probe: &P,
    candidates: &[vk::PhysicalDevice],
    required: &[&CStr],
) -> Result<SelectedDevice, NoSuitableDevice> {
    if candidates.is_empty() {
        return Err(NoSuitableDevice::NoneEnumerated);
    }

    for &physical in candidates {
        let name = probe.device_name(physical);
        match evaluate(probe, physical, required) {
            Some(families) => {
                info!(
                    "selected GPU {name:?} (graphics family {}, present family {})",
                    families.graphics, families.present
                );
                return Ok(SelectedDevice {
                    physical,
                    name,
                    families,
                });
            }
            None => warn!("GPU {name:?} is not suitable"),
        }
    }

    Err(NoSuitableDevice::NoneSuitable {
        examined: candidates.len(),
    })
}
