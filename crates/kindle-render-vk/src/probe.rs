// SPDX-License-Identifier: CEPL-1.0
//! Read-only queries against a physical device and the target surface.
//!
//! Nothing here decides anything; [`crate::select`] and [`crate::negotiate`]
//! consume the results.

use std::collections::BTreeSet;
use std::ffi::{CStr, CString};

use ash::khr::surface;
use ash::{vk, Instance};
use tracing::warn;

/// The driver queries the prober needs. [`AshProbe`] answers them from a live
/// instance and surface.
pub trait DeviceProbe {
    fn device_name(&self, device: vk::PhysicalDevice) -> String;
    fn queue_families(&self, device: vk::PhysicalDevice) -> Vec<vk::QueueFamilyProperties>;
    fn presentation_support(&self, device: vk::PhysicalDevice, family: u32) -> bool;
    fn device_extensions(&self, device: vk::PhysicalDevice) -> Vec<CString>;
    fn surface_capabilities(&self, device: vk::PhysicalDevice) -> vk::SurfaceCapabilitiesKHR;
    fn surface_formats(&self, device: vk::PhysicalDevice) -> Vec<vk::SurfaceFormatKHR>;
    fn present_modes(&self, device: vk::PhysicalDevice) -> Vec<vk::PresentModeKHR>;
}

/// Graphics and presentation family slots, each possibly unset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics: Option<u32>,
    pub present: Option<u32>,
}

/// Both roles resolved. Fixed for the lifetime of any device built from it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueFamilies {
    pub graphics: u32,
    pub present: u32,
}

impl QueueFamilyIndices {
    pub fn is_complete(&self) -> bool {
        self.complete().is_some()
    }

    pub fn complete(&self) -> Option<QueueFamilies> {
        Some(QueueFamilies {
            graphics: self.graphics?,
            present: self.present?,
        })
    }
}

impl QueueFamilies {
    pub fn is_shared(&self) -> bool {
        self.graphics == self.present
    }

    /// Distinct family indices, ascending.
    pub fn unique(&self) -> Vec<u32> {
        BTreeSet::from([self.graphics, self.present])
            .into_iter()
            .collect()
    }
}

#[derive(Clone, Debug)]
pub struct SwapchainSupport {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SwapchainSupport {
    pub fn is_adequate(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }
}

/// Lowest-indexed family for each role, scanning in driver order and stopping
/// once both are found.
pub fn query_queue_families<P: DeviceProbe + ?Sized>(
    probe: &P,
    device: vk::PhysicalDevice,
) -> QueueFamilyIndices {
    let mut indices = QueueFamilyIndices::default();
    for (i, family) in probe.queue_families(device).iter().enumerate() {
        let i = i as u32;
        if indices.graphics.is_none() && family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
            indices.graphics = Some(i);
        }
        if indices.present.is_none() && probe.presentation_support(device, i) {
            indices.present = Some(i);
        }
        if indices.is_complete() {
            break;
        }
    }
    indices
}

pub fn query_swapchain_support<P: DeviceProbe + ?Sized>(
    probe: &P,
    device: vk::PhysicalDevice,
) -> SwapchainSupport {
    SwapchainSupport {
        capabilities: probe.surface_capabilities(device),
        formats: probe.surface_formats(device),
        present_modes: probe.present_modes(device),
    }
}

/// Required names the device does not report, in the order they were given.
pub fn missing_extensions<P: DeviceProbe + ?Sized>(
    probe: &P,
    device: vk::PhysicalDevice,
    required: &[&CStr],
) -> Vec<CString> {
    let available: BTreeSet<CString> = probe.device_extensions(device).into_iter().collect();
    required
        .iter()
        .filter(|name| !available.contains(**name))
        .map(|name| (*name).to_owned())
        .collect()
}

pub fn check_extension_support<P: DeviceProbe + ?Sized>(
    probe: &P,
    device: vk::PhysicalDevice,
    required: &[&CStr],
) -> bool {
    missing_extensions(probe, device, required).is_empty()
}

pub struct AshProbe<'a> {
    instance: &'a Instance,
    surface_loader: &'a surface::Instance,
    surface: vk::SurfaceKHR,
}

impl<'a> AshProbe<'a> {
    /// # Safety
    /// `surface` must be a live surface created from `instance`, and
    /// `surface_loader` must be loaded from the same instance.
    pub unsafe fn new(
        instance: &'a Instance,
        surface_loader: &'a surface::Instance,
        surface: vk::SurfaceKHR,
    ) -> Self {
        Self {
            instance,
            surface_loader,
            surface,
        }
    }
}

fn or_empty<T: Default>(what: &str, r: ash::prelude::VkResult<T>) -> T {
    r.unwrap_or_else(|e| {
        warn!("{what} failed: {e}");
        T::default()
    })
}

// SAFETY (all methods): `new` guarantees the instance, loader and surface are
// live and related; physical devices come from that instance's enumeration.
impl DeviceProbe for AshProbe<'_> {
    fn device_name(&self, device: vk::PhysicalDevice) -> String {
        let props = unsafe { self.instance.get_physical_device_properties(device) };
        props
            .device_name_as_c_str()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|_| String::from("<unnamed>"))
    }

    fn queue_families(&self, device: vk::PhysicalDevice) -> Vec<vk::QueueFamilyProperties> {
        unsafe {
            self.instance
                .get_physical_device_queue_family_properties(device)
        }
    }

    fn presentation_support(&self, device: vk::PhysicalDevice, family: u32) -> bool {
        let r = unsafe {
            self.surface_loader
                .get_physical_device_surface_support(device, family, self.surface)
        };
        or_empty("vkGetPhysicalDeviceSurfaceSupportKHR", r)
    }

    fn device_extensions(&self, device: vk::PhysicalDevice) -> Vec<CString> {
        let r = unsafe { self.instance.enumerate_device_extension_properties(device) };
        or_empty("vkEnumerateDeviceExtensionProperties", r)
            .iter()
            .filter_map(|p| p.extension_name_as_c_str().ok().map(CStr::to_owned))
            .collect()
    }

    fn surface_capabilities(&self, device: vk::PhysicalDevice) -> vk::SurfaceCapabilitiesKHR {
        let r = unsafe {
            self.surface_loader
                .get_physical_device_surface_capabilities(device, self.surface)
        };
        or_empty("vkGetPhysicalDeviceSurfaceCapabilitiesKHR", r)
    }

    // ash skips the second call when the reported count is zero, so an empty
    // Vec here is the driver's answer, not a skipped query.
    fn surface_formats(&self, device: vk::PhysicalDevice) -> Vec<vk::SurfaceFormatKHR> {
        let r = unsafe {
            self.surface_loader
                .get_physical_device_surface_formats(device, self.surface)
        };
        or_empty("vkGetPhysicalDeviceSurfaceFormatsKHR", r)
    }

    fn present_modes(&self, device: vk::PhysicalDevice) -> Vec<vk::PresentModeKHR> {
        let r = unsafe {
            self.surface_loader
                .get_physical_device_surface_present_modes(device, self.surface)
        };
        or_empty("vkGetPhysicalDeviceSurfacePresentModesKHR", r)
    }
}
