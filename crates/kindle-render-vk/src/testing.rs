// SPDX-License-Identifier: CEPL-1.0
use std::cell::Cell;
use std::ffi::CString;

use ash::vk::{self, Handle};

use crate::probe::DeviceProbe;

pub(crate) fn family(flags: vk::QueueFlags) -> vk::QueueFamilyProperties {
    vk::QueueFamilyProperties {
        queue_flags: flags,
        queue_count: 1,
        ..Default::default()
    }
}

#[derive(Clone, Default)]
pub(crate) struct FakeDevice {
    pub name: &'static str,
    pub families: Vec<vk::QueueFamilyProperties>,
    pub presentable: Vec<bool>,
    pub extensions: Vec<CString>,
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl FakeDevice {
    /// A device that passes every suitability check with one shared family.
    pub fn suitable(name: &'static str) -> Self {
        Self {
            name,
            families: vec![family(vk::QueueFlags::GRAPHICS)],
            presentable: vec![true],
            extensions: vec![ash::khr::swapchain::NAME.to_owned()],
            formats: vec![vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_SRGB,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            }],
            present_modes: vec![vk::PresentModeKHR::FIFO],
            ..Self::default()
        }
    }
}

/// Physical devices are numbered from 1 so no fake handle is null.
pub(crate) struct FakeProbe {
    devices: Vec<FakeDevice>,
    pub presentation_queries: Cell<usize>,
    pub support_queries: Cell<usize>,
}

impl FakeProbe {
    pub fn new(devices: Vec<FakeDevice>) -> Self {
        Self {
            devices,
            presentation_queries: Cell::new(0),
            support_queries: Cell::new(0),
        }
    }

    pub fn handle(&self, index: usize) -> vk::PhysicalDevice {
        vk::PhysicalDevice::from_raw(index as u64 + 1)
    }

    pub fn handles(&self) -> Vec<vk::PhysicalDevice> {
        (0..self.devices.len()).map(|i| self.handle(i)).collect()
    }

    fn get(&self, device: vk::PhysicalDevice) -> &FakeDevice {
        &self.devices[device.as_raw() as usize - 1]
    }
}

impl DeviceProbe for FakeProbe {
    fn device_name(&self, device: vk::PhysicalDevice) -> String {
        self.get(device).name.to_owned()
    }

    fn queue_families(&self, device: vk::PhysicalDevice) -> Vec<vk::QueueFamilyProperties> {
        self.get(device).families.clone()
    }

    fn presentation_support(&self, device: vk::PhysicalDevice, family: u32) -> bool {
        self.presentation_queries
            .set(self.presentation_queries.get() + 1);
        self.get(device)
            .presentable
            .get(family as usize)
            .copied()
            .unwrap_or(false)
    }

    fn device_extensions(&self, device: vk::PhysicalDevice) -> Vec<CString> {
        self.get(device).extensions.clone()
    }

    fn surface_capabilities(&self, device: vk::PhysicalDevice) -> vk::SurfaceCapabilitiesKHR {
        self.support_queries.set(self.support_queries.get() + 1);
        self.get(device).capabilities
    }

    fn surface_formats(&self, device: vk::PhysicalDevice) -> Vec<vk::SurfaceFormatKHR> {
        self.get(device).formats.clone()
    }

    fn present_modes(&self, device: vk::PhysicalDevice) -> Vec<vk::PresentModeKHR> {
        self.get(device).present_modes.clone()
    }
}
