// SPDX-License-Identifier: CEPL-1.0
use ash::vk;
use kindle_render::RenderSize;

use crate::probe::{QueueFamilies, SwapchainSupport};

pub const PREFERRED_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
    format: vk::Format::B8G8R8A8_SRGB,
    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
};

/// `current_extent` value meaning "size taken from the swapchain".
pub const UNDEFINED_EXTENT: vk::Extent2D = vk::Extent2D {
    width: u32::MAX,
    height: u32::MAX,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sharing {
    Exclusive,
    Concurrent([u32; 2]),
}

impl Sharing {
    pub fn mode(&self) -> vk::SharingMode {
        match self {
            Sharing::Exclusive => vk::SharingMode::EXCLUSIVE,
            Sharing::Concurrent(_) => vk::SharingMode::CONCURRENT,
        }
    }

    /// Families sharing the images; empty when exclusive.
    pub fn family_indices(&self) -> &[u32] {
        match self {
            Sharing::Exclusive => &[],
            Sharing::Concurrent(families) => families,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwapchainConfig {
    pub format: vk::Format,
    pub color_space: vk::ColorSpaceKHR,
    pub present_mode: vk::PresentModeKHR,
    pub extent: vk::Extent2D,
    pub image_count: u32,
    pub sharing: Sharing,
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
    pub composite_alpha: vk::CompositeAlphaFlagsKHR,
}

/// # Panics
/// If `formats` is empty. Callers only negotiate for devices whose support
/// snapshot is adequate.
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
    formats
        .iter()
        .copied()
        .find(|f| {
            f.format == PREFERRED_FORMAT.format && f.color_space == PREFERRED_FORMAT.color_space
        })
        .unwrap_or_else(|| formats[0])
}

/// MAILBOX if offered, else FIFO, which every implementation must support.
pub fn choose_present_mode(modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    if modes.contains(&vk::PresentModeKHR::MAILBOX) {
        vk::PresentModeKHR::MAILBOX
    } else {
        vk::PresentModeKHR::FIFO
    }
}

/// Anything but [`UNDEFINED_EXTENT`] is dictated by the platform and used as is.
pub fn choose_extent(caps: &vk::SurfaceCapabilitiesKHR, framebuffer: RenderSize) -> vk::Extent2D {
    if caps.current_extent != UNDEFINED_EXTENT {
        caps.current_extent
    } else {
        vk::Extent2D {
            width: framebuffer
                .width
                .clamp(caps.min_image_extent.width, caps.max_image_extent.width),
            height: framebuffer
                .height
                .clamp(caps.min_image_extent.height, caps.max_image_extent.height),
        }
    }
}

/// One more than the minimum; a `max_image_count` of 0 means no cap.
pub fn choose_image_count(caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let count = caps.min_image_count.saturating_add(1);
    if caps.max_image_count == 0 {
        count
    } else {
        count.min(caps.max_image_count)
    }
}

pub fn choose_composite_alpha(caps: &vk::SurfaceCapabilitiesKHR) -> vk::CompositeAlphaFlagsKHR {
    [
        vk::CompositeAlphaFlagsKHR::OPAQUE,
        vk::CompositeAlphaFlagsKHR::PRE_MULTIPLIED,
        vk::CompositeAlphaFlagsKHR::POST_MULTIPLIED,
    ]
    .into_iter()
    .find(|&a| caps.supported_composite_alpha.contains(a))
    .unwrap_or(vk::CompositeAlphaFlagsKHR::INHERIT)
}

pub fn choose_sharing(families: QueueFamilies) -> Sharing {
    if families.is_shared() {
        Sharing::Exclusive
    } else {
        Sharing::Concurrent([families.graphics, families.present])
    }
}

pub fn negotiate(
    support: &SwapchainSupport,
    framebuffer: RenderSize,
    families: QueueFamilies,
) -> SwapchainConfig {
    let caps = &support.capabilities;
    let surface_format = choose_surface_format(&support.formats);
    SwapchainConfig {
        format: surface_format.format,
        color_space: surface_format.color_space,
        present_mode: choose_present_mode(&support.present_modes),
        extent: choose_extent(caps, framebuffer),
        image_count: choose_image_count(caps),
        sharing: choose_sharing(families),
        pre_transform: caps.current_transform,
        composite_alpha: choose_composite_alpha(caps),
    }
}
