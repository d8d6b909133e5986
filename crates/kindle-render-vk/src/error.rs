// SPDX-License-Identifier: CEPL-1.0
use std::fmt;

use ash::vk;
use thiserror::Error;

/// Driver objects the context creates, in creation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resource {
    Instance,
    DebugMessenger,
    Surface,
    Device,
    Swapchain,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Resource::Instance => "instance",
            Resource::DebugMessenger => "debug messenger",
            Resource::Surface => "surface",
            Resource::Device => "logical device",
            Resource::Swapchain => "swapchain",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum NoSuitableDevice {
    #[error("no Vulkan-capable GPUs were enumerated")]
    NoneEnumerated,
    #[error("{examined} GPU(s) enumerated, none suitable")]
    NoneSuitable { examined: usize },
}

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("could not load the Vulkan loader: {0}")]
    LoaderUnavailable(#[from] ash::LoadingError),

    #[error("validation requested but VK_LAYER_KHRONOS_validation is not installed")]
    ValidationLayerUnavailable,

    #[error("missing instance extensions: {0:?}")]
    MissingInstanceExtensions(Vec<String>),

    #[error("couldn't get a raw handle from the window: {0}")]
    WindowHandle(#[from] raw_window_handle::HandleError),

    #[error(transparent)]
    NoSuitableDevice(#[from] NoSuitableDevice),

    #[error("creating {resource} failed: {source}")]
    ResourceCreationFailed {
        resource: Resource,
        source: vk::Result,
    },

    #[error(
        "surface reports {formats} formats and {present_modes} present modes at swapchain creation"
    )]
    SwapchainUnsupported {
        formats: usize,
        present_modes: usize,
    },

    #[error("{what} failed: {source}")]
    Query {
        what: &'static str,
        source: vk::Result,
    },
}

impl ContextError {
    pub(crate) fn query(what: &'static str) -> impl FnOnce(vk::Result) -> Self {
        move |source| ContextError::Query { what, source }
    }
}
