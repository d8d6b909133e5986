// SPDX-License-Identifier: CEPL-1.0
//! Vulkan context bootstrap: GPU selection, logical device and queues, and
//! swapchain negotiation for a single window.

#![deny(unsafe_op_in_unsafe_fn)]

pub mod context;
pub mod debug;
pub mod error;
pub mod negotiate;
pub mod probe;
pub mod select;

mod release;
#[cfg(test)]
mod testing;

pub use ash;
pub use context::{BuildStage, ContextSettings, RenderingContext};
pub use error::{ContextError, NoSuitableDevice, Resource};
pub use negotiate::{Sharing, SwapchainConfig};
pub use probe::{DeviceProbe, QueueFamilies, QueueFamilyIndices, SwapchainSupport};
pub use select::SelectedDevice;
