// SPDX-License-Identifier: CEPL-1.0
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderSize {
    pub width: u32,
    pub height: u32,
}

/// A presentable window as seen by a graphics backend: raw handles for surface
/// creation, plus the current framebuffer size in pixels.
///
/// The framebuffer size may differ from the window's logical size on high-DPI
/// displays; backends must use this value when the platform leaves the image
/// extent up to the application.
pub trait SurfaceSource: HasWindowHandle + HasDisplayHandle {
    fn framebuffer_size(&self) -> RenderSize;
}
