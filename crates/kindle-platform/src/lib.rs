// SPDX-License-Identifier: CEPL-1.0
pub use winit;

use std::ops::Deref;

use kindle_render::{RenderSize, SurfaceSource};
use raw_window_handle::{
    DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, WindowHandle,
};
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window, WindowAttributes};

/// The application window, presentable by a graphics backend.
pub struct PlatformWindow(Window);

impl PlatformWindow {
    pub fn create(
        event_loop: &ActiveEventLoop,
        attributes: WindowAttributes,
    ) -> Result<Self, winit::error::OsError> {
        event_loop.create_window(attributes).map(PlatformWindow)
    }
}

impl Deref for PlatformWindow {
    type Target = Window;

    fn deref(&self) -> &Window {
        &self.0
    }
}

impl HasWindowHandle for PlatformWindow {
    fn window_handle(&self) -> Result<WindowHandle<'_>, HandleError> {
        self.0.window_handle()
    }
}

impl HasDisplayHandle for PlatformWindow {
    fn display_handle(&self) -> Result<DisplayHandle<'_>, HandleError> {
        self.0.display_handle()
    }
}

impl SurfaceSource for PlatformWindow {
    fn framebuffer_size(&self) -> RenderSize {
        // inner_size is already in physical pixels
        render_size(self.0.inner_size())
    }
}

fn render_size(size: PhysicalSize<u32>) -> RenderSize {
    RenderSize {
        width: size.width,
        height: size.height,
    }
}

/// Attributes for the single application window. The size is in logical
/// units; the platform scales it to pixels.
pub fn window_attributes(title: &str, width: u32, height: u32) -> WindowAttributes {
    tracing::debug!("window attributes: {title:?} {width}x{height} (logical)");
    Window::default_attributes()
        .with_title(title)
        .with_inner_size(LogicalSize::new(width.max(1), height.max(1)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn framebuffer_of<S: SurfaceSource + ?Sized>(source: &S) -> RenderSize {
        source.framebuffer_size()
    }

    #[test]
    fn platform_window_is_a_surface_source() {
        // Opening a real window needs a display server; this pins the impl.
        let _: fn(&PlatformWindow) -> RenderSize = framebuffer_of::<PlatformWindow>;
    }

    #[test]
    fn framebuffer_size_is_physical_pixels() {
        let size = render_size(PhysicalSize::new(2560, 1440));
        assert_eq!(
            size,
            RenderSize {
                width: 2560,
                height: 1440
            }
        );
    }

    #[test]
    fn attributes_never_request_zero_size() {
        let attrs = window_attributes("t", 0, 0);
        assert_eq!(attrs.title, "t");
        assert!(attrs.inner_size.is_some());
    }
}
