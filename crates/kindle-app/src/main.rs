// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]
mod config;

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Parser;
use config::AppCfg;
use kindle_core::{init_tracing, load_toml_or_default};
use kindle_platform::{window_attributes, PlatformWindow};
use kindle_render::SurfaceSource;
use kindle_render_vk::{ContextSettings, RenderingContext};
use tracing::{debug, error, info};

use kindle_platform::winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::WindowId,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML config file
    #[arg(long, default_value = "kindle.toml")]
    config: PathBuf,

    /// Force the Khronos validation layer on
    #[arg(long, conflicts_with = "no_validation")]
    validation: bool,

    /// Force the Khronos validation layer off
    #[arg(long)]
    no_validation: bool,
}

impl Args {
    fn validation_override(&self) -> Option<bool> {
        if self.validation {
            Some(true)
        } else if self.no_validation {
            Some(false)
        } else {
            None
        }
    }
}

struct App {
    cfg: AppCfg,
    settings: ContextSettings,
    // Declared before `window`: the surface must go before the window does.
    context: Option<RenderingContext>,
    window: Option<PlatformWindow>,
    failure: Option<anyhow::Error>,
}

impl App {
    fn fail(&mut self, event_loop: &ActiveEventLoop, e: anyhow::Error) {
        error!("{e:#}");
        self.failure = Some(e);
        event_loop.exit();
    }

    fn shutdown(&mut self) {
        if let Some(mut ctx) = self.context.take() {
            ctx.teardown();
        }
        self.window = None;
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let w = &self.cfg.window;
        let attributes = window_attributes(&w.title, w.width, w.height);
        let window = match PlatformWindow::create(event_loop, attributes) {
            Ok(window) => window,
            Err(e) => return self.fail(event_loop, anyhow!("create_window: {e}")),
        };
        let fb = window.framebuffer_size();
        info!("window open, framebuffer {}x{}", fb.width, fb.height);

        match RenderingContext::new(&window, &self.settings) {
            Ok(ctx) => {
                info!(
                    "context ready on {} (validation={})",
                    ctx.device_name(),
                    ctx.validation_enabled()
                );
                self.context = Some(ctx);
                self.window = Some(window);
            }
            Err(e) => {
                drop(window);
                self.fail(event_loop, anyhow!(e).context("building the rendering context"));
            }
        }

        event_loop.set_control_flow(ControlFlow::Wait);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if let Some(window) = &self.window {
            if window_id != window.id() {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("CloseRequested");
                self.shutdown();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                debug!(
                    "Resized -> {}x{} (swapchain keeps its negotiated extent)",
                    size.width, size.height
                );
            }
            _ => {}
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let cfg: AppCfg = load_toml_or_default(&args.config);
    let settings = cfg.context.to_settings(args.validation_override());
    debug!("context settings: {settings:?}");

    let event_loop: EventLoop<()> = EventLoop::new()?;
    let mut app = App {
        cfg,
        settings,
        context: None,
        window: None,
        failure: None,
    };

    event_loop.run_app(&mut app)?;
    app.shutdown();

    match app.failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
