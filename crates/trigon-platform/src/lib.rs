// SPDX-License-Identifier: CEPL-1.0
//! winit-backed window for the renderer. The event loop is pumped by hand so
//! the frame loop, not winit, owns control flow.
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use raw_window_handle::{
    DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, WindowHandle,
};
use tracing::{debug, info};
use trigon_render::{RenderSize, Window};
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window as WinitWindow, WindowAttributes, WindowId};

pub use winit;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WindowDesc {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

impl Default for WindowDesc {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            title: "Sample VK window".to_owned(),
        }
    }
}

fn render_size(size: PhysicalSize<u32>) -> RenderSize {
    RenderSize::new(size.width, size.height)
}

/// Everything the event handlers touch.
struct WindowState {
    attributes: WindowAttributes,
    window: Option<WinitWindow>,
    size: RenderSize,
    close_requested: bool,
    create_error: Option<String>,
    on_resize: Option<Box<dyn FnMut(RenderSize)>>,
}

impl ApplicationHandler for WindowState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        match event_loop.create_window(self.attributes.clone()) {
            Ok(window) => {
                self.size = render_size(window.inner_size());
                info!(
                    width = self.size.width,
                    height = self.size.height,
                    "window created"
                );
                self.window = Some(window);
            }
            Err(e) => {
                self.create_error = Some(e.to_string());
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("CloseRequested");
                self.close_requested = true;
            }
            WindowEvent::Resized(new_size) => {
                self.size = render_size(new_size);
                debug!(
                    width = self.size.width,
                    height = self.size.height,
                    "Resized"
                );
                if let Some(callback) = self.on_resize.as_mut() {
                    callback(self.size);
                }
            }
            _ => {}
        }
    }
}

/// A single desktop window plus the event loop that feeds it.
pub struct PlatformWindow {
    // dropped before the event loop
    state: WindowState,
    event_loop: EventLoop<()>,
}

impl PlatformWindow {
    /// Creates the event loop and pumps it until the window exists.
    pub fn open(desc: &WindowDesc) -> Result<Self> {
        let event_loop = EventLoop::new().context("create event loop")?;
        let attributes = WinitWindow::default_attributes()
            .with_title(desc.title.clone())
            .with_inner_size(LogicalSize::new(desc.width, desc.height));

        let mut platform = Self {
            state: WindowState {
                attributes,
                window: None,
                size: RenderSize::new(desc.width, desc.height),
                close_requested: false,
                create_error: None,
                on_resize: None,
            },
            event_loop,
        };

        while platform.state.window.is_none() {
            let status = platform.pump(Some(Duration::ZERO));
            if let Some(e) = platform.state.create_error.take() {
                return Err(anyhow!(e)).context("create window");
            }
            if let PumpStatus::Exit(code) = status {
                bail!("event loop exited ({code}) before the window was created");
            }
        }
        Ok(platform)
    }

    fn pump(&mut self, timeout: Option<Duration>) -> PumpStatus {
        let status = self.event_loop.pump_app_events(timeout, &mut self.state);
        if let PumpStatus::Exit(_) = status {
            self.state.close_requested = true;
        }
        status
    }

    pub fn request_close(&mut self) {
        self.state.close_requested = true;
    }
}

impl HasWindowHandle for PlatformWindow {
    fn window_handle(&self) -> Result<WindowHandle<'_>, HandleError> {
        self.state
            .window
            .as_ref()
            .ok_or(HandleError::Unavailable)?
            .window_handle()
    }
}

impl HasDisplayHandle for PlatformWindow {
    fn display_handle(&self) -> Result<DisplayHandle<'_>, HandleError> {
        self.state
            .window
            .as_ref()
            .ok_or(HandleError::Unavailable)?
            .display_handle()
    }
}

impl Window for PlatformWindow {
    fn framebuffer_size(&self) -> RenderSize {
        self.state.size
    }

    fn poll_events(&mut self) {
        self.pump(Some(Duration::ZERO));
    }

    fn wait_events(&mut self) {
        self.pump(None);
    }

    fn should_close(&self) -> bool {
        self.state.close_requested
    }

    fn on_resize(&mut self, callback: Box<dyn FnMut(RenderSize)>) {
        self.state.on_resize = Some(callback);
    }
}
