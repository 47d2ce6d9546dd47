// SPDX-License-Identifier: CEPL-1.0
use anyhow::Result;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

mod resize;
mod run;
mod shader;

pub use resize::ResizeFlag;
pub use run::{run, RunStats};
pub use shader::ShaderBlob;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderSize {
    pub width: u32,
    pub height: u32,
}

impl RenderSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A minimized window reports a zero-sized framebuffer.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// The windowing collaborator the renderer drives. Everything here runs on the
/// rendering thread; the resize callback fires from inside `poll_events` /
/// `wait_events`.
pub trait Window: HasWindowHandle + HasDisplayHandle {
    /// Framebuffer size in pixels (not logical points).
    fn framebuffer_size(&self) -> RenderSize;

    /// Drains pending events without blocking.
    fn poll_events(&mut self);

    /// Blocks until at least one event arrives.
    fn wait_events(&mut self);

    fn should_close(&self) -> bool;

    fn on_resize(&mut self, callback: Box<dyn FnMut(RenderSize)>);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameStatus {
    /// A frame was recorded and submitted for presentation.
    Drawn,
    /// The surface went stale during acquire; nothing was submitted.
    Skipped,
    /// The tick was spent rebuilding the swap chain.
    Recreated,
}

pub trait Renderer {
    fn draw_frame(&mut self, window: &mut dyn Window) -> Result<FrameStatus>;
    fn set_clear_color(&mut self, rgba: [f32; 4]);
    fn wait_idle(&mut self) -> Result<()>;
}
