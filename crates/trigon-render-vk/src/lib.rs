// SPDX-License-Identifier: CEPL-1.0
//! Vulkan backend: device bring-up, swap chain, the fixed triangle pipeline
//! and the frames-in-flight loop.

use anyhow::Context as _;
use trigon_render::{FrameStatus, Renderer, ShaderBlob, Window};

mod ash_driver;
mod context;
mod debug;
mod driver;
mod engine;
mod error;
mod frame;
#[cfg(test)]
mod mock;
mod pipeline;
mod shader;
mod swapchain;
mod sync;

pub use ash_driver::AshDriver;
pub use context::{ContextDesc, DeviceContext, DevicePreference, VALIDATION_LAYER};
pub use driver::Driver;
pub use engine::{Engine, EngineDesc, MAX_FRAMES_IN_FLIGHT};
pub use error::{Result, SurfaceGlueError, VkError};
pub use shader::{triangle_shaders, ShaderCode, ShaderStage};
pub use swapchain::{PresentPreference, SwapchainConfig, SwapchainSupport};

/// The engine over the real loader.
pub type VkRenderer = Engine<AshDriver>;

impl Engine<AshDriver> {
    pub fn with_vulkan(
        window: &mut dyn Window,
        desc: &EngineDesc,
        vert: &ShaderBlob,
        frag: &ShaderBlob,
    ) -> Result<Self> {
        let driver = AshDriver::load()?;
        Engine::new(driver, window, desc, vert, frag)
    }
}

impl<D: Driver> Renderer for Engine<D> {
    fn draw_frame(&mut self, window: &mut dyn Window) -> anyhow::Result<FrameStatus> {
        Engine::draw_frame(self, window).context("draw_frame")
    }

    fn set_clear_color(&mut self, rgba: [f32; 4]) {
        Engine::set_clear_color(self, rgba);
    }

    fn wait_idle(&mut self) -> anyhow::Result<()> {
        Engine::wait_idle(self).context("device_wait_idle")
    }
}
