// SPDX-License-Identifier: CEPL-1.0
use ash::vk;
use tracing::{debug, info, warn};
use trigon_render::{FrameStatus, ResizeFlag, ShaderBlob, Window};

use crate::context::{ContextDesc, DeviceContext};
use crate::driver::Driver;
use crate::error::{Result, VkError};
use crate::frame::{record_frame, CommandResources, FrameBuffers};
use crate::pipeline::Pipeline;
use crate::shader::{ShaderCode, ShaderStage};
use crate::swapchain::{PresentPreference, Swapchain, SwapchainConfig, SwapchainSupport};
use crate::sync::{FrameIndex, FrameSync};

pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

const BLACK: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

#[derive(Clone, Debug)]
pub struct EngineDesc {
    pub context: ContextDesc,
    pub present: PresentPreference,
    pub clear_color: [f32; 4],
}

impl Default for EngineDesc {
    fn default() -> Self {
        Self {
            context: ContextDesc::default(),
            present: PresentPreference::default(),
            clear_color: BLACK,
        }
    }
}

/// Owns every GPU object of the renderer and drives the per-frame protocol.
///
/// Creation order: device context, swap chain, pipeline, framebuffers, command
/// resources, sync. Teardown is the exact reverse and runs on `shutdown`, on
/// drop, and after a failed `new`.
pub struct Engine<D: Driver> {
    driver: D,
    ctx: DeviceContext,
    swapchain: Swapchain,
    pipeline: Pipeline,
    framebuffers: FrameBuffers,
    commands: CommandResources,
    sync: FrameSync,
    frame: FrameIndex,
    resized: ResizeFlag,
    vert: ShaderCode,
    frag: ShaderCode,
    present: PresentPreference,
    clear_color: [f32; 4],
}

impl<D: Driver> Engine<D> {
    pub fn new(
        driver: D,
        window: &mut dyn Window,
        desc: &EngineDesc,
        vert: &ShaderBlob,
        frag: &ShaderBlob,
    ) -> Result<Self> {
        let vert = ShaderCode::from_blob(ShaderStage::Vertex, vert)?;
        let frag = ShaderCode::from_blob(ShaderStage::Fragment, frag)?;

        let mut engine = Self {
            driver,
            ctx: DeviceContext::default(),
            swapchain: Swapchain::default(),
            pipeline: Pipeline::default(),
            framebuffers: FrameBuffers::default(),
            commands: CommandResources::default(),
            sync: FrameSync::default(),
            frame: FrameIndex::new(MAX_FRAMES_IN_FLIGHT),
            resized: ResizeFlag::new(),
            vert,
            frag,
            present: desc.present,
            clear_color: desc.clear_color,
        };
        // on error, dropping `engine` releases whatever was built
        engine.init(window, &desc.context)?;

        let flag = engine.resized.clone();
        window.on_resize(Box::new(move |_| flag.raise()));
        info!("vulkan engine ready");
        Ok(engine)
    }

    fn init(&mut self, window: &dyn Window, ctx_desc: &ContextDesc) -> Result<()> {
        self.ctx = DeviceContext::create(&mut self.driver, window, ctx_desc)?;

        let support = SwapchainSupport::query(&self.driver, &self.ctx)?;
        let config = SwapchainConfig::choose(&support, window.framebuffer_size(), self.present);
        self.swapchain = Swapchain::create(&self.driver, &self.ctx, &support, &config)?;

        self.pipeline = Pipeline::build(
            &self.driver,
            self.swapchain.format,
            self.swapchain.extent,
            &self.vert,
            &self.frag,
        )?;
        self.framebuffers = FrameBuffers::create(
            &self.driver,
            &self.swapchain,
            self.pipeline.render_pass(),
            self.swapchain.extent,
        )?;

        self.commands = CommandResources::create(&self.driver, &self.ctx, MAX_FRAMES_IN_FLIGHT)?;
        self.sync = FrameSync::create(&self.driver, MAX_FRAMES_IN_FLIGHT)?;
        Ok(())
    }

    // STRICT PER-FRAME ORDER:
    // 1) pending resize -> recreate, nothing else this tick
    // 2) wait in-flight fence of the current slot
    // 3) acquire (out-of-date abandons the frame before any state changes)
    // 4) re-record the slot's command buffer
    // 5) reset fence, submit: wait image-available, signal render-finished + fence
    // 6) present: wait render-finished
    // 7) advance slot
    pub fn draw_frame(&mut self, window: &mut dyn Window) -> Result<FrameStatus> {
        if self.resized.take() {
            if let Err(e) = self.recreate_swapchain(window) {
                // retry on the next frame
                self.resized.raise();
                return Err(e);
            }
            return Ok(FrameStatus::Recreated);
        }

        let frame = self.frame.get();
        let slot = *self
            .sync
            .slot(frame)
            .ok_or(VkError::ResourceMissing("frame sync slot"))?;
        let cmd = *self
            .commands
            .buffers
            .get(frame)
            .ok_or(VkError::ResourceMissing("command buffer"))?;

        unsafe {
            self.driver
                .wait_for_fence(slot.in_flight, u64::MAX)
                .map_err(VkError::FenceWait)?;

            let image_index = match self.driver.acquire_next_image(
                self.swapchain.handle(),
                u64::MAX,
                slot.image_available,
            ) {
                Ok((index, suboptimal)) => {
                    if suboptimal {
                        debug!("acquire: swap chain suboptimal, recreating next frame");
                        self.resized.raise();
                    }
                    index
                }
                Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                    warn!("acquire: swap chain out of date, skipping frame");
                    self.resized.raise();
                    return Ok(FrameStatus::Skipped);
                }
                Err(e) => return Err(VkError::Acquire(e)),
            };

            let framebuffer = self
                .framebuffers
                .get(image_index)
                .ok_or(VkError::ResourceMissing("framebuffer"))?;

            record_frame(
                &self.driver,
                cmd,
                self.pipeline.render_pass(),
                framebuffer,
                self.swapchain.extent,
                self.pipeline.handle(),
                self.clear_color,
            )?;

            // the fence stays signaled unless a submit is about to follow
            self.driver
                .reset_fence(slot.in_flight)
                .map_err(VkError::FenceReset)?;

            let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
            let submit = vk::SubmitInfo {
                s_type: vk::StructureType::SUBMIT_INFO,
                wait_semaphore_count: 1,
                p_wait_semaphores: &slot.image_available,
                p_wait_dst_stage_mask: wait_stages.as_ptr(),
                command_buffer_count: 1,
                p_command_buffers: &cmd,
                signal_semaphore_count: 1,
                p_signal_semaphores: &slot.render_finished,
                ..Default::default()
            };
            self.driver
                .queue_submit(self.ctx.graphics_queue, &submit, slot.in_flight)
                .map_err(VkError::Submit)?;

            let swapchain = self.swapchain.handle();
            let present = vk::PresentInfoKHR {
                s_type: vk::StructureType::PRESENT_INFO_KHR,
                wait_semaphore_count: 1,
                p_wait_semaphores: &slot.render_finished,
                swapchain_count: 1,
                p_swapchains: &swapchain,
                p_image_indices: &image_index,
                ..Default::default()
            };
            match self.driver.queue_present(self.ctx.present_queue, &present) {
                Ok(false) => {}
                Ok(true) | Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                    debug!("present: swap chain stale, recreating next frame");
                    self.resized.raise();
                }
                Err(e) => return Err(VkError::Present(e)),
            }
        }

        self.frame.advance();
        Ok(FrameStatus::Drawn)
    }

    // STRICT ORDER (recreate):
    // 1) stall while the window is minimised
    // 2) device idle, nothing in flight may reference the old images
    // 3) destroy framebuffers, pipeline (only if stale), swap chain
    // 4) create swap chain, pipeline (only if stale), framebuffers
    pub fn recreate_swapchain(&mut self, window: &mut dyn Window) -> Result<()> {
        let mut size = window.framebuffer_size();
        while size.is_empty() {
            window.wait_events();
            size = window.framebuffer_size();
        }

        unsafe { self.driver.device_wait_idle() }.map_err(VkError::DeviceIdle)?;

        let support = SwapchainSupport::query(&self.driver, &self.ctx)?;
        let config = SwapchainConfig::choose(&support, size, self.present);
        let rebuild_pipeline = !self.pipeline.matches(config.format.format, config.extent);

        self.framebuffers.destroy(&self.driver);
        if rebuild_pipeline {
            self.pipeline.destroy(&self.driver);
        }
        self.swapchain.destroy(&self.driver);

        self.swapchain = Swapchain::create(&self.driver, &self.ctx, &support, &config)?;
        if rebuild_pipeline {
            self.pipeline = Pipeline::build(
                &self.driver,
                self.swapchain.format,
                self.swapchain.extent,
                &self.vert,
                &self.frag,
            )?;
        }
        self.framebuffers = FrameBuffers::create(
            &self.driver,
            &self.swapchain,
            self.pipeline.render_pass(),
            self.swapchain.extent,
        )?;

        // resizes seen while stalling are covered by this rebuild
        self.resized.take();
        info!(
            width = config.extent.width,
            height = config.extent.height,
            pipeline_rebuilt = rebuild_pipeline,
            "swap chain recreated"
        );
        Ok(())
    }

    /// Waits for the device to go idle, then tears everything down. Safe to
    /// call more than once.
    pub fn shutdown(&mut self) -> Result<()> {
        let idle = if self.ctx.is_alive() {
            unsafe { self.driver.device_wait_idle() }.map_err(VkError::DeviceIdle)
        } else {
            Ok(())
        };
        self.teardown();
        idle
    }

    // STRICT TEARDOWN ORDER: sync, command resources, framebuffers, pipeline,
    // swap chain, device context.
    fn teardown(&mut self) {
        self.sync.destroy(&self.driver);
        self.commands.destroy(&self.driver);
        self.framebuffers.destroy(&self.driver);
        self.pipeline.destroy(&self.driver);
        self.swapchain.destroy(&self.driver);
        self.ctx.destroy(&mut self.driver);
    }

    pub fn wait_idle(&self) -> Result<()> {
        if !self.ctx.is_alive() {
            return Ok(());
        }
        unsafe { self.driver.device_wait_idle() }.map_err(VkError::DeviceIdle)
    }

    pub fn set_clear_color(&mut self, rgba: [f32; 4]) {
        self.clear_color = rgba;
    }

    /// Handle the window system's resize callback raises.
    pub fn resize_flag(&self) -> ResizeFlag {
        self.resized.clone()
    }

    pub fn current_frame(&self) -> usize {
        self.frame.get()
    }

    pub fn swapchain_extent(&self) -> vk::Extent2D {
        self.swapchain.extent
    }

    pub fn image_count(&self) -> usize {
        self.swapchain.image_count()
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }
}

impl<D: Driver> Drop for Engine<D> {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!("engine shutdown: {e}");
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
