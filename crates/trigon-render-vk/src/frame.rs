// SPDX-License-Identifier: CEPL-1.0
use ash::vk;
use tracing::debug;

use crate::context::DeviceContext;
use crate::driver::Driver;
use crate::error::{Result, VkError};
use crate::swapchain::Swapchain;

/// One framebuffer per swap chain image view. Holds only framebuffers that
/// were actually created.
#[derive(Debug, Default)]
pub struct FrameBuffers {
    framebuffers: Vec<vk::Framebuffer>,
}

impl FrameBuffers {
    pub fn create<D: Driver>(
        driver: &D,
        swapchain: &Swapchain,
        render_pass: vk::RenderPass,
        extent: vk::Extent2D,
    ) -> Result<Self> {
        let mut fbs = Self {
            framebuffers: Vec::with_capacity(swapchain.views.len()),
        };
        for (index, view) in swapchain.views.iter().enumerate() {
            let fb_info = vk::FramebufferCreateInfo {
                s_type: vk::StructureType::FRAMEBUFFER_CREATE_INFO,
                render_pass,
                attachment_count: 1,
                p_attachments: view,
                width: extent.width,
                height: extent.height,
                layers: 1,
                ..Default::default()
            };
            match unsafe { driver.create_framebuffer(&fb_info) } {
                Ok(fb) => fbs.framebuffers.push(fb),
                Err(source) => {
                    fbs.destroy(driver);
                    return Err(VkError::FramebufferCreation { index, source });
                }
            }
        }
        debug!(count = fbs.framebuffers.len(), "framebuffers created");
        Ok(fbs)
    }

    pub fn destroy<D: Driver>(&mut self, driver: &D) {
        for fb in self.framebuffers.drain(..) {
            unsafe { driver.destroy_framebuffer(fb) };
        }
    }

    pub fn get(&self, image_index: u32) -> Option<vk::Framebuffer> {
        self.framebuffers.get(image_index as usize).copied()
    }

    pub fn len(&self) -> usize {
        self.framebuffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.framebuffers.is_empty()
    }
}

/// Command pool on the graphics family and one primary buffer per frame slot,
/// reset and re-recorded every frame.
#[derive(Debug, Default)]
pub struct CommandResources {
    pool: Option<vk::CommandPool>,
    pub buffers: Vec<vk::CommandBuffer>,
}

impl CommandResources {
    pub fn create<D: Driver>(driver: &D, ctx: &DeviceContext, count: usize) -> Result<Self> {
        let mut res = Self::default();
        match unsafe { res.build(driver, ctx, count) } {
            Ok(()) => Ok(res),
            Err(e) => {
                res.destroy(driver);
                Err(e)
            }
        }
    }

    unsafe fn build<D: Driver>(&mut self, driver: &D, ctx: &DeviceContext, count: usize) -> Result<()> {
        let pool_info = vk::CommandPoolCreateInfo {
            s_type: vk::StructureType::COMMAND_POOL_CREATE_INFO,
            queue_family_index: ctx.graphics_family,
            flags: vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
            ..Default::default()
        };
        let pool = driver
            .create_command_pool(&pool_info)
            .map_err(VkError::CommandPool)?;
        self.pool = Some(pool);

        let alloc_info = vk::CommandBufferAllocateInfo {
            s_type: vk::StructureType::COMMAND_BUFFER_ALLOCATE_INFO,
            command_pool: pool,
            level: vk::CommandBufferLevel::PRIMARY,
            command_buffer_count: count as u32,
            ..Default::default()
        };
        self.buffers = driver
            .allocate_command_buffers(&alloc_info)
            .map_err(VkError::CommandBufferAlloc)?;
        Ok(())
    }

    /// Destroying the pool frees its buffers.
    pub fn destroy<D: Driver>(&mut self, driver: &D) {
        self.buffers.clear();
        if let Some(pool) = self.pool.take() {
            unsafe { driver.destroy_command_pool(pool) };
        }
    }
}

/// Resets `cmd` and records the whole frame: clear, bind, draw the triangle.
pub fn record_frame<D: Driver>(
    driver: &D,
    cmd: vk::CommandBuffer,
    render_pass: vk::RenderPass,
    framebuffer: vk::Framebuffer,
    extent: vk::Extent2D,
    pipeline: vk::Pipeline,
    clear: [f32; 4],
) -> Result<()> {
    unsafe {
        driver
            .reset_command_buffer(cmd)
            .map_err(VkError::CommandBufferRecord)?;
        let begin = vk::CommandBufferBeginInfo {
            s_type: vk::StructureType::COMMAND_BUFFER_BEGIN_INFO,
            flags: vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT,
            ..Default::default()
        };
        driver
            .begin_command_buffer(cmd, &begin)
            .map_err(VkError::CommandBufferRecord)?;

        let clears = [vk::ClearValue {
            color: vk::ClearColorValue { float32: clear },
        }];
        let rp_begin = vk::RenderPassBeginInfo {
            s_type: vk::StructureType::RENDER_PASS_BEGIN_INFO,
            render_pass,
            framebuffer,
            render_area: vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            },
            clear_value_count: clears.len() as u32,
            p_clear_values: clears.as_ptr(),
            ..Default::default()
        };
        driver.cmd_begin_render_pass(cmd, &rp_begin);
        driver.cmd_bind_graphics_pipeline(cmd, pipeline);
        // positions are baked into the vertex shader
        driver.cmd_draw(cmd, 3, 1);
        driver.cmd_end_render_pass(cmd);

        driver
            .end_command_buffer(cmd)
            .map_err(VkError::CommandBufferRecord)
    }
}

#[cfg(test)]
#[path = "frame_tests.rs"]
mod tests;
