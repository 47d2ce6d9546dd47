// SPDX-License-Identifier: CEPL-1.0
use ash::vk;
use tracing::debug;

use crate::driver::Driver;
use crate::error::{Result, VkError};
use crate::shader::ShaderCode;

const ENTRY_POINT: &std::ffi::CStr = c"main";

/// The one fixed graphics pipeline plus the render pass and shader modules it
/// was built from. Records the format/extent it was built against, since the
/// viewport is baked in.
#[derive(Debug, Default)]
pub struct Pipeline {
    vert_module: Option<vk::ShaderModule>,
    frag_module: Option<vk::ShaderModule>,
    layout: Option<vk::PipelineLayout>,
    render_pass: Option<vk::RenderPass>,
    pipeline: Option<vk::Pipeline>,
    pub format: vk::Format,
    pub extent: vk::Extent2D,
}

impl Pipeline {
    pub fn build<D: Driver>(
        driver: &D,
        format: vk::Format,
        extent: vk::Extent2D,
        vert: &ShaderCode,
        frag: &ShaderCode,
    ) -> Result<Self> {
        let mut p = Self {
            format,
            extent,
            ..Default::default()
        };
        match unsafe { p.build_inner(driver, vert, frag) } {
            Ok(()) => {
                debug!(?format, ?extent, "graphics pipeline built");
                Ok(p)
            }
            Err(e) => {
                p.destroy(driver);
                Err(e)
            }
        }
    }

    unsafe fn build_inner<D: Driver>(
        &mut self,
        driver: &D,
        vert: &ShaderCode,
        frag: &ShaderCode,
    ) -> Result<()> {
        let vs = create_shader_module(driver, vert)?;
        self.vert_module = Some(vs);
        let fs = create_shader_module(driver, frag)?;
        self.frag_module = Some(fs);

        // no descriptor sets, no push constants
        let layout_info = vk::PipelineLayoutCreateInfo {
            s_type: vk::StructureType::PIPELINE_LAYOUT_CREATE_INFO,
            ..Default::default()
        };
        let layout = driver
            .create_pipeline_layout(&layout_info)
            .map_err(VkError::PipelineLayout)?;
        self.layout = Some(layout);

        let render_pass = create_render_pass(driver, self.format)?;
        self.render_pass = Some(render_pass);

        let stages = [
            vk::PipelineShaderStageCreateInfo {
                s_type: vk::StructureType::PIPELINE_SHADER_STAGE_CREATE_INFO,
                stage: vert.stage.flags(),
                module: vs,
                p_name: ENTRY_POINT.as_ptr(),
                ..Default::default()
            },
            vk::PipelineShaderStageCreateInfo {
                s_type: vk::StructureType::PIPELINE_SHADER_STAGE_CREATE_INFO,
                stage: frag.stage.flags(),
                module: fs,
                p_name: ENTRY_POINT.as_ptr(),
                ..Default::default()
            },
        ];

        // Vertex input: none, the triangle lives in the vertex shader
        let vertex_input = vk::PipelineVertexInputStateCreateInfo {
            s_type: vk::StructureType::PIPELINE_VERTEX_INPUT_STATE_CREATE_INFO,
            ..Default::default()
        };
        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo {
            s_type: vk::StructureType::PIPELINE_INPUT_ASSEMBLY_STATE_CREATE_INFO,
            topology: vk::PrimitiveTopology::TRIANGLE_LIST,
            primitive_restart_enable: vk::FALSE,
            ..Default::default()
        };

        // Static viewport/scissor covering the whole swap chain image
        let viewport = vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: self.extent.width as f32,
            height: self.extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };
        let scissor = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent: self.extent,
        };
        let viewport_state = vk::PipelineViewportStateCreateInfo {
            s_type: vk::StructureType::PIPELINE_VIEWPORT_STATE_CREATE_INFO,
            viewport_count: 1,
            p_viewports: &viewport,
            scissor_count: 1,
            p_scissors: &scissor,
            ..Default::default()
        };

        let raster = vk::PipelineRasterizationStateCreateInfo {
            s_type: vk::StructureType::PIPELINE_RASTERIZATION_STATE_CREATE_INFO,
            depth_clamp_enable: vk::FALSE,
            rasterizer_discard_enable: vk::FALSE,
            polygon_mode: vk::PolygonMode::FILL,
            cull_mode: vk::CullModeFlags::BACK,
            front_face: vk::FrontFace::CLOCKWISE,
            depth_bias_enable: vk::FALSE,
            line_width: 1.0,
            ..Default::default()
        };
        let multisample = vk::PipelineMultisampleStateCreateInfo {
            s_type: vk::StructureType::PIPELINE_MULTISAMPLE_STATE_CREATE_INFO,
            rasterization_samples: vk::SampleCountFlags::TYPE_1,
            sample_shading_enable: vk::FALSE,
            min_sample_shading: 1.0,
            ..Default::default()
        };

        // src*srcAlpha + dst*(1 - srcAlpha)
        let color_blend_att = blend_attachment();
        let color_blend = vk::PipelineColorBlendStateCreateInfo {
            s_type: vk::StructureType::PIPELINE_COLOR_BLEND_STATE_CREATE_INFO,
            logic_op_enable: vk::FALSE,
            logic_op: vk::LogicOp::COPY,
            attachment_count: 1,
            p_attachments: &color_blend_att,
            ..Default::default()
        };

        let pipeline_info = vk::GraphicsPipelineCreateInfo {
            s_type: vk::StructureType::GRAPHICS_PIPELINE_CREATE_INFO,
            stage_count: stages.len() as u32,
            p_stages: stages.as_ptr(),
            p_vertex_input_state: &vertex_input,
            p_input_assembly_state: &input_assembly,
            p_viewport_state: &viewport_state,
            p_rasterization_state: &raster,
            p_multisample_state: &multisample,
            p_color_blend_state: &color_blend,
            layout,
            render_pass,
            subpass: 0,
            ..Default::default()
        };
        let pipeline = driver
            .create_graphics_pipeline(&pipeline_info)
            .map_err(VkError::PipelineCreation)?;
        self.pipeline = Some(pipeline);
        Ok(())
    }

    /// Pipeline, render pass, layout, fragment module, vertex module.
    pub fn destroy<D: Driver>(&mut self, driver: &D) {
        unsafe {
            if let Some(pipeline) = self.pipeline.take() {
                driver.destroy_pipeline(pipeline);
            }
            if let Some(render_pass) = self.render_pass.take() {
                driver.destroy_render_pass(render_pass);
            }
            if let Some(layout) = self.layout.take() {
                driver.destroy_pipeline_layout(layout);
            }
            if let Some(fs) = self.frag_module.take() {
                driver.destroy_shader_module(fs);
            }
            if let Some(vs) = self.vert_module.take() {
                driver.destroy_shader_module(vs);
            }
        }
    }

    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline.unwrap_or_default()
    }

    pub fn render_pass(&self) -> vk::RenderPass {
        self.render_pass.unwrap_or_default()
    }

    /// Whether a live pipeline exists and its baked viewport and attachment
    /// format still fit.
    pub fn matches(&self, format: vk::Format, extent: vk::Extent2D) -> bool {
        self.pipeline.is_some() && self.format == format && self.extent == extent
    }
}

fn blend_attachment() -> vk::PipelineColorBlendAttachmentState {
    vk::PipelineColorBlendAttachmentState {
        blend_enable: vk::TRUE,
        src_color_blend_factor: vk::BlendFactor::SRC_ALPHA,
        dst_color_blend_factor: vk::BlendFactor::ONE_MINUS_SRC_ALPHA,
        color_blend_op: vk::BlendOp::ADD,
        src_alpha_blend_factor: vk::BlendFactor::ONE,
        dst_alpha_blend_factor: vk::BlendFactor::ZERO,
        alpha_blend_op: vk::BlendOp::ADD,
        color_write_mask: vk::ColorComponentFlags::RGBA,
    }
}

unsafe fn create_shader_module<D: Driver>(driver: &D, code: &ShaderCode) -> Result<vk::ShaderModule> {
    let info = vk::ShaderModuleCreateInfo {
        s_type: vk::StructureType::SHADER_MODULE_CREATE_INFO,
        code_size: code.byte_len(),
        p_code: code.words().as_ptr(),
        ..Default::default()
    };
    driver
        .create_shader_module(&info)
        .map_err(|source| VkError::ShaderModule {
            stage: code.stage.name(),
            source,
        })
}

/// Single colour attachment cleared on load and handed to presentation, one
/// subpass, and an external dependency so colour writes wait for the acquired
/// image.
unsafe fn create_render_pass<D: Driver>(driver: &D, format: vk::Format) -> Result<vk::RenderPass> {
    let color_att = vk::AttachmentDescription {
        format,
        samples: vk::SampleCountFlags::TYPE_1,
        load_op: vk::AttachmentLoadOp::CLEAR,
        store_op: vk::AttachmentStoreOp::STORE,
        stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
        stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
        initial_layout: vk::ImageLayout::UNDEFINED,
        final_layout: vk::ImageLayout::PRESENT_SRC_KHR,
        ..Default::default()
    };
    let att_ref = vk::AttachmentReference {
        attachment: 0,
        layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    };
    let subpass = vk::SubpassDescription {
        pipeline_bind_point: vk::PipelineBindPoint::GRAPHICS,
        color_attachment_count: 1,
        p_color_attachments: &att_ref,
        ..Default::default()
    };
    let dependency = vk::SubpassDependency {
        src_subpass: vk::SUBPASS_EXTERNAL,
        dst_subpass: 0,
        src_stage_mask: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        src_access_mask: vk::AccessFlags::empty(),
        dst_stage_mask: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        dst_access_mask: vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
        ..Default::default()
    };

    let rp_info = vk::RenderPassCreateInfo {
        s_type: vk::StructureType::RENDER_PASS_CREATE_INFO,
        attachment_count: 1,
        p_attachments: &color_att,
        subpass_count: 1,
        p_subpasses: &subpass,
        dependency_count: 1,
        p_dependencies: &dependency,
        ..Default::default()
    };
    driver
        .create_render_pass(&rp_info)
        .map_err(VkError::RenderPass)
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
