// SPDX-License-Identifier: CEPL-1.0
//! Dispatch seam between the renderer core and the Vulkan entry points it
//! calls.
//!
//! The core owns every handle and decides when each one is created and
//! destroyed; a `Driver` only forwards. Instance and device creation take
//! `&mut self` because an implementation loads its dispatch tables there, every
//! other call is `&self`.
//!
//! # Safety
//!
//! All `unsafe` methods follow the Vulkan valid-usage rules of the call they
//! forward to: create-info structs must be fully valid (including everything
//! their pointers reach) for the duration of the call, and handles must have
//! been produced by the same driver and still be alive.
use std::ffi::{CStr, CString};

use ash::prelude::VkResult;
use ash::vk;
use trigon_render::Window;

use crate::error::SurfaceGlueError;

pub trait Driver {
    // --- instance ----------------------------------------------------------

    /// Instance extensions the window system needs for presentation.
    fn required_instance_extensions(
        &self,
        window: &dyn Window,
    ) -> Result<Vec<&'static CStr>, SurfaceGlueError>;

    fn enumerate_instance_layers(&self) -> VkResult<Vec<CString>>;

    unsafe fn create_instance(&mut self, info: &vk::InstanceCreateInfo<'_>)
        -> VkResult<vk::Instance>;

    unsafe fn destroy_instance(&mut self, instance: vk::Instance);

    /// Whether the debug-utils create/destroy pair was resolved when the
    /// instance was created.
    fn has_debug_utils(&self) -> bool;

    unsafe fn create_debug_messenger(
        &self,
        info: &vk::DebugUtilsMessengerCreateInfoEXT<'_>,
    ) -> VkResult<vk::DebugUtilsMessengerEXT>;

    unsafe fn destroy_debug_messenger(&self, messenger: vk::DebugUtilsMessengerEXT);

    unsafe fn create_surface(&self, window: &dyn Window) -> Result<vk::SurfaceKHR, SurfaceGlueError>;

    unsafe fn destroy_surface(&self, surface: vk::SurfaceKHR);

    // --- physical device ---------------------------------------------------

    unsafe fn enumerate_physical_devices(&self) -> VkResult<Vec<vk::PhysicalDevice>>;

    unsafe fn physical_device_properties(
        &self,
        pd: vk::PhysicalDevice,
    ) -> VkResult<vk::PhysicalDeviceProperties>;

    unsafe fn physical_device_features(
        &self,
        pd: vk::PhysicalDevice,
    ) -> VkResult<vk::PhysicalDeviceFeatures>;

    unsafe fn enumerate_device_extensions(&self, pd: vk::PhysicalDevice) -> VkResult<Vec<CString>>;

    unsafe fn queue_family_properties(
        &self,
        pd: vk::PhysicalDevice,
    ) -> VkResult<Vec<vk::QueueFamilyProperties>>;

    unsafe fn surface_support(
        &self,
        pd: vk::PhysicalDevice,
        family: u32,
        surface: vk::SurfaceKHR,
    ) -> VkResult<bool>;

    unsafe fn surface_capabilities(
        &self,
        pd: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR>;

    unsafe fn surface_formats(
        &self,
        pd: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::SurfaceFormatKHR>>;

    unsafe fn surface_present_modes(
        &self,
        pd: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::PresentModeKHR>>;

    // --- logical device ----------------------------------------------------

    unsafe fn create_device(
        &mut self,
        pd: vk::PhysicalDevice,
        info: &vk::DeviceCreateInfo<'_>,
    ) -> VkResult<vk::Device>;

    unsafe fn destroy_device(&mut self, device: vk::Device);

    unsafe fn get_device_queue(&self, family: u32, index: u32) -> vk::Queue;

    unsafe fn device_wait_idle(&self) -> VkResult<()>;

    // --- swap chain --------------------------------------------------------

    unsafe fn create_swapchain(
        &self,
        info: &vk::SwapchainCreateInfoKHR<'_>,
    ) -> VkResult<vk::SwapchainKHR>;

    unsafe fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> VkResult<Vec<vk::Image>>;

    unsafe fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR);

    unsafe fn create_image_view(&self, info: &vk::ImageViewCreateInfo<'_>)
        -> VkResult<vk::ImageView>;

    unsafe fn destroy_image_view(&self, view: vk::ImageView);

    // --- pipeline ----------------------------------------------------------

    unsafe fn create_shader_module(
        &self,
        info: &vk::ShaderModuleCreateInfo<'_>,
    ) -> VkResult<vk::ShaderModule>;

    unsafe fn destroy_shader_module(&self, module: vk::ShaderModule);

    unsafe fn create_render_pass(
        &self,
        info: &vk::RenderPassCreateInfo<'_>,
    ) -> VkResult<vk::RenderPass>;

    unsafe fn destroy_render_pass(&self, render_pass: vk::RenderPass);

    unsafe fn create_pipeline_layout(
        &self,
        info: &vk::PipelineLayoutCreateInfo<'_>,
    ) -> VkResult<vk::PipelineLayout>;

    unsafe fn destroy_pipeline_layout(&self, layout: vk::PipelineLayout);

    unsafe fn create_graphics_pipeline(
        &self,
        info: &vk::GraphicsPipelineCreateInfo<'_>,
    ) -> VkResult<vk::Pipeline>;

    unsafe fn destroy_pipeline(&self, pipeline: vk::Pipeline);

    // --- frame resources ---------------------------------------------------

    unsafe fn create_framebuffer(
        &self,
        info: &vk::FramebufferCreateInfo<'_>,
    ) -> VkResult<vk::Framebuffer>;

    unsafe fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer);

    unsafe fn create_command_pool(
        &self,
        info: &vk::CommandPoolCreateInfo<'_>,
    ) -> VkResult<vk::CommandPool>;

    /// Also frees every command buffer allocated from the pool.
    unsafe fn destroy_command_pool(&self, pool: vk::CommandPool);

    unsafe fn allocate_command_buffers(
        &self,
        info: &vk::CommandBufferAllocateInfo<'_>,
    ) -> VkResult<Vec<vk::CommandBuffer>>;

    unsafe fn reset_command_buffer(&self, cmd: vk::CommandBuffer) -> VkResult<()>;

    unsafe fn begin_command_buffer(
        &self,
        cmd: vk::CommandBuffer,
        info: &vk::CommandBufferBeginInfo<'_>,
    ) -> VkResult<()>;

    unsafe fn cmd_begin_render_pass(&self, cmd: vk::CommandBuffer, info: &vk::RenderPassBeginInfo<'_>);

    unsafe fn cmd_bind_graphics_pipeline(&self, cmd: vk::CommandBuffer, pipeline: vk::Pipeline);

    unsafe fn cmd_draw(&self, cmd: vk::CommandBuffer, vertex_count: u32, instance_count: u32);

    unsafe fn cmd_end_render_pass(&self, cmd: vk::CommandBuffer);

    unsafe fn end_command_buffer(&self, cmd: vk::CommandBuffer) -> VkResult<()>;

    // --- sync --------------------------------------------------------------

    unsafe fn create_semaphore(&self) -> VkResult<vk::Semaphore>;

    unsafe fn destroy_semaphore(&self, semaphore: vk::Semaphore);

    unsafe fn create_fence(&self, signaled: bool) -> VkResult<vk::Fence>;

    unsafe fn destroy_fence(&self, fence: vk::Fence);

    unsafe fn wait_for_fence(&self, fence: vk::Fence, timeout: u64) -> VkResult<()>;

    unsafe fn reset_fence(&self, fence: vk::Fence) -> VkResult<()>;

    /// `Ok((index, suboptimal))`; out-of-date comes back as `Err`.
    unsafe fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        timeout: u64,
        semaphore: vk::Semaphore,
    ) -> VkResult<(u32, bool)>;

    unsafe fn queue_submit(
        &self,
        queue: vk::Queue,
        submit: &vk::SubmitInfo<'_>,
        fence: vk::Fence,
    ) -> VkResult<()>;

    /// `Ok(suboptimal)`; out-of-date comes back as `Err`.
    unsafe fn queue_present(&self, queue: vk::Queue, info: &vk::PresentInfoKHR<'_>)
        -> VkResult<bool>;
}
