// SPDX-License-Identifier: CEPL-1.0
use std::ffi::{CStr, CString};
use std::{mem, ptr, slice};

use ash::khr::{surface, swapchain};
use ash::prelude::VkResult;
use ash::{vk, Entry};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::debug;
use trigon_render::Window;

use crate::driver::Driver;
use crate::error::{Result, SurfaceGlueError};

/// Debug-utils create/destroy pair. Not part of the core API, so it is looked
/// up by name once per instance and may be missing.
#[derive(Clone, Copy)]
struct DebugUtilsFns {
    create: vk::PFN_vkCreateDebugUtilsMessengerEXT,
    destroy: vk::PFN_vkDestroyDebugUtilsMessengerEXT,
}

impl DebugUtilsFns {
    unsafe fn resolve(entry: &Entry, instance: vk::Instance) -> Option<Self> {
        let create =
            entry.get_instance_proc_addr(instance, c"vkCreateDebugUtilsMessengerEXT".as_ptr())?;
        let destroy =
            entry.get_instance_proc_addr(instance, c"vkDestroyDebugUtilsMessengerEXT".as_ptr())?;
        Some(Self {
            create: mem::transmute::<unsafe extern "system" fn(), vk::PFN_vkCreateDebugUtilsMessengerEXT>(
                create,
            ),
            destroy: mem::transmute::<
                unsafe extern "system" fn(),
                vk::PFN_vkDestroyDebugUtilsMessengerEXT,
            >(destroy),
        })
    }
}

/// `Driver` backed by the system Vulkan loader. Dispatch tables are filled in
/// as the instance and device come up and dropped when they go away.
pub struct AshDriver {
    entry: Entry,
    instance: Option<ash::Instance>,
    surface_fn: Option<surface::Instance>,
    debug_utils: Option<DebugUtilsFns>,
    device: Option<ash::Device>,
    swapchain_fn: Option<swapchain::Device>,
}

impl AshDriver {
    pub fn load() -> Result<Self> {
        let entry = unsafe { Entry::load()? };
        debug!("vulkan loader opened");
        Ok(Self {
            entry,
            instance: None,
            surface_fn: None,
            debug_utils: None,
            device: None,
            swapchain_fn: None,
        })
    }

    fn instance(&self) -> VkResult<&ash::Instance> {
        self.instance
            .as_ref()
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)
    }

    fn surface_fn(&self) -> VkResult<&surface::Instance> {
        self.surface_fn
            .as_ref()
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)
    }

    fn device(&self) -> VkResult<&ash::Device> {
        self.device
            .as_ref()
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)
    }

    fn swapchain_fn(&self) -> VkResult<&swapchain::Device> {
        self.swapchain_fn
            .as_ref()
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)
    }
}

impl Driver for AshDriver {
    fn required_instance_extensions(
        &self,
        window: &dyn Window,
    ) -> Result<Vec<&'static CStr>, SurfaceGlueError> {
        let display = window.display_handle()?.as_raw();
        let names = ash_window::enumerate_required_extensions(display)?;
        // ash-window hands out pointers to its static extension names
        Ok(names.iter().map(|&p| unsafe { CStr::from_ptr(p) }).collect())
    }

    fn enumerate_instance_layers(&self) -> VkResult<Vec<CString>> {
        let layers = unsafe { self.entry.enumerate_instance_layer_properties()? };
        Ok(layers
            .iter()
            .filter_map(|l| l.layer_name_as_c_str().ok().map(CStr::to_owned))
            .collect())
    }

    unsafe fn create_instance(
        &mut self,
        info: &vk::InstanceCreateInfo<'_>,
    ) -> VkResult<vk::Instance> {
        let instance = self.entry.create_instance(info, None)?;
        let handle = instance.handle();
        self.surface_fn = Some(surface::Instance::new(&self.entry, &instance));
        self.debug_utils = DebugUtilsFns::resolve(&self.entry, handle);
        self.instance = Some(instance);
        Ok(handle)
    }

    unsafe fn destroy_instance(&mut self, _instance: vk::Instance) {
        self.debug_utils = None;
        self.surface_fn = None;
        if let Some(instance) = self.instance.take() {
            instance.destroy_instance(None);
        }
    }

    fn has_debug_utils(&self) -> bool {
        self.debug_utils.is_some()
    }

    unsafe fn create_debug_messenger(
        &self,
        info: &vk::DebugUtilsMessengerCreateInfoEXT<'_>,
    ) -> VkResult<vk::DebugUtilsMessengerEXT> {
        let fns = self
            .debug_utils
            .ok_or(vk::Result::ERROR_EXTENSION_NOT_PRESENT)?;
        let instance = self.instance()?.handle();
        let mut messenger = vk::DebugUtilsMessengerEXT::null();
        (fns.create)(instance, info, ptr::null(), &mut messenger).result_with_success(messenger)
    }

    unsafe fn destroy_debug_messenger(&self, messenger: vk::DebugUtilsMessengerEXT) {
        if let (Some(fns), Ok(instance)) = (self.debug_utils, self.instance()) {
            (fns.destroy)(instance.handle(), messenger, ptr::null());
        }
    }

    unsafe fn create_surface(&self, window: &dyn Window) -> Result<vk::SurfaceKHR, SurfaceGlueError> {
        let instance = self.instance()?;
        let dh = window.display_handle()?.as_raw();
        let wh = window.window_handle()?.as_raw();
        Ok(ash_window::create_surface(&self.entry, instance, dh, wh, None)?)
    }

    unsafe fn destroy_surface(&self, surface: vk::SurfaceKHR) {
        if let Ok(s) = self.surface_fn() {
            s.destroy_surface(surface, None);
        }
    }

    unsafe fn enumerate_physical_devices(&self) -> VkResult<Vec<vk::PhysicalDevice>> {
        self.instance()?.enumerate_physical_devices()
    }

    unsafe fn physical_device_properties(
        &self,
        pd: vk::PhysicalDevice,
    ) -> VkResult<vk::PhysicalDeviceProperties> {
        Ok(self.instance()?.get_physical_device_properties(pd))
    }

    unsafe fn physical_device_features(
        &self,
        pd: vk::PhysicalDevice,
    ) -> VkResult<vk::PhysicalDeviceFeatures> {
        Ok(self.instance()?.get_physical_device_features(pd))
    }

    unsafe fn enumerate_device_extensions(
        &self,
        pd: vk::PhysicalDevice,
    ) -> VkResult<Vec<CString>> {
        let props = self.instance()?.enumerate_device_extension_properties(pd)?;
        Ok(props
            .iter()
            .filter_map(|p| p.extension_name_as_c_str().ok().map(CStr::to_owned))
            .collect())
    }

    unsafe fn queue_family_properties(
        &self,
        pd: vk::PhysicalDevice,
    ) -> VkResult<Vec<vk::QueueFamilyProperties>> {
        Ok(self
            .instance()?
            .get_physical_device_queue_family_properties(pd))
    }

    unsafe fn surface_support(
        &self,
        pd: vk::PhysicalDevice,
        family: u32,
        surface: vk::SurfaceKHR,
    ) -> VkResult<bool> {
        self.surface_fn()?
            .get_physical_device_surface_support(pd, family, surface)
    }

    unsafe fn surface_capabilities(
        &self,
        pd: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR> {
        self.surface_fn()?
            .get_physical_device_surface_capabilities(pd, surface)
    }

    unsafe fn surface_formats(
        &self,
        pd: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::SurfaceFormatKHR>> {
        self.surface_fn()?
            .get_physical_device_surface_formats(pd, surface)
    }

    unsafe fn surface_present_modes(
        &self,
        pd: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::PresentModeKHR>> {
        self.surface_fn()?
            .get_physical_device_surface_present_modes(pd, surface)
    }

    unsafe fn create_device(
        &mut self,
        pd: vk::PhysicalDevice,
        info: &vk::DeviceCreateInfo<'_>,
    ) -> VkResult<vk::Device> {
        let instance = self.instance()?;
        let device = instance.create_device(pd, info, None)?;
        let swapchain_fn = swapchain::Device::new(instance, &device);
        let handle = device.handle();
        self.swapchain_fn = Some(swapchain_fn);
        self.device = Some(device);
        Ok(handle)
    }

    unsafe fn destroy_device(&mut self, _device: vk::Device) {
        self.swapchain_fn = None;
        if let Some(device) = self.device.take() {
            device.destroy_device(None);
        }
    }

    unsafe fn get_device_queue(&self, family: u32, index: u32) -> vk::Queue {
        self.device()
            .map(|d| d.get_device_queue(family, index))
            .unwrap_or_default()
    }

    unsafe fn device_wait_idle(&self) -> VkResult<()> {
        self.device()?.device_wait_idle()
    }

    unsafe fn create_swapchain(
        &self,
        info: &vk::SwapchainCreateInfoKHR<'_>,
    ) -> VkResult<vk::SwapchainKHR> {
        self.swapchain_fn()?.create_swapchain(info, None)
    }

    unsafe fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> VkResult<Vec<vk::Image>> {
        self.swapchain_fn()?.get_swapchain_images(swapchain)
    }

    unsafe fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR) {
        if let Ok(s) = self.swapchain_fn() {
            s.destroy_swapchain(swapchain, None);
        }
    }

    unsafe fn create_image_view(
        &self,
        info: &vk::ImageViewCreateInfo<'_>,
    ) -> VkResult<vk::ImageView> {
        self.device()?.create_image_view(info, None)
    }

    unsafe fn destroy_image_view(&self, view: vk::ImageView) {
        if let Ok(d) = self.device() {
            d.destroy_image_view(view, None);
        }
    }

    unsafe fn create_shader_module(
        &self,
        info: &vk::ShaderModuleCreateInfo<'_>,
    ) -> VkResult<vk::ShaderModule> {
        self.device()?.create_shader_module(info, None)
    }

    unsafe fn destroy_shader_module(&self, module: vk::ShaderModule) {
        if let Ok(d) = self.device() {
            d.destroy_shader_module(module, None);
        }
    }

    unsafe fn create_render_pass(
        &self,
        info: &vk::RenderPassCreateInfo<'_>,
    ) -> VkResult<vk::RenderPass> {
        self.device()?.create_render_pass(info, None)
    }

    unsafe fn destroy_render_pass(&self, render_pass: vk::RenderPass) {
        if let Ok(d) = self.device() {
            d.destroy_render_pass(render_pass, None);
        }
    }

    unsafe fn create_pipeline_layout(
        &self,
        info: &vk::PipelineLayoutCreateInfo<'_>,
    ) -> VkResult<vk::PipelineLayout> {
        self.device()?.create_pipeline_layout(info, None)
    }

    unsafe fn destroy_pipeline_layout(&self, layout: vk::PipelineLayout) {
        if let Ok(d) = self.device() {
            d.destroy_pipeline_layout(layout, None);
        }
    }

    unsafe fn create_graphics_pipeline(
        &self,
        info: &vk::GraphicsPipelineCreateInfo<'_>,
    ) -> VkResult<vk::Pipeline> {
        let d = self.device()?;
        match d.create_graphics_pipelines(vk::PipelineCache::null(), slice::from_ref(info), None) {
            Ok(pipelines) => pipelines
                .into_iter()
                .next()
                .ok_or(vk::Result::ERROR_UNKNOWN),
            Err((pipelines, err)) => {
                for p in pipelines.into_iter().filter(|p| *p != vk::Pipeline::null()) {
                    d.destroy_pipeline(p, None);
                }
                Err(err)
            }
        }
    }

    unsafe fn destroy_pipeline(&self, pipeline: vk::Pipeline) {
        if let Ok(d) = self.device() {
            d.destroy_pipeline(pipeline, None);
        }
    }

    unsafe fn create_framebuffer(
        &self,
        info: &vk::FramebufferCreateInfo<'_>,
    ) -> VkResult<vk::Framebuffer> {
        self.device()?.create_framebuffer(info, None)
    }

    unsafe fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer) {
        if let Ok(d) = self.device() {
            d.destroy_framebuffer(framebuffer, None);
        }
    }

    unsafe fn create_command_pool(
        &self,
        info: &vk::CommandPoolCreateInfo<'_>,
    ) -> VkResult<vk::CommandPool> {
        self.device()?.create_command_pool(info, None)
    }

    unsafe fn destroy_command_pool(&self, pool: vk::CommandPool) {
        if let Ok(d) = self.device() {
            d.destroy_command_pool(pool, None);
        }
    }

    unsafe fn allocate_command_buffers(
        &self,
        info: &vk::CommandBufferAllocateInfo<'_>,
    ) -> VkResult<Vec<vk::CommandBuffer>> {
        self.device()?.allocate_command_buffers(info)
    }

    unsafe fn reset_command_buffer(&self, cmd: vk::CommandBuffer) -> VkResult<()> {
        self.device()?
            .reset_command_buffer(cmd, vk::CommandBufferResetFlags::empty())
    }

    unsafe fn begin_command_buffer(
        &self,
        cmd: vk::CommandBuffer,
        info: &vk::CommandBufferBeginInfo<'_>,
    ) -> VkResult<()> {
        self.device()?.begin_command_buffer(cmd, info)
    }

    unsafe fn cmd_begin_render_pass(
        &self,
        cmd: vk::CommandBuffer,
        info: &vk::RenderPassBeginInfo<'_>,
    ) {
        if let Ok(d) = self.device() {
            d.cmd_begin_render_pass(cmd, info, vk::SubpassContents::INLINE);
        }
    }

    unsafe fn cmd_bind_graphics_pipeline(&self, cmd: vk::CommandBuffer, pipeline: vk::Pipeline) {
        if let Ok(d) = self.device() {
            d.cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, pipeline);
        }
    }

    unsafe fn cmd_draw(&self, cmd: vk::CommandBuffer, vertex_count: u32, instance_count: u32) {
        if let Ok(d) = self.device() {
            d.cmd_draw(cmd, vertex_count, instance_count, 0, 0);
        }
    }

    unsafe fn cmd_end_render_pass(&self, cmd: vk::CommandBuffer) {
        if let Ok(d) = self.device() {
            d.cmd_end_render_pass(cmd);
        }
    }

    unsafe fn end_command_buffer(&self, cmd: vk::CommandBuffer) -> VkResult<()> {
        self.device()?.end_command_buffer(cmd)
    }

    unsafe fn create_semaphore(&self) -> VkResult<vk::Semaphore> {
        let info = vk::SemaphoreCreateInfo::default();
        self.device()?.create_semaphore(&info, None)
    }

    unsafe fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        if let Ok(d) = self.device() {
            d.destroy_semaphore(semaphore, None);
        }
    }

    unsafe fn create_fence(&self, signaled: bool) -> VkResult<vk::Fence> {
        let info = vk::FenceCreateInfo {
            s_type: vk::StructureType::FENCE_CREATE_INFO,
            flags: if signaled {
                vk::FenceCreateFlags::SIGNALED
            } else {
                vk::FenceCreateFlags::empty()
            },
            ..Default::default()
        };
        self.device()?.create_fence(&info, None)
    }

    unsafe fn destroy_fence(&self, fence: vk::Fence) {
        if let Ok(d) = self.device() {
            d.destroy_fence(fence, None);
        }
    }

    unsafe fn wait_for_fence(&self, fence: vk::Fence, timeout: u64) -> VkResult<()> {
        self.device()?.wait_for_fences(&[fence], true, timeout)
    }

    unsafe fn reset_fence(&self, fence: vk::Fence) -> VkResult<()> {
        self.device()?.reset_fences(&[fence])
    }

    unsafe fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        timeout: u64,
        semaphore: vk::Semaphore,
    ) -> VkResult<(u32, bool)> {
        self.swapchain_fn()?
            .acquire_next_image(swapchain, timeout, semaphore, vk::Fence::null())
    }

    unsafe fn queue_submit(
        &self,
        queue: vk::Queue,
        submit: &vk::SubmitInfo<'_>,
        fence: vk::Fence,
    ) -> VkResult<()> {
        self.device()?
            .queue_submit(queue, slice::from_ref(submit), fence)
    }

    unsafe fn queue_present(
        &self,
        queue: vk::Queue,
        info: &vk::PresentInfoKHR<'_>,
    ) -> VkResult<bool> {
        self.swapchain_fn()?.queue_present(queue, info)
    }
}
