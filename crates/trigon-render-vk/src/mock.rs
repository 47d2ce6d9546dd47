// SPDX-License-Identifier: CEPL-1.0
//! In-memory `Driver` and `Window` for exercising the lifecycle logic without a
//! GPU. Every create/destroy is logged and checked: destroying something that
//! is not alive, or tearing down a parent while children are alive, panics.
use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::ffi::{CStr, CString};
use std::rc::Rc;

use ash::prelude::VkResult;
use ash::vk::{self, Handle};
use raw_window_handle::{
    DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, WindowHandle,
};
use trigon_render::{RenderSize, Window};

use crate::driver::Driver;
use crate::error::SurfaceGlueError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    Instance,
    Messenger,
    Surface,
    Device,
    Swapchain,
    ImageView,
    ShaderModule,
    RenderPass,
    PipelineLayout,
    Pipeline,
    Framebuffer,
    CommandPool,
    Semaphore,
    Fence,
}

impl Kind {
    pub const ALL: [Kind; 14] = [
        Kind::Instance,
        Kind::Messenger,
        Kind::Surface,
        Kind::Device,
        Kind::Swapchain,
        Kind::ImageView,
        Kind::ShaderModule,
        Kind::RenderPass,
        Kind::PipelineLayout,
        Kind::Pipeline,
        Kind::Framebuffer,
        Kind::CommandPool,
        Kind::Semaphore,
        Kind::Fence,
    ];

    fn is_device_child(self) -> bool {
        !matches!(
            self,
            Kind::Instance | Kind::Messenger | Kind::Surface | Kind::Device
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Create(Kind, u64),
    CreateFailed(Kind),
    Destroy(Kind, u64),
    WaitFence(u64),
    ResetFence(u64),
    Acquire { semaphore: u64 },
    ResetCommandBuffer(u64),
    BeginRenderPass { cmd: u64, framebuffer: u64, extent: vk::Extent2D },
    BindPipeline(u64),
    Draw { vertices: u32, instances: u32 },
    Submit { fence: u64, wait: u64, signal: u64 },
    Present { image: u32, wait: u64 },
    WaitIdle,
}

#[derive(Clone, Debug)]
pub struct MockDevice {
    pub device_type: vk::PhysicalDeviceType,
    pub geometry_shader: bool,
    pub extensions: Vec<CString>,
    /// (flags, can present to the surface)
    pub queue_families: Vec<(vk::QueueFlags, bool)>,
}

impl MockDevice {
    pub fn gpu() -> Self {
        Self {
            device_type: vk::PhysicalDeviceType::DISCRETE_GPU,
            geometry_shader: true,
            extensions: vec![ash::khr::swapchain::NAME.to_owned()],
            queue_families: vec![(vk::QueueFlags::GRAPHICS | vk::QueueFlags::TRANSFER, true)],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwapchainRecord {
    pub extent: vk::Extent2D,
    pub format: vk::Format,
    pub present_mode: vk::PresentModeKHR,
    pub min_image_count: u32,
    pub sharing_mode: vk::SharingMode,
}

pub struct MockState {
    next_handle: u64,
    pub events: Vec<Event>,
    live: HashSet<(Kind, u64)>,
    created: HashMap<Kind, usize>,
    destroyed: HashMap<Kind, usize>,
    attempts: HashMap<Kind, usize>,
    failures: HashMap<Kind, usize>,
    /// Fences reset and not yet handed to a submit.
    unsignaled: HashSet<u64>,

    pub layers: Vec<CString>,
    pub debug_utils: bool,
    pub fail_extension_query: bool,
    pub devices: Vec<MockDevice>,
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
    pub fail_capabilities: bool,
    pub fail_formats: bool,
    pub fail_present_modes: bool,
    pub image_count: u32,
    pub fail_end_command_buffer: bool,
    pub acquire_script: VecDeque<VkResult<bool>>,
    pub present_script: VecDeque<VkResult<bool>>,

    pub swapchains: Vec<SwapchainRecord>,
    pub framebuffer_extents: Vec<vk::Extent2D>,
    pub instance_layers: Vec<CString>,
    pub instance_extensions: Vec<CString>,
    pub instance_debug_chained: bool,
    pub device_extensions: Vec<CString>,
    pub device_queue_families: Vec<u32>,
    pub command_buffers_allocated: u32,
    next_image: u32,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            next_handle: 0x100,
            events: Vec::new(),
            live: HashSet::new(),
            created: HashMap::new(),
            destroyed: HashMap::new(),
            attempts: HashMap::new(),
            failures: HashMap::new(),
            unsignaled: HashSet::new(),
            layers: vec![c"VK_LAYER_KHRONOS_validation".to_owned()],
            debug_utils: true,
            fail_extension_query: false,
            devices: vec![MockDevice::gpu()],
            capabilities: vk::SurfaceCapabilitiesKHR {
                min_image_count: 2,
                max_image_count: 8,
                current_extent: vk::Extent2D {
                    width: u32::MAX,
                    height: u32::MAX,
                },
                min_image_extent: vk::Extent2D {
                    width: 1,
                    height: 1,
                },
                max_image_extent: vk::Extent2D {
                    width: 4096,
                    height: 4096,
                },
                max_image_array_layers: 1,
                current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
                ..Default::default()
            },
            formats: vec![vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_SRGB,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            }],
            present_modes: vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX],
            fail_capabilities: false,
            fail_formats: false,
            fail_present_modes: false,
            image_count: 3,
            fail_end_command_buffer: false,
            acquire_script: VecDeque::new(),
            present_script: VecDeque::new(),
            swapchains: Vec::new(),
            framebuffer_extents: Vec::new(),
            instance_layers: Vec::new(),
            instance_extensions: Vec::new(),
            instance_debug_chained: false,
            device_extensions: Vec::new(),
            device_queue_families: Vec::new(),
            command_buffers_allocated: 0,
            next_image: 0,
        }
    }
}

impl MockState {
    pub fn created(&self, kind: Kind) -> usize {
        self.created.get(&kind).copied().unwrap_or(0)
    }

    pub fn destroyed(&self, kind: Kind) -> usize {
        self.destroyed.get(&kind).copied().unwrap_or(0)
    }

    pub fn live(&self, kind: Kind) -> usize {
        self.live.iter().filter(|(k, _)| *k == kind).count()
    }

    pub fn live_total(&self) -> usize {
        self.live.len()
    }

    /// The `n`-th (1-based) creation attempt of `kind` fails.
    pub fn fail_nth(&mut self, kind: Kind, n: usize) {
        self.failures.insert(kind, n);
    }

    pub fn fence_waits(&self, fence: u64) -> usize {
        self.events
            .iter()
            .filter(|e| **e == Event::WaitFence(fence))
            .count()
    }

    pub fn handles(&self, kind: Kind) -> Vec<u64> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Create(k, h) if *k == kind => Some(*h),
                _ => None,
            })
            .collect()
    }

    pub fn position(&self, event: &Event) -> Option<usize> {
        self.events.iter().position(|e| e == event)
    }

    fn create(&mut self, kind: Kind) -> VkResult<u64> {
        let attempt = self.attempts.entry(kind).or_default();
        *attempt += 1;
        if self.failures.get(&kind) == Some(attempt) {
            self.events.push(Event::CreateFailed(kind));
            return Err(vk::Result::ERROR_OUT_OF_HOST_MEMORY);
        }
        self.next_handle += 1;
        let handle = self.next_handle;
        self.live.insert((kind, handle));
        *self.created.entry(kind).or_default() += 1;
        self.events.push(Event::Create(kind, handle));
        Ok(handle)
    }

    fn destroy(&mut self, kind: Kind, handle: u64) {
        assert!(
            self.live.remove(&(kind, handle)),
            "destroying {kind:?} {handle:#x} which is not alive"
        );
        match kind {
            Kind::Device => assert!(
                self.live.iter().all(|(k, _)| !k.is_device_child()),
                "device destroyed while children are alive: {:?}",
                self.live
            ),
            Kind::Surface => assert_eq!(
                self.live(Kind::Swapchain),
                0,
                "surface destroyed under a live swap chain"
            ),
            Kind::Instance => assert!(
                self.live.is_empty(),
                "instance destroyed while objects are alive: {:?}",
                self.live
            ),
            _ => {}
        }
        *self.destroyed.entry(kind).or_default() += 1;
        self.events.push(Event::Destroy(kind, handle));
    }

    fn check_live(&self, kind: Kind, handle: u64) {
        assert!(
            self.live.contains(&(kind, handle)),
            "{kind:?} {handle:#x} used while not alive"
        );
    }
}

#[derive(Clone, Default)]
pub struct MockDriver {
    pub state: Rc<RefCell<MockState>>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(configure: impl FnOnce(&mut MockState)) -> Self {
        let driver = Self::new();
        configure(&mut driver.state.borrow_mut());
        driver
    }

    pub fn state(&self) -> std::cell::Ref<'_, MockState> {
        self.state.borrow()
    }

    fn device_at(&self, pd: vk::PhysicalDevice) -> MockDevice {
        let idx = (pd.as_raw() - 0x10) as usize;
        self.state.borrow().devices[idx].clone()
    }
}

impl Driver for MockDriver {
    fn required_instance_extensions(
        &self,
        _window: &dyn Window,
    ) -> Result<Vec<&'static CStr>, SurfaceGlueError> {
        if self.state.borrow().fail_extension_query {
            return Err(HandleError::Unavailable.into());
        }
        Ok(vec![ash::khr::surface::NAME])
    }

    fn enumerate_instance_layers(&self) -> VkResult<Vec<CString>> {
        Ok(self.state.borrow().layers.clone())
    }

    unsafe fn create_instance(
        &mut self,
        info: &vk::InstanceCreateInfo<'_>,
    ) -> VkResult<vk::Instance> {
        let mut s = self.state.borrow_mut();
        let names = |ptr: *const *const std::ffi::c_char, n: u32| -> Vec<CString> {
            (0..n as usize)
                .map(|i| CStr::from_ptr(*ptr.add(i)).to_owned())
                .collect()
        };
        s.instance_layers = names(info.pp_enabled_layer_names, info.enabled_layer_count);
        s.instance_extensions =
            names(info.pp_enabled_extension_names, info.enabled_extension_count);
        s.instance_debug_chained = !info.p_next.is_null();
        s.create(Kind::Instance).map(vk::Instance::from_raw)
    }

    unsafe fn destroy_instance(&mut self, instance: vk::Instance) {
        self.state
            .borrow_mut()
            .destroy(Kind::Instance, instance.as_raw());
    }

    fn has_debug_utils(&self) -> bool {
        self.state.borrow().debug_utils
    }

    unsafe fn create_debug_messenger(
        &self,
        info: &vk::DebugUtilsMessengerCreateInfoEXT<'_>,
    ) -> VkResult<vk::DebugUtilsMessengerEXT> {
        assert!(info.pfn_user_callback.is_some());
        self.state
            .borrow_mut()
            .create(Kind::Messenger)
            .map(vk::DebugUtilsMessengerEXT::from_raw)
    }

    unsafe fn destroy_debug_messenger(&self, messenger: vk::DebugUtilsMessengerEXT) {
        self.state
            .borrow_mut()
            .destroy(Kind::Messenger, messenger.as_raw());
    }

    unsafe fn create_surface(
        &self,
        _window: &dyn Window,
    ) -> Result<vk::SurfaceKHR, SurfaceGlueError> {
        Ok(self
            .state
            .borrow_mut()
            .create(Kind::Surface)
            .map(vk::SurfaceKHR::from_raw)?)
    }

    unsafe fn destroy_surface(&self, surface: vk::SurfaceKHR) {
        self.state
            .borrow_mut()
            .destroy(Kind::Surface, surface.as_raw());
    }

    unsafe fn enumerate_physical_devices(&self) -> VkResult<Vec<vk::PhysicalDevice>> {
        let count = self.state.borrow().devices.len() as u64;
        Ok((0..count)
            .map(|i| vk::PhysicalDevice::from_raw(0x10 + i))
            .collect())
    }

    unsafe fn physical_device_properties(
        &self,
        pd: vk::PhysicalDevice,
    ) -> VkResult<vk::PhysicalDeviceProperties> {
        let dev = self.device_at(pd);
        let name = CString::new(format!("Mock Device {:#x}", pd.as_raw())).unwrap();
        Ok(vk::PhysicalDeviceProperties {
            device_type: dev.device_type,
            ..Default::default()
        }
        .device_name(&name)
        .unwrap())
    }

    unsafe fn physical_device_features(
        &self,
        pd: vk::PhysicalDevice,
    ) -> VkResult<vk::PhysicalDeviceFeatures> {
        let dev = self.device_at(pd);
        Ok(vk::PhysicalDeviceFeatures {
            geometry_shader: dev.geometry_shader.into(),
            ..Default::default()
        })
    }

    unsafe fn enumerate_device_extensions(
        &self,
        pd: vk::PhysicalDevice,
    ) -> VkResult<Vec<CString>> {
        Ok(self.device_at(pd).extensions)
    }

    unsafe fn queue_family_properties(
        &self,
        pd: vk::PhysicalDevice,
    ) -> VkResult<Vec<vk::QueueFamilyProperties>> {
        Ok(self
            .device_at(pd)
            .queue_families
            .iter()
            .map(|(flags, _)| vk::QueueFamilyProperties {
                queue_flags: *flags,
                queue_count: 1,
                ..Default::default()
            })
            .collect())
    }

    unsafe fn surface_support(
        &self,
        pd: vk::PhysicalDevice,
        family: u32,
        surface: vk::SurfaceKHR,
    ) -> VkResult<bool> {
        self.state
            .borrow()
            .check_live(Kind::Surface, surface.as_raw());
        Ok(self.device_at(pd).queue_families[family as usize].1)
    }

    unsafe fn surface_capabilities(
        &self,
        _pd: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR> {
        let s = self.state.borrow();
        if s.fail_capabilities {
            return Err(vk::Result::ERROR_SURFACE_LOST_KHR);
        }
        Ok(s.capabilities)
    }

    unsafe fn surface_formats(
        &self,
        _pd: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::SurfaceFormatKHR>> {
        let s = self.state.borrow();
        if s.fail_formats {
            return Err(vk::Result::ERROR_SURFACE_LOST_KHR);
        }
        Ok(s.formats.clone())
    }

    unsafe fn surface_present_modes(
        &self,
        _pd: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::PresentModeKHR>> {
        let s = self.state.borrow();
        if s.fail_present_modes {
            return Err(vk::Result::ERROR_SURFACE_LOST_KHR);
        }
        Ok(s.present_modes.clone())
    }

    unsafe fn create_device(
        &mut self,
        _pd: vk::PhysicalDevice,
        info: &vk::DeviceCreateInfo<'_>,
    ) -> VkResult<vk::Device> {
        let mut s = self.state.borrow_mut();
        s.device_extensions = (0..info.enabled_extension_count as usize)
            .map(|i| CStr::from_ptr(*info.pp_enabled_extension_names.add(i)).to_owned())
            .collect();
        s.device_queue_families = (0..info.queue_create_info_count as usize)
            .map(|i| (*info.p_queue_create_infos.add(i)).queue_family_index)
            .collect();
        s.create(Kind::Device).map(vk::Device::from_raw)
    }

    unsafe fn destroy_device(&mut self, device: vk::Device) {
        self.state
            .borrow_mut()
            .destroy(Kind::Device, device.as_raw());
    }

    unsafe fn get_device_queue(&self, family: u32, index: u32) -> vk::Queue {
        vk::Queue::from_raw(0xA000 + u64::from(family) * 0x10 + u64::from(index))
    }

    unsafe fn device_wait_idle(&self) -> VkResult<()> {
        self.state.borrow_mut().events.push(Event::WaitIdle);
        Ok(())
    }

    unsafe fn create_swapchain(
        &self,
        info: &vk::SwapchainCreateInfoKHR<'_>,
    ) -> VkResult<vk::SwapchainKHR> {
        let mut s = self.state.borrow_mut();
        s.check_live(Kind::Surface, info.surface.as_raw());
        let handle = s.create(Kind::Swapchain)?;
        s.swapchains.push(SwapchainRecord {
            extent: info.image_extent,
            format: info.image_format,
            present_mode: info.present_mode,
            min_image_count: info.min_image_count,
            sharing_mode: info.image_sharing_mode,
        });
        s.next_image = 0;
        Ok(vk::SwapchainKHR::from_raw(handle))
    }

    unsafe fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> VkResult<Vec<vk::Image>> {
        let s = self.state.borrow();
        s.check_live(Kind::Swapchain, swapchain.as_raw());
        Ok((0..u64::from(s.image_count))
            .map(|i| vk::Image::from_raw(0xF000 + i))
            .collect())
    }

    unsafe fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR) {
        self.state
            .borrow_mut()
            .destroy(Kind::Swapchain, swapchain.as_raw());
    }

    unsafe fn create_image_view(
        &self,
        _info: &vk::ImageViewCreateInfo<'_>,
    ) -> VkResult<vk::ImageView> {
        self.state
            .borrow_mut()
            .create(Kind::ImageView)
            .map(vk::ImageView::from_raw)
    }

    unsafe fn destroy_image_view(&self, view: vk::ImageView) {
        self.state
            .borrow_mut()
            .destroy(Kind::ImageView, view.as_raw());
    }

    unsafe fn create_shader_module(
        &self,
        info: &vk::ShaderModuleCreateInfo<'_>,
    ) -> VkResult<vk::ShaderModule> {
        assert_eq!(info.code_size % 4, 0);
        self.state
            .borrow_mut()
            .create(Kind::ShaderModule)
            .map(vk::ShaderModule::from_raw)
    }

    unsafe fn destroy_shader_module(&self, module: vk::ShaderModule) {
        self.state
            .borrow_mut()
            .destroy(Kind::ShaderModule, module.as_raw());
    }

    unsafe fn create_render_pass(
        &self,
        _info: &vk::RenderPassCreateInfo<'_>,
    ) -> VkResult<vk::RenderPass> {
        self.state
            .borrow_mut()
            .create(Kind::RenderPass)
            .map(vk::RenderPass::from_raw)
    }

    unsafe fn destroy_render_pass(&self, render_pass: vk::RenderPass) {
        self.state
            .borrow_mut()
            .destroy(Kind::RenderPass, render_pass.as_raw());
    }

    unsafe fn create_pipeline_layout(
        &self,
        _info: &vk::PipelineLayoutCreateInfo<'_>,
    ) -> VkResult<vk::PipelineLayout> {
        self.state
            .borrow_mut()
            .create(Kind::PipelineLayout)
            .map(vk::PipelineLayout::from_raw)
    }

    unsafe fn destroy_pipeline_layout(&self, layout: vk::PipelineLayout) {
        self.state
            .borrow_mut()
            .destroy(Kind::PipelineLayout, layout.as_raw());
    }

    unsafe fn create_graphics_pipeline(
        &self,
        info: &vk::GraphicsPipelineCreateInfo<'_>,
    ) -> VkResult<vk::Pipeline> {
        let mut s = self.state.borrow_mut();
        s.check_live(Kind::RenderPass, info.render_pass.as_raw());
        s.check_live(Kind::PipelineLayout, info.layout.as_raw());
        s.create(Kind::Pipeline).map(vk::Pipeline::from_raw)
    }

    unsafe fn destroy_pipeline(&self, pipeline: vk::Pipeline) {
        self.state
            .borrow_mut()
            .destroy(Kind::Pipeline, pipeline.as_raw());
    }

    unsafe fn create_framebuffer(
        &self,
        info: &vk::FramebufferCreateInfo<'_>,
    ) -> VkResult<vk::Framebuffer> {
        let mut s = self.state.borrow_mut();
        s.check_live(Kind::RenderPass, info.render_pass.as_raw());
        let handle = s.create(Kind::Framebuffer)?;
        s.framebuffer_extents.push(vk::Extent2D {
            width: info.width,
            height: info.height,
        });
        Ok(vk::Framebuffer::from_raw(handle))
    }

    unsafe fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer) {
        self.state
            .borrow_mut()
            .destroy(Kind::Framebuffer, framebuffer.as_raw());
    }

    unsafe fn create_command_pool(
        &self,
        info: &vk::CommandPoolCreateInfo<'_>,
    ) -> VkResult<vk::CommandPool> {
        assert!(info
            .flags
            .contains(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER));
        self.state
            .borrow_mut()
            .create(Kind::CommandPool)
            .map(vk::CommandPool::from_raw)
    }

    unsafe fn destroy_command_pool(&self, pool: vk::CommandPool) {
        self.state
            .borrow_mut()
            .destroy(Kind::CommandPool, pool.as_raw());
    }

    unsafe fn allocate_command_buffers(
        &self,
        info: &vk::CommandBufferAllocateInfo<'_>,
    ) -> VkResult<Vec<vk::CommandBuffer>> {
        let mut s = self.state.borrow_mut();
        s.check_live(Kind::CommandPool, info.command_pool.as_raw());
        s.command_buffers_allocated += info.command_buffer_count;
        Ok((0..u64::from(info.command_buffer_count))
            .map(|i| vk::CommandBuffer::from_raw(0xC000 + i))
            .collect())
    }

    unsafe fn reset_command_buffer(&self, cmd: vk::CommandBuffer) -> VkResult<()> {
        self.state
            .borrow_mut()
            .events
            .push(Event::ResetCommandBuffer(cmd.as_raw()));
        Ok(())
    }

    unsafe fn begin_command_buffer(
        &self,
        _cmd: vk::CommandBuffer,
        info: &vk::CommandBufferBeginInfo<'_>,
    ) -> VkResult<()> {
        assert!(info
            .flags
            .contains(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT));
        Ok(())
    }

    unsafe fn cmd_begin_render_pass(
        &self,
        cmd: vk::CommandBuffer,
        info: &vk::RenderPassBeginInfo<'_>,
    ) {
        let mut s = self.state.borrow_mut();
        s.check_live(Kind::Framebuffer, info.framebuffer.as_raw());
        s.events.push(Event::BeginRenderPass {
            cmd: cmd.as_raw(),
            framebuffer: info.framebuffer.as_raw(),
            extent: info.render_area.extent,
        });
    }

    unsafe fn cmd_bind_graphics_pipeline(&self, _cmd: vk::CommandBuffer, pipeline: vk::Pipeline) {
        let mut s = self.state.borrow_mut();
        s.check_live(Kind::Pipeline, pipeline.as_raw());
        s.events.push(Event::BindPipeline(pipeline.as_raw()));
    }

    unsafe fn cmd_draw(&self, _cmd: vk::CommandBuffer, vertex_count: u32, instance_count: u32) {
        self.state.borrow_mut().events.push(Event::Draw {
            vertices: vertex_count,
            instances: instance_count,
        });
    }

    unsafe fn cmd_end_render_pass(&self, _cmd: vk::CommandBuffer) {}

    unsafe fn end_command_buffer(&self, _cmd: vk::CommandBuffer) -> VkResult<()> {
        if self.state.borrow().fail_end_command_buffer {
            return Err(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY);
        }
        Ok(())
    }

    unsafe fn create_semaphore(&self) -> VkResult<vk::Semaphore> {
        self.state
            .borrow_mut()
            .create(Kind::Semaphore)
            .map(vk::Semaphore::from_raw)
    }

    unsafe fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        self.state
            .borrow_mut()
            .destroy(Kind::Semaphore, semaphore.as_raw());
    }

    unsafe fn create_fence(&self, signaled: bool) -> VkResult<vk::Fence> {
        assert!(signaled, "in-flight fences start signaled");
        self.state
            .borrow_mut()
            .create(Kind::Fence)
            .map(vk::Fence::from_raw)
    }

    unsafe fn destroy_fence(&self, fence: vk::Fence) {
        self.state
            .borrow_mut()
            .destroy(Kind::Fence, fence.as_raw());
    }

    unsafe fn wait_for_fence(&self, fence: vk::Fence, timeout: u64) -> VkResult<()> {
        assert_eq!(timeout, u64::MAX);
        let mut s = self.state.borrow_mut();
        s.check_live(Kind::Fence, fence.as_raw());
        assert!(
            !s.unsignaled.contains(&fence.as_raw()),
            "waiting on fence {:#x} that nothing will signal",
            fence.as_raw()
        );
        s.events.push(Event::WaitFence(fence.as_raw()));
        Ok(())
    }

    unsafe fn reset_fence(&self, fence: vk::Fence) -> VkResult<()> {
        let mut s = self.state.borrow_mut();
        s.check_live(Kind::Fence, fence.as_raw());
        s.unsignaled.insert(fence.as_raw());
        s.events.push(Event::ResetFence(fence.as_raw()));
        Ok(())
    }

    unsafe fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        _timeout: u64,
        semaphore: vk::Semaphore,
    ) -> VkResult<(u32, bool)> {
        let mut s = self.state.borrow_mut();
        s.check_live(Kind::Swapchain, swapchain.as_raw());
        s.events.push(Event::Acquire {
            semaphore: semaphore.as_raw(),
        });
        let suboptimal = s.acquire_script.pop_front().unwrap_or(Ok(false))?;
        let index = s.next_image;
        s.next_image = (s.next_image + 1) % s.image_count;
        Ok((index, suboptimal))
    }

    unsafe fn queue_submit(
        &self,
        _queue: vk::Queue,
        submit: &vk::SubmitInfo<'_>,
        fence: vk::Fence,
    ) -> VkResult<()> {
        assert_eq!(submit.wait_semaphore_count, 1);
        assert_eq!(submit.signal_semaphore_count, 1);
        assert_eq!(
            *submit.p_wait_dst_stage_mask,
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
        );
        let mut s = self.state.borrow_mut();
        s.unsignaled.remove(&fence.as_raw());
        s.events.push(Event::Submit {
            fence: fence.as_raw(),
            wait: (*submit.p_wait_semaphores).as_raw(),
            signal: (*submit.p_signal_semaphores).as_raw(),
        });
        Ok(())
    }

    unsafe fn queue_present(
        &self,
        _queue: vk::Queue,
        info: &vk::PresentInfoKHR<'_>,
    ) -> VkResult<bool> {
        let mut s = self.state.borrow_mut();
        s.check_live(Kind::Swapchain, (*info.p_swapchains).as_raw());
        s.events.push(Event::Present {
            image: *info.p_image_indices,
            wait: (*info.p_wait_semaphores).as_raw(),
        });
        s.present_script.pop_front().unwrap_or(Ok(false))
    }
}

/// Scripted window: resizes fire the registered callback like a real event
/// pump would, and `wait_events` steps through queued sizes.
pub struct MockWindow {
    size: RenderSize,
    on_wait: VecDeque<RenderSize>,
    callback: Option<Box<dyn FnMut(RenderSize)>>,
    pub polls: u32,
    pub waits: u32,
    pub close: bool,
}

impl MockWindow {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: RenderSize::new(width, height),
            on_wait: VecDeque::new(),
            callback: None,
            polls: 0,
            waits: 0,
            close: false,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.size = RenderSize::new(width, height);
        if let Some(cb) = self.callback.as_mut() {
            cb(self.size);
        }
    }

    /// Sizes reported one by one on successive `wait_events` calls.
    pub fn queue_sizes(&mut self, sizes: impl IntoIterator<Item = (u32, u32)>) {
        self.on_wait
            .extend(sizes.into_iter().map(|(w, h)| RenderSize::new(w, h)));
    }
}

impl HasWindowHandle for MockWindow {
    fn window_handle(&self) -> Result<WindowHandle<'_>, HandleError> {
        Err(HandleError::Unavailable)
    }
}

impl HasDisplayHandle for MockWindow {
    fn display_handle(&self) -> Result<DisplayHandle<'_>, HandleError> {
        Err(HandleError::Unavailable)
    }
}

impl Window for MockWindow {
    fn framebuffer_size(&self) -> RenderSize {
        self.size
    }

    fn poll_events(&mut self) {
        self.polls += 1;
    }

    fn wait_events(&mut self) {
        self.waits += 1;
        assert!(self.waits < 1000, "window never left the zero-size state");
        if let Some(next) = self.on_wait.pop_front() {
            self.resize(next.width, next.height);
        }
    }

    fn should_close(&self) -> bool {
        self.close
    }

    fn on_resize(&mut self, callback: Box<dyn FnMut(RenderSize)>) {
        self.callback = Some(callback);
    }
}
