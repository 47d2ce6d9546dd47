// SPDX-License-Identifier: CEPL-1.0
use std::ffi::{c_void, CStr, CString};

use ash::vk;
use tracing::{debug, info, warn};
use trigon_render::Window;

use crate::debug::messenger_create_info;
use crate::driver::Driver;
use crate::error::{Result, VkError};

pub const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

const APP_NAME: &CStr = c"Hello Triangle";
const ENGINE_NAME: &CStr = c"Trigon";

/// Which physical device types qualify during selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DevicePreference {
    /// Integrated or discrete GPU.
    Hardware,
    /// CPU implementation (lavapipe, llvmpipe, SwiftShader).
    Software,
}

impl DevicePreference {
    /// Compile-time default, switched by the `software` feature.
    pub const fn from_build() -> Self {
        if cfg!(feature = "software") {
            Self::Software
        } else {
            Self::Hardware
        }
    }

    pub fn accepts(self, ty: vk::PhysicalDeviceType) -> bool {
        match self {
            Self::Hardware => matches!(
                ty,
                vk::PhysicalDeviceType::INTEGRATED_GPU | vk::PhysicalDeviceType::DISCRETE_GPU
            ),
            Self::Software => ty == vk::PhysicalDeviceType::CPU,
        }
    }
}

/// What the caller asks of the device context. Zero validation layers means
/// no validation and no debug messenger.
#[derive(Clone, Debug)]
pub struct ContextDesc {
    pub validation_layers: Vec<&'static CStr>,
    pub instance_extensions: Vec<&'static CStr>,
    pub device_extensions: Vec<&'static CStr>,
    pub device_preference: DevicePreference,
}

impl ContextDesc {
    pub fn new(validation: bool, device_preference: DevicePreference) -> Self {
        let (validation_layers, instance_extensions) = if validation {
            (vec![VALIDATION_LAYER], vec![ash::ext::debug_utils::NAME])
        } else {
            (Vec::new(), Vec::new())
        };
        Self {
            validation_layers,
            instance_extensions,
            device_extensions: vec![ash::khr::swapchain::NAME],
            device_preference,
        }
    }

    pub fn validation(&self) -> bool {
        !self.validation_layers.is_empty()
    }
}

impl Default for ContextDesc {
    fn default() -> Self {
        Self::new(cfg!(debug_assertions), DevicePreference::from_build())
    }
}

/// Instance, debug messenger, surface and logical device, plus the queue the
/// rest of the renderer submits to. Every owned handle is optional so teardown
/// can run on a partially built context.
#[derive(Debug, Default)]
pub struct DeviceContext {
    instance: Option<vk::Instance>,
    messenger: Option<vk::DebugUtilsMessengerEXT>,
    surface: Option<vk::SurfaceKHR>,
    device: Option<vk::Device>,
    pub physical_device: vk::PhysicalDevice,
    pub graphics_family: u32,
    pub present_family: u32,
    pub graphics_queue: vk::Queue,
    pub present_queue: vk::Queue,
}

impl DeviceContext {
    pub fn create<D: Driver>(driver: &mut D, window: &dyn Window, desc: &ContextDesc) -> Result<Self> {
        let mut ctx = Self::default();
        match ctx.build(driver, window, desc) {
            Ok(()) => Ok(ctx),
            Err(e) => {
                ctx.destroy(driver);
                Err(e)
            }
        }
    }

    fn build<D: Driver>(&mut self, driver: &mut D, window: &dyn Window, desc: &ContextDesc) -> Result<()> {
        // 1) extensions: window's list first, then ours
        let mut extensions = driver
            .required_instance_extensions(window)
            .map_err(VkError::ExtensionQuery)?;
        for &ext in &desc.instance_extensions {
            if !extensions.contains(&ext) {
                extensions.push(ext);
            }
        }

        // 2) layers
        if desc.validation() {
            let available = driver
                .enumerate_instance_layers()
                .map_err(VkError::LayerQuery)?;
            check_layers(&desc.validation_layers, &available)?;
        }

        // 3) instance, with the messenger chained so creation itself is covered
        let debug_info = messenger_create_info();
        let instance = unsafe { create_instance(driver, &extensions, desc, &debug_info) }
            .map_err(VkError::InstanceCreation)?;
        self.instance = Some(instance);
        debug!(extensions = extensions.len(), "instance created");

        // 4) debug messenger
        if desc.validation() {
            if !driver.has_debug_utils() {
                return Err(VkError::DebugMessenger(vk::Result::ERROR_EXTENSION_NOT_PRESENT));
            }
            let messenger = unsafe { driver.create_debug_messenger(&debug_info) }
                .map_err(VkError::DebugMessenger)?;
            self.messenger = Some(messenger);
        }

        // 5) surface
        let surface =
            unsafe { driver.create_surface(window) }.map_err(VkError::SurfaceCreation)?;
        self.surface = Some(surface);

        // 6) physical device
        let (pd, features) = unsafe { pick_physical_device(driver, desc)? };
        self.physical_device = pd;

        // 7) queue family
        let family = unsafe { pick_queue_family(driver, pd, surface)? };
        self.graphics_family = family;
        self.present_family = family;

        // 8) logical device
        let device = unsafe { create_device(driver, pd, &features, self.queue_families(), desc) }
            .map_err(VkError::DeviceCreation)?;
        self.device = Some(device);

        // 9) queues
        unsafe {
            self.graphics_queue = driver.get_device_queue(self.graphics_family, 0);
            self.present_queue = driver.get_device_queue(self.present_family, 0);
        }
        info!(family, "device ready");
        Ok(())
    }

    /// Reverse creation order; any subset of handles may be missing and a second
    /// call is a no-op.
    pub fn destroy<D: Driver>(&mut self, driver: &mut D) {
        unsafe {
            if let Some(device) = self.device.take() {
                driver.destroy_device(device);
            }
            if let Some(surface) = self.surface.take() {
                driver.destroy_surface(surface);
            }
            if let Some(messenger) = self.messenger.take() {
                driver.destroy_debug_messenger(messenger);
            }
            if let Some(instance) = self.instance.take() {
                driver.destroy_instance(instance);
                debug!("device context destroyed");
            }
        }
    }

    pub fn surface(&self) -> vk::SurfaceKHR {
        self.surface.unwrap_or_default()
    }

    pub fn is_alive(&self) -> bool {
        self.device.is_some()
    }

    /// Distinct queue families the device serves; one entry when graphics and
    /// present share a family.
    pub fn queue_families(&self) -> Vec<u32> {
        let mut families = vec![self.graphics_family];
        if self.present_family != self.graphics_family {
            families.push(self.present_family);
        }
        families
    }
}

fn check_layers(requested: &[&CStr], available: &[CString]) -> Result<()> {
    for &layer in requested {
        if !available.iter().any(|a| a.as_c_str() == layer) {
            return Err(VkError::LayerUnavailable(layer.to_string_lossy().into_owned()));
        }
    }
    Ok(())
}

unsafe fn create_instance<D: Driver>(
    driver: &mut D,
    extensions: &[&CStr],
    desc: &ContextDesc,
    debug_info: &vk::DebugUtilsMessengerCreateInfoEXT<'_>,
) -> ash::prelude::VkResult<vk::Instance> {
    let app_info = vk::ApplicationInfo {
        s_type: vk::StructureType::APPLICATION_INFO,
        p_application_name: APP_NAME.as_ptr(),
        application_version: vk::make_api_version(0, 1, 0, 0),
        p_engine_name: ENGINE_NAME.as_ptr(),
        engine_version: vk::make_api_version(0, 0, 1, 0),
        api_version: vk::API_VERSION_1_3,
        ..Default::default()
    };

    let ext_ptrs: Vec<_> = extensions.iter().map(|e| e.as_ptr()).collect();
    let layer_ptrs: Vec<_> = desc.validation_layers.iter().map(|l| l.as_ptr()).collect();

    let create_info = vk::InstanceCreateInfo {
        s_type: vk::StructureType::INSTANCE_CREATE_INFO,
        p_next: if desc.validation() {
            (debug_info as *const vk::DebugUtilsMessengerCreateInfoEXT<'_>).cast::<c_void>()
        } else {
            std::ptr::null()
        },
        p_application_info: &app_info,
        enabled_layer_count: layer_ptrs.len() as u32,
        pp_enabled_layer_names: layer_ptrs.as_ptr(),
        enabled_extension_count: ext_ptrs.len() as u32,
        pp_enabled_extension_names: ext_ptrs.as_ptr(),
        ..Default::default()
    };

    driver.create_instance(&create_info)
}

/// First device of the preferred type with geometry shaders and every
/// requested device extension.
unsafe fn pick_physical_device<D: Driver>(
    driver: &D,
    desc: &ContextDesc,
) -> Result<(vk::PhysicalDevice, vk::PhysicalDeviceFeatures)> {
    let devices = driver
        .enumerate_physical_devices()
        .map_err(VkError::DeviceEnumeration)?;
    if devices.is_empty() {
        return Err(VkError::NoDeviceFound);
    }

    for pd in devices {
        let Ok(props) = driver.physical_device_properties(pd) else {
            continue;
        };
        let name = props
            .device_name_as_c_str()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if !desc.device_preference.accepts(props.device_type) {
            debug!(device = %name, ty = ?props.device_type, "skipping device: wrong type");
            continue;
        }
        let Ok(features) = driver.physical_device_features(pd) else {
            continue;
        };
        if features.geometry_shader != vk::TRUE {
            debug!(device = %name, "skipping device: no geometry shader support");
            continue;
        }
        let supported = match driver.enumerate_device_extensions(pd) {
            Ok(list) => list,
            Err(e) => {
                warn!(device = %name, "device extension query failed: {e}");
                continue;
            }
        };
        let missing: Vec<_> = desc
            .device_extensions
            .iter()
            .filter(|want| !supported.iter().any(|have| have.as_c_str() == **want))
            .collect();
        if !missing.is_empty() {
            warn!(device = %name, ?missing, "skipping device: missing extensions");
            continue;
        }

        info!(device = %name, ty = ?props.device_type, "selected physical device");
        return Ok((pd, features));
    }
    Err(VkError::NoSuitableDevice)
}

/// First family with graphics that can also present to `surface`.
unsafe fn pick_queue_family<D: Driver>(
    driver: &D,
    pd: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
) -> Result<u32> {
    let families = driver
        .queue_family_properties(pd)
        .unwrap_or_default();
    if families.is_empty() {
        return Err(VkError::NoQueueFamilies);
    }
    for (i, family) in families.iter().enumerate() {
        let i = i as u32;
        if !family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
            continue;
        }
        match driver.surface_support(pd, i, surface) {
            Ok(true) => return Ok(i),
            Ok(false) => {}
            Err(e) => warn!(family = i, "surface support query failed: {e}"),
        }
    }
    Err(VkError::NoGraphicsQueue)
}

unsafe fn create_device<D: Driver>(
    driver: &mut D,
    pd: vk::PhysicalDevice,
    features: &vk::PhysicalDeviceFeatures,
    families: Vec<u32>,
    desc: &ContextDesc,
) -> ash::prelude::VkResult<vk::Device> {
    let priorities = [1.0_f32];
    let queue_infos: Vec<_> = families
        .iter()
        .map(|&family| vk::DeviceQueueCreateInfo {
            s_type: vk::StructureType::DEVICE_QUEUE_CREATE_INFO,
            queue_family_index: family,
            queue_count: 1,
            p_queue_priorities: priorities.as_ptr(),
            ..Default::default()
        })
        .collect();

    let ext_ptrs: Vec<_> = desc.device_extensions.iter().map(|e| e.as_ptr()).collect();
    // device layers are ignored by current loaders; older ones still read them
    let layer_ptrs: Vec<_> = desc.validation_layers.iter().map(|l| l.as_ptr()).collect();

    #[allow(deprecated)]
    let create_info = vk::DeviceCreateInfo {
        s_type: vk::StructureType::DEVICE_CREATE_INFO,
        queue_create_info_count: queue_infos.len() as u32,
        p_queue_create_infos: queue_infos.as_ptr(),
        enabled_layer_count: layer_ptrs.len() as u32,
        pp_enabled_layer_names: layer_ptrs.as_ptr(),
        enabled_extension_count: ext_ptrs.len() as u32,
        pp_enabled_extension_names: ext_ptrs.as_ptr(),
        p_enabled_features: features,
        ..Default::default()
    };

    driver.create_device(pd, &create_info)
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
