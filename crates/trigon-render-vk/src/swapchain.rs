// SPDX-License-Identifier: CEPL-1.0
use ash::vk;
use tracing::{debug, info};
use trigon_render::RenderSize;

use crate::context::DeviceContext;
use crate::driver::Driver;
use crate::error::{Result, VkError};

const PREFERRED_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
    format: vk::Format::B8G8R8A8_SRGB,
    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
};

/// Present mode the caller would like; FIFO is the fallback either way.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PresentPreference {
    /// Triple buffering when the surface offers it.
    #[default]
    Mailbox,
    Fifo,
}

/// Snapshot of what the surface supports, re-queried on every (re)creation.
#[derive(Clone, Debug, Default)]
pub struct SwapchainSupport {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SwapchainSupport {
    pub fn query<D: Driver>(driver: &D, ctx: &DeviceContext) -> Result<Self> {
        let (pd, surface) = (ctx.physical_device, ctx.surface());
        unsafe {
            let capabilities = driver
                .surface_capabilities(pd, surface)
                .map_err(VkError::CapabilityQuery)?;
            let formats = driver
                .surface_formats(pd, surface)
                .map_err(VkError::FormatQuery)?;
            let present_modes = driver
                .surface_present_modes(pd, surface)
                .map_err(VkError::PresentModeQuery)?;
            if formats.is_empty() {
                return Err(VkError::NoSurfaceFormats);
            }
            Ok(Self {
                capabilities,
                formats,
                present_modes,
            })
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwapchainConfig {
    pub format: vk::SurfaceFormatKHR,
    pub present_mode: vk::PresentModeKHR,
    pub extent: vk::Extent2D,
    pub image_count: u32,
}

impl SwapchainConfig {
    /// `support.formats` must not be empty (`SwapchainSupport::query` refuses
    /// that case).
    pub fn choose(
        support: &SwapchainSupport,
        window: RenderSize,
        preference: PresentPreference,
    ) -> Self {
        Self {
            format: choose_surface_format(&support.formats),
            present_mode: choose_present_mode(&support.present_modes, preference),
            extent: extent_from_caps(&support.capabilities, window),
            image_count: image_count_from_caps(&support.capabilities),
        }
    }
}

fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
    formats
        .iter()
        .copied()
        .find(|f| *f == PREFERRED_FORMAT)
        .unwrap_or_else(|| formats[0])
}

fn choose_present_mode(
    modes: &[vk::PresentModeKHR],
    preference: PresentPreference,
) -> vk::PresentModeKHR {
    match preference {
        PresentPreference::Mailbox if modes.contains(&vk::PresentModeKHR::MAILBOX) => {
            vk::PresentModeKHR::MAILBOX
        }
        _ => vk::PresentModeKHR::FIFO,
    }
}

fn extent_from_caps(caps: &vk::SurfaceCapabilitiesKHR, want: RenderSize) -> vk::Extent2D {
    if caps.current_extent.width != u32::MAX {
        caps.current_extent
    } else {
        vk::Extent2D {
            width: want
                .width
                .clamp(caps.min_image_extent.width, caps.max_image_extent.width),
            height: want
                .height
                .clamp(caps.min_image_extent.height, caps.max_image_extent.height),
        }
    }
}

fn image_count_from_caps(caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let want = caps.min_image_count + 1;
    if caps.max_image_count == 0 {
        want
    } else {
        want.min(caps.max_image_count)
    }
}

/// Swap chain handle, its images (owned by the swap chain) and one view per
/// image. `views` only ever holds views that were actually created.
#[derive(Debug, Default)]
pub struct Swapchain {
    handle: Option<vk::SwapchainKHR>,
    pub images: Vec<vk::Image>,
    pub views: Vec<vk::ImageView>,
    pub format: vk::Format,
    pub extent: vk::Extent2D,
}

impl Swapchain {
    pub fn create<D: Driver>(
        driver: &D,
        ctx: &DeviceContext,
        support: &SwapchainSupport,
        config: &SwapchainConfig,
    ) -> Result<Self> {
        let mut sc = Self {
            format: config.format.format,
            extent: config.extent,
            ..Default::default()
        };
        match unsafe { sc.build(driver, ctx, support, config) } {
            Ok(()) => {
                info!(
                    extent = ?sc.extent,
                    format = ?config.format.format,
                    present_mode = ?config.present_mode,
                    images = sc.images.len(),
                    "swap chain ready"
                );
                Ok(sc)
            }
            Err(e) => {
                sc.destroy(driver);
                Err(e)
            }
        }
    }

    unsafe fn build<D: Driver>(
        &mut self,
        driver: &D,
        ctx: &DeviceContext,
        support: &SwapchainSupport,
        config: &SwapchainConfig,
    ) -> Result<()> {
        let families = ctx.queue_families();
        let sharing = if families.len() > 1 {
            vk::SharingMode::CONCURRENT
        } else {
            vk::SharingMode::EXCLUSIVE
        };

        let swap_info = vk::SwapchainCreateInfoKHR {
            s_type: vk::StructureType::SWAPCHAIN_CREATE_INFO_KHR,
            surface: ctx.surface(),
            min_image_count: config.image_count,
            image_format: config.format.format,
            image_color_space: config.format.color_space,
            image_extent: config.extent,
            image_array_layers: 1,
            image_usage: vk::ImageUsageFlags::COLOR_ATTACHMENT,
            image_sharing_mode: sharing,
            queue_family_index_count: if sharing == vk::SharingMode::CONCURRENT {
                families.len() as u32
            } else {
                0
            },
            p_queue_family_indices: families.as_ptr(),
            pre_transform: support.capabilities.current_transform,
            composite_alpha: vk::CompositeAlphaFlagsKHR::OPAQUE,
            present_mode: config.present_mode,
            clipped: vk::TRUE,
            ..Default::default()
        };

        let handle = driver
            .create_swapchain(&swap_info)
            .map_err(VkError::SwapchainCreation)?;
        self.handle = Some(handle);

        self.images = driver
            .swapchain_images(handle)
            .map_err(VkError::SwapchainImages)?;

        self.views.reserve(self.images.len());
        for (index, &image) in self.images.iter().enumerate() {
            let iv_info = vk::ImageViewCreateInfo {
                s_type: vk::StructureType::IMAGE_VIEW_CREATE_INFO,
                image,
                view_type: vk::ImageViewType::TYPE_2D,
                format: config.format.format,
                components: vk::ComponentMapping {
                    r: vk::ComponentSwizzle::IDENTITY,
                    g: vk::ComponentSwizzle::IDENTITY,
                    b: vk::ComponentSwizzle::IDENTITY,
                    a: vk::ComponentSwizzle::IDENTITY,
                },
                subresource_range: vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                },
                ..Default::default()
            };
            let view = driver
                .create_image_view(&iv_info)
                .map_err(|source| VkError::ImageViewCreation { index, source })?;
            self.views.push(view);
        }
        Ok(())
    }

    pub fn destroy<D: Driver>(&mut self, driver: &D) {
        unsafe {
            for view in self.views.drain(..) {
                driver.destroy_image_view(view);
            }
            self.images.clear();
            if let Some(handle) = self.handle.take() {
                driver.destroy_swapchain(handle);
                debug!("swap chain destroyed");
            }
        }
    }

    pub fn handle(&self) -> vk::SwapchainKHR {
        self.handle.unwrap_or_default()
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }
}

#[cfg(test)]
#[path = "swapchain_tests.rs"]
mod tests;
