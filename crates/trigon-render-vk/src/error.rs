// SPDX-License-Identifier: CEPL-1.0
use ash::vk;
use raw_window_handle::HandleError;
use thiserror::Error;

pub type Result<T, E = VkError> = std::result::Result<T, E>;

/// Failure while bridging the window to Vulkan (extension list, surface).
#[derive(Debug, Error)]
pub enum SurfaceGlueError {
    #[error("window handle unavailable: {0}")]
    Handle(#[from] HandleError),
    #[error("vulkan: {0}")]
    Vk(#[from] vk::Result),
}

#[derive(Debug, Error)]
pub enum VkError {
    #[error("failed to load the Vulkan library: {0}")]
    Loading(#[from] ash::LoadingError),

    // device context
    #[error("window could not report its required instance extensions: {0}")]
    ExtensionQuery(#[source] SurfaceGlueError),
    #[error("failed to enumerate instance layers: {0}")]
    LayerQuery(#[source] vk::Result),
    #[error("requested validation layer {0} is not available")]
    LayerUnavailable(String),
    #[error("vkCreateInstance failed: {0}")]
    InstanceCreation(#[source] vk::Result),
    #[error("debug messenger setup failed: {0}")]
    DebugMessenger(#[source] vk::Result),
    #[error("surface creation failed: {0}")]
    SurfaceCreation(#[source] SurfaceGlueError),
    #[error("failed to enumerate physical devices: {0}")]
    DeviceEnumeration(#[source] vk::Result),
    #[error("no Vulkan physical device found")]
    NoDeviceFound,
    #[error("no physical device matches the requested type and features")]
    NoSuitableDevice,
    #[error("selected device exposes no queue families")]
    NoQueueFamilies,
    #[error("no queue family supports both graphics and presentation")]
    NoGraphicsQueue,
    #[error("vkCreateDevice failed: {0}")]
    DeviceCreation(#[source] vk::Result),

    // swap chain
    #[error("surface capability query failed: {0}")]
    CapabilityQuery(#[source] vk::Result),
    #[error("surface format query failed: {0}")]
    FormatQuery(#[source] vk::Result),
    #[error("surface present mode query failed: {0}")]
    PresentModeQuery(#[source] vk::Result),
    #[error("surface reports no formats")]
    NoSurfaceFormats,
    #[error("vkCreateSwapchainKHR failed: {0}")]
    SwapchainCreation(#[source] vk::Result),
    #[error("vkGetSwapchainImagesKHR failed: {0}")]
    SwapchainImages(#[source] vk::Result),
    #[error("image view {index} creation failed: {source}")]
    ImageViewCreation { index: usize, source: vk::Result },

    // pipeline
    #[error("{stage} shader: {reason}")]
    ShaderCode { stage: &'static str, reason: String },
    #[error("{stage} shader module creation failed: {source}")]
    ShaderModule {
        stage: &'static str,
        source: vk::Result,
    },
    #[error("vkCreatePipelineLayout failed: {0}")]
    PipelineLayout(#[source] vk::Result),
    #[error("vkCreateRenderPass failed: {0}")]
    RenderPass(#[source] vk::Result),
    #[error("vkCreateGraphicsPipelines failed: {0}")]
    PipelineCreation(#[source] vk::Result),

    // frame resources
    #[error("framebuffer {index} creation failed: {source}")]
    FramebufferCreation { index: usize, source: vk::Result },
    #[error("vkCreateCommandPool failed: {0}")]
    CommandPool(#[source] vk::Result),
    #[error("vkAllocateCommandBuffers failed: {0}")]
    CommandBufferAlloc(#[source] vk::Result),
    #[error("command buffer recording failed: {0}")]
    CommandBufferRecord(#[source] vk::Result),

    // sync & frame loop
    #[error("sync objects for frame slot {slot} failed: {source}")]
    SyncObjectCreation { slot: usize, source: vk::Result },
    #[error("waiting on the in-flight fence failed: {0}")]
    FenceWait(#[source] vk::Result),
    #[error("resetting the in-flight fence failed: {0}")]
    FenceReset(#[source] vk::Result),
    #[error("vkAcquireNextImageKHR failed: {0}")]
    Acquire(#[source] vk::Result),
    #[error("vkQueueSubmit failed: {0}")]
    Submit(#[source] vk::Result),
    #[error("vkQueuePresentKHR failed: {0}")]
    Present(#[source] vk::Result),
    #[error("vkDeviceWaitIdle failed: {0}")]
    DeviceIdle(#[source] vk::Result),
    #[error("{0} is not available (renderer shut down?)")]
    ResourceMissing(&'static str),
}
