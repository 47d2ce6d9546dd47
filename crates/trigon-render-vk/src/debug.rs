// SPDX-License-Identifier: CEPL-1.0
use std::borrow::Cow;
use std::ffi::{c_void, CStr};

use ash::vk;
use tracing::{debug, error, trace, warn};

/// Messenger setup shared by instance creation (chained through `p_next` so
/// creation-time messages are captured) and the standalone messenger.
pub(crate) fn messenger_create_info() -> vk::DebugUtilsMessengerCreateInfoEXT<'static> {
    vk::DebugUtilsMessengerCreateInfoEXT {
        s_type: vk::StructureType::DEBUG_UTILS_MESSENGER_CREATE_INFO_EXT,
        message_severity: vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
            | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
            | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        message_type: vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
            | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
            | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        pfn_user_callback: Some(debug_callback),
        ..Default::default()
    }
}

/// Forwards validation output into tracing. Never aborts, always lets the
/// triggering call proceed.
pub(crate) unsafe extern "system" fn debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    types: vk::DebugUtilsMessageTypeFlagsEXT,
    data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user: *mut c_void,
) -> vk::Bool32 {
    let message = if data.is_null() || (*data).p_message.is_null() {
        Cow::Borrowed("<no message>")
    } else {
        CStr::from_ptr((*data).p_message).to_string_lossy()
    };
    log_message(severity, types, &message);
    vk::FALSE
}

fn log_message(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    types: vk::DebugUtilsMessageTypeFlagsEXT,
    message: &str,
) {
    use vk::DebugUtilsMessageSeverityFlagsEXT as Sev;

    if severity.contains(Sev::ERROR) {
        error!(?types, "[vulkan] {message}");
    } else if severity.contains(Sev::WARNING) {
        warn!(?types, "[vulkan] {message}");
    } else if severity.contains(Sev::INFO) {
        debug!(?types, "[vulkan] {message}");
    } else {
        trace!(?types, "[vulkan] {message}");
    }
}
