// SPDX-License-Identifier: CEPL-1.0
use std::ffi::{c_void, CStr};

use ash::vk;
use tracing::{debug, error, trace, warn};

pub const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

fn category(types: vk::DebugUtilsMessageTypeFlagsEXT) -> &'static str {
    if types.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
        "VALIDATION"
    } else if types.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        "PERFORMANCE"
    } else {
        "GENERAL"
    }
}

fn forward(severity: vk::DebugUtilsMessageSeverityFlagsEXT, kind: &str, msg: &str) {
    use vk::DebugUtilsMessageSeverityFlagsEXT as S;
    if severity.contains(S::ERROR) {
        error!(target: "kindle::validation", "[{kind}] {msg}");
    } else if severity.contains(S::WARNING) {
        warn!(target: "kindle::validation", "[{kind}] {msg}");
    } else if severity.contains(S::INFO) {
        debug!(target: "kindle::validation", "[{kind}] {msg}");
    } else {
        trace!(target: "kindle::validation", "[{kind}] {msg}");
    }
}

unsafe extern "system" fn debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    types: vk::DebugUtilsMessageTypeFlagsEXT,
    data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user: *mut c_void,
) -> vk::Bool32 {
    // SAFETY: the loader passes either null or valid callback data whose
    // message, when non-null, is NUL-terminated.
    let message = unsafe {
        match data.as_ref() {
            Some(d) if !d.p_message.is_null() => CStr::from_ptr(d.p_message).to_string_lossy(),
            _ => return vk::FALSE,
        }
    };
    forward(severity, category(types), &message);
    vk::FALSE
}

/// Verbose, warning and error messages of every category, routed to `tracing`.
pub fn messenger_create_info() -> vk::DebugUtilsMessengerCreateInfoEXT<'static> {
    vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(debug_callback))
}

/// Every name in `required` must appear in `available`.
pub fn all_present(required: &[&CStr], available: &[&CStr]) -> bool {
    required.iter().all(|r| available.contains(r))
}
