use alloc::borrow::Cow;
use core::ffi::{CStr, c_void};

use ash::{ext::debug_utils, vk};
use tracing::{debug, error, info, warn};

use crate::VkError;

/// The debug utils loaders and the messenger forwarding validation messages into `tracing`.
pub(crate) struct DebugUtils {
    pub instance: debug_utils::Instance,
    pub device: debug_utils::Device,
    pub messenger: vk::DebugUtilsMessengerEXT,
}

impl DebugUtils {
    pub unsafe fn new(
        entry: &ash::Entry,
        instance: &ash::Instance,
        device: &ash::Device,
    ) -> Result<Self, VkError> {
        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                    | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::INFO,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(vulkan_debug_callback));

        let debug_instance = debug_utils::Instance::new(entry, instance);
        let messenger = unsafe { debug_instance.create_debug_utils_messenger(&create_info, None) }
            .map_err(|e| VkError::new(e, "vkCreateDebugUtilsMessengerEXT"))?;

        Ok(Self {
            instance: debug_instance,
            device: debug_utils::Device::new(instance, device),
            messenger,
        })
    }
}

unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut c_void,
) -> vk::Bool32 {
    let Some(callback_data) = (unsafe { p_callback_data.as_ref() }) else {
        return vk::FALSE;
    };
    let message_id_number = callback_data.message_id_number;

    let message_id_name = if callback_data.p_message_id_name.is_null() {
        Cow::from("")
    } else {
        unsafe { CStr::from_ptr(callback_data.p_message_id_name) }.to_string_lossy()
    };

    let message = if callback_data.p_message.is_null() {
        Cow::from("")
    } else {
        unsafe { CStr::from_ptr(callback_data.p_message) }.to_string_lossy()
    };

    match message_severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE => {
            debug!("[{message_type:?}] [{message_id_name} ({message_id_number})] {message}")
        }
        vk::DebugUtilsMessageSeverityFlagsEXT::INFO => {
            info!("[{message_type:?}] [{message_id_name} ({message_id_number})] {message}")
        }
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => {
            warn!("[{message_type:?}] [{message_id_name} ({message_id_number})] {message}")
        }
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => {
            error!("[{message_type:?}] [{message_id_name} ({message_id_number})] {message}")
        }
        _ => {
            info!("[{message_type:?}] [{message_id_name} ({message_id_number})] {message}")
        }
    };

    vk::FALSE
}
