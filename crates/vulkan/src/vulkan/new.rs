use core::ffi::CStr;

use ash::{ext, khr, vk};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{info, warn};

use crate::{TextureFormat, VkError, helpers::try_name};

use super::{DebugUtils, Vulkan};

const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Every texture format needs these on optimal tiling.
const REQUIRED_FORMAT_FEATURES: vk::FormatFeatureFlags = vk::FormatFeatureFlags::from_raw(
    vk::FormatFeatureFlags::SAMPLED_IMAGE.as_raw()
        | vk::FormatFeatureFlags::SAMPLED_IMAGE_FILTER_LINEAR.as_raw()
        | vk::FormatFeatureFlags::BLIT_SRC.as_raw()
        | vk::FormatFeatureFlags::BLIT_DST.as_raw()
        | vk::FormatFeatureFlags::TRANSFER_SRC.as_raw()
        | vk::FormatFeatureFlags::TRANSFER_DST.as_raw(),
);

impl Vulkan {
    /// Creates a new headless Vulkan Context targeting Vulkan 1.2.
    ///
    /// The Vulkan loader is opened at runtime. Validation is enabled if `try_debug` is set and
    /// the validation layer is installed.
    pub fn new(try_debug: bool) -> Result<Self, Error> {
        let entry = unsafe { ash::Entry::load() }?;

        let should_debug = try_debug && unsafe { supports_validation(&entry) }?;
        if try_debug && !should_debug {
            warn!("Vulkan validation was requested but the validation layer is not available");
        }

        // Create instance.
        let instance = {
            let app_info = vk::ApplicationInfo::default()
                .api_version(vk::make_api_version(0, 1, 2, 0))
                .application_name(c"WLX Screen");

            let layers = [VALIDATION_LAYER.as_ptr()];
            let extensions = [ext::debug_utils::NAME.as_ptr()];

            let create_info = vk::InstanceCreateInfo::default().application_info(&app_info);
            let create_info = if should_debug {
                create_info
                    .enabled_layer_names(&layers)
                    .enabled_extension_names(&extensions)
            } else {
                create_info
            };

            unsafe { entry.create_instance(&create_info, None) }
                .map_err(|e| VkError::new(e, "vkCreateInstance"))?
        };

        // Select a physical device.
        let selected = unsafe { instance.enumerate_physical_devices() }
            .map_err(|e| Error::from(VkError::new(e, "vkEnumeratePhysicalDevices")))
            .and_then(|devices| {
                devices
                    .into_iter()
                    .filter(|&device| unsafe { supports_formats(&instance, device) })
                    .filter_map(|device| {
                        unsafe { find_queue_family(&instance, device) }
                            .map(|index| (device, index))
                    })
                    .min_by_key(|&(device, _)| {
                        let properties =
                            unsafe { instance.get_physical_device_properties(device) };

                        match properties.device_type {
                            vk::PhysicalDeviceType::DISCRETE_GPU => 0,
                            vk::PhysicalDeviceType::INTEGRATED_GPU => 1,
                            vk::PhysicalDeviceType::VIRTUAL_GPU => 2,
                            vk::PhysicalDeviceType::CPU => 3,
                            vk::PhysicalDeviceType::OTHER => 4,
                            _ => 5,
                        }
                    })
                    .ok_or(Error::UnsupportedDevice)
            });
        let (physical_device, queue_family_index) =
            selected.inspect_err(|_| unsafe { instance.destroy_instance(None) })?;

        // Create logical device.
        let device = {
            let mut extensions = vec![];

            // Request portability if the device supports it.
            {
                let properties =
                    unsafe { instance.enumerate_device_extension_properties(physical_device) }
                        .map_err(|e| VkError::new(e, "vkEnumerateDeviceExtensionProperties"))
                        .inspect_err(|_| unsafe { instance.destroy_instance(None) })?;

                let supports_portability = properties.into_iter().any(|properties| {
                    properties.extension_name_as_c_str().unwrap_or(c"")
                        == khr::portability_subset::NAME
                });

                if supports_portability {
                    extensions.push(khr::portability_subset::NAME.as_ptr());
                }
            }

            let queue_priorities = [1.0];
            let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
                .queue_family_index(queue_family_index)
                .queue_priorities(&queue_priorities)];

            let create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos)
                .enabled_extension_names(&extensions);

            unsafe { instance.create_device(physical_device, &create_info, None) }
                .map_err(|e| VkError::new(e, "vkCreateDevice"))
                .inspect_err(|_| unsafe { instance.destroy_instance(None) })?
        };

        let queue = unsafe { device.get_device_queue(queue_family_index, 0) };

        // Create debug utils if we should debug.
        let debug_utils = if should_debug {
            match unsafe { DebugUtils::new(&entry, &instance, &device) } {
                Ok(debug_utils) => Some(debug_utils),
                Err(e) => {
                    warn!("Failed to create debug messenger:\n{e}");
                    None
                }
            }
        } else {
            None
        };

        // Create transient pool.
        let transient_pool = {
            let create_info = vk::CommandPoolCreateInfo::default()
                .flags(vk::CommandPoolCreateFlags::TRANSIENT)
                .queue_family_index(queue_family_index);

            match unsafe { device.create_command_pool(&create_info, None) } {
                Ok(pool) => pool,
                Err(e) => {
                    unsafe {
                        device.destroy_device(None);
                        if let Some(debug_utils) = debug_utils.as_ref() {
                            debug_utils
                                .instance
                                .destroy_debug_utils_messenger(debug_utils.messenger, None);
                        }
                        instance.destroy_instance(None);
                    }
                    return Err(VkError::new(e, "vkCreateCommandPool").into());
                }
            }
        };

        let vulkan = Self {
            _entry: entry,
            instance,
            physical_device,
            device,
            queue_family_index,
            queue: Mutex::new(queue),
            debug_utils,
            transient_pool: Mutex::new(transient_pool),
        };

        info!("Created Vulkan Context: {:?}", vulkan);

        // Name objects
        unsafe {
            try_name(&vulkan, *vulkan.queue().lock(), "Main Queue");
            try_name(&vulkan, vulkan.device.handle(), "Main Device");
            try_name(&vulkan, *vulkan.transient_pool().lock(), "Transient Pool");
        }

        Ok(vulkan)
    }
}

/// Whether the validation layer and the debug utils extension are available.
unsafe fn supports_validation(entry: &ash::Entry) -> Result<bool, VkError> {
    let layers = unsafe { entry.enumerate_instance_layer_properties() }
        .map_err(|e| VkError::new(e, "vkEnumerateInstanceLayerProperties"))?;

    let has_layer = layers
        .iter()
        .any(|layer| layer.layer_name_as_c_str().unwrap_or(c"") == VALIDATION_LAYER);

    let extensions = unsafe { entry.enumerate_instance_extension_properties(None) }
        .map_err(|e| VkError::new(e, "vkEnumerateInstanceExtensionProperties"))?;

    let has_extension = extensions.iter().any(|extension| {
        extension.extension_name_as_c_str().unwrap_or(c"") == ext::debug_utils::NAME
    });

    Ok(has_layer && has_extension)
}

/// Whether every texture format can be sampled, blitted and copied on `device`.
unsafe fn supports_formats(instance: &ash::Instance, device: vk::PhysicalDevice) -> bool {
    TextureFormat::ALL.iter().all(|format| {
        let properties = unsafe {
            instance.get_physical_device_format_properties(device, format.vk_format())
        };

        properties
            .optimal_tiling_features
            .contains(REQUIRED_FORMAT_FEATURES)
    })
}

/// Finds a queue family that supports graphics, and therefore transfer and blits.
unsafe fn find_queue_family(instance: &ash::Instance, device: vk::PhysicalDevice) -> Option<u32> {
    let properties = unsafe { instance.get_physical_device_queue_family_properties(device) };

    properties
        .iter()
        .position(|properties| {
            properties.queue_count > 0 && properties.queue_flags.contains(vk::QueueFlags::GRAPHICS)
        })
        .map(|index| index as u32)
}

/// Error variants from trying to create the Vulkan Context.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The Vulkan loader could not be opened.
    #[error("Failed to load Vulkan:\n{0}")]
    Loading(#[from] ash::LoadingError),

    /// A Vulkan call returned an error.
    #[allow(clippy::enum_variant_names)]
    #[error(transparent)]
    VkError(#[from] VkError),

    /// No Physical Devices meet the requirements to use the application.
    #[error("No Physical Devices meet the requirements.")]
    UnsupportedDevice,
}
