use core::fmt::Debug;

pub use new::Error as VulkanCreationError;

use ash::{ext, vk};
use parking_lot::{Mutex, MutexGuard};
use tracing::error;

mod debug;
mod drop;
mod new;

pub(crate) use debug::DebugUtils;

/// The Vulkan Context, contains core devices for using Vulkan.
///
/// The context is headless. A single queue from a graphics capable family is created, graphics
/// queues always support transfer and blit commands.
pub struct Vulkan {
    // Must outlive every object created from it.
    _entry: ash::Entry,
    instance: ash::Instance,
    physical_device: vk::PhysicalDevice,
    device: ash::Device,

    queue_family_index: u32,
    queue: Mutex<vk::Queue>,

    debug_utils: Option<DebugUtils>,

    /// A command pool with the Transient Flag, used for any component to run onetime commands.
    transient_pool: Mutex<vk::CommandPool>,
}

impl Debug for Vulkan {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let properties = unsafe {
            self.instance
                .get_physical_device_properties(self.physical_device)
        };

        let api_version = {
            let major = vk::api_version_major(properties.api_version);
            let minor = vk::api_version_minor(properties.api_version);
            let patch = vk::api_version_patch(properties.api_version);

            format!("{major}.{minor}.{patch}")
        };

        let device_name = properties.device_name_as_c_str().unwrap_or(c"Invalid name");

        f.debug_struct("Vulkan")
            .field("device_name", &device_name)
            .field("device_type", &properties.device_type)
            .field("api_version", &api_version)
            .field("queue_family_index", &self.queue_family_index)
            .field("debug", &self.debug_utils.is_some())
            .finish_non_exhaustive()
    }
}

impl Vulkan {
    /// The Vulkan instance.
    #[inline]
    pub unsafe fn instance(&self) -> &ash::Instance {
        &self.instance
    }

    /// The logical device.
    #[inline]
    pub unsafe fn device(&self) -> &ash::Device {
        &self.device
    }

    /// The selected physical device.
    #[inline]
    pub unsafe fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    /// The queue, every submission must hold the lock.
    #[inline]
    pub unsafe fn queue(&self) -> &Mutex<vk::Queue> {
        &self.queue
    }

    /// Gets a reference to the mutex for the transient pool.
    /// The transient pool is a command pool with the Transient Flag, used for any component to run
    /// onetime commands.
    #[inline]
    pub unsafe fn transient_pool(&self) -> &Mutex<vk::CommandPool> {
        &self.transient_pool
    }

    /// The debug utils device, if validation is enabled.
    #[inline]
    pub unsafe fn debug(&self) -> Option<&ext::debug_utils::Device> {
        self.debug_utils.as_ref().map(|debug_utils| &debug_utils.device)
    }

    /// The queue family every resource is created for.
    #[inline]
    pub fn queue_family_index(&self) -> u32 {
        self.queue_family_index
    }

    /// The queue family index as a slice, for create infos.
    #[inline]
    pub fn queue_family_index_as_slice(&self) -> &[u32] {
        core::slice::from_ref(&self.queue_family_index)
    }

    /// Waits for the device to idle.
    /// Takes and returns a lock on the queue.
    #[must_use]
    pub unsafe fn device_wait_idle(&self) -> MutexGuard<'_, vk::Queue> {
        let lock = self.queue.lock();

        if let Err(error) = unsafe { self.device.device_wait_idle() } {
            error!("Failed to wait for device idle: {error}");
        }

        lock
    }
}
