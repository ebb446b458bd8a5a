use alloc::ffi::CString;
use core::slice;

use ash::vk;
use thiserror::Error;
use tracing::warn;

use crate::Vulkan;

/// A Vulkan call returned an error.
#[derive(Debug, Error, Clone, Copy)]
#[error("{call} returned {result}")]
pub struct VkError {
    /// The result the call returned.
    pub result: vk::Result,

    /// The name of the call.
    pub call: &'static str,
}

impl VkError {
    /// Label `result` with the call that returned it.
    pub fn new(result: vk::Result, call: &'static str) -> Self {
        Self { result, call }
    }
}

/// Error variants from allocating Vulkan memory.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AllocationError {
    /// No memory type satisfies the requirements.
    #[error("No suitable memory type is available")]
    NoSuitableMemoryType,

    /// A Vulkan call returned an error.
    #[error(transparent)]
    VkError(#[from] VkError),
}

/// Finds a memory type index that satisfies the requirements and has the given flags.
pub(crate) unsafe fn find_memorytype_index(
    vulkan: &Vulkan,
    requirements: vk::MemoryRequirements,
    flags: vk::MemoryPropertyFlags,
) -> Option<u32> {
    let memory_properties = unsafe {
        vulkan
            .instance()
            .get_physical_device_memory_properties(vulkan.physical_device())
    };

    memory_properties.memory_types[..memory_properties.memory_type_count as usize]
        .iter()
        .enumerate()
        .find(|(index, memory_type)| {
            (1 << index) & requirements.memory_type_bits != 0
                && memory_type.property_flags.contains(flags)
        })
        .map(|(index, _)| index as u32)
}

/// Allocates memory for `requirements` with the given flags.
unsafe fn allocate_memory(
    vulkan: &Vulkan,
    requirements: vk::MemoryRequirements,
    flags: vk::MemoryPropertyFlags,
) -> Result<vk::DeviceMemory, AllocationError> {
    let memory_index = unsafe { find_memorytype_index(vulkan, requirements, flags) }
        .ok_or(AllocationError::NoSuitableMemoryType)?;

    let allocate_info = vk::MemoryAllocateInfo::default()
        .allocation_size(requirements.size)
        .memory_type_index(memory_index);

    let memory = unsafe { vulkan.device().allocate_memory(&allocate_info, None) }
        .map_err(|e| VkError::new(e, "vkAllocateMemory"))?;

    Ok(memory)
}

/// Creates a buffer and binds freshly allocated memory to it.
pub(crate) unsafe fn allocate_buffer(
    vulkan: &Vulkan,
    create_info: &vk::BufferCreateInfo<'_>,
    flags: vk::MemoryPropertyFlags,
    name: &str,
) -> Result<(vk::Buffer, vk::DeviceMemory), AllocationError> {
    let device = unsafe { vulkan.device() };

    let buffer = unsafe { device.create_buffer(create_info, None) }
        .map_err(|e| VkError::new(e, "vkCreateBuffer"))?;

    let requirements = unsafe { device.get_buffer_memory_requirements(buffer) };
    let memory = match unsafe { allocate_memory(vulkan, requirements, flags) } {
        Ok(memory) => memory,
        Err(e) => {
            unsafe { device.destroy_buffer(buffer, None) };
            return Err(e);
        }
    };

    if let Err(e) = unsafe { device.bind_buffer_memory(buffer, memory, 0) } {
        unsafe {
            device.destroy_buffer(buffer, None);
            device.free_memory(memory, None);
        }
        return Err(VkError::new(e, "vkBindBufferMemory").into());
    }

    unsafe {
        try_name(vulkan, buffer, name);
        try_name(vulkan, memory, &format!("{name} Memory"));
    }

    Ok((buffer, memory))
}

/// Creates an image and binds freshly allocated device local memory to it.
pub(crate) unsafe fn allocate_image(
    vulkan: &Vulkan,
    create_info: &vk::ImageCreateInfo<'_>,
    name: &str,
) -> Result<(vk::Image, vk::DeviceMemory), AllocationError> {
    let device = unsafe { vulkan.device() };

    let image = unsafe { device.create_image(create_info, None) }
        .map_err(|e| VkError::new(e, "vkCreateImage"))?;

    let requirements = unsafe { device.get_image_memory_requirements(image) };
    let memory = match unsafe {
        allocate_memory(vulkan, requirements, vk::MemoryPropertyFlags::DEVICE_LOCAL)
    } {
        Ok(memory) => memory,
        Err(e) => {
            unsafe { device.destroy_image(image, None) };
            return Err(e);
        }
    };

    if let Err(e) = unsafe { device.bind_image_memory(image, memory, 0) } {
        unsafe {
            device.destroy_image(image, None);
            device.free_memory(memory, None);
        }
        return Err(VkError::new(e, "vkBindImageMemory").into());
    }

    unsafe {
        try_name(vulkan, image, name);
        try_name(vulkan, memory, &format!("{name} Memory"));
    }

    Ok((image, memory))
}

/// Records commands with `f` into a command buffer from the transient pool, submits it and waits
/// for it to complete.
pub(crate) unsafe fn onetime_command<F>(vulkan: &Vulkan, f: F, name: &str) -> Result<(), VkError>
where
    F: FnOnce(&Vulkan, vk::CommandBuffer),
{
    let device = unsafe { vulkan.device() };
    let pool = unsafe { vulkan.transient_pool() }.lock();

    let command_buffer = {
        let allocate_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(*pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        let buffers = unsafe { device.allocate_command_buffers(&allocate_info) }
            .map_err(|e| VkError::new(e, "vkAllocateCommandBuffers"))?;

        buffers[0]
    };
    unsafe { try_name(vulkan, command_buffer, name) };

    let result = unsafe { record_and_submit(vulkan, command_buffer, f) };

    unsafe { device.free_command_buffers(*pool, slice::from_ref(&command_buffer)) };

    result
}

unsafe fn record_and_submit<F>(
    vulkan: &Vulkan,
    command_buffer: vk::CommandBuffer,
    f: F,
) -> Result<(), VkError>
where
    F: FnOnce(&Vulkan, vk::CommandBuffer),
{
    let device = unsafe { vulkan.device() };

    let begin_info =
        vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
    unsafe { device.begin_command_buffer(command_buffer, &begin_info) }
        .map_err(|e| VkError::new(e, "vkBeginCommandBuffer"))?;

    f(vulkan, command_buffer);

    unsafe { device.end_command_buffer(command_buffer) }
        .map_err(|e| VkError::new(e, "vkEndCommandBuffer"))?;

    let fence = unsafe { device.create_fence(&vk::FenceCreateInfo::default(), None) }
        .map_err(|e| VkError::new(e, "vkCreateFence"))?;

    let submitted = {
        let submit_info =
            vk::SubmitInfo::default().command_buffers(slice::from_ref(&command_buffer));

        let queue = unsafe { vulkan.queue() }.lock();
        unsafe { device.queue_submit(*queue, slice::from_ref(&submit_info), fence) }
            .map_err(|e| VkError::new(e, "vkQueueSubmit"))
    };

    let waited = submitted.and_then(|()| {
        unsafe { device.wait_for_fences(slice::from_ref(&fence), true, u64::MAX) }
            .map_err(|e| VkError::new(e, "vkWaitForFences"))
    });

    unsafe { device.destroy_fence(fence, None) };

    waited
}

/// The access mask and pipeline stage that touch an image in `layout`.
fn layout_access(layout: vk::ImageLayout) -> (vk::AccessFlags, vk::PipelineStageFlags) {
    match layout {
        vk::ImageLayout::UNDEFINED => (
            vk::AccessFlags::empty(),
            vk::PipelineStageFlags::TOP_OF_PIPE,
        ),
        vk::ImageLayout::TRANSFER_SRC_OPTIMAL => (
            vk::AccessFlags::TRANSFER_READ,
            vk::PipelineStageFlags::TRANSFER,
        ),
        vk::ImageLayout::TRANSFER_DST_OPTIMAL => (
            vk::AccessFlags::TRANSFER_WRITE,
            vk::PipelineStageFlags::TRANSFER,
        ),
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL => (
            vk::AccessFlags::SHADER_READ,
            vk::PipelineStageFlags::FRAGMENT_SHADER,
        ),
        _ => (
            vk::AccessFlags::MEMORY_READ | vk::AccessFlags::MEMORY_WRITE,
            vk::PipelineStageFlags::ALL_COMMANDS,
        ),
    }
}

/// Records a layout transition for the mip levels `base_mip..base_mip + level_count`.
pub(crate) unsafe fn cmd_transition_image(
    vulkan: &Vulkan,
    command_buffer: vk::CommandBuffer,
    image: vk::Image,
    base_mip: u32,
    level_count: u32,
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
) {
    let (src_access, src_stage) = layout_access(old_layout);
    let (dst_access, dst_stage) = layout_access(new_layout);

    let barrier = vk::ImageMemoryBarrier::default()
        .src_access_mask(src_access)
        .dst_access_mask(dst_access)
        .old_layout(old_layout)
        .new_layout(new_layout)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(
            vk::ImageSubresourceRange::default()
                .aspect_mask(vk::ImageAspectFlags::COLOR)
                .base_mip_level(base_mip)
                .level_count(level_count)
                .base_array_layer(0)
                .layer_count(1),
        );

    unsafe {
        vulkan.device().cmd_pipeline_barrier(
            command_buffer,
            src_stage,
            dst_stage,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            slice::from_ref(&barrier),
        );
    }
}

/// Names a Vulkan object if debug utils are enabled.
pub(crate) unsafe fn try_name<H: vk::Handle>(vulkan: &Vulkan, handle: H, name: &str) {
    let Some(debug) = (unsafe { vulkan.debug() }) else {
        return;
    };

    let Ok(name) = CString::new(name) else {
        return;
    };

    let name_info = vk::DebugUtilsObjectNameInfoEXT::default()
        .object_handle(handle)
        .object_name(&name);

    if let Err(e) = unsafe { debug.set_debug_utils_object_name(&name_info) } {
        warn!("Failed to name object {}: {e}", name.to_string_lossy());
    }
}
