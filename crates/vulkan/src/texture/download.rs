use core::slice;

use ash::vk;

use crate::{
    VkError,
    helpers::{cmd_transition_image, onetime_command},
};

use super::{GpuTexture, Staging, TextureError, TextureFormat};

impl GpuTexture {
    /// Copy mip level 0 to the CPU, in the texture's storage format.
    pub fn download(&self) -> Result<Vec<u8>, TextureError> {
        let size = self.extent.width as usize
            * self.extent.height as usize
            * TextureFormat::BYTES_PER_PIXEL;

        unsafe {
            let (buffer, memory) = Staging::allocate(&self.vulkan, size as u64, "Download Staging")?;

            let result = self
                .copy_to_buffer(buffer)
                .and_then(|()| self.read_staging(memory, size));

            Staging::free(&self.vulkan, buffer, memory);
            result
        }
    }

    unsafe fn copy_to_buffer(&self, buffer: vk::Buffer) -> Result<(), TextureError> {
        let image = self.image;
        let extent = self.extent;

        unsafe {
            onetime_command(
                &self.vulkan,
                |vulkan, command_buffer| {
                    cmd_transition_image(
                        vulkan,
                        command_buffer,
                        image,
                        0,
                        1,
                        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                        vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                    );

                    let region = vk::BufferImageCopy::default()
                        .buffer_offset(0)
                        .buffer_row_length(extent.width)
                        .buffer_image_height(extent.height)
                        .image_subresource(Self::layers(0))
                        .image_offset(vk::Offset3D::default())
                        .image_extent(extent.into());

                    vulkan.device().cmd_copy_image_to_buffer(
                        command_buffer,
                        image,
                        vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                        buffer,
                        slice::from_ref(&region),
                    );

                    cmd_transition_image(
                        vulkan,
                        command_buffer,
                        image,
                        0,
                        1,
                        vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                    );
                },
                "Download Texture",
            )?;
        }

        Ok(())
    }

    unsafe fn read_staging(
        &self,
        memory: vk::DeviceMemory,
        size: usize,
    ) -> Result<Vec<u8>, TextureError> {
        let device = unsafe { self.vulkan.device() };

        let pointer =
            unsafe { device.map_memory(memory, 0, size as u64, vk::MemoryMapFlags::empty()) }
                .map_err(|e| VkError::new(e, "vkMapMemory"))?;

        let bytes = unsafe { slice::from_raw_parts(pointer.cast::<u8>(), size) }.to_vec();

        unsafe { device.unmap_memory(memory) };

        Ok(bytes)
    }
}
