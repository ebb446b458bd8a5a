use core::slice;

use ash::vk;

use crate::{
    VkError,
    helpers::{cmd_transition_image, onetime_command},
};

use super::{GpuTexture, Staging, TextureError, TextureFormat};

impl GpuTexture {
    /// Replace the whole texture with `bytes` in `format` order.
    pub fn upload_full(&mut self, bytes: &[u8], format: TextureFormat) -> Result<(), TextureError> {
        self.upload_region(bytes, format, 0, 0, self.extent.width, self.extent.height)
    }

    /// Replace the `width`x`height` region at `x`, `y` with `bytes` in `format` order.
    ///
    /// `bytes` must hold exactly the region. The region must lie inside the texture.
    pub fn upload_region(
        &mut self,
        bytes: &[u8],
        format: TextureFormat,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<(), TextureError> {
        let size = Self::check_size(bytes, width, height)?;

        debug_assert!(
            u64::from(x) + u64::from(width) <= u64::from(self.extent.width)
                && u64::from(y) + u64::from(height) <= u64::from(self.extent.height),
            "Region {width}x{height}+{x}+{y} is outside the {}x{} texture",
            self.extent.width,
            self.extent.height
        );

        if size == 0 {
            return Ok(());
        }

        match self.staging.as_ref() {
            Some(staging) => unsafe {
                debug_assert!(size as u64 <= staging.size);

                let mapped = slice::from_raw_parts_mut(staging.pointer.as_ptr(), size);
                format.convert_into(self.format, bytes, mapped);

                self.copy_from_buffer(staging.buffer, x, y, width, height)?;
            },

            None => unsafe {
                let (buffer, memory) =
                    Staging::allocate(&self.vulkan, size as u64, "Upload Staging")?;

                let result = self
                    .write_staging(memory, size, bytes, format)
                    .and_then(|()| self.copy_from_buffer(buffer, x, y, width, height));

                Staging::free(&self.vulkan, buffer, memory);
                result?;
            },
        }

        self.mipmaps.mark_dirty();

        Ok(())
    }

    unsafe fn write_staging(
        &self,
        memory: vk::DeviceMemory,
        size: usize,
        bytes: &[u8],
        format: TextureFormat,
    ) -> Result<(), TextureError> {
        let device = unsafe { self.vulkan.device() };

        let pointer =
            unsafe { device.map_memory(memory, 0, size as u64, vk::MemoryMapFlags::empty()) }
                .map_err(|e| VkError::new(e, "vkMapMemory"))?;

        let mapped = unsafe { slice::from_raw_parts_mut(pointer.cast::<u8>(), size) };
        format.convert_into(self.format, bytes, mapped);

        unsafe { device.unmap_memory(memory) };

        Ok(())
    }

    /// Copies a tightly packed region from `buffer` into mip level 0.
    unsafe fn copy_from_buffer(
        &self,
        buffer: vk::Buffer,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<(), TextureError> {
        let image = self.image;

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
                        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    );

                    let region = vk::BufferImageCopy::default()
                        .buffer_offset(0)
                        .buffer_row_length(width)
                        .buffer_image_height(height)
                        .image_subresource(Self::layers(0))
                        .image_offset(vk::Offset3D {
                            x: x as i32,
                            y: y as i32,
                            z: 0,
                        })
                        .image_extent(vk::Extent3D {
                            width,
                            height,
                            depth: 1,
                        });

                    vulkan.device().cmd_copy_buffer_to_image(
                        command_buffer,
                        buffer,
                        image,
                        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                        slice::from_ref(&region),
                    );

                    cmd_transition_image(
                        vulkan,
                        command_buffer,
                        image,
                        0,
                        1,
                        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                    );
                },
                "Upload Texture",
            )?;
        }

        Ok(())
    }
}
