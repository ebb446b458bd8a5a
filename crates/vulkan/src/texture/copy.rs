use alloc::sync::Arc;
use core::slice;

use ash::vk;

use crate::helpers::{cmd_transition_image, onetime_command};

use super::{GpuTexture, TextureError};

/// The region [`GpuTexture::copy_to`] copies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyRegion {
    /// The region size, a zero component uses the full source size on that axis.
    pub size: [u32; 2],

    /// The top left corner in the source.
    pub source: [u32; 2],

    /// The top left corner in the target.
    pub destination: [u32; 2],
}

impl CopyRegion {
    /// The whole source, copied to the origin of the target.
    pub const FULL: Self = Self {
        size: [0, 0],
        source: [0, 0],
        destination: [0, 0],
    };

    /// The region size with zero components replaced by the source size.
    pub fn resolved_size(&self, source: vk::Extent2D) -> [u32; 2] {
        let width = if self.size[0] == 0 {
            source.width
        } else {
            self.size[0]
        };
        let height = if self.size[1] == 0 {
            source.height
        } else {
            self.size[1]
        };

        [width, height]
    }
}

impl GpuTexture {
    /// Copy a region of this texture into `target` on the GPU and mark `target` dirty.
    ///
    /// Both textures must come from the same context, the region must lie inside both.
    pub fn copy_to(&self, target: &mut Self, region: CopyRegion) -> Result<(), TextureError> {
        if !Arc::ptr_eq(&self.vulkan, &target.vulkan) {
            return Err(TextureError::ForeignTexture);
        }

        let [width, height] = region.resolved_size(self.extent);
        let [source_x, source_y] = region.source;
        let [target_x, target_y] = region.destination;

        debug_assert!(
            u64::from(source_x) + u64::from(width) <= u64::from(self.extent.width)
                && u64::from(source_y) + u64::from(height) <= u64::from(self.extent.height),
            "Copy source is outside the texture"
        );
        debug_assert!(
            u64::from(target_x) + u64::from(width) <= u64::from(target.extent.width)
                && u64::from(target_y) + u64::from(height) <= u64::from(target.extent.height),
            "Copy destination is outside the target texture"
        );

        let source_image = self.image;
        let target_image = target.image;

        unsafe {
            onetime_command(
                &self.vulkan,
                |vulkan, command_buffer| {
                    cmd_transition_image(
                        vulkan,
                        command_buffer,
                        source_image,
                        0,
                        1,
                        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                        vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                    );
                    cmd_transition_image(
                        vulkan,
                        command_buffer,
                        target_image,
                        0,
                        1,
                        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    );

                    let copy = vk::ImageCopy::default()
                        .src_subresource(Self::layers(0))
                        .src_offset(vk::Offset3D {
                            x: source_x as i32,
                            y: source_y as i32,
                            z: 0,
                        })
                        .dst_subresource(Self::layers(0))
                        .dst_offset(vk::Offset3D {
                            x: target_x as i32,
                            y: target_y as i32,
                            z: 0,
                        })
                        .extent(vk::Extent3D {
                            width,
                            height,
                            depth: 1,
                        });

                    vulkan.device().cmd_copy_image(
                        command_buffer,
                        source_image,
                        vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                        target_image,
                        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                        slice::from_ref(&copy),
                    );

                    cmd_transition_image(
                        vulkan,
                        command_buffer,
                        source_image,
                        0,
                        1,
                        vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                    );
                    cmd_transition_image(
                        vulkan,
                        command_buffer,
                        target_image,
                        0,
                        1,
                        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                    );
                },
                "Copy Texture",
            )?;
        }

        target.mipmaps.mark_dirty();

        Ok(())
    }
}
