use core::slice;

use ash::vk;
use tracing::debug;

use crate::helpers::{cmd_transition_image, onetime_command};

use super::{GpuTexture, TextureError};

impl GpuTexture {
    /// Rebuild the mip chain from level 0 if the content changed since the last regeneration.
    ///
    /// Returns whether any work was done. A clean texture records no commands.
    pub fn regenerate_mipmaps(&mut self) -> Result<bool, TextureError> {
        let mut state = self.mipmaps;
        let regenerated = state.regenerate_with(|| unsafe { self.record_mip_chain() });
        self.mipmaps = state;

        let regenerated = regenerated?;
        if regenerated {
            debug!(
                "Regenerated {} mip levels for {}x{} texture",
                self.mip_levels, self.extent.width, self.extent.height
            );
        }

        Ok(regenerated)
    }

    /// Blits each level into the next, halving the size each time.
    unsafe fn record_mip_chain(&self) -> Result<(), TextureError> {
        if self.mip_levels <= 1 {
            return Ok(());
        }

        let image = self.image;
        let levels = self.mip_levels;
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
                    cmd_transition_image(
                        vulkan,
                        command_buffer,
                        image,
                        1,
                        levels - 1,
                        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    );

                    for level in 1..levels {
                        let source = level_offset(extent, level - 1);
                        let destination = level_offset(extent, level);

                        let blit = vk::ImageBlit::default()
                            .src_subresource(Self::layers(level - 1))
                            .src_offsets([vk::Offset3D::default(), source])
                            .dst_subresource(Self::layers(level))
                            .dst_offsets([vk::Offset3D::default(), destination]);

                        vulkan.device().cmd_blit_image(
                            command_buffer,
                            image,
                            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                            image,
                            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                            slice::from_ref(&blit),
                            vk::Filter::LINEAR,
                        );

                        cmd_transition_image(
                            vulkan,
                            command_buffer,
                            image,
                            level,
                            1,
                            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                        );
                    }

                    cmd_transition_image(
                        vulkan,
                        command_buffer,
                        image,
                        0,
                        levels,
                        vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                    );
                },
                "Regenerate Mipmaps",
            )?;
        }

        Ok(())
    }
}

/// The far corner of mip `level`.
fn level_offset(extent: vk::Extent2D, level: u32) -> vk::Offset3D {
    vk::Offset3D {
        x: (extent.width >> level).max(1) as i32,
        y: (extent.height >> level).max(1) as i32,
        z: 1,
    }
}
