mod copy;
mod download;
mod format;
mod mipmaps;
mod new;
mod sampler;
mod upload;

use alloc::sync::Arc;
use core::ptr::NonNull;

use ash::vk;
use thiserror::Error;

use crate::{AllocationError, VkError, Vulkan};

pub use copy::CopyRegion;
pub use format::TextureFormat;
pub use sampler::SamplerSettings;

/// The most mip levels a texture has, levels 0 to 8.
const MAX_MIP_LEVELS: u32 = 9;

/// A GPU resident 2D texture.
///
/// Between operations the whole image is in `SHADER_READ_ONLY_OPTIMAL`. Every write marks the
/// mipmaps dirty, they are only rebuilt by [`GpuTexture::regenerate_mipmaps`].
pub struct GpuTexture {
    vulkan: Arc<Vulkan>,

    image: vk::Image,
    memory: vk::DeviceMemory,
    view: vk::ImageView,
    sampler: vk::Sampler,

    /// Dynamic textures keep a mapped staging buffer for their lifetime.
    staging: Option<Staging>,

    extent: vk::Extent2D,
    format: TextureFormat,
    mip_levels: u32,
    dynamic: bool,
    mipmaps: MipmapState,
}

// The mapped staging pointer is only written through `&mut self`.
unsafe impl Send for GpuTexture {}

/// A host visible buffer large enough for a full upload.
struct Staging {
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    pointer: NonNull<u8>,
    size: u64,
}

impl GpuTexture {
    /// The texture size in pixels.
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// The texture width in pixels.
    pub fn width(&self) -> u32 {
        self.extent.width
    }

    /// The texture height in pixels.
    pub fn height(&self) -> u32 {
        self.extent.height
    }

    /// The storage format.
    pub fn format(&self) -> TextureFormat {
        self.format
    }

    /// The number of mip levels.
    pub fn mip_levels(&self) -> u32 {
        self.mip_levels
    }

    /// Whether the texture was created for frequent uploads.
    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    /// Whether the content changed since the mipmaps were last regenerated.
    pub fn is_dirty(&self) -> bool {
        self.mipmaps.is_dirty()
    }

    /// Flag the mipmaps for regeneration, for content written outside of this type.
    pub fn mark_dirty(&mut self) {
        self.mipmaps.mark_dirty();
    }

    /// The native image handle.
    pub fn image(&self) -> vk::Image {
        self.image
    }

    /// A view over every mip level.
    pub fn view(&self) -> vk::ImageView {
        self.view
    }

    /// The sampler created with the texture's [`SamplerSettings`].
    pub fn sampler(&self) -> vk::Sampler {
        self.sampler
    }

    /// The context the texture was created with.
    pub fn vulkan(&self) -> &Arc<Vulkan> {
        &self.vulkan
    }

    /// The subresource layers for mip `level`.
    fn layers(level: u32) -> vk::ImageSubresourceLayers {
        vk::ImageSubresourceLayers::default()
            .aspect_mask(vk::ImageAspectFlags::COLOR)
            .mip_level(level)
            .base_array_layer(0)
            .layer_count(1)
    }

    /// Checks `bytes` holds exactly a `width`x`height` region.
    fn check_size(bytes: &[u8], width: u32, height: u32) -> Result<usize, TextureError> {
        let expected = width as usize * height as usize * TextureFormat::BYTES_PER_PIXEL;

        if bytes.len() != expected {
            return Err(TextureError::SizeMismatch {
                width,
                height,
                expected,
                actual: bytes.len(),
            });
        }

        Ok(expected)
    }
}

impl core::fmt::Debug for GpuTexture {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GpuTexture")
            .field("extent", &self.extent)
            .field("format", &self.format)
            .field("mip_levels", &self.mip_levels)
            .field("dynamic", &self.dynamic)
            .field("dirty", &self.mipmaps.is_dirty())
            .finish_non_exhaustive()
    }
}

impl Drop for GpuTexture {
    fn drop(&mut self) {
        unsafe {
            let _queue = self.vulkan.device_wait_idle();
            let device = self.vulkan.device();

            if let Some(staging) = self.staging.take() {
                device.unmap_memory(staging.memory);
                device.destroy_buffer(staging.buffer, None);
                device.free_memory(staging.memory, None);
            }

            device.destroy_sampler(self.sampler, None);
            device.destroy_image_view(self.view, None);
            device.destroy_image(self.image, None);
            device.free_memory(self.memory, None);
        }
    }
}

/// The number of mip levels for a texture of `extent`.
pub(crate) fn mip_levels_for(extent: vk::Extent2D) -> u32 {
    let largest = extent.width.max(extent.height).max(1);
    let full_chain = u32::BITS - largest.leading_zeros();

    full_chain.min(MAX_MIP_LEVELS)
}

/// Tracks whether the mipmaps are out of date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct MipmapState {
    dirty: bool,
}

impl MipmapState {
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Runs `regenerate` if dirty, returning whether it ran. The flag is only cleared when
    /// `regenerate` succeeds.
    pub fn regenerate_with<E, F>(&mut self, regenerate: F) -> Result<bool, E>
    where
        F: FnOnce() -> Result<(), E>,
    {
        if !self.dirty {
            return Ok(false);
        }

        regenerate()?;
        self.dirty = false;

        Ok(true)
    }
}

/// GPU Texture error variants.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TextureError {
    /// A Vulkan call returned an error.
    #[error(transparent)]
    VkError(#[from] VkError),

    /// An allocation failed.
    #[error("Failed to allocate texture resources:\n{0}")]
    Allocation(#[from] AllocationError),

    /// The image file could not be decoded.
    #[error("Failed to load image:\n{0}")]
    Image(#[from] image::ImageError),

    /// The buffer does not hold exactly the region being uploaded.
    #[error("A {width}x{height} region needs {expected} bytes, got {actual}")]
    SizeMismatch {
        /// The region width.
        width: u32,
        /// The region height.
        height: u32,
        /// The bytes the region needs.
        expected: usize,
        /// The bytes provided.
        actual: usize,
    },

    /// A texture must be at least 1x1.
    #[error("Cannot create a {0}x{1} texture")]
    EmptyExtent(u32, u32),

    /// The textures were created with different Vulkan contexts.
    #[error("Cannot copy between textures of different Vulkan contexts")]
    ForeignTexture,
}
