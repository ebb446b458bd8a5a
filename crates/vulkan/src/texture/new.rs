use alloc::sync::Arc;
use core::ptr::NonNull;
use std::path::Path;

use ash::vk;
use tracing::debug;
use utilities::DebugTime;

use crate::{
    Vulkan,
    VkError,
    helpers::{allocate_buffer, allocate_image, cmd_transition_image, onetime_command, try_name},
};

use super::{
    GpuTexture, MipmapState, SamplerSettings, Staging, TextureError, TextureFormat, mip_levels_for,
};

impl GpuTexture {
    /// Reserve storage for a `width`x`height` texture without initial content.
    ///
    /// Dynamic textures keep a mapped staging buffer so per-frame uploads allocate nothing.
    pub fn new(
        vulkan: Arc<Vulkan>,
        width: u32,
        height: u32,
        format: TextureFormat,
        dynamic: bool,
    ) -> Result<Self, TextureError> {
        Self::with_sampler(
            vulkan,
            width,
            height,
            format,
            dynamic,
            SamplerSettings::default(),
        )
    }

    /// Reserve storage for a texture sampled with `sampler_settings`.
    pub fn with_sampler(
        vulkan: Arc<Vulkan>,
        width: u32,
        height: u32,
        format: TextureFormat,
        dynamic: bool,
        sampler_settings: SamplerSettings,
    ) -> Result<Self, TextureError> {
        if width == 0 || height == 0 {
            return Err(TextureError::EmptyExtent(width, height));
        }

        let extent = vk::Extent2D { width, height };
        let mip_levels = mip_levels_for(extent);

        let (image, memory) = unsafe {
            let create_info = vk::ImageCreateInfo::default()
                .image_type(vk::ImageType::TYPE_2D)
                .format(format.vk_format())
                .extent(extent.into())
                .mip_levels(mip_levels)
                .array_layers(1)
                .samples(vk::SampleCountFlags::TYPE_1)
                .tiling(vk::ImageTiling::OPTIMAL)
                .usage(
                    vk::ImageUsageFlags::TRANSFER_SRC
                        | vk::ImageUsageFlags::TRANSFER_DST
                        | vk::ImageUsageFlags::SAMPLED,
                )
                .sharing_mode(vk::SharingMode::EXCLUSIVE)
                .queue_family_indices(vulkan.queue_family_index_as_slice())
                .initial_layout(vk::ImageLayout::UNDEFINED);

            allocate_image(&vulkan, &create_info, "Gpu Texture")?
        };

        // From here on the texture owns every handle, an early return destroys them in drop.
        let mut texture = Self {
            vulkan,
            image,
            memory,
            view: vk::ImageView::null(),
            sampler: vk::Sampler::null(),
            staging: None,
            extent,
            format,
            mip_levels,
            dynamic,
            mipmaps: MipmapState::default(),
        };

        texture.view = unsafe {
            let create_info = vk::ImageViewCreateInfo::default()
                .format(format.vk_format())
                .view_type(vk::ImageViewType::TYPE_2D)
                .image(image)
                .subresource_range(
                    vk::ImageSubresourceRange::default()
                        .aspect_mask(vk::ImageAspectFlags::COLOR)
                        .base_array_layer(0)
                        .base_mip_level(0)
                        .layer_count(1)
                        .level_count(mip_levels),
                );

            texture
                .vulkan
                .device()
                .create_image_view(&create_info, None)
                .map_err(|e| VkError::new(e, "vkCreateImageView"))?
        };

        texture.sampler = unsafe { sampler_settings.create(&texture.vulkan)? };

        if dynamic {
            texture.staging = Some(unsafe { Staging::new(&texture.vulkan, extent)? });
        }

        unsafe {
            onetime_command(
                &texture.vulkan,
                |vulkan, command_buffer| {
                    cmd_transition_image(
                        vulkan,
                        command_buffer,
                        image,
                        0,
                        mip_levels,
                        vk::ImageLayout::UNDEFINED,
                        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                    );
                },
                "Prepare Texture",
            )?;

            try_name(&texture.vulkan, texture.view, "Gpu Texture View");
            try_name(&texture.vulkan, texture.sampler, "Gpu Texture Sampler");
        }

        // The content is undefined until the first upload.
        texture.mipmaps.mark_dirty();

        debug!(
            "Created {}x{} {:?} texture with {mip_levels} mip levels (dynamic: {dynamic})",
            width, height, format
        );

        Ok(texture)
    }

    /// Create a texture from a raw buffer in `input_format`, uploading it immediately.
    pub fn from_raw(
        vulkan: Arc<Vulkan>,
        bytes: &[u8],
        width: u32,
        height: u32,
        input_format: TextureFormat,
        storage_format: TextureFormat,
    ) -> Result<Self, TextureError> {
        Self::check_size(bytes, width, height)?;

        let mut texture = Self::new(vulkan, width, height, storage_format, false)?;
        texture.upload_full(bytes, input_format)?;

        Ok(texture)
    }

    /// Create a texture from a decoded still image.
    ///
    /// Rows are uploaded bottom first, so row 0 of the texture is the last row of the image.
    pub fn from_image(
        vulkan: Arc<Vulkan>,
        image: &image::RgbaImage,
        storage_format: TextureFormat,
    ) -> Result<Self, TextureError> {
        let (width, height) = image.dimensions();
        let stride = width as usize * TextureFormat::BYTES_PER_PIXEL;

        let mut flipped = Vec::with_capacity(stride * height as usize);
        for row in image.as_raw().chunks_exact(stride.max(1)).rev() {
            flipped.extend_from_slice(row);
        }

        Self::from_raw(
            vulkan,
            &flipped,
            width,
            height,
            TextureFormat::Rgba8,
            storage_format,
        )
    }

    /// Load and decode an image file into a new texture, see [`GpuTexture::from_image`].
    pub fn from_image_file<P: AsRef<Path>>(
        vulkan: Arc<Vulkan>,
        path: P,
        storage_format: TextureFormat,
    ) -> Result<Self, TextureError> {
        let _timing = DebugTime::start(format!("Load {}", path.as_ref().display()));

        let image = image::open(path)?.to_rgba8();
        Self::from_image(vulkan, &image, storage_format)
    }
}

impl Staging {
    /// A host visible buffer that fits a full upload of `extent`, mapped until dropped.
    pub(super) unsafe fn new(vulkan: &Vulkan, extent: vk::Extent2D) -> Result<Self, TextureError> {
        let size = u64::from(extent.width)
            * u64::from(extent.height)
            * TextureFormat::BYTES_PER_PIXEL as u64;

        let (buffer, memory) = unsafe { Self::allocate(vulkan, size, "Texture Staging")? };

        let pointer = match unsafe {
            vulkan
                .device()
                .map_memory(memory, 0, size, vk::MemoryMapFlags::empty())
        } {
            Ok(pointer) => pointer,
            Err(e) => {
                unsafe { Self::free(vulkan, buffer, memory) };
                return Err(VkError::new(e, "vkMapMemory").into());
            }
        };

        let Some(pointer) = NonNull::new(pointer.cast::<u8>()) else {
            unsafe { Self::free(vulkan, buffer, memory) };
            return Err(VkError::new(vk::Result::ERROR_MEMORY_MAP_FAILED, "vkMapMemory").into());
        };

        Ok(Self {
            buffer,
            memory,
            pointer,
            size,
        })
    }

    /// A host visible, host coherent buffer usable as a transfer source and destination.
    pub(super) unsafe fn allocate(
        vulkan: &Vulkan,
        size: u64,
        name: &str,
    ) -> Result<(vk::Buffer, vk::DeviceMemory), TextureError> {
        let create_info = vk::BufferCreateInfo::default()
            .queue_family_indices(vulkan.queue_family_index_as_slice())
            .usage(vk::BufferUsageFlags::TRANSFER_SRC | vk::BufferUsageFlags::TRANSFER_DST)
            .size(size);

        let buffer = unsafe {
            allocate_buffer(
                vulkan,
                &create_info,
                vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
                name,
            )?
        };

        Ok(buffer)
    }

    pub(super) unsafe fn free(vulkan: &Vulkan, buffer: vk::Buffer, memory: vk::DeviceMemory) {
        unsafe {
            vulkan.device().destroy_buffer(buffer, None);
            vulkan.device().free_memory(memory, None);
        }
    }
}
