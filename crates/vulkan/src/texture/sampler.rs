use ash::vk;

use crate::{Vulkan, VkError};

/// How a texture is sampled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerSettings {
    /// Horizontal wrap mode.
    pub address_mode_u: vk::SamplerAddressMode,

    /// Vertical wrap mode.
    pub address_mode_v: vk::SamplerAddressMode,

    /// Filter when the texture is minified.
    pub min_filter: vk::Filter,

    /// Filter when the texture is magnified.
    pub mag_filter: vk::Filter,

    /// Filter between mip levels.
    pub mipmap_mode: vk::SamplerMipmapMode,

    /// The lowest mip level sampled.
    pub min_lod: f32,

    /// The highest mip level sampled.
    pub max_lod: f32,
}

impl Default for SamplerSettings {
    /// Clamped on both axes, trilinear minification, linear magnification, mip levels 0 to 8.
    fn default() -> Self {
        Self {
            address_mode_u: vk::SamplerAddressMode::CLAMP_TO_EDGE,
            address_mode_v: vk::SamplerAddressMode::CLAMP_TO_EDGE,
            min_filter: vk::Filter::LINEAR,
            mag_filter: vk::Filter::LINEAR,
            mipmap_mode: vk::SamplerMipmapMode::LINEAR,
            min_lod: 0.0,
            max_lod: 8.0,
        }
    }
}

impl SamplerSettings {
    pub(crate) unsafe fn create(&self, vulkan: &Vulkan) -> Result<vk::Sampler, VkError> {
        let create_info = vk::SamplerCreateInfo::default()
            .address_mode_u(self.address_mode_u)
            .address_mode_v(self.address_mode_v)
            .address_mode_w(vk::SamplerAddressMode::CLAMP_TO_EDGE)
            .min_filter(self.min_filter)
            .mag_filter(self.mag_filter)
            .mipmap_mode(self.mipmap_mode)
            .min_lod(self.min_lod)
            .max_lod(self.max_lod);

        unsafe { vulkan.device().create_sampler(&create_info, None) }
            .map_err(|e| VkError::new(e, "vkCreateSampler"))
    }
}
