use ash::vk;

/// The channel order of a texture or of the bytes uploaded into it. Both orders store 8 bits per
/// channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::exhaustive_enums)]
pub enum TextureFormat {
    /// `R8G8B8A8_UNORM`
    Rgba8,

    /// `B8G8R8A8_UNORM`, the order captured frames arrive in.
    Bgra8,
}

impl TextureFormat {
    /// Every supported format.
    pub const ALL: [Self; 2] = [Self::Rgba8, Self::Bgra8];

    /// The number of bytes one pixel occupies.
    pub const BYTES_PER_PIXEL: usize = 4;

    /// The matching Vulkan format.
    pub fn vk_format(self) -> vk::Format {
        match self {
            Self::Rgba8 => vk::Format::R8G8B8A8_UNORM,
            Self::Bgra8 => vk::Format::B8G8R8A8_UNORM,
        }
    }

    /// Copy `source` in this channel order into `destination` in `target` order.
    pub(crate) fn convert_into(self, target: Self, source: &[u8], destination: &mut [u8]) {
        destination.copy_from_slice(source);

        if self != target {
            for pixel in destination.chunks_exact_mut(Self::BYTES_PER_PIXEL) {
                pixel.swap(0, 2);
            }
        }
    }
}
