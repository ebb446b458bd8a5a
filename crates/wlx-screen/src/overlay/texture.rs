use vulkan::{GpuTexture, TextureError, TextureFormat};

/// The texture a screen overlay streams frames into. Every upload is BGRA8.
pub trait OverlayTexture {
    /// The texture size in pixels.
    fn size(&self) -> [u32; 2];

    /// Replace the whole texture.
    fn upload_frame(&mut self, bytes: &[u8]) -> Result<(), TextureError>;

    /// Replace the `width`x`height` region at `x`, `y`.
    fn upload_region(
        &mut self,
        bytes: &[u8],
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<(), TextureError>;

    /// Rebuild the mipmaps if the content changed, returning whether any work ran.
    fn regenerate_mipmaps(&mut self) -> Result<bool, TextureError>;
}

impl OverlayTexture for GpuTexture {
    fn size(&self) -> [u32; 2] {
        [self.width(), self.height()]
    }

    fn upload_frame(&mut self, bytes: &[u8]) -> Result<(), TextureError> {
        self.upload_full(bytes, TextureFormat::Bgra8)
    }

    fn upload_region(
        &mut self,
        bytes: &[u8],
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<(), TextureError> {
        Self::upload_region(self, bytes, TextureFormat::Bgra8, x, y, width, height)
    }

    fn regenerate_mipmaps(&mut self) -> Result<bool, TextureError> {
        Self::regenerate_mipmaps(self)
    }
}
