extern crate alloc;

use alloc::sync::Arc;
use core::time::Duration;

use testing::{backend_from_args, setup_logger, wait_for_frame};
use tracing::info;
use utilities::DebugTime;
use vulkan::{GpuTexture, TextureFormat, Vulkan};
use xshm_capture_provider::{FramePrefetcher, SessionRegistry};

fn main() {
    let _logger = setup_logger().unwrap();

    let vulkan = Arc::new(Vulkan::new(true).unwrap());

    let backend = backend_from_args();
    let mut registry = SessionRegistry::new(backend);
    let session = registry.open(0).unwrap();
    let rect = session.rect();
    session.start().unwrap();

    let mut texture = GpuTexture::new(
        Arc::clone(&vulkan),
        rect.width(),
        rect.height(),
        TextureFormat::Rgba8,
        true,
    )
    .unwrap();

    let mut prefetcher = FramePrefetcher::new(session.clone()).unwrap();
    prefetcher.resume();

    let (upload, latency) = wait_for_frame(&mut prefetcher, Duration::from_secs(5), |frame| {
        let _timing = DebugTime::start("Upload frame");
        texture.upload_full(frame.as_bytes(), TextureFormat::Bgra8)
    })
    .unwrap();
    upload.unwrap();
    info!("Frame arrived after {latency:?}");

    drop(prefetcher);
    registry.close(0);

    texture.regenerate_mipmaps().unwrap();
    let pixels = texture.download().unwrap();

    let image = image::RgbaImage::from_raw(rect.width(), rect.height(), pixels).unwrap();
    image.save("frame.png").unwrap();
    info!("Saved frame.png");
}
