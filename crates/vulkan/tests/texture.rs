//! Tests for GpuTexture
//!

extern crate alloc;

mod common;

use alloc::sync::Arc;

use common::{random_pixels, try_vulkan};
use vulkan::{CopyRegion, GpuTexture, TextureError, TextureFormat, Vulkan};

const WIDTH: u32 = 64;
const HEIGHT: u32 = 32;

fn pixel(bytes: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
    let start = (y as usize * width as usize + x as usize) * 4;
    [
        bytes[start],
        bytes[start + 1],
        bytes[start + 2],
        bytes[start + 3],
    ]
}

#[test]
fn upload_then_download() {
    let Some(vulkan) = try_vulkan() else {
        return;
    };

    for dynamic in [false, true] {
        let mut texture =
            GpuTexture::new(Arc::clone(&vulkan), WIDTH, HEIGHT, TextureFormat::Bgra8, dynamic)
                .unwrap();
        assert_eq!(texture.is_dynamic(), dynamic);
        assert_eq!(texture.mip_levels(), 7);

        let pixels = random_pixels(WIDTH, HEIGHT);
        texture.upload_full(&pixels, TextureFormat::Bgra8).unwrap();

        assert_eq!(texture.download().unwrap(), pixels);
    }
}

#[test]
fn upload_swizzles_channels() {
    let Some(vulkan) = try_vulkan() else {
        return;
    };

    let mut texture = GpuTexture::new(vulkan, 2, 1, TextureFormat::Rgba8, true).unwrap();
    texture
        .upload_full(&[10, 20, 30, 255, 40, 50, 60, 255], TextureFormat::Bgra8)
        .unwrap();

    assert_eq!(
        texture.download().unwrap(),
        vec![30, 20, 10, 255, 60, 50, 40, 255]
    );
}

#[test]
fn upload_region_leaves_rest() {
    let Some(vulkan) = try_vulkan() else {
        return;
    };

    let mut texture = GpuTexture::new(vulkan, WIDTH, HEIGHT, TextureFormat::Bgra8, false).unwrap();
    texture
        .upload_full(&vec![0; (WIDTH * HEIGHT * 4) as usize], TextureFormat::Bgra8)
        .unwrap();

    texture
        .upload_region(&[255; 8 * 4 * 4], TextureFormat::Bgra8, 10, 5, 8, 4)
        .unwrap();

    let bytes = texture.download().unwrap();
    assert_eq!(pixel(&bytes, WIDTH, 10, 5), [255; 4]);
    assert_eq!(pixel(&bytes, WIDTH, 17, 8), [255; 4]);
    assert_eq!(pixel(&bytes, WIDTH, 9, 5), [0; 4]);
    assert_eq!(pixel(&bytes, WIDTH, 18, 5), [0; 4]);
    assert_eq!(pixel(&bytes, WIDTH, 10, 9), [0; 4]);
}

#[test]
fn mismatched_upload_is_rejected() {
    let Some(vulkan) = try_vulkan() else {
        return;
    };

    let mut texture = GpuTexture::new(vulkan, WIDTH, HEIGHT, TextureFormat::Bgra8, true).unwrap();
    let pixels = random_pixels(WIDTH, HEIGHT);
    texture.upload_full(&pixels, TextureFormat::Bgra8).unwrap();
    assert!(texture.regenerate_mipmaps().unwrap());

    let result = texture.upload_full(&pixels[1..], TextureFormat::Bgra8);
    assert!(matches!(
        result,
        Err(TextureError::SizeMismatch {
            expected: 8192,
            actual: 8191,
            ..
        })
    ));

    assert!(!texture.is_dirty());
    assert_eq!(texture.download().unwrap(), pixels);
}

#[test]
fn mipmaps_regenerate_only_when_dirty() {
    let Some(vulkan) = try_vulkan() else {
        return;
    };

    let mut texture = GpuTexture::new(vulkan, WIDTH, HEIGHT, TextureFormat::Bgra8, true).unwrap();
    assert!(texture.is_dirty());
    assert!(texture.regenerate_mipmaps().unwrap());
    assert!(!texture.regenerate_mipmaps().unwrap());

    for _ in 0..3 {
        texture
            .upload_full(&random_pixels(WIDTH, HEIGHT), TextureFormat::Bgra8)
            .unwrap();
    }
    assert!(texture.is_dirty());
    assert!(texture.regenerate_mipmaps().unwrap());
    assert!(!texture.regenerate_mipmaps().unwrap());

    texture.mark_dirty();
    assert!(texture.regenerate_mipmaps().unwrap());
}

#[test]
fn copy_marks_target_dirty() {
    let Some(vulkan) = try_vulkan() else {
        return;
    };

    let pixels = random_pixels(WIDTH, HEIGHT);
    let source = GpuTexture::from_raw(
        Arc::clone(&vulkan),
        &pixels,
        WIDTH,
        HEIGHT,
        TextureFormat::Bgra8,
        TextureFormat::Bgra8,
    )
    .unwrap();

    let mut target = GpuTexture::new(vulkan, WIDTH, HEIGHT, TextureFormat::Bgra8, false).unwrap();
    assert!(target.regenerate_mipmaps().unwrap());

    source.copy_to(&mut target, CopyRegion::FULL).unwrap();
    assert!(target.is_dirty());
    assert_eq!(target.download().unwrap(), pixels);
}

#[test]
fn copy_region_offsets() {
    let Some(vulkan) = try_vulkan() else {
        return;
    };

    let pixels = random_pixels(WIDTH, HEIGHT);
    let source = GpuTexture::from_raw(
        Arc::clone(&vulkan),
        &pixels,
        WIDTH,
        HEIGHT,
        TextureFormat::Bgra8,
        TextureFormat::Bgra8,
    )
    .unwrap();

    let mut target = GpuTexture::new(vulkan, 16, 16, TextureFormat::Bgra8, false).unwrap();
    target
        .upload_full(&[0; 16 * 16 * 4], TextureFormat::Bgra8)
        .unwrap();

    let region = CopyRegion {
        size: [4, 4],
        source: [20, 10],
        destination: [2, 3],
    };
    source.copy_to(&mut target, region).unwrap();

    let bytes = target.download().unwrap();
    assert_eq!(pixel(&bytes, 16, 2, 3), pixel(&pixels, WIDTH, 20, 10));
    assert_eq!(pixel(&bytes, 16, 5, 6), pixel(&pixels, WIDTH, 23, 13));
    assert_eq!(pixel(&bytes, 16, 6, 3), [0; 4]);
}

#[test]
fn copy_between_contexts_fails() {
    let Some(first) = try_vulkan() else {
        return;
    };
    let Ok(second) = Vulkan::new(false) else {
        return;
    };

    let source = GpuTexture::new(first, 4, 4, TextureFormat::Bgra8, false).unwrap();
    let mut target = GpuTexture::new(Arc::new(second), 4, 4, TextureFormat::Bgra8, false).unwrap();

    assert!(matches!(
        source.copy_to(&mut target, CopyRegion::FULL),
        Err(TextureError::ForeignTexture)
    ));
}

#[test]
fn still_image_is_flipped() {
    let Some(vulkan) = try_vulkan() else {
        return;
    };

    let mut image = image::RgbaImage::new(2, 2);
    for x in 0..2 {
        image.put_pixel(x, 0, image::Rgba([255, 0, 0, 255]));
        image.put_pixel(x, 1, image::Rgba([0, 0, 255, 255]));
    }

    let path = std::env::temp_dir().join(format!("wlx-screen-flip-{}.png", std::process::id()));
    image.save(&path).unwrap();

    let texture = GpuTexture::from_image_file(vulkan, &path, TextureFormat::Rgba8).unwrap();
    std::fs::remove_file(&path).unwrap();

    let bytes = texture.download().unwrap();
    assert_eq!(pixel(&bytes, 2, 0, 0), [0, 0, 255, 255]);
    assert_eq!(pixel(&bytes, 2, 1, 1), [255, 0, 0, 255]);
}

#[test]
fn empty_texture_is_rejected() {
    let Some(vulkan) = try_vulkan() else {
        return;
    };

    assert!(matches!(
        GpuTexture::new(vulkan, 0, 16, TextureFormat::Bgra8, false),
        Err(TextureError::EmptyExtent(0, 16))
    ));
}
