//! Shared helpers for the Vulkan tests.
//!

#![allow(dead_code)]

extern crate alloc;

use alloc::sync::Arc;

use vulkan::Vulkan;

/// Create a context, or `None` if the machine has no usable Vulkan device.
pub fn try_vulkan() -> Option<Arc<Vulkan>> {
    match Vulkan::new(true) {
        Ok(vulkan) => Some(Arc::new(vulkan)),
        Err(e) => {
            eprintln!("Skipping, Vulkan is unavailable: {e}");
            None
        }
    }
}

/// Random BGRA8 pixels.
pub fn random_pixels(width: u32, height: u32) -> Vec<u8> {
    (0..width as usize * height as usize * 4)
        .map(|_| rand::random::<u8>())
        .collect()
}
