//! # Vulkan
//! Contains the Vulkan components for the screen overlay: the headless Vulkan context and the
//! GPU textures frames are streamed into.
//!

#![warn(missing_docs)]

extern crate alloc;

pub use helpers::{AllocationError, VkError};
pub use texture::{CopyRegion, GpuTexture, SamplerSettings, TextureError, TextureFormat};
pub use vulkan::{Vulkan, VulkanCreationError};

mod helpers;
mod texture;
mod vulkan;
