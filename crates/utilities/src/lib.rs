//! # Utilities
//! Small helpers shared by the capture provider, the Vulkan crate and the overlay.
//!

pub use rate_limit::RateLimiter;
pub use timing::{DebugTime, display_duration};

mod rate_limit;
mod timing;
