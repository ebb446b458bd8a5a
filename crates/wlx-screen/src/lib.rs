//! # WLX Screen
//! Streams X11 outputs into GPU textures for the overlay renderer.
//!
//! Every output gets a [`ScreenOverlay`](overlay::ScreenOverlay) that polls its prefetcher once
//! per tick, uploads the newest frame and shows the cursor. The
//! [`RenderLoop`](render_loop::RenderLoop) drives the ticks.
//!

#![allow(clippy::std_instead_of_alloc)]

extern crate alloc;

/// The user configuration file.
pub mod config;
/// Application directories.
pub mod directories;
/// Reporting fatal and ignorable errors.
pub mod failure;
/// Logging to stdout and the log file.
pub mod logger;
/// Streaming one output into a texture.
pub mod overlay;
/// The fixed cadence render loop.
pub mod render_loop;
#[cfg(test)]
mod test_support;

/// The Cargo package version.
#[cfg(not(debug_assertions))]
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The Cargo package version or '0.0.0' if a non-release build.
#[cfg(debug_assertions)]
pub const VERSION: &str = "0.0.0";

/// If this instance should have debug enabled.
pub fn should_debug() -> bool {
    std::env::args().any(|arg| arg.eq("--debug"))
}

/// If this instance should capture the synthetic test pattern.
pub fn should_use_synthetic() -> bool {
    std::env::args().any(|arg| arg.eq("--synthetic"))
}

/// The frame limit passed with `--frames <n>`.
pub fn frame_limit() -> Option<u64> {
    use failure::Failure;

    let mut args = std::env::args().skip_while(|arg| arg != "--frames");
    args.next()?;

    let value = args.next().report_and_panic("--frames needs a value");
    Some(value.parse().report_and_panic("--frames must be a number"))
}
