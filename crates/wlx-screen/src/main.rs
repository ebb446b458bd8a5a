#![allow(clippy::std_instead_of_alloc)]

extern crate alloc;

use alloc::sync::Arc;

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use tracing::{debug, info, info_span, warn};
use vulkan::{GpuTexture, TextureFormat, Vulkan};
use wlx_screen::{
    VERSION,
    config::Config,
    failure::{Failure, report_and_panic},
    frame_limit,
    logger::setup_logger,
    overlay::{OverlaySettings, ScreenOverlay, SharedCursor},
    render_loop::RenderLoop,
    should_debug, should_use_synthetic,
};
use xshm_capture_provider::{CaptureBackend, SessionRegistry, SyntheticCapture, WlxShm};

fn main() {
    // Set up logger
    let _logger_guards =
        setup_logger(should_debug()).report_and_panic("Could not set up the logger");

    // Log application start
    let _span = info_span!("[Main Thread]").entered();
    info!("WLX Screen v{}", VERSION);

    // Load config
    let config = {
        let maybe_config = match Config::try_load_config() {
            Ok(maybe_config) => maybe_config,
            Err(error) => {
                warn!("Could not deserialize config file, using defaults:\n{error}");
                Some(Config::default())
            }
        };

        match maybe_config {
            Some(config) => config,
            None => {
                info!("Creating config file at {}", Config::file_path().display());
                let config = Config::default();
                config.save();
                config
            }
        }
    };

    let vulkan = Arc::new(
        Vulkan::new(config.debug_vulkan || should_debug())
            .report_and_panic("Could not create the Vulkan context"),
    );

    let backend: Arc<dyn CaptureBackend> = if should_use_synthetic() {
        info!("Capturing the synthetic test pattern");
        Arc::new(SyntheticCapture::default())
    } else {
        Arc::new(
            WlxShm::load(&config.library_path)
                .report_and_panic("Could not load the capture library"),
        )
    };

    let mut registry = SessionRegistry::with_options(backend, config.session_options());

    let outputs = match config.outputs.clone() {
        Some(outputs) => outputs,
        None => registry.outputs(),
    };
    if outputs.is_empty() {
        warn!("Exiting: No outputs to capture.");
        return;
    }

    let overlays: Vec<ScreenOverlay<GpuTexture>> = outputs
        .into_iter()
        .map(|output| {
            let session = registry
                .open(output)
                .report_and_panic("Could not open a capture session");
            let rect = session.rect();
            info!("Output {output}: {rect}");

            let texture = GpuTexture::new(
                Arc::clone(&vulkan),
                rect.width(),
                rect.height(),
                TextureFormat::Bgra8,
                true,
            )
            .report_and_panic("Could not create the screen texture");

            let settings = OverlaySettings {
                cursor_mode: config.cursor_mode(),
                cursor_size: config.cursor_size,
                surface: config.surface(rect.size),
            };

            ScreenOverlay::new(session, texture, settings)
                .report_and_panic("Could not start the prefetch worker")
        })
        .collect();

    if let Some(bounds) = registry.bounding_rect() {
        info!("Capturing {bounds}");
    }

    let cursor = SharedCursor::new();
    let mut render_loop = RenderLoop::new(
        overlays,
        Box::new(cursor.clone()),
        config.tick_interval(),
    )
    .with_frame_limit(frame_limit());

    render_loop
        .show_all()
        .report_and_panic("Could not show the screen overlays");

    let stats = match render_loop.run() {
        Ok(stats) => stats,
        Err(error) => report_and_panic(error, "Encountered an error while rendering"),
    };

    render_loop.hide_all();

    for overlay in render_loop.overlays() {
        debug!(
            "{overlay}: {} capture requests",
            overlay.prefetcher().requests_issued()
        );
    }
    debug!("Last cursor placement: {:?}", cursor.latest());

    info!(
        "Exiting: {} ticks, {} frames uploaded, {} mipmap regenerations",
        stats.ticks, stats.uploads, stats.mipmap_regenerations
    );
}
