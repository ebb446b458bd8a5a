use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

extern crate alloc;

use alloc::sync::Arc;
use core::time::Duration;
use std::time::Instant;

use tracing::{
    Level, info,
    subscriber::{SetGlobalDefaultError, set_global_default},
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt};
use xshm_capture_provider::{CaptureBackend, FrameBuffer, FramePrefetcher, SyntheticCapture, WlxShm};

pub fn setup_logger() -> Result<WorkerGuard, SetGlobalDefaultError> {
    let filter = tracing_subscriber::filter::Targets::new().with_default(Level::TRACE);

    // stdout logger
    let (std_writer, std_guard) = tracing_appender::non_blocking(std::io::stdout());
    let std_logger = tracing_subscriber::fmt::layer()
        .with_writer(std_writer)
        .with_ansi(false)
        .with_target(false)
        .with_thread_names(true)
        .with_span_events(FmtSpan::CLOSE | FmtSpan::ENTER);

    // Register loggers
    let collector = tracing_subscriber::registry().with(std_logger).with(filter);

    set_global_default(collector)?;

    info!("Application Start");
    Ok(std_guard)
}

/// The synthetic backend with `--synthetic`, otherwise the X11 capture library.
pub fn backend_from_args() -> Arc<dyn CaptureBackend> {
    if std::env::args().any(|arg| arg == "--synthetic") {
        info!("Using the synthetic backend");
        Arc::new(SyntheticCapture::default().with_frame_delay(Duration::from_millis(8)))
    } else {
        Arc::new(WlxShm::load_default().unwrap())
    }
}

/// Poll `prefetcher` until it yields a frame, passing the frame to `f`.
///
/// Returns what `f` returned and how long the frame took, or `None` on timeout.
pub fn wait_for_frame<R, F>(
    prefetcher: &mut FramePrefetcher,
    timeout: Duration,
    f: F,
) -> Option<(R, Duration)>
where
    F: FnOnce(&FrameBuffer<'_>) -> R,
{
    let start = Instant::now();

    loop {
        if let Some(frame) = prefetcher.poll() {
            let elapsed = start.elapsed();
            return Some((f(&frame), elapsed));
        }

        if start.elapsed() >= timeout {
            return None;
        }

        std::thread::sleep(Duration::from_micros(200));
    }
}
