use core::time::Duration;

use testing::{backend_from_args, setup_logger, wait_for_frame};
use tracing::{info, warn};
use utilities::display_duration;
use xshm_capture_provider::{FramePrefetcher, SessionRegistry};

const SAMPLES: usize = 120;

fn main() {
    let _logger = setup_logger().unwrap();

    let backend = backend_from_args();
    let mut registry = SessionRegistry::new(backend);
    let session = registry.open(0).unwrap();
    session.start().unwrap();

    let mut prefetcher = FramePrefetcher::new(session.clone()).unwrap();
    prefetcher.resume();

    let mut latencies = Vec::with_capacity(SAMPLES);
    for _ in 0..SAMPLES {
        match wait_for_frame(&mut prefetcher, Duration::from_secs(1), |frame| frame.len()) {
            Some((_, latency)) => latencies.push(latency),
            None => warn!("Timed out waiting for a frame"),
        }
    }

    let cursor = session.cursor_position();
    info!("Cursor: {cursor:?}");

    drop(prefetcher);
    registry.close(0);

    if latencies.is_empty() {
        warn!("No frames were captured");
        return;
    }

    latencies.sort_unstable();
    let total: Duration = latencies.iter().sum();

    info!(
        "{} frames | min {} | median {} | max {} | mean {}",
        latencies.len(),
        display_duration(latencies[0]),
        display_duration(latencies[latencies.len() / 2]),
        display_duration(latencies[latencies.len() - 1]),
        display_duration(total / latencies.len() as u32)
    );
}
