use testing::{backend_from_args, setup_logger};
use tracing::info;
use xshm_capture_provider::SessionRegistry;

fn main() {
    let _logger = setup_logger().unwrap();

    let mut registry = SessionRegistry::new(backend_from_args());
    info!("{} outputs", registry.output_count());

    for output in registry.outputs() {
        let session = registry.open(output).unwrap();
        info!(
            "Output {output}: {} ({} bytes per frame)",
            session.rect(),
            session.expected_frame_length()
        );
    }

    if let Some(bounds) = registry.bounding_rect() {
        info!("Bounds: {bounds}");
    }
}
