use alloc::sync::Arc;
use core::f32::consts::PI;

use parking_lot::Mutex;
use tracing::trace;
use vulkan::TextureError;
use xshm_capture_provider::{CaptureSession, CursorPosition};

use super::OverlayTexture;

/// BGRA white.
pub const WHITE: [u8; 4] = [255, 255, 255, 255];

/// BGRA black.
pub const BLACK: [u8; 4] = [0, 0, 0, 255];

/// How the cursor is shown on a screen overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorMode {
    /// Draw a cross into the screen texture.
    Fallback,

    /// Move a separate cursor object over the curved screen surface.
    Curved,
}

/// Caches the global cursor position for one render tick.
///
/// The cursor is global, so every overlay rendered in the same tick shares one position. Positions
/// come from the samples the prefetch workers take, reading one never waits on a capture.
#[derive(Debug, Default)]
pub struct CursorTracker {
    position: Option<CursorPosition>,
    queries: u64,
}

impl CursorTracker {
    /// A tracker that has not queried yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the cached position, the next call to [`CursorTracker::position`] queries again.
    pub fn begin_tick(&mut self) {
        self.position = None;
    }

    /// The cursor position for this tick, reading `session` if no overlay found one yet.
    ///
    /// A session without a sample, for example one that was disposed, leaves the next overlay to
    /// read its own session.
    pub fn position(&mut self, session: &CaptureSession) -> Option<CursorPosition> {
        if self.position.is_none() {
            self.position = session.cursor_position();
            self.queries += 1;

            trace!("Cursor for this tick: {:?}", self.position);
        }

        self.position
    }

    /// How many sessions were read in total.
    pub fn queries(&self) -> u64 {
        self.queries
    }
}

/// Draw a cross of `size` pixel arms centred on `x`, `y`, clipped to the texture.
pub fn draw_cross<T: OverlayTexture + ?Sized>(
    texture: &mut T,
    x: u32,
    y: u32,
    colour: [u8; 4],
    size: u32,
) -> Result<(), TextureError> {
    let [width, height] = texture.size();
    if x >= width || y >= height || size == 0 {
        return Ok(());
    }

    let half = size / 2;

    // Horizontal arm
    let left = x.saturating_sub(half);
    let right = x.saturating_add(half).min(width);
    let pixels = colour.repeat((right - left) as usize);
    texture.upload_region(&pixels, left, y, right - left, 1)?;

    // Vertical arm
    let top = y.saturating_sub(half);
    let bottom = y.saturating_add(half).min(height);
    let pixels = colour.repeat((bottom - top) as usize);
    texture.upload_region(&pixels, x, top, 1, bottom - top)?;

    Ok(())
}

/// The fallback marker, a white cross with a black shadow one pixel down and right.
pub fn draw_fallback_cursor<T: OverlayTexture + ?Sized>(
    texture: &mut T,
    x: u32,
    y: u32,
    size: u32,
) -> Result<(), TextureError> {
    draw_cross(texture, x, y, WHITE, size)?;
    draw_cross(texture, x.saturating_add(1), y.saturating_add(1), BLACK, size)
}

/// The surface a screen overlay is shown on, bent around the viewer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurvedSurface {
    /// Width of the surface in metres.
    pub width: f32,

    /// Height of the surface in metres.
    pub height: f32,

    /// Inverse radius in 1/m, `0.0` is flat.
    pub curvature: f32,
}

/// A pose on the overlay surface, relative to the centre of the overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CursorPlacement {
    /// Position in metres: right, up and towards the viewer.
    pub position: [f32; 3],

    /// Rotation around the vertical axis in radians, facing the centre of curvature.
    pub yaw: f32,
}

impl CurvedSurface {
    /// The placement of the point at `uv`, where `[0, 0]` is the top left corner of the screen.
    pub fn transform_from_uv(&self, uv: [f32; 2]) -> CursorPlacement {
        let along = (uv[0] - 0.5) * self.width;
        let up = (0.5 - uv[1]) * self.height;

        if self.curvature <= f32::EPSILON {
            return CursorPlacement {
                position: [along, up, 0.0],
                yaw: 0.0,
            };
        }

        let radius = 1.0 / self.curvature;
        let angle = (along / radius).clamp(-PI, PI);

        CursorPlacement {
            position: [
                radius * angle.sin(),
                up,
                radius * (1.0 - angle.cos()),
            ],
            yaw: -angle,
        }
    }
}

/// Receives the cursor placement in [`CursorMode::Curved`].
pub trait CursorSink {
    /// Move the cursor object of `output` to `placement`.
    fn move_to(&mut self, output: u32, placement: CursorPlacement);
}

/// A cursor sink that keeps the latest placement for whoever draws the cursor object.
#[derive(Debug, Clone, Default)]
pub struct SharedCursor {
    latest: Arc<Mutex<Option<(u32, CursorPlacement)>>>,
}

impl SharedCursor {
    /// A sink without a placement.
    pub fn new() -> Self {
        Self::default()
    }

    /// The output and placement of the most recent move.
    pub fn latest(&self) -> Option<(u32, CursorPlacement)> {
        *self.latest.lock()
    }
}

impl CursorSink for SharedCursor {
    fn move_to(&mut self, output: u32, placement: CursorPlacement) {
        trace!("Cursor on output {output} at {:?}", placement.position);
        *self.latest.lock() = Some((output, placement));
    }
}

#[cfg(test)]
mod tests {
    use xshm_capture_provider::{CursorPosition, OutputRect};

    use super::{BLACK, CursorTracker, CurvedSurface, WHITE, draw_cross, draw_fallback_cursor};
    use crate::test_support::{FakeTexture, TestBackend};

    #[test]
    fn position_is_read_once_per_tick() {
        let backend = TestBackend::new(vec![OutputRect::new([0, 0], [16, 16])]);
        backend.set_cursor(4, 5);
        let mut registry = backend.registry();
        let session = registry.open(0).unwrap();
        assert!(session.query_cursor().is_some());

        let mut tracker = CursorTracker::new();
        for _ in 0..3 {
            tracker.begin_tick();
            assert_eq!(tracker.position(&session), Some(CursorPosition::new(4, 5)));
            assert_eq!(tracker.position(&session), Some(CursorPosition::new(4, 5)));
        }

        assert_eq!(tracker.queries(), 3);
    }

    #[test]
    fn disposed_session_does_not_hide_cursor() {
        let backend = TestBackend::new(vec![
            OutputRect::new([0, 0], [16, 16]),
            OutputRect::new([16, 0], [16, 16]),
        ]);
        backend.set_cursor(20, 5);
        let mut registry = backend.registry();
        let disposed = registry.open(0).unwrap();
        let live = registry.open(1).unwrap();

        assert!(live.query_cursor().is_some());
        disposed.dispose();

        let mut tracker = CursorTracker::new();
        tracker.begin_tick();

        assert_eq!(tracker.position(&disposed), None);
        assert_eq!(tracker.position(&live), Some(CursorPosition::new(20, 5)));
        assert_eq!(tracker.position(&disposed), Some(CursorPosition::new(20, 5)));
        assert_eq!(tracker.queries(), 2);
    }

    #[test]
    fn cross_is_centred() {
        let mut texture = FakeTexture::new(32, 32);
        draw_cross(&mut texture, 10, 10, WHITE, 8).unwrap();

        for x in 6..14 {
            assert_eq!(texture.pixel(x, 10), WHITE, "x = {x}");
        }
        for y in 6..14 {
            assert_eq!(texture.pixel(10, y), WHITE, "y = {y}");
        }
        assert_ne!(texture.pixel(5, 10), WHITE);
        assert_ne!(texture.pixel(14, 10), WHITE);
        assert_ne!(texture.pixel(11, 11), WHITE);
    }

    #[test]
    fn cross_is_clipped() {
        let mut texture = FakeTexture::new(16, 16);
        draw_cross(&mut texture, 1, 15, WHITE, 8).unwrap();

        assert_eq!(texture.pixel(0, 15), WHITE);
        assert_eq!(texture.pixel(4, 15), WHITE);
        assert_eq!(texture.pixel(1, 11), WHITE);
        assert_eq!(texture.uploads(), 2);
    }

    #[test]
    fn cross_outside_is_skipped() {
        let mut texture = FakeTexture::new(16, 16);
        draw_cross(&mut texture, 16, 3, WHITE, 8).unwrap();

        assert_eq!(texture.uploads(), 0);
    }

    #[test]
    fn fallback_cursor_is_two_pixels_wide() {
        let mut texture = FakeTexture::new(32, 32);
        draw_fallback_cursor(&mut texture, 10, 10, 8).unwrap();

        assert_eq!(texture.pixel(8, 10), WHITE);
        assert_eq!(texture.pixel(8, 11), BLACK);
        assert_eq!(texture.pixel(10, 8), WHITE);
        assert_eq!(texture.pixel(11, 8), BLACK);
        // The shadow is drawn last.
        assert_eq!(texture.pixel(11, 11), BLACK);
    }

    #[test]
    fn flat_surface() {
        let surface = CurvedSurface {
            width: 2.0,
            height: 1.0,
            curvature: 0.0,
        };

        let centre = surface.transform_from_uv([0.5, 0.5]);
        assert_eq!(centre.position, [0.0, 0.0, 0.0]);

        let corner = surface.transform_from_uv([0.0, 0.0]);
        assert_eq!(corner.position, [-1.0, 0.5, 0.0]);
        assert_eq!(corner.yaw, 0.0);
    }

    #[test]
    fn curved_surface_bends_towards_viewer() {
        let surface = CurvedSurface {
            width: 2.0,
            height: 1.0,
            curvature: 0.5,
        };

        let left = surface.transform_from_uv([0.0, 0.5]);
        let right = surface.transform_from_uv([1.0, 0.5]);

        assert!((left.position[0] + right.position[0]).abs() < 1e-6);
        assert!((left.position[2] - right.position[2]).abs() < 1e-6);
        assert!(left.position[2] > 0.0);
        assert!(right.position[0] < 1.0);
        assert!((left.yaw + right.yaw).abs() < 1e-6);
        assert!(right.yaw < 0.0);
    }
}
