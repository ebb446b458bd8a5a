mod cursor;
mod texture;

use core::fmt::Display;
use std::io;

use tracing::{debug, info};
use vulkan::TextureError;
use xshm_capture_provider::{CaptureSession, FramePrefetcher, SessionError};

pub use cursor::{
    BLACK, CursorMode, CursorPlacement, CursorSink, CursorTracker, CurvedSurface, SharedCursor,
    WHITE, draw_cross, draw_fallback_cursor,
};
pub use texture::OverlayTexture;

/// How a screen overlay shows the cursor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlaySettings {
    /// Whether the cursor is drawn or placed.
    pub cursor_mode: CursorMode,

    /// Arm length of the fallback cross in pixels.
    pub cursor_size: u32,

    /// The surface the overlay is shown on.
    pub surface: CurvedSurface,
}

/// State shared by every overlay rendered in one tick.
pub struct TickContext<'a> {
    /// The cursor position cache for this tick.
    pub cursor: &'a mut CursorTracker,
    /// Receives placements in [`CursorMode::Curved`].
    pub sink: &'a mut dyn CursorSink,
}

/// What happened to the cursor during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CursorOutcome {
    /// The overlay is hidden or the cursor could not be queried.
    #[default]
    Unknown,

    /// The cursor is on another output.
    Outside,

    /// A fallback cross was drawn at the output relative position.
    Drawn([u32; 2]),

    /// The cursor object was moved.
    Placed(CursorPlacement),
}

/// The result of rendering one overlay for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TickOutcome {
    /// Whether a new frame was uploaded.
    pub uploaded: bool,

    /// What happened to the cursor.
    pub cursor: CursorOutcome,
}

/// Streams one output into a texture.
pub struct ScreenOverlay<T: OverlayTexture> {
    session: CaptureSession,
    prefetcher: FramePrefetcher,
    texture: T,
    settings: OverlaySettings,
    visible: bool,
}

impl<T: OverlayTexture> ScreenOverlay<T> {
    /// Create a hidden overlay for `session`.
    pub fn new(session: CaptureSession, texture: T, settings: OverlaySettings) -> io::Result<Self> {
        let prefetcher = FramePrefetcher::new(session.clone())?;

        Ok(Self {
            session,
            prefetcher,
            texture,
            settings,
            visible: false,
        })
    }

    /// Start capturing and prefetching frames.
    pub fn show(&mut self) -> Result<(), SessionError> {
        self.session.start()?;
        self.prefetcher.resume();
        self.visible = true;

        info!("Showing {self}");
        Ok(())
    }

    /// Stop prefetching and capturing. The texture keeps the last frame.
    pub fn hide(&mut self) {
        self.prefetcher.pause();
        self.session.stop();
        self.visible = false;

        info!("Hid {self}");
    }

    /// Whether the overlay is shown.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// The session the overlay captures from.
    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    /// The prefetcher feeding the overlay.
    pub fn prefetcher(&self) -> &FramePrefetcher {
        &self.prefetcher
    }

    /// The texture frames are uploaded into.
    pub fn texture(&self) -> &T {
        &self.texture
    }

    /// The texture frames are uploaded into.
    pub fn texture_mut(&mut self) -> &mut T {
        &mut self.texture
    }

    /// Upload the latest frame and show the cursor.
    ///
    /// Never waits for the capture library, a frame that is not ready yet is picked up on a later
    /// tick.
    pub fn render(&mut self, context: &mut TickContext<'_>) -> Result<TickOutcome, TextureError> {
        if !self.visible {
            return Ok(TickOutcome::default());
        }

        let cursor = context.cursor.position(&self.session);

        let uploaded = match self.prefetcher.poll() {
            Some(frame) if frame.len() == self.session.expected_frame_length() => {
                self.texture.upload_frame(frame.as_bytes())?;
                true
            }
            _ => false,
        };

        let rect = self.session.rect();
        let cursor = match cursor {
            None => CursorOutcome::Unknown,
            Some(cursor) => match rect.relative_cursor(cursor) {
                None => CursorOutcome::Outside,
                Some(relative) => self.show_cursor(relative, rect.size, context.sink)?,
            },
        };

        Ok(TickOutcome { uploaded, cursor })
    }

    fn show_cursor(
        &mut self,
        [x, y]: [u32; 2],
        size: [u32; 2],
        sink: &mut dyn CursorSink,
    ) -> Result<CursorOutcome, TextureError> {
        match self.settings.cursor_mode {
            CursorMode::Fallback => {
                draw_fallback_cursor(&mut self.texture, x, y, self.settings.cursor_size)?;
                Ok(CursorOutcome::Drawn([x, y]))
            }

            CursorMode::Curved => {
                let uv = [x as f32 / size[0] as f32, y as f32 / size[1] as f32];
                let placement = self.settings.surface.transform_from_uv(uv);
                sink.move_to(self.session.output(), placement);

                Ok(CursorOutcome::Placed(placement))
            }
        }
    }

    /// Stop capturing and destroy the capture handle.
    pub fn dispose(&mut self) {
        self.prefetcher.pause();
        self.session.dispose();
        self.visible = false;

        debug!("Disposed {self}");
    }
}

impl<T: OverlayTexture> Display for ScreenOverlay<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Scr {}", self.session.output())
    }
}

impl<T: OverlayTexture> core::fmt::Debug for ScreenOverlay<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ScreenOverlay")
            .field("session", &self.session)
            .field("prefetcher", &self.prefetcher)
            .field("visible", &self.visible)
            .finish_non_exhaustive()
    }
}
