use core::time::Duration;
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, info, info_span};
use utilities::display_duration;
use vulkan::TextureError;

use crate::overlay::{CursorSink, CursorTracker, OverlayTexture, ScreenOverlay, TickContext};

/// Renders every overlay at a fixed cadence.
pub struct RenderLoop<T: OverlayTexture> {
    overlays: Vec<ScreenOverlay<T>>,
    cursor: CursorTracker,
    sink: Box<dyn CursorSink>,
    tick_interval: Duration,
    frame_limit: Option<u64>,
    stats: LoopStats,
}

/// Counters for the ticks rendered so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Ticks rendered.
    pub ticks: u64,

    /// Frames uploaded across every overlay.
    pub uploads: u64,

    /// Textures whose mipmaps were rebuilt, counted once per texture and tick.
    pub mipmap_regenerations: u64,
}

impl<T: OverlayTexture> RenderLoop<T> {
    /// Render `overlays` every `tick_interval`, handing cursor placements to `sink`.
    pub fn new(
        overlays: Vec<ScreenOverlay<T>>,
        sink: Box<dyn CursorSink>,
        tick_interval: Duration,
    ) -> Self {
        Self {
            overlays,
            cursor: CursorTracker::new(),
            sink,
            tick_interval,
            frame_limit: None,
            stats: LoopStats::default(),
        }
    }

    /// Stop after `frames` ticks.
    pub fn with_frame_limit(mut self, frames: Option<u64>) -> Self {
        self.frame_limit = frames;
        self
    }

    /// The overlays in render order.
    pub fn overlays(&self) -> &[ScreenOverlay<T>] {
        &self.overlays
    }

    /// Counters for the ticks rendered so far.
    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    /// The cursor cache shared by the overlays.
    pub fn cursor(&self) -> &CursorTracker {
        &self.cursor
    }

    /// Show every overlay.
    pub fn show_all(&mut self) -> Result<(), RenderError> {
        for overlay in &mut self.overlays {
            overlay.show()?;
        }

        Ok(())
    }

    /// Hide every overlay.
    pub fn hide_all(&mut self) {
        for overlay in &mut self.overlays {
            overlay.hide();
        }
    }

    /// Render one tick.
    pub fn tick(&mut self) -> Result<(), RenderError> {
        self.cursor.begin_tick();

        let mut context = TickContext {
            cursor: &mut self.cursor,
            sink: self.sink.as_mut(),
        };

        for overlay in &mut self.overlays {
            let outcome = overlay.render(&mut context)?;
            if outcome.uploaded {
                self.stats.uploads += 1;
            }

            if overlay.texture_mut().regenerate_mipmaps()? {
                self.stats.mipmap_regenerations += 1;
            }
        }

        self.stats.ticks += 1;

        Ok(())
    }

    /// Tick until the frame limit is reached, or forever without one.
    pub fn run(&mut self) -> Result<LoopStats, RenderError> {
        let _span = info_span!("[Render Loop]").entered();
        info!(
            "Rendering {} overlays every {}",
            self.overlays.len(),
            display_duration(self.tick_interval)
        );

        let start = Instant::now();
        let mut deadline = start;

        while self
            .frame_limit
            .is_none_or(|limit| self.stats.ticks < limit)
        {
            self.tick()?;

            deadline += self.tick_interval;
            let now = Instant::now();
            if deadline > now {
                std::thread::sleep(deadline - now);
            } else {
                // Fell behind, skip the missed ticks.
                debug!("Tick took longer than {}", display_duration(self.tick_interval));
                deadline = now;
            }
        }

        info!(
            "Rendered {} ticks in {}, uploaded {} frames, queried the cursor {} times",
            self.stats.ticks,
            display_duration(start.elapsed()),
            self.stats.uploads,
            self.cursor.queries()
        );

        Ok(self.stats)
    }
}

impl<T: OverlayTexture> Drop for RenderLoop<T> {
    fn drop(&mut self) {
        for overlay in &mut self.overlays {
            overlay.dispose();
        }
    }
}

/// Error variants from rendering.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RenderError {
    /// An overlay could not start capturing.
    #[error("Failed to show overlay:\n{0}")]
    Show(#[from] xshm_capture_provider::SessionError),

    /// A texture operation failed.
    #[error("Failed to update texture:\n{0}")]
    Texture(#[from] TextureError),
}
