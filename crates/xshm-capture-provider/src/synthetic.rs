use core::time::Duration;
use std::time::Instant;

use tracing::debug;

use crate::{
    BYTES_PER_PIXEL, CaptureBackend, CreateError, CursorPosition, NativeCapture, NativeError,
    NativeFrame, NativeOutput, OutputRect,
};

/// Height of the band that moves down the test pattern each frame.
const BAND_HEIGHT: u32 = 16;

/// Horizontal cursor speed in pixels per second.
const CURSOR_SPEED: f32 = 240.0;

/// A capture backend that renders a test pattern instead of talking to a display server.
///
/// Every frame moves a coloured band down the output and the cursor sweeps horizontally across
/// the union of all outputs.
#[derive(Debug, Clone)]
pub struct SyntheticCapture {
    outputs: Vec<OutputRect>,
    frame_delay: Duration,
    epoch: Instant,
}

impl SyntheticCapture {
    /// Create a backend exposing `outputs`.
    pub fn new(outputs: Vec<OutputRect>) -> Self {
        Self {
            outputs,
            frame_delay: Duration::ZERO,
            epoch: Instant::now(),
        }
    }

    /// Delay every frame pull by `delay`, emulating a slow display server.
    pub fn with_frame_delay(mut self, delay: Duration) -> Self {
        self.frame_delay = delay;
        self
    }

    fn bounds(&self) -> OutputRect {
        self.outputs
            .iter()
            .skip(1)
            .fold(self.outputs.first().copied().unwrap_or_default(), |bounds, rect| {
                bounds.union(rect)
            })
    }
}

impl Default for SyntheticCapture {
    /// Two 1920x1080 outputs side by side.
    fn default() -> Self {
        Self::new(vec![
            OutputRect::new([0, 0], [1920, 1080]),
            OutputRect::new([1920, 0], [1920, 1080]),
        ])
    }
}

impl CaptureBackend for SyntheticCapture {
    fn output_count(&self) -> u32 {
        self.outputs.len() as u32
    }

    fn create(&self, output: u32) -> Result<NativeOutput, CreateError> {
        let rect = *self
            .outputs
            .get(output as usize)
            .ok_or(CreateError::InvalidOutput {
                output,
                count: self.output_count(),
            })?;

        let mut buffer = vec![0; rect.expected_frame_length()];
        fill_gradient(&mut buffer, rect.width());

        debug!("Created synthetic capture for output {output}: {rect}");

        Ok(NativeOutput {
            capture: Box::new(SyntheticOutput {
                rect,
                bounds: self.bounds(),
                buffer,
                frame_index: 0,
                capturing: false,
                frame_delay: self.frame_delay,
                epoch: self.epoch,
            }),
            rect,
        })
    }
}

struct SyntheticOutput {
    rect: OutputRect,
    bounds: OutputRect,
    buffer: Vec<u8>,
    frame_index: u32,
    capturing: bool,
    frame_delay: Duration,
    epoch: Instant,
}

impl NativeCapture for SyntheticOutput {
    fn start(&mut self) -> Result<(), NativeError> {
        self.capturing = true;
        Ok(())
    }

    fn end(&mut self) {
        self.capturing = false;
    }

    fn frame(&mut self) -> Option<NativeFrame> {
        if !self.capturing {
            return None;
        }

        if !self.frame_delay.is_zero() {
            std::thread::sleep(self.frame_delay);
        }

        self.draw_band();
        self.frame_index = self.frame_index.wrapping_add(1);

        let length = i32::try_from(self.buffer.len()).ok()?;
        unsafe { NativeFrame::new(self.buffer.as_ptr(), length) }
    }

    fn cursor_position(&mut self) -> CursorPosition {
        let width = self.bounds.width().max(1) as f32;
        let travelled = self.epoch.elapsed().as_secs_f32() * CURSOR_SPEED;

        let x = self.bounds.position[0] + (travelled % width) as i32;
        let y = self.bounds.position[1] + (self.bounds.height() / 2) as i32;

        CursorPosition::new(x, y)
    }
}

impl SyntheticOutput {
    /// Paints a band whose colour and row depend on the frame index.
    fn draw_band(&mut self) {
        let height = self.rect.height();
        let stride = self.rect.width() as usize * BYTES_PER_PIXEL;

        let top = (self.frame_index * BAND_HEIGHT) % height.max(1);
        let bottom = (top + BAND_HEIGHT).min(height);

        let shade = (self.frame_index % 256) as u8;
        let pixel = [shade, 255 - shade, 128, 255];

        for row in top..bottom {
            let start = row as usize * stride;
            for chunk in self.buffer[start..start + stride].chunks_exact_mut(BYTES_PER_PIXEL) {
                chunk.copy_from_slice(&pixel);
            }
        }
    }
}

/// Fills a BGRA buffer with a horizontal gradient.
fn fill_gradient(buffer: &mut [u8], width: u32) {
    let width = width.max(1) as usize;

    for (index, pixel) in buffer.chunks_exact_mut(BYTES_PER_PIXEL).enumerate() {
        let x = index % width;
        let value = (x * 255 / width) as u8;
        pixel.copy_from_slice(&[value, value, value, 255]);
    }
}
