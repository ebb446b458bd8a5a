use alloc::sync::Arc;
use core::time::Duration;
use std::time::Instant;

use parking_lot::Mutex;
use vulkan::TextureError;
use xshm_capture_provider::{
    BYTES_PER_PIXEL, CaptureBackend, CreateError, CursorPosition, NativeCapture, NativeError,
    NativeFrame, NativeOutput, OutputRect, SessionRegistry,
};

use crate::overlay::OverlayTexture;

/// A CPU texture that records every upload.
#[derive(Debug, Clone)]
pub struct FakeTexture {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    uploads: usize,
    frames: usize,
    dirty: bool,
    regenerations: usize,
}

impl FakeTexture {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * BYTES_PER_PIXEL],
            uploads: 0,
            frames: 0,
            dirty: true,
            regenerations: 0,
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let start = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        let mut pixel = [0; 4];
        pixel.copy_from_slice(&self.pixels[start..start + BYTES_PER_PIXEL]);
        pixel
    }

    pub fn uploads(&self) -> usize {
        self.uploads
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn regenerations(&self) -> usize {
        self.regenerations
    }
}

impl OverlayTexture for FakeTexture {
    fn size(&self) -> [u32; 2] {
        [self.width, self.height]
    }

    fn upload_frame(&mut self, bytes: &[u8]) -> Result<(), TextureError> {
        self.upload_region(bytes, 0, 0, self.width, self.height)?;
        self.frames += 1;
        Ok(())
    }

    fn upload_region(
        &mut self,
        bytes: &[u8],
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<(), TextureError> {
        let expected = width as usize * height as usize * BYTES_PER_PIXEL;
        if bytes.len() != expected {
            return Err(TextureError::SizeMismatch {
                width,
                height,
                expected,
                actual: bytes.len(),
            });
        }

        let stride = width as usize * BYTES_PER_PIXEL;
        for (row, source) in bytes.chunks_exact(stride.max(1)).enumerate() {
            let start =
                ((y as usize + row) * self.width as usize + x as usize) * BYTES_PER_PIXEL;
            self.pixels[start..start + stride].copy_from_slice(source);
        }

        self.uploads += 1;
        self.dirty = true;
        Ok(())
    }

    fn regenerate_mipmaps(&mut self) -> Result<bool, TextureError> {
        if !self.dirty {
            return Ok(false);
        }

        self.dirty = false;
        self.regenerations += 1;
        Ok(true)
    }
}

/// State shared between a [`TestBackend`] and its test.
#[derive(Debug)]
pub struct TestState {
    pub cursor: CursorPosition,
    pub cursor_queries: usize,
    /// Frame length to report, the expected length when `None`.
    pub frame_length: Option<usize>,
    pub frame_delay: Duration,
    pub frames: usize,
}

/// A backend whose frames are filled with the frame index and whose cursor is set by the test.
#[derive(Clone)]
pub struct TestBackend {
    rects: Vec<OutputRect>,
    pub state: Arc<Mutex<TestState>>,
}

impl TestBackend {
    pub fn new(rects: Vec<OutputRect>) -> Self {
        Self {
            rects,
            state: Arc::new(Mutex::new(TestState {
                cursor: CursorPosition::default(),
                cursor_queries: 0,
                frame_length: None,
                frame_delay: Duration::ZERO,
                frames: 0,
            })),
        }
    }

    pub fn set_cursor(&self, x: i32, y: i32) {
        self.state.lock().cursor = CursorPosition::new(x, y);
    }

    /// A registry over this backend. Its sessions are disposed when it is dropped.
    pub fn registry(&self) -> SessionRegistry {
        SessionRegistry::new(Arc::new(self.clone()))
    }
}

impl CaptureBackend for TestBackend {
    fn output_count(&self) -> u32 {
        self.rects.len() as u32
    }

    fn create(&self, output: u32) -> Result<NativeOutput, CreateError> {
        let rect = *self
            .rects
            .get(output as usize)
            .ok_or(CreateError::InvalidOutput {
                output,
                count: self.output_count(),
            })?;

        Ok(NativeOutput {
            capture: Box::new(TestCapture {
                rect,
                state: Arc::clone(&self.state),
                buffer: Vec::new(),
            }),
            rect,
        })
    }
}

struct TestCapture {
    rect: OutputRect,
    state: Arc<Mutex<TestState>>,
    buffer: Vec<u8>,
}

impl NativeCapture for TestCapture {
    fn start(&mut self) -> Result<(), NativeError> {
        Ok(())
    }

    fn end(&mut self) {}

    fn frame(&mut self) -> Option<NativeFrame> {
        let (length, delay, index) = {
            let mut state = self.state.lock();
            state.frames += 1;
            (
                state
                    .frame_length
                    .unwrap_or(self.rect.expected_frame_length()),
                state.frame_delay,
                state.frames,
            )
        };

        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        self.buffer = vec![index as u8; length];
        unsafe { NativeFrame::new(self.buffer.as_ptr(), length as i32) }
    }

    fn cursor_position(&mut self) -> CursorPosition {
        let mut state = self.state.lock();
        state.cursor_queries += 1;
        state.cursor
    }
}

/// Poll `f` until it returns `true`, failing after five seconds.
pub fn wait_until<F: FnMut() -> bool>(mut f: F) {
    let start = Instant::now();
    while !f() {
        assert!(
            start.elapsed() < Duration::from_secs(5),
            "Timed out waiting for condition"
        );
        std::thread::sleep(Duration::from_millis(1));
    }
}
