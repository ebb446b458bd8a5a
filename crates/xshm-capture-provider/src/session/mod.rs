mod frame_buffer;

use alloc::sync::Arc;
use core::time::Duration;

use parking_lot::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, warn};
use utilities::RateLimiter;

use crate::{
    CaptureBackend, CreateError, CursorPosition, NativeCapture, NativeError, NativeFrame,
    OutputRect,
};

pub use frame_buffer::FrameBuffer;
pub(crate) use frame_buffer::ReleaseHook;

/// Options shared by every session a registry opens.
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    /// Minimum time between two warnings about discarded frames.
    pub corrupt_frame_warning_interval: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            corrupt_frame_warning_interval: Duration::from_secs(5),
        }
    }
}

/// A capture session for one output.
///
/// Every call into the native handle goes through one mutex, the capture library is not assumed
/// to be reentrant. Cloning the session clones a reference to the same handle.
///
/// Sessions are opened through [`SessionRegistry`](crate::SessionRegistry), which keeps at most one
/// live handle per output.
#[derive(Clone)]
pub struct CaptureSession {
    inner: Arc<Inner>,
}

struct Inner {
    output: u32,
    rect: OutputRect,
    state: Mutex<SessionState>,

    /// The last cursor sample, readable without waiting on the native layer.
    cursor: Mutex<Option<CursorPosition>>,
    corrupt_frames: RateLimiter,
}

/// The state behind the session lock.
pub(crate) struct SessionState {
    /// `None` once the session is disposed.
    native: Option<Box<dyn NativeCapture>>,
    capturing: bool,

    /// Bumped whenever a frame handed out earlier may have been invalidated by the native layer.
    generation: u64,
}

/// The outcome of one fetch on the prefetch worker.
pub(crate) enum Fetched {
    /// The native layer produced a frame.
    Frame { frame: NativeFrame, generation: u64 },

    /// No frame was ready.
    Empty,

    /// The session was stopped or disposed, the handle was not touched.
    Cancelled,
}

impl CaptureSession {
    /// Create the native handle for `output`.
    pub(crate) fn with_options(
        backend: &dyn CaptureBackend,
        output: u32,
        options: SessionOptions,
    ) -> Result<Self, CreateError> {
        let native = backend.create(output)?;

        Ok(Self {
            inner: Arc::new(Inner {
                output,
                rect: native.rect,
                state: Mutex::new(SessionState {
                    native: Some(native.capture),
                    capturing: false,
                    generation: 0,
                }),
                cursor: Mutex::new(None),
                corrupt_frames: RateLimiter::new(options.corrupt_frame_warning_interval),
            }),
        })
    }

    /// The output index this session captures.
    pub fn output(&self) -> u32 {
        self.inner.output
    }

    /// The desktop rect of the captured output.
    pub fn rect(&self) -> OutputRect {
        self.inner.rect
    }

    /// The length a valid frame must have.
    pub fn expected_frame_length(&self) -> usize {
        self.inner.rect.expected_frame_length()
    }

    /// Begin capturing. Does nothing if the session is already capturing.
    pub fn start(&self) -> Result<(), SessionError> {
        let mut state = self.inner.state.lock();
        let state = &mut *state;

        let native = state.native.as_mut().ok_or(SessionError::Disposed)?;
        if state.capturing {
            return Ok(());
        }

        native.start()?;
        state.capturing = true;
        state.generation += 1;

        debug!("Started capture on output {}", self.inner.output);
        Ok(())
    }

    /// Stop capturing. Does nothing if the session is not capturing.
    pub fn stop(&self) {
        let mut state = self.inner.state.lock();
        let state = &mut *state;

        let Some(native) = state.native.as_mut() else {
            return;
        };
        if !state.capturing {
            return;
        }

        native.end();
        state.capturing = false;
        state.generation += 1;

        debug!("Stopped capture on output {}", self.inner.output);
    }

    /// Whether the session is currently capturing.
    pub fn is_capturing(&self) -> bool {
        self.inner.state.lock().capturing
    }

    /// Whether the native handle has been destroyed.
    pub fn is_disposed(&self) -> bool {
        self.inner.state.lock().native.is_none()
    }

    /// Pull the most recent frame.
    ///
    /// Returns `None` if the session is not capturing, no frame is ready, or the frame does not
    /// have the expected length. The returned buffer keeps the session locked until dropped. The
    /// cursor is sampled along with the frame.
    pub fn pull_frame(&self) -> Option<FrameBuffer<'_>> {
        let mut state = self.inner.state.lock();

        if !state.capturing {
            return None;
        }
        let native = state.native.as_mut()?;

        let frame = native.frame();
        self.sample_cursor(&mut **native);

        // A frame the prefetch worker fetched earlier is overwritten.
        state.generation += 1;

        self.frame_buffer(state, frame?)
    }

    /// The cursor position sampled by the most recent fetch or query.
    ///
    /// Never waits on the native layer, so it is safe to call while a fetch is in flight. Returns
    /// `None` before the first sample and once the session is disposed.
    pub fn cursor_position(&self) -> Option<CursorPosition> {
        *self.inner.cursor.lock()
    }

    /// Query the global cursor position from the native layer.
    ///
    /// Waits for any in-flight fetch. Returns `None` once the session is disposed.
    pub fn query_cursor(&self) -> Option<CursorPosition> {
        let mut state = self.inner.state.lock();
        let native = state.native.as_mut()?;

        Some(self.sample_cursor(&mut **native))
    }

    /// Must be called with the session lock held.
    fn sample_cursor(&self, native: &mut dyn NativeCapture) -> CursorPosition {
        let position = native.cursor_position();
        *self.inner.cursor.lock() = Some(position);
        position
    }

    /// Stop capturing and destroy the native handle.
    ///
    /// Waits for any in-flight native call to finish. Safe to call more than once.
    pub fn dispose(&self) {
        let mut state = self.inner.state.lock();
        if dispose_state(&mut state, &mut self.inner.cursor.lock()) {
            debug!("Disposed capture session for output {}", self.inner.output);
        }
    }

    /// Fetch a frame and sample the cursor on behalf of the prefetch worker.
    pub(crate) fn fetch(&self) -> Fetched {
        let mut state = self.inner.state.lock();
        let generation = state.generation;

        if !state.capturing {
            return Fetched::Cancelled;
        }
        let Some(native) = state.native.as_mut() else {
            return Fetched::Cancelled;
        };

        let frame = native.frame();
        self.sample_cursor(&mut **native);

        match frame {
            Some(frame) => Fetched::Frame { frame, generation },
            None => Fetched::Empty,
        }
    }

    /// Turn a frame fetched earlier into a buffer, if nothing invalidated it in the meantime.
    pub(crate) fn claim(&self, frame: NativeFrame, generation: u64) -> Option<FrameBuffer<'_>> {
        let state = self.inner.state.lock();

        if !state.capturing || state.native.is_none() || state.generation != generation {
            debug!(
                "Dropping stale frame for output {} (generation {generation}, now {})",
                self.inner.output, state.generation
            );
            return None;
        }

        self.frame_buffer(state, frame)
    }

    fn frame_buffer<'a>(
        &'a self,
        state: MutexGuard<'a, SessionState>,
        frame: NativeFrame,
    ) -> Option<FrameBuffer<'a>> {
        let expected = self.expected_frame_length();

        if frame.len() != expected {
            if let Some(suppressed) = self.inner.corrupt_frames.check() {
                warn!(
                    "Discarding frame from output {}: {} bytes, expected {expected} \
                    ({suppressed} more discarded since the last warning)",
                    self.inner.output,
                    frame.len(),
                );
            }
            return None;
        }

        Some(FrameBuffer::new(state, frame, self.inner.rect))
    }
}

impl core::fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CaptureSession")
            .field("output", &self.inner.output)
            .field("rect", &self.inner.rect)
            .finish_non_exhaustive()
    }
}

/// Returns whether a handle was destroyed.
fn dispose_state(state: &mut SessionState, cursor: &mut Option<CursorPosition>) -> bool {
    let Some(mut native) = state.native.take() else {
        return false;
    };
    *cursor = None;

    if state.capturing {
        native.end();
    }
    state.capturing = false;
    state.generation += 1;

    drop(native);
    true
}

impl Drop for Inner {
    fn drop(&mut self) {
        if dispose_state(self.state.get_mut(), self.cursor.get_mut()) {
            debug!("Disposed capture session for output {} on drop", self.output);
        }
    }
}

/// Error variants from session operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    /// The session has been disposed.
    #[error("The capture session has been disposed")]
    Disposed,

    /// The native layer failed to start capturing.
    #[error("Failed to start capture:\n{0}")]
    Start(#[from] NativeError),
}
