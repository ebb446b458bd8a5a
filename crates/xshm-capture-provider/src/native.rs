use core::ptr::NonNull;

use thiserror::Error;

use crate::OutputRect;

/// Captured frames are always BGRA8.
pub const BYTES_PER_PIXEL: usize = 4;

/// A source of capture handles, one per output.
pub trait CaptureBackend: Send + Sync {
    /// The number of outputs the display server exposes.
    fn output_count(&self) -> u32;

    /// Create a capture handle for `output`.
    fn create(&self, output: u32) -> Result<NativeOutput, CreateError>;
}

/// A live capture handle and the rect of the output it captures.
pub struct NativeOutput {
    /// The capture handle, destroyed when dropped.
    pub capture: Box<dyn NativeCapture>,

    /// The geometry reported when the handle was created.
    pub rect: OutputRect,
}

/// One native capture handle.
///
/// Implementations are not required to be reentrant, callers serialise every call. Dropping the
/// value releases the native handle.
pub trait NativeCapture: Send {
    /// Begin streaming frames.
    fn start(&mut self) -> Result<(), NativeError>;

    /// Stop streaming frames.
    fn end(&mut self);

    /// The most recent frame, or `None` if no frame is ready.
    ///
    /// The returned buffer must stay valid until the next `frame`, `start` or `end` call on this
    /// handle, or until the handle is dropped.
    fn frame(&mut self) -> Option<NativeFrame>;

    /// The cursor position in global screen coordinates.
    ///
    /// Must leave the buffer of the last frame intact.
    fn cursor_position(&mut self) -> CursorPosition;
}

/// A frame buffer owned by the native layer.
#[derive(Debug)]
pub struct NativeFrame {
    pointer: NonNull<u8>,
    length: usize,
}

// The pointer is only dereferenced while the owning session is locked.
unsafe impl Send for NativeFrame {}

impl NativeFrame {
    /// Wrap a native buffer. Returns `None` for a null pointer or a negative length.
    pub unsafe fn new(pointer: *const u8, length: i32) -> Option<Self> {
        let pointer = NonNull::new(pointer.cast_mut())?;
        let length = usize::try_from(length).ok()?;

        Some(Self { pointer, length })
    }

    /// The length the native layer reported, in bytes.
    pub fn len(&self) -> usize {
        self.length
    }

    /// Whether the native layer reported an empty buffer.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// View the buffer.
    ///
    /// The caller must hold the session lock and guarantee no `frame`, `start` or `end` call was
    /// made on the handle since the frame was produced.
    pub(crate) unsafe fn as_bytes<'a>(&self) -> &'a [u8] {
        unsafe { core::slice::from_raw_parts(self.pointer.as_ptr(), self.length) }
    }
}

/// A cursor position in global screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CursorPosition {
    /// Horizontal position.
    pub x: i32,

    /// Vertical position.
    pub y: i32,
}

impl CursorPosition {
    /// Create a cursor position.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A native call returned a failure status.
#[derive(Debug, Error)]
#[error("Native {call} call failed with status {status}")]
pub struct NativeError {
    call: &'static str,
    status: i32,
}

impl NativeError {
    /// Create an error from a call label and the status it returned.
    pub fn new(call: &'static str, status: i32) -> Self {
        Self { call, status }
    }

    /// The call that failed.
    pub fn call(&self) -> &'static str {
        self.call
    }

    /// The status the call returned.
    pub fn status(&self) -> i32 {
        self.status
    }
}

/// Error variants from creating a capture handle.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CreateError {
    /// The output index is out of range.
    #[error("Output {output} does not exist, {count} outputs are available")]
    InvalidOutput {
        /// The requested output.
        output: u32,
        /// The number of outputs available.
        count: u32,
    },

    /// The native layer returned a null handle.
    #[error("The capture library could not create a handle for output {output}")]
    NullHandle {
        /// The requested output.
        output: u32,
    },

    /// The native layer reported a size that cannot hold a frame.
    #[error("Output {output} reported an invalid size {width}x{height}")]
    InvalidSize {
        /// The requested output.
        output: u32,
        /// The reported width.
        width: i32,
        /// The reported height.
        height: i32,
    },
}
