use parking_lot::MutexGuard;

use crate::{NativeFrame, OutputRect};

use super::SessionState;

/// Called when a [`FrameBuffer`] is released.
pub(crate) trait ReleaseHook {
    fn released(&self);
}

/// A validated BGRA8 frame, still owned by the native layer.
///
/// The buffer holds the session lock, so no native call can overwrite or free the frame while it
/// is alive. Release it as soon as the upload is done, any call into the session made while the
/// buffer is held deadlocks.
pub struct FrameBuffer<'a> {
    state: Option<MutexGuard<'a, SessionState>>,
    frame: NativeFrame,
    rect: OutputRect,
    release: Option<&'a dyn ReleaseHook>,
}

impl<'a> FrameBuffer<'a> {
    pub(super) fn new(
        state: MutexGuard<'a, SessionState>,
        frame: NativeFrame,
        rect: OutputRect,
    ) -> Self {
        Self {
            state: Some(state),
            frame,
            rect,
            release: None,
        }
    }

    /// Run `hook` after the buffer and its lock are released.
    pub(crate) fn on_release(mut self, hook: &'a dyn ReleaseHook) -> Self {
        self.release = Some(hook);
        self
    }

    /// The frame bytes in BGRA8 order.
    pub fn as_bytes(&self) -> &[u8] {
        // The session lock is held and the generation was checked when the buffer was created.
        unsafe { self.frame.as_bytes() }
    }

    /// The frame length in bytes.
    pub fn len(&self) -> usize {
        self.frame.len()
    }

    /// Whether the frame is empty.
    pub fn is_empty(&self) -> bool {
        self.frame.is_empty()
    }

    /// The frame width in pixels.
    pub fn width(&self) -> u32 {
        self.rect.width()
    }

    /// The frame height in pixels.
    pub fn height(&self) -> u32 {
        self.rect.height()
    }
}

impl core::fmt::Debug for FrameBuffer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("length", &self.frame.len())
            .field("rect", &self.rect)
            .finish_non_exhaustive()
    }
}

impl Drop for FrameBuffer<'_> {
    fn drop(&mut self) {
        drop(self.state.take());

        if let Some(hook) = self.release {
            hook.released();
        }
    }
}
