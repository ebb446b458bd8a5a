//! # XShm Capture Provider
//! Streams frames from the X11 shared-memory capture library (`libwlxshm.so`).
//!
//! A [`CaptureSession`] owns the native handle for one output and serialises every call into it.
//! A [`FramePrefetcher`] keeps one capture request in flight on a worker thread so the render
//! thread only ever polls. The [`SessionRegistry`] guarantees one session per output index.
//!

extern crate alloc;

pub use native::{
    BYTES_PER_PIXEL, CaptureBackend, CreateError, CursorPosition, NativeCapture, NativeError,
    NativeFrame, NativeOutput,
};
pub use output::OutputRect;
pub use prefetcher::{FramePrefetcher, PrefetchState};
pub use registry::{RegistryError, SessionRegistry};
pub use session::{CaptureSession, FrameBuffer, SessionError, SessionOptions};
pub use synthetic::SyntheticCapture;
pub use wlxshm::{LIBRARY_NAME, LoadError, WlxShm};

mod native;
mod output;
mod prefetcher;
mod registry;
mod session;
mod synthetic;
mod wlxshm;
