use alloc::sync::Arc;
use core::{
    ffi::{c_int, c_void},
    ptr::NonNull,
};
use std::ffi::OsStr;

use libloading::Library;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    CaptureBackend, CreateError, CursorPosition, NativeCapture, NativeError, NativeFrame,
    NativeOutput, OutputRect,
};

/// The default name of the capture library.
pub const LIBRARY_NAME: &str = "libwlxshm.so";

#[repr(C)]
#[derive(Default, Clone, Copy)]
struct Vector2Int {
    x: c_int,
    y: c_int,
}

/// `buf_t` as returned by `wlxshm_capture_frame`.
#[repr(C)]
struct RawBuffer {
    length: c_int,
    buffer: *mut u8,
}

type Handle = *mut c_void;

struct Api {
    create: unsafe extern "C" fn(c_int, *mut Vector2Int, *mut Vector2Int) -> Handle,
    destroy: unsafe extern "C" fn(Handle),
    capture_start: unsafe extern "C" fn(Handle) -> c_int,
    capture_end: unsafe extern "C" fn(Handle),
    capture_frame: unsafe extern "C" fn(Handle) -> *mut RawBuffer,
    mouse_pos_global: unsafe extern "C" fn(Handle, *mut Vector2Int),
    num_screens: unsafe extern "C" fn() -> c_int,
}

struct Loaded {
    api: Api,

    // Must outlive every function pointer in `api`.
    _library: Library,
}

/// The X11 shared-memory capture library, loaded at runtime.
#[derive(Clone)]
pub struct WlxShm {
    loaded: Arc<Loaded>,
}

impl WlxShm {
    /// Load the capture library from the default search path.
    pub fn load_default() -> Result<Self, LoadError> {
        Self::load(LIBRARY_NAME)
    }

    /// Load the capture library from `path` and resolve every symbol the provider needs.
    pub fn load<P: AsRef<OsStr>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let library = unsafe { Library::new(path) }.map_err(LoadError::Library)?;

        let api = unsafe {
            Api {
                create: symbol(&library, "wlxshm_create\0")?,
                destroy: symbol(&library, "wlxshm_destroy\0")?,
                capture_start: symbol(&library, "wlxshm_capture_start\0")?,
                capture_end: symbol(&library, "wlxshm_capture_end\0")?,
                capture_frame: symbol(&library, "wlxshm_capture_frame\0")?,
                mouse_pos_global: symbol(&library, "wlxshm_mouse_pos_global\0")?,
                num_screens: symbol(&library, "wlxshm_num_screens\0")?,
            }
        };

        info!("Loaded capture library {}", path.to_string_lossy());

        Ok(Self {
            loaded: Arc::new(Loaded {
                api,
                _library: library,
            }),
        })
    }
}

unsafe fn symbol<T: Copy>(library: &Library, name: &'static str) -> Result<T, LoadError> {
    match unsafe { library.get::<T>(name.as_bytes()) } {
        Ok(symbol) => Ok(*symbol),
        Err(source) => Err(LoadError::Symbol {
            symbol: name.trim_end_matches('\0'),
            source,
        }),
    }
}

impl CaptureBackend for WlxShm {
    fn output_count(&self) -> u32 {
        let count = unsafe { (self.loaded.api.num_screens)() };
        u32::try_from(count).unwrap_or(0)
    }

    fn create(&self, output: u32) -> Result<NativeOutput, CreateError> {
        let count = self.output_count();
        let screen = match c_int::try_from(output) {
            Ok(screen) if output < count => screen,
            _ => return Err(CreateError::InvalidOutput { output, count }),
        };

        let mut size = Vector2Int::default();
        let mut position = Vector2Int::default();

        let handle = unsafe { (self.loaded.api.create)(screen, &mut size, &mut position) };
        let handle = NonNull::new(handle).ok_or(CreateError::NullHandle { output })?;

        // The handle is owned from here on, dropping `capture` destroys it.
        let capture = WlxShmCapture {
            loaded: Arc::clone(&self.loaded),
            handle,
        };

        let (Ok(width), Ok(height)) = (u32::try_from(size.x), u32::try_from(size.y)) else {
            return Err(CreateError::InvalidSize {
                output,
                width: size.x,
                height: size.y,
            });
        };
        if width == 0 || height == 0 {
            return Err(CreateError::InvalidSize {
                output,
                width: size.x,
                height: size.y,
            });
        }

        let rect = OutputRect::new([position.x, position.y], [width, height]);
        debug!("Created capture handle for output {output}: {rect}");

        Ok(NativeOutput {
            capture: Box::new(capture),
            rect,
        })
    }
}

/// A `wlxshm` handle, destroyed on drop.
struct WlxShmCapture {
    loaded: Arc<Loaded>,
    handle: NonNull<c_void>,
}

// The library is not reentrant per handle; the session serialises every call.
unsafe impl Send for WlxShmCapture {}

impl NativeCapture for WlxShmCapture {
    fn start(&mut self) -> Result<(), NativeError> {
        let status = unsafe { (self.loaded.api.capture_start)(self.handle.as_ptr()) };

        if status < 0 {
            return Err(NativeError::new("wlxshm_capture_start", status));
        }

        Ok(())
    }

    fn end(&mut self) {
        unsafe { (self.loaded.api.capture_end)(self.handle.as_ptr()) };
    }

    fn frame(&mut self) -> Option<NativeFrame> {
        let raw = unsafe { (self.loaded.api.capture_frame)(self.handle.as_ptr()) };
        let raw = unsafe { raw.as_ref() }?;

        unsafe { NativeFrame::new(raw.buffer, raw.length) }
    }

    fn cursor_position(&mut self) -> CursorPosition {
        let mut position = Vector2Int::default();
        unsafe { (self.loaded.api.mouse_pos_global)(self.handle.as_ptr(), &mut position) };

        CursorPosition::new(position.x, position.y)
    }
}

impl Drop for WlxShmCapture {
    fn drop(&mut self) {
        unsafe { (self.loaded.api.destroy)(self.handle.as_ptr()) };
    }
}

/// Error variants from loading the capture library.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
    /// The library could not be opened.
    #[error("Failed to load the capture library:\n{0}")]
    Library(#[source] libloading::Error),

    /// The library is missing a symbol.
    #[error("Failed to resolve capture library symbol `{symbol}`:\n{source}")]
    Symbol {
        /// The missing symbol.
        symbol: &'static str,

        /// The loader error.
        #[source]
        source: libloading::Error,
    },
}
