//! Shared fixtures for the capture provider tests.
//!

#![allow(dead_code)]

extern crate alloc;

use alloc::{collections::VecDeque, sync::Arc};
use core::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};
use std::{
    thread,
    time::Instant,
};

use parking_lot::Mutex;
use xshm_capture_provider::{
    CaptureBackend, CaptureSession, CreateError, CursorPosition, FramePrefetcher, NativeCapture,
    NativeError, NativeFrame, NativeOutput, OutputRect, SessionRegistry,
};

/// Call counts shared by every handle a [`ScriptedBackend`] creates.
#[derive(Debug, Default)]
pub struct Counters {
    pub creates: AtomicUsize,
    pub starts: AtomicUsize,
    pub ends: AtomicUsize,
    pub destroys: AtomicUsize,
    pub frames: AtomicUsize,
    pub cursors: AtomicUsize,

    /// Native calls currently executing.
    pub active: AtomicUsize,

    /// Calls that began while another call on the same backend was executing.
    pub overlaps: AtomicUsize,
}

impl Counters {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn enter(&self) -> CallGuard<'_> {
        if self.active.fetch_add(1, Ordering::SeqCst) != 0 {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        CallGuard(self)
    }
}

struct CallGuard<'a>(&'a Counters);

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A backend whose handles count every call and return scripted frame lengths.
#[derive(Clone)]
pub struct ScriptedBackend {
    pub rects: Vec<OutputRect>,
    pub counters: Arc<Counters>,

    /// Lengths reported by the next frames, a valid length is reported once the queue is empty.
    pub lengths: Arc<Mutex<VecDeque<usize>>>,
    pub cursor: Arc<Mutex<CursorPosition>>,
    pub frame_delay: Duration,
    pub fail_start: bool,
}

impl ScriptedBackend {
    pub fn new(rects: Vec<OutputRect>) -> Self {
        Self {
            rects,
            counters: Arc::new(Counters::default()),
            lengths: Arc::new(Mutex::new(VecDeque::new())),
            cursor: Arc::new(Mutex::new(CursorPosition::default())),
            frame_delay: Duration::ZERO,
            fail_start: false,
        }
    }

    /// One small output at the origin.
    pub fn single() -> Self {
        Self::new(vec![OutputRect::new([0, 0], [64, 32])])
    }

    pub fn with_frame_delay(mut self, delay: Duration) -> Self {
        self.frame_delay = delay;
        self
    }

    pub fn script_lengths<I: IntoIterator<Item = usize>>(&self, lengths: I) {
        self.lengths.lock().extend(lengths);
    }

    pub fn set_cursor(&self, x: i32, y: i32) {
        *self.cursor.lock() = CursorPosition::new(x, y);
    }
}

impl CaptureBackend for ScriptedBackend {
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

        self.counters.creates.fetch_add(1, Ordering::SeqCst);

        // Room for a frame one pixel larger than expected.
        let buffer = vec![0; rect.expected_frame_length() + 4];

        Ok(NativeOutput {
            capture: Box::new(ScriptedCapture {
                backend: self.clone(),
                expected: rect.expected_frame_length(),
                buffer,
                frame_index: 0,
                capturing: false,
            }),
            rect,
        })
    }
}

struct ScriptedCapture {
    backend: ScriptedBackend,
    expected: usize,
    buffer: Vec<u8>,
    frame_index: u8,
    capturing: bool,
}

impl NativeCapture for ScriptedCapture {
    fn start(&mut self) -> Result<(), NativeError> {
        let _call = self.backend.counters.enter();
        self.backend.counters.starts.fetch_add(1, Ordering::SeqCst);

        if self.backend.fail_start {
            return Err(NativeError::new("wlxshm_capture_start", -1));
        }

        self.capturing = true;
        Ok(())
    }

    fn end(&mut self) {
        let _call = self.backend.counters.enter();
        self.backend.counters.ends.fetch_add(1, Ordering::SeqCst);
        self.capturing = false;
    }

    fn frame(&mut self) -> Option<NativeFrame> {
        let _call = self.backend.counters.enter();
        self.backend.counters.frames.fetch_add(1, Ordering::SeqCst);

        if !self.backend.frame_delay.is_zero() {
            thread::sleep(self.backend.frame_delay);
        }

        if !self.capturing {
            return None;
        }

        let length = self
            .backend
            .lengths
            .lock()
            .pop_front()
            .unwrap_or(self.expected)
            .min(self.buffer.len());

        self.frame_index = self.frame_index.wrapping_add(1);
        self.buffer.fill(self.frame_index);

        unsafe { NativeFrame::new(self.buffer.as_ptr(), length as i32) }
    }

    fn cursor_position(&mut self) -> CursorPosition {
        let _call = self.backend.counters.enter();
        self.backend.counters.cursors.fetch_add(1, Ordering::SeqCst);
        *self.backend.cursor.lock()
    }
}

impl Drop for ScriptedCapture {
    fn drop(&mut self) {
        let _call = self.backend.counters.enter();
        self.backend.counters.destroys.fetch_add(1, Ordering::SeqCst);
    }
}

/// Open output 0 of `backend`. The session is disposed when the registry is dropped.
pub fn open_session(backend: &ScriptedBackend) -> (SessionRegistry, CaptureSession) {
    let mut registry = SessionRegistry::new(Arc::new(backend.clone()));
    let session = registry.open(0).unwrap();

    (registry, session)
}

/// Poll until a frame arrives and return a copy of it, or `None` after a generous timeout.
pub fn wait_for_frame(prefetcher: &mut FramePrefetcher) -> Option<Vec<u8>> {
    let deadline = Instant::now() + Duration::from_secs(5);

    while Instant::now() < deadline {
        if let Some(frame) = prefetcher.poll() {
            return Some(frame.as_bytes().to_vec());
        }
        thread::sleep(Duration::from_millis(1));
    }

    None
}

/// Spin until `condition` holds, returns whether it did before the timeout.
pub fn wait_until<F: Fn() -> bool>(condition: F) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);

    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }

    false
}
