mod mailbox;
mod worker;

use alloc::sync::Arc;
use core::sync::atomic::Ordering;
use std::{io, sync::mpsc::channel, thread::JoinHandle};

use tracing::{debug, error};

use crate::{CaptureSession, FrameBuffer, session::Fetched};

use mailbox::{Mailbox, Message, Requester, Slot};

/// Where the prefetcher is in its fetch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefetchState {
    /// Paused, no requests are issued.
    Idle,

    /// One request is outstanding.
    Fetching,

    /// The outstanding request completed and is waiting to be polled.
    Ready,
}

/// Keeps one capture request in flight ahead of the render thread.
///
/// Frames are fetched on a worker thread and handed over through a single slot. [`poll`] never
/// blocks: it either returns the completed frame or `None`, and the next request is issued as soon
/// as the returned frame is released.
///
/// [`poll`]: FramePrefetcher::poll
pub struct FramePrefetcher {
    session: CaptureSession,
    requester: Requester,

    // Option allows for joining the thread which requires ownership.
    thread: Option<JoinHandle<()>>,
}

impl FramePrefetcher {
    /// Spawn the prefetch worker for `session`. The prefetcher starts paused.
    pub fn new(session: CaptureSession) -> io::Result<Self> {
        let (sender, receiver) = channel();
        let mailbox = Arc::new(Mailbox::new());

        let thread = worker::spawn(session.clone(), Arc::clone(&mailbox), receiver)?;

        Ok(Self {
            session,
            requester: Requester { mailbox, sender },
            thread: Some(thread),
        })
    }

    /// The session frames are fetched from.
    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    /// Start issuing requests. A request still outstanding from before a pause is reused.
    pub fn resume(&mut self) {
        self.requester.mailbox.active.store(true, Ordering::Release);
        self.requester.request();
    }

    /// Stop issuing requests. An outstanding request still completes and waits in the slot.
    pub fn pause(&mut self) {
        self.requester.mailbox.active.store(false, Ordering::Release);
    }

    /// The current state of the fetch cycle.
    pub fn state(&self) -> PrefetchState {
        if !self.requester.mailbox.is_active() {
            return PrefetchState::Idle;
        }

        match *self.requester.mailbox.slot.lock() {
            Slot::Empty => PrefetchState::Idle,
            Slot::InFlight => PrefetchState::Fetching,
            Slot::Ready(_) => PrefetchState::Ready,
        }
    }

    /// Whether a request is outstanding.
    pub fn is_fetching(&self) -> bool {
        self.state() == PrefetchState::Fetching
    }

    /// The number of requests issued since creation.
    pub fn requests_issued(&self) -> u64 {
        self.requester.mailbox.issued.load(Ordering::Relaxed)
    }

    /// Take the completed frame, if any.
    ///
    /// Returns `None` while paused, while the request is still in flight, and when the completed
    /// request produced no usable frame. A frame invalidated by a stop, start or dispose since it
    /// was fetched is never returned.
    pub fn poll(&mut self) -> Option<FrameBuffer<'_>> {
        if !self.requester.mailbox.is_active() {
            return None;
        }

        let fetched = {
            let mut slot = self.requester.mailbox.slot.lock();

            match core::mem::replace(&mut *slot, Slot::Empty) {
                Slot::Ready(fetched) => fetched,
                Slot::InFlight => {
                    *slot = Slot::InFlight;
                    return None;
                }
                Slot::Empty => {
                    drop(slot);
                    self.request_next();
                    return None;
                }
            }
        };

        let buffer = match fetched {
            Fetched::Frame { frame, generation } => self.session.claim(frame, generation),
            Fetched::Empty | Fetched::Cancelled => None,
        };

        match buffer {
            Some(buffer) => Some(buffer.on_release(&self.requester)),
            None => {
                self.request_next();
                None
            }
        }
    }

    /// Issue the next request unless the session stopped capturing.
    ///
    /// Only called while no request is outstanding, so the session lock is free of the worker.
    fn request_next(&self) {
        if self.session.is_capturing() {
            self.requester.request();
        }
    }
}

impl core::fmt::Debug for FramePrefetcher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FramePrefetcher")
            .field("output", &self.session.output())
            .field("state", &self.state())
            .field("requests_issued", &self.requests_issued())
            .finish()
    }
}

impl Drop for FramePrefetcher {
    fn drop(&mut self) {
        let mailbox = &self.requester.mailbox;
        mailbox.active.store(false, Ordering::Release);
        mailbox.cancelled.store(true, Ordering::Release);

        if self.requester.sender.send(Message::Shutdown).is_err() {
            debug!("Prefetch worker had already exited");
        }

        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Joining prefetch worker returned an error");
            }
        }
    }
}
