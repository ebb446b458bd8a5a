use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::Sender;

use parking_lot::Mutex;
use tracing::error;

use crate::session::{Fetched, ReleaseHook};

/// Messages for the prefetch worker.
pub(super) enum Message {
    Fetch,
    Shutdown,
}

/// The single fetch slot. Holds at most one request or one result.
pub(super) enum Slot {
    /// Nothing requested.
    Empty,

    /// A request was sent and the worker has not answered yet.
    InFlight,

    /// The worker answered; the result has not been polled.
    Ready(Fetched),
}

/// State shared between the prefetcher and its worker.
pub(super) struct Mailbox {
    pub slot: Mutex<Slot>,

    /// Whether new requests may be issued.
    pub active: AtomicBool,

    /// Set once the prefetcher is dropped, the worker stops without touching the handle.
    pub cancelled: AtomicBool,

    /// The number of requests issued, for diagnostics.
    pub issued: AtomicU64,
}

impl Mailbox {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Empty),
            active: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
            issued: AtomicU64::new(0),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire) && !self.cancelled.load(Ordering::Acquire)
    }

    /// Store the worker's answer.
    pub fn deliver(&self, fetched: Fetched) {
        *self.slot.lock() = Slot::Ready(fetched);
    }
}

/// Issues fetch requests, never more than one at a time.
pub(super) struct Requester {
    pub mailbox: alloc::sync::Arc<Mailbox>,
    pub sender: Sender<Message>,
}

impl Requester {
    /// Request the next frame if the prefetcher is active and no request is outstanding.
    pub fn request(&self) {
        if !self.mailbox.is_active() {
            return;
        }

        let mut slot = self.mailbox.slot.lock();
        if !matches!(*slot, Slot::Empty) {
            return;
        }

        if self.sender.send(Message::Fetch).is_err() {
            error!("Prefetch worker has exited, no further frames will be fetched");
            return;
        }

        *slot = Slot::InFlight;
        self.mailbox.issued.fetch_add(1, Ordering::Relaxed);
    }
}

impl ReleaseHook for Requester {
    fn released(&self) {
        self.request();
    }
}
