use alloc::sync::Arc;
use core::sync::atomic::Ordering;
use std::{
    io,
    sync::mpsc::Receiver,
    thread::{self, JoinHandle},
};

use tracing::{debug, info_span};

use crate::CaptureSession;

use super::mailbox::{Mailbox, Message};

/// Spawn the worker that answers fetch requests for `session`.
///
/// The worker only touches the native handle through [`CaptureSession::fetch`], which takes the
/// session lock and refuses to call into a stopped or disposed handle.
pub(super) fn spawn(
    session: CaptureSession,
    mailbox: Arc<Mailbox>,
    receiver: Receiver<Message>,
) -> io::Result<JoinHandle<()>> {
    let output = session.output();

    thread::Builder::new()
        .name(format!("Prefetch {output}"))
        .spawn(move || {
            let _span = info_span!("[Prefetch]", output).entered();

            while let Ok(message) = receiver.recv() {
                match message {
                    Message::Shutdown => break,

                    Message::Fetch => {
                        if mailbox.cancelled.load(Ordering::Acquire) {
                            break;
                        }

                        let fetched = session.fetch();

                        if mailbox.cancelled.load(Ordering::Acquire) {
                            break;
                        }

                        mailbox.deliver(fetched);
                    }
                }
            }

            debug!("Prefetch worker for output {output} exiting");
        })
}
