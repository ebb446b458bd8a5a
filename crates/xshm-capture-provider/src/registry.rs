use alloc::{collections::BTreeMap, sync::Arc};

use thiserror::Error;
use tracing::{debug, info};

use crate::{CaptureBackend, CaptureSession, CreateError, OutputRect, SessionOptions};

/// Opens capture sessions, at most one per output index.
pub struct SessionRegistry {
    backend: Arc<dyn CaptureBackend>,
    options: SessionOptions,
    sessions: BTreeMap<u32, CaptureSession>,
}

impl SessionRegistry {
    /// Create an empty registry over `backend`.
    pub fn new(backend: Arc<dyn CaptureBackend>) -> Self {
        Self::with_options(backend, SessionOptions::default())
    }

    /// Create an empty registry whose sessions use `options`.
    pub fn with_options(backend: Arc<dyn CaptureBackend>, options: SessionOptions) -> Self {
        Self {
            backend,
            options,
            sessions: BTreeMap::new(),
        }
    }

    /// The number of outputs the backend exposes.
    pub fn output_count(&self) -> u32 {
        self.backend.output_count()
    }

    /// The available output indices in order.
    pub fn outputs(&self) -> Vec<u32> {
        (0..self.output_count()).collect()
    }

    /// Open a session for `output`. Fails if a session for that output is already open.
    pub fn open(&mut self, output: u32) -> Result<CaptureSession, RegistryError> {
        if self.sessions.contains_key(&output) {
            return Err(RegistryError::AlreadyOpen(output));
        }

        let session = CaptureSession::with_options(self.backend.as_ref(), output, self.options)?;
        info!("Opened capture session for output {output}: {}", session.rect());

        self.sessions.insert(output, session.clone());
        Ok(session)
    }

    /// Open a session for every output the backend exposes, skipping outputs already open.
    pub fn open_all(&mut self) -> Result<Vec<CaptureSession>, RegistryError> {
        let mut opened = Vec::new();

        for output in self.outputs() {
            if self.sessions.contains_key(&output) {
                continue;
            }
            opened.push(self.open(output)?);
        }

        Ok(opened)
    }

    /// The open session for `output`.
    pub fn get(&self, output: u32) -> Option<&CaptureSession> {
        self.sessions.get(&output)
    }

    /// The open sessions ordered by output index.
    pub fn sessions(&self) -> impl Iterator<Item = &CaptureSession> {
        self.sessions.values()
    }

    /// Dispose and forget the session for `output`. Returns whether a session was open.
    pub fn close(&mut self, output: u32) -> bool {
        let Some(session) = self.sessions.remove(&output) else {
            return false;
        };

        session.dispose();
        debug!("Closed capture session for output {output}");
        true
    }

    /// The union of every open session's rect, or `None` if no session is open.
    pub fn bounding_rect(&self) -> Option<OutputRect> {
        let mut rects = self.sessions.values().map(CaptureSession::rect);
        let first = rects.next()?;

        Some(rects.fold(first, |bounds, rect| bounds.union(&rect)))
    }
}

impl core::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}

impl Drop for SessionRegistry {
    fn drop(&mut self) {
        for session in self.sessions.values() {
            session.dispose();
        }
    }
}

/// Error variants from opening sessions.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RegistryError {
    /// A session for the output is already open.
    #[error("A capture session for output {0} is already open")]
    AlreadyOpen(u32),

    /// The native handle could not be created.
    #[error("Failed to create capture session:\n{0}")]
    Create(#[from] CreateError),
}
