//! Hand-off of a resolved [`Envelope`] to whatever actually sends mail.

use std::path::{Path, PathBuf};

use formmail_common::outgoing;
use parking_lot::Mutex;
use ulid::Ulid;

use crate::{envelope::Envelope, error::TransportError, message};

pub trait Transport {
    /// Delivers one envelope.
    ///
    /// # Errors
    /// Any failure to hand the message on. It is recorded on the form mail, not retried.
    fn deliver(&self, envelope: &Envelope) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn deliver(&self, envelope: &Envelope) -> Result<(), TransportError> {
        (**self).deliver(envelope)
    }
}

/// Keeps delivered envelopes in memory.
///
/// Useful in tests and development. It can be switched to reject every
/// delivery to exercise failure handling.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    delivered: Mutex<Vec<Envelope>>,
    rejection: Mutex<Option<String>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport that rejects every delivery with `reason`.
    pub fn rejecting(reason: impl Into<String>) -> Self {
        let transport = Self::default();
        transport.reject_with(Some(reason.into()));
        transport
    }

    /// Sets (or clears, with `None`) the rejection reason for later deliveries.
    pub fn reject_with(&self, reason: Option<String>) {
        *self.rejection.lock() = reason;
    }

    /// The envelopes delivered so far.
    pub fn delivered(&self) -> Vec<Envelope> {
        self.delivered.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.delivered.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Transport for MemoryTransport {
    fn deliver(&self, envelope: &Envelope) -> Result<(), TransportError> {
        if let Some(reason) = self.rejection.lock().clone() {
            return Err(TransportError::Rejected(reason));
        }

        // Render anyway so the filesize limit behaves as it would for a real transport
        message::render(envelope)?;

        self.delivered.lock().push(envelope.clone());
        Ok(())
    }
}

/// Writes each message as an `.eml` file into a pickup directory for an MTA to collect.
#[derive(Debug, Clone)]
pub struct PickupTransport {
    path: PathBuf,
}

impl PickupTransport {
    /// # Errors
    /// The directory must be absolute and must exist.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, TransportError> {
        let path = path.into();

        if !path.is_absolute() {
            return Err(TransportError::Write {
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "pickup directory must be absolute",
                ),
                path,
            });
        }

        if !path.is_dir() {
            return Err(TransportError::Write {
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "pickup directory does not exist",
                ),
                path,
            });
        }

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Transport for PickupTransport {
    fn deliver(&self, envelope: &Envelope) -> Result<(), TransportError> {
        let message = message::render(envelope)?;

        let id = Ulid::new();
        let tmp = self.path.join(format!(".{id}.tmp"));
        let path = self.path.join(format!("{id}.eml"));

        // Write then rename so a collector never sees a partial message
        std::fs::write(&tmp, message.as_bytes()).map_err(|source| TransportError::Write {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, &path).map_err(|source| TransportError::Write {
            path: path.clone(),
            source,
        })?;

        outgoing!(
            level = INFO,
            "Queued form mail {id} for {} recipient(s) in {}",
            envelope.recipients.len(),
            self.path.display()
        );

        Ok(())
    }
}
