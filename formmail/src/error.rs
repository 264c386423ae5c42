//! Error types for the formmail crate.
//!
//! Validation failures are not errors: they are collected as data in
//! [`Errors`](crate::validator::Errors). The types here cover the seams where
//! something outside the validator can fail.

use std::{io, path::PathBuf};

use thiserror::Error;

/// Errors raised while loading a [`MailConfig`](crate::config::MailConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The configuration could not be parsed.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// Errors raised while constructing a [`FormMail`](crate::validator::FormMail).
#[derive(Debug, Error)]
pub enum FormMailError {
    /// A `/pattern/` rule did not compile.
    #[error("Invalid pattern for required field {field}: {source}")]
    InvalidPattern {
        field: String,
        #[source]
        source: regex::Error,
    },
}

/// Errors reported by a [`RecipientLookup`](crate::lookup::RecipientLookup).
#[derive(Debug, Error)]
pub enum LookupError {
    /// The named table or entity does not exist.
    #[error("Unknown lookup table: {0}")]
    UnknownTable(String),

    /// The backing store failed.
    #[error("Lookup failed: {0}")]
    Backend(String),
}

/// Errors raised while rendering an [`Envelope`](crate::envelope::Envelope) to a message.
#[derive(Debug, Error)]
pub enum MessageError {
    /// An attachment exceeds the configured filesize limit.
    #[error("Attachment {filename} is too large ({size} bytes, limit {limit} bytes)")]
    AttachmentTooLarge {
        filename: String,
        size: usize,
        limit: u64,
    },

    /// A header value contains a line break.
    #[error("Header {name} contains a line break")]
    HeaderInjection { name: String },

    /// The envelope has no recipients.
    #[error("Message has no recipients")]
    NoRecipients,

    /// Writing the message failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Errors reported by a [`Transport`](crate::transport::Transport).
#[derive(Debug, Error)]
pub enum TransportError {
    /// The envelope could not be rendered.
    #[error(transparent)]
    Message(#[from] MessageError),

    /// Writing to the pickup directory failed.
    #[error("Failed to write message to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The transport rejected the message.
    #[error("Delivery rejected: {0}")]
    Rejected(String),
}

#[cfg(test)]
mod tests {
    use std::error::Error as StdError;

    use super::*;

    #[test]
    fn test_message_error_display() {
        let err = MessageError::AttachmentTooLarge {
            filename: "cv.pdf".to_string(),
            size: 2048,
            limit: 1024,
        };
        assert_eq!(
            err.to_string(),
            "Attachment cv.pdf is too large (2048 bytes, limit 1024 bytes)"
        );
    }

    #[test]
    fn test_header_injection_display() {
        let err = MessageError::HeaderInjection {
            name: "Subject".to_string(),
        };
        assert_eq!(err.to_string(), "Header Subject contains a line break");
    }

    #[test]
    fn test_transport_error_is_transparent_over_message_errors() {
        let err = TransportError::from(MessageError::NoRecipients);
        assert_eq!(err.to_string(), "Message has no recipients");
    }

    #[test]
    fn test_error_source_chain() {
        let err = TransportError::Write {
            path: PathBuf::from("/var/spool/formmail/01.eml"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "access denied"),
        };

        assert!(err.source().is_some());
        assert_eq!(
            err.to_string(),
            "Failed to write message to /var/spool/formmail/01.eml: access denied"
        );
    }
}
