//! Turns form submissions into mail.
//!
//! A page carries a [`MailConfig`]. Each submission is wrapped in a
//! [`FormMail`], which decides whether it is valid, resolves the recipients,
//! sender, subject, cc and attachments, renders the bodies through the
//! [`Page`], and hands an [`Envelope`] to a [`Transport`].

pub mod config;
pub mod encoding;
pub mod envelope;
pub mod error;
pub mod lookup;
pub mod message;
pub mod page;
pub mod rule;
pub mod submission;
pub mod transport;
pub mod validator;

pub use config::{MailConfig, RecipientsCheck};
pub use envelope::{Envelope, Headers};
pub use error::{ConfigError, FormMailError, LookupError, MessageError, TransportError};
pub use lookup::{ColumnName, RecipientLookup};
pub use page::{Page, StaticPage};
pub use rule::{RequiredFields, Rule};
pub use submission::{Attachment, FieldValue, Submission};
pub use transport::{MemoryTransport, PickupTransport, Transport};
pub use validator::{ErrorKey, Errors, FormMail, Validation};
