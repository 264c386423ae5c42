//! Validation and resolution of one form submission.
//!
//! A [`FormMail`] is built per submission attempt. It evaluates the submission
//! at most once, resolves the values a transport needs from the configuration
//! and the submitted fields, and can then be sent once.
//!
//! The validity result is cached in a [`OnceLock`], so checking it again, from
//! any thread holding a shared reference, never re-runs the checks or the
//! recipient lookups.

use std::{
    fmt::{self, Display},
    sync::{Arc, OnceLock},
};

use formmail_common::{
    address::has_email_shape,
    internal, outgoing,
    text::{is_blank, is_blank_opt},
};
use indexmap::IndexMap;

use crate::{
    config::{MailConfig, split_list},
    encoding,
    envelope::{Envelope, Headers},
    error::FormMailError,
    lookup::{RecipientLookup, filter_recipients},
    page::{EMAIL_HTML_PART, EMAIL_PART, EMAIL_PLAIN_PART, Page},
    rule::RequiredFields,
    submission::{Attachment, Submission},
    transport::Transport,
};

const SUBJECT_FIELD: &str = "subject";

/// Where an error message belongs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKey {
    /// Problems with the form as a whole: recipients and sender.
    Form,
    /// Delivery failures.
    Base,
    /// A declared required field.
    Field(String),
}

impl Display for ErrorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Form => f.write_str("form"),
            Self::Base => f.write_str("base"),
            Self::Field(name) => f.write_str(name),
        }
    }
}

/// One message per key. Setting a key again replaces its message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Errors(IndexMap<ErrorKey, String>);

impl Errors {
    pub fn insert(&mut self, key: ErrorKey, message: impl Into<String>) {
        self.0.insert(key, message.into());
    }

    pub fn get(&self, key: &ErrorKey) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn form(&self) -> Option<&str> {
        self.get(&ErrorKey::Form)
    }

    pub fn base(&self) -> Option<&str> {
        self.get(&ErrorKey::Base)
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.get(&ErrorKey::Field(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ErrorKey, &str)> {
        self.0.iter().map(|(key, message)| (key, message.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The outcome of evaluating a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    valid: bool,
    errors: Errors,
}

impl Validation {
    pub const fn is_valid(&self) -> bool {
        self.valid
    }

    pub const fn errors(&self) -> &Errors {
        &self.errors
    }

    fn fail(&mut self, key: ErrorKey, message: impl Into<String>) {
        self.valid = false;
        self.errors.insert(key, message);
    }
}

/// A form submission on its way to becoming a mail.
pub struct FormMail<P> {
    config: Arc<MailConfig>,
    submission: Submission,
    required: RequiredFields,
    page: P,
    lookup: Option<Arc<dyn RecipientLookup + Send + Sync>>,
    recipients: OnceLock<Vec<String>>,
    validation: OnceLock<Validation>,
    delivery_error: Option<String>,
    sent: Option<bool>,
}

impl<P: Page> FormMail<P> {
    /// Takes the `required` rules out of `submission` and parses them.
    ///
    /// # Errors
    /// [`FormMailError::InvalidPattern`] if a `/pattern/` rule doesn't compile.
    pub fn new(
        config: impl Into<Arc<MailConfig>>,
        mut submission: Submission,
        page: P,
    ) -> Result<Self, FormMailError> {
        let required = submission
            .take_required()
            .map(RequiredFields::parse)
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            config: config.into(),
            submission,
            required,
            page,
            lookup: None,
            recipients: OnceLock::new(),
            validation: OnceLock::new(),
            delivery_error: None,
            sent: None,
        })
    }

    /// Attaches the lookup used by the configured recipients check.
    #[must_use]
    pub fn with_lookup(mut self, lookup: Arc<dyn RecipientLookup + Send + Sync>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    pub fn config(&self) -> &MailConfig {
        &self.config
    }

    /// The submitted fields, without the `required` rules.
    pub const fn submission(&self) -> &Submission {
        &self.submission
    }

    pub const fn required(&self) -> &RequiredFields {
        &self.required
    }

    /// Evaluates the submission. Only the first call does any work.
    pub fn evaluate(&self) -> &Validation {
        self.validation.get_or_init(|| {
            let validation = self.run_checks();
            internal!(
                level = DEBUG,
                "Evaluated form mail: valid = {}, {} error(s)",
                validation.valid,
                validation.errors.len()
            );
            validation
        })
    }

    pub fn is_valid(&self) -> bool {
        self.evaluate().is_valid()
    }

    /// Validation errors plus, after a failed [`send`](Self::send), the delivery error.
    pub fn errors(&self) -> Errors {
        let mut errors = self.evaluate().errors().clone();
        if let Some(error) = &self.delivery_error {
            errors.insert(ErrorKey::Base, error.clone());
        }
        errors
    }

    fn run_checks(&self) -> Validation {
        let mut validation = Validation {
            valid: true,
            errors: Errors::default(),
        };

        let recipients = self.recipients();
        if recipients.is_empty() && !self.required.contains(self.config.recipients_field()) {
            validation.fail(ErrorKey::Form, "Recipients are required.");
        }

        if recipients.iter().any(|recipient| !has_email_shape(recipient)) {
            validation.fail(ErrorKey::Form, "Recipients are invalid.");
        }

        let from = self.from();
        if is_blank_opt(from) && !self.required.contains(self.config.from_field()) {
            validation.fail(ErrorKey::Form, "From is required.");
        }

        if !has_email_shape(from.unwrap_or_default()) {
            validation.fail(ErrorKey::Form, "From is invalid.");
        }

        for (field, rule) in self.required.iter() {
            if let Err(message) = rule.check(self.submission.get(field)) {
                validation.fail(ErrorKey::Field(field.to_string()), message);
            }
        }

        validation
    }

    fn field_text(&self, field: Option<&str>) -> Option<&str> {
        field.and_then(|field| self.submission.present_text(field))
    }

    pub fn from(&self) -> Option<&str> {
        self.config
            .from()
            .or_else(|| self.field_text(self.config.from_field()))
    }

    /// The recipients, resolved on first use.
    pub fn recipients(&self) -> &[String] {
        self.recipients.get_or_init(|| self.resolve_recipients())
    }

    fn resolve_recipients(&self) -> Vec<String> {
        if let Some(recipients) = self.config.recipients() {
            return recipients.to_vec();
        }

        let candidates = self
            .field_text(self.config.recipients_field())
            .map(split_list)
            .unwrap_or_default();

        match (self.config.recipients_check(), &self.lookup) {
            (Some(check), Some(lookup)) if !candidates.is_empty() => {
                filter_recipients(candidates, check, lookup.as_ref())
            }
            (Some(_), None) => {
                internal!(
                    level = WARN,
                    "Recipients check is configured but no lookup is attached, skipping it"
                );
                candidates
            }
            _ => candidates,
        }
    }

    pub fn reply_to(&self) -> Option<&str> {
        self.config
            .reply_to()
            .or_else(|| self.field_text(self.config.reply_to_field()))
    }

    pub fn sender(&self) -> Option<&str> {
        self.config.sender()
    }

    pub fn subject(&self) -> String {
        self.submission
            .present_text(SUBJECT_FIELD)
            .or_else(|| self.config.subject())
            .map_or_else(
                || format!("Form Mail from {}", self.page.host()),
                ToString::to_string,
            )
    }

    pub fn cc(&self) -> &str {
        self.field_text(self.config.cc_field())
            .or_else(|| self.config.cc())
            .unwrap_or_default()
    }

    pub fn files(&self) -> Vec<&Attachment> {
        self.submission.files().collect()
    }

    pub fn filesize_limit(&self) -> u64 {
        self.config.filesize_limit()
    }

    fn render(&self, part: &str) -> Option<String> {
        self.page
            .render_part(part)
            .map(|bytes| encoding::normalize(&bytes, self.config.body_charset()))
    }

    /// The rendered plain-text body, `None` for an invalid submission or when
    /// the page has no plain part.
    pub fn plain_body(&self) -> Option<String> {
        if !self.is_valid() {
            return None;
        }

        if self.page.has_part(EMAIL_PART) {
            self.render(EMAIL_PART)
        } else {
            self.render(EMAIL_PLAIN_PART)
        }
    }

    /// The rendered html body, `None` for an invalid submission or when the
    /// page has no html part.
    pub fn html_body(&self) -> Option<String> {
        if !self.is_valid() {
            return None;
        }

        self.render(EMAIL_HTML_PART)
    }

    /// A plain-text listing of everything that was posted.
    pub fn submission_dump(&self) -> String {
        let listing = serde_yaml::to_string(&self.submission).unwrap_or_else(|err| {
            internal!(level = WARN, "Failed to serialise submission: {err}");
            self.submission
                .iter()
                .map(|(name, value)| format!("{name}: {}\n", value.as_text().unwrap_or("...")))
                .collect()
        });

        format!("The following information was posted:\n{listing}")
    }

    fn headers(&self) -> Headers {
        let mut headers = Headers::new();

        if let Some(reply_to) = self.reply_to().or_else(|| self.from()) {
            headers.insert("Reply-To", reply_to);
        }

        if let Some(sender) = self.sender() {
            headers.insert("Return-Path", sender);
            headers.insert("Sender", sender);
        }

        headers
    }

    /// The envelope to hand to a transport, `None` for an invalid submission.
    ///
    /// When the page renders neither body, the plain body lists the submission.
    pub fn envelope(&self) -> Option<Envelope> {
        if !self.is_valid() {
            return None;
        }

        let mut plain_body = self.plain_body().unwrap_or_default();
        let html_body = self.html_body().unwrap_or_default();
        if is_blank(&plain_body) && is_blank(&html_body) {
            plain_body = self.submission_dump();
        }

        Some(Envelope {
            recipients: self.recipients().to_vec(),
            from: self.from().map(ToString::to_string),
            subject: self.subject(),
            plain_body,
            html_body,
            cc: self.cc().to_string(),
            headers: self.headers(),
            files: self.files().into_iter().cloned().collect(),
            filesize_limit: self.filesize_limit(),
        })
    }

    /// Sends the mail. Returns `false` without sending for an invalid submission.
    ///
    /// A transport failure is recorded under [`ErrorKey::Base`] and reported
    /// through the return value and [`sent`](Self::sent). Calling this again
    /// renders and sends again.
    pub fn send(&mut self, transport: &dyn Transport) -> bool {
        let Some(envelope) = self.envelope() else {
            internal!(level = DEBUG, "Not sending an invalid form mail");
            return false;
        };

        let sent = match transport.deliver(&envelope) {
            Ok(()) => {
                outgoing!(
                    level = INFO,
                    "Sent form mail {:?} to {}",
                    envelope.subject,
                    envelope.recipients.join(", ")
                );
                self.delivery_error = None;
                true
            }
            Err(err) => {
                outgoing!(level = WARN, "Failed to send form mail: {err}");
                self.delivery_error = Some(err.to_string());
                false
            }
        };

        self.sent = Some(sent);
        sent
    }

    /// `None` before any send of a valid submission, then whether it succeeded.
    pub const fn sent(&self) -> Option<bool> {
        self.sent
    }
}
