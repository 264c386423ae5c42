//! Mail configuration attached to a form page.
//!
//! A configuration names where the recipients and sender come from (either a
//! literal value or the name of a submitted field to read it from), plus the
//! optional subject, reply-to, cc, sender, attachment limit and recipient
//! check. It is normalised once at construction: keys are matched loosely,
//! blank values become absent, and comma-separated lists become sequences.
//!
//! # Examples
//!
//! ```ron
//! (
//!     recipients_field: "to",
//!     from: "forms@example.com",
//!     subject: "Contact form",
//!     filesize_limit: 1048576,
//! )
//! ```

use std::path::Path;

use formmail_common::{internal, text::presence};
use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::ConfigError;

/// The pairs of options of which at least one side must be configured.
const REQUIRED_PAIRS: [(&str, &str); 2] = [("recipients", "recipients_field"), ("from", "from_field")];

/// A list that may be written either as a sequence or as a comma-separated string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum StringList {
    Joined(String),
    Items(Vec<String>),
}

impl StringList {
    fn into_items(self) -> Vec<String> {
        match self {
            Self::Joined(joined) => split_list(&joined),
            Self::Items(items) => items
                .into_iter()
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect(),
        }
    }
}

/// Splits a comma-separated list, trimming each item and dropping blank ones.
pub(crate) fn split_list(joined: &str) -> Vec<String> {
    joined
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawMailConfig {
    #[serde(default)]
    recipients: Option<StringList>,
    #[serde(default)]
    recipients_field: Option<String>,
    #[serde(default)]
    from: Option<String>,
    #[serde(default)]
    from_field: Option<String>,
    #[serde(default)]
    reply_to: Option<String>,
    #[serde(default)]
    reply_to_field: Option<String>,
    #[serde(default)]
    cc: Option<String>,
    #[serde(default)]
    cc_field: Option<String>,
    #[serde(default)]
    sender: Option<String>,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    filesize_limit: Option<u64>,
    #[serde(default)]
    recipients_check_class: Option<String>,
    #[serde(default)]
    recipients_check_name: Option<String>,
    #[serde(default)]
    recipients_check_exceptions: Option<StringList>,
    #[serde(default)]
    body_charset: Option<String>,
}

/// Restricts field-sourced recipients to addresses known to an external table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientsCheck {
    /// Table or entity to look the address up in.
    pub table: String,
    /// Column compared against the lowercased address. Unvalidated at this point.
    pub column: String,
    /// Lowercased addresses that pass without a lookup.
    pub exceptions: Vec<String>,
}

impl RecipientsCheck {
    /// Returns `true` if `address` is in the exception list, ignoring case.
    pub fn is_exception(&self, address: &str) -> bool {
        let address = address.to_lowercase();
        self.exceptions.iter().any(|exception| *exception == address)
    }
}

/// Normalised mail configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "RawMailConfig")]
pub struct MailConfig {
    recipients: Option<Vec<String>>,
    recipients_field: Option<String>,
    from: Option<String>,
    from_field: Option<String>,
    reply_to: Option<String>,
    reply_to_field: Option<String>,
    cc: Option<String>,
    cc_field: Option<String>,
    sender: Option<String>,
    subject: Option<String>,
    filesize_limit: Option<u64>,
    recipients_check: Option<RecipientsCheck>,
    body_charset: Option<String>,
}

impl From<RawMailConfig> for MailConfig {
    fn from(raw: RawMailConfig) -> Self {
        let recipients = raw
            .recipients
            .map(StringList::into_items)
            .filter(|items| !items.is_empty());

        let recipients_check = match (
            presence(raw.recipients_check_class),
            presence(raw.recipients_check_name),
        ) {
            (Some(table), Some(column)) => Some(RecipientsCheck {
                table,
                column: column.trim().to_string(),
                exceptions: raw
                    .recipients_check_exceptions
                    .map(StringList::into_items)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|exception| exception.to_lowercase())
                    .collect(),
            }),
            _ => None,
        };

        Self {
            recipients,
            recipients_field: presence(raw.recipients_field),
            from: presence(raw.from),
            from_field: presence(raw.from_field),
            reply_to: presence(raw.reply_to),
            reply_to_field: presence(raw.reply_to_field),
            cc: presence(raw.cc),
            cc_field: presence(raw.cc_field),
            sender: presence(raw.sender),
            subject: presence(raw.subject),
            filesize_limit: raw.filesize_limit,
            recipients_check,
            body_charset: presence(raw.body_charset),
        }
    }
}

/// Canonical form of a loosely written option key.
///
/// `"From"`, `":from"`, `" from "` and `"reply-to"` style spellings all map to
/// the same option.
fn normalize_key(key: &str) -> String {
    key.trim()
        .trim_start_matches(':')
        .to_ascii_lowercase()
        .replace('-', "_")
}

impl MailConfig {
    /// Builds a configuration from loose key/value pairs, as found in a page's
    /// configuration part.
    ///
    /// Unknown keys are logged and ignored. A later duplicate key wins.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut raw = RawMailConfig::default();

        for (key, value) in pairs {
            let key = normalize_key(key.as_ref());
            let value: String = value.into();

            match key.as_str() {
                "recipients" => raw.recipients = Some(StringList::Joined(value)),
                "recipients_field" => raw.recipients_field = Some(value),
                "from" => raw.from = Some(value),
                "from_field" => raw.from_field = Some(value),
                "reply_to" => raw.reply_to = Some(value),
                "reply_to_field" => raw.reply_to_field = Some(value),
                "cc" => raw.cc = Some(value),
                "cc_field" => raw.cc_field = Some(value),
                "sender" => raw.sender = Some(value),
                "subject" => raw.subject = Some(value),
                "filesize_limit" => match value.trim().parse() {
                    Ok(limit) => raw.filesize_limit = Some(limit),
                    Err(err) => {
                        internal!(level = WARN, "Ignoring filesize_limit {value:?}: {err}");
                    }
                },
                "recipients_check_class" => raw.recipients_check_class = Some(value),
                "recipients_check_name" => raw.recipients_check_name = Some(value),
                "recipients_check_exceptions" => {
                    raw.recipients_check_exceptions = Some(StringList::Joined(value));
                }
                "body_charset" => raw.body_charset = Some(value),
                _ => internal!(level = WARN, "Ignoring unknown mail option {key}"),
            }
        }

        raw.into()
    }

    /// Parses a RON configuration. Optional options may be written without `Some(..)`.
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] if `source` is not a valid configuration.
    pub fn from_ron(source: &str) -> Result<Self, ConfigError> {
        Ok(ron::Options::default()
            .with_default_extension(ron::extensions::Extensions::IMPLICIT_SOME)
            .from_str(source)?)
    }

    /// Reads and parses a RON configuration file.
    ///
    /// # Errors
    /// Returns an error if the file can't be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_ron(&source)
    }

    fn has(&self, option: &str) -> bool {
        match option {
            "recipients" => self.recipients.is_some(),
            "recipients_field" => self.recipients_field.is_some(),
            "from" => self.from.is_some(),
            "from_field" => self.from_field.is_some(),
            _ => false,
        }
    }

    /// Options that are missing, each with the message `"is required"`.
    pub fn config_errors(&self) -> IndexMap<&'static str, &'static str> {
        REQUIRED_PAIRS
            .iter()
            .filter(|(direct, indirect)| !self.has(direct) && !self.has(indirect))
            .map(|(direct, _)| (*direct, "is required"))
            .collect()
    }

    /// `true` if every required option pair has at least one side configured.
    pub fn is_valid(&self) -> bool {
        self.config_errors().is_empty()
    }

    /// The config errors as a sentence, e.g. `'recipients' is required and 'from' is required`.
    pub fn config_error_messages(&self) -> String {
        let messages = self
            .config_errors()
            .into_iter()
            .map(|(field, message)| format!("'{field}' {message}"))
            .collect::<Vec<_>>();

        to_sentence(&messages)
    }

    pub fn recipients(&self) -> Option<&[String]> {
        self.recipients.as_deref()
    }

    pub fn recipients_field(&self) -> Option<&str> {
        self.recipients_field.as_deref()
    }

    pub fn from(&self) -> Option<&str> {
        self.from.as_deref()
    }

    pub fn from_field(&self) -> Option<&str> {
        self.from_field.as_deref()
    }

    pub fn reply_to(&self) -> Option<&str> {
        self.reply_to.as_deref()
    }

    pub fn reply_to_field(&self) -> Option<&str> {
        self.reply_to_field.as_deref()
    }

    pub fn cc(&self) -> Option<&str> {
        self.cc.as_deref()
    }

    pub fn cc_field(&self) -> Option<&str> {
        self.cc_field.as_deref()
    }

    pub fn sender(&self) -> Option<&str> {
        self.sender.as_deref()
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// Maximum attachment size in bytes, `0` meaning unlimited.
    pub fn filesize_limit(&self) -> u64 {
        self.filesize_limit.unwrap_or(0)
    }

    pub const fn recipients_check(&self) -> Option<&RecipientsCheck> {
        self.recipients_check.as_ref()
    }

    /// Charset label the rendered bodies are encoded in, if not UTF-8.
    pub fn body_charset(&self) -> Option<&str> {
        self.body_charset.as_deref()
    }
}

/// Joins items as an English list: `a`, `a and b`, `a, b, and c`.
fn to_sentence(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [first, second] => format!("{first} and {second}"),
        [init @ .., last] => format!("{}, and {last}", init.join(", ")),
    }
}
