//! Submitted form data.

use std::fmt;

use formmail_common::text::is_blank;
use indexmap::IndexMap;
use serde::{Serialize, Serializer};

/// The key under which a form posts its required-field rules.
pub const REQUIRED_KEY: &str = "required";

/// An uploaded file.
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    /// The filename to use in the MIME header.
    pub filename: String,
    /// The MIME content type (e.g., "application/pdf").
    pub content_type: String,
    /// The attachment data.
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    pub const fn len(&self) -> usize {
        self.data.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("size", &self.data.len())
            .finish()
    }
}

/// A single submitted value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Plain text input.
    Text(String),
    /// An uploaded file.
    File(Attachment),
    /// A nested group of text values, e.g. `required[email]=as_email`.
    Group(IndexMap<String, String>),
}

impl FieldValue {
    /// The text of this value, if it is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::File(_) | Self::Group(_) => None,
        }
    }

    /// A value is blank when it is whitespace-only text, an empty file, or an empty group.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Text(text) => is_blank(text),
            Self::File(file) => file.is_empty(),
            Self::Group(group) => group.is_empty(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Attachment> for FieldValue {
    fn from(value: Attachment) -> Self {
        Self::File(value)
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Text(text) => serializer.serialize_str(text),
            Self::File(file) => serializer.serialize_str(&file.filename),
            Self::Group(group) => group.serialize(serializer),
        }
    }
}

/// The submitted fields of a form, in the order they were posted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Submission {
    fields: IndexMap<String, FieldValue>,
}

impl Submission {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a field.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// The text of field `name`, if present and text.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_text)
    }

    /// The non-blank text of field `name`.
    pub fn present_text(&self, name: &str) -> Option<&str> {
        self.text(name).filter(|text| !is_blank(text))
    }

    /// Removes and returns the posted required-field rules.
    ///
    /// Any value under [`REQUIRED_KEY`] is removed. Only a group yields rules.
    pub(crate) fn take_required(&mut self) -> Option<IndexMap<String, String>> {
        match self.fields.shift_remove(REQUIRED_KEY)? {
            FieldValue::Group(rules) => Some(rules),
            FieldValue::Text(_) | FieldValue::File(_) => {
                formmail_common::internal!(
                    level = WARN,
                    "Ignoring '{REQUIRED_KEY}' field that isn't a group of rules"
                );
                None
            }
        }
    }

    /// Uploaded files in submission order.
    pub fn files(&self) -> impl Iterator<Item = &Attachment> {
        self.fields.values().filter_map(|value| match value {
            FieldValue::File(file) => Some(file),
            FieldValue::Text(_) | FieldValue::Group(_) => None,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for Submission {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}
