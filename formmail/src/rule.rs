//! Required-field rules posted alongside a form.
//!
//! A form declares its required fields as a group of `field => rule` pairs.
//! Rules are parsed once, when the [`FormMail`](crate::validator::FormMail)
//! is built:
//!
//! | Rule text                                  | Meaning                          |
//! |--------------------------------------------|----------------------------------|
//! | `as_email`                                 | present and shaped like an email |
//! | `/pattern/`                                | matches the regular expression   |
//! | blank, `1`, `true`, `required`, `not_blank`| present                          |
//! | anything else                              | present, else the text itself    |
//!
//! Patterns use the [`regex`] syntax. Lookaround and backreferences are not
//! supported, so a rule using them fails construction with
//! [`FormMailError::InvalidPattern`] instead of being accepted.

use formmail_common::address::is_email;
use indexmap::IndexMap;
use regex::Regex;

use crate::{error::FormMailError, submission::FieldValue};

const AS_EMAIL: &str = "as_email";
const REQUIRED_SYNONYMS: [&str; 4] = ["1", "true", "required", "not_blank"];

/// A parsed rule for one required field.
#[derive(Debug, Clone)]
pub enum Rule {
    /// The value must be present.
    Required,
    /// The value must be present and have the email shape.
    AsEmail,
    /// The value must match `regex`. `source` is the text between the slashes.
    Pattern { source: String, regex: Regex },
    /// The value must be present, otherwise the message is reported as-is.
    Message(String),
}

impl Rule {
    /// Parses a rule.
    ///
    /// # Errors
    /// Returns the compile error if a `/pattern/` rule is not a valid regular expression.
    pub fn parse(rule: &str) -> Result<Self, regex::Error> {
        if rule == AS_EMAIL {
            return Ok(Self::AsEmail);
        }

        if let Some(source) = delimited_pattern(rule) {
            return Ok(Self::Pattern {
                source: source.to_string(),
                regex: Regex::new(source)?,
            });
        }

        let trimmed = rule.trim();
        if trimmed.is_empty() || REQUIRED_SYNONYMS.contains(&trimmed) {
            Ok(Self::Required)
        } else {
            Ok(Self::Message(rule.to_string()))
        }
    }

    /// Checks `value` against this rule, returning the error message on failure.
    pub fn check(&self, value: Option<&FieldValue>) -> Result<(), String> {
        match self {
            Self::AsEmail => match value.and_then(FieldValue::as_text) {
                Some(text) if is_email(text) => Ok(()),
                _ => Err("invalid email address.".to_string()),
            },
            Self::Pattern { source, regex } => match value.and_then(FieldValue::as_text) {
                Some(text) if regex.is_match(text) => Ok(()),
                _ => Err(format!("doesn't match regex ({source})")),
            },
            Self::Required => present(value).ok_or_else(|| "is required.".to_string()),
            Self::Message(message) => present(value).ok_or_else(|| message.clone()),
        }
    }
}

fn present(value: Option<&FieldValue>) -> Option<()> {
    value.filter(|value| !value.is_blank()).map(|_| ())
}

/// The text between the first and the last `/`, when there are at least two.
fn delimited_pattern(rule: &str) -> Option<&str> {
    let start = rule.find('/')?;
    let end = rule.rfind('/')?;
    (end > start).then(|| &rule[start + 1..end])
}

/// The declared required fields of a form, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct RequiredFields {
    rules: IndexMap<String, Rule>,
}

impl RequiredFields {
    /// Parses every posted rule.
    ///
    /// # Errors
    /// Returns [`FormMailError::InvalidPattern`] for the first rule whose pattern does not compile.
    pub fn parse(rules: IndexMap<String, String>) -> Result<Self, FormMailError> {
        let rules = rules
            .into_iter()
            .map(|(field, rule)| match Rule::parse(&rule) {
                Ok(rule) => Ok((field, rule)),
                Err(source) => Err(FormMailError::InvalidPattern { field, source }),
            })
            .collect::<Result<IndexMap<_, _>, _>>()?;

        Ok(Self { rules })
    }

    /// `true` if `field` is exactly the name of a declared required field.
    pub fn contains(&self, field: Option<&str>) -> bool {
        field.is_some_and(|field| self.rules.contains_key(field))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Rule)> {
        self.rules.iter().map(|(field, rule)| (field.as_str(), rule))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
