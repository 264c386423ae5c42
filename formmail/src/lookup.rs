//! Optional lookup of field-sourced recipients against an external table.
//!
//! A form that lets the visitor choose the recipient can restrict the choice
//! to addresses that exist in some table, e.g. a staff directory. The column
//! name comes from configuration and ends up in a query, so it is only usable
//! once it has been checked to be a plain identifier: see [`ColumnName`].

use std::{fmt, sync::LazyLock};

use formmail_common::internal;
use regex::Regex;

use crate::{config::RecipientsCheck, error::LookupError};

#[allow(clippy::expect_used)]
static SAFE_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("identifier regex is valid"));

/// A column name made only of ASCII word characters and hyphens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnName(String);

impl ColumnName {
    /// Returns `None` unless `name` matches `^[\w-]+$` (ASCII).
    pub fn new(name: &str) -> Option<Self> {
        SAFE_IDENTIFIER
            .is_match(name)
            .then(|| Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ColumnName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Answers whether an address exists in an external table.
pub trait RecipientLookup {
    /// Returns `true` if a record in `table` has `column` equal to `value`,
    /// compared case-insensitively. `value` is already lowercased.
    ///
    /// # Errors
    /// Any failure of the backing store. The caller drops the candidate.
    fn matches(&self, table: &str, column: &ColumnName, value: &str) -> Result<bool, LookupError>;
}

impl<T: RecipientLookup + ?Sized> RecipientLookup for &T {
    fn matches(&self, table: &str, column: &ColumnName, value: &str) -> Result<bool, LookupError> {
        (**self).matches(table, column, value)
    }
}

/// Filters `candidates` through `check`.
///
/// A candidate is kept when it is an exception or the lookup matches. A lookup
/// error or a non-match drops just that candidate. When the configured column
/// is not a safe identifier the check is skipped and every candidate is kept.
pub fn filter_recipients(
    candidates: Vec<String>,
    check: &RecipientsCheck,
    lookup: &dyn RecipientLookup,
) -> Vec<String> {
    let Some(column) = ColumnName::new(&check.column) else {
        internal!(
            level = WARN,
            "Skipping recipients check: {:?} is not a safe column name",
            check.column
        );
        return candidates;
    };

    candidates
        .into_iter()
        .filter(|candidate| {
            if check.is_exception(candidate) {
                return true;
            }

            match lookup.matches(&check.table, &column, &candidate.to_lowercase()) {
                Ok(true) => true,
                Ok(false) => {
                    internal!(
                        level = WARN,
                        "Attempt to use email that didn't pass the check: {candidate}."
                    );
                    false
                }
                Err(err) => {
                    internal!(
                        level = WARN,
                        "Attempt to use email that didn't pass the check: {candidate}. Error: {err}"
                    );
                    false
                }
            }
        })
        .collect()
}
