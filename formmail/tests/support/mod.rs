#![allow(dead_code)]

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use formmail::{
    ColumnName, FieldValue, FormMail, LookupError, MailConfig, RecipientLookup, StaticPage,
    Submission,
};

/// A lookup that counts its calls and only knows the given addresses.
#[derive(Debug, Default)]
pub struct CountingLookup {
    known: Vec<String>,
    calls: AtomicUsize,
}

impl CountingLookup {
    pub fn knowing(known: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            known: known.iter().map(ToString::to_string).collect(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RecipientLookup for CountingLookup {
    fn matches(&self, _table: &str, _column: &ColumnName, value: &str) -> Result<bool, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.known.iter().any(|known| known == value))
    }
}

/// A lookup whose backend is always down.
#[derive(Debug, Default)]
pub struct BrokenLookup;

impl RecipientLookup for BrokenLookup {
    fn matches(&self, table: &str, _column: &ColumnName, _value: &str) -> Result<bool, LookupError> {
        Err(LookupError::UnknownTable(table.to_string()))
    }
}

pub fn page() -> StaticPage {
    StaticPage::new("forms.example.com")
}

pub fn required(rules: &[(&str, &str)]) -> FieldValue {
    FieldValue::Group(
        rules
            .iter()
            .map(|(field, rule)| ((*field).to_string(), (*rule).to_string()))
            .collect(),
    )
}

pub fn form_mail(config: &[(&str, &str)], submission: Submission) -> FormMail<StaticPage> {
    form_mail_on(config, submission, page())
}

pub fn form_mail_on(
    config: &[(&str, &str)],
    submission: Submission,
    page: StaticPage,
) -> FormMail<StaticPage> {
    FormMail::new(MailConfig::from_pairs(config.iter().copied()), submission, page)
        .expect("form mail should build")
}
