use crate::submission::Attachment;

/// Extra message headers, in insertion order. Names compare case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets header `name`, replacing any existing value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();

        match self.0.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(&name)) {
            Some((_, existing)) => *existing = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub const fn len(&self) -> usize {
        self.0.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Everything a [`Transport`](crate::transport::Transport) needs to send one form mail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Envelope {
    pub recipients: Vec<String>,
    pub from: Option<String>,
    pub subject: String,
    pub plain_body: String,
    pub html_body: String,
    /// Comma-separated, possibly empty.
    pub cc: String,
    pub headers: Headers,
    pub files: Vec<Attachment>,
    /// Maximum size of a single attachment in bytes, `0` meaning unlimited.
    pub filesize_limit: u64,
}

impl Envelope {
    /// Returns the first attachment that exceeds the filesize limit.
    pub fn oversized_file(&self) -> Option<&Attachment> {
        if self.filesize_limit == 0 {
            return None;
        }

        self.files
            .iter()
            .find(|file| u64::try_from(file.len()).is_ok_and(|len| len > self.filesize_limit))
    }
}
