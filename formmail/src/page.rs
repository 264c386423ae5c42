//! The page hosting the form.
//!
//! Templates and the request live in the surrounding CMS. The validator only
//! needs three things from them: whether a named part exists, the rendered
//! bytes of a part, and the request host for the default subject.

/// Part rendered as the plain-text body when the page defines it.
pub const EMAIL_PART: &str = "email";
/// Plain-text body part used when [`EMAIL_PART`] is absent.
pub const EMAIL_PLAIN_PART: &str = "email_plain";
/// Part rendered as the html body.
pub const EMAIL_HTML_PART: &str = "email_html";

pub trait Page {
    /// Returns `true` if the page defines a part called `name`.
    fn has_part(&self, name: &str) -> bool;

    /// Renders part `name`, or `None` if it doesn't exist.
    ///
    /// The bytes are in the charset configured as `body_charset`, UTF-8 by default.
    fn render_part(&self, name: &str) -> Option<Vec<u8>>;

    /// Host name of the current request.
    fn host(&self) -> &str;
}

impl<T: Page + ?Sized> Page for &T {
    fn has_part(&self, name: &str) -> bool {
        (**self).has_part(name)
    }

    fn render_part(&self, name: &str) -> Option<Vec<u8>> {
        (**self).render_part(name)
    }

    fn host(&self) -> &str {
        (**self).host()
    }
}

/// A page whose parts are fixed strings, useful where no template engine is around.
#[derive(Debug, Clone, Default)]
pub struct StaticPage {
    host: String,
    parts: Vec<(String, String)>,
}

impl StaticPage {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            parts: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_part(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.parts.push((name.into(), content.into()));
        self
    }

    fn part(&self, name: &str) -> Option<&str> {
        self.parts
            .iter()
            .find(|(part, _)| part == name)
            .map(|(_, content)| content.as_str())
    }
}

impl Page for StaticPage {
    fn has_part(&self, name: &str) -> bool {
        self.part(name).is_some()
    }

    fn render_part(&self, name: &str) -> Option<Vec<u8>> {
        self.part(name).map(|content| content.as_bytes().to_vec())
    }

    fn host(&self) -> &str {
        &self.host
    }
}
