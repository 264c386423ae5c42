#![allow(clippy::expect_used, clippy::unwrap_used)]

mod support;

use std::sync::Arc;

use formmail::{
    Attachment, MailConfig, MemoryTransport, Submission, page::EMAIL_HTML_PART,
    page::EMAIL_PART,
};
use pretty_assertions::assert_eq;
use support::{BrokenLookup, CountingLookup, form_mail, form_mail_on, page, required};

const VALID: [(&str, &str); 2] = [("recipients", "desk@example.com"), ("from", "forms@example.com")];

#[test]
fn test_config_errors_follow_the_required_pairs() {
    let missing_recipients = MailConfig::from_pairs([("from", "a@b.com"), ("subject", "Hi")]);
    assert_eq!(
        missing_recipients.config_errors().get("recipients"),
        Some(&"is required")
    );
    assert!(!missing_recipients.config_errors().contains_key("from"));

    let missing_from = MailConfig::from_pairs([("recipients_field", "to")]);
    assert_eq!(missing_from.config_errors().get("from"), Some(&"is required"));
    assert_eq!(missing_from.config_error_messages(), "'from' is required");

    assert!(MailConfig::from_pairs(VALID).config_errors().is_empty());
}

#[test]
fn test_validity_is_computed_once() {
    let lookup = CountingLookup::knowing(&["ann@example.com"]);
    let mail = form_mail(
        &[
            ("recipients_field", "to"),
            ("from", "forms@example.com"),
            ("recipients_check_class", "Staff"),
            ("recipients_check_name", "email"),
        ],
        Submission::new().with("to", "Ann@example.com"),
    )
    .with_lookup(lookup.clone());

    let first = mail.evaluate().clone();
    let second = mail.evaluate().clone();

    assert!(first.is_valid());
    assert_eq!(first, second);
    assert!(mail.is_valid());
    assert_eq!(mail.recipients(), ["Ann@example.com".to_string()]);
    assert_eq!(lookup.calls(), 1);
}

#[test]
fn test_field_recipients_are_split_and_checked() {
    let mail = form_mail(
        &[("recipients_field", "to"), ("from", "forms@example.com")],
        Submission::new().with("to", "a@b.com, bad, c@d.com"),
    );

    assert_eq!(
        mail.recipients(),
        ["a@b.com", "bad", "c@d.com"].map(String::from)
    );
    assert!(!mail.is_valid());
    assert_eq!(mail.errors().form(), Some("Recipients are invalid."));
}

#[test]
fn test_as_email_rule_rejects_blank() {
    let mail = form_mail(
        &VALID,
        Submission::new()
            .with("required", required(&[("email", "as_email")]))
            .with("email", ""),
    );

    assert!(!mail.is_valid());
    assert_eq!(mail.errors().field("email"), Some("invalid email address."));
    assert!(mail.submission().get("required").is_none());
}

#[test]
fn test_pattern_rule() {
    let mail = form_mail(
        &VALID,
        Submission::new()
            .with("required", required(&[("code", "/^[0-9]{4}$/")]))
            .with("code", "12ab"),
    );

    assert!(!mail.is_valid());
    assert_eq!(
        mail.errors().field("code"),
        Some("doesn't match regex (^[0-9]{4}$)")
    );
}

#[test]
fn test_send_without_templates_lists_the_submission() {
    let transport = MemoryTransport::new();
    let mut mail = form_mail(
        &VALID,
        Submission::new()
            .with("name", "Ada Lovelace")
            .with("message", "Hello there"),
    );

    assert_eq!(mail.sent(), None);
    assert!(mail.send(&transport));
    assert_eq!(mail.sent(), Some(true));

    let delivered = transport.delivered();
    assert_eq!(delivered.len(), 1);

    let envelope = &delivered[0];
    assert_eq!(
        envelope.plain_body,
        "The following information was posted:\nname: Ada Lovelace\nmessage: Hello there\n"
    );
    assert_eq!(envelope.plain_body, mail.submission_dump());
    assert_eq!(envelope.html_body, "");
    assert_eq!(envelope.recipients, vec!["desk@example.com".to_string()]);
    assert_eq!(envelope.from.as_deref(), Some("forms@example.com"));
    assert_eq!(envelope.subject, "Form Mail from forms.example.com");
    assert_eq!(envelope.headers.get("Reply-To"), Some("forms@example.com"));
}

#[test]
fn test_transport_failure_is_recorded() {
    let transport = MemoryTransport::rejecting("relay unavailable");
    let mut mail = form_mail(&VALID, Submission::new().with("name", "Ada"));

    assert!(!mail.send(&transport));
    assert_eq!(mail.sent(), Some(false));
    assert!(mail.is_valid());
    assert_eq!(mail.errors().base(), Some("Delivery rejected: relay unavailable"));
    assert!(transport.is_empty());
}

#[test]
fn test_invalid_submission_is_never_sent() {
    let transport = MemoryTransport::new();
    let mut mail = form_mail(&[("recipients_field", "to"), ("from", "forms@example.com")], Submission::new());

    assert!(!mail.send(&transport));
    assert_eq!(mail.sent(), None);
    assert!(transport.is_empty());
    assert_eq!(mail.errors().form(), Some("Recipients are required."));
}

#[test]
fn test_exceptions_survive_a_lookup_that_never_matches() {
    let lookup = CountingLookup::knowing(&[]);
    let mail = form_mail(
        &[
            ("recipients_field", "to"),
            ("from", "forms@example.com"),
            ("recipients_check_class", "Staff"),
            ("recipients_check_name", "email"),
            ("recipients_check_exceptions", "x@y.com"),
        ],
        Submission::new().with("to", "a@b.com, x@y.com, c@d.com"),
    )
    .with_lookup(lookup.clone());

    assert_eq!(mail.recipients(), ["x@y.com".to_string()]);
    assert_eq!(lookup.calls(), 2);
    assert!(mail.is_valid());
}

#[test]
fn test_lookup_failures_leave_no_recipients() {
    let mail = form_mail(
        &[
            ("recipients_field", "to"),
            ("from", "forms@example.com"),
            ("recipients_check_class", "Staff"),
            ("recipients_check_name", "email"),
        ],
        Submission::new().with("to", "a@b.com, c@d.com"),
    )
    .with_lookup(Arc::new(BrokenLookup));

    assert!(mail.recipients().is_empty());
    assert_eq!(mail.errors().form(), Some("Recipients are required."));
}

#[test]
fn test_unsafe_check_column_is_not_queried() {
    let lookup = CountingLookup::knowing(&[]);
    let mail = form_mail(
        &[
            ("recipients_field", "to"),
            ("from", "forms@example.com"),
            ("recipients_check_class", "Staff"),
            ("recipients_check_name", "email') OR ('1'='1"),
        ],
        Submission::new().with("to", "a@b.com"),
    )
    .with_lookup(lookup.clone());

    assert_eq!(mail.recipients(), ["a@b.com".to_string()]);
    assert_eq!(lookup.calls(), 0);
}

#[test]
fn test_rendered_parts_and_sender_headers() {
    let transport = MemoryTransport::new();
    let page = page()
        .with_part(EMAIL_PART, "Plain body")
        .with_part(EMAIL_HTML_PART, "<p>Html body</p>");
    let mut mail = form_mail_on(
        &[
            ("recipients", "desk@example.com, ops@example.com"),
            ("from_field", "email"),
            ("sender", "bounces@example.com"),
            ("subject", "Website contact"),
            ("cc", "archive@example.com"),
        ],
        Submission::new().with("email", "visitor@example.org"),
        page,
    );

    assert!(mail.send(&transport));

    let envelope = transport.delivered().remove(0);
    assert_eq!(envelope.plain_body, "Plain body");
    assert_eq!(envelope.html_body, "<p>Html body</p>");
    assert_eq!(envelope.subject, "Website contact");
    assert_eq!(envelope.cc, "archive@example.com");
    assert_eq!(envelope.recipients.len(), 2);
    assert_eq!(envelope.headers.get("Reply-To"), Some("visitor@example.org"));
    assert_eq!(envelope.headers.get("Sender"), Some("bounces@example.com"));
    assert_eq!(envelope.headers.get("Return-Path"), Some("bounces@example.com"));
}

#[test]
fn test_oversized_attachment_fails_delivery() {
    let transport = MemoryTransport::new();
    let mut config = VALID.to_vec();
    config.push(("filesize_limit", "8"));
    let mut mail = form_mail(
        &config,
        Submission::new()
            .with("name", "Ada")
            .with("cv", Attachment::new("cv.pdf", "application/pdf", vec![0; 64])),
    );

    assert_eq!(mail.files().len(), 1);
    assert_eq!(mail.filesize_limit(), 8);
    assert!(!mail.send(&transport));
    assert_eq!(
        mail.errors().base(),
        Some("Attachment cv.pdf is too large (64 bytes, limit 8 bytes)")
    );
}

#[test]
fn test_legacy_charset_bodies_are_transcoded() {
    struct Latin9Page;

    impl formmail::Page for Latin9Page {
        fn has_part(&self, name: &str) -> bool {
            name == EMAIL_PART
        }

        fn render_part(&self, name: &str) -> Option<Vec<u8>> {
            (name == EMAIL_PART).then(|| b"Total: 5\xa4".to_vec())
        }

        fn host(&self) -> &str {
            "legacy.example.com"
        }
    }

    let mut config = VALID.to_vec();
    config.push(("body_charset", "iso-8859-15"));
    let mail = formmail::FormMail::new(
        MailConfig::from_pairs(config),
        Submission::new(),
        Latin9Page,
    )
    .unwrap();

    assert_eq!(mail.plain_body().as_deref(), Some("Total: 5€"));
}

#[test]
fn test_line_breaks_in_recipients_make_them_invalid() {
    let mail = form_mail(
        &[("recipients_field", "to"), ("from", "forms@example.com")],
        Submission::new().with("to", "desk\r\nBcc: victim@evil.com"),
    );

    assert!(!mail.is_valid());
    assert_eq!(mail.errors().form(), Some("Recipients are invalid."));
}

#[test]
fn test_line_breaks_in_submitted_headers_stop_delivery() {
    let transport = MemoryTransport::new();
    let mut mail = form_mail(
        &[
            ("recipients", "desk@example.com"),
            ("from", "forms@example.com"),
            ("reply_to_field", "reply"),
        ],
        Submission::new()
            .with("subject", "Hi\r\nBcc: victim@evil.com")
            .with("reply", "visitor@example.org"),
    );

    assert!(mail.is_valid());
    assert!(!mail.send(&transport));
    assert_eq!(mail.sent(), Some(false));
    assert_eq!(mail.errors().base(), Some("Header Subject contains a line break"));
    assert!(transport.is_empty());
}
