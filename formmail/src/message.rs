//! Renders an [`Envelope`] as an RFC 5322 message with MIME parts.
//!
//! The layout depends on what the envelope carries:
//! - plain text only: a single `text/plain` body
//! - plain and html: `multipart/alternative`
//! - any attachment: `multipart/mixed`, with the text (or the alternative
//!   part) first and one base64 part per attachment

use std::io::{self, Write};

use base64::{Engine, engine::general_purpose::STANDARD};
use formmail_common::text::is_blank;
use ulid::Ulid;

use crate::{envelope::Envelope, error::MessageError, submission::Attachment};

type Result<T> = std::result::Result<T, MessageError>;

/// Renders `envelope`.
///
/// # Errors
/// [`MessageError::NoRecipients`] when there is nobody to send to,
/// [`MessageError::AttachmentTooLarge`] when an attachment exceeds the limit
/// and [`MessageError::HeaderInjection`] when a header value spans lines.
pub fn render(envelope: &Envelope) -> Result<String> {
    if envelope.recipients.is_empty() {
        return Err(MessageError::NoRecipients);
    }

    if let Some(file) = envelope.oversized_file() {
        return Err(MessageError::AttachmentTooLarge {
            filename: file.filename.clone(),
            size: file.len(),
            limit: envelope.filesize_limit,
        });
    }

    let mut message = Vec::with_capacity(1024);
    write_headers(&mut message, envelope)?;
    write!(&mut message, "MIME-Version: 1.0\r\n")?;

    let has_html = !is_blank(&envelope.html_body);
    match (envelope.files.is_empty(), has_html) {
        (true, false) => write_text(&mut message, "plain", &envelope.plain_body)?,
        (true, true) => write_alternative(&mut message, envelope)?,
        (false, _) => write_mixed(&mut message, envelope, has_html)?,
    }

    String::from_utf8(message).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e).into())
}

fn write_headers(message: &mut Vec<u8>, envelope: &Envelope) -> Result<()> {
    if let Some(from) = &envelope.from {
        write_header(message, "From", from)?;
    }

    write_header(message, "To", &envelope.recipients.join(", "))?;

    if !is_blank(&envelope.cc) {
        write_header(message, "Cc", envelope.cc.trim())?;
    }

    single_line("Subject", &envelope.subject)?;
    write!(message, "Subject: {}\r\n", encode_word(&envelope.subject))?;

    for (name, value) in envelope.headers.iter() {
        write_header(message, name, value)?;
    }

    Ok(())
}

fn write_header(message: &mut Vec<u8>, name: &str, value: &str) -> Result<()> {
    single_line(name, value)?;
    write!(message, "{name}: {value}\r\n")?;

    Ok(())
}

/// A CR or LF in a header value would start a new header.
fn single_line(name: &str, value: &str) -> Result<()> {
    if value.contains(['\r', '\n']) {
        return Err(MessageError::HeaderInjection {
            name: name.to_string(),
        });
    }

    Ok(())
}

/// Writes a single text part, headers included.
fn write_text(message: &mut Vec<u8>, subtype: &str, body: &str) -> Result<()> {
    write!(message, "Content-Type: text/{subtype}; charset=utf-8\r\n")?;
    write!(message, "Content-Transfer-Encoding: 8bit\r\n")?;
    write!(message, "\r\n")?;
    write!(message, "{body}\r\n")?;

    Ok(())
}

fn write_alternative(message: &mut Vec<u8>, envelope: &Envelope) -> Result<()> {
    let boundary = generate_boundary();

    write!(
        message,
        "Content-Type: multipart/alternative; boundary=\"{boundary}\"\r\n"
    )?;
    write!(message, "\r\n")?;

    write!(message, "--{boundary}\r\n")?;
    write_text(message, "plain", &envelope.plain_body)?;
    write!(message, "--{boundary}\r\n")?;
    write_text(message, "html", &envelope.html_body)?;
    write!(message, "--{boundary}--\r\n")?;

    Ok(())
}

fn write_mixed(message: &mut Vec<u8>, envelope: &Envelope, has_html: bool) -> Result<()> {
    let boundary = generate_boundary();

    write!(
        message,
        "Content-Type: multipart/mixed; boundary=\"{boundary}\"\r\n"
    )?;
    write!(message, "\r\n")?;

    write!(message, "--{boundary}\r\n")?;
    if has_html {
        write_alternative(message, envelope)?;
    } else {
        write_text(message, "plain", &envelope.plain_body)?;
    }

    for file in &envelope.files {
        write!(message, "--{boundary}\r\n")?;
        write_attachment(message, file)?;
    }

    write!(message, "--{boundary}--\r\n")?;

    Ok(())
}

fn write_attachment(message: &mut Vec<u8>, file: &Attachment) -> Result<()> {
    write!(message, "Content-Type: {}\r\n", file.content_type)?;
    write!(message, "Content-Transfer-Encoding: base64\r\n")?;
    write!(
        message,
        "Content-Disposition: attachment; filename=\"{}\"\r\n",
        file.filename.replace(['"', '\\'], "_")
    )?;
    write!(message, "\r\n")?;
    write!(message, "{}", base64_wrapped(&file.data))?;

    Ok(())
}

/// Generates a unique MIME boundary string.
fn generate_boundary() -> String {
    format!("----=_Part_{}", Ulid::new())
}

/// Encodes data as base64, wrapped at 76 characters per line.
fn base64_wrapped(data: &[u8]) -> String {
    let encoded = STANDARD.encode(data);
    let mut result = String::with_capacity(encoded.len() + encoded.len() / 38 + 2);

    for line in encoded.as_bytes().chunks(76) {
        // base64 output is ASCII, so every chunk boundary is a char boundary
        result.push_str(&String::from_utf8_lossy(line));
        result.push_str("\r\n");
    }

    result
}

/// RFC 2047 encodes a header value when it isn't plain ASCII.
fn encode_word(value: &str) -> String {
    if value.is_ascii() {
        value.to_string()
    } else {
        format!("=?utf-8?B?{}?=", STANDARD.encode(value))
    }
}
