//! Body charset normalisation.
//!
//! Templates on older sites are stored in a legacy 8-bit charset. Rendered
//! bodies are transcoded to UTF-8 before dispatch. Failure is never fatal: the
//! bytes are passed through as lossy UTF-8 instead.

use charset::Charset;
use formmail_common::internal;

/// Decodes `bytes` from the charset labelled `label`.
///
/// # Errors
/// An unknown label, or a byte sequence that is malformed in that charset.
pub fn transcode(bytes: &[u8], label: &str) -> Result<String, TranscodeError> {
    let charset = Charset::for_label(label.trim().as_bytes())
        .ok_or_else(|| TranscodeError::UnknownCharset(label.to_string()))?;

    let (text, had_errors) = charset.decode_without_bom_handling(bytes);
    if had_errors {
        return Err(TranscodeError::Malformed(charset.name().to_string()));
    }

    Ok(text.into_owned())
}

/// Returns `bytes` as UTF-8 text, transcoding from `charset` when one is configured.
pub fn normalize(bytes: &[u8], charset: Option<&str>) -> String {
    let Some(label) = charset else {
        return lossy_utf8(bytes);
    };

    transcode(bytes, label).unwrap_or_else(|err| {
        internal!(
            level = WARN,
            "Mail body could not be converted to UTF-8, sending as-is: {err}"
        );
        lossy_utf8(bytes)
    })
}

fn lossy_utf8(bytes: &[u8]) -> String {
    Charset::for_encoding(encoding_rs::UTF_8)
        .decode_without_bom_handling(bytes)
        .0
        .into_owned()
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TranscodeError {
    #[error("Unknown charset {0}")]
    UnknownCharset(String),

    #[error("Malformed {0} sequence")]
    Malformed(String),
}
