//! Encoded media payload decoding
//!
//! Outfit records carry their media as base64 strings, sometimes wrapped in a
//! `data:<mime>;base64,` URL and sometimes with embedded line breaks. This
//! module turns those strings into raw bytes before they reach the pool.

use crate::{Error, Result};
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;

/// Standard alphabet, padding optional
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decoded payload plus the MIME type declared by a `data:` prefix, if any
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPayload {
    pub bytes: Vec<u8>,
    pub declared_mime: Option<String>,
}

impl DecodedPayload {
    /// True when the `data:` prefix declared a still image
    pub fn declares_image(&self) -> bool {
        self.declared_mime
            .as_deref()
            .is_some_and(|m| m.starts_with("image/"))
    }
}

/// Decode an encoded payload string
///
/// Characters outside the base64 alphabet (whitespace, line breaks, stray
/// separators) are ignored.
///
/// # Errors
/// - `data:` URL that is not base64-encoded
/// - Empty payload after cleanup
/// - Invalid base64 content
pub fn decode_payload(encoded: &str) -> Result<DecodedPayload> {
    let trimmed = encoded.trim();

    let (declared_mime, body) = match trimmed.strip_prefix("data:") {
        Some(rest) => {
            let (header, body) = rest
                .split_once(',')
                .ok_or_else(|| Error::Payload("data URL without ',' separator".to_string()))?;
            let mut parts = header.split(';');
            let mime = parts.next().filter(|m| !m.is_empty()).map(str::to_string);
            if !parts.any(|p| p.eq_ignore_ascii_case("base64")) {
                return Err(Error::Payload(format!(
                    "data URL is not base64 encoded (header: {})",
                    header
                )));
            }
            (mime, body)
        }
        None => (None, trimmed),
    };

    let cleaned: String = body
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/'))
        .collect();

    if cleaned.is_empty() {
        return Err(Error::Payload("empty payload".to_string()));
    }

    let bytes = LENIENT
        .decode(cleaned.as_bytes())
        .map_err(|e| Error::Payload(format!("invalid base64: {}", e)))?;

    Ok(DecodedPayload {
        bytes,
        declared_mime,
    })
}
