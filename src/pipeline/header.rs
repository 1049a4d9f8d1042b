//! MIME header decoding (RFC 2047 encoded words).
//!
//! Decoding never fails the caller: the worst case hands back the raw text.

use std::sync::LazyLock;

use mail_parser::MessageParser;
use regex::Regex;
use tracing::debug;

/// Result of decoding one header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedHeader {
    /// Every encoded word was decoded (or there were none).
    Decoded(String),
    /// Decoding was partial or failed; the best-effort text is carried.
    Fallback(String),
}

impl DecodedHeader {
    pub fn text(&self) -> &str {
        match self {
            Self::Decoded(s) | Self::Fallback(s) => s,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Self::Decoded(s) | Self::Fallback(s) => s,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

static ENCODED_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"=\?[^?\s]+\?[BbQq]\?[^?\s]*\?=").expect("valid regex")
});

/// Decode a raw header value.
///
/// Plain headers are returned unchanged. Encoded words are decoded with
/// their declared charset; undecodable bytes become U+FFFD. If that
/// happened, a segment survives decoding, or the header cannot be parsed at
/// all, the result is flagged as a fallback.
pub fn decode_header(raw: &str) -> DecodedHeader {
    if !raw.contains("=?") {
        return DecodedHeader::Decoded(raw.to_string());
    }

    // Reuse the full message parser's unstructured-header decoder.
    let synthetic = format!("Subject: {}\r\n\r\n", raw.trim());
    let decoded = MessageParser::default()
        .parse(synthetic.as_bytes())
        .and_then(|msg| msg.subject().map(str::to_string));

    match decoded {
        Some(text) if !ENCODED_WORD.is_match(&text) && !text.contains(char::REPLACEMENT_CHARACTER) => {
            DecodedHeader::Decoded(text)
        }
        Some(text) => {
            debug!(raw = raw, "Header left partially encoded or lossily decoded");
            DecodedHeader::Fallback(text)
        }
        None => {
            debug!(raw = raw, "Header decode failed, using raw value");
            DecodedHeader::Fallback(raw.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_ascii_is_unchanged() {
        let raw = "Attestation de Scolarite Request";
        assert_eq!(decode_header(raw), DecodedHeader::Decoded(raw.to_string()));
    }

    #[test]
    fn plain_header_keeps_surrounding_whitespace() {
        let raw = "  spaced  ";
        assert_eq!(decode_header(raw).text(), raw);
    }

    #[test]
    fn base64_utf8_word() {
        // "Attestation de scolarité"
        let raw = "=?UTF-8?B?QXR0ZXN0YXRpb24gZGUgc2NvbGFyaXTDqQ==?=";
        let decoded = decode_header(raw);
        assert!(!decoded.is_fallback());
        assert_eq!(decoded.text(), "Attestation de scolarité");
    }

    #[test]
    fn quoted_printable_latin1_word() {
        let raw = "=?ISO-8859-1?Q?Fili=E8re?=";
        assert_eq!(decode_header(raw).text(), "Filière");
    }

    #[test]
    fn mixed_plain_and_encoded_segments() {
        let raw = "Re: =?UTF-8?Q?attestation_de_stage?= - urgent";
        let decoded = decode_header(raw);
        assert!(decoded.text().contains("attestation de stage"));
        assert!(decoded.text().ends_with("- urgent"));
    }

    #[test]
    fn invalid_utf8_in_encoded_word_is_fallback() {
        // 0xFF is never valid UTF-8
        let decoded = decode_header("Attestation =?UTF-8?B?/w==?=");
        assert!(decoded.is_fallback());
        assert!(decoded.text().starts_with("Attestation"));
    }

    #[test]
    fn decoded_header_accessors() {
        let fallback = DecodedHeader::Fallback("raw".into());
        assert!(fallback.is_fallback());
        assert_eq!(fallback.into_text(), "raw");
    }
}
