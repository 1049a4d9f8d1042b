//! Turns fetched raw mail into an `IncomingMessage`.

use mail_parser::{Message, MessageParser};
use tracing::{debug, warn};

use crate::channels::email_types::{IncomingMessage, RawEmail};
use crate::pipeline::header::{DecodedHeader, decode_header};

/// Subject used when the header is missing.
pub const NO_SUBJECT: &str = "(No Subject)";

/// Result of extracting the plain-text body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyText {
    /// First plain-text part, transfer-decoded.
    Decoded(String),
    /// Raw payload, lossily interpreted as UTF-8.
    Fallback(String),
}

impl BodyText {
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
}

/// Join a folded raw header value onto one line.
fn unfold(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reply address and display name of the first `From` mailbox.
///
/// Handles every RFC 5322 form mail-parser understands, including
/// `addr (Name)` comments and encoded display names.
fn extract_sender(parsed: &Message) -> Option<(Option<String>, String)> {
    let mailbox = parsed.from().and_then(|addr| addr.first())?;
    let address = mailbox.address().map(str::trim).filter(|a| a.contains('@'))?;
    let name = mailbox
        .name()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string);
    Some((name, address.to_string()))
}

/// Best-effort plain-text body: the first text part, else the whole payload.
pub fn extract_body(parsed: &Message) -> BodyText {
    if let Some(text) = parsed.body_text(0) {
        return BodyText::Decoded(text.into_owned());
    }
    let raw = parsed.raw_message();
    let offset = (parsed.root_part().raw_body_offset() as usize).min(raw.len());
    BodyText::Fallback(String::from_utf8_lossy(&raw[offset..]).into_owned())
}

/// Decode headers and body of a fetched message.
///
/// Returns `None` when the message cannot be parsed or no reply address
/// can be recovered from `From`.
pub fn decode_message(email: &RawEmail) -> Option<IncomingMessage> {
    let Some(parsed) = MessageParser::default().parse(&email.raw) else {
        warn!(id = %email.id, "Message could not be parsed, skipping");
        return None;
    };

    let subject = match parsed.header_raw("Subject") {
        Some(raw) => decode_header(&unfold(raw)),
        None => DecodedHeader::Decoded(NO_SUBJECT.to_string()),
    };
    if subject.is_fallback() {
        debug!(id = %email.id, "Subject decoded with fallback");
    }

    let Some((sender_name, sender)) = extract_sender(&parsed) else {
        warn!(
            id = %email.id,
            from = ?parsed.header_raw("From"),
            "Message has no usable sender address, skipping"
        );
        return None;
    };

    let body = extract_body(&parsed);
    if let BodyText::Fallback(_) = body {
        debug!(id = %email.id, "Body extracted from raw payload");
    }

    Some(IncomingMessage {
        sender,
        sender_name,
        subject: subject.into_text(),
        body: body.into_text(),
    })
}
