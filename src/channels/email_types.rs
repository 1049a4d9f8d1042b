//! Email-specific types — raw fetched mail, decoded requests, outgoing replies.

use serde::{Deserialize, Serialize};

/// A message as fetched from the inbox, before any decoding.
#[derive(Debug, Clone)]
pub struct RawEmail {
    /// Server-side message identifier (IMAP sequence number).
    pub id: String,
    /// Full RFC 822 bytes.
    pub raw: Vec<u8>,
}

impl RawEmail {
    pub fn new(id: impl Into<String>, raw: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            raw: raw.into(),
        }
    }
}

/// A decoded inbound request. Lives for the duration of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingMessage {
    /// Reply address.
    pub sender: String,
    /// Display name from the `From` header, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    /// Decoded subject line.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
}

impl IncomingMessage {
    pub fn new(sender: &str, subject: &str, body: &str) -> Self {
        Self {
            sender: sender.to_string(),
            sender_name: None,
            subject: subject.to_string(),
            body: body.to_string(),
        }
    }

    pub fn with_sender_name(mut self, name: &str) -> Self {
        self.sender_name = Some(name.to_string());
        self
    }

    /// Name used in "Dear ..." lines: first word of the display name, or
    /// the bare address.
    pub fn greeting_name(&self) -> &str {
        self.sender_name
            .as_deref()
            .and_then(|n| n.split_whitespace().next())
            .unwrap_or(&self.sender)
    }
}

/// A file attached to an outgoing reply.
#[derive(Debug, Clone)]
pub struct EmailAttachment {
    pub filename: String,
    pub content: Vec<u8>,
}

/// A composed reply, ready for the mailer.
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachment: Option<EmailAttachment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── greeting tests ──────────────────────────────────────────

    #[test]
    fn greeting_uses_first_name_word() {
        let msg = IncomingMessage::new("amina@example.com", "s", "b").with_sender_name("Amina Benali");
        assert_eq!(msg.greeting_name(), "Amina");
    }

    #[test]
    fn greeting_falls_back_to_address() {
        let msg = IncomingMessage::new("amina@example.com", "s", "b");
        assert_eq!(msg.greeting_name(), "amina@example.com");
    }

    #[test]
    fn incoming_message_serde_omits_missing_name() {
        let msg = IncomingMessage::new("a@example.com", "Subject", "Body");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(!json.contains("sender_name"));
        let back: IncomingMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }
}
