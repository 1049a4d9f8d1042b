//! Mail transports for inbound requests and outbound replies.

pub mod channel;
pub mod email;
pub mod email_types;

pub use channel::{Inbox, Mailer};
pub use email::{EmailConfig, ImapInbox, SmtpMailer};
pub use email_types::{EmailAttachment, IncomingMessage, OutgoingEmail, RawEmail};
