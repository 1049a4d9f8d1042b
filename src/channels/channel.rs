//! Mail transport traits.

use async_trait::async_trait;

use crate::channels::email_types::{OutgoingEmail, RawEmail};
use crate::error::ChannelError;

/// Inbound mailbox: authenticate once, then list and fetch repeatedly.
#[async_trait]
pub trait Inbox: Send {
    /// Authenticate and select the inbox.
    async fn connect(&mut self) -> Result<(), ChannelError>;

    /// List every message identifier currently in the inbox, in server order.
    async fn list_ids(&mut self) -> Result<Vec<String>, ChannelError>;

    /// Fetch the full raw RFC 822 content of one message.
    async fn fetch(&mut self, id: &str) -> Result<RawEmail, ChannelError>;

    /// Close the session. Errors are ignored by callers.
    async fn disconnect(&mut self) -> Result<(), ChannelError> {
        Ok(())
    }
}

/// Outbound mail submission to a single recipient.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), ChannelError>;
}
