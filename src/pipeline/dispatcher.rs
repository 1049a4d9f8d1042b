//! Reply dispatch, gated by the processed-senders ledger.
//!
//! Ordering: ledger lookup, compose, send, then ledger append. The ledger is
//! only written after the mailer reports success; a failed send leaves the
//! sender unrecorded so a later poll may try again.

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::channels::channel::Mailer;
use crate::channels::email_types::{EmailAttachment, OutgoingEmail};
use crate::pipeline::replies::ReplyDraft;
use crate::store::SenderLedger;

/// What happened to one reply attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Delivered. `ledger_updated` is false if recording the sender failed.
    Sent { ledger_updated: bool },
    /// Sender was already answered; nothing was sent.
    AlreadyProcessed,
    /// Lookup, composition or transmission failed; nothing was recorded.
    Failed(String),
}

impl DispatchOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent { .. })
    }
}

/// Composes and sends replies, one per sender.
pub struct ReplyDispatcher {
    mailer: Arc<dyn Mailer>,
    ledger: Arc<dyn SenderLedger>,
}

impl ReplyDispatcher {
    pub fn new(mailer: Arc<dyn Mailer>, ledger: Arc<dyn SenderLedger>) -> Self {
        Self { mailer, ledger }
    }

    /// Send `draft` to `to`, attaching the file at `attachment` if given.
    ///
    /// Never returns an error; failures are logged and reported in the outcome.
    pub async fn dispatch(
        &self,
        to: &str,
        draft: &ReplyDraft,
        attachment: Option<&Path>,
    ) -> DispatchOutcome {
        match self.ledger.contains(to).await {
            Ok(true) => {
                info!(recipient = %to, "Skipping reply, sender already processed");
                return DispatchOutcome::AlreadyProcessed;
            }
            Ok(false) => {}
            Err(e) => {
                error!(recipient = %to, error = %e, "Ledger lookup failed, not sending");
                return DispatchOutcome::Failed(format!("ledger lookup failed: {e}"));
            }
        }

        let attachment = match attachment {
            Some(path) => match load_attachment(path).await {
                Ok(a) => Some(a),
                Err(e) => {
                    error!(path = %path.display(), error = %e, "Failed to read attachment");
                    return DispatchOutcome::Failed(format!("attachment unreadable: {e}"));
                }
            },
            None => None,
        };

        let email = OutgoingEmail {
            to: to.to_string(),
            subject: draft.subject.clone(),
            body: draft.body.clone(),
            attachment,
        };

        if let Err(e) = self.mailer.send(&email).await {
            error!(recipient = %to, error = %e, "Error sending email");
            return DispatchOutcome::Failed(e.to_string());
        }

        match self.ledger.add(to).await {
            Ok(()) => DispatchOutcome::Sent {
                ledger_updated: true,
            },
            Err(e) => {
                warn!(recipient = %to, error = %e, "Reply sent but sender could not be recorded");
                DispatchOutcome::Sent {
                    ledger_updated: false,
                }
            }
        }
    }
}

async fn load_attachment(path: &Path) -> std::io::Result<EmailAttachment> {
    let content = tokio::fs::read(path).await?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("attachment")
        .to_string();
    Ok(EmailAttachment { filename, content })
}
