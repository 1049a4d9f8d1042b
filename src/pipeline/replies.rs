//! Reply wording.

use crate::channels::email_types::IncomingMessage;
use crate::pipeline::registry::{RequestRegistry, RequestType};

/// Subject and body of a reply, before addressing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyDraft {
    pub subject: String,
    pub body: String,
}

/// Reply templates signed with a fixed team name.
#[derive(Debug, Clone)]
pub struct ReplyTemplates {
    signature: String,
}

impl ReplyTemplates {
    pub fn new(signature: impl Into<String>) -> Self {
        Self {
            signature: signature.into(),
        }
    }

    /// Subject matched no registered request type.
    pub fn unsupported(&self, msg: &IncomingMessage, registry: &RequestRegistry) -> ReplyDraft {
        let types: String = registry.names().map(|n| format!("- {n}\n")).collect();
        ReplyDraft {
            subject: "Re: Your Request".to_string(),
            body: format!(
                "Dear {name},\n\n\
                 Thank you for contacting us.\n\n\
                 Please note that we can only process requests for:\n\
                 {types}\n\
                 Submit a new email with one of these subjects and include the required information.\n\n\
                 Sincerely,\n{signature}",
                name = msg.greeting_name(),
                signature = self.signature,
            ),
        }
    }

    /// Some required fields could not be extracted.
    pub fn missing_fields(
        &self,
        msg: &IncomingMessage,
        request: &RequestType,
        missing: &[String],
    ) -> ReplyDraft {
        ReplyDraft {
            subject: format!("Re: Your Request - {}", request.name),
            body: format!(
                "Dear {name},\n\n\
                 Thank you for your request for an {kind}.\n\n\
                 To proceed, please provide the following information:\n\
                 {missing}\n\n\
                 Once we have this information, we will process your request.\n\n\
                 Sincerely,\n{signature}",
                name = msg.greeting_name(),
                kind = request.name,
                missing = missing.join(", "),
                signature = self.signature,
            ),
        }
    }

    /// The attestation was generated and is attached.
    pub fn confirmation(&self, msg: &IncomingMessage, request: &RequestType) -> ReplyDraft {
        ReplyDraft {
            subject: format!("Re: {}", request.name),
            body: format!(
                "Dear {name},\n\n\
                 Thank you for your request for an {kind}. Please find your attestation attached.\n\n\
                 Sincerely,\n{signature}",
                name = msg.greeting_name(),
                kind = request.name,
                signature = self.signature,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg() -> IncomingMessage {
        IncomingMessage::new("amina@example.com", "x", "y").with_sender_name("Amina Benali")
    }

    #[test]
    fn unsupported_lists_every_type() {
        let templates = ReplyTemplates::new("The Yam Team");
        let draft = templates.unsupported(&msg(), &RequestRegistry::builtin());
        assert_eq!(draft.subject, "Re: Your Request");
        assert!(draft.body.starts_with("Dear Amina,"));
        assert!(draft.body.contains("- attestation de scolarite\n- attestation de stage\n"));
        assert!(draft.body.ends_with("Sincerely,\nThe Yam Team"));
    }

    #[test]
    fn missing_fields_joined_in_order() {
        let templates = ReplyTemplates::new("Office");
        let registry = RequestRegistry::builtin();
        let request = registry.classify("attestation de stage").unwrap();
        let missing = vec!["Prenom".to_string(), "Numero de telephone".to_string()];
        let draft = templates.missing_fields(&msg(), request, &missing);
        assert_eq!(draft.subject, "Re: Your Request - attestation de stage");
        assert!(draft.body.contains("information:\nPrenom, Numero de telephone\n"));
    }

    #[test]
    fn confirmation_mentions_attachment() {
        let templates = ReplyTemplates::new("Office");
        let registry = RequestRegistry::builtin();
        let request = registry.classify("attestation de scolarite").unwrap();
        let draft = templates.confirmation(&msg(), request);
        assert_eq!(draft.subject, "Re: attestation de scolarite");
        assert!(draft.body.contains("Please find your attestation attached."));
    }
}
