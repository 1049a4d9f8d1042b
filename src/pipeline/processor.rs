//! Per-message request pipeline.
//!
//! classify → (unsupported notice) | extract → validate →
//! (missing-fields notice) | (generate document → confirmation with attachment)

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::channels::email_types::IncomingMessage;
use crate::document::AttestationGenerator;
use crate::pipeline::dispatcher::{DispatchOutcome, ReplyDispatcher};
use crate::pipeline::extractor::FieldExtractor;
use crate::pipeline::registry::RequestRegistry;
use crate::pipeline::replies::ReplyTemplates;
use crate::pipeline::validator::missing_fields;
use crate::store::SenderLedger;

/// How one message was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Sender already answered; no extraction, no reply.
    AlreadyReplied,
    /// Subject matched no request type.
    Unsupported { dispatch: DispatchOutcome },
    /// Some required fields are missing; the sender was asked for them.
    MissingFields {
        request_type: String,
        missing: Vec<String>,
        dispatch: DispatchOutcome,
    },
    /// Document generated and sent.
    Completed {
        request_type: String,
        document: PathBuf,
        dispatch: DispatchOutcome,
    },
    /// All fields present but the document could not be written.
    DocumentFailed { request_type: String, reason: String },
}

impl PipelineOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::AlreadyReplied => "already_replied",
            Self::Unsupported { .. } => "unsupported",
            Self::MissingFields { .. } => "missing_fields",
            Self::Completed { .. } => "completed",
            Self::DocumentFailed { .. } => "document_failed",
        }
    }
}

/// Collaborators for the pipeline.
pub struct PipelineDeps {
    pub registry: RequestRegistry,
    pub extractor: FieldExtractor,
    pub generator: AttestationGenerator,
    pub dispatcher: ReplyDispatcher,
    pub ledger: Arc<dyn SenderLedger>,
    pub replies: ReplyTemplates,
}

/// Handles one decoded request at a time.
pub struct MessagePipeline {
    deps: PipelineDeps,
}

impl MessagePipeline {
    pub fn new(deps: PipelineDeps) -> Self {
        Self { deps }
    }

    pub fn registry(&self) -> &RequestRegistry {
        &self.deps.registry
    }

    /// Process one message to completion. Never fails; the outcome says why.
    pub async fn process(&self, msg: &IncomingMessage) -> PipelineOutcome {
        let deps = &self.deps;
        info!(
            sender = %msg.sender,
            subject = %msg.subject,
            body_preview = %msg.body.chars().take(100).collect::<String>(),
            "Processing email"
        );

        match deps.ledger.contains(&msg.sender).await {
            Ok(true) => {
                debug!(sender = %msg.sender, "Sender already processed, skipping");
                return PipelineOutcome::AlreadyReplied;
            }
            Ok(false) => {}
            // The dispatcher repeats the lookup and refuses to send if it still fails.
            Err(e) => warn!(sender = %msg.sender, error = %e, "Ledger lookup failed"),
        }

        let Some(request) = deps.registry.classify(&msg.subject) else {
            info!(sender = %msg.sender, "Unsupported request type");
            let draft = deps.replies.unsupported(msg, &deps.registry);
            let dispatch = deps.dispatcher.dispatch(&msg.sender, &draft, None).await;
            return PipelineOutcome::Unsupported { dispatch };
        };

        let extracted = deps
            .extractor
            .extract(&msg.body, &request.required_fields)
            .await;
        let missing = missing_fields(&extracted, &request.required_fields);

        if !missing.is_empty() {
            info!(
                sender = %msg.sender,
                request_type = %request.name,
                missing = %missing.join(", "),
                "Request incomplete"
            );
            let draft = deps.replies.missing_fields(msg, request, &missing);
            let dispatch = deps.dispatcher.dispatch(&msg.sender, &draft, None).await;
            return PipelineOutcome::MissingFields {
                request_type: request.name.clone(),
                missing,
                dispatch,
            };
        }

        let document = match deps.generator.generate(&request.name, &extracted).await {
            Ok(path) => path,
            Err(e) => {
                error!(sender = %msg.sender, request_type = %request.name, error = %e, "Document generation failed");
                return PipelineOutcome::DocumentFailed {
                    request_type: request.name.clone(),
                    reason: e.to_string(),
                };
            }
        };

        let draft = deps.replies.confirmation(msg, request);
        let dispatch = deps
            .dispatcher
            .dispatch(&msg.sender, &draft, Some(&document))
            .await;
        PipelineOutcome::Completed {
            request_type: request.name.clone(),
            document,
            dispatch,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::channels::channel::Mailer;
    use crate::channels::email_types::OutgoingEmail;
    use crate::document::{DocumentRenderer, PageLayout};
    use crate::error::{ChannelError, DocumentError, LlmError};
    use crate::llm::TextGenerator;
    use crate::store::MemoryLedger;

    /// Answers every prompt with the same text and counts calls.
    struct EchoLlm {
        answer: &'static str,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TextGenerator for EchoLlm {
        fn model_name(&self) -> &str {
            "echo"
        }

        async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.answer.to_string())
        }
    }

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<OutgoingEmail>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, email: &OutgoingEmail) -> Result<(), ChannelError> {
            self.sent.lock().unwrap().push(email.clone());
            Ok(())
        }
    }

    struct BrokenRenderer;

    impl DocumentRenderer for BrokenRenderer {
        fn extension(&self) -> &str {
            "pdf"
        }

        fn render(&self, _page: &PageLayout, _path: &Path) -> Result<(), DocumentError> {
            Err(DocumentError::Render("font missing".into()))
        }
    }

    struct Harness {
        pipeline: MessagePipeline,
        llm: Arc<EchoLlm>,
        mailer: Arc<RecordingMailer>,
        _dir: tempfile::TempDir,
    }

    fn harness(answer: &'static str, ledger: MemoryLedger) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let llm = Arc::new(EchoLlm {
            answer,
            calls: AtomicUsize::new(0),
        });
        let mailer = Arc::new(RecordingMailer::default());
        let ledger: Arc<dyn SenderLedger> = Arc::new(ledger);
        let pipeline = MessagePipeline::new(PipelineDeps {
            registry: RequestRegistry::builtin(),
            extractor: FieldExtractor::new(llm.clone()),
            generator: AttestationGenerator::new(dir.path(), "FSTG MARRAKECH", Arc::new(BrokenRenderer)),
            dispatcher: ReplyDispatcher::new(mailer.clone(), ledger.clone()),
            ledger,
            replies: ReplyTemplates::new("The Yam Team"),
        });
        Harness {
            pipeline,
            llm,
            mailer,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn known_sender_costs_no_llm_calls() {
        let h = harness("x", MemoryLedger::with_entries(["amina@example.com"]));
        let msg = IncomingMessage::new("amina@example.com", "attestation de stage", "hi");

        assert_eq!(h.pipeline.process(&msg).await, PipelineOutcome::AlreadyReplied);
        assert_eq!(h.llm.calls.load(Ordering::SeqCst), 0);
        assert!(h.mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn document_failure_sends_nothing() {
        let h = harness("some value", MemoryLedger::new());
        let msg = IncomingMessage::new("amina@example.com", "Attestation de Stage", "all of it");

        let outcome = h.pipeline.process(&msg).await;

        match outcome {
            PipelineOutcome::DocumentFailed { request_type, reason } => {
                assert_eq!(request_type, "attestation de stage");
                assert!(reason.contains("font missing"));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(h.llm.calls.load(Ordering::SeqCst), 5);
        assert!(h.mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_answers_ask_for_every_field() {
        let h = harness("   ", MemoryLedger::new());
        let msg = IncomingMessage::new("amina@example.com", "attestation de scolarite", "");

        let outcome = h.pipeline.process(&msg).await;

        let PipelineOutcome::MissingFields { missing, dispatch, .. } = outcome else {
            panic!("expected missing fields");
        };
        assert_eq!(missing.len(), 5);
        assert!(dispatch.is_sent());
        assert_eq!(h.pipeline.process(&msg).await, PipelineOutcome::AlreadyReplied);
    }
}
