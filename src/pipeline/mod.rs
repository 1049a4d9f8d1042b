//! Request-processing pipeline.
//!
//! Every fetched message flows through:
//! 1. `message::decode_message()` — header decoding, sender, plain-text body
//! 2. `RequestRegistry::classify()` — subject → request type
//! 3. `FieldExtractor::extract()` — one LLM call per required field
//! 4. `validator::missing_fields()` — completeness check
//! 5. `AttestationGenerator` + `ReplyDispatcher` — document and reply
//!
//! **One reply per sender.** The ledger gates every send.

pub mod dispatcher;
pub mod extractor;
pub mod header;
pub mod message;
pub mod processor;
pub mod registry;
pub mod replies;
pub mod validator;

pub use dispatcher::{DispatchOutcome, ReplyDispatcher};
pub use extractor::{Absence, ExtractedFields, FieldExtractor, FieldValue};
pub use header::{DecodedHeader, decode_header};
pub use message::{BodyText, decode_message};
pub use processor::{MessagePipeline, PipelineDeps, PipelineOutcome};
pub use registry::{RequestRegistry, RequestType};
pub use replies::{ReplyDraft, ReplyTemplates};
