//! Text-generation provider trait.

use async_trait::async_trait;

use crate::error::LlmError;

/// A prompt-in, text-out completion service.
///
/// Every call is independent; implementations may fail per call and callers
/// decide how to recover.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Model identifier, for logging.
    fn model_name(&self) -> &str;

    /// Return a best-effort completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}
