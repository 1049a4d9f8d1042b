//! Bridges rig-core completion models to `TextGenerator`.

use async_trait::async_trait;
use rig::completion::CompletionModel;
use rig::message::AssistantContent;

use crate::error::LlmError;
use crate::llm::provider::TextGenerator;

/// Wraps any rig `CompletionModel`.
pub struct RigAdapter<M> {
    model: M,
    model_name: String,
    max_tokens: u64,
}

impl<M> RigAdapter<M> {
    pub fn new(model: M, model_name: &str, max_tokens: u64) -> Self {
        Self {
            model,
            model_name: model_name.to_string(),
            max_tokens,
        }
    }
}

#[async_trait]
impl<M> TextGenerator for RigAdapter<M>
where
    M: CompletionModel + 'static,
{
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let response = self
            .model
            .completion_request(prompt.to_string())
            .max_tokens(self.max_tokens)
            .temperature(0.0)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed {
                provider: self.model_name.clone(),
                reason: e.to_string(),
            })?;

        let text: String = response
            .choice
            .iter()
            .filter_map(|content| match content {
                AssistantContent::Text(text) => Some(text.text.as_str()),
                _ => None,
            })
            .collect();

        tracing::debug!(model = %self.model_name, chars = text.len(), "Completion received");
        Ok(text)
    }
}
