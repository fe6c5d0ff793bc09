use async_trait::async_trait;

use super::types::{ChatMessage, ChatRequest, ChatResponse, EmbedTask};
use crate::core::errors::ApiError;

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// return the provider name (e.g. "gemini", "openai_compat")
    fn name(&self) -> &str;

    /// chat completion, optionally with tool declarations
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ApiError>;

    /// generate one embedding per input, in input order
    async fn embed(&self, inputs: &[String], task: EmbedTask) -> Result<Vec<Vec<f32>>, ApiError>;

    /// single-prompt completion, the text of the reply verbatim
    async fn complete(&self, prompt: &str) -> Result<String, ApiError> {
        let response = self
            .chat(ChatRequest::new(vec![ChatMessage::user(prompt)]))
            .await?;
        Ok(response.content)
    }
}
