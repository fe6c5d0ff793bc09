use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use super::gemini::GeminiProvider;
use super::openai_compat::OpenAiCompatProvider;
use super::provider::LlmProvider;
use crate::core::config::defaults::{GEMINI_BASE_URL, OPENAI_COMPAT_BASE_URL};
use crate::core::config::{LlmConfig, ProviderKind};
use crate::core::errors::ApiError;

/// Builds the process-wide provider selected by `llm.provider`.
pub fn build_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, ApiError> {
    let client = Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| ApiError::internal(format!("Failed to create HTTP client: {}", e)))?;

    let provider: Arc<dyn LlmProvider> = match config.provider {
        ProviderKind::Gemini => {
            let api_key = config
                .api_key
                .clone()
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| {
                    ApiError::BadRequest(
                        "GEMINI_API_KEY is not set (llm.api_key)".to_string(),
                    )
                })?;
            Arc::new(GeminiProvider::new(
                config
                    .base_url
                    .clone()
                    .unwrap_or_else(|| GEMINI_BASE_URL.to_string()),
                api_key,
                config.chat_model.clone(),
                config.embedding_model.clone(),
                client,
            ))
        }
        ProviderKind::OpenaiCompat => Arc::new(OpenAiCompatProvider::new(
            config
                .base_url
                .clone()
                .unwrap_or_else(|| OPENAI_COMPAT_BASE_URL.to_string()),
            config.api_key.clone(),
            config.chat_model.clone(),
            config.embedding_model.clone(),
            client,
        )),
    };

    tracing::info!(
        provider = provider.name(),
        chat_model = %config.chat_model,
        embedding_model = %config.embedding_model,
        "LLM provider configured"
    );
    Ok(provider)
}
