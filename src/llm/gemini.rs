//! Google Gemini REST provider (`generateContent` / `batchEmbedContents`).

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::provider::LlmProvider;
use super::types::{ChatMessage, ChatRequest, ChatResponse, EmbedTask, Role, ToolCall};
use crate::core::errors::ApiError;

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Clone)]
pub struct GeminiProvider {
    base_url: String,
    api_key: String,
    chat_model: String,
    embedding_model: String,
    client: Client,
}

impl GeminiProvider {
    pub fn new(
        base_url: String,
        api_key: String,
        chat_model: String,
        embedding_model: String,
        client: Client,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            chat_model: strip_model_prefix(&chat_model).to_string(),
            embedding_model: strip_model_prefix(&embedding_model).to_string(),
            client,
        }
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/v1beta/models/{}:{}", self.base_url, model, method)
    }

    async fn post(&self, url: &str, body: &Value) -> Result<Value, ApiError> {
        let res = self
            .client
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "Gemini request failed ({}): {}",
                status, text
            )));
        }

        res.json().await.map_err(ApiError::upstream)
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ApiError> {
        let body = build_generate_body(&request);
        let url = self.model_url(&self.chat_model, "generateContent");
        let payload = self.post(&url, &body).await?;
        parse_generate_response(&payload)
    }

    async fn embed(&self, inputs: &[String], task: EmbedTask) -> Result<Vec<Vec<f32>>, ApiError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let body = build_embed_body(&self.embedding_model, inputs, task);
        let url = self.model_url(&self.embedding_model, "batchEmbedContents");
        let payload = self.post(&url, &body).await?;

        let embeddings = parse_embeddings(&payload);
        if embeddings.len() != inputs.len() {
            return Err(ApiError::Upstream(format!(
                "Gemini returned {} embeddings for {} inputs",
                embeddings.len(),
                inputs.len()
            )));
        }
        Ok(embeddings)
    }
}

fn strip_model_prefix(model: &str) -> &str {
    model.strip_prefix("models/").unwrap_or(model)
}

fn build_embed_body(model: &str, inputs: &[String], task: EmbedTask) -> Value {
    let model_path = format!("models/{}", model);
    let requests: Vec<Value> = inputs
        .iter()
        .map(|text| {
            json!({
                "model": model_path,
                "content": { "parts": [{ "text": text }] },
                "taskType": task.as_gemini_str(),
            })
        })
        .collect();
    json!({ "requests": requests })
}

/// Maps the chat transcript onto Gemini `contents`. System messages become
/// `systemInstruction`; consecutive tool results share one turn.
pub(crate) fn build_generate_body(request: &ChatRequest) -> Value {
    let mut system_parts: Vec<Value> = Vec::new();
    let mut contents: Vec<Value> = Vec::new();
    let mut pending_responses: Vec<Value> = Vec::new();

    for message in &request.messages {
        if message.role != Role::Tool && !pending_responses.is_empty() {
            contents.push(json!({ "role": "user", "parts": std::mem::take(&mut pending_responses) }));
        }

        match message.role {
            Role::System => system_parts.push(json!({ "text": message.content })),
            Role::User => contents.push(json!({
                "role": "user",
                "parts": [{ "text": message.content }],
            })),
            // Gemini rejects model turns without parts.
            Role::Assistant if message.content.is_empty() && message.tool_calls.is_empty() => {}
            Role::Assistant => contents.push(assistant_content(message)),
            Role::Tool => pending_responses.push(json!({
                "functionResponse": {
                    "name": message.name.clone().unwrap_or_default(),
                    "response": { "content": message.content },
                }
            })),
        }
    }
    if !pending_responses.is_empty() {
        contents.push(json!({ "role": "user", "parts": pending_responses }));
    }

    let mut body = Map::new();
    body.insert("contents".to_string(), Value::Array(contents));
    if !system_parts.is_empty() {
        body.insert(
            "systemInstruction".to_string(),
            json!({ "parts": system_parts }),
        );
    }
    if !request.tools.is_empty() {
        let declarations: Vec<Value> = request
            .tools
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.parameters,
                })
            })
            .collect();
        body.insert(
            "tools".to_string(),
            json!([{ "functionDeclarations": declarations }]),
        );
    }

    if let Some(t) = request.temperature {
        body.insert("generationConfig".to_string(), json!({ "temperature": t }));
    }

    Value::Object(body)
}

fn assistant_content(message: &ChatMessage) -> Value {
    let mut parts = Vec::new();
    if !message.content.is_empty() {
        parts.push(json!({ "text": message.content }));
    }
    for call in &message.tool_calls {
        parts.push(json!({
            "functionCall": { "name": call.name, "args": call.arguments }
        }));
    }
    json!({ "role": "model", "parts": parts })
}

pub(crate) fn parse_generate_response(payload: &Value) -> Result<ChatResponse, ApiError> {
    let Some(candidate) = payload
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
    else {
        let reason = payload["promptFeedback"]["blockReason"]
            .as_str()
            .unwrap_or("no candidates returned");
        return Err(ApiError::Upstream(format!("Gemini returned no answer: {}", reason)));
    };

    let parts = candidate["content"]["parts"]
        .as_array()
        .cloned()
        .unwrap_or_default();
    if parts.is_empty() {
        let reason = candidate["finishReason"].as_str().unwrap_or("empty content");
        return Err(ApiError::Upstream(format!("Gemini returned no answer: {}", reason)));
    }

    let mut response = ChatResponse::default();

    for part in parts {
        if let Some(text) = part.get("text").and_then(|t| t.as_str()) {
            response.content.push_str(text);
        }
        if let Some(call) = part.get("functionCall") {
            let Some(name) = call.get("name").and_then(|n| n.as_str()) else {
                continue;
            };
            let id = call
                .get("id")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| format!("call_{}", Uuid::new_v4().simple()));
            response.tool_calls.push(ToolCall {
                id,
                name: name.to_string(),
                arguments: call.get("args").cloned().unwrap_or_else(|| json!({})),
            });
        }
    }

    Ok(response)
}

fn parse_embeddings(payload: &Value) -> Vec<Vec<f32>> {
    payload["embeddings"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(|item| {
                    item["values"]
                        .as_array()
                        .map(|vals| {
                            vals.iter()
                                .filter_map(|v| v.as_f64().map(|f| f as f32))
                                .collect()
                        })
                        .unwrap_or_default()
                })
                .collect()
        })
        .unwrap_or_default()
}
