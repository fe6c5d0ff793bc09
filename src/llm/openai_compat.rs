use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use uuid::Uuid;

use super::provider::LlmProvider;
use super::types::{ChatMessage, ChatRequest, ChatResponse, EmbedTask, Role, ToolCall};
use crate::core::errors::ApiError;

/// Any server speaking the OpenAI `/v1/chat/completions` dialect
/// (LM Studio, Ollama, vLLM, hosted gateways).
#[derive(Clone)]
pub struct OpenAiCompatProvider {
    base_url: String,
    api_key: Option<String>,
    chat_model: String,
    embedding_model: String,
    client: Client,
}

impl OpenAiCompatProvider {
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        chat_model: String,
        embedding_model: String,
        client: Client,
    ) -> Self {
        Self {
            base_url: normalize_base_url(&base_url),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            chat_model,
            embedding_model,
            client,
        }
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        let url = format!("{}/v1/{}", self.base_url, path);
        let res = self
            .authorize(self.client.post(&url))
            .json(body)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "{} request failed ({}): {}",
                path, status, text
            )));
        }

        res.json().await.map_err(ApiError::upstream)
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        "openai_compat"
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ApiError> {
        let body = build_chat_body(&self.chat_model, &request);
        let payload = self.post("chat/completions", &body).await?;
        parse_chat_response(&payload)
    }

    /// The embeddings endpoint has no task parameter; queries and documents
    /// share one space.
    async fn embed(&self, inputs: &[String], _task: EmbedTask) -> Result<Vec<Vec<f32>>, ApiError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let body = json!({
            "model": self.embedding_model,
            "input": inputs,
        });
        let payload = self.post("embeddings", &body).await?;

        let mut indexed: Vec<(usize, Vec<f32>)> = Vec::new();
        if let Some(data) = payload["data"].as_array() {
            for (position, item) in data.iter().enumerate() {
                let index = item["index"].as_u64().map(|i| i as usize).unwrap_or(position);
                if let Some(vals) = item["embedding"].as_array() {
                    let vec: Vec<f32> = vals
                        .iter()
                        .filter_map(|v| v.as_f64().map(|f| f as f32))
                        .collect();
                    indexed.push((index, vec));
                }
            }
        }
        indexed.sort_by_key(|(index, _)| *index);

        if indexed.len() != inputs.len() {
            return Err(ApiError::Upstream(format!(
                "embeddings endpoint returned {} vectors for {} inputs",
                indexed.len(),
                inputs.len()
            )));
        }
        Ok(indexed.into_iter().map(|(_, vec)| vec).collect())
    }
}

fn normalize_base_url(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    base.strip_suffix("/v1").unwrap_or(base).to_string()
}

fn message_to_json(message: &ChatMessage) -> Value {
    match message.role {
        Role::Assistant if !message.tool_calls.is_empty() => {
            let calls: Vec<Value> = message
                .tool_calls
                .iter()
                .map(|call| {
                    json!({
                        "id": call.id,
                        "type": "function",
                        "function": {
                            "name": call.name,
                            "arguments": call.arguments.to_string(),
                        }
                    })
                })
                .collect();
            json!({
                "role": "assistant",
                "content": message.content,
                "tool_calls": calls,
            })
        }
        Role::Tool => json!({
            "role": "tool",
            "tool_call_id": message.tool_call_id,
            "content": message.content,
        }),
        role => json!({
            "role": role.as_str(),
            "content": message.content,
        }),
    }
}

pub(crate) fn build_chat_body(model: &str, request: &ChatRequest) -> Value {
    let messages: Vec<Value> = request.messages.iter().map(message_to_json).collect();
    let mut body = json!({
        "model": model,
        "messages": messages,
        "stream": false,
    });

    if let Some(obj) = body.as_object_mut() {
        if let Some(t) = request.temperature { obj.insert("temperature".to_string(), json!(t)); }
        if !request.tools.is_empty() {
            let tools: Vec<Value> = request
                .tools
                .iter()
                .map(|tool| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": tool.name,
                            "description": tool.description,
                            "parameters": tool.parameters,
                        }
                    })
                })
                .collect();
            obj.insert("tools".to_string(), Value::Array(tools));
        }
    }

    body
}

pub(crate) fn parse_chat_response(payload: &Value) -> Result<ChatResponse, ApiError> {
    let message = &payload["choices"][0]["message"];
    if message.is_null() {
        return Err(ApiError::Upstream(
            "chat completion returned no choices".to_string(),
        ));
    }

    let content = message["content"].as_str().unwrap_or_default().to_string();
    let tool_calls = message["tool_calls"]
        .as_array()
        .map(|calls| {
            calls
                .iter()
                .filter_map(|call| {
                    let name = call["function"]["name"].as_str()?;
                    let raw_args = &call["function"]["arguments"];
                    let arguments = match raw_args.as_str() {
                        Some(text) => serde_json::from_str(text)
                            .unwrap_or_else(|_| Value::String(text.to_string())),
                        None => raw_args.clone(),
                    };
                    let id = call["id"]
                        .as_str()
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("call_{}", Uuid::new_v4().simple()));
                    Some(ToolCall {
                        id,
                        name: name.to_string(),
                        arguments,
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(ChatResponse {
        content,
        tool_calls,
    })
}
