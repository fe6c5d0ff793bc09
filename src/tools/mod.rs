//! Tools the conversational graph exposes to the model.

mod retrieval;

use std::sync::Arc;

use serde_json::{json, Value};

use crate::core::errors::ApiError;
use crate::llm::{ToolCall, ToolSpec};
use crate::rag::Retriever;

pub use retrieval::RetrievalTool;

pub const RETRIEVER_TOOL: &str = "insurance_policy_documents";
pub const HUMAN_INPUT_TOOL: &str = "gather_information_tool";

const HUMAN_INPUT_DESCRIPTION: &str = "Use this tool if the user's query cannot be answered from documents or knowledge alone. \
It will INTERRUPT the flow and ask the human for additional details (like missing policy number, contact details, dates, or any information the LLM does not know).";

/// Result of running one tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    /// Text handed back to the model as the tool result.
    Output(String),
    /// The flow must pause until a human answers `query`.
    Interrupt { query: String },
}

impl ToolOutcome {
    /// Payload surfaced to the caller while the flow is paused.
    pub fn interrupt_payload(query: &str) -> Value {
        json!({ "query": query })
    }
}

pub struct Toolbox {
    retrieval: RetrievalTool,
}

impl Toolbox {
    pub fn new(retriever: Arc<dyn Retriever>, k: usize, score_threshold: f32) -> Self {
        Self {
            retrieval: RetrievalTool::new(retriever, k, score_threshold),
        }
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec {
                name: RETRIEVER_TOOL.to_string(),
                description: retrieval::DESCRIPTION.to_string(),
                parameters: query_schema("query to look up in the policy documents"),
            },
            ToolSpec {
                name: HUMAN_INPUT_TOOL.to_string(),
                description: HUMAN_INPUT_DESCRIPTION.to_string(),
                parameters: query_schema("question to ask the human"),
            },
        ]
    }

    pub async fn execute(&self, call: &ToolCall) -> Result<ToolOutcome, ApiError> {
        match call.name.as_str() {
            RETRIEVER_TOOL => {
                let query = required_query(call)?;
                let output = self.retrieval.run(query).await?;
                Ok(ToolOutcome::Output(output))
            }
            HUMAN_INPUT_TOOL => {
                let query = required_query(call)?;
                Ok(ToolOutcome::Interrupt {
                    query: query.to_string(),
                })
            }
            other => Err(ApiError::BadRequest(format!("Unknown tool: {}", other))),
        }
    }
}

fn required_query(call: &ToolCall) -> Result<&str, ApiError> {
    call.str_arg("query")
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("Tool `{}` requires a query", call.name)))
}

fn query_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "query": { "type": "string", "description": description }
        },
        "required": ["query"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::{Chunk, ScoredChunk};
    use crate::test_support::FakeRetriever;

    fn call(name: &str, args: Value) -> ToolCall {
        ToolCall {
            id: "call_1".to_string(),
            name: name.to_string(),
            arguments: args,
        }
    }

    fn toolbox() -> Toolbox {
        let retriever = FakeRetriever::new(vec![
            ScoredChunk {
                chunk: Chunk::new("data/claims.txt", 0, "TAT is 30 days."),
                score: 0.91,
            },
            ScoredChunk {
                chunk: Chunk::new("data/faq.txt", 0, "Premiums are paid yearly."),
                score: 0.65,
            },
        ]);
        Toolbox::new(Arc::new(retriever), 2, 0.7)
    }

    #[test]
    fn advertises_both_tools() {
        let names: Vec<String> = toolbox().specs().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec![RETRIEVER_TOOL, HUMAN_INPUT_TOOL]);
    }

    #[tokio::test]
    async fn retrieval_returns_chunks_above_threshold() {
        let outcome = toolbox()
            .execute(&call(RETRIEVER_TOOL, json!({"query": "TAT"})))
            .await
            .unwrap();
        assert_eq!(outcome, ToolOutcome::Output("TAT is 30 days.".to_string()));
    }

    #[tokio::test]
    async fn human_input_interrupts() {
        let outcome = toolbox()
            .execute(&call(HUMAN_INPUT_TOOL, json!({"query": "What is your policy number?"})))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ToolOutcome::Interrupt {
                query: "What is your policy number?".to_string()
            }
        );
    }

    #[tokio::test]
    async fn unknown_tool_and_missing_query_are_errors() {
        let toolbox = toolbox();
        assert!(toolbox.execute(&call("web_search", json!({"query": "x"}))).await.is_err());
        assert!(toolbox.execute(&call(RETRIEVER_TOOL, json!({}))).await.is_err());
    }
}
