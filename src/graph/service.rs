//! Conversation service behind `/askgraph`.
//!
//! Loads the thread's checkpoint, either appends a new user turn or resumes
//! a paused human-input call, runs the graph and saves the result.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::checkpoint::CheckpointStore;
use super::node::NodeContext;
use super::nodes::{CHATBOT_NODE, TOOLS_NODE};
use super::runtime::{GraphRuntime, RunOutcome};
use super::state::{ConversationState, ConversationStatus};
use crate::core::errors::ApiError;
use crate::llm::{ChatMessage, LlmProvider, ToolCall};
use crate::tools::Toolbox;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyStatus {
    Completed,
    AwaitingInput,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphReply {
    pub status: ReplyStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interrupt: Option<Value>,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphTurn {
    pub response: GraphReply,
    pub thread_id: Uuid,
}

pub struct GraphService {
    runtime: GraphRuntime,
    llm: Arc<dyn LlmProvider>,
    tools: Toolbox,
    checkpoints: Arc<dyn CheckpointStore>,
    temperature: Option<f64>,
}

impl GraphService {
    pub fn new(
        runtime: GraphRuntime,
        llm: Arc<dyn LlmProvider>,
        tools: Toolbox,
        checkpoints: Arc<dyn CheckpointStore>,
        temperature: Option<f64>,
    ) -> Self {
        Self {
            runtime,
            llm,
            tools,
            checkpoints,
            temperature,
        }
    }

    /// One `/askgraph` turn. Without `id` a fresh thread is started.
    pub async fn ask(
        &self,
        query: &str,
        id: Option<Uuid>,
        resume_data: Option<String>,
    ) -> Result<GraphTurn, ApiError> {
        let thread_id = id.unwrap_or_else(Uuid::new_v4);
        let key = thread_id.to_string();
        let existing = self.checkpoints.load(&key).await?;

        let (mut state, start_node) = match resume_data {
            Some(data) => {
                let state = existing.ok_or_else(|| {
                    ApiError::NotFound(format!("Unknown conversation thread: {}", thread_id))
                })?;
                (resume(state, data)?, TOOLS_NODE)
            }
            None => {
                let mut state = existing.unwrap_or_else(|| ConversationState::new(key.clone()));
                if state.is_awaiting_input() {
                    return Err(ApiError::Conflict(format!(
                        "Thread {} is waiting for human input; send resume_data",
                        thread_id
                    )));
                }
                state.status = ConversationStatus::Active;
                state.push(ChatMessage::user(query));
                (state, CHATBOT_NODE)
            }
        };

        let ctx = NodeContext {
            llm: self.llm.as_ref(),
            tools: &self.tools,
            temperature: self.temperature,
        };

        tracing::info!("Running graph for thread {} from `{}`", thread_id, start_node);
        let outcome = self.runtime.run_from(start_node, &mut state, &ctx).await?;
        self.checkpoints.save(&state).await?;

        let response = match outcome {
            RunOutcome::Completed => GraphReply {
                status: ReplyStatus::Completed,
                answer: state.final_answer().map(str::to_string),
                interrupt: None,
                messages: state.messages,
            },
            RunOutcome::Interrupted(payload) => GraphReply {
                status: ReplyStatus::AwaitingInput,
                answer: None,
                interrupt: Some(payload),
                messages: state.messages,
            },
        };

        Ok(GraphTurn {
            response,
            thread_id,
        })
    }
}

/// Answers the paused human-input call with `data`.
fn resume(mut state: ConversationState, data: String) -> Result<ConversationState, ApiError> {
    let ConversationStatus::AwaitingInput { tool_call_id, .. } = &state.status else {
        return Err(ApiError::Conflict(format!(
            "Thread {} is not waiting for input",
            state.thread_id
        )));
    };

    let call: ToolCall = state
        .pending_tool_calls()
        .into_iter()
        .find(|call| &call.id == tool_call_id)
        .ok_or_else(|| {
            ApiError::internal(format!(
                "Pending tool call {} missing from thread {}",
                tool_call_id, state.thread_id
            ))
        })?;

    state.push(ChatMessage::tool(&call, data));
    state.status = ConversationStatus::Active;
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::builder::build_claims_graph;
    use crate::graph::checkpoint::InMemoryCheckpointStore;
    use crate::llm::{ChatResponse, Role};
    use crate::rag::{Chunk, ScoredChunk};
    use crate::test_support::{FakeLlm, FakeRetriever};
    use crate::tools::{HUMAN_INPUT_TOOL, RETRIEVER_TOOL};
    use serde_json::json;

    fn tool_reply(id: &str, name: &str, query: &str) -> ChatResponse {
        ChatResponse {
            content: String::new(),
            tool_calls: vec![ToolCall {
                id: id.to_string(),
                name: name.to_string(),
                arguments: json!({ "query": query }),
            }],
        }
    }

    fn service(replies: Vec<ChatResponse>, max_steps: usize) -> (GraphService, Arc<FakeLlm>) {
        let llm = Arc::new(FakeLlm::with_replies(replies));
        let retriever = FakeRetriever::new(vec![ScoredChunk {
            chunk: Chunk::new("data/claims.txt", 0, "TAT is 30 days."),
            score: 0.88,
        }]);
        let service = GraphService::new(
            build_claims_graph(max_steps).unwrap(),
            llm.clone(),
            Toolbox::new(Arc::new(retriever), 2, 0.7),
            Arc::new(InMemoryCheckpointStore::new()),
            None,
        );
        (service, llm)
    }

    #[tokio::test]
    async fn retrieval_then_answer_completes() {
        let (service, llm) = service(
            vec![
                tool_reply("call_1", RETRIEVER_TOOL, "TAT"),
                ChatResponse::text("Claims are processed within 30 days."),
            ],
            25,
        );

        let turn = service.ask("What is the TAT?", None, None).await.unwrap();

        assert_eq!(turn.response.status, ReplyStatus::Completed);
        assert_eq!(
            turn.response.answer.as_deref(),
            Some("Claims are processed within 30 days.")
        );
        let roles: Vec<Role> = turn.response.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::Tool, Role::Assistant]);
        assert_eq!(turn.response.messages[2].content, "TAT is 30 days.");
        // Second model call saw the tool result.
        assert_eq!(llm.requests()[1].messages.last().unwrap().role, Role::Tool);
    }

    #[tokio::test]
    async fn human_input_suspends_and_resumes_same_thread() {
        let (service, llm) = service(
            vec![
                tool_reply("call_1", HUMAN_INPUT_TOOL, "What is your policy number?"),
                ChatResponse::text("Thanks, policy P-123 is active."),
            ],
            25,
        );

        let first = service.ask("Is my policy active?", None, None).await.unwrap();
        assert_eq!(first.response.status, ReplyStatus::AwaitingInput);
        assert_eq!(
            first.response.interrupt,
            Some(json!({"query": "What is your policy number?"}))
        );
        assert!(first.response.answer.is_none());

        let second = service
            .ask("", Some(first.thread_id), Some("P-123".to_string()))
            .await
            .unwrap();

        assert_eq!(second.thread_id, first.thread_id);
        assert_eq!(second.response.status, ReplyStatus::Completed);
        assert_eq!(
            second.response.answer.as_deref(),
            Some("Thanks, policy P-123 is active.")
        );
        let tool_message = &second.response.messages[2];
        assert_eq!(tool_message.role, Role::Tool);
        assert_eq!(tool_message.content, "P-123");
        assert_eq!(tool_message.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(llm.requests().len(), 2);
    }

    #[tokio::test]
    async fn completed_threads_accept_follow_up_questions() {
        let (service, _llm) = service(
            vec![ChatResponse::text("Hello."), ChatResponse::text("30 days.")],
            25,
        );

        let first = service.ask("hi", None, None).await.unwrap();
        let second = service
            .ask("What is the TAT?", Some(first.thread_id), None)
            .await
            .unwrap();

        assert_eq!(second.response.messages.len(), 4);
        assert_eq!(second.response.answer.as_deref(), Some("30 days."));
    }

    #[tokio::test]
    async fn resume_state_machine_rejects_invalid_transitions() {
        let (service, _llm) = service(
            vec![
                tool_reply("call_1", HUMAN_INPUT_TOOL, "Policy number?"),
                ChatResponse::text("Done."),
            ],
            25,
        );

        let unknown = service
            .ask("", Some(Uuid::new_v4()), Some("data".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(unknown, ApiError::NotFound(_)));

        let paused = service.ask("Is my policy active?", None, None).await.unwrap();
        let conflict = service
            .ask("another question", Some(paused.thread_id), None)
            .await
            .unwrap_err();
        assert!(matches!(conflict, ApiError::Conflict(_)));

        service
            .ask("", Some(paused.thread_id), Some("P-1".to_string()))
            .await
            .unwrap();
        let not_waiting = service
            .ask("", Some(paused.thread_id), Some("P-1".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(not_waiting, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn runaway_tool_loops_hit_the_step_limit() {
        let replies = (0..10)
            .map(|i| tool_reply(&format!("call_{i}"), RETRIEVER_TOOL, "TAT"))
            .collect();
        let (service, _llm) = service(replies, 4);

        let err = service.ask("loop", None, None).await.unwrap_err();

        assert!(matches!(err, ApiError::Internal(msg) if msg.contains("Maximum steps (4) exceeded")));
    }
}
