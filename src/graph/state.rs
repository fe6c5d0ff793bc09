// Conversation state
// Message history plus the suspend/resume status of one thread

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::llm::{ChatMessage, Role, ToolCall};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConversationStatus {
    #[default]
    Active,
    /// Paused on a human-input tool call until the caller resumes.
    AwaitingInput { tool_call_id: String, query: String },
    Completed,
}

impl ConversationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationStatus::Active => "active",
            ConversationStatus::AwaitingInput { .. } => "awaiting_input",
            ConversationStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub thread_id: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub status: ConversationStatus,
    pub updated_at: DateTime<Utc>,
}

impl ConversationState {
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            messages: Vec::new(),
            status: ConversationStatus::Active,
            updated_at: Utc::now(),
        }
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn is_awaiting_input(&self) -> bool {
        matches!(self.status, ConversationStatus::AwaitingInput { .. })
    }

    /// Tool calls of the most recent assistant message that have no tool
    /// result after it yet, in call order.
    pub fn pending_tool_calls(&self) -> Vec<ToolCall> {
        let Some(position) = self
            .messages
            .iter()
            .rposition(|m| m.role == Role::Assistant)
        else {
            return Vec::new();
        };

        let answered: Vec<&str> = self.messages[position + 1..]
            .iter()
            .filter(|m| m.role == Role::Tool)
            .filter_map(|m| m.tool_call_id.as_deref())
            .collect();

        self.messages[position]
            .tool_calls
            .iter()
            .filter(|call| !answered.contains(&call.id.as_str()))
            .cloned()
            .collect()
    }

    /// Text of the final assistant reply, if the last message is one.
    pub fn final_answer(&self) -> Option<&str> {
        self.messages
            .last()
            .filter(|m| m.role == Role::Assistant && m.tool_calls.is_empty())
            .map(|m| m.content.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(id: &str) -> ToolCall {
        ToolCall {
            id: id.to_string(),
            name: "insurance_policy_documents".to_string(),
            arguments: json!({"query": "TAT"}),
        }
    }

    #[test]
    fn pending_calls_skip_answered_ones() {
        let mut state = ConversationState::new("t1");
        state.push(ChatMessage::user("What is the TAT?"));
        state.push(ChatMessage::assistant("", vec![call("a"), call("b")]));
        state.push(ChatMessage::tool(&call("a"), "30 days"));

        let pending: Vec<String> = state.pending_tool_calls().into_iter().map(|c| c.id).collect();
        assert_eq!(pending, vec!["b"]);
    }

    #[test]
    fn final_answer_requires_plain_assistant_reply() {
        let mut state = ConversationState::new("t1");
        state.push(ChatMessage::user("hi"));
        assert_eq!(state.final_answer(), None);

        state.push(ChatMessage::assistant("", vec![call("a")]));
        assert_eq!(state.final_answer(), None);

        state.push(ChatMessage::tool(&call("a"), "30 days"));
        state.push(ChatMessage::assistant("It takes 30 days.", Vec::new()));
        assert_eq!(state.final_answer(), Some("It takes 30 days."));
        assert!(state.pending_tool_calls().is_empty());
    }

    #[test]
    fn status_round_trips_through_json() {
        let mut state = ConversationState::new("t1");
        state.status = ConversationStatus::AwaitingInput {
            tool_call_id: "call_9".to_string(),
            query: "Policy number?".to_string(),
        };

        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["status"]["state"], "awaiting_input");

        let restored: ConversationState = serde_json::from_value(value).unwrap();
        assert_eq!(restored, state);
    }
}
