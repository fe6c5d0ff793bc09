// Chatbot Node
// Model turn with the toolbox bound

use async_trait::async_trait;

use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::state::{ConversationState, ConversationStatus};
use crate::llm::{ChatMessage, ChatRequest};

pub const CHATBOT_NODE: &str = "chatbot";

/// Branch condition taken when the reply requests tool calls.
pub const TOOLS_CONDITION: &str = "tools";

const SYSTEM_PROMPT: &str = "You are a helpful assistant. If you don't have enough info \
to answer a question completely, ALWAYS call the gather_information_tool \
to request missing details from the human.";

pub struct ChatbotNode;

impl ChatbotNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ChatbotNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for ChatbotNode {
    fn id(&self) -> &'static str {
        CHATBOT_NODE
    }

    async fn execute(
        &self,
        state: &mut ConversationState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError> {
        let mut messages = Vec::with_capacity(state.messages.len() + 1);
        messages.push(ChatMessage::system(SYSTEM_PROMPT));
        messages.extend(state.messages.iter().cloned());

        let request = ChatRequest::new(messages)
            .with_tools(ctx.tools.specs())
            .with_temperature(ctx.temperature);

        let response = ctx
            .llm
            .chat(request)
            .await
            .map_err(|e| GraphError::new(self.id(), e.to_string()))?;

        let has_tool_calls = response.has_tool_calls();
        tracing::debug!(
            "Chatbot replied with {} tool calls",
            response.tool_calls.len()
        );
        state.push(ChatMessage::assistant(response.content, response.tool_calls));

        if has_tool_calls {
            state.status = ConversationStatus::Active;
            Ok(NodeOutput::Branch(TOOLS_CONDITION.to_string()))
        } else {
            state.status = ConversationStatus::Completed;
            Ok(NodeOutput::Final)
        }
    }
}
