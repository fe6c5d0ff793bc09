// Tools Node
// Runs the pending tool calls of the last assistant message

use async_trait::async_trait;

use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::state::{ConversationState, ConversationStatus};
use crate::llm::ChatMessage;
use crate::tools::ToolOutcome;

pub const TOOLS_NODE: &str = "tools";

pub struct ToolsNode;

impl ToolsNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ToolsNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for ToolsNode {
    fn id(&self) -> &'static str {
        TOOLS_NODE
    }

    async fn execute(
        &self,
        state: &mut ConversationState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError> {
        for call in state.pending_tool_calls() {
            tracing::debug!("Executing tool `{}` ({})", call.name, call.id);

            match ctx.tools.execute(&call).await {
                Ok(ToolOutcome::Output(output)) => {
                    state.push(ChatMessage::tool(&call, output));
                }
                Ok(ToolOutcome::Interrupt { query }) => {
                    tracing::info!(
                        "Thread {} awaiting human input for call {}",
                        state.thread_id,
                        call.id
                    );
                    let payload = ToolOutcome::interrupt_payload(&query);
                    state.status = ConversationStatus::AwaitingInput {
                        tool_call_id: call.id.clone(),
                        query,
                    };
                    state.touch();
                    return Ok(NodeOutput::Interrupt(payload));
                }
                Err(err) => {
                    // The model sees the failure and can recover.
                    tracing::warn!("Tool `{}` failed: {}", call.name, err);
                    state.push(ChatMessage::tool(
                        &call,
                        format!("Error: tool `{}` failed: {}", call.name, err),
                    ));
                }
            }
        }

        Ok(NodeOutput::Continue)
    }
}
