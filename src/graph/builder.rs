// Graph Builder
// chatbot -> (tools -> chatbot)* -> end

use super::node::GraphError;
use super::nodes::{ChatbotNode, ToolsNode, CHATBOT_NODE, TOOLS_CONDITION, TOOLS_NODE};
use super::runtime::{GraphBuilder, GraphRuntime};

/// Build the claims assistant graph
pub fn build_claims_graph(max_steps: usize) -> Result<GraphRuntime, GraphError> {
    GraphBuilder::new()
        .entry(CHATBOT_NODE)
        .max_steps(max_steps)
        .node(Box::new(ChatbotNode::new()))
        .node(Box::new(ToolsNode::new()))
        .conditional_edge(CHATBOT_NODE, TOOLS_NODE, TOOLS_CONDITION)
        .edge(TOOLS_NODE, CHATBOT_NODE)
        .build()
}
