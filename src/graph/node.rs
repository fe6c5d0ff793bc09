// Node trait and types
// Base abstraction for graph nodes

use async_trait::async_trait;
use serde_json::Value;

use crate::core::errors::ApiError;
use crate::llm::LlmProvider;
use crate::tools::Toolbox;

use super::state::ConversationState;

/// Context passed to nodes during execution
pub struct NodeContext<'a> {
    /// Chat model bound to the toolbox
    pub llm: &'a dyn LlmProvider,
    pub tools: &'a Toolbox,
    pub temperature: Option<f64>,
}

/// Output from a node execution
#[derive(Debug, Clone, PartialEq)]
pub enum NodeOutput {
    /// Follow the default edge
    Continue,
    /// Branch to one of the specified nodes based on condition
    Branch(String),
    /// Graph execution complete
    Final,
    /// Pause the run; the payload is surfaced to the caller
    Interrupt(Value),
}

/// Graph execution error
///
/// Includes an optional `execution_trace` to record the sequence of node IDs
/// visited before the error occurred.
#[derive(Debug, Clone)]
pub struct GraphError {
    pub node_id: String,
    pub message: String,
    /// Ordered list of node IDs executed before this error, most-recent last.
    pub execution_trace: Vec<String>,
}

impl GraphError {
    pub fn new(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            message: message.into(),
            execution_trace: Vec::new(),
        }
    }

    pub fn with_trace(mut self, trace: Vec<String>) -> Self {
        self.execution_trace = trace;
        self
    }
}

impl From<GraphError> for ApiError {
    fn from(err: GraphError) -> Self {
        ApiError::internal(err.to_string())
    }
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.execution_trace.is_empty() {
            write!(f, "Graph error in {}: {}", self.node_id, self.message)
        } else {
            write!(
                f,
                "Graph error in {} (trace: {}): {}",
                self.node_id,
                self.execution_trace.join(" -> "),
                self.message
            )
        }
    }
}

impl std::error::Error for GraphError {}

/// Node trait - all graph nodes implement this
#[async_trait]
pub trait Node: Send + Sync {
    /// Unique identifier for this node
    fn id(&self) -> &'static str;

    async fn execute(
        &self,
        state: &mut ConversationState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError>;
}
