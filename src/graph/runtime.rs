// Graph Runtime - petgraph based
// StateGraph execution engine with interrupt support

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde_json::Value;
use std::collections::HashMap;

use super::node::{GraphError, Node, NodeContext, NodeOutput};
use super::state::ConversationState;

/// Edge condition for graph routing
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EdgeCondition {
    /// Always follow this edge (default edge)
    Always,
    /// Follow this edge when the node returns this condition
    OnCondition(String),
}

impl EdgeCondition {
    pub fn on(condition: impl Into<String>) -> Self {
        Self::OnCondition(condition.into())
    }

    pub fn matches(&self, condition: Option<&str>) -> bool {
        match (self, condition) {
            (EdgeCondition::Always, None) => true,
            (EdgeCondition::OnCondition(expected), Some(actual)) => expected == actual,
            _ => false,
        }
    }
}

/// How a run stopped.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed,
    /// A node paused the run; carries the payload for the caller.
    Interrupted(Value),
}

/// petgraph-based StateGraph runtime
pub struct GraphRuntime {
    graph: DiGraph<Box<dyn Node>, EdgeCondition>,
    node_indices: HashMap<String, NodeIndex>,
    entry_node_id: String,
    /// Maximum execution steps (recursion limit)
    max_steps: usize,
}

impl GraphRuntime {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_indices: HashMap::new(),
            entry_node_id: String::new(),
            max_steps: 25,
        }
    }

    pub fn add_node(&mut self, node: Box<dyn Node>) -> NodeIndex {
        let id = node.id().to_string();
        let index = self.graph.add_node(node);
        self.node_indices.insert(id, index);
        index
    }

    pub fn add_conditional_edge(
        &mut self,
        from: &str,
        to: &str,
        condition: EdgeCondition,
    ) -> Result<(), GraphError> {
        let from_idx = self
            .node_indices
            .get(from)
            .ok_or_else(|| GraphError::new(from, format!("Source node not found: {}", from)))?;
        let to_idx = self
            .node_indices
            .get(to)
            .ok_or_else(|| GraphError::new(to, format!("Target node not found: {}", to)))?;

        self.graph.add_edge(*from_idx, *to_idx, condition);
        Ok(())
    }

    pub fn entry_node_id(&self) -> &str {
        &self.entry_node_id
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    pub fn node_ids(&self) -> Vec<&str> {
        self.node_indices.keys().map(|s| s.as_str()).collect()
    }

    pub fn has_cycle(&self) -> bool {
        petgraph::algo::is_cyclic_directed(&self.graph)
    }

    /// Execute the graph starting at `start_node`, e.g. to resume after an
    /// interrupt.
    pub async fn run_from(
        &self,
        start_node: &str,
        state: &mut ConversationState,
        ctx: &NodeContext<'_>,
    ) -> Result<RunOutcome, GraphError> {
        let mut current_idx = *self.node_indices.get(start_node).ok_or_else(|| {
            GraphError::new("runtime", format!("Start node not found: {}", start_node))
        })?;

        let mut trace: Vec<String> = Vec::new();

        loop {
            if trace.len() >= self.max_steps {
                return Err(GraphError::new(
                    "runtime",
                    format!("Maximum steps ({}) exceeded", self.max_steps),
                )
                .with_trace(trace));
            }

            let node = self
                .graph
                .node_weight(current_idx)
                .ok_or_else(|| GraphError::new("runtime", "Node not found in graph"))?;

            let node_id = node.id();
            tracing::debug!("Executing node: {} (step {})", node_id, trace.len());

            let output = match node.execute(state, ctx).await {
                Ok(output) => output,
                Err(err) => return Err(err.with_trace(trace)),
            };
            trace.push(node_id.to_string());

            match output {
                NodeOutput::Final => {
                    tracing::debug!("Graph execution complete at node: {}", node_id);
                    return Ok(RunOutcome::Completed);
                }
                NodeOutput::Interrupt(payload) => {
                    tracing::debug!("Graph execution interrupted at node: {}", node_id);
                    return Ok(RunOutcome::Interrupted(payload));
                }
                NodeOutput::Continue => {
                    current_idx = self.resolve_next_node(current_idx, None)?;
                }
                NodeOutput::Branch(condition) => {
                    current_idx = self.resolve_next_node(current_idx, Some(&condition))?;
                }
            }
        }
    }

    fn resolve_next_node(
        &self,
        current_idx: NodeIndex,
        condition: Option<&str>,
    ) -> Result<NodeIndex, GraphError> {
        let current_id = self
            .graph
            .node_weight(current_idx)
            .map(|n| n.id())
            .unwrap_or("unknown");

        let edges: Vec<(NodeIndex, &EdgeCondition)> = self
            .graph
            .edges_directed(current_idx, Direction::Outgoing)
            .map(|edge_ref| (edge_ref.target(), edge_ref.weight()))
            .collect();

        if edges.is_empty() {
            return Err(GraphError::new(
                current_id,
                format!("No outgoing edges from node: {}", current_id),
            ));
        }

        if let Some((target_idx, _)) = edges.iter().find(|(_, weight)| weight.matches(condition)) {
            return Ok(*target_idx);
        }

        // Unmatched condition falls back to the default edge
        if let Some((target_idx, _)) = edges
            .iter()
            .find(|(_, weight)| **weight == EdgeCondition::Always)
        {
            tracing::warn!(
                "Condition '{}' not matched for node '{}', using default edge",
                condition.unwrap_or(""),
                current_id
            );
            return Ok(*target_idx);
        }

        Err(GraphError::new(
            current_id,
            format!(
                "No matching edge for condition: {:?}",
                condition.unwrap_or("(none)")
            ),
        ))
    }
}

impl Default for GraphRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for constructing graphs fluently
pub struct GraphBuilder {
    runtime: GraphRuntime,
    pending_edges: Vec<(String, String, EdgeCondition)>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            runtime: GraphRuntime::new(),
            pending_edges: Vec::new(),
        }
    }

    pub fn entry(mut self, node_id: impl Into<String>) -> Self {
        self.runtime.entry_node_id = node_id.into();
        self
    }

    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.runtime.max_steps = max_steps;
        self
    }

    pub fn node(mut self, node: Box<dyn Node>) -> Self {
        self.runtime.add_node(node);
        self
    }

    pub fn edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.pending_edges
            .push((from.into(), to.into(), EdgeCondition::Always));
        self
    }

    pub fn conditional_edge(
        mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        condition: impl Into<String>,
    ) -> Self {
        self.pending_edges
            .push((from.into(), to.into(), EdgeCondition::on(condition)));
        self
    }

    pub fn build(mut self) -> Result<GraphRuntime, GraphError> {
        if !self.runtime.node_indices.contains_key(&self.runtime.entry_node_id) {
            return Err(GraphError::new(
                "builder",
                format!("Entry node not found: {}", self.runtime.entry_node_id),
            ));
        }
        for (from, to, condition) in self.pending_edges {
            self.runtime.add_conditional_edge(&from, &to, condition)?;
        }
        Ok(self.runtime)
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeLlm, FakeRetriever};
    use crate::tools::Toolbox;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;

    /// Emits a fixed output and records its visit in the message log.
    struct ScriptedNode {
        id: &'static str,
        output: NodeOutput,
    }

    #[async_trait]
    impl Node for ScriptedNode {
        fn id(&self) -> &'static str {
            self.id
        }

        async fn execute(
            &self,
            state: &mut ConversationState,
            _ctx: &NodeContext<'_>,
        ) -> Result<NodeOutput, GraphError> {
            state.push(crate::llm::ChatMessage::user(self.id));
            Ok(self.output.clone())
        }
    }

    fn scripted(id: &'static str, output: NodeOutput) -> Box<dyn Node> {
        Box::new(ScriptedNode { id, output })
    }

    async fn run_graph(runtime: &GraphRuntime, start: &str) -> (Result<RunOutcome, GraphError>, Vec<String>) {
        let llm = FakeLlm::default();
        let tools = Toolbox::new(Arc::new(FakeRetriever::new(Vec::new())), 2, 0.7);
        let ctx = NodeContext {
            llm: &llm,
            tools: &tools,
            temperature: None,
        };
        let mut state = ConversationState::new("t");
        let outcome = runtime.run_from(start, &mut state, &ctx).await;
        let visited = state.messages.into_iter().map(|m| m.content).collect();
        (outcome, visited)
    }

    #[test]
    fn test_edge_condition_matching() {
        assert!(EdgeCondition::Always.matches(None));
        assert!(!EdgeCondition::Always.matches(Some("tools")));

        assert!(EdgeCondition::on("tools").matches(Some("tools")));
        assert!(!EdgeCondition::on("tools").matches(Some("other")));
        assert!(!EdgeCondition::on("tools").matches(None));
    }

    #[tokio::test]
    async fn follows_branches_and_default_edges() {
        let runtime = GraphBuilder::new()
            .entry("a")
            .node(scripted("a", NodeOutput::Branch("go".to_string())))
            .node(scripted("b", NodeOutput::Continue))
            .node(scripted("c", NodeOutput::Final))
            .conditional_edge("a", "b", "go")
            .edge("b", "c")
            .build()
            .unwrap();

        let (outcome, visited) = run_graph(&runtime, "a").await;

        assert_eq!(outcome.unwrap(), RunOutcome::Completed);
        assert_eq!(visited, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn interrupt_stops_the_run_with_payload() {
        let runtime = GraphBuilder::new()
            .entry("a")
            .node(scripted("a", NodeOutput::Continue))
            .node(scripted("b", NodeOutput::Interrupt(json!({"query": "policy?"}))))
            .edge("a", "b")
            .build()
            .unwrap();

        let (outcome, visited) = run_graph(&runtime, "a").await;

        assert_eq!(outcome.unwrap(), RunOutcome::Interrupted(json!({"query": "policy?"})));
        assert_eq!(visited, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn step_limit_is_an_error_with_trace() {
        let runtime = GraphBuilder::new()
            .entry("a")
            .max_steps(3)
            .node(scripted("a", NodeOutput::Continue))
            .node(scripted("b", NodeOutput::Continue))
            .edge("a", "b")
            .edge("b", "a")
            .build()
            .unwrap();
        assert!(runtime.has_cycle());

        let (outcome, _) = run_graph(&runtime, "a").await;

        let err = outcome.unwrap_err();
        assert_eq!(err.execution_trace, vec!["a", "b", "a"]);
        assert!(err.message.contains("Maximum steps (3) exceeded"));
    }

    #[tokio::test]
    async fn unmatched_branch_takes_the_default_edge() {
        let runtime = GraphBuilder::new()
            .entry("a")
            .node(scripted("a", NodeOutput::Branch("unknown".to_string())))
            .node(scripted("b", NodeOutput::Final))
            .node(scripted("c", NodeOutput::Final))
            .conditional_edge("a", "c", "tools")
            .edge("a", "b")
            .build()
            .unwrap();

        let (outcome, visited) = run_graph(&runtime, "a").await;

        assert_eq!(outcome.unwrap(), RunOutcome::Completed);
        assert_eq!(visited, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn continue_without_outgoing_edge_is_an_error() {
        let runtime = GraphBuilder::new()
            .entry("a")
            .node(scripted("a", NodeOutput::Continue))
            .build()
            .unwrap();

        let (outcome, _) = run_graph(&runtime, "a").await;

        let err = outcome.unwrap_err();
        assert_eq!(err.node_id, "a");
        assert!(err.message.contains("No outgoing edges"));
    }

    #[test]
    fn build_rejects_unknown_nodes() {
        let missing_entry = GraphBuilder::new()
            .entry("ghost")
            .node(scripted("a", NodeOutput::Final))
            .build();
        assert!(missing_entry.is_err());

        let dangling_edge = GraphBuilder::new()
            .entry("a")
            .node(scripted("a", NodeOutput::Final))
            .edge("a", "ghost")
            .build();
        assert!(dangling_edge.is_err());
    }
}
