// Conversation Graph Module
// StateGraph with a chatbot/tools loop, interrupts and checkpointed threads

pub mod builder;
pub mod checkpoint;
pub mod node;
pub mod runtime;
pub mod service;
pub mod state;

pub mod nodes;

pub use builder::build_claims_graph;
pub use checkpoint::{CheckpointStore, InMemoryCheckpointStore, SqliteCheckpointStore};
pub use node::{GraphError, Node, NodeContext, NodeOutput};
pub use runtime::{GraphRuntime, RunOutcome};
pub use service::{GraphReply, GraphService, GraphTurn, ReplyStatus};
pub use state::{ConversationState, ConversationStatus};
