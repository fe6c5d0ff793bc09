// Graph Nodes Module

pub mod chat;
pub mod tool;

pub use chat::{ChatbotNode, CHATBOT_NODE, TOOLS_CONDITION};
pub use tool::{ToolsNode, TOOLS_NODE};
