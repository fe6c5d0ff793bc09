pub mod gemini;
pub mod openai_compat;
pub mod provider;
pub mod service;
pub mod types;


pub use provider::LlmProvider;
pub use service::build_provider;
pub use types::{ChatMessage, ChatRequest, ChatResponse, EmbedTask, Role, ToolCall, ToolSpec};
