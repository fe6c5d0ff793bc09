pub mod core;
pub mod eval;
pub mod graph;
pub mod llm;
pub mod privacy;
pub mod rag;
pub mod server;
pub mod state;
pub mod tools;

#[cfg(test)]
pub(crate) mod test_support;
