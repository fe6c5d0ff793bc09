//! Retrieval-augmented answering.
//!
//! - `loader` / `splitter` / `indexer`: build the chunk index from text files
//! - `store` (+ `sqlite`, `memory`): persist and search chunk embeddings
//! - `retriever`: query embedding + similarity search
//! - `assembler`: thresholding, grounding score, prompt and citations

pub mod assembler;
pub mod indexer;
pub mod loader;
pub mod memory;
pub mod retriever;
pub mod splitter;
pub mod sqlite;
pub mod store;
pub mod types;

pub use assembler::{AnswerAssembler, NO_CONTEXT_SENTINEL};
pub use indexer::{IndexReport, Indexer};
pub use loader::DocumentLoader;
pub use memory::InMemoryVectorStore;
pub use retriever::{Retriever, VectorRetriever};
pub use splitter::TextSplitter;
pub use sqlite::SqliteVectorStore;
pub use store::VectorStore;
pub use types::{AnswerResult, Chunk, Citation, Document, RetrievalInfo, ScoredChunk};
