//! docqa - Document question answering over local Ollama models
//! 
//! Retrieval-augmented generation in four steps, run in sequence for every
//! question: embed the question and rank stored chunks by cosine similarity,
//! assemble a prompt around the best chunks, ask the completion model, and
//! sign a time-limited link back to the source document.
//! 
//! # Architecture
//! 
//! - **store**: document store trait with in-memory and Qdrant backends
//! - **embedding** / **completion**: Ollama service adapters with retry
//! - **rag**: retriever, prompt assembly and the question pipeline
//! - **ingest**: recursive text splitter and ingestion into the store
//! - **links**: signed expiring source links

pub mod errors;
pub mod config;
pub mod store;
pub mod embedding;
pub mod completion;
pub mod links;
pub mod ingest;
pub mod rag;

// Interface layer
pub mod telemetry;
pub mod bootstrap;
pub mod cli;
pub mod repl;

// Re-export commonly used types
pub use errors::{QaError, Result};
pub use rag::{Answer, QaPipeline};
