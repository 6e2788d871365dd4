// Retrieval-augmented question answering
//
// - Retriever: embed the question and rank stored chunks
// - Prompt: assemble the context block and instruction template
// - Pipeline: retrieve -> prompt -> complete -> link, in sequence

pub mod pipeline;
pub mod prompt;
pub mod retrieval;

pub use pipeline::{Answer, QaPipeline};
pub use prompt::{ContextBoundary, PromptBuilder};
pub use retrieval::Retriever;
