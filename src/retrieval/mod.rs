//! Lexical retrieval over the flattened knowledge base

mod index;
mod pipeline;
mod tokenizer;

pub use index::{LexicalIndex, ScoredMatch};
pub use pipeline::{Answer, RetrievalPipeline};
pub use tokenizer::tokenize;
