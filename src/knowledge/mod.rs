//! Knowledge module: the nested college knowledge base
//!
//! Holds the typed knowledge tree, the two flattenings built from it (index
//! corpus and prompt lines), the reloadable snapshot store, and the REST
//! endpoints that expose it.

pub mod flatten;
pub mod handler;
pub mod store;
pub mod types;

pub use flatten::{flatten, prompt_lines, Corpus};
pub use handler::{knowledge_router, KnowledgeState};
pub use store::{KnowledgeBase, KnowledgeSnapshot, KnowledgeStore};
pub use types::{KbMap, KbValue, Scalar};
