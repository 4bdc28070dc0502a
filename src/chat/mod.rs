//! Chat module: the student-facing question answering endpoint

pub mod handler;

pub use handler::{chat_router, ChatRequest, ChatResponse, ChatState};
