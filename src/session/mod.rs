//! Login sessions and their chat transcripts

mod manager;
mod transcript;

pub use manager::{Session, SessionManager};
pub use transcript::{ChatMessage, ChatRole};
