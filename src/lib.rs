//! HelpDesk - College helpdesk with knowledge-base search and LLM fallback
//!
//! Students ask free-text questions about their college (courses, calendar,
//! fees, staff, events) and file complaints; admins work through the
//! complaint queue and maintain the knowledge base.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         HTTP API (axum)                          │
//! │   auth   │   chat   │   complaints   │   knowledge   │  health   │
//! └────┬─────────┬───────────────┬───────────────┬───────────────────┘
//!      │         │               │               │
//!      │  ┌──────▼──────────┐    │        ┌──────▼──────────────┐
//!      │  │ Retrieval       │    │        │ Knowledge Store     │
//!      │  │ Pipeline        │◄───┼────────│  KB + corpus + index│
//!      │  │  - TF-IDF match │    │        │  atomic reload      │
//!      │  │  - threshold    │    │        └─────────────────────┘
//!      │  └──────┬──────────┘    │
//!      │         │ miss          │
//!      │  ┌──────▼──────────┐    │
//!      │  │ Generation      │    │
//!      │  │ Fallback        │    │
//!      │  │  - HTTP model   │    │
//!      │  │  - substring    │    │
//!      │  └─────────────────┘    │
//!      │                         │
//! ┌────▼─────────────┐    ┌──────▼──────────┐
//! │ Session Manager  │    │ SQLite Storage  │
//! │  tokens,         │    │  users,         │
//! │  transcripts     │    │  complaints     │
//! └──────────────────┘    └─────────────────┘
//! ```
//!
//! ## Answering a question
//!
//! 1. The knowledge base is flattened into one line per leaf
//!    (`FEE_STRUCTURE.Exam_Fee_Sem: 1200`) and indexed with TF-IDF.
//! 2. A query whose best cosine similarity exceeds the threshold gets that
//!    line's original value back.
//! 3. Otherwise the whole knowledge base goes to the generative endpoint as
//!    a prompt; if that fails, a case-insensitive substring search runs, and
//!    if that finds nothing, a fixed apology is returned.
//!
//! ## Modules
//!
//! - [`knowledge`]: Knowledge tree, flattening, snapshot store
//! - [`retrieval`]: Tokenizer, TF-IDF index, answer pipeline
//! - [`llm`]: Generator trait, HTTP client, fallback chain
//! - [`auth`]: Accounts, password hashing, bearer sessions
//! - [`session`]: Login sessions and chat transcripts
//! - [`chat`]: Chatbot endpoint
//! - [`complaints`]: Complaint box and admin queue
//! - [`storage`]: SQLite persistence
//! - [`server`]: Listener lifecycle
//! - [`config`]: Configuration management

pub mod api;
pub mod auth;
pub mod chat;
pub mod complaints;
pub mod config;
pub mod error;
pub mod knowledge;
pub mod llm;
pub mod retrieval;
pub mod server;
pub mod session;
pub mod storage;

pub use config::HelpdeskConfig;
pub use error::{Error, Result};
