//! Auth module: accounts, passwords and bearer sessions
//!
//! Students and admins register with their institutional email domains and
//! log into separate portals. A successful login yields an opaque token that
//! every other endpoint expects in the `Authorization: Bearer` header.

pub mod handler;
pub mod password;
pub mod types;

pub use handler::{auth_router, authenticate, AuthState};
pub use types::{Role, User, UserProfile};
