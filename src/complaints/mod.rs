//! Complaints module: student complaint box and admin review queue

pub mod handler;
pub mod types;

pub use handler::{complaints_router, ComplaintsState};
pub use types::{Complaint, ComplaintStatus, IssueType};
