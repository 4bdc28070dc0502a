//! Complaint types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Category picked by the student
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueType {
    Ragging,
    Harassment,
    Infrastructure,
    Academics,
    Other,
}

impl IssueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ragging => "Ragging",
            Self::Harassment => "Harassment",
            Self::Infrastructure => "Infrastructure",
            Self::Academics => "Academics",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Ragging" => Ok(Self::Ragging),
            "Harassment" => Ok(Self::Harassment),
            "Infrastructure" => Ok(Self::Infrastructure),
            "Academics" => Ok(Self::Academics),
            "Other" => Ok(Self::Other),
            other => Err(format!("unknown issue type '{}'", other)),
        }
    }
}

/// Complaint lifecycle: pending -> in_progress -> resolved -> read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplaintStatus {
    Pending,
    InProgress,
    Resolved,
    /// Student acknowledged the resolution; no longer active
    Read,
}

impl ComplaintStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Read => "read",
        }
    }

    /// Whether the complaint still shows up for admins
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Read)
    }
}

impl fmt::Display for ComplaintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComplaintStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            // Older rows spell it with a space
            "in_progress" | "in progress" => Ok(Self::InProgress),
            "resolved" => Ok(Self::Resolved),
            "read" => Ok(Self::Read),
            other => Err(format!("unknown complaint status '{}'", other)),
        }
    }
}

/// Stored complaint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Complaint {
    pub id: i64,
    /// Account that filed the complaint
    pub username: String,
    /// Name shown to admins; empty means anonymous
    pub student_name: String,
    pub issue_type: IssueType,
    pub description: String,
    pub status: ComplaintStatus,
    pub admin_response: String,
    /// Unix millis
    pub created_at: i64,
}

/// Request body for POST /api/v1/complaints
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateComplaintRequest {
    /// Defaults to the username when absent; blank files anonymously
    #[serde(default)]
    pub student_name: Option<String>,
    pub issue_type: IssueType,
    pub description: String,
}

/// Request body for PATCH /api/v1/admin/complaints/:id
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateComplaintRequest {
    pub status: ComplaintStatus,
    #[serde(default)]
    pub response: String,
}

/// Query string for GET /api/v1/complaints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComplaintFilter {
    pub status: Option<ComplaintStatus>,
}

/// Admin listing of active complaints
#[derive(Debug, Clone, Serialize)]
pub struct ActiveComplaints {
    pub count: usize,
    pub complaints: Vec<Complaint>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_value(ComplaintStatus::InProgress).unwrap(),
            "in_progress"
        );
        assert_eq!(
            "resolved".parse::<ComplaintStatus>().unwrap(),
            ComplaintStatus::Resolved
        );
        assert_eq!(
            "in progress".parse::<ComplaintStatus>().unwrap(),
            ComplaintStatus::InProgress
        );
        assert!("done".parse::<ComplaintStatus>().is_err());
    }

    #[test]
    fn test_only_read_is_inactive() {
        assert!(ComplaintStatus::Pending.is_active());
        assert!(ComplaintStatus::Resolved.is_active());
        assert!(!ComplaintStatus::Read.is_active());
    }

    #[test]
    fn test_issue_type_names() {
        assert_eq!(
            serde_json::to_value(IssueType::Infrastructure).unwrap(),
            "Infrastructure"
        );
        assert_eq!("Other".parse::<IssueType>().unwrap(), IssueType::Other);
    }

    #[test]
    fn test_create_request_parsing() {
        let req: CreateComplaintRequest = serde_json::from_str(
            r#"{"issueType": "Ragging", "description": "Seniors in hostel block B"}"#,
        )
        .unwrap();
        assert_eq!(req.issue_type, IssueType::Ragging);
        assert!(req.student_name.is_none());
    }
}
