//! Issue Model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Issue category (wire strings as shown to citizens)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
pub enum IssueCategory {
    Roads,
    Water,
    Electricity,
    Garbage,
    Others,
}

impl IssueCategory {
    pub const ALL: [IssueCategory; 5] = [
        Self::Roads,
        Self::Water,
        Self::Electricity,
        Self::Garbage,
        Self::Others,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Roads => "Roads",
            Self::Water => "Water",
            Self::Electricity => "Electricity",
            Self::Garbage => "Garbage",
            Self::Others => "Others",
        }
    }
}

/// Issue lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "kebab-case"))]
pub enum IssueStatus {
    Pending,
    InProgress,
    Resolved,
    Closed,
    Rejected,
}

impl IssueStatus {
    pub const ALL: [IssueStatus; 5] = [
        Self::Pending,
        Self::InProgress,
        Self::Resolved,
        Self::Closed,
        Self::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in-progress",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown issue status: {s}"))
    }
}

/// Issue priority
///
/// Only `Normal` and `High` are ever stored. `Low` and `Medium` exist so the
/// extended filter scale can be parsed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "lowercase"))]
pub enum Priority {
    Low,
    Medium,
    Normal,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::Normal => "normal",
            Self::High => "high",
        }
    }

    /// Parse a filter value, accepting only what `scale` allows
    pub fn parse_filter(value: &str, scale: PriorityScale) -> Option<Priority> {
        let priority = match value {
            "low" => Self::Low,
            "medium" => Self::Medium,
            "normal" => Self::Normal,
            "high" => Self::High,
            _ => return None,
        };
        scale.accepts(priority).then_some(priority)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which priority values a list filter accepts
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PriorityScale {
    /// normal / high
    #[default]
    Binary,
    /// low / medium / normal / high
    Extended,
}

impl PriorityScale {
    pub fn accepts(&self, priority: Priority) -> bool {
        match self {
            Self::Binary => matches!(priority, Priority::Normal | Priority::High),
            Self::Extended => true,
        }
    }
}

impl FromStr for PriorityScale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "binary" => Ok(Self::Binary),
            "extended" => Ok(Self::Extended),
            other => Err(format!("unknown priority scale: {other}")),
        }
    }
}

/// Timeline entry (append-only audit of an issue)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct TimelineEntry {
    pub status: IssueStatus,
    pub message: String,
    pub updated_by: String,
    /// Unix millis
    pub timestamp: i64,
}

/// Issue entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Issue {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category: IssueCategory,
    pub location: String,
    pub image: Option<String>,
    pub status: IssueStatus,
    pub priority: Priority,
    /// Reporter email
    pub user_email: String,
    pub assigned_staff: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,

    // -- Relations (populated by application code, skipped by FromRow) --
    #[cfg_attr(feature = "db", sqlx(skip))]
    #[serde(default)]
    pub upvotes: Vec<String>,
    #[cfg_attr(feature = "db", sqlx(skip))]
    #[serde(default)]
    pub timeline: Vec<TimelineEntry>,
}

impl Issue {
    pub fn upvote_count(&self) -> usize {
        self.upvotes.len()
    }

    pub fn is_reported_by(&self, email: &str) -> bool {
        self.user_email.eq_ignore_ascii_case(email)
    }

    pub fn has_upvote_from(&self, email: &str) -> bool {
        self.upvotes.iter().any(|u| u.eq_ignore_ascii_case(email))
    }

    pub fn is_assigned_to(&self, email: &str) -> bool {
        self.assigned_staff
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case(email))
    }
}

/// Create issue payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueCreate {
    pub title: String,
    pub description: String,
    pub category: IssueCategory,
    pub location: String,
    pub image: Option<String>,
    /// Informational; the server always uses the token subject
    #[serde(default)]
    pub user_email: Option<String>,
}

/// Update issue payload (content fields only)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<IssueCategory>,
    pub location: Option<String>,
    pub image: Option<String>,
}

/// List query (`GET /issues`)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IssueQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<IssueStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<IssueCategory>,
    /// Raw value; validated against the configured [`PriorityScale`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
}

/// Paginated issue list
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueListResponse {
    pub issues: Vec<Issue>,
    pub total_count: i64,
}

impl IssueListResponse {
    pub fn total_pages(&self, limit: u32) -> u32 {
        if limit == 0 {
            return 0;
        }
        (self.total_count.max(0) as u64).div_ceil(limit as u64) as u32
    }
}

/// `PATCH /issues/upvote/{id}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpvoteRequest {
    #[serde(default)]
    pub user_email: Option<String>,
}

/// `PATCH /issues/boost/{id}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoostRequest {
    #[serde(default)]
    pub user_email: Option<String>,
    /// Provider transaction that paid for the boost
    #[serde(default)]
    pub transaction_id: Option<String>,
}

/// `PATCH /issues/assign/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    pub staff_email: String,
    #[serde(default)]
    pub admin_email: Option<String>,
}

/// `PATCH /issues/status/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateRequest {
    pub new_status: IssueStatus,
    #[serde(default)]
    pub updated_by: Option<String>,
    /// Overrides the default timeline message
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&IssueStatus::InProgress).unwrap(),
            "\"in-progress\""
        );
        let s: IssueStatus = serde_json::from_str("\"rejected\"").unwrap();
        assert_eq!(s, IssueStatus::Rejected);
        assert_eq!("in-progress".parse::<IssueStatus>(), Ok(IssueStatus::InProgress));
        assert!("done".parse::<IssueStatus>().is_err());
    }

    #[test]
    fn test_category_wire_format() {
        assert_eq!(
            serde_json::to_string(&IssueCategory::Electricity).unwrap(),
            "\"Electricity\""
        );
    }

    #[test]
    fn test_priority_filter_scales() {
        assert_eq!(
            Priority::parse_filter("high", PriorityScale::Binary),
            Some(Priority::High)
        );
        assert_eq!(Priority::parse_filter("low", PriorityScale::Binary), None);
        assert_eq!(
            Priority::parse_filter("medium", PriorityScale::Extended),
            Some(Priority::Medium)
        );
        assert_eq!(Priority::parse_filter("urgent", PriorityScale::Extended), None);
        assert_eq!("Extended".parse::<PriorityScale>(), Ok(PriorityScale::Extended));
    }

    #[test]
    fn test_issue_serializes_camel_case() {
        let issue = Issue {
            id: 1,
            title: "Pothole".into(),
            description: "Deep".into(),
            category: IssueCategory::Roads,
            location: "Main St".into(),
            image: None,
            status: IssueStatus::Pending,
            priority: Priority::Normal,
            user_email: "a@city.test".into(),
            assigned_staff: None,
            created_at: 10,
            updated_at: 10,
            upvotes: vec!["b@city.test".into()],
            timeline: vec![],
        };
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["userEmail"], "a@city.test");
        assert_eq!(json["assignedStaff"], serde_json::Value::Null);
        assert_eq!(json["priority"], "normal");
        assert_eq!(issue.upvote_count(), 1);
        assert!(issue.has_upvote_from("B@city.test"));
    }

    #[test]
    fn test_query_skips_empty_fields() {
        let query = IssueQuery {
            page: Some(2),
            limit: Some(6),
            ..Default::default()
        };
        let json = serde_json::to_string(&query).unwrap();
        assert_eq!(json, r#"{"page":2,"limit":6}"#);
    }

    #[test]
    fn test_total_pages() {
        let list = IssueListResponse {
            issues: vec![],
            total_count: 13,
        };
        assert_eq!(list.total_pages(6), 3);
        assert_eq!(list.total_pages(0), 0);
    }
}
