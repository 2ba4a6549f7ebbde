//! Complaint domain models.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::media::MediaHandle;

/// Lifecycle status of a complaint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "complaint_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ComplaintStatus {
    #[default]
    Pending,
    InProgress,
    Resolved,
}

impl ComplaintStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplaintStatus::Pending => "pending",
            ComplaintStatus::InProgress => "in_progress",
            ComplaintStatus::Resolved => "resolved",
        }
    }

    /// Position in the intended pending → in_progress → resolved order.
    pub fn rank(&self) -> u8 {
        match self {
            ComplaintStatus::Pending => 0,
            ComplaintStatus::InProgress => 1,
            ComplaintStatus::Resolved => 2,
        }
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
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "pending" => Ok(ComplaintStatus::Pending),
            "in_progress" => Ok(ComplaintStatus::InProgress),
            "resolved" => Ok(ComplaintStatus::Resolved),
            other => Err(format!("Unknown status '{other}'")),
        }
    }
}

/// Triage priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "complaint_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        })
    }
}

/// WGS84 point, GeoJSON axis order (longitude first).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lon: f64,
    pub lat: f64,
}

impl Coordinates {
    pub fn is_valid(&self) -> bool {
        (-180.0..=180.0).contains(&self.lon) && (-90.0..=90.0).contains(&self.lat)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub address: String,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub mobile: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Persisted complaint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Complaint {
    pub id: Uuid,
    pub title: String,
    pub category: String,
    pub description: String,
    pub location: Location,
    pub priority: Priority,
    pub contact: Contact,
    pub images: Vec<MediaHandle>,
    pub status: ComplaintStatus,
    pub author_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fully validated complaint ready for insertion. Author and status are
/// decided by the workflow, never by the client.
#[derive(Debug, Clone)]
pub struct NewComplaint {
    pub title: String,
    pub category: String,
    pub description: String,
    pub location: Location,
    pub priority: Priority,
    pub contact: Contact,
    pub images: Vec<MediaHandle>,
    pub status: ComplaintStatus,
    pub author_id: Uuid,
}

/// Default page size for complaint listings.
pub const DEFAULT_LIST_LIMIT: u32 = 50;
/// Upper bound on a single listing page.
pub const MAX_LIST_LIMIT: u32 = 200;

/// Listing filter. All criteria are conjunctive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComplaintFilter {
    pub author_id: Option<Uuid>,
    pub status: Option<ComplaintStatus>,
    pub category: Option<String>,
    pub priority: Option<Priority>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ComplaintFilter {
    /// Effective page size, clamped to `1..=MAX_LIST_LIMIT`.
    pub fn effective_limit(&self) -> u32 {
        self.limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT)
    }

    pub fn effective_offset(&self) -> u32 {
        self.offset.unwrap_or(0)
    }

    /// In-process predicate mirroring the SQL `WHERE` clause.
    pub fn matches(&self, complaint: &Complaint) -> bool {
        self.author_id.is_none_or(|a| complaint.author_id == a)
            && self.status.is_none_or(|s| complaint.status == s)
            && self
                .category
                .as_deref()
                .is_none_or(|c| complaint.category.eq_ignore_ascii_case(c))
            && self.priority.is_none_or(|p| complaint.priority == p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_hyphenated_and_snake_case() {
        assert_eq!("in-progress".parse::<ComplaintStatus>(), Ok(ComplaintStatus::InProgress));
        assert_eq!("IN_PROGRESS".parse::<ComplaintStatus>(), Ok(ComplaintStatus::InProgress));
        assert!("closed".parse::<ComplaintStatus>().is_err());
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&ComplaintStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }

    #[test]
    fn filter_limit_is_clamped() {
        let mut filter = ComplaintFilter::default();
        assert_eq!(filter.effective_limit(), DEFAULT_LIST_LIMIT);
        filter.limit = Some(10_000);
        assert_eq!(filter.effective_limit(), MAX_LIST_LIMIT);
        filter.limit = Some(0);
        assert_eq!(filter.effective_limit(), 1);
    }

    #[test]
    fn coordinates_out_of_range_are_invalid() {
        assert!(Coordinates { lon: 12.5, lat: 41.9 }.is_valid());
        assert!(!Coordinates { lon: 181.0, lat: 0.0 }.is_valid());
        assert!(!Coordinates { lon: 0.0, lat: -91.0 }.is_valid());
    }
}
