use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Engineer,
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Engineer => write!(f, "engineer"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// A user record as persisted in the `allUsers` array. Email is the identity
/// key; uniqueness is checked at signup/add-user time, not by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TicketStatus {
    Pending,
    Assigned,
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    /// Lifecycle graph: pending -> assigned -> in-progress -> resolved ->
    /// closed, plus the admin reverse edge assigned -> pending (unassign).
    pub fn can_transition_to(self, next: TicketStatus) -> bool {
        use TicketStatus::*;
        matches!(
            (self, next),
            (Pending, Assigned)
                | (Assigned, Pending)
                | (Assigned, InProgress)
                | (InProgress, Resolved)
                | (Resolved, Closed)
        )
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "assigned" => Some(Self::Assigned),
            "in-progress" => Some(Self::InProgress),
            "resolved" => Some(Self::Resolved),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }

    /// Sort weight used by the engineer queue: active work first.
    pub fn work_order(self) -> u8 {
        match self {
            TicketStatus::Assigned => 3,
            TicketStatus::InProgress => 2,
            TicketStatus::Resolved => 1,
            TicketStatus::Pending | TicketStatus::Closed => 0,
        }
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TicketStatus::Pending => "pending",
            TicketStatus::Assigned => "assigned",
            TicketStatus::InProgress => "in-progress",
            TicketStatus::Resolved => "resolved",
            TicketStatus::Closed => "closed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

impl Urgency {
    pub fn rank(self) -> u8 {
        match self {
            Urgency::High => 3,
            Urgency::Medium => 2,
            Urgency::Low => 1,
        }
    }
}

impl std::fmt::Display for Urgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Urgency::Low => write!(f, "low"),
            Urgency::Medium => write!(f, "medium"),
            Urgency::High => write!(f, "high"),
        }
    }
}

/// A support ticket, stored in the owning user's `tickets_<userId>` array.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: String,
    pub title: String,
    pub category: String,
    pub urgency: Urgency,
    pub description: String,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_id: String,
    pub assigned_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_engineer: Option<String>,
    #[serde(default)]
    pub work_notes: Vec<WorkNote>,
}

impl Ticket {
    pub fn matches(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.title.to_lowercase().contains(&term)
            || self.description.to_lowercase().contains(&term)
    }
}

/// Free-text progress annotation. Append only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkNote {
    pub id: String,
    pub note: String,
    pub timestamp: DateTime<Utc>,
    pub engineer_name: String,
    pub status: TicketStatus,
}

/// A ticket annotated with its owner, as produced by the all-user scan that
/// backs the admin and engineer views.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketWithOwner {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub user_name: String,
    pub user_email: String,
}

/// The current-user snapshot written at login/signup and read by the auth
/// middleware. Stored under `session_<sid>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<&UserRecord> for SessionUser {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_to_kebab_case() {
        let json = serde_json::to_string(&TicketStatus::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");
        let back: TicketStatus = serde_json::from_str("\"in-progress\"").unwrap();
        assert_eq!(back, TicketStatus::InProgress);
    }

    #[test]
    fn lifecycle_allows_forward_edges_and_unassign() {
        use TicketStatus::*;
        assert!(Pending.can_transition_to(Assigned));
        assert!(Assigned.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Resolved));
        assert!(Resolved.can_transition_to(Closed));
        assert!(Assigned.can_transition_to(Pending));
    }

    #[test]
    fn lifecycle_rejects_out_of_order_transitions() {
        use TicketStatus::*;
        assert!(!Pending.can_transition_to(Resolved));
        assert!(!Pending.can_transition_to(InProgress));
        assert!(!Resolved.can_transition_to(InProgress));
        assert!(!Closed.can_transition_to(Pending));
        assert!(!InProgress.can_transition_to(Pending));
    }

    #[test]
    fn ticket_search_is_case_insensitive_over_title_and_description() {
        let ticket = Ticket {
            id: "t1".into(),
            title: "VPN down".into(),
            category: "network".into(),
            urgency: Urgency::High,
            description: "Cannot reach the office gateway".into(),
            status: TicketStatus::Pending,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            user_id: "u1".into(),
            assigned_to: None,
            assigned_engineer: None,
            work_notes: vec![],
        };
        assert!(ticket.matches("vpn"));
        assert!(ticket.matches("GATEWAY"));
        assert!(!ticket.matches("printer"));
    }

    #[test]
    fn work_notes_default_to_empty_when_absent() {
        let raw = r#"{
            "id": "t1",
            "title": "VPN down",
            "category": "network",
            "urgency": "high",
            "description": "no route",
            "status": "pending",
            "createdAt": "2025-01-01T00:00:00Z",
            "updatedAt": "2025-01-01T00:00:00Z",
            "userId": "u1",
            "assignedTo": null
        }"#;
        let ticket: Ticket = serde_json::from_str(raw).unwrap();
        assert!(ticket.work_notes.is_empty());
        assert!(ticket.assigned_to.is_none());
    }
}
