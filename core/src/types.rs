//! Shared primitive types used across the whole engine.

use serde::{Deserialize, Serialize};

/// Internal row id for a complaint. Opaque to callers outside the store.
pub type ComplaintId = i64;

/// Internal row id for a resolution proof.
pub type ProofId = i64;

/// Internal row id for a citizen sign-off.
pub type SignoffId = i64;

/// Internal row id for an audit entry.
pub type AuditId = i64;

/// Opaque handle returned by the attachment service for an uploaded blob.
pub type AttachmentHandle = String;

/// A citizen, staff, or system identifier. Opaque beyond equality.
pub type UserId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Citizen,
    Staff,
    DeptHead,
    Admin,
    Commissioner,
    SuperAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Citizen => "CITIZEN",
            Self::Staff => "STAFF",
            Self::DeptHead => "DEPT_HEAD",
            Self::Admin => "ADMIN",
            Self::Commissioner => "COMMISSIONER",
            Self::SuperAdmin => "SUPER_ADMIN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    User,
    System,
}

/// The caller of an engine operation: a role-bearing identity plus,
/// for roles scoped to a department, the department they belong to.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
    pub department_id: Option<i64>,
}

impl Actor {
    /// The pseudo-identity used for scheduler-driven transitions (spec §3, §4.1).
    pub fn system() -> Self {
        Self {
            user_id: 0,
            role: Role::SuperAdmin,
            department_id: None,
        }
    }

    pub fn kind(&self) -> ActorKind {
        if self.user_id == 0 && matches!(self.role, Role::SuperAdmin) {
            ActorKind::System
        } else {
            ActorKind::User
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    /// Advance by one step, capped at CRITICAL (spec §4.3, §4.4).
    pub fn bump(self) -> Self {
        match self {
            Self::Low => Self::Medium,
            Self::Medium => Self::High,
            Self::High | Self::Critical => Self::Critical,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "LOW" => Some(Self::Low),
            "MEDIUM" => Some(Self::Medium),
            "HIGH" => Some(Self::High),
            "CRITICAL" => Some(Self::Critical),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ComplaintState {
    Filed,
    InProgress,
    Resolved,
    Closed,
    Cancelled,
    Hold,
}

impl ComplaintState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Filed => "FILED",
            Self::InProgress => "IN_PROGRESS",
            Self::Resolved => "RESOLVED",
            Self::Closed => "CLOSED",
            Self::Cancelled => "CANCELLED",
            Self::Hold => "HOLD",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "FILED" => Some(Self::Filed),
            "IN_PROGRESS" => Some(Self::InProgress),
            "RESOLVED" => Some(Self::Resolved),
            "CLOSED" => Some(Self::Closed),
            "CANCELLED" => Some(Self::Cancelled),
            "HOLD" => Some(Self::Hold),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EscalationLevel {
    None,
    Staff,
    DeptHead,
    Admin,
    Commissioner,
}

impl EscalationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Staff => "STAFF",
            Self::DeptHead => "DEPT_HEAD",
            Self::Admin => "ADMIN",
            Self::Commissioner => "COMMISSIONER",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "NONE" => Some(Self::None),
            "STAFF" => Some(Self::Staff),
            "DEPT_HEAD" => Some(Self::DeptHead),
            "ADMIN" => Some(Self::Admin),
            "COMMISSIONER" => Some(Self::Commissioner),
            _ => None,
        }
    }

    /// The next level up the ladder, or `None` if already at the top.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::None => Some(Self::Staff),
            Self::Staff => Some(Self::DeptHead),
            Self::DeptHead => Some(Self::Admin),
            Self::Admin => Some(Self::Commissioner),
            Self::Commissioner => None,
        }
    }
}

/// The externally-visible complaint id: `GRV-<yyyy>-<00001>`.
/// A complaint is always addressed internally by its integer row id;
/// this is purely a presentation format for the API boundary (spec §6).
pub fn format_display_id(year: i32, seq: i64) -> String {
    format!("GRV-{year}-{seq:05}")
}
