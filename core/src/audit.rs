//! The audit log (C2) — an append-only, time-ordered ledger of every
//! state-affecting action (spec §4.6).
//!
//! RULE: only `store.rs` writes `audit_log` rows, and it does so inside the
//! same transaction as the mutation it records, so a transition is either
//! both persisted and audited or neither (spec §4.6, §8).

use crate::types::{ActorKind, AuditId, ComplaintId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Created,
    StateChange,
    Escalation,
    Assignment,
    SlaUpdate,
    Comment,
    Suspension,
    Routing,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::StateChange => "STATE_CHANGE",
            Self::Escalation => "ESCALATION",
            Self::Assignment => "ASSIGNMENT",
            Self::SlaUpdate => "SLA_UPDATE",
            Self::Comment => "COMMENT",
            Self::Suspension => "SUSPENSION",
            Self::Routing => "ROUTING",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CREATED" => Some(Self::Created),
            "STATE_CHANGE" => Some(Self::StateChange),
            "ESCALATION" => Some(Self::Escalation),
            "ASSIGNMENT" => Some(Self::Assignment),
            "SLA_UPDATE" => Some(Self::SlaUpdate),
            "COMMENT" => Some(Self::Comment),
            "SUSPENSION" => Some(Self::Suspension),
            "ROUTING" => Some(Self::Routing),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Option<AuditId>,
    pub entity_type: String,
    pub entity_id: ComplaintId,
    pub action: AuditAction,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub actor_id: UserId,
    pub actor_kind: ActorKind,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The enumerated reason strings a SYSTEM actor may record (spec §9: "the
/// exact set of reserved reason strings for SYSTEM escalations is not
/// standardized... implementations should define and test an
/// enumeration").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemReason {
    SlaBreachReminder,
    EscalatedToDeptHead,
    EscalatedToAdmin,
    EscalatedToCommissioner,
    AutoClosedAfterWindow,
    SchedulerRetrySkipped,
    DisputeApprovedReopen,
}

impl SystemReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SlaBreachReminder => "sla_breach_reminder",
            Self::EscalatedToDeptHead => "escalated_to_dept_head",
            Self::EscalatedToAdmin => "escalated_to_admin",
            Self::EscalatedToCommissioner => "escalated_to_commissioner",
            Self::AutoClosedAfterWindow => "auto_closed_after_window",
            Self::SchedulerRetrySkipped => "scheduler_retry_skipped",
            Self::DisputeApprovedReopen => "dispute_approved_reopen",
        }
    }
}
