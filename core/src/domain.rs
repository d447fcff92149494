//! The complaint aggregate and its owned entities (spec §3).
//!
//! RULE: a `Complaint` exclusively owns its `ResolutionProof` and
//! `CitizenSignoff`s. Nothing holds a back-reference; everything is looked
//! up by id through the store, the same ownership discipline the teacher
//! applies to its simulation entities.

use crate::types::{ComplaintId, ComplaintState, EscalationLevel, Priority, ProofId, SignoffId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Complaint {
    pub id: ComplaintId,
    pub display_id: String,
    pub citizen_id: UserId,
    pub created_at: DateTime<Utc>,

    pub title: String,
    pub description: String,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    pub category_id: Option<i64>,
    pub department_id: Option<i64>,
    pub priority: Priority,
    pub ai_confidence: f64,
    pub ai_reasoning: String,
    pub needs_manual_routing: bool,

    pub state: ComplaintState,
    pub assigned_staff_id: Option<UserId>,
    pub escalation_level: EscalationLevel,
    pub sla_days: i64,
    pub sla_deadline: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,

    pub image_handle: Option<String>,
    pub image_analysis: Option<String>,

    pub upvote_count: i64,
    pub citizen_satisfaction: Option<i64>,

    /// Row version used for optimistic-concurrency CAS (spec §4.1(f), §5).
    pub version: i64,

    /// Consecutive scheduler failures; reset on a successful scheduler pass
    /// that touches this complaint (spec §7).
    pub scheduler_failure_count: i64,
    pub needs_manual_attention: bool,
}

impl Complaint {
    /// Monotonicity invariant of spec §3 / §8: created ≤ started ≤ resolved
    /// ≤ closed, ignoring whichever fields are absent.
    pub fn check_time_monotonicity(&self) -> bool {
        let mut prior = self.created_at;
        for next in [self.started_at, self.resolved_at, self.closed_at]
            .into_iter()
            .flatten()
        {
            if next < prior {
                return false;
            }
            prior = next;
        }
        true
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionProof {
    pub id: ProofId,
    pub complaint_id: ComplaintId,
    pub image_handle: String,
    pub captured_at: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub staff_id: UserId,
    pub remarks: String,
    pub verified: bool,
    /// A dispute approval archives the prior proof and opens a fresh cycle
    /// (spec §3, §4.4); archived proofs are excluded from "active proof"
    /// lookups but never deleted.
    pub archived: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitizenSignoff {
    pub id: SignoffId,
    pub complaint_id: ComplaintId,
    pub accepted: bool,
    pub disputed: bool,
    pub rating: Option<i64>,
    pub dispute_reason: Option<String>,
    pub counter_proof_handle: Option<String>,
    /// `Some(true)`/`Some(false)` once a department head reviews a dispute;
    /// `None` while pending (spec §3: `disputed = true ∧ approved IS NULL`).
    pub approved: Option<bool>,
    pub signed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationEvent {
    pub complaint_id: ComplaintId,
    pub from_level: EscalationLevel,
    pub to_level: EscalationLevel,
    pub triggered_at: DateTime<Utc>,
    pub reason: String,
    pub notified_role: String,
}
