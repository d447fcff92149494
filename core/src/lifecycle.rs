//! Complaint Lifecycle Engine (C6) — the single path through which every
//! complaint state mutation flows (spec §4.1).
//!
//! RULE: nothing outside this module calls `SimStore::update_complaint_cas`
//! on a `state`/`escalation_level`/`priority` change. C7, C8, C9, and the
//! API crate all route through `apply_transition`, `reassign`, or `route`.

use crate::audit::{AuditAction, AuditEntry, SystemReason};
use crate::clock::Clock;
use crate::domain::{Complaint, EscalationEvent};
use crate::error::{GrvError, GrvResult};
use crate::refdata::ReferenceDataReader;
use crate::store::{NewComplaint, SimStore};
use crate::types::{
    Actor, ActorKind, ComplaintId, ComplaintState, EscalationLevel, Priority, Role, UserId,
};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// Optional context a caller attaches to a transition request (spec §4.1).
#[derive(Debug, Clone, Default)]
pub struct TransitionContext {
    pub reason: Option<String>,
    /// Staff id to assign when moving FILED → IN_PROGRESS.
    pub assignee: Option<UserId>,
    /// Set by the resolution subsystem when RESOLVED → IN_PROGRESS is
    /// driven by an approved dispute, so the guard can recompute SLA.
    pub dispute_approved: bool,
}

/// Parameters for filing a brand-new complaint (spec §4.2's classifier
/// output plus the citizen-supplied fields).
#[derive(Debug, Clone)]
pub struct FileComplaint {
    pub citizen_id: UserId,
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
    pub image_handle: Option<String>,
    pub image_analysis: Option<String>,
}

pub struct LifecycleEngine<C: Clock> {
    store: SimStore,
    clock: C,
    refdata: Arc<ReferenceDataReader>,
    routing_confidence_threshold: f64,
    auto_close_window: Duration,
    dispute_sla_fraction: f64,
    scheduler_failure_limit: u32,
}

impl<C: Clock> LifecycleEngine<C> {
    pub fn new(
        store: SimStore,
        clock: C,
        refdata: Arc<ReferenceDataReader>,
        routing_confidence_threshold: f64,
        auto_close_window: Duration,
        dispute_sla_fraction: f64,
        scheduler_failure_limit: u32,
    ) -> Self {
        Self {
            store,
            clock,
            refdata,
            routing_confidence_threshold,
            auto_close_window,
            dispute_sla_fraction,
            scheduler_failure_limit,
        }
    }

    pub fn store(&self) -> &SimStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut SimStore {
        &mut self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn auto_close_window(&self) -> Duration {
        self.auto_close_window
    }

    /// File a new complaint (spec §3, §4.2): computes `needs_manual_routing`
    /// from the classifier confidence and the SLA deadline from reference
    /// data, then persists and audits a CREATED entry.
    pub fn file_complaint(&mut self, input: FileComplaint) -> GrvResult<Complaint> {
        let now = self.clock.now();
        let needs_manual_routing = input.ai_confidence < self.routing_confidence_threshold;
        let sla_days = match input.category_id {
            Some(cat_id) if !needs_manual_routing => self
                .refdata
                .sla_days(cat_id, input.department_id, input.priority)
                .map_err(|e| GrvError::Internal(e))?
                .unwrap_or(DEFAULT_SLA_DAYS),
            _ => DEFAULT_SLA_DAYS,
        };
        let sla_deadline = now + Duration::days(sla_days);

        let new = NewComplaint {
            citizen_id: input.citizen_id,
            created_at: now,
            title: input.title,
            description: input.description,
            location: input.location,
            latitude: input.latitude,
            longitude: input.longitude,
            category_id: input.category_id,
            department_id: input.department_id,
            priority: input.priority,
            ai_confidence: input.ai_confidence,
            ai_reasoning: input.ai_reasoning,
            needs_manual_routing,
            sla_days,
            sla_deadline,
            image_handle: input.image_handle,
            image_analysis: input.image_analysis,
        };

        let complaint = self.store.insert_complaint(new)?;
        self.audit(
            complaint.id,
            AuditAction::Created,
            None,
            Some(complaint.state.as_str().to_string()),
            Actor {
                user_id: complaint.citizen_id,
                role: Role::Citizen,
                department_id: None,
            },
            None,
        )?;
        Ok(complaint)
    }

    /// The subset of states `actor` may legally request right now (spec
    /// §4.7: powers the UI's button gating).
    pub fn available_transitions(
        &self,
        complaint_id: ComplaintId,
        actor: Actor,
    ) -> GrvResult<Vec<ComplaintState>> {
        let complaint = self.store.get_complaint(complaint_id)?;
        if complaint.state.is_terminal() {
            return Ok(vec![]);
        }
        Ok(ALL_STATES
            .iter()
            .copied()
            .filter(|&to| {
                transition_rule(complaint.state, to)
                    .map(|rule| rule.roles.contains(&actor.role))
                    .unwrap_or(false)
            })
            .collect())
    }

    /// Validate, apply, and audit one state transition (spec §4.1).
    pub fn apply_transition(
        &mut self,
        complaint_id: ComplaintId,
        target: ComplaintState,
        actor: Actor,
        ctx: TransitionContext,
    ) -> GrvResult<Complaint> {
        let mut complaint = self.store.get_complaint(complaint_id)?;
        let from = complaint.state;

        if from.is_terminal() {
            return Err(GrvError::InvalidStateTransition {
                complaint_id,
                from,
                to: target,
            });
        }

        let rule = transition_rule(from, target).ok_or(GrvError::InvalidStateTransition {
            complaint_id,
            from,
            to: target,
        })?;

        if !rule.roles.contains(&actor.role) && actor.kind() != ActorKind::System {
            return Err(GrvError::Forbidden(format!(
                "role {:?} may not move complaint {complaint_id} from {from:?} to {target:?}",
                actor.role
            )));
        }
        if actor.role == Role::Citizen && actor.user_id != complaint.citizen_id {
            return Err(GrvError::Forbidden(
                "citizen actions require ownership".into(),
            ));
        }

        self.check_guard(from, target, &complaint, actor, &ctx)?;

        let now = self.clock.now();
        match (from, target) {
            (ComplaintState::Filed, ComplaintState::InProgress) => {
                let assignee = ctx
                    .assignee
                    .or(Some(actor.user_id))
                    .filter(|_| actor.role == Role::Staff)
                    .or(ctx.assignee);
                complaint.assigned_staff_id = assignee;
                complaint.started_at = Some(now);
            }
            (ComplaintState::InProgress, ComplaintState::Resolved) => {
                complaint.resolved_at = Some(now);
            }
            (ComplaintState::Resolved, ComplaintState::InProgress) => {
                complaint.priority = complaint.priority.bump();
                let reduced_days = ((complaint.sla_days as f64) * self.dispute_sla_fraction)
                    .ceil()
                    .max(1.0) as i64;
                let old_deadline = complaint.sla_deadline;
                complaint.sla_deadline = now + Duration::days(reduced_days);
                complaint.resolved_at = None;
                // A reopened dispute starts a fresh escalation cycle — the
                // ladder must climb from NONE again, not from wherever the
                // prior cycle left off.
                complaint.escalation_level = EscalationLevel::None;
                self.audit(
                    complaint_id,
                    AuditAction::SlaUpdate,
                    Some(old_deadline.to_rfc3339()),
                    Some(complaint.sla_deadline.to_rfc3339()),
                    actor,
                    Some(SystemReason::DisputeApprovedReopen.as_str().to_string()),
                )?;
            }
            (ComplaintState::Resolved, ComplaintState::Closed) => {
                complaint.closed_at = Some(now);
            }
            _ => {}
        }

        let old_state = complaint.state.as_str().to_string();
        complaint.state = target;
        let complaint = self.store.update_complaint_cas(&complaint)?;

        self.audit(
            complaint_id,
            AuditAction::StateChange,
            Some(old_state),
            Some(target.as_str().to_string()),
            actor,
            ctx.reason,
        )?;

        if !complaint.check_time_monotonicity() {
            return Err(GrvError::Internal(anyhow::anyhow!(
                "complaint {complaint_id} violated time monotonicity after transition"
            )));
        }

        Ok(complaint)
    }

    /// Reassign an IN_PROGRESS complaint to a different staff member
    /// without a state change (spec §4.1: logged as ASSIGNMENT, not
    /// STATE_CHANGE).
    pub fn reassign(
        &mut self,
        complaint_id: ComplaintId,
        actor: Actor,
        new_staff_id: UserId,
    ) -> GrvResult<Complaint> {
        let mut complaint = self.store.get_complaint(complaint_id)?;
        if complaint.state != ComplaintState::InProgress {
            return Err(GrvError::InvalidInput(
                "can only reassign an IN_PROGRESS complaint".into(),
            ));
        }
        if !matches!(actor.role, Role::DeptHead | Role::Admin | Role::SuperAdmin) {
            return Err(GrvError::Forbidden("not authorized to reassign".into()));
        }
        let old_staff = complaint.assigned_staff_id;
        complaint.assigned_staff_id = Some(new_staff_id);
        let complaint = self.store.update_complaint_cas(&complaint)?;
        self.audit(
            complaint_id,
            AuditAction::Assignment,
            old_staff.map(|s| s.to_string()),
            Some(new_staff_id.to_string()),
            actor,
            None,
        )?;
        Ok(complaint)
    }

    /// Admin manual routing: change category/department in any non-terminal
    /// state, reset `needs_manual_routing`, recompute SLA keeping the
    /// original filed time (spec §4.1, §4.3).
    pub fn route(
        &mut self,
        complaint_id: ComplaintId,
        actor: Actor,
        category_id: i64,
        department_id: i64,
    ) -> GrvResult<Complaint> {
        if !matches!(actor.role, Role::Admin | Role::SuperAdmin) {
            return Err(GrvError::Forbidden("not authorized to route".into()));
        }
        let mut complaint = self.store.get_complaint(complaint_id)?;
        if complaint.state.is_terminal() {
            return Err(GrvError::InvalidStateTransition {
                complaint_id,
                from: complaint.state,
                to: complaint.state,
            });
        }
        let old = format!(
            "category={:?},department={:?}",
            complaint.category_id, complaint.department_id
        );
        let sla_days = self
            .refdata
            .sla_days(category_id, Some(department_id), complaint.priority)
            .map_err(|e| GrvError::Internal(e))?
            .unwrap_or(DEFAULT_SLA_DAYS);
        let old_deadline = complaint.sla_deadline;
        complaint.category_id = Some(category_id);
        complaint.department_id = Some(department_id);
        complaint.needs_manual_routing = false;
        complaint.sla_days = sla_days;
        complaint.sla_deadline = complaint.created_at + Duration::days(sla_days);
        let new = format!("category={category_id},department={department_id}");
        let complaint = self.store.update_complaint_cas(&complaint)?;
        self.audit(
            complaint_id,
            AuditAction::Routing,
            Some(old),
            Some(new),
            actor,
            None,
        )?;
        if complaint.sla_deadline != old_deadline {
            self.audit(
                complaint_id,
                AuditAction::SlaUpdate,
                Some(old_deadline.to_rfc3339()),
                Some(complaint.sla_deadline.to_rfc3339()),
                actor,
                None,
            )?;
        }
        Ok(complaint)
    }

    /// Append a free-standing audit entry not tied to a state transition
    /// (spec §4.4: proof uploads and sign-offs are audited but don't move
    /// `state`). Used by the resolution subsystem.
    pub fn record_event(
        &mut self,
        complaint_id: ComplaintId,
        action: AuditAction,
        old_value: Option<String>,
        new_value: Option<String>,
        actor: Actor,
        reason: Option<String>,
    ) -> GrvResult<()> {
        self.audit(complaint_id, action, old_value, new_value, actor, reason)
    }

    /// SYSTEM-actor escalation: raise the complaint's escalation level by
    /// exactly one step and bump priority (spec §4.3). Distinct from
    /// `apply_transition` because it mutates `escalation_level`, not
    /// `state` — driven only by the scheduler.
    pub fn escalate(&mut self, complaint_id: ComplaintId) -> GrvResult<Complaint> {
        let mut complaint = self.store.get_complaint(complaint_id)?;
        let from_level = complaint.escalation_level;
        let to_level = from_level.next().ok_or_else(|| {
            GrvError::InvalidInput(format!(
                "complaint {complaint_id} already at top escalation level"
            ))
        })?;
        complaint.escalation_level = to_level;
        complaint.priority = complaint.priority.bump();
        let complaint = self.store.update_complaint_cas(&complaint)?;

        let now = self.clock.now();
        let event = EscalationEvent {
            complaint_id,
            from_level,
            to_level,
            triggered_at: now,
            reason: escalation_reason(to_level).as_str().to_string(),
            notified_role: escalation_notified_role(to_level).as_str().to_string(),
        };
        let audit_entry = AuditEntry {
            id: None,
            entity_type: "complaint".to_string(),
            entity_id: complaint_id,
            action: AuditAction::Escalation,
            old_value: Some(from_level.as_str().to_string()),
            new_value: Some(to_level.as_str().to_string()),
            actor_id: 0,
            actor_kind: ActorKind::System,
            reason: Some(escalation_reason(to_level).as_str().to_string()),
            created_at: now,
        };
        self.store.transaction(|tx| {
            crate::store::append_escalation_event(tx, &event)?;
            crate::store::append_audit(tx, &audit_entry).map(|_| ())
        })?;
        Ok(complaint)
    }

    /// Clear a complaint's scheduler failure streak after a successful pass.
    pub fn reset_scheduler_failure(&mut self, complaint_id: ComplaintId) -> GrvResult<Complaint> {
        let mut complaint = self.store.get_complaint(complaint_id)?;
        if complaint.scheduler_failure_count == 0 {
            return Ok(complaint);
        }
        complaint.scheduler_failure_count = 0;
        self.store.update_complaint_cas(&complaint)
    }

    /// Record a failed scheduler attempt on this complaint; audits every
    /// failure as a SUSPENSION, and flags `needs_manual_attention` once
    /// consecutive failures reach the configured limit (spec §7).
    pub fn record_scheduler_failure(&mut self, complaint_id: ComplaintId) -> GrvResult<Complaint> {
        let mut complaint = self.store.get_complaint(complaint_id)?;
        complaint.scheduler_failure_count += 1;
        let newly_flagged = !complaint.needs_manual_attention
            && complaint.scheduler_failure_count >= self.scheduler_failure_limit as i64;
        if newly_flagged {
            complaint.needs_manual_attention = true;
        }
        let complaint = self.store.update_complaint_cas(&complaint)?;
        self.audit(
            complaint_id,
            AuditAction::Suspension,
            None,
            Some(complaint.scheduler_failure_count.to_string()),
            Actor::system(),
            Some(SystemReason::SchedulerRetrySkipped.as_str().to_string()),
        )?;
        if newly_flagged {
            self.audit(
                complaint_id,
                AuditAction::Comment,
                None,
                Some("needs_manual_attention=true".to_string()),
                Actor::system(),
                Some(SystemReason::SchedulerRetrySkipped.as_str().to_string()),
            )?;
        }
        Ok(complaint)
    }

    fn check_guard(
        &self,
        from: ComplaintState,
        to: ComplaintState,
        complaint: &Complaint,
        actor: Actor,
        ctx: &TransitionContext,
    ) -> GrvResult<()> {
        use ComplaintState::*;
        match (from, to) {
            (Filed, InProgress) => {
                if ctx.assignee.is_none() && actor.role != Role::Staff {
                    return Err(GrvError::InvalidInput(
                        "assignment required to start work".into(),
                    ));
                }
            }
            (Filed, Hold) | (InProgress, Hold) | (InProgress, Cancelled) => {
                if ctx.reason.as_deref().unwrap_or("").trim().is_empty() {
                    return Err(GrvError::InvalidInput("reason required".into()));
                }
            }
            (InProgress, Resolved) => {
                if self.store.active_proof(complaint.id)?.is_none() {
                    return Err(GrvError::ProofRequired {
                        complaint_id: complaint.id,
                    });
                }
            }
            (Resolved, Closed) => {
                let citizen_ok = actor.role == Role::Citizen
                    && self
                        .store
                        .latest_signoff(complaint.id)?
                        .map(|s| s.accepted)
                        .unwrap_or(false);
                let system_ok = actor.kind() == ActorKind::System
                    && complaint
                        .resolved_at
                        .map(|r| r + self.auto_close_window <= self.clock.now())
                        .unwrap_or(false);
                if !citizen_ok && !system_ok {
                    return Err(GrvError::InvalidInput(
                        "closing requires citizen acceptance or an elapsed auto-close window"
                            .into(),
                    ));
                }
            }
            (Resolved, InProgress) => {
                if !ctx.dispute_approved {
                    return Err(GrvError::InvalidInput(
                        "an approved dispute is required to reopen".into(),
                    ));
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn audit(
        &mut self,
        complaint_id: ComplaintId,
        action: AuditAction,
        old_value: Option<String>,
        new_value: Option<String>,
        actor: Actor,
        reason: Option<String>,
    ) -> GrvResult<()> {
        let entry = AuditEntry {
            id: None,
            entity_type: "complaint".to_string(),
            entity_id: complaint_id,
            action,
            old_value,
            new_value,
            actor_id: actor.user_id,
            actor_kind: actor.kind(),
            reason,
            created_at: self.clock.now(),
        };
        self.store
            .transaction(|tx| crate::store::append_audit(tx, &entry).map(|_| ()))
    }
}

/// The reserved SYSTEM reason recorded for each escalation step (spec §9).
fn escalation_reason(level: EscalationLevel) -> SystemReason {
    match level {
        EscalationLevel::None | EscalationLevel::Staff => SystemReason::SlaBreachReminder,
        EscalationLevel::DeptHead => SystemReason::EscalatedToDeptHead,
        EscalationLevel::Admin => SystemReason::EscalatedToAdmin,
        EscalationLevel::Commissioner => SystemReason::EscalatedToCommissioner,
    }
}

/// The role notified at each escalation level (spec §4.3).
fn escalation_notified_role(level: EscalationLevel) -> Role {
    match level {
        EscalationLevel::None | EscalationLevel::Staff => Role::Staff,
        EscalationLevel::DeptHead => Role::DeptHead,
        EscalationLevel::Admin => Role::Admin,
        EscalationLevel::Commissioner => Role::Commissioner,
    }
}

const DEFAULT_SLA_DAYS: i64 = 7;

const ALL_STATES: [ComplaintState; 6] = [
    ComplaintState::Filed,
    ComplaintState::InProgress,
    ComplaintState::Resolved,
    ComplaintState::Closed,
    ComplaintState::Cancelled,
    ComplaintState::Hold,
];

struct TransitionRule {
    roles: &'static [Role],
}

/// The legal (from, to, allowed-roles) table of spec §4.1. `SYSTEM` actors
/// bypass the role check entirely (see `apply_transition`) but still go
/// through `check_guard`.
fn transition_rule(from: ComplaintState, to: ComplaintState) -> Option<TransitionRule> {
    use ComplaintState::*;
    use Role::*;
    let roles: &'static [Role] = match (from, to) {
        (Filed, InProgress) => &[Staff, DeptHead, Admin, SuperAdmin],
        (Filed, Cancelled) => &[Citizen, Admin, SuperAdmin],
        (Filed, Hold) => &[DeptHead, Admin, SuperAdmin],
        (InProgress, Resolved) => &[Staff, DeptHead],
        (InProgress, Hold) => &[DeptHead, Admin],
        (InProgress, Cancelled) => &[Admin, SuperAdmin],
        (Resolved, Closed) => &[Citizen],
        (Resolved, InProgress) => &[DeptHead],
        (Hold, InProgress) => &[DeptHead, Admin],
        (Hold, Cancelled) => &[Admin, SuperAdmin],
        _ => return None,
    };
    Some(TransitionRule { roles })
}
