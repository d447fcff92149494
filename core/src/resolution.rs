//! Resolution & Dispute Subsystem (C8): proof upload, resolution, citizen
//! sign-off, and dispute review (spec §4.4).
//!
//! RULE: every state change here routes through `LifecycleEngine`; this
//! module only prepares proof/sign-off rows and non-transition audit
//! entries around those calls.

use crate::audit::AuditAction;
use crate::clock::Clock;
use crate::domain::{CitizenSignoff, Complaint, ResolutionProof};
use crate::error::{GrvError, GrvResult};
use crate::lifecycle::{LifecycleEngine, TransitionContext};
use crate::types::{Actor, ComplaintId, ComplaintState, Role};

/// A citizen's verdict on a RESOLVED complaint (spec §4.4).
#[derive(Debug, Clone)]
pub enum SignoffDecision {
    Accept { rating: Option<i64> },
    Dispute {
        reason: String,
        counter_proof_handle: Option<String>,
    },
}

/// A department head's decision on a pending dispute (spec §4.4).
#[derive(Debug, Clone)]
pub enum DisputeDecision {
    Approve,
    Reject { reason: String },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResolutionService;

impl ResolutionService {
    pub fn new() -> Self {
        Self
    }

    /// Attach proof of work to an IN_PROGRESS complaint. Archives any
    /// already-active proof first — at most one active proof per
    /// resolution cycle (spec §4.4).
    pub fn upload_proof<C: Clock>(
        &self,
        engine: &mut LifecycleEngine<C>,
        complaint_id: ComplaintId,
        actor: Actor,
        image_handle: String,
        latitude: f64,
        longitude: f64,
        remarks: String,
    ) -> GrvResult<ResolutionProof> {
        let complaint = engine.store().get_complaint(complaint_id)?;
        if complaint.state != ComplaintState::InProgress {
            return Err(GrvError::InvalidInput(
                "proof can only be uploaded while IN_PROGRESS".into(),
            ));
        }
        if !Self::is_assigned_or_dept_head(&complaint, actor) {
            return Err(GrvError::Forbidden(
                "only the assigned staff or department head may upload proof".into(),
            ));
        }
        let now = engine.clock().now();
        let proof = ResolutionProof {
            id: 0,
            complaint_id,
            image_handle,
            captured_at: now,
            latitude,
            longitude,
            staff_id: actor.user_id,
            remarks,
            verified: false,
            archived: false,
        };
        let had_active = engine.store().active_proof(complaint_id)?.is_some();
        let proof_id = engine.store_mut().transaction(|tx| {
            if had_active {
                crate::store::archive_active_proof(tx, complaint_id)?;
            }
            crate::store::insert_proof(tx, &proof)
        })?;
        engine.record_event(
            complaint_id,
            AuditAction::Comment,
            None,
            Some(format!("proof #{proof_id} uploaded")),
            actor,
            Some("proof_uploaded".to_string()),
        )?;
        Ok(ResolutionProof {
            id: proof_id,
            ..proof
        })
    }

    /// Mark an IN_PROGRESS complaint RESOLVED. Gated on an active proof by
    /// `LifecycleEngine`'s own guard (spec §4.4: fails `PROOF_REQUIRED`
    /// otherwise).
    pub fn resolve<C: Clock>(
        &self,
        engine: &mut LifecycleEngine<C>,
        complaint_id: ComplaintId,
        actor: Actor,
    ) -> GrvResult<Complaint> {
        engine.apply_transition(
            complaint_id,
            ComplaintState::Resolved,
            actor,
            TransitionContext::default(),
        )
    }

    /// The citizen's verdict on a RESOLVED complaint (spec §4.4). Acceptance
    /// closes the complaint; a dispute opens a pending review. There is no
    /// explicit "reject silently" action — the auto-close sweep (C7) closes
    /// complaints nobody signs off on.
    pub fn submit_signoff<C: Clock>(
        &self,
        engine: &mut LifecycleEngine<C>,
        complaint_id: ComplaintId,
        actor: Actor,
        decision: SignoffDecision,
    ) -> GrvResult<CitizenSignoff> {
        let complaint = engine.store().get_complaint(complaint_id)?;
        if complaint.state != ComplaintState::Resolved {
            return Err(GrvError::InvalidInput(
                "sign-off is only accepted while RESOLVED".into(),
            ));
        }
        if actor.role != Role::Citizen || actor.user_id != complaint.citizen_id {
            return Err(GrvError::Forbidden(
                "only the filing citizen may sign off".into(),
            ));
        }
        let now = engine.clock().now();
        let signoff = match decision {
            SignoffDecision::Accept { rating } => CitizenSignoff {
                id: 0,
                complaint_id,
                accepted: true,
                disputed: false,
                rating,
                dispute_reason: None,
                counter_proof_handle: None,
                approved: None,
                signed_at: now,
            },
            SignoffDecision::Dispute {
                reason,
                counter_proof_handle,
            } => CitizenSignoff {
                id: 0,
                complaint_id,
                accepted: false,
                disputed: true,
                rating: None,
                dispute_reason: Some(reason),
                counter_proof_handle,
                approved: None,
                signed_at: now,
            },
        };
        let signoff_id = engine
            .store_mut()
            .transaction(|tx| crate::store::insert_signoff(tx, &signoff))?;
        let signoff = CitizenSignoff {
            id: signoff_id,
            ..signoff
        };

        if signoff.accepted {
            engine.apply_transition(
                complaint_id,
                ComplaintState::Closed,
                actor,
                TransitionContext::default(),
            )?;
        } else {
            engine.record_event(
                complaint_id,
                AuditAction::Comment,
                None,
                Some(format!("dispute #{signoff_id} opened")),
                actor,
                Some("dispute_opened".to_string()),
            )?;
        }
        Ok(signoff)
    }

    /// A department head's decision on a pending dispute (spec §4.4).
    pub fn review_dispute<C: Clock>(
        &self,
        engine: &mut LifecycleEngine<C>,
        complaint_id: ComplaintId,
        actor: Actor,
        decision: DisputeDecision,
    ) -> GrvResult<CitizenSignoff> {
        if actor.role != Role::DeptHead {
            return Err(GrvError::Forbidden(
                "only a department head may review a dispute".into(),
            ));
        }
        let signoff = engine
            .store()
            .latest_signoff(complaint_id)?
            .ok_or(GrvError::NotFound {
                entity: "citizen_signoff",
                id: complaint_id.to_string(),
            })?;
        if !signoff.disputed || signoff.approved.is_some() {
            return Err(GrvError::InvalidInput(
                "no pending dispute for this complaint".into(),
            ));
        }

        match decision {
            DisputeDecision::Approve => {
                engine.store_mut().transaction(|tx| {
                    crate::store::update_signoff_review(tx, signoff.id, true)?;
                    crate::store::archive_active_proof(tx, complaint_id)
                })?;
                engine.apply_transition(
                    complaint_id,
                    ComplaintState::InProgress,
                    actor,
                    TransitionContext {
                        dispute_approved: true,
                        ..Default::default()
                    },
                )?;
                Ok(CitizenSignoff {
                    approved: Some(true),
                    ..signoff
                })
            }
            DisputeDecision::Reject { reason } => {
                engine.store_mut().transaction(|tx| {
                    crate::store::update_signoff_review(tx, signoff.id, false)
                })?;
                engine.record_event(
                    complaint_id,
                    AuditAction::Comment,
                    Some("disputed".to_string()),
                    Some("dispute_rejected".to_string()),
                    actor,
                    Some(reason),
                )?;
                Ok(CitizenSignoff {
                    approved: Some(false),
                    ..signoff
                })
            }
        }
    }

    fn is_assigned_or_dept_head(complaint: &Complaint, actor: Actor) -> bool {
        complaint.assigned_staff_id == Some(actor.user_id) || actor.role == Role::DeptHead
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::VirtualClock;
    use crate::lifecycle::FileComplaint;
    use crate::refdata::ReferenceDataReader;
    use crate::store::SimStore;
    use crate::types::{EscalationLevel, Priority};
    use chrono::{Duration, Utc};
    use std::sync::Arc;

    fn engine() -> LifecycleEngine<VirtualClock> {
        let store = SimStore::in_memory().unwrap();
        store.migrate().unwrap();
        let refdata_store = store.reopen().unwrap();
        let clock = VirtualClock::at(Utc::now());
        let refdata = Arc::new(ReferenceDataReader::new(
            refdata_store,
            std::time::Duration::from_secs(60),
        ));
        LifecycleEngine::new(store, clock, refdata, 0.7, Duration::days(7), 0.5, 3)
    }

    fn staff(id: i64) -> Actor {
        Actor {
            user_id: id,
            role: Role::Staff,
            department_id: Some(10),
        }
    }

    fn citizen(id: i64) -> Actor {
        Actor {
            user_id: id,
            role: Role::Citizen,
            department_id: None,
        }
    }

    fn dept_head(id: i64) -> Actor {
        Actor {
            user_id: id,
            role: Role::DeptHead,
            department_id: Some(10),
        }
    }

    fn file_and_start(engine: &mut LifecycleEngine<VirtualClock>) -> ComplaintId {
        let complaint = engine
            .file_complaint(FileComplaint {
                citizen_id: 1,
                title: "Broken tap".into(),
                description: "Public tap broken".into(),
                location: "Sector 3".into(),
                latitude: None,
                longitude: None,
                category_id: Some(1),
                department_id: Some(10),
                priority: Priority::Low,
                ai_confidence: 0.9,
                ai_reasoning: "matched 'tap'".into(),
                image_handle: None,
                image_analysis: None,
            })
            .unwrap();
        engine
            .apply_transition(
                complaint.id,
                ComplaintState::InProgress,
                staff(5),
                TransitionContext {
                    assignee: Some(5),
                    ..Default::default()
                },
            )
            .unwrap();
        complaint.id
    }

    #[test]
    fn resolve_without_proof_fails_then_succeeds_after_upload() {
        let mut engine = engine();
        let svc = ResolutionService::new();
        let id = file_and_start(&mut engine);

        let err = svc.resolve(&mut engine, id, staff(5)).unwrap_err();
        assert!(matches!(err, GrvError::ProofRequired { .. }));

        svc.upload_proof(
            &mut engine,
            id,
            staff(5),
            "img-1".into(),
            12.9,
            77.5,
            "fixed the tap".into(),
        )
        .unwrap();

        let complaint = svc.resolve(&mut engine, id, staff(5)).unwrap();
        assert_eq!(complaint.state, ComplaintState::Resolved);
        assert!(complaint.resolved_at.is_some());
    }

    #[test]
    fn accepted_signoff_closes_the_complaint() {
        let mut engine = engine();
        let svc = ResolutionService::new();
        let id = file_and_start(&mut engine);
        svc.upload_proof(
            &mut engine,
            id,
            staff(5),
            "img-1".into(),
            12.9,
            77.5,
            "fixed".into(),
        )
        .unwrap();
        svc.resolve(&mut engine, id, staff(5)).unwrap();

        let signoff = svc
            .submit_signoff(
                &mut engine,
                id,
                citizen(1),
                SignoffDecision::Accept { rating: Some(5) },
            )
            .unwrap();
        assert!(signoff.accepted);
        let complaint = engine.store().get_complaint(id).unwrap();
        assert_eq!(complaint.state, ComplaintState::Closed);
    }

    #[test]
    fn disputed_signoff_reopens_complaint_on_approval() {
        let mut engine = engine();
        let svc = ResolutionService::new();
        let id = file_and_start(&mut engine);
        svc.upload_proof(
            &mut engine,
            id,
            staff(5),
            "img-1".into(),
            12.9,
            77.5,
            "fixed".into(),
        )
        .unwrap();
        svc.resolve(&mut engine, id, staff(5)).unwrap();

        let signoff = svc
            .submit_signoff(
                &mut engine,
                id,
                citizen(1),
                SignoffDecision::Dispute {
                    reason: "still broken".into(),
                    counter_proof_handle: None,
                },
            )
            .unwrap();
        assert!(signoff.disputed);
        assert!(signoff.approved.is_none());

        let complaint_before = engine.store().get_complaint(id).unwrap();
        assert_eq!(complaint_before.state, ComplaintState::Resolved);

        let reviewed = svc
            .review_dispute(&mut engine, id, dept_head(7), DisputeDecision::Approve)
            .unwrap();
        assert_eq!(reviewed.approved, Some(true));
        let complaint = engine.store().get_complaint(id).unwrap();
        assert_eq!(complaint.state, ComplaintState::InProgress);
        assert_eq!(complaint.priority, Priority::Medium);
        assert_eq!(complaint.escalation_level, EscalationLevel::None);

        // The reopened cycle needs its own proof — the disputed one was
        // archived on approval (spec scenario 5).
        let err = svc.resolve(&mut engine, id, staff(5)).unwrap_err();
        assert!(matches!(err, GrvError::ProofRequired { .. }));
    }
}
