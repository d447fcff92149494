//! SLA & Escalation Scheduler (C7) — the clock-driven task that scans
//! every open complaint for SLA breaches and drives graduated escalation
//! (spec §4.3), plus the auto-close sweep for complaints citizens never
//! act on (spec §4.1).
//!
//! RULE: the scheduler never touches `SimStore` directly — every mutation
//! flows through `LifecycleEngine`, so the audit trail stays complete
//! regardless of who drove the transition.

use crate::audit::SystemReason;
use crate::clock::Clock;
use crate::config::EscalationThresholds;
use crate::domain::Complaint;
use crate::error::GrvError;
use crate::lifecycle::{LifecycleEngine, TransitionContext};
use crate::types::{Actor, ComplaintState};

/// Summary of one scheduler pass, for logging and tests (spec §8).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub escalated: usize,
    pub auto_closed: usize,
    pub skipped_conflicts: usize,
    pub flagged_manual_attention: usize,
}

pub struct Scheduler {
    thresholds: EscalationThresholds,
}

impl Scheduler {
    pub fn new(thresholds: EscalationThresholds) -> Self {
        Self { thresholds }
    }

    /// Run one tick: escalate overdue complaints in deterministic order,
    /// then auto-close resolved complaints past their window. Each
    /// complaint's outcome is isolated from the others' (spec §7).
    pub fn tick<C: Clock>(&self, engine: &mut LifecycleEngine<C>) -> Result<TickReport, GrvError> {
        let mut report = TickReport::default();
        let now = engine.clock().now();

        // FILED/IN_PROGRESS/HOLD only — RESOLVED complaints are handled by
        // the auto-close sweep below, not the escalation ladder.
        let mut candidates: Vec<Complaint> = engine
            .store()
            .overdue_complaints(now)?
            .into_iter()
            .filter(|c| {
                matches!(
                    c.state,
                    ComplaintState::Filed | ComplaintState::InProgress | ComplaintState::Hold
                )
            })
            .collect();
        candidates.sort_by(|a, b| {
            a.escalation_level
                .cmp(&b.escalation_level)
                .then(a.sla_deadline.cmp(&b.sla_deadline))
                .then(a.id.cmp(&b.id))
        });

        for complaint in candidates {
            let days_overdue = (now - complaint.sla_deadline).num_days();
            let required = self.thresholds.required_level(days_overdue);
            if required <= complaint.escalation_level {
                continue;
            }
            let outcome = engine.escalate(complaint.id);
            self.record_outcome(engine, complaint.id, outcome, &mut report);
        }

        let cutoff = now - engine.auto_close_window();
        for complaint in engine.store().resolved_past(cutoff)? {
            let outcome = engine.apply_transition(
                complaint.id,
                ComplaintState::Closed,
                Actor::system(),
                TransitionContext {
                    reason: Some(SystemReason::AutoClosedAfterWindow.as_str().to_string()),
                    ..Default::default()
                },
            );
            self.record_outcome(engine, complaint.id, outcome, &mut report);
        }

        Ok(report)
    }

    fn record_outcome<C: Clock>(
        &self,
        engine: &mut LifecycleEngine<C>,
        complaint_id: i64,
        outcome: Result<Complaint, GrvError>,
        report: &mut TickReport,
    ) {
        match outcome {
            Ok(complaint) => {
                if complaint.state == ComplaintState::Closed {
                    report.auto_closed += 1;
                } else {
                    report.escalated += 1;
                }
                let _ = engine.reset_scheduler_failure(complaint_id);
            }
            Err(GrvError::Conflict { .. }) => {
                report.skipped_conflicts += 1;
            }
            Err(_) => {
                if let Ok(c) = engine.record_scheduler_failure(complaint_id) {
                    if c.needs_manual_attention {
                        report.flagged_manual_attention += 1;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::VirtualClock;
    use crate::lifecycle::FileComplaint;
    use crate::refdata::ReferenceDataReader;
    use crate::store::SimStore;
    use crate::types::{Priority, Role};
    use chrono::{Duration, Utc};
    use std::sync::Arc;

    fn engine() -> (LifecycleEngine<VirtualClock>, VirtualClock) {
        let store = SimStore::in_memory().unwrap();
        store.migrate().unwrap();
        let refdata_store = store.reopen().unwrap();
        let clock = VirtualClock::at(Utc::now());
        let refdata = Arc::new(ReferenceDataReader::new(
            refdata_store,
            std::time::Duration::from_secs(60),
        ));
        (
            LifecycleEngine::new(store, clock.clone(), refdata, 0.7, Duration::days(7), 0.5, 3),
            clock,
        )
    }

    fn staff(id: i64) -> Actor {
        Actor {
            user_id: id,
            role: Role::Staff,
            department_id: Some(10),
        }
    }

    #[test]
    fn escalation_ladder_advances_one_step_per_tick_without_skipping() {
        let (mut engine, clock) = engine();
        let scheduler = Scheduler::new(EscalationThresholds::default());

        let complaint = engine
            .file_complaint(FileComplaint {
                citizen_id: 1,
                title: "Burst pipe".into(),
                description: "Water main burst".into(),
                location: "Sector 9".into(),
                latitude: None,
                longitude: None,
                category_id: Some(1),
                department_id: Some(10),
                priority: Priority::Low,
                ai_confidence: 0.95,
                ai_reasoning: "matched 'burst pipe'".into(),
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

        // Force a short SLA so the very first tick is already overdue.
        let mut c = engine.store().get_complaint(complaint.id).unwrap();
        c.sla_deadline = clock.now() - Duration::days(2);
        let c = engine.store_mut().update_complaint_cas(&c).unwrap();
        assert_eq!(c.escalation_level, crate::types::EscalationLevel::None);

        clock.advance(Duration::days(3));
        let report = scheduler.tick(&mut engine).unwrap();
        assert_eq!(report.escalated, 1);
        let c = engine.store().get_complaint(complaint.id).unwrap();
        assert_eq!(c.escalation_level, crate::types::EscalationLevel::DeptHead);
        assert_eq!(c.priority, Priority::Medium);

        // Advance far past every threshold: the ladder still climbs one
        // step per tick, never skipping a level.
        clock.advance(Duration::days(5));
        let report = scheduler.tick(&mut engine).unwrap();
        assert_eq!(report.escalated, 1);
        let c = engine.store().get_complaint(complaint.id).unwrap();
        assert_eq!(c.escalation_level, crate::types::EscalationLevel::Admin);

        let report = scheduler.tick(&mut engine).unwrap();
        assert_eq!(report.escalated, 1);
        let c = engine.store().get_complaint(complaint.id).unwrap();
        assert_eq!(
            c.escalation_level,
            crate::types::EscalationLevel::Commissioner
        );
        assert_eq!(c.priority, Priority::Critical);

        // Idempotent: a further tick at the same virtual time does nothing.
        let report = scheduler.tick(&mut engine).unwrap();
        assert_eq!(report.escalated, 0);
    }

    #[test]
    fn auto_close_sweep_closes_resolved_past_the_window() {
        let (mut engine, clock) = engine();
        let scheduler = Scheduler::new(EscalationThresholds::default());

        let complaint = engine
            .file_complaint(FileComplaint {
                citizen_id: 1,
                title: "Pothole".into(),
                description: "Pothole on the highway".into(),
                location: "NH48".into(),
                latitude: None,
                longitude: None,
                category_id: Some(1),
                department_id: Some(10),
                priority: Priority::Low,
                ai_confidence: 0.95,
                ai_reasoning: "matched 'pothole'".into(),
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
        let proof = crate::domain::ResolutionProof {
            id: 0,
            complaint_id: complaint.id,
            image_handle: "img-1".into(),
            captured_at: clock.now(),
            latitude: 12.9,
            longitude: 77.5,
            staff_id: 5,
            remarks: "fixed".into(),
            verified: false,
            archived: false,
        };
        engine
            .store_mut()
            .transaction(|tx| crate::store::insert_proof(tx, &proof).map(|_| ()))
            .unwrap();
        engine
            .apply_transition(
                complaint.id,
                ComplaintState::Resolved,
                staff(5),
                TransitionContext::default(),
            )
            .unwrap();

        clock.advance(Duration::days(8));
        let report = scheduler.tick(&mut engine).unwrap();
        assert_eq!(report.auto_closed, 1);
        let c = engine.store().get_complaint(complaint.id).unwrap();
        assert_eq!(c.state, ComplaintState::Closed);
    }
}
