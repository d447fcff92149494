//! Proof → sign-off → dispute-review handler tests (spec §4.4, §6).

use axum::extract::{Path, State};
use axum::Json;
use grievance_api::auth::AuthContext;
use grievance_api::config::ApiConfig;
use grievance_api::handlers::complaints::{self, ApplyStateRequest, CreateComplaintRequest};
use grievance_api::handlers::resolution::{
    review_dispute, submit_signoff, upload_proof, DisputeReviewRequest, SignoffRequest,
    UploadProofRequest,
};
use grievance_api::state::AppState;
use grievance_core::config::ReferenceCatalog;
use grievance_core::store::SimStore;
use grievance_core::types::{ComplaintState, Role};

fn temp_db_path(tag: &str) -> String {
    static COUNTER: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    std::env::temp_dir()
        .join(format!("grievance-api-test-{tag}-{}-{n}.db", std::process::id()))
        .to_string_lossy()
        .into_owned()
}

fn test_state(tag: &str) -> AppState {
    let db_path = temp_db_path(tag);
    let seed_store = SimStore::open(&db_path).expect("open seed store");
    seed_store.migrate().expect("migrate");
    let catalog = ReferenceCatalog::default_test();
    seed_store
        .seed_categories(&catalog.categories.values().cloned().collect::<Vec<_>>())
        .expect("seed categories");
    seed_store
        .seed_departments(&catalog.departments.values().cloned().collect::<Vec<_>>())
        .expect("seed departments");
    drop(seed_store);

    AppState::new(ApiConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        db_path,
        scheduler_interval_secs: 300,
        auto_close_window_days: 7,
        dispute_sla_fraction: 0.5,
        classifier_deadline_secs: 5,
        routing_confidence_threshold: 0.7,
        scheduler_failure_limit: 3,
        refdata_cache_ttl_secs: 60,
        intake_rate_limit_capacity: 5,
        intake_rate_limit_refill_per_sec: 0.5,
        session_ttl_secs: 1800,
        request_timeout_secs: 10,
    })
    .expect("build app state")
}

fn citizen(id: i64) -> AuthContext {
    AuthContext {
        user_id: id,
        role: Role::Citizen,
        department_id: None,
    }
}

fn staff(id: i64, department_id: i64) -> AuthContext {
    AuthContext {
        user_id: id,
        role: Role::Staff,
        department_id: Some(department_id),
    }
}

fn dept_head(id: i64, department_id: i64) -> AuthContext {
    AuthContext {
        user_id: id,
        role: Role::DeptHead,
        department_id: Some(department_id),
    }
}

/// Files a pothole complaint as citizen 1 and starts work as `staff_id`,
/// landing it IN_PROGRESS and assigned — the precondition every
/// resolution-flow test starts from.
async fn in_progress_complaint(state: &AppState, staff_id: i64) -> i64 {
    let filed = complaints::create_complaint(
        State(state.clone()),
        citizen(1),
        Json(CreateComplaintRequest {
            title: "Pothole on Main St".to_string(),
            description: "Large pothole causing traffic to swerve".to_string(),
            location: "Main St near the market".to_string(),
            latitude: None,
            longitude: None,
            image_handle: None,
        }),
    )
    .await
    .expect("file complaint")
    .0;

    complaints::apply_state(
        State(state.clone()),
        staff(staff_id, 10),
        Path(filed.id),
        Json(ApplyStateRequest {
            target_state: "IN_PROGRESS".to_string(),
            reason: None,
            assignee: None,
        }),
    )
    .await
    .expect("start work");

    filed.id
}

#[tokio::test]
async fn accepted_signoff_lets_the_citizen_close_it() {
    let state = test_state("resolution-accept");
    let id = in_progress_complaint(&state, 55).await;

    upload_proof(
        State(state.clone()),
        staff(55, 10),
        Path(id),
        Json(UploadProofRequest {
            image_handle: "proof.jpg".to_string(),
            latitude: 12.9,
            longitude: 77.6,
            remarks: "Filled and resurfaced".to_string(),
        }),
    )
    .await
    .expect("upload proof");

    let resolved = complaints::apply_state(
        State(state.clone()),
        staff(55, 10),
        Path(id),
        Json(ApplyStateRequest {
            target_state: "RESOLVED".to_string(),
            reason: None,
            assignee: None,
        }),
    )
    .await
    .expect("resolve")
    .0;
    assert_eq!(resolved.state, ComplaintState::Resolved);

    let signoff = submit_signoff(
        State(state.clone()),
        citizen(1),
        Path(id),
        Json(SignoffRequest::Accept { rating: Some(5) }),
    )
    .await
    .expect("citizen accepts")
    .0;
    assert!(signoff.accepted);
    assert!(!signoff.disputed);

    // Accepting sign-off closes the complaint in the same call (spec
    // §4.4) — no separate `apply_state` to CLOSED is needed or allowed.
    let complaint = complaints::get_complaint(State(state), citizen(1), Path(id))
        .await
        .expect("read back")
        .0;
    assert_eq!(complaint.state, ComplaintState::Closed);
}

#[tokio::test]
async fn resolving_without_proof_is_rejected() {
    let state = test_state("resolution-no-proof");
    let id = in_progress_complaint(&state, 55).await;

    let err = complaints::apply_state(
        State(state),
        staff(55, 10),
        Path(id),
        Json(ApplyStateRequest {
            target_state: "RESOLVED".to_string(),
            reason: None,
            assignee: None,
        }),
    )
    .await
    .expect_err("resolving without an active proof must fail");
    assert_eq!(err.0.kind(), "PROOF_REQUIRED");
}

#[tokio::test]
async fn an_approved_dispute_reopens_the_complaint() {
    let state = test_state("resolution-dispute");
    let id = in_progress_complaint(&state, 55).await;

    upload_proof(
        State(state.clone()),
        staff(55, 10),
        Path(id),
        Json(UploadProofRequest {
            image_handle: "proof.jpg".to_string(),
            latitude: 12.9,
            longitude: 77.6,
            remarks: "Filled and resurfaced".to_string(),
        }),
    )
    .await
    .expect("upload proof");

    complaints::apply_state(
        State(state.clone()),
        staff(55, 10),
        Path(id),
        Json(ApplyStateRequest {
            target_state: "RESOLVED".to_string(),
            reason: None,
            assignee: None,
        }),
    )
    .await
    .expect("resolve");

    let disputed = submit_signoff(
        State(state.clone()),
        citizen(1),
        Path(id),
        Json(SignoffRequest::Dispute {
            reason: "Pothole is still there".to_string(),
            counter_proof_handle: Some("counter.jpg".to_string()),
        }),
    )
    .await
    .expect("citizen disputes")
    .0;
    assert!(disputed.disputed);

    let reviewed = review_dispute(
        State(state.clone()),
        dept_head(200, 10),
        Path((id, disputed.id)),
        Json(DisputeReviewRequest::Approve),
    )
    .await
    .expect("dept head approves the dispute")
    .0;
    assert_eq!(reviewed.approved, Some(true));

    let complaint = complaints::get_complaint(State(state), dept_head(200, 10), Path(id))
        .await
        .expect("read back")
        .0;
    assert_eq!(complaint.state, ComplaintState::InProgress);
    assert_eq!(complaint.priority.as_str(), "HIGH");
}
