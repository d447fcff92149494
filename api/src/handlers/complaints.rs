//! Complaint create/read/list/transition endpoints (spec §4.7, §6).

use axum::extract::{Path, Query, State};
use axum::Json;
use grievance_core::classifier::ClassifyRequest;
use grievance_core::domain::Complaint;
use grievance_core::error::GrvError;
use grievance_core::lifecycle::{FileComplaint, TransitionContext};
use grievance_core::store::ComplaintFilter;
use grievance_core::types::{ComplaintId, ComplaintState, Role, UserId};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::auth::AuthContext;
use crate::error::ApiResult;
use crate::handlers::require_role;
use crate::state::AppState;

fn check_ownership(auth: &AuthContext, complaint: &Complaint) -> Result<(), GrvError> {
    match auth.role {
        Role::Citizen if auth.user_id != complaint.citizen_id => Err(GrvError::Forbidden(
            "citizens may only access their own complaints".into(),
        )),
        Role::DeptHead
            if complaint.department_id.is_some() && auth.department_id != complaint.department_id =>
        {
            Err(GrvError::Forbidden(
                "department heads may only access complaints in their own department".into(),
            ))
        }
        _ => Ok(()),
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateComplaintRequest {
    pub title: String,
    pub description: String,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub image_handle: Option<String>,
}

/// `POST /complaints` (spec §6): citizens file directly through this
/// endpoint rather than the conversational intake webhook; both commit
/// through the same classifier contract and `LifecycleEngine::file_complaint`.
pub async fn create_complaint(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<CreateComplaintRequest>,
) -> ApiResult<Json<Complaint>> {
    require_role(&auth, &[Role::Citizen])?;
    if body.title.trim().is_empty() || body.description.trim().is_empty() || body.location.trim().is_empty()
    {
        return Err(GrvError::InvalidInput("title, description, and location are required".into()).into());
    }

    let classify_request = ClassifyRequest {
        title: body.title.clone(),
        description: body.description.clone(),
        location: Some(body.location.clone()),
        image_analysis: None,
    };
    let result = state.classifier.classify(&classify_request);

    let input = FileComplaint {
        citizen_id: auth.user_id,
        title: body.title,
        description: body.description,
        location: body.location,
        latitude: body.latitude,
        longitude: body.longitude,
        category_id: result.category_id,
        department_id: result.department_id,
        priority: result.priority,
        ai_confidence: result.confidence,
        ai_reasoning: result.reasoning,
        image_handle: body.image_handle,
        image_analysis: None,
    };
    let complaint = state.with_engine(move |engine| engine.file_complaint(input)).await?;
    Ok(Json(complaint))
}

/// `GET /complaints/{id}` (spec §6).
pub async fn get_complaint(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<ComplaintId>,
) -> ApiResult<Json<Complaint>> {
    let complaint = state.with_engine(move |engine| engine.store().get_complaint(id)).await?;
    check_ownership(&auth, &complaint)?;
    Ok(Json(complaint))
}

#[derive(Debug, Deserialize, Default)]
pub struct ListQuery {
    pub state: Option<String>,
}

/// `GET /complaints` — list-by-role (spec §4.7, §6): the filter is scoped
/// to the caller's own complaints/assignment/department, never the whole
/// table, except for ADMIN/COMMISSIONER/SUPER_ADMIN.
pub async fn list_complaints(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(q): Query<ListQuery>,
) -> ApiResult<Json<Vec<Complaint>>> {
    let parsed_state = match &q.state {
        Some(s) => Some(
            ComplaintState::parse(s)
                .ok_or_else(|| GrvError::InvalidInput(format!("unknown state '{s}'")))?,
        ),
        None => None,
    };
    let mut filter = ComplaintFilter {
        state: parsed_state,
        ..Default::default()
    };
    match auth.role {
        Role::Citizen => filter.citizen_id = Some(auth.user_id),
        Role::Staff => filter.assigned_staff_id = Some(auth.user_id),
        Role::DeptHead => filter.department_id = auth.department_id,
        Role::Admin | Role::Commissioner | Role::SuperAdmin => {}
    }
    let complaints = state
        .with_engine(move |engine| engine.store().list_complaints(&filter))
        .await?;
    Ok(Json(complaints))
}

/// `GET /complaints/pending-routing` (spec §6, admin only).
pub async fn pending_routing(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<Complaint>>> {
    require_role(&auth, &[Role::Admin, Role::SuperAdmin])?;
    let filter = ComplaintFilter {
        needs_manual_routing: Some(true),
        ..Default::default()
    };
    let complaints = state
        .with_engine(move |engine| engine.store().list_complaints(&filter))
        .await?;
    Ok(Json(complaints))
}

/// `GET /complaints/pending-routing/count` (spec §6, admin only).
pub async fn pending_routing_count(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<Value>> {
    require_role(&auth, &[Role::Admin, Role::SuperAdmin])?;
    let filter = ComplaintFilter {
        needs_manual_routing: Some(true),
        ..Default::default()
    };
    let count = state
        .with_engine(move |engine| engine.store().list_complaints(&filter).map(|v| v.len()))
        .await?;
    Ok(Json(json!({ "count": count })))
}

#[derive(Debug, Deserialize)]
pub struct ApplyStateRequest {
    pub target_state: String,
    pub reason: Option<String>,
    pub assignee: Option<UserId>,
}

/// `POST /complaints/{id}/state` (spec §6): the one endpoint through which
/// cancel/resolve/close/start-work all flow, since they're all
/// `apply_transition` calls under the hood.
pub async fn apply_state(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<ComplaintId>,
    Json(body): Json<ApplyStateRequest>,
) -> ApiResult<Json<Complaint>> {
    let target = ComplaintState::parse(&body.target_state)
        .ok_or_else(|| GrvError::InvalidInput(format!("unknown state '{}'", body.target_state)))?;
    let ctx = TransitionContext {
        reason: body.reason,
        assignee: body.assignee,
        dispute_approved: false,
    };
    let actor = auth.actor();
    let complaint = state
        .with_engine(move |engine| engine.apply_transition(id, target, actor, ctx))
        .await?;
    Ok(Json(complaint))
}

#[derive(Debug, Deserialize)]
pub struct ReassignRequest {
    pub new_staff_id: UserId,
}

/// `POST /complaints/{id}/reassign` (spec §4.1, §6).
pub async fn reassign(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<ComplaintId>,
    Json(body): Json<ReassignRequest>,
) -> ApiResult<Json<Complaint>> {
    let actor = auth.actor();
    let complaint = state
        .with_engine(move |engine| engine.reassign(id, actor, body.new_staff_id))
        .await?;
    Ok(Json(complaint))
}

#[derive(Debug, Deserialize)]
pub struct RouteRequest {
    pub category_id: i64,
    pub department_id: i64,
}

/// `POST /complaints/{id}/route` (spec §6, admin only — enforced inside
/// `LifecycleEngine::route`).
pub async fn route(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<ComplaintId>,
    Json(body): Json<RouteRequest>,
) -> ApiResult<Json<Complaint>> {
    let actor = auth.actor();
    let complaint = state
        .with_engine(move |engine| engine.route(id, actor, body.category_id, body.department_id))
        .await?;
    Ok(Json(complaint))
}

/// `GET /complaints/{id}/transitions` (spec §4.7, §6): powers the UI's
/// button gating.
pub async fn transitions(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<ComplaintId>,
) -> ApiResult<Json<Vec<ComplaintState>>> {
    let actor = auth.actor();
    let states = state
        .with_engine(move |engine| engine.available_transitions(id, actor))
        .await?;
    Ok(Json(states))
}

/// `POST /complaints/{id}/upvote` — supplement (spec §9's open question on
/// upvote uniqueness, resolved at the store layer).
pub async fn upvote(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<ComplaintId>,
) -> ApiResult<Json<Value>> {
    require_role(&auth, &[Role::Citizen])?;
    let citizen_id = auth.user_id;
    let added = state
        .with_engine(move |engine| {
            let now = engine.clock().now();
            engine.store_mut().add_upvote(id, citizen_id, now)
        })
        .await?;
    Ok(Json(json!({ "upvoted": added })))
}
