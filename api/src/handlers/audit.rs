//! `GET /audit` (spec §4.6, §6): entity/action/actor-scoped audit queries,
//! restricted to the roles spec §7 says see the full taxonomy.

use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use grievance_core::audit::{AuditAction, AuditEntry};
use grievance_core::error::GrvError;
use grievance_core::types::{ComplaintId, Role};
use serde::Deserialize;

use crate::auth::AuthContext;
use crate::error::ApiResult;
use crate::handlers::require_role;
use crate::state::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct AuditQuery {
    pub entity: Option<String>,
    pub id: Option<ComplaintId>,
    pub action: Option<String>,
    pub actor_id: Option<i64>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

/// `GET /audit?entity=complaint&id=…` / `?action=ESCALATION&…` /
/// `?actor_id=…` (spec §6) — exactly one query shape per request.
pub async fn list_audit(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(q): Query<AuditQuery>,
) -> ApiResult<Json<Vec<AuditEntry>>> {
    require_role(&auth, &[Role::Admin, Role::Commissioner, Role::SuperAdmin, Role::DeptHead])?;

    let entries = state
        .with_engine(move |engine| {
            if let (Some(entity), Some(id)) = (q.entity.clone(), q.id) {
                engine.store().audit_for_entity(&entity, id)
            } else if let Some(action_str) = q.action.clone() {
                let action = AuditAction::parse(&action_str)
                    .ok_or_else(|| GrvError::InvalidInput(format!("unknown action '{action_str}'")))?;
                let now = engine.clock().now();
                let since = q.since.unwrap_or(now - chrono::Duration::days(365));
                let until = q.until.unwrap_or(now);
                engine.store().audit_by_action(action, since, until)
            } else if let Some(actor_id) = q.actor_id {
                engine.store().audit_by_actor(actor_id)
            } else {
                Err(GrvError::InvalidInput(
                    "one of entity+id, action, or actor_id is required".into(),
                ))
            }
        })
        .await?;
    Ok(Json(entries))
}
