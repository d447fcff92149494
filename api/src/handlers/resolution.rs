//! Proof upload, citizen sign-off, and dispute review endpoints (spec
//! §4.4, §6).

use axum::extract::{Path, State};
use axum::Json;
use grievance_core::domain::{CitizenSignoff, ResolutionProof};
use grievance_core::resolution::{DisputeDecision, SignoffDecision};
use grievance_core::types::ComplaintId;
use serde::Deserialize;

use crate::auth::AuthContext;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UploadProofRequest {
    pub image_handle: String,
    pub latitude: f64,
    pub longitude: f64,
    pub remarks: String,
}

/// `POST /complaints/{id}/proof` (spec §4.4, §6).
pub async fn upload_proof(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<ComplaintId>,
    Json(body): Json<UploadProofRequest>,
) -> ApiResult<Json<ResolutionProof>> {
    let actor = auth.actor();
    let resolution = state.resolution.clone();
    let proof = state
        .with_engine(move |engine| {
            resolution.upload_proof(
                engine,
                id,
                actor,
                body.image_handle,
                body.latitude,
                body.longitude,
                body.remarks,
            )
        })
        .await?;
    Ok(Json(proof))
}

#[derive(Debug, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum SignoffRequest {
    Accept { rating: Option<i64> },
    Dispute {
        reason: String,
        counter_proof_handle: Option<String>,
    },
}

impl From<SignoffRequest> for SignoffDecision {
    fn from(req: SignoffRequest) -> Self {
        match req {
            SignoffRequest::Accept { rating } => SignoffDecision::Accept { rating },
            SignoffRequest::Dispute {
                reason,
                counter_proof_handle,
            } => SignoffDecision::Dispute {
                reason,
                counter_proof_handle,
            },
        }
    }
}

/// `POST /complaints/{id}/signoff` (spec §4.4, §6).
pub async fn submit_signoff(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<ComplaintId>,
    Json(body): Json<SignoffRequest>,
) -> ApiResult<Json<CitizenSignoff>> {
    let actor = auth.actor();
    let resolution = state.resolution.clone();
    let decision: SignoffDecision = body.into();
    let signoff = state
        .with_engine(move |engine| resolution.submit_signoff(engine, id, actor, decision))
        .await?;
    Ok(Json(signoff))
}

#[derive(Debug, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum DisputeReviewRequest {
    Approve,
    Reject { reason: String },
}

impl From<DisputeReviewRequest> for DisputeDecision {
    fn from(req: DisputeReviewRequest) -> Self {
        match req {
            DisputeReviewRequest::Approve => DisputeDecision::Approve,
            DisputeReviewRequest::Reject { reason } => DisputeDecision::Reject { reason },
        }
    }
}

/// `POST /complaints/{id}/dispute/{signoff_id}/review` (spec §4.4, §6). The
/// path's `signoff_id` identifies which dispute the caller intends to
/// review; the service itself resolves the single pending dispute for the
/// complaint, so a mismatched id surfaces as `INVALID_INPUT` rather than
/// silently acting on the wrong one.
pub async fn review_dispute(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((id, signoff_id)): Path<(ComplaintId, i64)>,
    Json(body): Json<DisputeReviewRequest>,
) -> ApiResult<Json<CitizenSignoff>> {
    let actor = auth.actor();
    let resolution = state.resolution.clone();
    let decision: DisputeDecision = body.into();
    let signoff = state
        .with_engine(move |engine| {
            let pending = engine
                .store()
                .latest_signoff(id)?
                .ok_or(grievance_core::error::GrvError::NotFound {
                    entity: "citizen_signoff",
                    id: signoff_id.to_string(),
                })?;
            if pending.id != signoff_id {
                return Err(grievance_core::error::GrvError::InvalidInput(
                    "signoff_id does not match the pending dispute".into(),
                ));
            }
            resolution.review_dispute(engine, id, actor, decision)
        })
        .await?;
    Ok(Json(signoff))
}
