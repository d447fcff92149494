//! `POST /intake/webhook` (spec §4.5, §6): the channel-shaped entry point
//! into the conversational intake state machine. The channel gateway
//! (SMS/WhatsApp/etc.) is an external collaborator that resolves a caller
//! to a `citizen_id` before forwarding the message here (spec §1
//! Non-goals: credential issuance stays external).

use axum::extract::State;
use axum::Json;
use grievance_core::domain::Complaint;
use grievance_core::intake::ConversationSession;
use grievance_core::types::UserId;
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WebhookRequest {
    pub channel: String,
    pub address: String,
    pub citizen_id: UserId,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub reply: String,
    pub filed_complaint: Option<Complaint>,
    pub complaints: Option<Vec<Complaint>>,
}

pub async fn webhook(
    State(state): State<AppState>,
    Json(body): Json<WebhookRequest>,
) -> ApiResult<Json<WebhookResponse>> {
    let intake = state.intake.clone();
    let session_ttl = chrono::Duration::seconds(state.config.session_ttl_secs);
    let channel = body.channel;
    let address = body.address;
    let citizen_id = body.citizen_id;
    let text = body.text;

    let outcome = state
        .with_engine(move |engine| {
            let now = engine.clock().now();
            let mut session = engine
                .store()
                .get_session(&channel, &address)?
                .unwrap_or_else(|| ConversationSession::new(channel.clone(), address.clone(), now, session_ttl));
            let outcome = intake.handle_message(engine, &mut session, citizen_id, &text)?;
            engine.store().upsert_session(&session)?;
            Ok(outcome)
        })
        .await?;

    Ok(Json(WebhookResponse {
        reply: outcome.reply,
        filed_complaint: outcome.filed,
        complaints: outcome.complaints,
    }))
}
