//! Router assembly (spec §4.7, §6): every endpoint nested under `/api/v1`,
//! wrapped with tracing, CORS, and a request-timeout layer (spec §5's
//! cancellation policy). Structural shape grounded in the retrieval pack's
//! `axum`/`tower-http` examples; endpoints and authorization are this
//! service's own.

use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{audit, complaints, intake, resolution};
use crate::state::AppState;

pub fn build(state: AppState) -> Router {
    let timeout_secs = state.config.request_timeout_secs;

    let complaint_routes = Router::new()
        .route("/", post(complaints::create_complaint).get(complaints::list_complaints))
        .route("/pending-routing", get(complaints::pending_routing))
        .route("/pending-routing/count", get(complaints::pending_routing_count))
        .route("/:id", get(complaints::get_complaint))
        .route("/:id/state", post(complaints::apply_state))
        .route("/:id/reassign", post(complaints::reassign))
        .route("/:id/route", post(complaints::route))
        .route("/:id/transitions", get(complaints::transitions))
        .route("/:id/upvote", post(complaints::upvote))
        .route("/:id/proof", post(resolution::upload_proof))
        .route("/:id/signoff", post(resolution::submit_signoff))
        .route("/:id/dispute/:signoff_id/review", post(resolution::review_dispute));

    let intake_routes = Router::new().route("/webhook", post(intake::webhook));

    let api_v1 = Router::new()
        .nest("/complaints", complaint_routes)
        .nest("/intake", intake_routes)
        .route("/audit", get(audit::list_audit));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .nest("/api/v1", api_v1)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(timeout_secs)))
        .layer(cors)
        .with_state(state)
}
