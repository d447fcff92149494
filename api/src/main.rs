//! `grievance-api`: the HTTP surface for the Public Grievance Redressal
//! backend (C10). Exposes the endpoints of spec §6 over `axum`, and runs
//! the SLA/escalation scheduler (C7) as a background task.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use grievance_core::config::EscalationThresholds;
use grievance_core::scheduler::Scheduler;

use grievance_api::config::ApiConfig;
use grievance_api::state::AppState;
use grievance_api::routes;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // `grievance-core` logs through the `log` facade; bridge it into the
    // same `tracing` sink the API layer uses (spec §2).
    tracing_log::LogTracer::init()?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = ApiConfig::from_env()?;
    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(config)?;

    tokio::spawn(run_scheduler_loop(state.clone()));

    let app = routes::build(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "grievance-api listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Scans for SLA breaches, escalates, and auto-closes resolved complaints
/// past their window every `scheduler_interval_secs` (spec §4.3, §5), and
/// purges expired intake sessions on the same cadence (spec §3, §9).
async fn run_scheduler_loop(state: AppState) {
    let scheduler = Arc::new(Scheduler::new(EscalationThresholds::default()));
    let mut interval = tokio::time::interval(StdDuration::from_secs(state.config.scheduler_interval_secs));
    loop {
        interval.tick().await;
        let scheduler = scheduler.clone();
        match state.with_engine(move |engine| scheduler.tick(engine)).await {
            Ok(report) => tracing::info!(
                escalated = report.escalated,
                auto_closed = report.auto_closed,
                skipped_conflicts = report.skipped_conflicts,
                flagged_manual_attention = report.flagged_manual_attention,
                "scheduler tick complete"
            ),
            Err(err) => tracing::error!(error = %err, "scheduler tick failed"),
        }

        if let Err(err) = state
            .with_engine(|engine| {
                let now = engine.clock().now();
                engine.store_mut().purge_expired_sessions(now)
            })
            .await
        {
            tracing::warn!(error = %err, "failed to purge expired intake sessions");
        }
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
