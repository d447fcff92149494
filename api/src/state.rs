//! Shared application state (spec §5's "complaint store is the only
//! shared mutable state of record").
//!
//! `grievance-core`'s store is intentionally synchronous and owns a single
//! `rusqlite::Connection` (the teacher's own store design) rather than a
//! borrowable/pooled one, so this crate does not attempt to pool
//! connections across async tasks. Instead a single `LifecycleEngine` is
//! guarded by a blocking mutex and every access is dispatched onto a
//! blocking-pool thread with `tokio::task::spawn_blocking`, which keeps
//! the async reactor free of blocking I/O without requiring `SimStore` to
//! support concurrent connections it was never built for.

use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use chrono::Duration;
use grievance_core::classifier::{Classifier, StubClassifier, TimeoutGuardClassifier};
use grievance_core::clock::SystemClock;
use grievance_core::error::GrvError;
use grievance_core::intake::{IntakeEngine, RateLimiter, ScriptedResponder, StubImageAnalyzer, TimeoutGuardImageAnalyzer};
use grievance_core::lifecycle::LifecycleEngine;
use grievance_core::refdata::ReferenceDataReader;
use grievance_core::resolution::ResolutionService;
use grievance_core::store::SimStore;

use crate::config::ApiConfig;

#[derive(Clone)]
pub struct AppState {
    engine: Arc<Mutex<LifecycleEngine<SystemClock>>>,
    pub resolution: Arc<ResolutionService>,
    pub intake: Arc<IntakeEngine>,
    /// A second classifier instance for `POST /complaints`'s direct filing
    /// path — the intake engine classifies at commit time internally and
    /// doesn't expose its own copy (spec §4.2, §4.5).
    pub classifier: Arc<dyn Classifier>,
    pub config: Arc<ApiConfig>,
}

impl AppState {
    pub fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let store = SimStore::open(&config.db_path)?;
        store.migrate()?;

        let refdata_store = store.reopen()?;
        let refdata = Arc::new(ReferenceDataReader::new(
            refdata_store,
            StdDuration::from_secs(config.refdata_cache_ttl_secs),
        ));

        let engine = LifecycleEngine::new(
            store,
            SystemClock,
            refdata,
            config.routing_confidence_threshold,
            Duration::days(config.auto_close_window_days),
            config.dispute_sla_fraction,
            config.scheduler_failure_limit,
        );

        // The external classification model and vision analyzer are
        // collaborators this crate doesn't own (spec §1 Non-goals); the
        // keyword-weighted stub stands in, same as `grievance-cli seed`.
        let rest_classifier: Arc<dyn Classifier> = Arc::new(TimeoutGuardClassifier::new(
            StubClassifier::default(),
            StdDuration::from_secs(config.classifier_deadline_secs),
        ));
        let classifier = TimeoutGuardClassifier::new(
            StubClassifier::default(),
            StdDuration::from_secs(config.classifier_deadline_secs),
        );
        let image_analyzer = TimeoutGuardImageAnalyzer::new(
            StubImageAnalyzer,
            StdDuration::from_secs(config.classifier_deadline_secs),
        );
        let rate_limiter = RateLimiter::new(
            config.intake_rate_limit_capacity,
            config.intake_rate_limit_refill_per_sec,
        );
        let intake = IntakeEngine::new(
            ScriptedResponder,
            classifier,
            image_analyzer,
            rate_limiter,
            Duration::seconds(config.session_ttl_secs),
        );

        Ok(Self {
            engine: Arc::new(Mutex::new(engine)),
            resolution: Arc::new(ResolutionService::new()),
            intake: Arc::new(intake),
            classifier: rest_classifier,
            config: Arc::new(config),
        })
    }

    /// Run `f` against the lifecycle engine on a blocking-pool thread
    /// (spec §5: handlers must not block the reactor on store I/O).
    pub async fn with_engine<T, F>(&self, f: F) -> Result<T, GrvError>
    where
        F: FnOnce(&mut LifecycleEngine<SystemClock>) -> Result<T, GrvError> + Send + 'static,
        T: Send + 'static,
    {
        let engine = self.engine.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = engine.lock().expect("lifecycle engine mutex poisoned");
            f(&mut guard)
        })
        .await
        .map_err(|e| GrvError::Internal(anyhow::anyhow!("blocking task panicked: {e}")))?
    }
}
