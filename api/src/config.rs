//! Runtime configuration for the HTTP service, read from the environment
//! (spec §2), extending `grievance_core::config::EngineConfig`'s tunables
//! with the bind address and scheduler cadence.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// How often the background scheduler loop ticks (spec §4.3, §5).
    #[serde(default = "default_scheduler_interval_secs")]
    pub scheduler_interval_secs: u64,

    /// How long a RESOLVED complaint may sit before SYSTEM auto-closes it
    /// (spec §9 open question, resolved in SPEC_FULL §5.1).
    #[serde(default = "default_auto_close_window_days")]
    pub auto_close_window_days: i64,

    /// Fraction of the original SLA window granted after an approved
    /// dispute (spec §4.3).
    #[serde(default = "default_dispute_sla_fraction")]
    pub dispute_sla_fraction: f64,

    /// Classifier / image-analysis call deadline (spec §4.2, §5).
    #[serde(default = "default_classifier_deadline_secs")]
    pub classifier_deadline_secs: u64,

    /// Confidence below which a complaint needs manual routing (spec §3).
    #[serde(default = "default_routing_confidence_threshold")]
    pub routing_confidence_threshold: f64,

    /// Consecutive scheduler failures before a complaint is flagged
    /// `needs_manual_attention` (spec §7).
    #[serde(default = "default_scheduler_failure_limit")]
    pub scheduler_failure_limit: u32,

    /// Reference-data cache TTL (spec §5).
    #[serde(default = "default_refdata_cache_ttl_secs")]
    pub refdata_cache_ttl_secs: u64,

    /// Intake webhook per-address token bucket (spec §5).
    #[serde(default = "default_intake_rate_limit_capacity")]
    pub intake_rate_limit_capacity: u32,
    #[serde(default = "default_intake_rate_limit_refill_per_sec")]
    pub intake_rate_limit_refill_per_sec: f64,

    /// How long an idle intake session survives before it's eligible for
    /// purge (spec §3, §9).
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: i64,

    /// Deadline every inbound request carries (spec §5's cancellation
    /// policy), enforced by `tower_http::timeout::TimeoutLayer`.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl ApiConfig {
    /// Load from `GRV_*` environment variables, falling back to the
    /// defaults above for anything unset (mirrors the teacher's
    /// `load(data_dir)` / `default_test()` split, adapted to env-driven
    /// service config instead of JSON catalogs).
    pub fn from_env() -> anyhow::Result<Self> {
        envy::prefixed("GRV_")
            .from_env::<Self>()
            .map_err(|e| anyhow::anyhow!("loading GRV_* environment config: {e}"))
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_db_path() -> String {
    "grievance.db".to_string()
}

fn default_scheduler_interval_secs() -> u64 {
    300
}

fn default_auto_close_window_days() -> i64 {
    7
}

fn default_dispute_sla_fraction() -> f64 {
    0.5
}

fn default_classifier_deadline_secs() -> u64 {
    5
}

fn default_routing_confidence_threshold() -> f64 {
    0.7
}

fn default_scheduler_failure_limit() -> u32 {
    3
}

fn default_refdata_cache_ttl_secs() -> u64 {
    60
}

fn default_intake_rate_limit_capacity() -> u32 {
    5
}

fn default_intake_rate_limit_refill_per_sec() -> f64 {
    0.5
}

fn default_session_ttl_secs() -> i64 {
    1800
}

fn default_request_timeout_secs() -> u64 {
    10
}
