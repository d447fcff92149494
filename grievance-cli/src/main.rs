//! grievance-cli: operator binary for the Public Grievance Redressal
//! backend.
//!
//! Usage:
//!   grievance-cli init --db grievance.db --data-dir ./data
//!   grievance-cli seed --db grievance.db --data-dir ./data
//!   grievance-cli tick --db grievance.db
//!   grievance-cli tick --db grievance.db --loop --interval-secs 300

use anyhow::{bail, Context, Result};
use grievance_core::clock::SystemClock;
use grievance_core::config::{EngineConfig, ReferenceCatalog};
use grievance_core::lifecycle::LifecycleEngine;
use grievance_core::refdata::ReferenceDataReader;
use grievance_core::scheduler::Scheduler;
use grievance_core::store::SimStore;
use std::env;
use std::sync::Arc;
use std::thread;
use std::time::Duration as StdDuration;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("");
    let db = arg_value(&args, "--db").unwrap_or_else(|| "grievance.db".to_string());
    let data_dir = arg_value(&args, "--data-dir").unwrap_or_else(|| "./data".to_string());

    match command {
        "init" => init(&db),
        "seed" => seed(&db, &data_dir),
        "tick" => {
            let run_loop = args.iter().any(|a| a == "--loop");
            let interval_secs: u64 = arg_value(&args, "--interval-secs")
                .and_then(|v| v.parse().ok())
                .unwrap_or(300);
            tick(&db, run_loop, interval_secs)
        }
        other => bail!(
            "unknown command '{other}' (expected one of: init, seed, tick). \
             Run with --db <path> [--data-dir <path>] [--loop] [--interval-secs N]"
        ),
    }
}

fn init(db: &str) -> Result<()> {
    let store = SimStore::open(db).context("opening database")?;
    store.migrate().context("running migrations")?;
    log::info!("initialized grievance database at {db}");
    Ok(())
}

fn seed(db: &str, data_dir: &str) -> Result<()> {
    let store = SimStore::open(db).context("opening database")?;
    store.migrate().context("running migrations")?;
    let catalog = ReferenceCatalog::load(data_dir)
        .with_context(|| format!("loading reference catalog from {data_dir}"))?;
    store.seed_categories(&catalog.categories.values().cloned().collect::<Vec<_>>())?;
    store.seed_departments(&catalog.departments.values().cloned().collect::<Vec<_>>())?;
    log::info!(
        "seeded {} categories and {} departments from {data_dir}",
        catalog.categories.len(),
        catalog.departments.len(),
    );
    Ok(())
}

/// Run the SLA/escalation scheduler standalone, for ops debugging or a
/// cron-driven deployment that doesn't run `grievance-api`'s background
/// loop (spec §4.3, §5).
fn tick(db: &str, run_loop: bool, interval_secs: u64) -> Result<()> {
    let store = SimStore::open(db).context("opening database")?;
    store.migrate().context("running migrations")?;
    let refdata_store = store.reopen().context("opening reference-data connection")?;
    let config = EngineConfig::default();
    let refdata = Arc::new(ReferenceDataReader::new(refdata_store, config.refdata_cache_ttl));
    let mut engine = LifecycleEngine::new(
        store,
        SystemClock,
        refdata,
        config.routing_confidence_threshold,
        config.auto_close_window,
        config.dispute_sla_fraction,
        config.scheduler_failure_limit,
    );
    let scheduler = Scheduler::new(config.escalation_thresholds);

    loop {
        let report = scheduler.tick(&mut engine)?;
        log::info!(
            "scheduler tick: escalated={} auto_closed={} skipped_conflicts={} flagged_manual_attention={}",
            report.escalated,
            report.auto_closed,
            report.skipped_conflicts,
            report.flagged_manual_attention,
        );
        if !run_loop {
            break;
        }
        thread::sleep(StdDuration::from_secs(interval_secs));
    }
    Ok(())
}

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].clone())
}
