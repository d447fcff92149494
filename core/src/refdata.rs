//! Reference Data Reader (C1) — read-only access to categories,
//! departments, and the SLA matrix, plus duplicate-complaint detection
//! (spec §4.2).
//!
//! Reference data is owned by an external editor; this module only reads
//! it, and caches what it reads for a short TTL since changes are rare and
//! non-urgent (spec §5).

use crate::config::{CategoryConfig, DepartmentConfig, ReferenceCatalog};
use crate::store::SimStore;
use crate::types::Priority;
use std::sync::{Mutex, RwLock};
use std::time::{Duration, Instant};

pub struct ReferenceDataReader {
    store: SimStore,
    ttl: Duration,
    cache: RwLock<Option<(Instant, ReferenceCatalog)>>,
    // Guards the single refresh-from-store path so concurrent cache misses
    // don't all hit the store at once.
    refresh_lock: Mutex<()>,
}

impl ReferenceDataReader {
    pub fn new(store: SimStore, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    fn catalog(&self) -> anyhow::Result<ReferenceCatalog> {
        if let Some((fetched_at, catalog)) = self.cache.read().unwrap().as_ref() {
            if fetched_at.elapsed() < self.ttl {
                return Ok(catalog.clone());
            }
        }
        let _guard = self.refresh_lock.lock().unwrap();
        // Re-check: another thread may have refreshed while we waited.
        if let Some((fetched_at, catalog)) = self.cache.read().unwrap().as_ref() {
            if fetched_at.elapsed() < self.ttl {
                return Ok(catalog.clone());
            }
        }
        let fresh = self.store.load_reference_catalog()?;
        *self.cache.write().unwrap() = Some((Instant::now(), fresh.clone()));
        Ok(fresh)
    }

    pub fn lookup_category(&self, category_id: i64) -> anyhow::Result<Option<CategoryConfig>> {
        Ok(self.catalog()?.categories.get(&category_id).cloned())
    }

    pub fn lookup_department(&self, department_id: i64) -> anyhow::Result<Option<DepartmentConfig>> {
        Ok(self.catalog()?.departments.get(&department_id).cloned())
    }

    pub fn sla_days(
        &self,
        category_id: i64,
        department_id: Option<i64>,
        priority: Priority,
    ) -> anyhow::Result<Option<i64>> {
        Ok(self
            .catalog()?
            .sla_days(category_id, department_id, priority.as_str()))
    }

    /// Straight-line-distance duplicate detection (spec §1 Non-goals: no
    /// geospatial indexing beyond this).
    pub fn duplicate_candidates(
        &self,
        lat: f64,
        lon: f64,
        radius_m: f64,
        since: chrono::DateTime<chrono::Utc>,
    ) -> anyhow::Result<Vec<crate::domain::Complaint>> {
        let candidates = self.store.complaints_since(since)?;
        Ok(candidates
            .into_iter()
            .filter(|c| match (c.latitude, c.longitude) {
                (Some(clat), Some(clon)) => haversine_m(lat, lon, clat, clon) <= radius_m,
                _ => false,
            })
            .collect())
    }
}

/// Great-circle distance between two lat/lon points, in meters.
fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    const EARTH_RADIUS_M: f64 = 6_371_000.0;
    let (lat1_r, lat2_r) = (lat1.to_radians(), lat2.to_radians());
    let dlat = lat2_r - lat1_r;
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2) + lat1_r.cos() * lat2_r.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    EARTH_RADIUS_M * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_zero_distance() {
        assert!(haversine_m(12.97, 77.59, 12.97, 77.59) < 1.0);
    }

    #[test]
    fn haversine_known_distance_is_reasonable() {
        // Roughly 1 degree of latitude ~ 111km.
        let d = haversine_m(0.0, 0.0, 1.0, 0.0);
        assert!((100_000.0..120_000.0).contains(&d), "d={d}");
    }
}
