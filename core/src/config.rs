//! Reference-data and runtime configuration, loaded once at startup.
//!
//! Categories, departments, and the SLA matrix are owned by an external
//! editor (spec §3); this module only describes the shape the engine reads
//! them in and the JSON files `grievance-cli` seeds them from. Everything
//! else here (escalation thresholds, auto-close window, rate limits) is
//! the engine's own tunable behavior.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub category_id: i64,
    pub name: String,
    /// Default SLA in days, keyed by priority string ("LOW".."CRITICAL").
    pub default_sla_days: HashMap<String, i64>,
    /// Per-department overrides of `default_sla_days`, keyed by
    /// department-id then priority string (spec §4.2: "lookup(category-id)
    /// → ... default SLA-days per priority per department"). A department
    /// with no entry here falls back to `default_sla_days`.
    #[serde(default)]
    pub department_sla_days: HashMap<i64, HashMap<String, i64>>,
}

#[derive(Debug, Clone, Deserialize)]
struct CategoryCatalogFile {
    categories: Vec<CategoryConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepartmentConfig {
    pub department_id: i64,
    pub name: String,
    pub head_user_id: UserIdOrNull,
}

pub type UserIdOrNull = Option<i64>;

#[derive(Debug, Clone, Deserialize)]
struct DepartmentCatalogFile {
    departments: Vec<DepartmentConfig>,
}

/// The escalation ladder thresholds, in days overdue (spec §4.3).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EscalationThresholds {
    pub l1_days: i64,
    pub l2_days: i64,
    pub l3_days: i64,
}

impl EscalationThresholds {
    /// The escalation level a complaint should be at, given how many days
    /// overdue it is (spec §4.3's ladder). `days_overdue <= 0` is NONE.
    pub fn required_level(&self, days_overdue: i64) -> crate::types::EscalationLevel {
        use crate::types::EscalationLevel::*;
        if days_overdue <= 0 {
            None
        } else if days_overdue <= self.l1_days {
            Staff
        } else if days_overdue <= self.l2_days {
            DeptHead
        } else if days_overdue <= self.l3_days {
            Admin
        } else {
            Commissioner
        }
    }
}

impl Default for EscalationThresholds {
    fn default() -> Self {
        Self {
            l1_days: 1,
            l2_days: 3,
            l3_days: 7,
        }
    }
}

/// Runtime configuration not tied to reference-data editing (§5, §9).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub escalation_thresholds: EscalationThresholds,
    /// How long a RESOLVED complaint may sit without citizen action before
    /// the SYSTEM actor auto-closes it (spec §4.1, open question in §9 —
    /// resolved here as a single injected value, not reference data).
    pub auto_close_window: Duration,
    /// Fraction of the original SLA window granted after an approved
    /// dispute (spec §4.3: "typically half of the original").
    pub dispute_sla_fraction: f64,
    /// Classifier / image-analysis call deadline (spec §4.2, §5).
    pub classifier_deadline: std::time::Duration,
    /// Confidence below which a complaint needs manual routing (spec §3).
    pub routing_confidence_threshold: f64,
    /// Consecutive scheduler failures before a complaint is flagged
    /// `needs_manual_attention` and skipped (spec §7).
    pub scheduler_failure_limit: u32,
    /// Reference-data cache TTL (spec §5).
    pub refdata_cache_ttl: std::time::Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            escalation_thresholds: EscalationThresholds::default(),
            auto_close_window: Duration::days(7),
            dispute_sla_fraction: 0.5,
            classifier_deadline: std::time::Duration::from_secs(5),
            routing_confidence_threshold: 0.7,
            scheduler_failure_limit: 3,
            refdata_cache_ttl: std::time::Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReferenceCatalog {
    pub categories: HashMap<i64, CategoryConfig>,
    pub departments: HashMap<i64, DepartmentConfig>,
}

impl ReferenceCatalog {
    /// Load from the `data/` directory (category/department JSON catalogs).
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let cat_path = format!("{data_dir}/categories/category_catalog.json");
        let cat_content = std::fs::read_to_string(&cat_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {cat_path}: {e}"))?;
        let cat_file: CategoryCatalogFile = serde_json::from_str(&cat_content)?;
        let categories = cat_file
            .categories
            .into_iter()
            .map(|c| (c.category_id, c))
            .collect();

        let dept_path = format!("{data_dir}/departments/department_catalog.json");
        let dept_content = std::fs::read_to_string(&dept_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {dept_path}: {e}"))?;
        let dept_file: DepartmentCatalogFile = serde_json::from_str(&dept_content)?;
        let departments = dept_file
            .departments
            .into_iter()
            .map(|d| (d.department_id, d))
            .collect();

        Ok(Self {
            categories,
            departments,
        })
    }

    /// Small hardcoded catalog for unit tests (mirrors the teacher's
    /// `default_test()` pattern — no filesystem access in tests).
    pub fn default_test() -> Self {
        let mut categories = HashMap::new();
        categories.insert(
            1,
            CategoryConfig {
                category_id: 1,
                name: "ROAD".into(),
                default_sla_days: [
                    ("LOW".into(), 10),
                    ("MEDIUM".into(), 5),
                    ("HIGH".into(), 3),
                    ("CRITICAL".into(), 1),
                ]
                .into(),
                department_sla_days: HashMap::new(),
            },
        );
        categories.insert(
            2,
            CategoryConfig {
                category_id: 2,
                name: "SANITATION".into(),
                default_sla_days: [
                    ("LOW".into(), 7),
                    ("MEDIUM".into(), 4),
                    ("HIGH".into(), 2),
                    ("CRITICAL".into(), 1),
                ]
                .into(),
                department_sla_days: HashMap::new(),
            },
        );

        let mut departments = HashMap::new();
        departments.insert(
            10,
            DepartmentConfig {
                department_id: 10,
                name: "PWD".into(),
                head_user_id: Some(101),
            },
        );
        departments.insert(
            11,
            DepartmentConfig {
                department_id: 11,
                name: "SANITATION_DEPT".into(),
                head_user_id: Some(102),
            },
        );

        Self {
            categories,
            departments,
        }
    }

    /// Looks up the default SLA, falling back from a department-specific
    /// override to the category's flat default when the department (or
    /// `department_id`, for an unrouted complaint) has no override.
    pub fn sla_days(&self, category_id: i64, department_id: Option<i64>, priority: &str) -> Option<i64> {
        let category = self.categories.get(&category_id)?;
        department_id
            .and_then(|dept_id| category.department_sla_days.get(&dept_id))
            .and_then(|overrides| overrides.get(priority))
            .or_else(|| category.default_sla_days.get(priority))
            .copied()
    }
}
