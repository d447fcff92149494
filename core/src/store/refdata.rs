//! Reference-data persistence (categories, departments) and escalation
//! event log writes (C1, C2/C7).

use super::SimStore;
use crate::config::{CategoryConfig, DepartmentConfig, ReferenceCatalog};
use crate::domain::EscalationEvent;
use crate::error::GrvError;
use crate::types::ComplaintId;
use rusqlite::params;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// On-disk shape of the `category.sla_json` column — the default SLA
/// table plus any per-department overrides (spec §4.2).
#[derive(Serialize, Deserialize)]
struct CategorySlaJson {
    default: HashMap<String, i64>,
    #[serde(default)]
    by_department: HashMap<i64, HashMap<String, i64>>,
}

/// Append an escalation event row (spec §4.3). A free function since it
/// always runs from within the same transaction as the complaint's
/// `escalation_level` CAS update, via `SimStore::transaction`.
pub(crate) fn append_escalation_event(
    conn: &rusqlite::Transaction,
    event: &EscalationEvent,
) -> Result<(), GrvError> {
    conn.execute(
        "INSERT INTO escalation_event (
            complaint_id, from_level, to_level, triggered_at, reason, notified_role
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            event.complaint_id,
            event.from_level.as_str(),
            event.to_level.as_str(),
            event.triggered_at,
            event.reason,
            event.notified_role,
        ],
    )?;
    Ok(())
}

impl SimStore {
    /// Seed the category/department reference tables. Used by
    /// `grievance-cli` on first boot and by tests.
    pub fn seed_categories(&self, categories: &[CategoryConfig]) -> Result<(), GrvError> {
        for c in categories {
            let sla_json = serde_json::to_string(&CategorySlaJson {
                default: c.default_sla_days.clone(),
                by_department: c.department_sla_days.clone(),
            })?;
            self.conn.execute(
                "INSERT INTO category (id, name, sla_json) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET name = excluded.name, sla_json = excluded.sla_json",
                params![c.category_id, c.name, sla_json],
            )?;
        }
        Ok(())
    }

    pub fn seed_departments(&self, departments: &[DepartmentConfig]) -> Result<(), GrvError> {
        for d in departments {
            self.conn.execute(
                "INSERT INTO department (id, name, head_user_id) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET name = excluded.name, head_user_id = excluded.head_user_id",
                params![d.department_id, d.name, d.head_user_id],
            )?;
        }
        Ok(())
    }

    /// Load the full reference catalog from the `category`/`department`
    /// tables (spec §3, §5). Backs `ReferenceDataReader`'s cache refresh.
    pub fn load_reference_catalog(&self) -> Result<ReferenceCatalog, GrvError> {
        let mut categories = HashMap::new();
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, sla_json FROM category")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        for row in rows {
            let (id, name, sla_json) = row?;
            let sla: CategorySlaJson =
                serde_json::from_str(&sla_json).map_err(GrvError::Serialization)?;
            categories.insert(
                id,
                CategoryConfig {
                    category_id: id,
                    name,
                    default_sla_days: sla.default,
                    department_sla_days: sla.by_department,
                },
            );
        }

        let mut departments = HashMap::new();
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, head_user_id FROM department")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<i64>>(2)?,
            ))
        })?;
        for row in rows {
            let (id, name, head_user_id) = row?;
            departments.insert(
                id,
                DepartmentConfig {
                    department_id: id,
                    name,
                    head_user_id,
                },
            );
        }

        Ok(ReferenceCatalog {
            categories,
            departments,
        })
    }

    pub fn escalation_history(
        &self,
        complaint_id: ComplaintId,
    ) -> Result<Vec<EscalationEvent>, GrvError> {
        let mut stmt = self.conn.prepare(
            "SELECT complaint_id, from_level, to_level, triggered_at, reason, notified_role
             FROM escalation_event WHERE complaint_id = ?1 ORDER BY triggered_at ASC",
        )?;
        let rows = stmt
            .query_map(params![complaint_id], |row| {
                Ok(EscalationEvent {
                    complaint_id: row.get(0)?,
                    from_level: crate::types::EscalationLevel::parse(&row.get::<_, String>(1)?)
                        .unwrap_or(crate::types::EscalationLevel::None),
                    to_level: crate::types::EscalationLevel::parse(&row.get::<_, String>(2)?)
                        .unwrap_or(crate::types::EscalationLevel::None),
                    triggered_at: row.get(3)?,
                    reason: row.get(4)?,
                    notified_role: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
