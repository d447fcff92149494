//! Audit log persistence (C2). Entries are appended only, always inside
//! the same transaction as the mutation they record — see the engine
//! modules, which call `append_audit` through `SimStore::transaction`.

use super::SimStore;
use crate::audit::{AuditAction, AuditEntry};
use crate::error::GrvError;
use crate::types::{ActorKind, AuditId, ComplaintId};
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

fn audit_row_mapper(row: &Row) -> rusqlite::Result<AuditEntry> {
    let actor_kind = match row.get::<_, String>(7)?.as_str() {
        "system" => ActorKind::System,
        _ => ActorKind::User,
    };
    Ok(AuditEntry {
        id: Some(row.get(0)?),
        entity_type: row.get(1)?,
        entity_id: row.get(2)?,
        action: AuditAction::parse(&row.get::<_, String>(3)?).unwrap_or(AuditAction::Comment),
        old_value: row.get(4)?,
        new_value: row.get(5)?,
        actor_id: row.get(6)?,
        actor_kind,
        reason: row.get(8)?,
        created_at: row.get(9)?,
    })
}

/// Append one audit entry within an already-open transaction. A free
/// function (not a `SimStore` method) since `SimStore::transaction` holds
/// the only `&mut self` borrow for its duration — callers do
/// `store.transaction(|tx| append_audit(tx, &entry).map(|_| ()))`.
pub(crate) fn append_audit(
    conn: &rusqlite::Transaction,
    entry: &AuditEntry,
) -> Result<AuditId, GrvError> {
    conn.execute(
        "INSERT INTO audit_log (
            entity_type, entity_id, action, old_value, new_value,
            actor_id, actor_kind, reason, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            entry.entity_type,
            entry.entity_id,
            entry.action.as_str(),
            entry.old_value,
            entry.new_value,
            entry.actor_id,
            match entry.actor_kind {
                ActorKind::System => "system",
                ActorKind::User => "user",
            },
            entry.reason,
            entry.created_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

impl SimStore {
    pub fn audit_for_entity(
        &self,
        entity_type: &str,
        entity_id: ComplaintId,
    ) -> Result<Vec<AuditEntry>, GrvError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, entity_type, entity_id, action, old_value, new_value,
                    actor_id, actor_kind, reason, created_at
             FROM audit_log WHERE entity_type = ?1 AND entity_id = ?2
             ORDER BY created_at ASC, id ASC",
        )?;
        let rows = stmt
            .query_map(params![entity_type, entity_id], audit_row_mapper)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn audit_by_action(
        &self,
        action: AuditAction,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<AuditEntry>, GrvError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, entity_type, entity_id, action, old_value, new_value,
                    actor_id, actor_kind, reason, created_at
             FROM audit_log WHERE action = ?1 AND created_at >= ?2 AND created_at <= ?3
             ORDER BY created_at ASC, id ASC",
        )?;
        let rows = stmt
            .query_map(params![action.as_str(), since, until], audit_row_mapper)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn audit_by_actor(&self, actor_id: i64) -> Result<Vec<AuditEntry>, GrvError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, entity_type, entity_id, action, old_value, new_value,
                    actor_id, actor_kind, reason, created_at
             FROM audit_log WHERE actor_id = ?1
             ORDER BY created_at ASC, id ASC",
        )?;
        let rows = stmt
            .query_map(params![actor_id], audit_row_mapper)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn audit_count(&self) -> Result<i64, GrvError> {
        self.conn
            .query_row("SELECT COUNT(*) FROM audit_log", [], |row| row.get(0))
            .map_err(Into::into)
    }
}
