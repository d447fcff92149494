//! Complaint aggregate persistence: CRUD, optimistic-concurrency CAS
//! updates, and the filtered listings the API and scheduler need.

use super::SimStore;
use crate::domain::Complaint;
use crate::error::GrvError;
use crate::types::{ComplaintId, ComplaintState, EscalationLevel, Priority, UserId};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

const COMPLAINT_COLUMNS: &str = "id, display_id, citizen_id, created_at, title, description,
    location, latitude, longitude, category_id, department_id, priority, ai_confidence,
    ai_reasoning, needs_manual_routing, state, assigned_staff_id, escalation_level, sla_days,
    sla_deadline, started_at, resolved_at, closed_at, image_handle, image_analysis,
    upvote_count, citizen_satisfaction, version, scheduler_failure_count, needs_manual_attention";

fn complaint_row_mapper(row: &Row) -> rusqlite::Result<Complaint> {
    Ok(Complaint {
        id: row.get(0)?,
        display_id: row.get(1)?,
        citizen_id: row.get(2)?,
        created_at: row.get(3)?,
        title: row.get(4)?,
        description: row.get(5)?,
        location: row.get(6)?,
        latitude: row.get(7)?,
        longitude: row.get(8)?,
        category_id: row.get(9)?,
        department_id: row.get(10)?,
        priority: Priority::parse(&row.get::<_, String>(11)?).unwrap_or(Priority::Medium),
        ai_confidence: row.get(12)?,
        ai_reasoning: row.get(13)?,
        needs_manual_routing: row.get::<_, i64>(14)? != 0,
        state: ComplaintState::parse(&row.get::<_, String>(15)?).unwrap_or(ComplaintState::Filed),
        assigned_staff_id: row.get(16)?,
        escalation_level: EscalationLevel::parse(&row.get::<_, String>(17)?)
            .unwrap_or(EscalationLevel::None),
        sla_days: row.get(18)?,
        sla_deadline: row.get(19)?,
        started_at: row.get(20)?,
        resolved_at: row.get(21)?,
        closed_at: row.get(22)?,
        image_handle: row.get(23)?,
        image_analysis: row.get(24)?,
        upvote_count: row.get(25)?,
        citizen_satisfaction: row.get(26)?,
        version: row.get(27)?,
        scheduler_failure_count: row.get(28)?,
        needs_manual_attention: row.get::<_, i64>(29)? != 0,
    })
}

/// Fields a caller supplies when filing a complaint; everything
/// server-assigned (id, display_id, version, timestamps) is computed here.
#[derive(Debug, Clone)]
pub struct NewComplaint {
    pub citizen_id: UserId,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub description: String,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub category_id: Option<i64>,
    pub department_id: Option<i64>,
    pub priority: Priority,
    pub ai_confidence: f64,
    pub ai_reasoning: String,
    pub needs_manual_routing: bool,
    pub sla_days: i64,
    pub sla_deadline: DateTime<Utc>,
    pub image_handle: Option<String>,
    pub image_analysis: Option<String>,
}

/// Non-exhaustive query filter for complaint listings (spec §6). Every
/// field left `None` is unconstrained.
#[derive(Debug, Clone, Default)]
pub struct ComplaintFilter {
    pub state: Option<ComplaintState>,
    pub department_id: Option<i64>,
    pub citizen_id: Option<UserId>,
    pub assigned_staff_id: Option<UserId>,
    pub needs_manual_routing: Option<bool>,
    pub needs_manual_attention: Option<bool>,
}

impl SimStore {
    /// Insert a new complaint and return the stored aggregate, including its
    /// generated `display_id` (spec §3, §4.2).
    pub fn insert_complaint(&mut self, new: NewComplaint) -> Result<Complaint, GrvError> {
        let year: i32 = new.created_at.format("%Y").to_string().parse().unwrap();
        self.transaction(|tx| {
            let seq = next_display_seq(tx, year)?;
            let display_id = crate::types::format_display_id(year, seq);
            tx.execute(
                "INSERT INTO complaint (
                    display_id, citizen_id, created_at, title, description, location,
                    latitude, longitude, category_id, department_id, priority, ai_confidence,
                    ai_reasoning, needs_manual_routing, state, assigned_staff_id,
                    escalation_level, sla_days, sla_deadline, image_handle, image_analysis,
                    upvote_count, version, scheduler_failure_count, needs_manual_attention
                ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19,?20,?21,0,0,0,0)",
                params![
                    display_id,
                    new.citizen_id,
                    new.created_at,
                    new.title,
                    new.description,
                    new.location,
                    new.latitude,
                    new.longitude,
                    new.category_id,
                    new.department_id,
                    new.priority.as_str(),
                    new.ai_confidence,
                    new.ai_reasoning,
                    new.needs_manual_routing as i64,
                    ComplaintState::Filed.as_str(),
                    Option::<UserId>::None,
                    EscalationLevel::None.as_str(),
                    new.sla_days,
                    new.sla_deadline,
                    new.image_handle,
                    new.image_analysis,
                ],
            )?;
            let id = tx.last_insert_rowid();
            tx.query_row(
                &format!("SELECT {COMPLAINT_COLUMNS} FROM complaint WHERE id = ?1"),
                params![id],
                complaint_row_mapper,
            )
            .map_err(GrvError::Database)
        })
    }

    pub fn get_complaint(&self, id: ComplaintId) -> Result<Complaint, GrvError> {
        self.conn
            .query_row(
                &format!("SELECT {COMPLAINT_COLUMNS} FROM complaint WHERE id = ?1"),
                params![id],
                complaint_row_mapper,
            )
            .map_err(|_| GrvError::NotFound {
                entity: "complaint",
                id: id.to_string(),
            })
    }

    pub fn find_complaint_by_display_id(&self, display_id: &str) -> Result<Complaint, GrvError> {
        self.conn
            .query_row(
                &format!("SELECT {COMPLAINT_COLUMNS} FROM complaint WHERE display_id = ?1"),
                params![display_id],
                complaint_row_mapper,
            )
            .map_err(|_| GrvError::NotFound {
                entity: "complaint",
                id: display_id.to_string(),
            })
    }

    /// Replace a complaint row iff its `version` still matches, bumping it
    /// by one. Returns `Conflict` if another writer updated it first (spec
    /// §4.1(f), §5: optimistic concurrency, not a queue).
    pub fn update_complaint_cas(&mut self, complaint: &Complaint) -> Result<Complaint, GrvError> {
        let id = complaint.id;
        let expected_version = complaint.version;
        self.transaction(|tx| {
            let rows = tx.execute(
                "UPDATE complaint SET
                    title = ?1, description = ?2, location = ?3, latitude = ?4, longitude = ?5,
                    category_id = ?6, department_id = ?7, priority = ?8, ai_confidence = ?9,
                    ai_reasoning = ?10, needs_manual_routing = ?11, state = ?12,
                    assigned_staff_id = ?13, escalation_level = ?14, sla_days = ?15,
                    sla_deadline = ?16, started_at = ?17, resolved_at = ?18, closed_at = ?19,
                    image_handle = ?20, image_analysis = ?21, upvote_count = ?22,
                    citizen_satisfaction = ?23, version = version + 1,
                    scheduler_failure_count = ?24, needs_manual_attention = ?25
                 WHERE id = ?26 AND version = ?27",
                params![
                    complaint.title,
                    complaint.description,
                    complaint.location,
                    complaint.latitude,
                    complaint.longitude,
                    complaint.category_id,
                    complaint.department_id,
                    complaint.priority.as_str(),
                    complaint.ai_confidence,
                    complaint.ai_reasoning,
                    complaint.needs_manual_routing as i64,
                    complaint.state.as_str(),
                    complaint.assigned_staff_id,
                    complaint.escalation_level.as_str(),
                    complaint.sla_days,
                    complaint.sla_deadline,
                    complaint.started_at,
                    complaint.resolved_at,
                    complaint.closed_at,
                    complaint.image_handle,
                    complaint.image_analysis,
                    complaint.upvote_count,
                    complaint.citizen_satisfaction,
                    complaint.scheduler_failure_count,
                    complaint.needs_manual_attention as i64,
                    id,
                    expected_version,
                ],
            )?;
            if rows == 0 {
                return Err(GrvError::Conflict { complaint_id: id });
            }
            tx.query_row(
                &format!("SELECT {COMPLAINT_COLUMNS} FROM complaint WHERE id = ?1"),
                params![id],
                complaint_row_mapper,
            )
            .map_err(GrvError::Database)
        })
    }

    pub fn list_complaints(&self, filter: &ComplaintFilter) -> Result<Vec<Complaint>, GrvError> {
        let mut sql = format!("SELECT {COMPLAINT_COLUMNS} FROM complaint WHERE 1=1");
        if filter.state.is_some() {
            sql.push_str(" AND state = :state");
        }
        if filter.department_id.is_some() {
            sql.push_str(" AND department_id = :department_id");
        }
        if filter.citizen_id.is_some() {
            sql.push_str(" AND citizen_id = :citizen_id");
        }
        if filter.assigned_staff_id.is_some() {
            sql.push_str(" AND assigned_staff_id = :assigned_staff_id");
        }
        if filter.needs_manual_routing.is_some() {
            sql.push_str(" AND needs_manual_routing = :needs_manual_routing");
        }
        if filter.needs_manual_attention.is_some() {
            sql.push_str(" AND needs_manual_attention = :needs_manual_attention");
        }
        sql.push_str(" ORDER BY created_at ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut named: Vec<(&str, &dyn rusqlite::ToSql)> = Vec::new();
        let state_str = filter.state.map(|s| s.as_str());
        let manual_routing = filter.needs_manual_routing.map(|b| b as i64);
        let manual_attention = filter.needs_manual_attention.map(|b| b as i64);
        if let Some(s) = &state_str {
            named.push((":state", s));
        }
        if let Some(d) = &filter.department_id {
            named.push((":department_id", d));
        }
        if let Some(c) = &filter.citizen_id {
            named.push((":citizen_id", c));
        }
        if let Some(a) = &filter.assigned_staff_id {
            named.push((":assigned_staff_id", a));
        }
        if let Some(r) = &manual_routing {
            named.push((":needs_manual_routing", r));
        }
        if let Some(a) = &manual_attention {
            named.push((":needs_manual_attention", a));
        }
        let rows = stmt
            .query_map(named.as_slice(), complaint_row_mapper)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Complaints overdue for SLA/escalation scanning (spec §4.3): open
    /// (non-terminal) complaints whose deadline has already passed, oldest
    /// deadline first so the scheduler processes the worst backlog first.
    pub fn overdue_complaints(&self, now: DateTime<Utc>) -> Result<Vec<Complaint>, GrvError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COMPLAINT_COLUMNS} FROM complaint
             WHERE state NOT IN ('CLOSED', 'CANCELLED') AND sla_deadline <= ?1
             ORDER BY sla_deadline ASC"
        ))?;
        let rows = stmt
            .query_map(params![now], complaint_row_mapper)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Resolved complaints sitting past the auto-close window (spec §4.1,
    /// §9 open question — auto-close is driven off a configured duration).
    pub fn resolved_past(&self, cutoff: DateTime<Utc>) -> Result<Vec<Complaint>, GrvError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COMPLAINT_COLUMNS} FROM complaint
             WHERE state = 'RESOLVED' AND resolved_at IS NOT NULL AND resolved_at <= ?1
             ORDER BY resolved_at ASC"
        ))?;
        let rows = stmt
            .query_map(params![cutoff], complaint_row_mapper)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Complaints filed since `since`, for duplicate-detection scans (spec
    /// §4.2). Unbounded by state: a duplicate can be filed against a
    /// complaint at any stage of its lifecycle.
    pub fn complaints_since(&self, since: DateTime<Utc>) -> Result<Vec<Complaint>, GrvError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COMPLAINT_COLUMNS} FROM complaint WHERE created_at >= ?1 ORDER BY created_at ASC"
        ))?;
        let rows = stmt
            .query_map(params![since], complaint_row_mapper)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Record an upvote. Returns `Ok(false)` without error if the citizen
    /// already upvoted this complaint (spec §9: uniqueness enforced at
    /// write time via the table's composite primary key).
    pub fn add_upvote(
        &mut self,
        complaint_id: ComplaintId,
        citizen_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<bool, GrvError> {
        self.transaction(|tx| {
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO upvote (complaint_id, citizen_id, created_at)
                 VALUES (?1, ?2, ?3)",
                params![complaint_id, citizen_id, now],
            )? > 0;
            if inserted {
                tx.execute(
                    "UPDATE complaint SET upvote_count = upvote_count + 1 WHERE id = ?1",
                    params![complaint_id],
                )?;
            }
            Ok(inserted)
        })
    }

    pub fn complaint_count(&self) -> Result<i64, GrvError> {
        self.conn
            .query_row("SELECT COUNT(*) FROM complaint", [], |row| row.get(0))
            .map_err(Into::into)
    }
}

/// Atomically increments and returns the per-year display-id sequence
/// (spec §3: `GRV-<yyyy>-<00001>`).
fn next_display_seq(tx: &rusqlite::Transaction, year: i32) -> Result<i64, GrvError> {
    let updated = tx.execute(
        "UPDATE display_id_seq SET seq = seq + 1 WHERE year = ?1",
        params![year],
    )?;
    if updated == 0 {
        tx.execute(
            "INSERT INTO display_id_seq (year, seq) VALUES (?1, 1)",
            params![year],
        )?;
        return Ok(1);
    }
    tx.query_row(
        "SELECT seq FROM display_id_seq WHERE year = ?1",
        params![year],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| GrvError::Internal(anyhow::anyhow!("display_id_seq row vanished for {year}")))
}
