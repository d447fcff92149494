//! Resolution proof and citizen sign-off persistence (C8).

use super::SimStore;
use crate::domain::{CitizenSignoff, ResolutionProof};
use crate::error::GrvError;
use crate::types::{ComplaintId, ProofId, SignoffId};
use rusqlite::{params, Row};

fn proof_row_mapper(row: &Row) -> rusqlite::Result<ResolutionProof> {
    Ok(ResolutionProof {
        id: row.get(0)?,
        complaint_id: row.get(1)?,
        image_handle: row.get(2)?,
        captured_at: row.get(3)?,
        latitude: row.get(4)?,
        longitude: row.get(5)?,
        staff_id: row.get(6)?,
        remarks: row.get(7)?,
        verified: row.get::<_, i64>(8)? != 0,
        archived: row.get::<_, i64>(9)? != 0,
    })
}

fn signoff_row_mapper(row: &Row) -> rusqlite::Result<CitizenSignoff> {
    Ok(CitizenSignoff {
        id: row.get(0)?,
        complaint_id: row.get(1)?,
        accepted: row.get::<_, i64>(2)? != 0,
        disputed: row.get::<_, i64>(3)? != 0,
        rating: row.get(4)?,
        dispute_reason: row.get(5)?,
        counter_proof_handle: row.get(6)?,
        approved: row.get::<_, Option<i64>>(7)?.map(|v| v != 0),
        signed_at: row.get(8)?,
    })
}

/// Insert a resolution proof row. A free function: always called from
/// within the same transaction as the complaint's `Resolved` CAS update.
pub(crate) fn insert_proof(
    conn: &rusqlite::Transaction,
    proof: &ResolutionProof,
) -> Result<ProofId, GrvError> {
    conn.execute(
        "INSERT INTO resolution_proof (
            complaint_id, image_handle, captured_at, latitude, longitude,
            staff_id, remarks, verified, archived
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            proof.complaint_id,
            proof.image_handle,
            proof.captured_at,
            proof.latitude,
            proof.longitude,
            proof.staff_id,
            proof.remarks,
            proof.verified as i64,
            proof.archived as i64,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Archive the prior proof ahead of a fresh upload or dispute reopen
/// (spec §3, §4.4). A free function for the same reason as `insert_proof`.
pub(crate) fn archive_active_proof(
    conn: &rusqlite::Transaction,
    complaint_id: ComplaintId,
) -> Result<(), GrvError> {
    conn.execute(
        "UPDATE resolution_proof SET archived = 1 WHERE complaint_id = ?1 AND archived = 0",
        params![complaint_id],
    )?;
    Ok(())
}

/// Insert a citizen sign-off row. A free function for the same reason as
/// `insert_proof`.
pub(crate) fn insert_signoff(
    conn: &rusqlite::Transaction,
    signoff: &CitizenSignoff,
) -> Result<SignoffId, GrvError> {
    conn.execute(
        "INSERT INTO citizen_signoff (
            complaint_id, accepted, disputed, rating, dispute_reason,
            counter_proof_handle, approved, signed_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            signoff.complaint_id,
            signoff.accepted as i64,
            signoff.disputed as i64,
            signoff.rating,
            signoff.dispute_reason,
            signoff.counter_proof_handle,
            signoff.approved.map(|v| v as i64),
            signoff.signed_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Record a department head's dispute decision. A free function for the
/// same reason as `insert_proof`.
pub(crate) fn update_signoff_review(
    conn: &rusqlite::Transaction,
    signoff_id: SignoffId,
    approved: bool,
) -> Result<(), GrvError> {
    conn.execute(
        "UPDATE citizen_signoff SET approved = ?1 WHERE id = ?2",
        params![approved as i64, signoff_id],
    )?;
    Ok(())
}

impl SimStore {
    /// The active (non-archived) proof for a complaint, if any. A dispute
    /// approval archives the prior proof and a fresh upload replaces it
    /// (spec §3, §4.4).
    pub fn active_proof(
        &self,
        complaint_id: ComplaintId,
    ) -> Result<Option<ResolutionProof>, GrvError> {
        self.conn
            .query_row(
                "SELECT id, complaint_id, image_handle, captured_at, latitude, longitude,
                        staff_id, remarks, verified, archived
                 FROM resolution_proof WHERE complaint_id = ?1 AND archived = 0
                 ORDER BY id DESC LIMIT 1",
                params![complaint_id],
                proof_row_mapper,
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(GrvError::Database(other)),
            })
    }

    pub fn latest_signoff(
        &self,
        complaint_id: ComplaintId,
    ) -> Result<Option<CitizenSignoff>, GrvError> {
        self.conn
            .query_row(
                "SELECT id, complaint_id, accepted, disputed, rating, dispute_reason,
                        counter_proof_handle, approved, signed_at
                 FROM citizen_signoff WHERE complaint_id = ?1 ORDER BY id DESC LIMIT 1",
                params![complaint_id],
                signoff_row_mapper,
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(GrvError::Database(other)),
            })
    }

    /// Disputes awaiting a department head's decision.
    pub fn pending_disputes(&self) -> Result<Vec<CitizenSignoff>, GrvError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, complaint_id, accepted, disputed, rating, dispute_reason,
                    counter_proof_handle, approved, signed_at
             FROM citizen_signoff WHERE disputed = 1 AND approved IS NULL
             ORDER BY signed_at ASC",
        )?;
        let rows = stmt
            .query_map([], signoff_row_mapper)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
