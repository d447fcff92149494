//! Conversation session persistence (C9), partitioned by `(channel,
//! address)` — one citizen's ongoing intake dialog per channel (spec §5).

use super::SimStore;
use crate::error::GrvError;
use crate::intake::{ConversationSession, IntakePhase};
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

fn session_row_mapper(row: &Row) -> rusqlite::Result<ConversationSession> {
    Ok(ConversationSession {
        channel: row.get(0)?,
        address: row.get(1)?,
        phase: IntakePhase::parse(&row.get::<_, String>(2)?).unwrap_or(IntakePhase::Greeting),
        partial_json: row.get(3)?,
        registration_json: row.get(4)?,
        image_prompt_sent: row.get::<_, i64>(5)? != 0,
        history_json: row.get(6)?,
        last_activity: row.get(7)?,
        expires_at: row.get(8)?,
    })
}

impl SimStore {
    pub fn get_session(
        &self,
        channel: &str,
        address: &str,
    ) -> Result<Option<ConversationSession>, GrvError> {
        self.conn
            .query_row(
                "SELECT channel, address, phase, partial_json, registration_json,
                        image_prompt_sent, history_json, last_activity, expires_at
                 FROM conversation_session WHERE channel = ?1 AND address = ?2",
                params![channel, address],
                session_row_mapper,
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(GrvError::Database(other)),
            })
    }

    pub fn upsert_session(&self, session: &ConversationSession) -> Result<(), GrvError> {
        self.conn.execute(
            "INSERT INTO conversation_session (
                channel, address, phase, partial_json, registration_json,
                image_prompt_sent, history_json, last_activity, expires_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(channel, address) DO UPDATE SET
                phase = excluded.phase,
                partial_json = excluded.partial_json,
                registration_json = excluded.registration_json,
                image_prompt_sent = excluded.image_prompt_sent,
                history_json = excluded.history_json,
                last_activity = excluded.last_activity,
                expires_at = excluded.expires_at",
            params![
                session.channel,
                session.address,
                session.phase.as_str(),
                session.partial_json,
                session.registration_json,
                session.image_prompt_sent as i64,
                session.history_json,
                session.last_activity,
                session.expires_at,
            ],
        )?;
        Ok(())
    }

    pub fn delete_session(&self, channel: &str, address: &str) -> Result<(), GrvError> {
        self.conn.execute(
            "DELETE FROM conversation_session WHERE channel = ?1 AND address = ?2",
            params![channel, address],
        )?;
        Ok(())
    }

    /// Purge sessions past their TTL (spec §3: sessions carry an
    /// `expires_at`). Run periodically by `grievance-cli`/the API's
    /// background loop, not by the hot intake path.
    pub fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize, GrvError> {
        let rows = self.conn.execute(
            "DELETE FROM conversation_session WHERE expires_at <= ?1",
            params![now],
        )?;
        Ok(rows)
    }
}
