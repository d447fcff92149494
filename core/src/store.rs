//! SQLite persistence layer (C5 Complaint Store, plus the audit log,
//! reference data, and intake session tables it shares storage with).
//!
//! RULE: only `store.rs` and its submodules talk to the database.
//! Engine modules call store methods — they never execute SQL directly.

mod audit;
mod complaint;
mod refdata;
mod resolution;
mod session;

pub(crate) use audit::append_audit;
pub use complaint::{ComplaintFilter, NewComplaint};
pub(crate) use refdata::append_escalation_event;
pub(crate) use resolution::{
    archive_active_proof, insert_proof, insert_signoff, update_signoff_review,
};

use crate::error::GrvError;
use rusqlite::Connection;

pub struct SimStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl SimStore {
    pub fn open(path: &str) -> Result<Self, GrvError> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> Result<Self, GrvError> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, path: None })
    }

    /// Reopen a new connection to the same database.
    /// For in-memory databases, this returns a new isolated in-memory
    /// database — callers that need a shared in-memory handle across
    /// connections should use a `file:...?mode=memory&cache=shared` URI,
    /// as `grievance-cli` does.
    pub fn reopen(&self) -> Result<Self, GrvError> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> Result<(), GrvError> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_grievance_schema.sql"))?;
        Ok(())
    }

    /// Run `f` inside a single SQLite transaction, committing on `Ok` and
    /// rolling back on `Err`. Every engine operation that both mutates a
    /// complaint and appends an audit entry runs through this, so the two
    /// writes are atomic (spec §4.6, §4.1).
    pub fn transaction<T>(
        &mut self,
        f: impl FnOnce(&rusqlite::Transaction) -> Result<T, GrvError>,
    ) -> Result<T, GrvError> {
        let tx = self.conn.transaction().map_err(GrvError::Database)?;
        let result = f(&tx)?;
        tx.commit().map_err(GrvError::Database)?;
        Ok(result)
    }
}
