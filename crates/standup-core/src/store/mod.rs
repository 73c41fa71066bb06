//! Persistent storage using redb.
//!
//! # Table design
//!
//! Four tables keyed by UTF-8 strings, values are JSON-encoded records:
//! ```text
//! members      <member_id>               → Member
//! reports      <YYYY-MM-DD>/<member_id>  → Report
//! escalations  <YYYY-MM-DD>/<member_id>  → EscalationState
//! runs         <YYYY-MM-DD>/<run_kind>   → ScheduleRun
//! ```
//!
//! ISO dates sort lexicographically in calendar order, so a range scan over
//! `"<date>/".."<date>0"` (`'/'` < `'0'`) returns exactly one business date.
//! redb serializes write transactions, which gives every read-check-write in
//! this module single-writer-per-key semantics.

pub mod escalations;
pub mod members;
pub mod reports;
pub mod runs;

use std::{path::Path, sync::Arc};

use chrono::NaiveDate;
use redb::{Database, TableDefinition};

use crate::error::{Result, StandupError};
use crate::types::{Member, Report};

// ---------------------------------------------------------------------------
// Table definitions
// ---------------------------------------------------------------------------

pub(crate) const MEMBERS: TableDefinition<&str, &[u8]> = TableDefinition::new("members");
pub(crate) const REPORTS: TableDefinition<&str, &[u8]> = TableDefinition::new("reports");
pub(crate) const ESCALATIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("escalations");
pub(crate) const RUNS: TableDefinition<&str, &[u8]> = TableDefinition::new("runs");

// ---------------------------------------------------------------------------
// Key helpers
// ---------------------------------------------------------------------------

pub(crate) fn dated_key(date: NaiveDate, suffix: impl std::fmt::Display) -> String {
    format!("{}/{}", date.format("%Y-%m-%d"), suffix)
}

/// Half-open bounds covering every key for `date`.
pub(crate) fn date_bounds(date: NaiveDate) -> (String, String) {
    let d = date.format("%Y-%m-%d");
    (format!("{d}/"), format!("{d}0"))
}

/// Every storage-layer failure surfaces as `StoreUnavailable` so callers can
/// retry without matching on redb's error zoo.
pub(crate) fn db_err(e: impl std::fmt::Display) -> StandupError {
    StandupError::StoreUnavailable(e.to_string())
}

// ---------------------------------------------------------------------------
// Collaborator traits
// ---------------------------------------------------------------------------

/// Read access to submitted reports.
pub trait ReportStore: Send + Sync {
    fn get_report(&self, member_id: &str, date: NaiveDate) -> Result<Option<Report>>;

    fn has_report(&self, member_id: &str, date: NaiveDate) -> Result<bool> {
        Ok(self.get_report(member_id, date)?.is_some())
    }

    /// Reports with `from <= date <= to`, ordered by date then member.
    fn reports_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<Report>>;
}

/// The set of members currently expected to report.
pub trait RosterSource: Send + Sync {
    fn active_members(&self) -> Result<Vec<Member>>;
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Handle to the redb database. Cheap to clone.
#[derive(Clone)]
pub struct Store {
    db: Arc<Database>,
}

impl Store {
    /// Open or create the database at `path`, creating all tables.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path).map_err(db_err)?;
        // Ensure the tables exist before any reads
        let wt = db.begin_write().map_err(db_err)?;
        for table in [MEMBERS, REPORTS, ESCALATIONS, RUNS] {
            wt.open_table(table).map_err(db_err)?;
        }
        wt.commit().map_err(db_err)?;
        Ok(Self { db: Arc::new(db) })
    }

    pub(crate) fn db(&self) -> &Database {
        &self.db
    }
}

pub(crate) fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

pub(crate) fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(bytes)?)
}
