use chrono::NaiveDate;
use redb::ReadableTable;

use super::{date_bounds, db_err, decode, dated_key, encode, ReportStore, Store, REPORTS};
use crate::error::{Result, StandupError};
use crate::paths::validate_member_id;
use crate::types::Report;

impl Store {
    /// Store a report. Fails with `ReportExists` if the member already
    /// reported for that date; reports are immutable once stored.
    pub fn insert_report(&self, report: &Report) -> Result<()> {
        validate_member_id(&report.member_id)?;
        let key = dated_key(report.date, &report.member_id);
        let value = encode(report)?;
        let wt = self.db().begin_write().map_err(db_err)?;
        {
            let mut table = wt.open_table(REPORTS).map_err(db_err)?;
            if table.get(key.as_str()).map_err(db_err)?.is_some() {
                return Err(StandupError::ReportExists {
                    member: report.member_id.clone(),
                    date: report.date,
                });
            }
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(db_err)?;
        }
        wt.commit().map_err(db_err)?;
        Ok(())
    }

    /// All reports for one business date, ordered by member id.
    pub fn reports_for_date(&self, date: NaiveDate) -> Result<Vec<Report>> {
        let (lo, hi) = date_bounds(date);
        self.scan_reports(&lo, &hi)
    }

    fn scan_reports(&self, lo: &str, hi: &str) -> Result<Vec<Report>> {
        let rt = self.db().begin_read().map_err(db_err)?;
        let table = rt.open_table(REPORTS).map_err(db_err)?;
        let mut result = Vec::new();
        for entry in table.range(lo..hi).map_err(db_err)? {
            let (k, v) = entry.map_err(db_err)?;
            let report: Report = decode(v.value())?;
            check_key(k.value(), &report)?;
            result.push(report);
        }
        Ok(result)
    }
}

/// A record whose body disagrees with its key means two logical reports
/// share a slot. Never repaired here.
fn check_key(key: &str, report: &Report) -> Result<()> {
    let expected = dated_key(report.date, &report.member_id);
    if key != expected {
        tracing::error!(key, expected = %expected, "report stored under the wrong key");
        return Err(StandupError::InvariantViolation(format!(
            "report for '{}' on {} stored under key '{key}'",
            report.member_id, report.date
        )));
    }
    Ok(())
}

impl ReportStore for Store {
    fn get_report(&self, member_id: &str, date: NaiveDate) -> Result<Option<Report>> {
        let key = dated_key(date, member_id);
        let rt = self.db().begin_read().map_err(db_err)?;
        let table = rt.open_table(REPORTS).map_err(db_err)?;
        match table.get(key.as_str()).map_err(db_err)? {
            Some(v) => {
                let report: Report = decode(v.value())?;
                check_key(&key, &report)?;
                Ok(Some(report))
            }
            None => Ok(None),
        }
    }

    fn reports_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<Report>> {
        if to < from {
            return Ok(Vec::new());
        }
        let (lo, _) = date_bounds(from);
        let (_, hi) = date_bounds(to);
        self.scan_reports(&lo, &hi)
    }
}
