//! Submission tracking: who still owes a report for a date.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::error::Result;
use crate::store::{ReportStore, RosterSource};
use crate::types::Member;

#[derive(Clone)]
pub struct SubmissionTracker {
    roster: Arc<dyn RosterSource>,
    reports: Arc<dyn ReportStore>,
}

impl SubmissionTracker {
    pub fn new(roster: Arc<dyn RosterSource>, reports: Arc<dyn ReportStore>) -> Self {
        Self { roster, reports }
    }

    /// Active members with no report for `date`, ordered by id.
    ///
    /// The caller decides whether `date` is worth checking. Any store failure
    /// is returned as-is; an error never means "everyone submitted".
    pub fn missing_members(&self, date: NaiveDate) -> Result<Vec<Member>> {
        self.partition(date, false)
    }

    /// Active members who did report for `date`, ordered by id.
    pub fn submitted_members(&self, date: NaiveDate) -> Result<Vec<Member>> {
        self.partition(date, true)
    }

    fn partition(&self, date: NaiveDate, submitted: bool) -> Result<Vec<Member>> {
        let mut members = self.roster.active_members()?;
        members.sort_by(|a, b| a.id.cmp(&b.id));
        let mut out = Vec::with_capacity(members.len());
        for m in members {
            if self.reports.has_report(&m.id, date)? == submitted {
                out.push(m);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StandupError;
    use crate::store::test_support::open_tmp;
    use crate::types::Report;

    fn d() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
    }

    #[test]
    fn missing_is_roster_minus_submitted() {
        let (_dir, store) = open_tmp();
        store.upsert_member(Member::new("alice", "Alice", "U1")).unwrap();
        store.upsert_member(Member::new("bob", "Bob", "U2")).unwrap();
        store.insert_report(&Report::new("alice", d())).unwrap();

        let store = Arc::new(store);
        let tracker = SubmissionTracker::new(store.clone(), store);
        let missing: Vec<_> = tracker
            .missing_members(d())
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(missing, vec!["bob"]);
        let submitted: Vec<_> = tracker
            .submitted_members(d())
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(submitted, vec!["alice"]);
    }

    #[test]
    fn inactive_members_are_not_tracked() {
        let (_dir, store) = open_tmp();
        store.upsert_member(Member::new("bob", "Bob", "U2")).unwrap();
        store.set_member_active("bob", false).unwrap();
        let store = Arc::new(store);
        let tracker = SubmissionTracker::new(store.clone(), store);
        assert!(tracker.missing_members(d()).unwrap().is_empty());
    }

    struct DownStore;

    impl ReportStore for DownStore {
        fn get_report(&self, _: &str, _: NaiveDate) -> Result<Option<Report>> {
            Err(StandupError::StoreUnavailable("connection refused".into()))
        }
        fn reports_between(&self, _: NaiveDate, _: NaiveDate) -> Result<Vec<Report>> {
            Err(StandupError::StoreUnavailable("connection refused".into()))
        }
    }

    #[test]
    fn unreachable_store_is_an_error_not_an_empty_set() {
        let (_dir, store) = open_tmp();
        store.upsert_member(Member::new("bob", "Bob", "U2")).unwrap();
        let tracker = SubmissionTracker::new(Arc::new(store), Arc::new(DownStore));
        let err = tracker.missing_members(d()).unwrap_err();
        assert!(matches!(err, StandupError::StoreUnavailable(_)));
    }
}
