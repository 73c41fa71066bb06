use chrono::{NaiveDate, Utc};
use redb::ReadableTable;

use super::{date_bounds, db_err, decode, dated_key, encode, Store, RUNS};
use crate::error::Result;
use crate::schedule_run::{RunKind, RunStatus, ScheduleRun};

impl Store {
    pub fn get_run(&self, date: NaiveDate, kind: RunKind) -> Result<Option<ScheduleRun>> {
        let key = dated_key(date, kind);
        let rt = self.db().begin_read().map_err(db_err)?;
        let table = rt.open_table(RUNS).map_err(db_err)?;
        match table.get(key.as_str()).map_err(db_err)? {
            Some(v) => Ok(Some(decode(v.value())?)),
            None => Ok(None),
        }
    }

    /// Runs recorded for one business date, in trigger order.
    pub fn runs_for_date(&self, date: NaiveDate) -> Result<Vec<ScheduleRun>> {
        let (lo, hi) = date_bounds(date);
        let rt = self.db().begin_read().map_err(db_err)?;
        let table = rt.open_table(RUNS).map_err(db_err)?;
        let mut result: Vec<ScheduleRun> = Vec::new();
        for entry in table.range(lo.as_str()..hi.as_str()).map_err(db_err)? {
            let (_, v) = entry.map_err(db_err)?;
            result.push(decode(v.value())?);
        }
        result.sort_by_key(|r| r.kind);
        Ok(result)
    }

    /// Most recent runs first, at most `limit`.
    ///
    /// Walks the date-prefixed keys backwards and stops once `limit` runs are
    /// in hand and the date being read is complete.
    pub fn recent_runs(&self, limit: usize) -> Result<Vec<ScheduleRun>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let rt = self.db().begin_read().map_err(db_err)?;
        let table = rt.open_table(RUNS).map_err(db_err)?;
        let mut result: Vec<ScheduleRun> = Vec::new();
        for entry in table.iter().map_err(db_err)?.rev() {
            let (_, v) = entry.map_err(db_err)?;
            let run: ScheduleRun = decode(v.value())?;
            if result.len() >= limit && result.last().is_some_and(|r| r.date != run.date) {
                break;
            }
            result.push(run);
        }
        result.sort_by(|a, b| b.date.cmp(&a.date).then(b.kind.cmp(&a.kind)));
        result.truncate(limit);
        Ok(result)
    }

    /// Apply `f` to the run for `(date, kind)` (created `Pending` if absent)
    /// and commit in one write transaction.
    pub fn update_run<T>(
        &self,
        date: NaiveDate,
        kind: RunKind,
        f: impl FnOnce(&mut ScheduleRun) -> T,
    ) -> Result<(ScheduleRun, T)> {
        let key = dated_key(date, kind);
        let wt = self.db().begin_write().map_err(db_err)?;
        let (run, out) = {
            let mut table = wt.open_table(RUNS).map_err(db_err)?;
            let mut run: ScheduleRun = match table.get(key.as_str()).map_err(db_err)? {
                Some(v) => decode(v.value())?,
                None => ScheduleRun::new(date, kind),
            };
            let out = f(&mut run);
            run.updated_at = Utc::now();
            let value = encode(&run)?;
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(db_err)?;
            (run, out)
        };
        wt.commit().map_err(db_err)?;
        Ok((run, out))
    }

    /// Move `(date, kind)` from absent/`Pending` to `Running`.
    ///
    /// Returns `None` if the run is terminal or already running, which is
    /// what makes a duplicate fire a no-op.
    pub fn claim_run(&self, date: NaiveDate, kind: RunKind) -> Result<Option<ScheduleRun>> {
        let (run, claimed) = self.update_run(date, kind, |run| {
            if run.status.is_terminal() || run.status == RunStatus::Running {
                return false;
            }
            run.status = RunStatus::Running;
            run.attempts += 1;
            run.started_at = Some(Utc::now());
            run.finished_at = None;
            true
        })?;
        Ok(claimed.then_some(run))
    }

    /// On startup, reset every `Running` run to `Pending`.
    ///
    /// redb holds an exclusive file lock, so a `Running` record found at open
    /// time belongs to a process that died mid-run. Returns the number reset.
    pub fn startup_recovery(&self) -> Result<u32> {
        let wt = self.db().begin_write().map_err(db_err)?;
        let count = {
            let mut table = wt.open_table(RUNS).map_err(db_err)?;
            let mut stale: Vec<(String, ScheduleRun)> = Vec::new();
            for entry in table.iter().map_err(db_err)? {
                let (k, v) = entry.map_err(db_err)?;
                let run: ScheduleRun = decode(v.value())?;
                if run.status == RunStatus::Running {
                    stale.push((k.value().to_string(), run));
                }
            }
            for (key, mut run) in stale.iter().cloned() {
                run.status = RunStatus::Pending;
                run.last_error = Some("interrupted by restart".into());
                run.updated_at = Utc::now();
                let value = encode(&run)?;
                table
                    .insert(key.as_str(), value.as_slice())
                    .map_err(db_err)?;
            }
            stale.len() as u32
        };
        wt.commit().map_err(db_err)?;
        Ok(count)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::open_tmp;

    fn d() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
    }

    #[test]
    fn claim_creates_running_record() {
        let (_dir, store) = open_tmp();
        let run = store.claim_run(d(), RunKind::Prompt).unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Running);
        assert_eq!(run.attempts, 1);
        let stored = store.get_run(d(), RunKind::Prompt).unwrap().unwrap();
        assert_eq!(stored.id, run.id);
    }

    #[test]
    fn claim_twice_returns_none() {
        let (_dir, store) = open_tmp();
        assert!(store.claim_run(d(), RunKind::Prompt).unwrap().is_some());
        assert!(store.claim_run(d(), RunKind::Prompt).unwrap().is_none());
    }

    #[test]
    fn terminal_runs_cannot_be_claimed() {
        let (_dir, store) = open_tmp();
        store
            .update_run(d(), RunKind::Reminder { slot: 0 }, |r| {
                r.status = RunStatus::Completed
            })
            .unwrap();
        assert!(store
            .claim_run(d(), RunKind::Reminder { slot: 0 })
            .unwrap()
            .is_none());
        // A different slot is independent
        assert!(store
            .claim_run(d(), RunKind::Reminder { slot: 1 })
            .unwrap()
            .is_some());
    }

    #[test]
    fn pending_run_can_be_reclaimed() {
        let (_dir, store) = open_tmp();
        store.claim_run(d(), RunKind::Prompt).unwrap();
        store
            .update_run(d(), RunKind::Prompt, |r| r.status = RunStatus::Pending)
            .unwrap();
        let again = store.claim_run(d(), RunKind::Prompt).unwrap().unwrap();
        assert_eq!(again.attempts, 2);
    }

    #[test]
    fn startup_recovery_resets_running_to_pending() {
        let (_dir, store) = open_tmp();
        store.claim_run(d(), RunKind::Prompt).unwrap();
        store
            .update_run(d(), RunKind::Reminder { slot: 0 }, |r| {
                r.status = RunStatus::Completed
            })
            .unwrap();

        let recovered = store.startup_recovery().unwrap();
        assert_eq!(recovered, 1);

        let prompt = store.get_run(d(), RunKind::Prompt).unwrap().unwrap();
        assert_eq!(prompt.status, RunStatus::Pending);
        assert!(prompt.last_error.unwrap().contains("restart"));
        let reminder = store
            .get_run(d(), RunKind::Reminder { slot: 0 })
            .unwrap()
            .unwrap();
        assert_eq!(reminder.status, RunStatus::Completed);
    }

    #[test]
    fn startup_recovery_on_empty_db_returns_zero() {
        let (_dir, store) = open_tmp();
        assert_eq!(store.startup_recovery().unwrap(), 0);
    }

    #[test]
    fn runs_for_date_sorted_by_kind() {
        let (_dir, store) = open_tmp();
        store.claim_run(d(), RunKind::WeeklySummary).unwrap();
        store.claim_run(d(), RunKind::Reminder { slot: 1 }).unwrap();
        store.claim_run(d(), RunKind::Prompt).unwrap();
        store
            .claim_run(d().succ_opt().unwrap(), RunKind::Prompt)
            .unwrap();
        let kinds: Vec<_> = store
            .runs_for_date(d())
            .unwrap()
            .into_iter()
            .map(|r| r.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                RunKind::Prompt,
                RunKind::Reminder { slot: 1 },
                RunKind::WeeklySummary
            ]
        );
    }

    #[test]
    fn recent_runs_newest_first() {
        let (_dir, store) = open_tmp();
        let next = d().succ_opt().unwrap();
        store.claim_run(d(), RunKind::Prompt).unwrap();
        store.claim_run(next, RunKind::Prompt).unwrap();
        let runs = store.recent_runs(1).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].date, next);
    }

    #[test]
    fn recent_runs_keep_trigger_order_within_the_newest_day() {
        let (_dir, store) = open_tmp();
        for offset in 0..30 {
            let day = d() + chrono::Days::new(offset);
            store.claim_run(day, RunKind::Prompt).unwrap();
            store.claim_run(day, RunKind::Reminder { slot: 0 }).unwrap();
            store.claim_run(day, RunKind::WeeklySummary).unwrap();
        }
        let last = d() + chrono::Days::new(29);
        let runs = store.recent_runs(4).unwrap();
        let got: Vec<_> = runs.iter().map(|r| (r.date, r.kind)).collect();
        assert_eq!(
            got,
            vec![
                (last, RunKind::WeeklySummary),
                (last, RunKind::Reminder { slot: 0 }),
                (last, RunKind::Prompt),
                (last.pred_opt().unwrap(), RunKind::WeeklySummary),
            ]
        );
        assert!(store.recent_runs(0).unwrap().is_empty());
    }
}
