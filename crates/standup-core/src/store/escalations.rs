use chrono::{NaiveDate, Utc};
use redb::ReadableTable;

use super::{date_bounds, db_err, decode, dated_key, encode, Store, ESCALATIONS};
use crate::error::{Result, StandupError};
use crate::types::EscalationState;

impl Store {
    pub fn get_escalation(&self, member_id: &str, date: NaiveDate) -> Result<Option<EscalationState>> {
        let key = dated_key(date, member_id);
        let rt = self.db().begin_read().map_err(db_err)?;
        let table = rt.open_table(ESCALATIONS).map_err(db_err)?;
        match table.get(key.as_str()).map_err(db_err)? {
            Some(v) => Ok(Some(decode(v.value())?)),
            None => Ok(None),
        }
    }

    /// Escalation states for one business date, ordered by member id.
    pub fn escalations_for_date(&self, date: NaiveDate) -> Result<Vec<EscalationState>> {
        let (lo, hi) = date_bounds(date);
        let rt = self.db().begin_read().map_err(db_err)?;
        let table = rt.open_table(ESCALATIONS).map_err(db_err)?;
        let mut result = Vec::new();
        for entry in table.range(lo.as_str()..hi.as_str()).map_err(db_err)? {
            let (_, v) = entry.map_err(db_err)?;
            result.push(decode(v.value())?);
        }
        Ok(result)
    }

    /// Load (or lazily create) the state for `(member, date)`, apply `f`, and
    /// commit, all inside one write transaction.
    ///
    /// If `f` returns an error nothing is written. The stored tier may never
    /// move backwards and a satisfied state may never become pending again;
    /// either raises `InvariantViolation`.
    pub fn modify_escalation<T>(
        &self,
        member_id: &str,
        date: NaiveDate,
        f: impl FnOnce(&mut EscalationState) -> Result<T>,
    ) -> Result<(EscalationState, T)> {
        let key = dated_key(date, member_id);
        let wt = self.db().begin_write().map_err(db_err)?;
        let (state, out) = {
            let mut table = wt.open_table(ESCALATIONS).map_err(db_err)?;
            let before: Option<EscalationState> = match table.get(key.as_str()).map_err(db_err)? {
                Some(v) => Some(decode(v.value())?),
                None => None,
            };
            let mut state = before
                .clone()
                .unwrap_or_else(|| EscalationState::new(member_id, date));
            let out = f(&mut state)?;

            if let Some(prev) = &before {
                if state.tier() < prev.tier() {
                    tracing::error!(
                        member = member_id,
                        %date,
                        from = %prev.tier(),
                        to = %state.tier(),
                        "escalation tier regression"
                    );
                    return Err(StandupError::InvariantViolation(format!(
                        "tier for '{member_id}' on {date} would regress from {} to {}",
                        prev.tier(),
                        state.tier()
                    )));
                }
                if prev.is_satisfied() && !state.is_satisfied() {
                    return Err(StandupError::InvariantViolation(format!(
                        "satisfied escalation for '{member_id}' on {date} reopened"
                    )));
                }
            }

            if before.as_ref() != Some(&state) {
                state.updated_at = Utc::now();
                let value = encode(&state)?;
                table
                    .insert(key.as_str(), value.as_slice())
                    .map_err(db_err)?;
            }
            (state, out)
        };
        wt.commit().map_err(db_err)?;
        Ok((state, out))
    }
}
