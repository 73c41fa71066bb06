//! Escalation ledger: the per-(member, date) tier state machine.
//!
//! Each reminder cycle calls [`EscalationLedger::advance`] once for every
//! member still missing a report. A call moves the member exactly one tier
//! up (`none → reminded → escalated → management_notified`) and returns the
//! [`Action`] the Notifier must deliver. States are keyed by exact date, so a
//! new business date always starts from `none`; older rows stay for audit.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use crate::calendar::CalendarPolicy;
use crate::error::Result;
use crate::store::{ReportStore, Store};
use crate::types::{Action, Delivery, EscalationState, Standing, Tier};

#[derive(Clone)]
pub struct EscalationLedger {
    store: Store,
    reports: Arc<dyn ReportStore>,
    calendar: CalendarPolicy,
    ceiling: Tier,
    streak_window: usize,
}

impl EscalationLedger {
    pub fn new(
        store: Store,
        reports: Arc<dyn ReportStore>,
        calendar: CalendarPolicy,
        ceiling: Tier,
        streak_window: usize,
    ) -> Self {
        Self {
            store,
            reports,
            calendar,
            ceiling,
            streak_window,
        }
    }

    /// Advance `member_id` by one tier for `date` within reminder `cycle`.
    ///
    /// Returns `None` (and changes nothing) when the state was already
    /// advanced by this cycle, is at the ceiling, or is satisfied. A member
    /// who has submitted since the last cycle is marked satisfied.
    pub fn advance(&self, member_id: &str, date: NaiveDate, cycle: u8) -> Result<Option<Action>> {
        let submitted = self.reports.has_report(member_id, date)?;

        // Only the management tier carries the streak, so only count it then.
        let current = self
            .store
            .get_escalation(member_id, date)?
            .map(|s| s.tier())
            .unwrap_or(Tier::None);
        let streak = if !submitted && current.next() == Some(Tier::ManagementNotified) {
            self.missed_streak(member_id, date)?
        } else {
            0
        };

        let ceiling = self.ceiling;
        let (state, action) = self.store.modify_escalation(member_id, date, |state| {
            let tier = match state.standing {
                Standing::Satisfied { .. } => return Ok(None),
                Standing::Pending { tier } => tier,
            };
            if submitted {
                state.standing = Standing::Satisfied { last_tier: tier };
                return Ok(None);
            }
            if state.last_cycle == Some(cycle) {
                return Ok(None);
            }
            let Some(next) = tier.next().filter(|n| *n <= ceiling) else {
                return Ok(None);
            };
            state.standing = Standing::Pending { tier: next };
            state.last_cycle = Some(cycle);
            state.delivery = Delivery::NotAttempted;
            Ok(Action::for_tier(next, streak))
        })?;

        match &action {
            Some(a) => tracing::info!(
                member = member_id,
                %date,
                cycle,
                tier = %state.tier(),
                action = %a,
                "escalation advanced"
            ),
            None => tracing::debug!(
                member = member_id,
                %date,
                cycle,
                tier = %state.tier(),
                "escalation unchanged"
            ),
        }
        Ok(action)
    }

    /// Whether `cycle` already advanced this member on `date`.
    pub fn has_advanced_today(&self, member_id: &str, date: NaiveDate, cycle: u8) -> Result<bool> {
        Ok(self
            .store
            .get_escalation(member_id, date)?
            .is_some_and(|s| s.last_cycle == Some(cycle)))
    }

    /// The action for a transition made by `cycle` whose delivery was never
    /// attempted, e.g. because the process died between `advance` and the
    /// Notifier call. `None` once delivery was attempted or the member
    /// submitted.
    pub fn undelivered_action(
        &self,
        member_id: &str,
        date: NaiveDate,
        cycle: u8,
    ) -> Result<Option<Action>> {
        let Some(state) = self.store.get_escalation(member_id, date)? else {
            return Ok(None);
        };
        let Standing::Pending { tier } = state.standing else {
            return Ok(None);
        };
        if state.last_cycle != Some(cycle) || state.delivery != Delivery::NotAttempted {
            return Ok(None);
        }
        let streak = if tier == Tier::ManagementNotified {
            self.missed_streak(member_id, date)?
        } else {
            0
        };
        Ok(Action::for_tier(tier, streak))
    }

    /// What reminder `cycle` would send this member on `date`, without
    /// writing anything. Mirrors [`advance`](Self::advance) followed by the
    /// redelivery check the scheduler performs for an already advanced cycle.
    pub fn pending_action(
        &self,
        member_id: &str,
        date: NaiveDate,
        cycle: u8,
    ) -> Result<Option<Action>> {
        if self.reports.has_report(member_id, date)? {
            return Ok(None);
        }
        let state = self.store.get_escalation(member_id, date)?;
        if state.as_ref().is_some_and(|s| s.last_cycle == Some(cycle)) {
            return self.undelivered_action(member_id, date, cycle);
        }
        let tier = match state.map(|s| s.standing) {
            Some(Standing::Satisfied { .. }) => return Ok(None),
            Some(Standing::Pending { tier }) => tier,
            None => Tier::None,
        };
        let Some(next) = tier.next().filter(|n| *n <= self.ceiling) else {
            return Ok(None);
        };
        let streak = if next == Tier::ManagementNotified {
            self.missed_streak(member_id, date)?
        } else {
            0
        };
        Ok(Action::for_tier(next, streak))
    }

    /// Record the Notifier outcome for the latest transition.
    pub fn record_delivery(
        &self,
        member_id: &str,
        date: NaiveDate,
        delivery: Delivery,
    ) -> Result<EscalationState> {
        let (state, _) = self.store.modify_escalation(member_id, date, |state| {
            state.delivery = delivery;
            Ok(())
        })?;
        Ok(state)
    }

    /// Mark an existing pending state satisfied after a report arrives.
    /// Members that were never reminded get no row.
    pub fn settle(&self, member_id: &str, date: NaiveDate) -> Result<Option<EscalationState>> {
        if self.store.get_escalation(member_id, date)?.is_none() {
            return Ok(None);
        }
        let (state, _) = self.store.modify_escalation(member_id, date, |state| {
            if let Standing::Pending { tier } = state.standing {
                state.standing = Standing::Satisfied { last_tier: tier };
            }
            Ok(())
        })?;
        Ok(Some(state))
    }

    pub fn get(&self, member_id: &str, date: NaiveDate) -> Result<Option<EscalationState>> {
        self.store.get_escalation(member_id, date)
    }

    pub fn list_for_date(&self, date: NaiveDate) -> Result<Vec<EscalationState>> {
        self.store.escalations_for_date(date)
    }

    /// Consecutive working days up to and including `date` on which
    /// `member_id` filed no report, looking back at most `streak_window`
    /// working days.
    pub fn missed_streak(&self, member_id: &str, date: NaiveDate) -> Result<u32> {
        let mut streak = 0;
        for day in self.calendar.working_days_back(date, self.streak_window) {
            if self.reports.has_report(member_id, day)? {
                break;
            }
            streak += 1;
        }
        Ok(streak)
    }
}

/// `Delivery::Delivered` stamped now.
pub fn delivered_now() -> Delivery {
    Delivery::Delivered { at: Utc::now() }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
