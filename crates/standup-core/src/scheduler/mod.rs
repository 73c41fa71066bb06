//! Job scheduler: daily triggers, catch-up and the tick loop.
//!
//! Every decision is a function of the current wall-clock time and the
//! persisted [`ScheduleRun`] records. A tick computes today's business date in
//! the configured timezone, lists the triggers whose time has passed and whose
//! run is not yet terminal, and executes them in trigger order. Because nothing
//! depends on in-memory timers, a late or suspended tick delays a run but
//! never drops or repeats it.

mod clock;

pub use clock::{Clock, FixedClock, SystemClock};

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tokio::time::MissedTickBehavior;

use crate::calendar::CalendarPolicy;
use crate::config::{Config, EscalationConfig, ResolvedSchedule};
use crate::error::{Result, StandupError};
use crate::ledger::{delivered_now, EscalationLedger};
use crate::notify::{retry, retry_transient, Notifier, RetryPolicy};
use crate::paths;
use crate::roster::{self, RosterFile, SyncReport};
use crate::schedule_run::{DeliveryFailure, RunKind, RunStatus, RunSummary, ScheduleRun};
use crate::store::{ReportStore, RosterSource, Store};
use crate::summary::{DigestSummarizer, Summarizer};
use crate::tracker::SubmissionTracker;
use crate::types::{Delivery, EscalationState, Member};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// One daily trigger: a run kind and the local time it becomes due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Trigger {
    pub kind: RunKind,
    pub at: NaiveTime,
}

/// Broadcast whenever a run reaches a new status.
#[derive(Debug, Clone, Serialize)]
pub struct RunEvent {
    pub date: NaiveDate,
    pub kind: RunKind,
    pub status: RunStatus,
    pub summary: RunSummary,
}

#[derive(Debug, Clone)]
pub enum RunOutcome {
    Completed(ScheduleRun),
    Skipped(ScheduleRun),
    /// The run was terminal or already running; nothing was done.
    AlreadyHandled(ScheduleRun),
}

impl RunOutcome {
    pub fn run(&self) -> &ScheduleRun {
        match self {
            RunOutcome::Completed(r) | RunOutcome::Skipped(r) | RunOutcome::AlreadyHandled(r) => r,
        }
    }

    pub fn executed(&self) -> bool {
        !matches!(self, RunOutcome::AlreadyHandled(_))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TriggerStatus {
    pub kind: RunKind,
    pub at: NaiveTime,
    /// Run status, or `not_started` when no run exists yet.
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Everything the dashboard shows for one business date.
#[derive(Debug, Clone, Serialize)]
pub struct DayStatus {
    pub date: NaiveDate,
    pub working_day: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rest_reason: Option<&'static str>,
    pub triggers: Vec<TriggerStatus>,
    pub missing: Vec<String>,
    pub submitted: Vec<String>,
    pub escalations: Vec<EscalationState>,
}

/// One notice a run would send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedNotice {
    pub member_id: String,
    /// `prompt`, `summary` or the escalation action.
    pub action: String,
}

/// What executing `(date, kind)` would do, computed without claiming the run
/// or touching the ledger.
#[derive(Debug, Clone, Serialize)]
pub struct RunPreview {
    pub date: NaiveDate,
    pub kind: RunKind,
    /// Current run status, or `not_started`.
    pub status: String,
    /// False when the run is terminal or running and would be left alone.
    pub would_execute: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rest_reason: Option<&'static str>,
    pub notices: Vec<PlannedNotice>,
}

enum MemberOutcome {
    Delivered,
    Unchanged,
    Failed(DeliveryFailure),
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct Scheduler {
    store: Store,
    calendar: CalendarPolicy,
    escalation: EscalationConfig,
    roster: Arc<dyn RosterSource>,
    reports: Arc<dyn ReportStore>,
    tracker: SubmissionTracker,
    ledger: EscalationLedger,
    notifier: Arc<dyn Notifier>,
    summarizer: Arc<dyn Summarizer>,
    schedule: ResolvedSchedule,
    retry: RetryPolicy,
    clock: Arc<dyn Clock>,
    events: Option<broadcast::Sender<RunEvent>>,
    /// Project root whose `.standup/roster.yaml` is synced before each run.
    roster_root: Option<PathBuf>,
}

impl Scheduler {
    /// Build a scheduler whose roster and reports come from `store`.
    ///
    /// Fails with `Configuration` if the schedule does not resolve.
    pub fn new(store: Store, config: &Config, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let schedule = config.resolve()?;
        let calendar = config.calendar();
        let escalation = config.escalation.clone();
        let shared = Arc::new(store.clone());
        let roster: Arc<dyn RosterSource> = shared.clone();
        let reports: Arc<dyn ReportStore> = shared;
        let tracker = SubmissionTracker::new(roster.clone(), reports.clone());
        let ledger = EscalationLedger::new(
            store.clone(),
            reports.clone(),
            calendar.clone(),
            escalation.ceiling,
            escalation.streak_window,
        );
        Ok(Self {
            store,
            calendar,
            escalation,
            roster,
            reports,
            tracker,
            ledger,
            notifier,
            summarizer: Arc::new(DigestSummarizer),
            schedule,
            retry: RetryPolicy::from(&config.notifier),
            clock: Arc::new(SystemClock),
            events: None,
            roster_root: None,
        })
    }

    /// Replace the roster and report sources.
    pub fn with_sources(
        mut self,
        roster: Arc<dyn RosterSource>,
        reports: Arc<dyn ReportStore>,
    ) -> Self {
        self.tracker = SubmissionTracker::new(roster.clone(), reports.clone());
        self.ledger = EscalationLedger::new(
            self.store.clone(),
            reports.clone(),
            self.calendar.clone(),
            self.escalation.ceiling,
            self.escalation.streak_window,
        );
        self.roster = roster;
        self.reports = reports;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = summarizer;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sync `.standup/roster.yaml` under `root` into the store at the start
    /// of every prompt, reminder and summary run.
    pub fn with_roster_file(mut self, root: impl Into<PathBuf>) -> Self {
        self.roster_root = Some(root.into());
        self
    }

    pub fn with_events(mut self, tx: broadcast::Sender<RunEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn ledger(&self) -> &EscalationLedger {
        &self.ledger
    }

    pub fn tracker(&self) -> &SubmissionTracker {
        &self.tracker
    }

    pub fn calendar(&self) -> &CalendarPolicy {
        &self.calendar
    }

    pub fn schedule(&self) -> &ResolvedSchedule {
        &self.schedule
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // -----------------------------------------------------------------------
    // Time
    // -----------------------------------------------------------------------

    /// The calendar date at `now` in the configured timezone.
    pub fn business_date(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.schedule.timezone).date_naive()
    }

    pub fn today(&self) -> NaiveDate {
        self.business_date(self.clock.now())
    }

    /// Triggers for `date`, in firing order.
    pub fn triggers_for(&self, date: NaiveDate) -> Vec<Trigger> {
        let mut out = vec![Trigger {
            kind: RunKind::Prompt,
            at: self.schedule.prompt_at,
        }];
        for (slot, at) in self.schedule.reminders_at.iter().enumerate() {
            out.push(Trigger {
                kind: RunKind::Reminder { slot: slot as u8 },
                at: *at,
            });
        }
        if let Some((weekday, at)) = self.schedule.weekly_summary {
            if date.weekday() == weekday {
                out.push(Trigger {
                    kind: RunKind::WeeklySummary,
                    at,
                });
            }
        }
        out.sort_by_key(|t| (t.at, t.kind));
        out
    }

    /// Business date at `now` and the run kinds whose time has passed and
    /// whose run is neither terminal nor running.
    pub fn due_runs(&self, now: DateTime<Utc>) -> Result<(NaiveDate, Vec<RunKind>)> {
        let date = self.business_date(now);
        let time = now.with_timezone(&self.schedule.timezone).time();
        let mut due = Vec::new();
        for trigger in self.triggers_for(date) {
            if trigger.at > time {
                continue;
            }
            match self.store.get_run(date, trigger.kind)? {
                Some(run) if run.status.is_terminal() || run.status == RunStatus::Running => {}
                _ => due.push(trigger.kind),
            }
        }
        Ok((date, due))
    }

    // -----------------------------------------------------------------------
    // Loop
    // -----------------------------------------------------------------------

    /// Execute every due run in trigger order. Stops at the first run that
    /// fails so later triggers never overtake an earlier one.
    pub async fn tick(&self) -> Result<Vec<RunOutcome>> {
        let (date, due) = self.due_runs(self.clock.now())?;
        let mut outcomes = Vec::with_capacity(due.len());
        for kind in due {
            outcomes.push(self.execute(date, kind, false).await?);
        }
        Ok(outcomes)
    }

    /// Reset interrupted runs, then catch up on everything already due.
    pub async fn recover(&self) -> Result<Vec<RunOutcome>> {
        let store = self.store.clone();
        let reset = blocking(move || store.startup_recovery()).await?;
        if reset > 0 {
            tracing::warn!(reset, "interrupted runs reset to pending");
        }
        let outcomes = self.tick().await?;
        let caught_up = outcomes.iter().filter(|o| o.executed()).count();
        if caught_up > 0 {
            tracing::info!(caught_up, "catch-up finished");
        }
        Ok(outcomes)
    }

    /// Run until `shutdown` flips (or its sender is dropped).
    ///
    /// On shutdown the in-flight catch-up or tick gets `shutdown_grace` to
    /// finish; a run cut short stays `running` and is recovered on the next
    /// start.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            timezone = %self.schedule.timezone,
            tick = ?self.schedule.tick,
            "scheduler started"
        );
        if self.drive("catch-up", self.recover(), &mut shutdown).await {
            tracing::info!("scheduler stopped");
            return;
        }

        let mut interval = tokio::time::interval(self.schedule.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately and recover() already ran.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = shutdown.changed() => break,
            }
            if self.drive("tick", self.tick(), &mut shutdown).await {
                break;
            }
        }
        tracing::info!("scheduler stopped");
    }

    /// Await `work` unless shutdown is requested first, then give it
    /// `shutdown_grace` more. Returns true when shutdown was requested.
    async fn drive(
        &self,
        what: &'static str,
        work: impl Future<Output = Result<Vec<RunOutcome>>>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> bool {
        tokio::pin!(work);
        tokio::select! {
            res = &mut work => {
                log_pass(what, res);
                false
            }
            _ = shutdown.changed() => {
                tracing::info!(
                    grace = ?self.schedule.shutdown_grace,
                    "shutdown requested, waiting for in-flight run"
                );
                match tokio::time::timeout(self.schedule.shutdown_grace, &mut work).await {
                    Ok(res) => log_pass(what, res),
                    Err(_) => tracing::warn!(what, "grace period elapsed, abandoning in-flight run"),
                }
                true
            }
        }
    }

    // -----------------------------------------------------------------------
    // Execution
    // -----------------------------------------------------------------------

    /// Execute `(date, kind)` now, bypassing the trigger time.
    ///
    /// Without `force` the usual idempotence applies and a terminal run is
    /// left alone. With `force` a terminal run is reopened first; the ledger
    /// still guarantees no member is advanced twice by the same cycle.
    pub async fn run_now(&self, date: NaiveDate, kind: RunKind, force: bool) -> Result<RunOutcome> {
        self.execute(date, kind, force).await
    }

    /// Compute what `run_now(date, kind, force)` would send. Reads only:
    /// no run is claimed, no member advanced and no delivery recorded.
    pub async fn preview(&self, date: NaiveDate, kind: RunKind, force: bool) -> Result<RunPreview> {
        self.check_slot(kind)?;
        let this = self.clone();
        blocking(move || this.preview_blocking(date, kind, force)).await
    }

    fn preview_blocking(&self, date: NaiveDate, kind: RunKind, force: bool) -> Result<RunPreview> {
        let current = self.store.get_run(date, kind)?;
        let status = current
            .as_ref()
            .map_or_else(|| "not_started".to_string(), |r| r.status.to_string());
        let would_execute = match current.as_ref().map(|r| &r.status) {
            Some(RunStatus::Running) => false,
            Some(s) if s.is_terminal() => force,
            _ => true,
        };
        let rest_reason = self.calendar.rest_reason(date);

        let mut notices = Vec::new();
        if would_execute && rest_reason.is_none() {
            match kind {
                RunKind::Prompt => {
                    for m in self.roster.active_members()? {
                        notices.push(PlannedNotice {
                            member_id: m.id,
                            action: "prompt".into(),
                        });
                    }
                }
                RunKind::Reminder { slot } => {
                    for m in self.tracker.missing_members(date)? {
                        if let Some(action) = self.ledger.pending_action(&m.id, date, slot)? {
                            notices.push(PlannedNotice {
                                member_id: m.id,
                                action: action.to_string(),
                            });
                        }
                    }
                }
                RunKind::WeeklySummary => notices.push(PlannedNotice {
                    member_id: "management".into(),
                    action: "summary".into(),
                }),
            }
        }
        Ok(RunPreview {
            date,
            kind,
            status,
            would_execute,
            rest_reason,
            notices,
        })
    }

    fn check_slot(&self, kind: RunKind) -> Result<()> {
        if let RunKind::Reminder { slot } = kind {
            let configured = self.schedule.reminders_at.len();
            if slot as usize >= configured {
                return Err(StandupError::InvalidRunKind(format!(
                    "{kind} (only {configured} reminder slot(s) configured)"
                )));
            }
        }
        Ok(())
    }

    async fn execute(&self, date: NaiveDate, kind: RunKind, force: bool) -> Result<RunOutcome> {
        self.check_slot(kind)?;

        if force {
            let store = self.store.clone();
            blocking(move || {
                store.update_run(date, kind, |run| {
                    if run.status.is_terminal() {
                        run.status = RunStatus::Pending;
                    }
                })
            })
            .await?;
        }

        let (claimed, _) = retry_transient(&self.retry, || {
            let store = self.store.clone();
            blocking(move || store.claim_run(date, kind))
        })
        .await;
        let Some(run) = claimed? else {
            let current = self
                .store
                .get_run(date, kind)?
                .unwrap_or_else(|| ScheduleRun::new(date, kind));
            tracing::debug!(%date, %kind, status = %current.status, "run already handled");
            return Ok(RunOutcome::AlreadyHandled(current));
        };
        tracing::info!(%date, %kind, attempt = run.attempts, "run started");
        self.emit(&run);

        if let Some(reason) = self.calendar.rest_reason(date) {
            let run = self
                .finish(
                    date,
                    kind,
                    RunStatus::Skipped {
                        reason: reason.to_string(),
                    },
                    RunSummary::default(),
                    None,
                )
                .await?;
            tracing::info!(%date, %kind, reason, "run skipped");
            return Ok(RunOutcome::Skipped(run));
        }

        self.refresh_roster().await;
        let result = match kind {
            RunKind::Prompt => self.prompt_all(date).await,
            RunKind::Reminder { slot } => self.remind_missing(date, slot).await,
            RunKind::WeeklySummary => self.weekly_summary(date).await,
        };

        match result {
            Ok(summary) => {
                let run = self
                    .finish(date, kind, RunStatus::Completed, summary, None)
                    .await?;
                tracing::info!(
                    %date,
                    %kind,
                    attempted = run.summary.attempted,
                    delivered = run.summary.delivered,
                    unchanged = run.summary.unchanged,
                    failed = run.summary.failed(),
                    "run completed"
                );
                Ok(RunOutcome::Completed(run))
            }
            Err(e) => {
                tracing::error!(%date, %kind, error = %e, "run failed, left pending");
                self.finish(
                    date,
                    kind,
                    RunStatus::Pending,
                    RunSummary::default(),
                    Some(e.to_string()),
                )
                .await?;
                Err(e)
            }
        }
    }

    async fn finish(
        &self,
        date: NaiveDate,
        kind: RunKind,
        status: RunStatus,
        summary: RunSummary,
        last_error: Option<String>,
    ) -> Result<ScheduleRun> {
        let (res, _) = retry_transient(&self.retry, || {
            let store = self.store.clone();
            let status = status.clone();
            let summary = summary.clone();
            let last_error = last_error.clone();
            blocking(move || {
                store.update_run(date, kind, |run| {
                    run.finished_at = status.is_terminal().then(Utc::now);
                    run.status = status;
                    run.summary = summary;
                    run.last_error = last_error;
                })
            })
        })
        .await;
        let (run, ()) = res?;
        self.emit(&run);
        Ok(run)
    }

    /// Apply the roster file to the store. `None` when no roster file is
    /// configured or present.
    pub async fn sync_roster(&self) -> Result<Option<SyncReport>> {
        let Some(root) = self.roster_root.clone() else {
            return Ok(None);
        };
        let store = self.store.clone();
        blocking(move || {
            if !paths::roster_path(&root).exists() {
                return Ok(None);
            }
            let file = RosterFile::load(&root)?;
            roster::sync(&store, &file).map(Some)
        })
        .await
    }

    /// A broken roster file must not stop reminders; the stored roster from
    /// the last good sync stays in effect.
    async fn refresh_roster(&self) {
        if let Err(e) = self.sync_roster().await {
            tracing::warn!(error = %e, "roster refresh failed, using stored roster");
        }
    }

    fn emit(&self, run: &ScheduleRun) {
        if let Some(tx) = &self.events {
            // No subscribers is fine.
            let _ = tx.send(RunEvent {
                date: run.date,
                kind: run.kind,
                status: run.status.clone(),
                summary: run.summary.clone(),
            });
        }
    }

    // -----------------------------------------------------------------------
    // Run kinds
    // -----------------------------------------------------------------------

    async fn prompt_all(&self, date: NaiveDate) -> Result<RunSummary> {
        let (members, _) = retry_transient(&self.retry, || {
            let roster = self.roster.clone();
            blocking(move || roster.active_members())
        })
        .await;
        let members = members?;
        tracing::info!(%date, members = members.len(), "prompting");
        let outcomes: Vec<MemberOutcome> = stream::iter(members)
            .map(|m| self.prompt_member(m))
            .buffer_unordered(self.schedule.concurrency)
            .collect()
            .await;
        Ok(tally(outcomes))
    }

    async fn prompt_member(&self, member: Member) -> MemberOutcome {
        let notifier = &self.notifier;
        let m = &member;
        let (res, attempts) = retry(&self.retry, move || notifier.send_prompt(m)).await;
        match res {
            Ok(()) => MemberOutcome::Delivered,
            Err(e) => {
                tracing::error!(member = %member.id, attempts, error = %e, "prompt delivery failed");
                MemberOutcome::Failed(DeliveryFailure {
                    member_id: member.id,
                    reason: e.to_string(),
                })
            }
        }
    }

    async fn remind_missing(&self, date: NaiveDate, slot: u8) -> Result<RunSummary> {
        let (missing, attempts) = retry_transient(&self.retry, || {
            let tracker = self.tracker.clone();
            blocking(move || tracker.missing_members(date))
        })
        .await;
        let missing = missing.inspect_err(|e| {
            tracing::warn!(%date, slot, attempts, error = %e, "could not determine missing members");
        })?;
        tracing::info!(%date, slot, missing = missing.len(), "reminder cycle");
        let results: Vec<Result<MemberOutcome>> = stream::iter(missing)
            .map(|m| self.remind_member(m, date, slot))
            .buffer_unordered(self.schedule.concurrency)
            .collect()
            .await;
        // Members whose escalation could not be read or written are retried
        // by re-running the whole cycle; the ledger skips those already done.
        let mut outcomes = Vec::with_capacity(results.len());
        let mut first_err = None;
        for res in results {
            match res {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    first_err.get_or_insert(e);
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(tally(outcomes)),
        }
    }

    /// Advance one member and deliver the resulting action.
    ///
    /// Fails only with a transient store error from the ledger, which must
    /// keep the run pending. Delivery failures are outcomes, not errors.
    async fn remind_member(
        &self,
        member: Member,
        date: NaiveDate,
        slot: u8,
    ) -> Result<MemberOutcome> {
        let (action, attempts) = retry_transient(&self.retry, || {
            let ledger = self.ledger.clone();
            let id = member.id.clone();
            blocking(move || {
                if ledger.has_advanced_today(&id, date, slot)? {
                    ledger.undelivered_action(&id, date, slot)
                } else {
                    ledger.advance(&id, date, slot)
                }
            })
        })
        .await;
        let action = match action {
            Ok(Some(a)) => a,
            Ok(None) => return Ok(MemberOutcome::Unchanged),
            Err(e) if e.is_transient() => {
                tracing::error!(member = %member.id, %date, slot, attempts, error = %e, "escalation store unavailable");
                return Err(e);
            }
            Err(e) => {
                tracing::error!(member = %member.id, %date, slot, error = %e, "escalation update failed");
                return Ok(MemberOutcome::Failed(DeliveryFailure {
                    member_id: member.id,
                    reason: e.to_string(),
                }));
            }
        };

        let notifier = &self.notifier;
        let (m, a) = (&member, &action);
        let (res, attempts) = retry(&self.retry, move || notifier.send_action(m, a)).await;
        let delivery = match &res {
            Ok(()) => delivered_now(),
            Err(e) => Delivery::Failed {
                reason: e.to_string(),
                attempts,
            },
        };
        let (recorded, _) = retry_transient(&self.retry, || {
            let ledger = self.ledger.clone();
            let id = member.id.clone();
            let delivery = delivery.clone();
            blocking(move || ledger.record_delivery(&id, date, delivery))
        })
        .await;
        if let Err(e) = recorded {
            // The notice went out; a re-run would only send it again.
            tracing::error!(member = %member.id, %date, error = %e, "recording delivery failed");
        }

        Ok(match res {
            Ok(()) => MemberOutcome::Delivered,
            Err(e) => {
                tracing::error!(
                    member = %member.id,
                    %date,
                    %action,
                    attempts,
                    error = %e,
                    "action delivery failed"
                );
                MemberOutcome::Failed(DeliveryFailure {
                    member_id: member.id,
                    reason: e.to_string(),
                })
            }
        })
    }

    /// Summarize the seven days ending at `date` and send it to management.
    async fn weekly_summary(&self, date: NaiveDate) -> Result<RunSummary> {
        let from = date.checked_sub_days(Days::new(6)).unwrap_or(date);
        let (data, _) = retry_transient(&self.retry, || {
            let roster = self.roster.clone();
            let reports = self.reports.clone();
            blocking(move || Ok((roster.active_members()?, reports.reports_between(from, date)?)))
        })
        .await;
        let (members, reports) = data?;

        let mut summary = RunSummary {
            attempted: 1,
            ..RunSummary::default()
        };
        let text = match self
            .summarizer
            .summarize(from, date, &members, &reports)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(%date, error = %e, "summarizer failed");
                summary.failures.push(DeliveryFailure {
                    member_id: "management".into(),
                    reason: format!("summarizer: {e}"),
                });
                return Ok(summary);
            }
        };

        let notifier = &self.notifier;
        let body = text.as_str();
        let (res, attempts) = retry(&self.retry, move || notifier.send_summary(body)).await;
        match res {
            Ok(()) => summary.delivered = 1,
            Err(e) => {
                tracing::error!(%date, attempts, error = %e, "summary delivery failed");
                summary.failures.push(DeliveryFailure {
                    member_id: "management".into(),
                    reason: e.to_string(),
                });
            }
        }
        Ok(summary)
    }

    // -----------------------------------------------------------------------
    // Dashboard
    // -----------------------------------------------------------------------

    pub fn day_status(&self, date: NaiveDate) -> Result<DayStatus> {
        let runs = self.store.runs_for_date(date)?;
        let triggers = self
            .triggers_for(date)
            .into_iter()
            .map(|t| {
                let run = runs.iter().find(|r| r.kind == t.kind);
                TriggerStatus {
                    kind: t.kind,
                    at: t.at,
                    status: run.map_or_else(|| "not_started".to_string(), |r| r.status.to_string()),
                    last_error: run.and_then(|r| r.last_error.clone()),
                }
            })
            .collect();
        let ids = |ms: Vec<Member>| -> Vec<String> { ms.into_iter().map(|m| m.id).collect() };
        Ok(DayStatus {
            date,
            working_day: self.calendar.is_working_day(date),
            rest_reason: self.calendar.rest_reason(date),
            triggers,
            missing: ids(self.tracker.missing_members(date)?),
            submitted: ids(self.tracker.submitted_members(date)?),
            escalations: self.ledger.list_for_date(date)?,
        })
    }
}

fn tally(outcomes: Vec<MemberOutcome>) -> RunSummary {
    let mut summary = RunSummary::default();
    for outcome in outcomes {
        match outcome {
            MemberOutcome::Delivered => {
                summary.attempted += 1;
                summary.delivered += 1;
            }
            MemberOutcome::Unchanged => summary.unchanged += 1,
            MemberOutcome::Failed(f) => {
                summary.attempted += 1;
                summary.failures.push(f);
            }
        }
    }
    summary.failures.sort_by(|a, b| a.member_id.cmp(&b.member_id));
    summary
}

fn log_pass(what: &'static str, res: Result<Vec<RunOutcome>>) {
    match res {
        Ok(outcomes) => {
            let executed = outcomes.iter().filter(|o| o.executed()).count();
            if executed > 0 {
                tracing::debug!(what, executed, "pass finished");
            }
        }
        Err(e) => tracing::error!(what, error = %e, "pass failed, retrying on next tick"),
    }
}

/// Run synchronous store work off the async executor.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StandupError::StoreUnavailable(format!("blocking task failed: {e}")))?
}
