//! ScheduleRun data model.
//!
//! A `ScheduleRun` records the fate of one trigger on one business date. Its
//! presence in a terminal state (`Completed` or `Skipped`) is what stops the
//! scheduler from firing the same trigger twice, including across restarts.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::StandupError;

// ---------------------------------------------------------------------------
// RunKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunKind {
    Prompt,
    /// Reminder cycle `slot` (0-based index into `reminders_at`).
    Reminder { slot: u8 },
    WeeklySummary,
}

impl fmt::Display for RunKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunKind::Prompt => f.write_str("prompt"),
            RunKind::Reminder { slot } => write!(f, "reminder:{slot}"),
            RunKind::WeeklySummary => f.write_str("weekly_summary"),
        }
    }
}

impl std::str::FromStr for RunKind {
    type Err = StandupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prompt" => Ok(RunKind::Prompt),
            "weekly_summary" => Ok(RunKind::WeeklySummary),
            "reminder" => Ok(RunKind::Reminder { slot: 0 }),
            other => other
                .strip_prefix("reminder:")
                .and_then(|n| n.parse::<u8>().ok())
                .map(|slot| RunKind::Reminder { slot })
                .ok_or_else(|| StandupError::InvalidRunKind(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// RunStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of a run.
///
/// Transitions: `Pending → Running → Completed`, or `Pending → Skipped` when
/// the date is not a working day.
///
/// The scheduler writes `Running` before any member-level work. On restart,
/// any run stuck in `Running` is reset to `Pending` by `startup_recovery` so
/// catch-up executes it again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Skipped { reason: String },
}

impl RunStatus {
    /// Terminal runs are never executed again for the same date.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Skipped { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Skipped { .. } => "skipped",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RunSummary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryFailure {
    pub member_id: String,
    pub reason: String,
}

/// Per-member tallies for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Members the run tried to notify.
    pub attempted: u32,
    pub delivered: u32,
    /// Members that needed no notification (already advanced, at ceiling,
    /// or submitted in the meantime).
    pub unchanged: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<DeliveryFailure>,
}

impl RunSummary {
    pub fn failed(&self) -> u32 {
        self.failures.len() as u32
    }
}

// ---------------------------------------------------------------------------
// ScheduleRun
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRun {
    pub id: Uuid,
    pub date: NaiveDate,
    pub kind: RunKind,
    pub status: RunStatus,
    /// How many times execution started for this (date, kind).
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub summary: RunSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl ScheduleRun {
    pub fn new(date: NaiveDate, kind: RunKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            kind,
            status: RunStatus::Pending,
            attempts: 0,
            summary: RunSummary::default(),
            last_error: None,
            started_at: None,
            finished_at: None,
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_kind_display_and_parse_agree() {
        for kind in [
            RunKind::Prompt,
            RunKind::Reminder { slot: 2 },
            RunKind::WeeklySummary,
        ] {
            assert_eq!(kind.to_string().parse::<RunKind>().unwrap(), kind);
        }
    }

    #[test]
    fn bare_reminder_means_first_slot() {
        assert_eq!(
            "reminder".parse::<RunKind>().unwrap(),
            RunKind::Reminder { slot: 0 }
        );
    }

    #[test]
    fn unknown_run_kind_is_rejected() {
        assert!(matches!(
            "nudge".parse::<RunKind>().unwrap_err(),
            StandupError::InvalidRunKind(_)
        ));
        assert!("reminder:x".parse::<RunKind>().is_err());
    }

    #[test]
    fn only_completed_and_skipped_are_terminal() {
        assert!(!RunStatus::Pending.is_terminal());
        assert!(!RunStatus::Running.is_terminal());
        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::Skipped {
            reason: "holiday".into()
        }
        .is_terminal());
    }

    #[test]
    fn kinds_order_prompt_before_reminders() {
        let mut kinds = vec![
            RunKind::WeeklySummary,
            RunKind::Reminder { slot: 1 },
            RunKind::Prompt,
            RunKind::Reminder { slot: 0 },
        ];
        kinds.sort();
        assert_eq!(
            kinds,
            vec![
                RunKind::Prompt,
                RunKind::Reminder { slot: 0 },
                RunKind::Reminder { slot: 1 },
                RunKind::WeeklySummary,
            ]
        );
    }
}
