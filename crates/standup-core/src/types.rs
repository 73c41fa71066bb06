use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Result, StandupError};

// ---------------------------------------------------------------------------
// Member
// ---------------------------------------------------------------------------

/// A tracked team member. Members are deactivated, never deleted, so old
/// escalation records keep a valid owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    pub name: String,
    /// Chat channel or user id that prompts and reminders are sent to.
    pub target: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Member {
    pub fn new(id: impl Into<String>, name: impl Into<String>, target: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            target: target.into(),
            active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// One member's status report for one business date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub member_id: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
}

impl Report {
    pub fn new(member_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            member_id: member_id.into(),
            date,
            fields: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Tier
// ---------------------------------------------------------------------------

/// Escalation level for a missed report on a single business date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    None,
    Reminded,
    Escalated,
    ManagementNotified,
}

impl Tier {
    pub fn all() -> &'static [Tier] {
        &[
            Tier::None,
            Tier::Reminded,
            Tier::Escalated,
            Tier::ManagementNotified,
        ]
    }

    /// Total transition function: every tier has exactly one successor except
    /// the terminal one.
    pub fn next(self) -> Option<Tier> {
        match self {
            Tier::None => Some(Tier::Reminded),
            Tier::Reminded => Some(Tier::Escalated),
            Tier::Escalated => Some(Tier::ManagementNotified),
            Tier::ManagementNotified => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::None => "none",
            Tier::Reminded => "reminded",
            Tier::Escalated => "escalated",
            Tier::ManagementNotified => "management_notified",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Tier {
    type Err = StandupError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(Tier::None),
            "reminded" => Ok(Tier::Reminded),
            "escalated" => Ok(Tier::Escalated),
            "management_notified" => Ok(Tier::ManagementNotified),
            _ => Err(StandupError::Configuration(format!(
                "unknown tier '{s}': must be none, reminded, escalated, or management_notified"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// What the Notifier must do after a tier transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    SendReminder,
    SendEscalation,
    NotifyManagement {
        /// Consecutive working days without a report, including this one.
        missed_streak: u32,
    },
}

impl Action {
    /// The action emitted on entering `tier`. `Tier::None` is never entered.
    pub fn for_tier(tier: Tier, missed_streak: u32) -> Option<Action> {
        match tier {
            Tier::None => None,
            Tier::Reminded => Some(Action::SendReminder),
            Tier::Escalated => Some(Action::SendEscalation),
            Tier::ManagementNotified => Some(Action::NotifyManagement { missed_streak }),
        }
    }

    pub fn tier(&self) -> Tier {
        match self {
            Action::SendReminder => Tier::Reminded,
            Action::SendEscalation => Tier::Escalated,
            Action::NotifyManagement { .. } => Tier::ManagementNotified,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::SendReminder => f.write_str("send_reminder"),
            Action::SendEscalation => f.write_str("send_escalation"),
            Action::NotifyManagement { .. } => f.write_str("notify_management"),
        }
    }
}

// ---------------------------------------------------------------------------
// EscalationState
// ---------------------------------------------------------------------------

/// Whether the member still owes a report for the date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Standing {
    Pending { tier: Tier },
    /// Report arrived; no further actions for this date.
    Satisfied { last_tier: Tier },
}

impl Standing {
    pub fn tier(self) -> Tier {
        match self {
            Standing::Pending { tier } => tier,
            Standing::Satisfied { last_tier } => last_tier,
        }
    }
}

/// Outcome of the most recent notification for this state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Delivery {
    NotAttempted,
    Delivered { at: DateTime<Utc> },
    Failed { reason: String, attempts: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationState {
    pub member_id: String,
    pub date: NaiveDate,
    pub standing: Standing,
    /// Reminder slot that performed the last transition.
    #[serde(default)]
    pub last_cycle: Option<u8>,
    pub delivery: Delivery,
    pub updated_at: DateTime<Utc>,
}

impl EscalationState {
    pub fn new(member_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            member_id: member_id.into(),
            date,
            standing: Standing::Pending { tier: Tier::None },
            last_cycle: None,
            delivery: Delivery::NotAttempted,
            updated_at: Utc::now(),
        }
    }

    pub fn tier(&self) -> Tier {
        self.standing.tier()
    }

    pub fn is_satisfied(&self) -> bool {
        matches!(self.standing, Standing::Satisfied { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_advance_in_order_and_terminate() {
        let mut seen = vec![Tier::None];
        let mut t = Tier::None;
        while let Some(next) = t.next() {
            seen.push(next);
            t = next;
        }
        assert_eq!(seen, Tier::all());
    }

    #[test]
    fn tier_order_matches_transition_order() {
        for w in Tier::all().windows(2) {
            assert!(w[0] < w[1]);
            assert_eq!(w[0].next(), Some(w[1]));
        }
    }

    #[test]
    fn tier_parses_from_str() {
        assert_eq!("escalated".parse::<Tier>().unwrap(), Tier::Escalated);
        assert!("panic".parse::<Tier>().is_err());
    }

    #[test]
    fn action_for_tier_matches_tier() {
        assert_eq!(Action::for_tier(Tier::None, 0), None);
        for &tier in &Tier::all()[1..] {
            let action = Action::for_tier(tier, 3).unwrap();
            assert_eq!(action.tier(), tier);
        }
    }

    #[test]
    fn action_serializes_tagged() {
        let json = serde_json::to_value(Action::NotifyManagement { missed_streak: 4 }).unwrap();
        assert_eq!(json["type"], "notify_management");
        assert_eq!(json["missed_streak"], 4);
    }

    #[test]
    fn new_state_is_pending_none() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let state = EscalationState::new("bob", date);
        assert_eq!(state.tier(), Tier::None);
        assert!(!state.is_satisfied());
        assert_eq!(state.delivery, Delivery::NotAttempted);
    }
}
