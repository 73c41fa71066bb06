use crate::calendar::{CalendarPolicy, Holiday};
use crate::error::{Result, StandupError};
use crate::paths;
use crate::types::Tier;
use chrono::{NaiveTime, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// ScheduleConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklySummaryConfig {
    /// Weekday name, e.g. "fri" or "friday".
    pub weekday: String,
    /// Wall-clock time, "HH:MM".
    pub at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// IANA timezone name, e.g. "America/New_York".
    pub timezone: String,
    #[serde(default = "default_prompt_at")]
    pub prompt_at: String,
    /// One entry per reminder cycle; each cycle advances a missing member by
    /// one tier.
    #[serde(default = "default_reminders_at")]
    pub reminders_at: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly_summary: Option<WeeklySummaryConfig>,
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: u64,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_grace_seconds")]
    pub shutdown_grace_seconds: u64,
}

fn default_prompt_at() -> String {
    "17:00".to_string()
}

fn default_reminders_at() -> Vec<String> {
    vec!["17:30".to_string(), "18:00".to_string(), "18:30".to_string()]
}

fn default_tick_seconds() -> u64 {
    30
}

fn default_concurrency() -> usize {
    8
}

fn default_grace_seconds() -> u64 {
    20
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            prompt_at: default_prompt_at(),
            reminders_at: default_reminders_at(),
            weekly_summary: None,
            tick_seconds: default_tick_seconds(),
            concurrency: default_concurrency(),
            shutdown_grace_seconds: default_grace_seconds(),
        }
    }
}

// ---------------------------------------------------------------------------
// EscalationConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationConfig {
    /// Highest tier a member can reach in one day.
    #[serde(default = "default_ceiling")]
    pub ceiling: Tier,
    /// How many working days back to look when counting a missed streak.
    #[serde(default = "default_streak_window")]
    pub streak_window: usize,
}

fn default_ceiling() -> Tier {
    Tier::ManagementNotified
}

fn default_streak_window() -> usize {
    10
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            ceiling: default_ceiling(),
            streak_window: default_streak_window(),
        }
    }
}

// ---------------------------------------------------------------------------
// NotifierConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Channel that receives management notifications and weekly summaries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub management_target: Option<String>,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            management_target: None,
        }
    }
}

// ---------------------------------------------------------------------------
// TeamConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamConfig {
    pub name: String,
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    pub team: TeamConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub holidays: Vec<Holiday>,
    #[serde(default)]
    pub escalation: EscalationConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
}

fn default_version() -> u32 {
    1
}

impl Config {
    pub fn new(team_name: impl Into<String>) -> Self {
        Self {
            version: 1,
            team: TeamConfig {
                name: team_name.into(),
            },
            schedule: ScheduleConfig::default(),
            holidays: Vec::new(),
            escalation: EscalationConfig::default(),
            notifier: NotifierConfig::default(),
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        crate::io::read_yaml(&paths::config_path(root))?.ok_or(StandupError::NotInitialized)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        crate::io::write_yaml(&paths::config_path(root), self)
    }

    pub fn calendar(&self) -> CalendarPolicy {
        CalendarPolicy::new(&self.holidays)
    }

    /// Parse every schedule field into typed values.
    ///
    /// Fails with `Configuration` when the timezone or any time is
    /// undefined; the scheduler must not start in that case.
    pub fn resolve(&self) -> Result<ResolvedSchedule> {
        let s = &self.schedule;
        let timezone: Tz = s.timezone.parse().map_err(|_| {
            StandupError::Configuration(format!("unknown timezone '{}'", s.timezone))
        })?;
        let prompt_at = parse_hhmm("schedule.prompt_at", &s.prompt_at)?;

        if s.reminders_at.len() > u8::MAX as usize {
            return Err(StandupError::Configuration(
                "schedule.reminders_at has too many entries".into(),
            ));
        }
        let mut reminders_at = Vec::with_capacity(s.reminders_at.len());
        for (i, raw) in s.reminders_at.iter().enumerate() {
            let t = parse_hhmm(&format!("schedule.reminders_at[{i}]"), raw)?;
            if let Some(prev) = reminders_at.last() {
                if t <= *prev {
                    return Err(StandupError::Configuration(format!(
                        "schedule.reminders_at must be strictly increasing ('{raw}')"
                    )));
                }
            }
            reminders_at.push(t);
        }

        let weekly_summary = match &s.weekly_summary {
            Some(ws) => {
                let weekday: Weekday = ws.weekday.parse().map_err(|_| {
                    StandupError::Configuration(format!(
                        "unknown weekday '{}' in schedule.weekly_summary",
                        ws.weekday
                    ))
                })?;
                Some((weekday, parse_hhmm("schedule.weekly_summary.at", &ws.at)?))
            }
            None => None,
        };

        if s.tick_seconds == 0 {
            return Err(StandupError::Configuration(
                "schedule.tick_seconds must be at least 1".into(),
            ));
        }
        if self.notifier.max_attempts == 0 {
            return Err(StandupError::Configuration(
                "notifier.max_attempts must be at least 1".into(),
            ));
        }

        Ok(ResolvedSchedule {
            timezone,
            prompt_at,
            reminders_at,
            weekly_summary,
            tick: Duration::from_secs(s.tick_seconds),
            concurrency: s.concurrency.max(1),
            shutdown_grace: Duration::from_secs(s.shutdown_grace_seconds),
        })
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        // 1. Anything resolve() rejects is an error
        if let Err(e) = self.resolve() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: e.to_string(),
            });
        }

        // 2. Reminder cycles vs. ceiling: fewer cycles than tiers means the
        //    ceiling can never be reached.
        let tiers_to_ceiling = Tier::all()
            .iter()
            .filter(|t| **t != Tier::None && **t <= self.escalation.ceiling)
            .count();
        if self.schedule.reminders_at.len() < tiers_to_ceiling {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "{} reminder time(s) configured but ceiling '{}' needs {}",
                    self.schedule.reminders_at.len(),
                    self.escalation.ceiling,
                    tiers_to_ceiling
                ),
            });
        }

        // 3. Management tier without anywhere to send it
        if self.escalation.ceiling == Tier::ManagementNotified
            && self.notifier.management_target.is_none()
        {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "escalation.ceiling is management_notified but notifier.management_target is not set".into(),
            });
        }

        // 4. Prompt should precede the first reminder
        if let (Ok(prompt), Some(first)) = (
            parse_hhmm("schedule.prompt_at", &self.schedule.prompt_at),
            self.schedule.reminders_at.first(),
        ) {
            if let Ok(first) = parse_hhmm("schedule.reminders_at[0]", first) {
                if first <= prompt {
                    warnings.push(ConfigWarning {
                        level: WarnLevel::Warning,
                        message: format!(
                            "first reminder ({first}) is not after the prompt ({prompt})"
                        ),
                    });
                }
            }
        }

        // 5. Duplicate holidays
        let mut seen = std::collections::HashSet::new();
        for h in &self.holidays {
            if !seen.insert((h.date(), h.is_recurring())) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("holiday {} is listed more than once", h.date()),
                });
            }
        }

        warnings
    }
}

/// Typed view of `ScheduleConfig`.
#[derive(Debug, Clone)]
pub struct ResolvedSchedule {
    pub timezone: Tz,
    pub prompt_at: NaiveTime,
    pub reminders_at: Vec<NaiveTime>,
    pub weekly_summary: Option<(Weekday, NaiveTime)>,
    pub tick: Duration,
    pub concurrency: usize,
    pub shutdown_grace: Duration,
}

fn parse_hhmm(field: &str, raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|_| {
            StandupError::Configuration(format!("{field}: expected HH:MM, got '{raw}'"))
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
