//! Working-day policy.
//!
//! A date is a working day iff it is a weekday and not a configured holiday.
//! Holidays are exact dates unless marked `recurring`, in which case they
//! match the same month and day in every year.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ---------------------------------------------------------------------------
// Holiday
// ---------------------------------------------------------------------------

/// A holiday as written in `config.yaml`: either a bare date or a map.
///
/// ```yaml
/// holidays:
///   - 2024-07-04
///   - { date: 2024-12-25, recurring: true, name: Christmas }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Holiday {
    Date(NaiveDate),
    Detailed {
        date: NaiveDate,
        #[serde(default)]
        recurring: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
}

impl Holiday {
    pub fn date(&self) -> NaiveDate {
        match self {
            Holiday::Date(d) => *d,
            Holiday::Detailed { date, .. } => *date,
        }
    }

    pub fn is_recurring(&self) -> bool {
        matches!(self, Holiday::Detailed { recurring: true, .. })
    }
}

// ---------------------------------------------------------------------------
// CalendarPolicy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct CalendarPolicy {
    exact: HashSet<NaiveDate>,
    /// (month, day) pairs.
    recurring: HashSet<(u32, u32)>,
}

impl CalendarPolicy {
    pub fn new(holidays: &[Holiday]) -> Self {
        let mut policy = Self::default();
        for h in holidays {
            let d = h.date();
            if h.is_recurring() {
                policy.recurring.insert((d.month(), d.day()));
            } else {
                policy.exact.insert(d);
            }
        }
        policy
    }

    pub fn is_weekend(date: NaiveDate) -> bool {
        matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.exact.contains(&date) || self.recurring.contains(&(date.month(), date.day()))
    }

    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        !Self::is_weekend(date) && !self.is_holiday(date)
    }

    /// Why `date` is not a working day, if it isn't.
    pub fn rest_reason(&self, date: NaiveDate) -> Option<&'static str> {
        if Self::is_weekend(date) {
            Some("weekend")
        } else if self.is_holiday(date) {
            Some("holiday")
        } else {
            None
        }
    }

    /// First working day strictly after `date`.
    pub fn next_working_day(&self, date: NaiveDate) -> NaiveDate {
        let mut d = date;
        loop {
            d = match d.succ_opt() {
                Some(n) => n,
                None => return d,
            };
            if self.is_working_day(d) {
                return d;
            }
        }
    }

    /// Up to `n` working days ending at `date` (inclusive), newest first.
    pub fn working_days_back(&self, date: NaiveDate, n: usize) -> Vec<NaiveDate> {
        let mut out = Vec::with_capacity(n);
        let mut d = date;
        // A year of lookback is plenty for any realistic holiday density.
        for _ in 0..366 {
            if out.len() == n {
                break;
            }
            if self.is_working_day(d) {
                out.push(d);
            }
            d = match d.pred_opt() {
                Some(p) => p,
                None => break,
            };
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
