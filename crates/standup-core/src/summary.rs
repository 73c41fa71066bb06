//! Weekly summaries.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::types::{Member, Report};

/// Turns a week of reports into text for the management target.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        members: &[Member],
        reports: &[Report],
    ) -> Result<String>;
}

/// Plain-text digest: one section per member with their submitted fields and
/// the count of reports filed in the window.
#[derive(Debug, Default, Clone)]
pub struct DigestSummarizer;

#[async_trait]
impl Summarizer for DigestSummarizer {
    async fn summarize(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        members: &[Member],
        reports: &[Report],
    ) -> Result<String> {
        let mut by_member: BTreeMap<&str, Vec<&Report>> = BTreeMap::new();
        for r in reports {
            by_member.entry(r.member_id.as_str()).or_default().push(r);
        }

        let mut out = String::new();
        let _ = writeln!(out, "Standup summary {from} to {to}");
        for m in members {
            let filed = by_member.remove(m.id.as_str()).unwrap_or_default();
            let _ = writeln!(out);
            let _ = writeln!(out, "{} ({} report(s))", m.name, filed.len());
            for r in filed {
                let _ = writeln!(out, "  {}", r.date);
                for (k, v) in &r.fields {
                    let _ = writeln!(out, "    {k}: {v}");
                }
            }
        }
        // Reports from members no longer on the roster
        for (id, filed) in by_member {
            let _ = writeln!(out);
            let _ = writeln!(out, "{id} (inactive, {} report(s))", filed.len());
        }
        Ok(out)
    }
}
