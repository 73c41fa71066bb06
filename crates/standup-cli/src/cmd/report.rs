use crate::output::{print_json, print_table};
use chrono::NaiveDate;
use clap::Subcommand;
use standup_core::types::Report;
use standup_core::StandupError;
use std::path::Path;

#[derive(Subcommand)]
pub enum ReportSubcommand {
    /// Record a member's report and settle any escalation for that date
    Submit {
        member: String,
        /// Business date (default: today in the configured timezone)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Report field as key=value; repeatable
        #[arg(long = "field", value_name = "KEY=VALUE", value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },

    /// List reports submitted for a date
    List {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

pub fn run(root: &Path, subcmd: ReportSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ReportSubcommand::Submit {
            member,
            date,
            fields,
        } => submit(root, &member, date, fields, json),
        ReportSubcommand::List { date } => list(root, date, json),
    }
}

fn submit(
    root: &Path,
    member: &str,
    date: Option<NaiveDate>,
    fields: Vec<(String, String)>,
    json: bool,
) -> anyhow::Result<()> {
    let scheduler = super::open_scheduler(root)?;
    let store = scheduler.store();
    if store.get_member(member)?.is_none() {
        return Err(StandupError::MemberNotFound(member.to_string()).into());
    }
    let date = date.unwrap_or_else(|| scheduler.today());

    let report = fields
        .into_iter()
        .fold(Report::new(member, date), |r, (k, v)| r.with_field(k, v));
    store.insert_report(&report)?;
    let settled = scheduler.ledger().settle(member, date)?;

    if json {
        return print_json(&serde_json::json!({
            "report": report,
            "escalation": settled,
        }));
    }
    println!("Recorded report from '{member}' for {date}.");
    if let Some(state) = settled {
        println!(
            "Escalation settled at tier '{}'.",
            state.tier().as_str()
        );
    }
    Ok(())
}

fn list(root: &Path, date: Option<NaiveDate>, json: bool) -> anyhow::Result<()> {
    let scheduler = super::open_scheduler(root)?;
    let date = date.unwrap_or_else(|| scheduler.today());
    let reports = scheduler.store().reports_for_date(date)?;

    if json {
        return print_json(&reports);
    }
    if reports.is_empty() {
        println!("No reports for {date}.");
        return Ok(());
    }
    let rows = reports
        .iter()
        .map(|r| {
            let fields = r
                .fields
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; ");
            vec![
                r.member_id.clone(),
                r.created_at.format("%H:%M").to_string(),
                fields,
            ]
        })
        .collect();
    print_table(&["MEMBER", "SUBMITTED", "FIELDS"], rows);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::parse_field;

    #[test]
    fn field_splits_on_first_equals() {
        assert_eq!(
            parse_field("blockers=a=b").unwrap(),
            ("blockers".to_string(), "a=b".to_string())
        );
        assert!(parse_field("novalue").is_err());
        assert!(parse_field("=x").is_err());
    }
}
