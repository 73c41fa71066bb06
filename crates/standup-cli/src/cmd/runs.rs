use crate::output::{print_json, print_table};
use chrono::NaiveDate;
use clap::Subcommand;
use std::path::Path;

#[derive(Subcommand)]
pub enum RunsSubcommand {
    /// List runs for a date, or the most recent runs
    List {
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

pub fn run(root: &Path, subcmd: RunsSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        RunsSubcommand::List { date, limit } => list(root, date, limit, json),
    }
}

fn list(root: &Path, date: Option<NaiveDate>, limit: usize, json: bool) -> anyhow::Result<()> {
    let store = super::open_store(root)?;
    let runs = match date {
        Some(d) => store.runs_for_date(d)?,
        None => store.recent_runs(limit)?,
    };

    if json {
        return print_json(&runs);
    }
    if runs.is_empty() {
        println!("No runs recorded.");
        return Ok(());
    }
    let rows = runs
        .iter()
        .map(|r| {
            vec![
                r.date.to_string(),
                r.kind.to_string(),
                r.status.to_string(),
                r.attempts.to_string(),
                format!(
                    "{}/{}",
                    r.summary.delivered,
                    r.summary.attempted
                ),
                r.last_error.clone().unwrap_or_default(),
            ]
        })
        .collect();
    print_table(
        &["DATE", "KIND", "STATUS", "ATTEMPTS", "DELIVERED", "LAST ERROR"],
        rows,
    );
    Ok(())
}
