use crate::output::{print_json, print_table};
use chrono::NaiveDate;
use standup_core::schedule_run::{RunKind, RunStatus, ScheduleRun};
use standup_core::scheduler::{RunOutcome, RunPreview};
use std::path::Path;

pub fn run(
    root: &Path,
    kind: RunKind,
    date: Option<NaiveDate>,
    force: bool,
    dry_run: bool,
    json: bool,
) -> anyhow::Result<()> {
    let config = super::load_config(root)?;
    let notifier = standup_server::slack::notifier_from_env(&config);
    let store = super::open_store(root)?;
    let scheduler = super::scheduler_with(store, &config, notifier)?;
    let date = date.unwrap_or_else(|| scheduler.today());

    let rt = tokio::runtime::Runtime::new()?;
    if dry_run {
        let preview = rt.block_on(scheduler.preview(date, kind, force))?;
        return print_preview(&preview, json);
    }
    let outcome = rt.block_on(scheduler.run_now(date, kind, force))?;

    let label = match &outcome {
        RunOutcome::Completed(_) => "completed",
        RunOutcome::Skipped(_) => "skipped",
        RunOutcome::AlreadyHandled(_) => "already_handled",
    };
    if json {
        return print_json(&serde_json::json!({ "outcome": label, "run": outcome.run() }));
    }

    match &outcome {
        RunOutcome::Completed(run) => {
            let s = &run.summary;
            println!(
                "{kind} for {date}: {} delivered, {} unchanged, {} failed",
                s.delivered,
                s.unchanged,
                s.failed()
            );
            if !s.failures.is_empty() {
                let rows = s
                    .failures
                    .iter()
                    .map(|f| vec![f.member_id.clone(), f.reason.clone()])
                    .collect();
                print_table(&["MEMBER", "REASON"], rows);
            }
        }
        RunOutcome::Skipped(run) => {
            println!("{kind} for {date}: skipped ({})", skip_reason(run));
        }
        RunOutcome::AlreadyHandled(run) => {
            println!(
                "{kind} for {date}: already {} (use --force to run again)",
                run.status
            );
        }
    }
    Ok(())
}

fn skip_reason(run: &ScheduleRun) -> &str {
    match &run.status {
        RunStatus::Skipped { reason } => reason,
        _ => "not a working day",
    }
}

fn print_preview(preview: &RunPreview, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(preview);
    }
    let (kind, date) = (preview.kind, preview.date);
    if let Some(reason) = preview.rest_reason {
        println!("{kind} for {date}: would be skipped ({reason})");
    } else if !preview.would_execute {
        println!(
            "{kind} for {date}: already {} (use --force to run again)",
            preview.status
        );
    } else if preview.notices.is_empty() {
        println!("{kind} for {date}: nothing to send");
    } else {
        println!("{kind} for {date}: would send {}", preview.notices.len());
        let rows = preview
            .notices
            .iter()
            .map(|n| vec![n.member_id.clone(), n.action.clone()])
            .collect();
        print_table(&["MEMBER", "ACTION"], rows);
    }
    Ok(())
}
