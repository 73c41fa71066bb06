use crate::output::{print_json, print_table};
use chrono::NaiveDate;
use standup_core::types::{Delivery, Standing};
use std::path::Path;

pub fn run(root: &Path, date: Option<NaiveDate>, json: bool) -> anyhow::Result<()> {
    let scheduler = super::open_scheduler(root)?;
    let date = date.unwrap_or_else(|| scheduler.today());
    let status = scheduler.day_status(date)?;

    if json {
        return print_json(&status);
    }

    match status.rest_reason {
        None => println!("{date}: working day"),
        Some(reason) => println!("{date}: {reason}, no prompts or reminders"),
    }
    println!();

    let rows = status
        .triggers
        .iter()
        .map(|t| {
            vec![
                t.at.format("%H:%M").to_string(),
                t.kind.to_string(),
                t.status.clone(),
                t.last_error.clone().unwrap_or_default(),
            ]
        })
        .collect();
    print_table(&["AT", "TRIGGER", "STATUS", "LAST ERROR"], rows);

    println!();
    println!(
        "Submitted ({}): {}",
        status.submitted.len(),
        status.submitted.join(", ")
    );
    println!(
        "Missing ({}):   {}",
        status.missing.len(),
        status.missing.join(", ")
    );

    if !status.escalations.is_empty() {
        println!();
        let rows = status
            .escalations
            .iter()
            .map(|e| {
                let standing = match e.standing {
                    Standing::Pending { .. } => "pending",
                    Standing::Satisfied { .. } => "satisfied",
                };
                let delivery = match &e.delivery {
                    Delivery::NotAttempted => "not attempted".to_string(),
                    Delivery::Delivered { at } => format!("delivered {}", at.format("%H:%M")),
                    Delivery::Failed { reason, attempts } => {
                        format!("failed after {attempts}: {reason}")
                    }
                };
                vec![
                    e.member_id.clone(),
                    e.tier().as_str().to_string(),
                    standing.to_string(),
                    delivery,
                ]
            })
            .collect();
        print_table(&["MEMBER", "TIER", "STANDING", "DELIVERY"], rows);
    }
    Ok(())
}
