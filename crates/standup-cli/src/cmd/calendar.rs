use crate::output::print_json;
use chrono::NaiveDate;
use std::path::Path;

pub fn run(root: &Path, date: Option<NaiveDate>, json: bool) -> anyhow::Result<()> {
    let config = super::load_config(root)?;
    let schedule = config.resolve()?;
    let calendar = config.calendar();
    let date = date.unwrap_or_else(|| chrono::Utc::now().with_timezone(&schedule.timezone).date_naive());

    let rest_reason = calendar.rest_reason(date);
    let next = calendar.next_working_day(date);

    if json {
        print_json(&serde_json::json!({
            "date": date,
            "working_day": rest_reason.is_none(),
            "rest_reason": rest_reason,
            "next_working_day": next,
        }))?;
    } else {
        match rest_reason {
            None => println!("{date} ({}) is a working day", date.format("%a")),
            Some(reason) => println!(
                "{date} ({}) is not a working day: {reason}. Next working day: {next}",
                date.format("%a")
            ),
        }
    }
    Ok(())
}
