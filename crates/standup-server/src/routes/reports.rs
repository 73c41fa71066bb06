use std::collections::BTreeMap;

use axum::{extract::State, http::StatusCode, Json};
use chrono::NaiveDate;
use serde::Deserialize;
use standup_core::error::StandupError;
use standup_core::types::Report;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SubmitBody {
    pub member_id: String,
    /// Business date; defaults to today in the configured timezone.
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

/// POST /api/reports: store a member's report and settle any pending
/// escalation for that date.
pub async fn submit_report(
    State(app): State<AppState>,
    Json(body): Json<SubmitBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let scheduler = app.scheduler.clone();
    let report = tokio::task::spawn_blocking(move || {
        let store = scheduler.store();
        if store.get_member(&body.member_id)?.is_none() {
            return Err(StandupError::MemberNotFound(body.member_id));
        }
        let date = body.date.unwrap_or_else(|| scheduler.today());
        let report = Report {
            fields: body.fields,
            ..Report::new(body.member_id, date)
        };
        store.insert_report(&report)?;
        scheduler.ledger().settle(&report.member_id, date)?;
        tracing::info!(member = %report.member_id, %date, "report submitted");
        Ok(report)
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok((StatusCode::CREATED, Json(serde_json::json!(report))))
}
