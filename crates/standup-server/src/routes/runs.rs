use axum::{
    extract::{Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use standup_core::schedule_run::RunKind;
use standup_core::scheduler::RunOutcome;

use crate::error::AppError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct ListQuery {
    pub date: Option<NaiveDate>,
    pub limit: Option<usize>,
}

/// GET /api/runs: runs for `?date=`, or the most recent runs (`?limit=`,
/// default 50) when no date is given.
pub async fn list_runs(
    State(app): State<AppState>,
    Query(q): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let store = app.store().clone();
    let runs = tokio::task::spawn_blocking(move || match q.date {
        Some(date) => store.runs_for_date(date),
        None => store.recent_runs(q.limit.unwrap_or(50)),
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(Json(serde_json::json!(runs)))
}

// ---------------------------------------------------------------------------
// Trigger
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct TriggerBody {
    /// `prompt`, `reminder:<slot>` or `weekly_summary`.
    pub kind: String,
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub force: bool,
}

/// POST /api/runs/trigger: execute a run now.
pub async fn trigger_run(
    State(app): State<AppState>,
    Json(body): Json<TriggerBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let kind: RunKind = body.kind.parse()?;
    let date = body.date.unwrap_or_else(|| app.scheduler.today());
    tracing::info!(%date, %kind, force = body.force, "manual run requested");

    let outcome = app.scheduler.run_now(date, kind, body.force).await?;
    let label = match &outcome {
        RunOutcome::Completed(_) => "completed",
        RunOutcome::Skipped(_) => "skipped",
        RunOutcome::AlreadyHandled(_) => "already_handled",
    };
    Ok(Json(serde_json::json!({
        "outcome": label,
        "run": outcome.run(),
    })))
}
