use axum::{
    extract::{Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct DateQuery {
    pub date: Option<NaiveDate>,
}

/// GET /api/status?date=: triggers, missing/submitted members and
/// escalations for a business date (default: today).
pub async fn get_status(
    State(app): State<AppState>,
    Query(q): Query<DateQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let scheduler = app.scheduler.clone();
    let status = tokio::task::spawn_blocking(move || {
        let date = q.date.unwrap_or_else(|| scheduler.today());
        scheduler.day_status(date)
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(Json(serde_json::json!(status)))
}
