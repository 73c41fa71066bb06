use axum::{
    extract::{Query, State},
    Json,
};

use super::status::DateQuery;
use crate::error::AppError;
use crate::state::AppState;

/// GET /api/escalations?date=: escalation states for a business date
/// (default: today), ordered by member id.
pub async fn list_escalations(
    State(app): State<AppState>,
    Query(q): Query<DateQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let scheduler = app.scheduler.clone();
    let states = tokio::task::spawn_blocking(move || {
        let date = q.date.unwrap_or_else(|| scheduler.today());
        scheduler.ledger().list_for_date(date)
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(Json(serde_json::json!(states)))
}
