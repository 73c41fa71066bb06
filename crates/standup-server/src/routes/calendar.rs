use axum::{
    extract::{Path, State},
    Json,
};

use super::parse_date;
use crate::error::AppError;
use crate::state::AppState;

/// GET /api/calendar/{date}: working-day decision for one date.
pub async fn get_day(
    State(app): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let date = parse_date(&date)?;
    let calendar = app.scheduler.calendar();
    Ok(Json(serde_json::json!({
        "date": date,
        "working_day": calendar.is_working_day(date),
        "rest_reason": calendar.rest_reason(date),
        "next_working_day": calendar.next_working_day(date),
    })))
}
