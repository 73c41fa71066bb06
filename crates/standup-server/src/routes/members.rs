use axum::{extract::State, Json};

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/members: every member, active or not.
pub async fn list_members(
    State(app): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let store = app.store().clone();
    let members = tokio::task::spawn_blocking(move || store.list_members())
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(Json(serde_json::json!(members)))
}

/// POST /api/roster/sync: apply `.standup/roster.yaml` now instead of
/// waiting for the next run.
pub async fn sync_roster(
    State(app): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let report = app.scheduler.sync_roster().await?;
    Ok(Json(match report {
        Some(report) => serde_json::json!({ "synced": true, "report": report }),
        None => serde_json::json!({ "synced": false }),
    }))
}
