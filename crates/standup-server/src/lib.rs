pub mod error;
pub mod routes;
pub mod slack;
pub mod state;

use std::future::{Future, IntoFuture};
use std::path::PathBuf;

use axum::routing::{get, post};
use axum::Router;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(app_state: state::AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Events (SSE)
        .route("/api/events", get(routes::events::sse_events))
        // Dashboard reads
        .route("/api/status", get(routes::status::get_status))
        .route("/api/runs", get(routes::runs::list_runs))
        .route(
            "/api/escalations",
            get(routes::escalations::list_escalations),
        )
        .route("/api/members", get(routes::members::list_members))
        .route("/api/roster/sync", post(routes::members::sync_roster))
        .route("/api/calendar/{date}", get(routes::calendar::get_day))
        // Writes
        .route("/api/reports", post(routes::reports::submit_report))
        .route("/api/runs/trigger", post(routes::runs::trigger_run))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Start the HTTP server and the scheduler daemon for the project at `root`.
/// Both stop on Ctrl-C.
pub async fn serve(root: PathBuf, port: u16) -> anyhow::Result<()> {
    let app_state = state::AppState::load(root)?;
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    serve_on(app_state, listener, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}

/// Serve on a pre-bound listener until `shutdown` resolves.
///
/// One signal stops both halves: axum stops accepting and the scheduler is
/// asked to stop. Open connections (SSE streams never close on their own)
/// get the configured `shutdown_grace` to drain before they are dropped.
pub async fn serve_on(
    app_state: state::AppState,
    listener: tokio::net::TcpListener,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let grace = app_state.scheduler.schedule().shutdown_grace;

    let (stop_tx, stop_rx) = watch::channel(false);
    let scheduler = app_state.scheduler.clone();
    let daemon_rx = stop_rx.clone();
    let daemon = tokio::spawn(async move { scheduler.run(daemon_rx).await });

    let app = build_router(app_state);
    tracing::info!("standup server listening on http://localhost:{actual_port}");
    let mut http_rx = stop_rx;
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = http_rx.wait_for(|stop| *stop).await;
        })
        .into_future();
    tokio::pin!(server);
    tokio::pin!(shutdown);

    let served = tokio::select! {
        res = &mut server => res,
        () = &mut shutdown => {
            tracing::info!(?grace, "shutdown requested");
            let _ = stop_tx.send(true);
            match tokio::time::timeout(grace, &mut server).await {
                Ok(res) => res,
                Err(_) => {
                    tracing::warn!("connections still open after grace period, closing");
                    Ok(())
                }
            }
        }
    };

    let _ = stop_tx.send(true);
    if let Err(e) = daemon.await {
        tracing::error!(error = %e, "scheduler task panicked");
    }
    served?;
    Ok(())
}
