//! Inbound HTTP surface of the relay.
//!
//! # Routes
//!
//! - `GET /health` - liveness
//! - `POST /github/commit-file` - multipart upload committed to GitHub
//! - `POST /bitbucket/commit-file` - JSON upload committed to Bitbucket
//! - `POST /service-now/ticket` - create an incident
//! - `GET /service-now/ticket/{ticket_id}` - read an incident
//! - `PATCH /service-now/ticket/{ticket_id}` - update an incident
//!
//! Every failure is answered with a bare 500.

mod commit;
mod ticket;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::context::AppContext;
use crate::error::{AppError, AppResult};

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub fn router(ctx: AppContext) -> Router {
    let max_body_bytes = ctx.config.max_body_bytes;

    Router::new()
        .route("/health", get(health))
        .route("/github/commit-file", post(commit::github_commit_file))
        .route("/bitbucket/commit-file", post(commit::bitbucket_commit_file))
        .route("/service-now/ticket", post(ticket::create_ticket))
        .route("/service-now/ticket/", post(ticket::create_ticket))
        .route(
            "/service-now/ticket/{ticket_id}",
            get(ticket::get_ticket).patch(ticket::update_ticket),
        )
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}

/// Binds `addr` and serves until Ctrl-C.
pub async fn serve(ctx: AppContext, addr: &str) -> AppResult<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|err| AppError::Configuration(format!("failed to bind {addr}: {err}")))?;

    tracing::info!(addr, "relay listening");

    axum::serve(listener, router(ctx))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
