//! HTTP surface: router assembly, liveness routes and the serve loop

use axum::{
    extract::State,
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::{net::SocketAddr, time::Duration};
use tokio::signal;
use tracing::info;

use crate::config::Config;
use crate::features::{self, jobs, JobsContext};
use crate::middleware;

/// Build the application router with all routes and middleware
pub fn create_router(ctx: JobsContext, config: &Config) -> Router {
    Router::new()
        .route("/", get(ping))
        .route("/health", get(health))
        .merge(jobs::submit_routes())
        .with_state(ctx.clone())
        .nest("/api/v1", features::router(ctx))
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors))
}

/// Bind, serve, and stop cleanly on Ctrl+C or SIGTERM
pub async fn serve(config: Config, ctx: JobsContext) -> anyhow::Result<()> {
    let app = create_router(ctx, &config);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.shutdown_timeout_secs))
        .await?;

    info!("Server shut down gracefully");
    Ok(())
}

/// GET / answers with an empty object and a `Ping: pong` header
async fn ping() -> impl IntoResponse {
    (
        [(HeaderName::from_static("ping"), HeaderValue::from_static("pong"))],
        Json(json!({})),
    )
}

/// Health check handler
async fn health(State(ctx): State<JobsContext>) -> Result<Response, Response> {
    match ctx.store.index_exists(&ctx.index).await {
        Ok(exists) => Ok((
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "store": "connected",
                "jobs_index": ctx.index,
                "jobs_index_exists": exists,
            })),
        )
            .into_response()),
        Err(e) => {
            tracing::error!("Document store health check failed: {}", e);
            Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "store": "unreachable",
                })),
            )
                .into_response())
        },
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }

    // Give in-flight submissions time to finish their store writes
    info!("Waiting up to {} seconds for connections to close", timeout_secs);
    tokio::time::sleep(Duration::from_secs(timeout_secs.min(5))).await;
}
