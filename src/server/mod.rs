//! HTTP surface over the pipeline.

pub mod error;
pub mod handlers;

use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::pipeline::Codefix;

pub use error::{ApiError, ErrorBody};

#[derive(Clone)]
pub struct AppState {
    pub codefix: Codefix,
}

pub fn router(codefix: Codefix) -> Router {
    let projects = Router::new()
        .route("/", get(handlers::list_projects).delete(handlers::delete_repository))
        .route("/clone", post(handlers::clone_repository))
        .route("/clone-repo", post(handlers::clone_repository))
        .route("/analyze-file", post(handlers::analyze_file))
        .route("/get-file-content", post(handlers::get_file_content))
        .route("/debug-file", post(handlers::debug_file))
        .route("/:id", get(handlers::get_project).delete(handlers::delete_project));

    Router::new()
        .nest("/api/projects", projects)
        .route("/api/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(AppState { codefix })
}

pub async fn serve(address: &str, codefix: Codefix) -> Result<()> {
    let listener = TcpListener::bind(address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!(address = %listener.local_addr()?, "Server listening");

    axum::serve(listener, router(codefix))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server terminated unexpectedly")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
