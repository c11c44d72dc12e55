//! Todo Server - REST API for todos and tags
//!
//! Thin HTTP transport over [`todo_core::TodoRepository`]. The repository is
//! loaded from the store before the listener accepts requests and flushed
//! back on graceful shutdown.

pub mod error;
pub mod http;

use std::future::Future;
use std::sync::Arc;

use axum::{
    routing::{delete, get},
    Router,
};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use todo_core::{ServerConfig, SyncReport, TodoRepository};

pub use error::{ApiError, ApiResult};

/// Shared application state
pub struct AppState {
    pub repository: TodoRepository,
    pub server: ServerConfig,
}

impl AppState {
    pub fn new(repository: TodoRepository, server: ServerConfig) -> Self {
        Self { repository, server }
    }

    /// Load persisted todos. Runs once, before serving.
    pub async fn startup(&self) -> SyncReport {
        let report = self.repository.load_all().await;
        if !report.is_clean() {
            tracing::warn!(
                "Startup load skipped {} documents, {} failures",
                report.skipped,
                report.failed
            );
        }
        report
    }

    /// Flush todos to the store, then close it. Runs once, after serving.
    pub async fn shutdown(&self) -> SyncReport {
        let report = self.repository.flush_all().await;
        self.repository.close().await;
        tracing::info!("Store closed");
        report
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Todo endpoints
        .route(
            "/todos",
            get(http::list_todos)
                .post(http::create_todo)
                .delete(http::clear_todos),
        )
        .route("/todos/tags", delete(http::clear_all_tags))
        .route(
            "/todos/{id}",
            get(http::get_todo)
                .patch(http::update_todo)
                .delete(http::delete_todo),
        )
        // Tag endpoints
        .route(
            "/todos/{id}/tags",
            get(http::list_tags)
                .post(http::add_tag)
                .patch(http::update_tags)
                .delete(http::clear_tags),
        )
        .route("/todos/{id}/tags/{tag}", delete(http::remove_tag))
        .route("/tags/{tag}/todos", get(http::todos_by_tag))
        // System endpoints
        .route("/health", get(http::health))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Resolves when the process receives Ctrl-C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

/// Serve on `listener` until `shutdown` resolves, then flush and close the store
pub async fn serve_on<F>(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state.clone());
    tracing::info!("Todo server listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    state.shutdown().await;
    Ok(())
}

/// Start the server on the configured address until a termination signal
pub async fn serve(state: Arc<AppState>) -> std::io::Result<()> {
    let listener = TcpListener::bind(&state.server.bind_addr).await?;
    serve_on(listener, state, shutdown_signal()).await
}
