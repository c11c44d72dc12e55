//! Todo Server Binary
//!
//! Standalone server for the todo API.

use std::sync::Arc;

use todo_core::{open_store, TodoConfig, TodoRepository};
use todo_server::{serve, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Override with RUST_LOG, e.g. RUST_LOG=todo_core=debug
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = TodoConfig::load()?;
    let store = open_store(&config.storage);
    let state = Arc::new(AppState::new(TodoRepository::new(store), config.server));

    state.startup().await;
    serve(state).await?;
    Ok(())
}
