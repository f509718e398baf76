use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::error::Result;
use crate::index::Index;
use crate::tokenizer::Tokenizer;

use super::handlers::search;

/// Application state shared across all handlers
pub struct AppState {
    pub index: Index,
    pub tokenizer: Tokenizer,
}

/// Create the HTTP router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let state = Arc::new(state);

    Router::new()
        .route("/search", get(search))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind and serve until the process is stopped
pub async fn serve(state: AppState, port: u16) -> Result<()> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "search server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
