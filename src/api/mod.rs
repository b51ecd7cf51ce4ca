use axum::{Router, routing::post};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::catalog::Catalog;
use crate::config::DEFAULT_SEARCH_PATH;

pub mod handlers;
pub mod models;

/// Shared state for the development search server.
pub struct AppState {
    pub catalog: Catalog,
    /// When set, requests must carry `Cookie: session=<token>`.
    pub session_token: Option<String>,
}

pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(DEFAULT_SEARCH_PATH, post(handlers::search_handler))
        .with_state(state)
        .layer(cors)
}
