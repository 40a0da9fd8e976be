pub mod auth;
pub mod files;
pub mod posts;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::uploads::MAX_AVATAR_BYTES;

/// Full application router with middleware applied.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(auth::router())
        .merge(posts::router())
        .merge(files::router())
        // Leave headroom above the avatar cap for the other form fields
        .layer(DefaultBodyLimit::max(MAX_AVATAR_BYTES + 64 * 1024))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
