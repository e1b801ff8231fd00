use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::AppState;
use super::handlers;

pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.server.max_upload_size as usize;

    Router::new()
        // API
        .route("/", get(handlers::root))
        .route("/hello", get(handlers::hello))
        .route("/time", get(handlers::db_time))
        .route("/examples", get(handlers::get_examples))
        // Audio
        .route(
            "/upload-audio",
            post(handlers::upload_audio).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/recordings", get(handlers::list_recordings))
        .route("/recordings/:filename", delete(handlers::delete_recording))
        .route("/pronounce", post(handlers::pronounce))
        // Accounts
        .route("/login", get(handlers::login_page).post(handlers::login))
        .route("/logout", get(handlers::logout))
        .route("/dashboard", get(handlers::dashboard))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
