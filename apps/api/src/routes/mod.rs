pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};

use crate::session::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/sessions", post(handlers::handle_create_session))
        .route(
            "/api/v1/sessions/:id",
            get(handlers::handle_get_session).delete(handlers::handle_delete_session),
        )
        .route(
            "/api/v1/sessions/:id/credential",
            put(handlers::handle_set_credential).delete(handlers::handle_clear_credential),
        )
        .route(
            "/api/v1/sessions/:id/slots/:slot",
            post(handlers::handle_upload),
        )
        .route(
            "/api/v1/sessions/:id/slots/:slot/raw",
            get(handlers::handle_raw_document),
        )
        .route(
            "/api/v1/sessions/:id/comparison",
            get(handlers::handle_get_comparison),
        )
        .route(
            "/api/v1/sessions/:id/progress",
            get(handlers::handle_get_progress),
        )
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}
