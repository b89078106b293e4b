//! Route modules for Upright Server

pub mod health;
pub mod rotation;

use axum::Router;

use crate::state::AppState;

/// Build the application router
pub fn app(state: AppState) -> Router {
    let max_upload_size = state.config().upload.max_upload_size;

    Router::new()
        .merge(health::router())
        .merge(rotation::router(max_upload_size))
        .with_state(state)
}
