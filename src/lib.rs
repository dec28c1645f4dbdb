pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod services;
pub mod state;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn app(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_upload_bytes;
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/bumi/booking/chat", post(handlers::chat::chat))
        .route("/bumi/booking/chat/image", post(handlers::chat::chat_with_image))
        .route("/bumi/ai/quickTricks", post(handlers::booking_ai::quick_tricks))
        .route("/bumi/ai/my-bookings", get(handlers::booking_ai::my_bookings))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
