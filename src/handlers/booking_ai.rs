use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;

use crate::errors::AppError;
use crate::models::{BookingActionRequest, BookingActionResponse, BookingSummary};
use crate::services::booking_actions::{interpret_booking_request, list_caller_bookings, resolve_caller};
use crate::state::AppState;

/// Set by the identity gateway in front of this service.
pub const USER_ID_HEADER: &str = "x-user-id";

fn caller_user_id(headers: &HeaderMap) -> Result<String, AppError> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(AppError::Unauthenticated)
}

// POST /bumi/ai/quickTricks
pub async fn quick_tricks(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<BookingActionRequest>,
) -> Result<Json<BookingActionResponse>, AppError> {
    let user_id = caller_user_id(&headers)?;
    let caller = {
        let db = state.db()?;
        resolve_caller(&db, &user_id)?
    };

    let response = interpret_booking_request(&state, &caller, request).await?;
    Ok(Json(response))
}

#[derive(Serialize)]
pub struct MyBookingsResponse {
    user_type: &'static str,
    total_bookings: usize,
    bookings: Vec<BookingSummary>,
}

// GET /bumi/ai/my-bookings
pub async fn my_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<MyBookingsResponse>, AppError> {
    let user_id = caller_user_id(&headers)?;
    let db = state.db()?;
    let caller = resolve_caller(&db, &user_id)?;
    let bookings = list_caller_bookings(&db, &caller)?;

    Ok(Json(MyBookingsResponse {
        user_type: caller.kind(),
        total_bookings: bookings.len(),
        bookings,
    }))
}
