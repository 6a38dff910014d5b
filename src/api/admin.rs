//! Dashboard endpoints (bearer token required except for login)

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        admin::{LoginRequest, LoginResponse},
        booking::{BookingQuery, UpdateBookingStatus},
        Booking, BookingWithService, BookingsOverview,
    },
    AppState,
};

use super::AdminSession;

/// Open a dashboard session
#[utoipa::path(
    post,
    path = "/admin/login",
    tag = "admin",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued", body = LoginResponse),
        (status = 400, description = "Malformed body", body = crate::error::ErrorResponse),
        (status = 401, description = "Wrong password", body = crate::error::ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<LoginResponse>> {
    let Json(request) = body?;
    let session = state.services.admin.login(&request.password)?;
    Ok(Json(session))
}

/// Bookings split into upcoming and past, with per-status counts
#[utoipa::path(
    get,
    path = "/admin/bookings",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(BookingQuery),
    responses(
        (status = 200, description = "Bookings overview", body = BookingsOverview),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_bookings(
    State(state): State<AppState>,
    AdminSession(_claims): AdminSession,
    query: Result<Query<BookingQuery>, QueryRejection>,
) -> AppResult<Json<BookingsOverview>> {
    let Query(query) = query?;
    let overview = state.services.bookings.overview(query.status, Utc::now()).await?;
    Ok(Json(overview))
}

/// Get booking by ID
#[utoipa::path(
    get,
    path = "/admin/bookings/{id}",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking with its service", body = BookingWithService),
        (status = 404, description = "Unknown booking", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_booking(
    State(state): State<AppState>,
    AdminSession(_claims): AdminSession,
    Path(id): Path<Uuid>,
) -> AppResult<Json<BookingWithService>> {
    let booking = state.services.bookings.get(id).await?;
    Ok(Json(booking))
}

/// Change a booking's status
#[utoipa::path(
    put,
    path = "/admin/bookings/{id}/status",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Booking ID")),
    request_body = UpdateBookingStatus,
    responses(
        (status = 200, description = "Booking updated", body = Booking),
        (status = 400, description = "Unknown status value", body = crate::error::ErrorResponse),
        (status = 404, description = "Unknown booking", body = crate::error::ErrorResponse),
        (status = 409, description = "Slot held by another booking", body = crate::error::ErrorResponse),
        (status = 422, description = "Transition not allowed", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_booking_status(
    State(state): State<AppState>,
    AdminSession(claims): AdminSession,
    Path(id): Path<Uuid>,
    body: Result<Json<UpdateBookingStatus>, JsonRejection>,
) -> AppResult<Json<Booking>> {
    let Json(update) = body?;
    tracing::debug!(session = %claims.sub, booking_id = %id, status = %update.status, "Status change requested");
    let booking = state.services.bookings.update_status(id, update.status).await?;
    Ok(Json(booking))
}
