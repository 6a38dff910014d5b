//! Public booking endpoints

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{Booking, CreateBookingRequest},
    services::reference::generate_booking_reference,
    AppState,
};

/// Created booking
#[derive(Serialize, ToSchema)]
pub struct CreateBookingResponse {
    pub success: bool,
    pub booking: Booking,
}

/// Freshly generated booking reference
#[derive(Serialize, ToSchema)]
pub struct ReferenceResponse {
    pub reference: String,
}

/// Book a consultation slot
#[utoipa::path(
    post,
    path = "/bookings",
    tag = "bookings",
    request_body = CreateBookingRequest,
    responses(
        (status = 201, description = "Booking created", body = CreateBookingResponse),
        (status = 400, description = "Missing or invalid fields", body = crate::error::ErrorResponse),
        (status = 409, description = "Slot already booked", body = crate::error::ErrorResponse),
        (status = 500, description = "Booking not persisted", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_booking(
    State(state): State<AppState>,
    body: Result<Json<CreateBookingRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<CreateBookingResponse>)> {
    let Json(request) = body?;
    let booking = state.services.bookings.create(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateBookingResponse {
            success: true,
            booking,
        }),
    ))
}

/// Generate a booking reference for a new booking form
#[utoipa::path(
    get,
    path = "/bookings/reference",
    tag = "bookings",
    responses(
        (status = 200, description = "New reference", body = ReferenceResponse)
    )
)]
pub async fn new_reference() -> Json<ReferenceResponse> {
    Json(ReferenceResponse {
        reference: generate_booking_reference(),
    })
}
